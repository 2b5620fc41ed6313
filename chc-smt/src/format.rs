#![forbid(unsafe_code)]

//! SMT-LIB2 rendering of terms.

use std::fmt;

use crate::Term;

fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, op: &str, args: &[T]) -> fmt::Result {
    write!(f, "({op}")?;
    for a in args {
        write!(f, " {a}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::BoolLit(b) => write!(f, "{b}"),
            Term::IntLit(v) if *v < 0 => write!(f, "(- {})", v.unsigned_abs()),
            Term::IntLit(v) => write!(f, "{v}"),
            Term::Numeral(text) => match text.strip_prefix('-') {
                Some(abs) => write!(f, "(- {abs})"),
                None => f.write_str(text),
            },
            Term::Var(name, _) => f.write_str(name),
            Term::App(name, args) if args.is_empty() => f.write_str(name),
            Term::App(name, args) => list(f, name, args),

            Term::Not(a) => list(f, "not", &[a]),
            Term::And(args) => match args.as_slice() {
                [] => f.write_str("true"),
                [one] => write!(f, "{one}"),
                _ => list(f, "and", args),
            },
            Term::Or(args) => match args.as_slice() {
                [] => f.write_str("false"),
                [one] => write!(f, "{one}"),
                _ => list(f, "or", args),
            },
            Term::Implies(a, b) => list(f, "=>", &[a, b]),
            Term::Eq(a, b) => list(f, "=", &[a, b]),

            Term::Lt(a, b) => list(f, "<", &[a, b]),
            Term::Le(a, b) => list(f, "<=", &[a, b]),
            Term::Gt(a, b) => list(f, ">", &[a, b]),
            Term::Ge(a, b) => list(f, ">=", &[a, b]),

            Term::Add(a, b) => list(f, "+", &[a, b]),
            Term::Sub(a, b) => list(f, "-", &[a, b]),
            Term::Mul(a, b) => list(f, "*", &[a, b]),
            Term::Div(a, b) => list(f, "div", &[a, b]),
            Term::Mod(a, b) => list(f, "mod", &[a, b]),
            Term::Neg(a) => list(f, "-", &[a]),

            Term::Ite(c, t, e) => list(f, "ite", &[c, t, e]),
            Term::Select(a, i) => list(f, "select", &[a, i]),
            Term::Store(a, i, v) => list(f, "store", &[a, i, v]),
            Term::ConstArray(sort, v) => write!(f, "((as const {sort}) {v})"),
        }
    }
}

/// `((x Int) (y Bool))`, the binder list of a `forall`.
pub fn sorted_vars(term: &Term) -> String {
    term.free_vars()
        .iter()
        .map(|(name, sort)| format!("({name} {sort})"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Universally close `term` over its free variables.
pub fn forall(term: &Term) -> String {
    let vars = sorted_vars(term);
    if vars.is_empty() {
        term.to_string()
    } else {
        format!("(forall ({vars}) {term})")
    }
}
