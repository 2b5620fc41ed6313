#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::Sort;

/// First-order term over Bool, Int and arrays.
///
/// Rendered as SMT-LIB2 by its `Display` impl (see `format.rs`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    BoolLit(bool),
    IntLit(i128),
    /// Decimal numeral too large for `IntLit`, e.g. `2^256 - 1`.
    Numeral(String),
    Var(String, Sort),
    App(String, Vec<Term>),

    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    Eq(Box<Term>, Box<Term>),

    Lt(Box<Term>, Box<Term>),
    Le(Box<Term>, Box<Term>),
    Gt(Box<Term>, Box<Term>),
    Ge(Box<Term>, Box<Term>),

    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
    Div(Box<Term>, Box<Term>),
    Mod(Box<Term>, Box<Term>),
    Neg(Box<Term>),

    Ite(Box<Term>, Box<Term>, Box<Term>),
    Select(Box<Term>, Box<Term>),
    Store(Box<Term>, Box<Term>, Box<Term>),
    /// Constant array; the sort is the full array sort.
    ConstArray(Sort, Box<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>, sort: Sort) -> Self {
        Term::Var(name.into(), sort)
    }

    pub fn int(value: i128) -> Self {
        Term::IntLit(value)
    }

    pub fn bool(value: bool) -> Self {
        Term::BoolLit(value)
    }

    pub fn tt() -> Self {
        Term::BoolLit(true)
    }

    pub fn app(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::App(name.into(), args)
    }

    pub fn not(t: Term) -> Self {
        match t {
            Term::BoolLit(b) => Term::BoolLit(!b),
            Term::Not(inner) => *inner,
            other => Term::Not(Box::new(other)),
        }
    }

    /// Conjunction, flattened; `true` operands are dropped.
    pub fn and(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut out = Vec::new();
        for t in terms {
            match t {
                Term::BoolLit(true) => {}
                Term::BoolLit(false) => return Term::BoolLit(false),
                Term::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Term::BoolLit(true),
            1 => out.remove(0),
            _ => Term::And(out),
        }
    }

    /// Disjunction, flattened; `false` operands are dropped.
    pub fn or(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut out = Vec::new();
        for t in terms {
            match t {
                Term::BoolLit(false) => {}
                Term::BoolLit(true) => return Term::BoolLit(true),
                Term::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Term::BoolLit(false),
            1 => out.remove(0),
            _ => Term::Or(out),
        }
    }

    pub fn implies(body: Term, head: Term) -> Self {
        Term::Implies(Box::new(body), Box::new(head))
    }

    pub fn eq(a: Term, b: Term) -> Self {
        Term::Eq(Box::new(a), Box::new(b))
    }

    pub fn lt(a: Term, b: Term) -> Self {
        Term::Lt(Box::new(a), Box::new(b))
    }

    pub fn le(a: Term, b: Term) -> Self {
        Term::Le(Box::new(a), Box::new(b))
    }

    pub fn gt(a: Term, b: Term) -> Self {
        Term::Gt(Box::new(a), Box::new(b))
    }

    pub fn ge(a: Term, b: Term) -> Self {
        Term::Ge(Box::new(a), Box::new(b))
    }

    pub fn add(a: Term, b: Term) -> Self {
        Term::Add(Box::new(a), Box::new(b))
    }

    pub fn sub(a: Term, b: Term) -> Self {
        Term::Sub(Box::new(a), Box::new(b))
    }

    pub fn mul(a: Term, b: Term) -> Self {
        Term::Mul(Box::new(a), Box::new(b))
    }

    pub fn div(a: Term, b: Term) -> Self {
        Term::Div(Box::new(a), Box::new(b))
    }

    pub fn modulo(a: Term, b: Term) -> Self {
        Term::Mod(Box::new(a), Box::new(b))
    }

    pub fn neg(a: Term) -> Self {
        match a {
            Term::IntLit(v) => Term::IntLit(-v),
            other => Term::Neg(Box::new(other)),
        }
    }

    pub fn ite(c: Term, t: Term, e: Term) -> Self {
        Term::Ite(Box::new(c), Box::new(t), Box::new(e))
    }

    pub fn select(array: Term, index: Term) -> Self {
        Term::Select(Box::new(array), Box::new(index))
    }

    pub fn store(array: Term, index: Term, value: Term) -> Self {
        Term::Store(Box::new(array), Box::new(index), Box::new(value))
    }

    pub fn const_array(sort: Sort, value: Term) -> Self {
        Term::ConstArray(sort, Box::new(value))
    }

    /// Name of the applied relation, for `App` terms.
    pub fn relation_name(&self) -> Option<&str> {
        match self {
            Term::App(name, _) => Some(name),
            _ => None,
        }
    }

    pub fn free_vars(&self) -> BTreeMap<String, Sort> {
        let mut out = BTreeMap::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeMap<String, Sort>) {
        match self {
            Term::BoolLit(_) | Term::IntLit(_) | Term::Numeral(_) => {}
            Term::Var(name, sort) => {
                out.entry(name.clone()).or_insert_with(|| sort.clone());
            }
            Term::App(_, args) | Term::And(args) | Term::Or(args) => {
                for a in args {
                    a.collect_vars(out);
                }
            }
            Term::Not(a) | Term::Neg(a) | Term::ConstArray(_, a) => a.collect_vars(out),
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::Lt(a, b)
            | Term::Le(a, b)
            | Term::Gt(a, b)
            | Term::Ge(a, b)
            | Term::Add(a, b)
            | Term::Sub(a, b)
            | Term::Mul(a, b)
            | Term::Div(a, b)
            | Term::Mod(a, b)
            | Term::Select(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Term::Ite(a, b, c) | Term::Store(a, b, c) => {
                a.collect_vars(out);
                b.collect_vars(out);
                c.collect_vars(out);
            }
        }
    }

    /// Every relation application inside the term, in left-to-right order.
    pub fn applications(&self) -> Vec<&Term> {
        let mut out = Vec::new();
        self.collect_apps(&mut out);
        out
    }

    fn collect_apps<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            Term::App(_, args) => {
                out.push(self);
                for a in args {
                    a.collect_apps(out);
                }
            }
            Term::And(args) | Term::Or(args) => {
                for a in args {
                    a.collect_apps(out);
                }
            }
            Term::Not(a) => a.collect_apps(out),
            Term::Implies(a, b) => {
                a.collect_apps(out);
                b.collect_apps(out);
            }
            _ => {}
        }
    }
}
