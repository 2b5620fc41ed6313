#![forbid(unsafe_code)]

use std::collections::HashMap;

use chc_ast::{BinaryOp, CallKind, Expression, ExpressionKind, NodeId, TypeName, UnaryOp};
use chc_smt::Term;

use crate::EncodeError;
use crate::encoder::Translator;

/// Variable versions, error flag included, at one program point.
struct Versions {
    variables: HashMap<NodeId, u32>,
    error: u32,
}

impl<'u, 's> Translator<'u, 's> {
    /// Encode `e` under the current assumptions and remember its value.
    pub fn visit_expression(&mut self, e: &'u Expression) -> Result<Term, EncodeError> {
        let value = match &e.kind {
            ExpressionKind::Bool(b) => Term::bool(*b),
            ExpressionKind::Number(n) => Term::int(*n),
            ExpressionKind::Identifier { name, declaration } => match declaration {
                Some(id) if self.ctx.known_variable(*id) => self.ctx.current_value(*id)?,
                _ => {
                    let ty = e.ty.clone().unwrap_or_else(TypeName::uint256);
                    self.ctx.fresh_of_type(&sanitize(name), &ty)
                }
            },
            ExpressionKind::Unary { op, operand } => self.visit_unary(*op, operand)?,
            ExpressionKind::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                lhs,
                rhs,
            } => {
                // The right operand only runs when the left one does not decide.
                let l = self.visit_expression(lhs)?;
                let guard = if *op == BinaryOp::And { l.clone() } else { Term::not(l.clone()) };
                let skipped = self.versions();
                let (r, evaluated) = self.branch(&guard, |t| t.visit_expression(rhs))?;
                self.merge(&guard, &evaluated, &skipped)?;
                binary(*op, l, r)
            }
            ExpressionKind::Binary { op, lhs, rhs } => {
                let l = self.visit_expression(lhs)?;
                let r = self.visit_expression(rhs)?;
                binary(*op, l, r)
            }
            ExpressionKind::Assignment { op, lhs, rhs } => {
                let r = self.visit_expression(rhs)?;
                let value = match op.binary() {
                    Some(bop) => {
                        let l = self.visit_expression(lhs)?;
                        binary(bop, l, r)
                    }
                    None => {
                        self.visit_lvalue(lhs)?;
                        r
                    }
                };
                self.assign_to(lhs, value.clone())?;
                value
            }
            ExpressionKind::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                let c = self.visit_expression(condition)?;
                let (t, when_true) = self.branch(&c, |t| t.visit_expression(true_expr))?;
                let (f, when_false) = self.branch(&Term::not(c.clone()), |t| t.visit_expression(false_expr))?;
                self.merge(&c, &when_true, &when_false)?;
                Term::ite(c, t, f)
            }
            ExpressionKind::IndexAccess { base, index } => {
                let b = self.visit_expression(base)?;
                let i = self.visit_expression(index)?;
                Term::select(b, i)
            }
            ExpressionKind::FunctionCall { kind, arguments } => self.visit_call(e, *kind, arguments)?,
        };
        self.ctx.set_expression(e.id, value.clone());
        Ok(value)
    }

    fn versions(&self) -> Versions {
        Versions {
            variables: self.ctx.indices(),
            error: self.error.index(),
        }
    }

    fn restore(&mut self, versions: &Versions) {
        self.ctx.restore_indices(&versions.variables);
        self.error.set_index(versions.error);
    }

    /// Encode `f` as if guarded by `condition`: what it assumes holds only
    /// under the condition, failures it routes carry the condition, and the
    /// variable versions are rolled back afterwards. Returns the versions `f`
    /// ended with, for [`Translator::merge`].
    fn branch<T>(
        &mut self,
        condition: &Term,
        f: impl FnOnce(&mut Self) -> Result<T, EncodeError>,
    ) -> Result<(T, Versions), EncodeError> {
        let before = self.versions();
        self.ctx.push_frame();
        self.path_conditions.push(condition.clone());
        let result = f(self);
        self.path_conditions.pop();
        let effects = self.ctx.pop_frame();
        let value = result?;
        if !effects.is_empty() {
            self.ctx
                .add_assumption(Term::implies(condition.clone(), Term::and(effects)));
        }
        let after = self.versions();
        self.restore(&before);
        Ok((value, after))
    }

    /// New version of every variable the two sides left at different
    /// versions, selecting the side by `condition`.
    fn merge(&mut self, condition: &Term, when_true: &Versions, when_false: &Versions) -> Result<(), EncodeError> {
        let mut changed = when_true
            .variables
            .iter()
            .filter_map(|(id, t)| match when_false.variables.get(id) {
                Some(f) if f != t => Some((*id, *t, *f)),
                _ => None,
            })
            .collect::<Vec<_>>();
        changed.sort();
        for (id, t, f) in changed {
            let value = Term::ite(
                condition.clone(),
                self.ctx.value_at_index(id, t)?,
                self.ctx.value_at_index(id, f)?,
            );
            let merged = self.ctx.increase_index(id)?;
            self.ctx.add_assumption(Term::eq(merged, value));
        }
        if when_true.error != when_false.error {
            let value = Term::ite(
                condition.clone(),
                self.error.value_at_index(when_true.error),
                self.error.value_at_index(when_false.error),
            );
            let merged = self.error.increase_index();
            self.ctx.add_assumption(Term::eq(merged, value));
        }
        Ok(())
    }

    /// Sub-expressions of an assignment target that `assign_to` reads back.
    fn visit_lvalue(&mut self, e: &'u Expression) -> Result<(), EncodeError> {
        if let ExpressionKind::IndexAccess { base, index } = &e.kind {
            self.visit_expression(base)?;
            self.visit_expression(index)?;
        }
        Ok(())
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &'u Expression) -> Result<Term, EncodeError> {
        let value = self.visit_expression(operand)?;
        Ok(match op {
            UnaryOp::Not => Term::not(value),
            UnaryOp::Neg => Term::neg(value),
            UnaryOp::PreInc | UnaryOp::PostInc | UnaryOp::PreDec | UnaryOp::PostDec => {
                let updated = if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                    Term::add(value.clone(), Term::int(1))
                } else {
                    Term::sub(value.clone(), Term::int(1))
                };
                self.assign_to(operand, updated.clone())?;
                if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                    updated
                } else {
                    value
                }
            }
        })
    }

    /// Write `value` through an assignment target. Targets other than
    /// variables and index accesses are not tracked.
    pub fn assign_to(&mut self, lhs: &'u Expression, value: Term) -> Result<(), EncodeError> {
        match &lhs.kind {
            ExpressionKind::Identifier {
                declaration: Some(id), ..
            } if self.ctx.known_variable(*id) => {
                self.assign_variable(*id, value.clone())?;
                self.ctx.set_expression(lhs.id, value);
                Ok(())
            }
            ExpressionKind::IndexAccess { base, index } => {
                let array = self.ctx.expression(base.id)?;
                let key = self.ctx.expression(index.id)?;
                self.assign_to(base, Term::store(array, key, value))
            }
            _ => Ok(()),
        }
    }

    fn visit_call(
        &mut self,
        e: &'u Expression,
        kind: CallKind,
        arguments: &'u [Expression],
    ) -> Result<Term, EncodeError> {
        match kind {
            CallKind::Assert => {
                for a in arguments {
                    self.visit_expression(a)?;
                }
                self.visit_assert(e, arguments)?;
                Ok(Term::tt())
            }
            CallKind::Require => {
                for a in arguments {
                    let condition = self.visit_expression(a)?;
                    self.ctx.add_assumption(condition);
                }
                Ok(Term::tt())
            }
            CallKind::TypeConversion => match arguments.first() {
                Some(a) => self.visit_expression(a),
                None => Err(EncodeError::at("type conversion without an argument", e.span)),
            },
            CallKind::Internal { function: Some(fid) } => self.internal_call(e, fid, arguments),
            _ => {
                for a in arguments {
                    self.visit_expression(a)?;
                }
                let value = match &e.ty {
                    Some(ty) => self.ctx.fresh_of_type("call", ty),
                    None => Term::tt(),
                };
                self.unknown_call()?;
                Ok(value)
            }
        }
    }
}

fn binary(op: BinaryOp, l: Term, r: Term) -> Term {
    match op {
        BinaryOp::Add => Term::add(l, r),
        BinaryOp::Sub => Term::sub(l, r),
        BinaryOp::Mul => Term::mul(l, r),
        BinaryOp::Div => Term::div(l, r),
        BinaryOp::Mod => Term::modulo(l, r),
        BinaryOp::Eq => Term::eq(l, r),
        BinaryOp::Ne => Term::not(Term::eq(l, r)),
        BinaryOp::Lt => Term::lt(l, r),
        BinaryOp::Gt => Term::gt(l, r),
        BinaryOp::Le => Term::le(l, r),
        BinaryOp::Ge => Term::ge(l, r),
        BinaryOp::And => Term::and([l, r]),
        BinaryOp::Or => Term::or([l, r]),
    }
}

/// Identifiers like `block.number` become `block_number`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
