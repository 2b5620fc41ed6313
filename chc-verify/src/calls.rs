#![forbid(unsafe_code)]

use chc_ast::{Expression, NodeId};
use chc_smt::Term;
use tracing::trace;

use crate::EncodeError;
use crate::encoder::{AssertionInfo, Scope, Translator};

impl<'u, 's> Translator<'u, 's> {
    /// A failing assertion sets the error variable to its code and jumps to
    /// the summary; execution continues assuming it held.
    pub fn visit_assert(&mut self, call: &'u Expression, arguments: &'u [Expression]) -> Result<(), EncodeError> {
        let [argument] = arguments else {
            return Err(EncodeError::at(
                format!("assert expects one argument, got {}", arguments.len()),
                call.span,
            ));
        };
        let scope = self.current_scope()?;
        self.function_assertions.entry(scope).or_default().insert(call.id);
        let code = self.assertion_code(call)?;

        let condition = self.ctx.expression(argument.id)?;
        let previous = self.error.current_value();
        let failed = self.error.increase_index();
        let summary = self.current_summary()?;
        self.connect_from_current(
            &summary,
            Term::and([
                self.path_condition(),
                Term::not(condition),
                Term::eq(failed.clone(), Term::int(i128::from(code))),
            ]),
        );
        self.ctx.add_assumption(Term::eq(failed, previous));
        trace!(assertion = %call.id, code, "assert");
        Ok(())
    }

    /// Codes are handed out in order of first encounter, once per assertion
    /// even when several contracts inherit it.
    fn assertion_code(&mut self, call: &Expression) -> Result<u32, EncodeError> {
        if let Some(code) = self.assertion_codes.get(&call.id) {
            return Ok(*code);
        }
        let code = self.assertions.len() as u32 + 1;
        let contract = self.contract()?.name.clone();
        let function = self.scope()?.name.clone();
        self.assertion_codes.insert(call.id, code);
        self.assertions.push(AssertionInfo {
            id: call.id,
            code,
            span: call.span,
            contract,
            function,
        });
        Ok(code)
    }

    /// Codes index [`Translator::assertions`] from one.
    pub fn assertion(&self, code: u32) -> Option<&AssertionInfo> {
        let index = usize::try_from(code).ok()?.checked_sub(1)?;
        self.assertions.get(index)
    }

    /// Call to a function whose summary is known: constrain the result by
    /// the callee's summary and propagate a nonzero error code.
    pub fn internal_call(
        &mut self,
        call: &'u Expression,
        function: NodeId,
        arguments: &'u [Expression],
    ) -> Result<Term, EncodeError> {
        let (callee_contract, callee) = self.functions.get(&function).copied().ok_or_else(|| {
            EncodeError::at(format!("call to undefined function {function}"), call.span)
        })?;
        let caller = self.current_scope()?;
        let owner = if callee_contract.is_library() {
            callee_contract.id
        } else {
            caller.contract
        };
        self.call_graph.entry(caller).or_default().insert(Scope {
            contract: owner,
            node: function,
        });

        let mut args = Vec::new();
        for a in arguments {
            args.push(self.visit_expression(a)?);
        }
        if callee_contract.is_library() {
            let interface = self.interface_of(callee_contract)?;
            self.ctx.add_assumption(interface);
        }

        let previous = self.error.current_value();
        let mut summary_args = vec![self.error.increase_index()];
        if callee_contract.is_library() {
            summary_args.extend(self.contract_state_at(callee_contract, 0)?);
        } else {
            summary_args.extend(self.current_state()?);
        }
        summary_args.extend(args);
        for id in self.state_variables.clone() {
            self.ctx.increase_index(id)?;
        }
        if callee_contract.is_library() {
            summary_args.extend(self.contract_state_at(callee_contract, 1)?);
        } else {
            summary_args.extend(self.current_state()?);
        }
        let mut returns = Vec::new();
        for r in &callee.returns {
            returns.push(self.ctx.fresh_of_type(&format!("ret_{function}"), &r.ty));
        }
        summary_args.extend(returns.iter().cloned());

        let summary = self.registry.summary(owner, function)?;
        let applied = self.registry.apply(summary, summary_args)?;
        self.ctx.add_assumption(applied);

        let failed = self.error.current_value();
        let target = self.current_summary()?;
        self.connect_from_current(
            &target,
            Term::and([self.path_condition(), Term::gt(failed.clone(), Term::int(0))]),
        );
        self.ctx.add_assumption(Term::eq(failed, Term::int(0)));
        let next = self.error.increase_index();
        self.ctx.add_assumption(Term::eq(next, previous));

        Ok(returns.into_iter().next().unwrap_or_else(Term::tt))
    }

    /// The callee may have re-entered and changed anything reachable.
    pub fn unknown_call(&mut self) -> Result<(), EncodeError> {
        self.erase_knowledge()?;
        self.unknown_call_seen = true;
        Ok(())
    }
}
