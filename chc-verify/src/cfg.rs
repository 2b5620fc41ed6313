#![forbid(unsafe_code)]

//! Contracts, functions and statements as blocks connected by rules.

use std::collections::HashSet;

use chc_ast::{
    Block, ContractDefinition, ContractKind, ForStatement, FunctionDefinition, IfStatement, Jump, NodeId, Return, Span,
    Statement, VariableDeclarationStatement, WhileStatement,
};
use chc_smt::Term;
use tracing::debug;

use crate::EncodeError;
use crate::encoder::{FunctionScope, Scope, Translator, VerificationTarget};
use crate::registry::{PredicateId, PredicateRole};
use crate::symbolic::{type_constraints, zero_value};

#[derive(Clone, Copy)]
enum Jumps {
    Inherit,
    Loop { break_to: PredicateId, continue_to: PredicateId },
}

impl<'u, 's> Translator<'u, 's> {
    pub fn visit_contract(&mut self, contract: &'u ContractDefinition) -> Result<(), EncodeError> {
        if contract.kind == ContractKind::Interface {
            return Ok(());
        }
        debug!(contract = %contract.name, "visit contract");

        self.unknown_call_seen = false;
        self.break_dest = None;
        self.continue_dest = None;
        self.return_dest = None;
        self.error.reset_index();
        self.ctx.clear_assumptions();

        self.contract = Some(contract);
        self.function = None;
        self.state_variables = self.state_declarations(contract)?.iter().map(|v| v.id).collect();
        self.clear_indices()?;

        self.create_contract_predicate("error", Vec::new(), PredicateRole::Error { contract: contract.id })?;
        let domain = self.constructor_sort()?;
        self.constructor_summary = Some(self.create_contract_predicate(
            "summary_constructor",
            domain,
            PredicateRole::ConstructorSummary { contract: contract.id },
        )?);
        let domain = self.state_sorts(contract)?;
        self.implicit_constructor = Some(self.create_contract_predicate(
            "implicit_constructor",
            domain,
            PredicateRole::ImplicitConstructor { contract: contract.id },
        )?);

        let mut seen = HashSet::new();
        for c in self.linearization(contract)? {
            for f in c.functions.iter().filter(|f| !f.is_constructor() && f.is_implemented()) {
                let exposed = seen.insert(f.signature());
                self.visit_function(f, exposed)?;
            }
        }

        self.end_contract(contract)?;
        self.contract = None;
        Ok(())
    }

    /// Entry and body blocks, the body, then the exit wiring. `exposed` is
    /// false for definitions overridden further down the hierarchy (same
    /// name and parameter types): they get a summary for internal calls but
    /// no transaction of their own.
    fn visit_function(&mut self, function: &'u FunctionDefinition, exposed: bool) -> Result<(), EncodeError> {
        let Some(body) = &function.body else {
            return Ok(());
        };
        let contract = self.contract()?;
        self.function = Some(FunctionScope::of(function));
        for v in function.parameters.iter().chain(&function.returns) {
            self.ctx.create_variable(v);
        }
        for v in function.local_variables() {
            self.ctx.create_variable(v);
        }
        self.ctx.clear_assumptions();
        self.clear_indices()?;
        self.ctx.push_frame();

        let entry = self.create_block(function.id, "")?;
        let body_block = self.create_block(body.id, "")?;
        let entry_pred = self.registry.apply(entry, self.current_function_variables()?)?;
        let body_pred = self.predicate(body_block)?;

        let genesis = self.genesis()?;
        self.connect_blocks(&genesis, &entry_pred, Term::tt());

        self.assume_entry_state()?;
        self.connect_blocks(&entry_pred, &body_pred, Term::tt());

        self.set_current_block(body_block)?;
        self.visit_block(body)?;

        let assertion_error = self.error.current_value();
        let summary = self.function_summary()?;
        self.connect_from_current(&summary, Term::tt());

        let iface = self.current_interface()?;
        let interface = self.registry.interface(contract.id)?;
        self.enter_block(interface, |t| t.state_at(0))?;

        if function.is_public() && exposed {
            self.targets.push(VerificationTarget {
                scope: Scope {
                    contract: contract.id,
                    node: function.id,
                },
                from: self.current_block.clone(),
                constraints: summary.clone(),
                error: assertion_error.clone(),
            });
            self.connect_from_current(&iface, Term::and([summary, Term::eq(assertion_error, Term::int(0))]));
        }

        self.function = None;
        Ok(())
    }

    /// Assumptions of the entry-to-body edge: no error yet, current values
    /// equal the index-0 snapshot, outputs and locals start at zero.
    fn assume_entry_state(&mut self) -> Result<(), EncodeError> {
        let scope = self.scope()?.clone();
        self.ctx.add_assumption(Term::eq(self.error.current_value(), Term::int(0)));
        for id in self.state_variables.iter().chain(&scope.parameters) {
            let var = self.ctx.variable(*id)?;
            let initial = var.value_at_index(0);
            let constraint = type_constraints(var.ty(), &initial);
            let equal = Term::eq(initial, var.current_value());
            self.ctx.add_assumption(equal);
            self.ctx.add_assumption(constraint);
        }
        for id in scope.returns.iter().chain(&scope.locals) {
            let var = self.ctx.variable(*id)?;
            let zero = Term::eq(var.current_value(), zero_value(var.sort()));
            self.ctx.add_assumption(zero);
        }
        Ok(())
    }

    /// Construction: zero state, implicit constructor, state initializers
    /// and constructor bodies of the hierarchy (deepest base first), then
    /// the constructor summary feeding the interface.
    fn end_contract(&mut self, contract: &'u ContractDefinition) -> Result<(), EncodeError> {
        let linearization = self.linearization(contract)?;
        let implicit = self
            .implicit_constructor
            .ok_or_else(|| EncodeError::new("implicit constructor not defined"))?;
        let summary = self
            .constructor_summary
            .ok_or_else(|| EncodeError::new("constructor summary not defined"))?;

        self.ctx.clear_assumptions();
        self.ctx.push_frame();
        for id in self.state_variables.clone() {
            let var = self.ctx.variable_mut(id)?;
            var.reset_index();
            let zero = Term::eq(var.current_value(), zero_value(var.sort()));
            self.ctx.add_assumption(zero);
        }
        let implicit_pred = self.registry.apply(implicit, self.state_at(0)?)?;
        let genesis = self.genesis()?;
        self.connect_blocks(&genesis, &implicit_pred, Term::tt());

        let constructors = linearization
            .iter()
            .rev()
            .filter_map(|c| c.constructor())
            .filter(|f| f.is_implemented())
            .collect::<Vec<_>>();
        for c in &constructors {
            for v in c.parameters.iter().chain(c.local_variables()) {
                self.ctx.create_variable(v);
            }
        }
        let scope = FunctionScope::constructor(contract, &constructors);
        let body_node = scope.body;
        self.function = Some(scope);

        self.enter_block(implicit, |t| t.state_at(0))?;
        self.ctx.add_assumption(Term::eq(self.error.current_value(), Term::int(0)));
        for id in self.state_variables.clone() {
            let var = self.ctx.variable(id)?;
            self.ctx.add_assumption(Term::eq(var.current_value(), var.value_at_index(0)));
        }

        let explicit = !constructors.is_empty();
        if explicit {
            let entry_node = self.scope()?.id;
            let entry = self.create_block(entry_node, "")?;
            let entry_pred = self.registry.apply(entry, self.current_function_variables()?)?;
            self.connect_from_current(&entry_pred, Term::tt());

            self.ctx.clear_assumptions();
            self.ctx.push_frame();
            self.assume_entry_state()?;
            let body = self.create_block(body_node, "")?;
            let body_pred = self.predicate(body)?;
            self.connect_blocks(&entry_pred, &body_pred, Term::tt());
            self.set_current_block(body)?;
        }

        for c in linearization.iter().rev() {
            for var in c.state_variables.iter() {
                if let Some(value) = &var.value {
                    let term = self.visit_expression(value)?;
                    self.assign_variable(var.id, term)?;
                }
            }
            if let Some(body) = c.constructor().and_then(|f| f.body.as_ref()) {
                self.visit_constructor_body(body)?;
            }
        }

        if explicit {
            let domain = self.constructor_sort()?;
            let exit = self.create_contract_predicate(
                "constructor_exit",
                domain,
                PredicateRole::ConstructorExit { contract: contract.id },
            )?;
            let exit_pred = self.registry.apply(exit, self.error_and_state()?)?;
            self.connect_from_current(&exit_pred, Term::tt());
            self.enter_block(exit, |t| t.error_and_state())?;
        }

        let summary_pred = self.constructor_summary()?;
        self.connect_from_current(&summary_pred, Term::tt());

        self.function = None;
        self.enter_block(summary, |t| t.error_and_state())?;
        self.targets.push(VerificationTarget {
            scope: Scope {
                contract: contract.id,
                node: contract.id,
            },
            from: self.current_block.clone(),
            constraints: Term::tt(),
            error: self.error.current_value(),
        });
        let iface = self.current_interface()?;
        self.connect_from_current(&iface, Term::eq(self.error.current_value(), Term::int(0)));
        Ok(())
    }

    /// A `return` leaves only the constructor it appears in; the rest of the
    /// hierarchy still runs. Bodies with a return get a block that both the
    /// fall-through and every return reach.
    fn visit_constructor_body(&mut self, body: &'u Block) -> Result<(), EncodeError> {
        if !body.has_return() {
            return self.visit_block(body);
        }
        let exit = self.create_block(body.id, "constructor_return_")?;
        let outer = self.return_dest.replace(exit);
        let result = self.visit_block(body);
        self.return_dest = outer;
        result?;
        let exit_pred = self.predicate(exit)?;
        self.connect_from_current(&exit_pred, Term::tt());
        self.set_current_block(exit)
    }

    fn error_and_state(&self) -> Result<Vec<Term>, EncodeError> {
        let mut args = vec![self.error.current_value()];
        args.extend(self.current_state()?);
        Ok(args)
    }

    pub fn visit_block(&mut self, block: &'u Block) -> Result<(), EncodeError> {
        for s in &block.statements {
            self.visit_statement(s)?;
        }
        Ok(())
    }

    pub fn visit_statement(&mut self, statement: &'u Statement) -> Result<(), EncodeError> {
        match statement {
            Statement::Block(b) => self.visit_block(b),
            Statement::VariableDeclaration(d) => self.visit_declaration(d),
            Statement::Expression(e) => self.visit_expression(&e.expression).map(|_| ()),
            Statement::If(s) => self.visit_if(s),
            Statement::While(s) => self.visit_while(s),
            Statement::For(s) => self.visit_for(s),
            Statement::Break(j) => self.visit_break(j),
            Statement::Continue(j) => self.visit_continue(j),
            Statement::Return(r) => self.visit_return(r),
        }
    }

    fn visit_declaration(&mut self, decl: &'u VariableDeclarationStatement) -> Result<(), EncodeError> {
        let value = match &decl.initial_value {
            Some(e) => Some(self.visit_expression(e)?),
            None => None,
        };
        for v in &decl.declarations {
            self.ctx.create_variable(v);
        }
        match (decl.declarations.as_slice(), value) {
            ([single], Some(value)) => self.assign_variable(single.id, value),
            (vars, Some(_)) => {
                for v in vars {
                    self.ctx.set_unknown_value(v.id)?;
                }
                Ok(())
            }
            (vars, None) => {
                for v in vars {
                    let zero = zero_value(self.ctx.variable(v.id)?.sort());
                    self.assign_variable(v.id, zero)?;
                }
                Ok(())
            }
        }
    }

    /// Run `f` with fresh jump targets and unknown-call flag, erasing
    /// knowledge at the merge point if `f` saw an unknown call.
    fn nested(
        &mut self,
        jumps: Jumps,
        f: impl FnOnce(&mut Self) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let outer_unknown = std::mem::replace(&mut self.unknown_call_seen, false);
        let outer_break = self.break_dest;
        let outer_continue = self.continue_dest;
        if let Jumps::Loop { break_to, continue_to } = jumps {
            self.break_dest = Some(break_to);
            self.continue_dest = Some(continue_to);
        }

        let result = f(self);

        self.break_dest = outer_break;
        self.continue_dest = outer_continue;
        let result = result.and_then(|()| {
            if self.unknown_call_seen {
                self.erase_knowledge()?;
            }
            Ok(())
        });
        self.unknown_call_seen = outer_unknown;
        result
    }

    /// Body node of the enclosing function; merge blocks are named after it.
    fn function_body(&self, span: Span, what: &str) -> Result<NodeId, EncodeError> {
        self.function
            .as_ref()
            .map(|scope| scope.body)
            .ok_or_else(|| EncodeError::at(format!("{what} outside of a function"), span))
    }

    fn visit_if(&mut self, s: &'u IfStatement) -> Result<(), EncodeError> {
        let body = self.function_body(s.span, "if statement")?;

        self.nested(Jumps::Inherit, |t| {
            let header = t.create_block(s.id, "if_header_")?;
            let true_block = t.create_block(s.true_body.id(), "if_true_")?;
            let false_block = match &s.false_body {
                Some(f) => Some(t.create_block(f.id(), "if_false_")?),
                None => None,
            };
            let after = t.create_block(body, "")?;

            let header_pred = t.predicate(header)?;
            t.connect_from_current(&header_pred, Term::tt());
            t.set_current_block(header)?;
            let condition = t.visit_expression(&s.condition)?;

            let true_pred = t.predicate(true_block)?;
            t.connect_from_current(&true_pred, condition.clone());
            let else_pred = t.predicate(false_block.unwrap_or(after))?;
            t.connect_from_current(&else_pred, Term::not(condition));

            t.set_current_block(true_block)?;
            t.visit_statement(&s.true_body)?;
            let after_pred = t.predicate(after)?;
            t.connect_from_current(&after_pred, Term::tt());

            if let (Some(block), Some(stmt)) = (false_block, &s.false_body) {
                t.set_current_block(block)?;
                t.visit_statement(stmt)?;
                let after_pred = t.predicate(after)?;
                t.connect_from_current(&after_pred, Term::tt());
            }

            t.set_current_block(after)
        })
    }

    fn visit_while(&mut self, s: &'u WhileStatement) -> Result<(), EncodeError> {
        let body = self.function_body(s.span, "loop")?;
        let prefix = if s.is_do_while { "do_while" } else { "while" };
        let header = self.create_block(s.id, &format!("{prefix}_header_"))?;
        let loop_body = self.create_block(s.body.id(), &format!("{prefix}_body_"))?;
        let after = self.create_block(body, "")?;

        self.nested(
            Jumps::Loop {
                break_to: after,
                continue_to: header,
            },
            |t| {
                if s.is_do_while {
                    t.visit_statement(&s.body)?;
                }
                let header_pred = t.predicate(header)?;
                t.connect_from_current(&header_pred, Term::tt());
                t.set_current_block(header)?;
                let condition = t.visit_expression(&s.condition)?;

                let body_pred = t.predicate(loop_body)?;
                t.connect_from_current(&body_pred, condition.clone());
                let after_pred = t.predicate(after)?;
                t.connect_from_current(&after_pred, Term::not(condition));

                t.set_current_block(loop_body)?;
                t.visit_statement(&s.body)?;

                // Back edge.
                let header_pred = t.predicate(header)?;
                t.connect_from_current(&header_pred, Term::tt());
                t.set_current_block(after)
            },
        )
    }

    fn visit_for(&mut self, s: &'u ForStatement) -> Result<(), EncodeError> {
        let body = self.function_body(s.span, "loop")?;
        let header = self.create_block(s.id, "for_header_")?;
        let loop_body = self.create_block(s.body.id(), "for_body_")?;
        let after = self.create_block(body, "")?;
        let post = match &s.loop_expression {
            Some(e) => Some((self.create_block(e.id, "for_post_")?, e)),
            None => None,
        };

        self.nested(
            Jumps::Loop {
                break_to: after,
                continue_to: post.map_or(header, |(p, _)| p),
            },
            |t| {
                if let Some(init) = &s.init {
                    t.visit_statement(init)?;
                }
                let header_pred = t.predicate(header)?;
                t.connect_from_current(&header_pred, Term::tt());
                t.set_current_block(header)?;

                let condition = match &s.condition {
                    Some(c) => t.visit_expression(c)?,
                    None => Term::tt(),
                };
                let body_pred = t.predicate(loop_body)?;
                t.connect_from_current(&body_pred, condition.clone());
                let after_pred = t.predicate(after)?;
                t.connect_from_current(&after_pred, Term::not(condition));

                t.set_current_block(loop_body)?;
                t.visit_statement(&s.body)?;

                if let Some((block, stmt)) = post {
                    let post_pred = t.predicate(block)?;
                    t.connect_from_current(&post_pred, Term::tt());
                    t.set_current_block(block)?;
                    t.visit_expression(&stmt.expression)?;
                }

                // Back edge.
                let header_pred = t.predicate(header)?;
                t.connect_from_current(&header_pred, Term::tt());
                t.set_current_block(after)
            },
        )
    }

    fn visit_break(&mut self, j: &Jump) -> Result<(), EncodeError> {
        let dest = self
            .break_dest
            .ok_or_else(|| EncodeError::at("break outside of a loop", j.span))?;
        self.jump(dest, j, "break_ghost_")
    }

    fn visit_continue(&mut self, j: &Jump) -> Result<(), EncodeError> {
        let dest = self
            .continue_dest
            .ok_or_else(|| EncodeError::at("continue outside of a loop", j.span))?;
        self.jump(dest, j, "continue_ghost_")
    }

    /// Connect to `dest` and continue in a block nothing else reaches.
    fn jump(&mut self, dest: PredicateId, j: &Jump, ghost_prefix: &str) -> Result<(), EncodeError> {
        let dest_pred = self.predicate(dest)?;
        self.connect_from_current(&dest_pred, Term::tt());
        let ghost = self.create_block(j.id, ghost_prefix)?;
        self.set_current_block(ghost)
    }

    fn visit_return(&mut self, r: &'u Return) -> Result<(), EncodeError> {
        let returns = self
            .function
            .as_ref()
            .ok_or_else(|| EncodeError::at("return outside of a function", r.span))?
            .returns
            .clone();
        if let Some(e) = &r.expression {
            let value = self.visit_expression(e)?;
            match returns.as_slice() {
                [single] => self.assign_variable(*single, value)?,
                many => {
                    for id in many {
                        self.ctx.set_unknown_value(*id)?;
                    }
                }
            }
        }
        let exit = if self.scope()?.is_constructor() {
            let dest = self
                .return_dest
                .ok_or_else(|| EncodeError::at("return without an enclosing constructor body", r.span))?;
            self.predicate(dest)?
        } else {
            self.function_summary()?
        };
        self.connect_from_current(&exit, Term::tt());
        let ghost = self.create_block(r.id, "return_ghost_")?;
        self.set_current_block(ghost)
    }

    /// Forget everything an unanalysable call could have changed.
    pub fn erase_knowledge(&mut self) -> Result<(), EncodeError> {
        for id in self.state_variables.clone() {
            self.ctx.set_unknown_value(id)?;
        }
        let scoped = self
            .function
            .as_ref()
            .map(|s| s.variables().collect::<Vec<_>>())
            .unwrap_or_default();
        for id in scoped {
            let reference = self
                .decls
                .get(&id)
                .is_some_and(|d| d.ty.is_reference_or_mapping());
            if reference {
                self.ctx.set_unknown_value(id)?;
            }
        }
        Ok(())
    }

    pub fn assign_variable(&mut self, id: NodeId, value: Term) -> Result<(), EncodeError> {
        let new = self.ctx.increase_index(id)?;
        self.ctx.add_assumption(Term::eq(new, value));
        Ok(())
    }
}
