#![forbid(unsafe_code)]

use std::collections::HashMap;

use chc_ast::{NodeId, TypeName, VariableDeclaration};
use chc_smt::{Sort, Term};

use crate::EncodeError;
use crate::symbolic::{SymbolicVariable, type_constraints};

/// Symbolic state of one source-unit analysis: variables by declaration,
/// encoded expressions by node, and the stack of path assumptions.
#[derive(Debug, Default)]
pub struct EncodingContext {
    variables: HashMap<NodeId, SymbolicVariable>,
    expressions: HashMap<NodeId, Term>,
    frames: Vec<Vec<Term>>,
    fresh_counter: u32,
}

impl EncodingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_variable(&self, id: NodeId) -> bool {
        self.variables.contains_key(&id)
    }

    /// Register `decl` unless it is already known.
    pub fn create_variable(&mut self, decl: &VariableDeclaration) {
        self.variables
            .entry(decl.id)
            .or_insert_with(|| SymbolicVariable::new(format!("{}_{}", decl.name, decl.id), decl.ty.clone()));
    }

    pub fn variable(&self, id: NodeId) -> Result<&SymbolicVariable, EncodeError> {
        self.variables
            .get(&id)
            .ok_or_else(|| EncodeError::new(format!("unknown variable {id}")))
    }

    pub fn variable_mut(&mut self, id: NodeId) -> Result<&mut SymbolicVariable, EncodeError> {
        self.variables
            .get_mut(&id)
            .ok_or_else(|| EncodeError::new(format!("unknown variable {id}")))
    }

    pub fn current_value(&self, id: NodeId) -> Result<Term, EncodeError> {
        Ok(self.variable(id)?.current_value())
    }

    pub fn value_at_index(&self, id: NodeId, index: u32) -> Result<Term, EncodeError> {
        Ok(self.variable(id)?.value_at_index(index))
    }

    pub fn increase_index(&mut self, id: NodeId) -> Result<Term, EncodeError> {
        Ok(self.variable_mut(id)?.increase_index())
    }

    /// Current index of every known variable.
    pub fn indices(&self) -> HashMap<NodeId, u32> {
        self.variables.iter().map(|(id, v)| (*id, v.index())).collect()
    }

    /// Move variables back to the versions in `indices`. New versions keep
    /// counting from where they were.
    pub fn restore_indices(&mut self, indices: &HashMap<NodeId, u32>) {
        for (id, index) in indices {
            if let Some(v) = self.variables.get_mut(id) {
                v.set_index(*index);
            }
        }
    }

    pub fn reset_all_indices(&mut self) {
        for v in self.variables.values_mut() {
            v.reset_index();
        }
    }

    /// New unconstrained version of `id`, within the range of its type.
    pub fn set_unknown_value(&mut self, id: NodeId) -> Result<(), EncodeError> {
        let var = self.variable_mut(id)?;
        let value = var.increase_index();
        let constraint = type_constraints(var.ty(), &value);
        self.add_assumption(constraint);
        Ok(())
    }

    pub fn set_expression(&mut self, id: NodeId, term: Term) {
        self.expressions.insert(id, term);
    }

    pub fn expression(&self, id: NodeId) -> Result<Term, EncodeError> {
        self.expressions
            .get(&id)
            .cloned()
            .ok_or_else(|| EncodeError::new(format!("expression {id} has not been encoded")))
    }

    /// Fresh variable that no SSA version can collide with.
    pub fn fresh(&mut self, hint: &str, sort: Sort) -> Term {
        self.fresh_counter += 1;
        Term::var(format!("{hint}_fresh_{}", self.fresh_counter), sort)
    }

    pub fn fresh_of_type(&mut self, hint: &str, ty: &TypeName) -> Term {
        let value = self.fresh(hint, crate::symbolic::sort_of(ty));
        self.add_assumption(type_constraints(ty, &value));
        value
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Drop the innermost frame and hand back its assumptions.
    pub fn pop_frame(&mut self) -> Vec<Term> {
        self.frames.pop().unwrap_or_default()
    }

    pub fn add_assumption(&mut self, term: Term) {
        if term == Term::tt() {
            return;
        }
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(top) = self.frames.last_mut() {
            top.push(term);
        }
    }

    /// Conjunction of every assumption on the stack.
    pub fn assumptions(&self) -> Term {
        Term::and(self.frames.iter().flatten().cloned())
    }

    pub fn clear_assumptions(&mut self) {
        self.frames.clear();
    }
}
