#![forbid(unsafe_code)]

use std::collections::HashMap;

use chc_ast::NodeId;
use chc_smt::{ChcSolver, Relation, Sort, Term};
use tracing::debug;

use crate::EncodeError;

/// Stable handle into the predicate arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredicateId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredicateRole {
    Genesis,
    Interface { contract: NodeId },
    Summary { contract: NodeId, function: NodeId },
    ConstructorSummary { contract: NodeId },
    ImplicitConstructor { contract: NodeId },
    ConstructorExit { contract: NodeId },
    Error { contract: NodeId },
    Block { node: NodeId },
}

#[derive(Clone, Debug)]
pub struct Predicate {
    pub name: String,
    pub domain: Vec<Sort>,
    pub role: PredicateRole,
}

impl Predicate {
    pub fn relation(&self) -> Relation {
        Relation::new(self.name.clone(), self.domain.clone())
    }
}

#[derive(Debug, Default)]
pub struct PredicateRegistry {
    predicates: Vec<Predicate>,
    by_name: HashMap<String, PredicateId>,
    interfaces: HashMap<NodeId, PredicateId>,
    summaries: HashMap<(NodeId, NodeId), PredicateId>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.predicates.len()
    }

    /// Declare a predicate with the solver. A name that is already taken
    /// returns the existing handle.
    pub fn create(
        &mut self,
        solver: &mut dyn ChcSolver,
        name: String,
        domain: Vec<Sort>,
        role: PredicateRole,
    ) -> PredicateId {
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = PredicateId(self.predicates.len() as u32);
        let predicate = Predicate { name, domain, role };
        debug!(predicate = %predicate.name, role = ?predicate.role, arity = predicate.domain.len(), "create predicate");
        solver.register_relation(&predicate.relation());
        self.by_name.insert(predicate.name.clone(), id);
        match role {
            PredicateRole::Interface { contract } => {
                self.interfaces.insert(contract, id);
            }
            PredicateRole::Summary { contract, function } => {
                self.summaries.insert((contract, function), id);
            }
            _ => {}
        }
        self.predicates.push(predicate);
        id
    }

    pub fn get(&self, id: PredicateId) -> Result<&Predicate, EncodeError> {
        self.predicates
            .get(id.0 as usize)
            .ok_or_else(|| EncodeError::new(format!("unknown predicate handle {}", id.0)))
    }

    pub fn interface(&self, contract: NodeId) -> Result<PredicateId, EncodeError> {
        self.interfaces
            .get(&contract)
            .copied()
            .ok_or_else(|| EncodeError::new(format!("no interface predicate for contract {contract}")))
    }

    pub fn summary(&self, contract: NodeId, function: NodeId) -> Result<PredicateId, EncodeError> {
        self.summaries.get(&(contract, function)).copied().ok_or_else(|| {
            EncodeError::new(format!(
                "no summary predicate for function {function} in contract {contract}"
            ))
        })
    }

    /// Apply a predicate to arguments, checking the arity.
    pub fn apply(&self, id: PredicateId, args: Vec<Term>) -> Result<Term, EncodeError> {
        let p = self.get(id)?;
        if p.domain.len() != args.len() {
            return Err(EncodeError::new(format!(
                "predicate {} expects {} arguments, got {}",
                p.name,
                p.domain.len(),
                args.len()
            )));
        }
        Ok(Term::app(p.name.clone(), args))
    }
}
