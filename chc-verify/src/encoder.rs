#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chc_ast::{
    ContractDefinition, FunctionDefinition, FunctionKind, NodeId, SourceUnit, Span, VariableDeclaration,
};
use chc_smt::{ChcSolver, Sort, Term};
use tracing::{debug, info_span};

use crate::context::EncodingContext;
use crate::registry::{PredicateId, PredicateRegistry, PredicateRole};
use crate::symbolic::{SymbolicVariable, sort_of};
use crate::{ChcReport, DiagnosticSink, EncodeError};

/// One emitted Horn clause.
#[derive(Clone, Debug, PartialEq)]
pub struct HornRule {
    pub name: String,
    /// Body predicate, absent for facts.
    pub from: Option<String>,
    pub to: String,
    pub term: Term,
}

/// Encodes source units into Horn clauses and checks their assertions.
///
/// Every analysis starts from an empty solver, so rules of an earlier unit
/// never reach the queries of a later one. The block counter is not reset
/// and keeps numbering blocks across units.
pub struct ChcEncoder<S: ChcSolver = Box<dyn ChcSolver>> {
    solver: S,
    block_counter: u32,
    rules: Vec<HornRule>,
}

impl<S: ChcSolver> ChcEncoder<S> {
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            block_counter: 0,
            rules: Vec::new(),
        }
    }

    /// Translate `unit`, query every reachable assertion, and report which
    /// ones are proven safe.
    pub fn analyze(&mut self, unit: &SourceUnit, sink: &mut dyn DiagnosticSink) -> Result<ChcReport, EncodeError> {
        self.run(unit, Some(sink))
    }

    /// Translate `unit` and emit the error rules without querying.
    pub fn encode(&mut self, unit: &SourceUnit) -> Result<ChcReport, EncodeError> {
        self.run(unit, None)
    }

    fn run(&mut self, unit: &SourceUnit, sink: Option<&mut dyn DiagnosticSink>) -> Result<ChcReport, EncodeError> {
        let _span = info_span!("chc", unit = %unit.path).entered();
        self.solver.reset();
        self.rules.clear();
        let mut t = Translator::new(unit, &mut self.solver, &mut self.block_counter);
        t.index_unit();
        t.define_genesis()?;
        t.define_interfaces_and_summaries()?;
        for contract in &unit.contracts {
            t.visit_contract(contract)?;
        }
        let report = t.resolve_targets(sink)?;
        debug!(rules = t.rules.len(), predicates = t.registry.count(), "translation finished");
        self.rules = std::mem::take(&mut t.rules);
        Ok(report)
    }

    /// Rules emitted by the last analysis, in emission order.
    pub fn rules(&self) -> &[HornRule] {
        &self.rules
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn into_solver(self) -> S {
        self.solver
    }
}

/// Owner of call-graph nodes, assertions and verification targets: a
/// function (or the constructor, keyed by the contract id) analysed in the
/// context of one contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Scope {
    pub contract: NodeId,
    pub node: NodeId,
}

pub(crate) struct VerificationTarget {
    pub scope: Scope,
    pub from: Term,
    pub constraints: Term,
    pub error: Term,
}

pub(crate) struct AssertionInfo {
    pub id: NodeId,
    pub code: u32,
    pub span: Span,
    pub contract: String,
    pub function: String,
}

/// Variables and naming of the function being translated. For constructors
/// it covers the whole inlined hierarchy.
#[derive(Clone, Debug)]
pub(crate) struct FunctionScope {
    pub id: NodeId,
    pub body: NodeId,
    pub name: String,
    pub kind: FunctionKind,
    pub parameters: Vec<NodeId>,
    pub returns: Vec<NodeId>,
    pub locals: Vec<NodeId>,
}

impl FunctionScope {
    pub fn of(function: &FunctionDefinition) -> Self {
        Self {
            id: function.id,
            body: function.body.as_ref().map_or(function.id, |b| b.id),
            name: function.name.clone(),
            kind: function.kind,
            parameters: function.parameters.iter().map(|v| v.id).collect(),
            returns: function.returns.iter().map(|v| v.id).collect(),
            locals: function.local_variables().iter().map(|v| v.id).collect(),
        }
    }

    /// Constructor hierarchy, deepest base first; named after the most
    /// derived constructor, or after the contract when there is none.
    pub fn constructor(contract: &ContractDefinition, constructors: &[&FunctionDefinition]) -> Self {
        let (id, body) = match constructors.last() {
            Some(c) => (c.id, c.body.as_ref().map_or(c.id, |b| b.id)),
            None => (contract.id, contract.id),
        };
        let mut scope = Self {
            id,
            body,
            name: String::new(),
            kind: FunctionKind::Constructor,
            parameters: Vec::new(),
            returns: Vec::new(),
            locals: Vec::new(),
        };
        for c in constructors {
            scope.parameters.extend(c.parameters.iter().map(|v| v.id));
            scope.locals.extend(c.local_variables().iter().map(|v| v.id));
        }
        scope
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parameters
            .iter()
            .chain(self.returns.iter())
            .chain(self.locals.iter())
            .copied()
    }
}

pub(crate) struct Translator<'u, 's> {
    pub unit: &'u SourceUnit,
    pub solver: &'s mut dyn ChcSolver,
    pub counter: &'s mut u32,
    pub ctx: EncodingContext,
    pub registry: PredicateRegistry,

    pub decls: HashMap<NodeId, &'u VariableDeclaration>,
    pub functions: HashMap<NodeId, (&'u ContractDefinition, &'u FunctionDefinition)>,
    pub contracts: HashMap<NodeId, &'u ContractDefinition>,

    pub genesis: Option<PredicateId>,
    pub contract: Option<&'u ContractDefinition>,
    pub function: Option<FunctionScope>,
    pub state_variables: Vec<NodeId>,
    pub current_block: Term,
    pub error: SymbolicVariable,

    pub error_predicates: HashMap<NodeId, u32>,
    pub constructor_summary: Option<PredicateId>,
    pub implicit_constructor: Option<PredicateId>,

    pub break_dest: Option<PredicateId>,
    pub continue_dest: Option<PredicateId>,
    /// Where a `return` inside the constructor being inlined continues.
    pub return_dest: Option<PredicateId>,
    pub unknown_call_seen: bool,
    /// Guards of the conditional sub-expressions being encoded.
    pub path_conditions: Vec<Term>,

    pub call_graph: BTreeMap<Scope, BTreeSet<Scope>>,
    pub function_assertions: BTreeMap<Scope, BTreeSet<NodeId>>,
    pub assertions: Vec<AssertionInfo>,
    pub assertion_codes: HashMap<NodeId, u32>,
    pub targets: Vec<VerificationTarget>,
    pub rules: Vec<HornRule>,
}

impl<'u, 's> Translator<'u, 's> {
    pub fn new(unit: &'u SourceUnit, solver: &'s mut dyn ChcSolver, counter: &'s mut u32) -> Self {
        Self {
            unit,
            solver,
            counter,
            ctx: EncodingContext::new(),
            registry: PredicateRegistry::new(),
            decls: HashMap::new(),
            functions: HashMap::new(),
            contracts: HashMap::new(),
            genesis: None,
            contract: None,
            function: None,
            state_variables: Vec::new(),
            current_block: Term::tt(),
            error: SymbolicVariable::new("error", chc_ast::TypeName::uint256()),
            error_predicates: HashMap::new(),
            constructor_summary: None,
            implicit_constructor: None,
            break_dest: None,
            continue_dest: None,
            return_dest: None,
            unknown_call_seen: false,
            path_conditions: Vec::new(),
            call_graph: BTreeMap::new(),
            function_assertions: BTreeMap::new(),
            assertions: Vec::new(),
            assertion_codes: HashMap::new(),
            targets: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn index_unit(&mut self) {
        let unit = self.unit;
        for contract in &unit.contracts {
            self.contracts.insert(contract.id, contract);
            for v in &contract.state_variables {
                self.decls.insert(v.id, v);
            }
            for f in &contract.functions {
                self.functions.insert(f.id, (contract, f));
                for v in f.parameters.iter().chain(f.returns.iter()) {
                    self.decls.insert(v.id, v);
                }
                for v in f.local_variables() {
                    self.decls.insert(v.id, v);
                }
            }
        }
    }

    pub fn define_genesis(&mut self) -> Result<(), EncodeError> {
        let id = self
            .registry
            .create(&mut *self.solver, "genesis".to_string(), Vec::new(), PredicateRole::Genesis);
        self.genesis = Some(id);
        let fact = self.registry.apply(id, Vec::new())?;
        self.add_rule(fact, None, "genesis");
        Ok(())
    }

    pub fn genesis(&self) -> Result<Term, EncodeError> {
        let id = self.genesis.ok_or_else(|| EncodeError::new("genesis predicate not defined"))?;
        self.registry.apply(id, Vec::new())
    }

    /// Interfaces for every contract of every linearization, and a summary
    /// per (contract, function of its linearization).
    pub fn define_interfaces_and_summaries(&mut self) -> Result<(), EncodeError> {
        let unit = self.unit;
        for contract in &unit.contracts {
            for base in self.linearization(contract)? {
                let domain = self.state_sorts(base)?;
                let name = format!("interface_{}_{}", base.name, base.id);
                self.registry.create(
                    &mut *self.solver,
                    name,
                    domain,
                    PredicateRole::Interface { contract: base.id },
                );
                for var in self.state_declarations(base)? {
                    self.ctx.create_variable(var);
                }
                for function in base.functions.iter().filter(|f| !f.is_constructor()) {
                    let domain = self.summary_sort(function, contract)?;
                    let name = format!(
                        "summary_{}_{}",
                        self.unique_prefix(),
                        predicate_name(function.id, contract.id, Some(function))
                    );
                    self.registry.create(
                        &mut *self.solver,
                        name,
                        domain,
                        PredicateRole::Summary {
                            contract: contract.id,
                            function: function.id,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    pub fn unique_prefix(&mut self) -> u32 {
        let n = *self.counter;
        *self.counter += 1;
        n
    }

    pub fn contract(&self) -> Result<&'u ContractDefinition, EncodeError> {
        self.contract.ok_or_else(|| EncodeError::new("no current contract"))
    }

    pub fn scope(&self) -> Result<&FunctionScope, EncodeError> {
        self.function
            .as_ref()
            .ok_or_else(|| EncodeError::new("no current function"))
    }

    /// Call-graph and assertion owner of the code being translated.
    pub fn current_scope(&self) -> Result<Scope, EncodeError> {
        let contract = self.contract()?;
        let scope = self.scope()?;
        Ok(Scope {
            contract: contract.id,
            node: if scope.is_constructor() { contract.id } else { scope.id },
        })
    }

    /// The contract followed by its bases, most derived first.
    pub fn linearization(&self, contract: &'u ContractDefinition) -> Result<Vec<&'u ContractDefinition>, EncodeError> {
        let mut out = vec![contract];
        for id in &contract.base_contracts {
            let base = self.contracts.get(id).copied().ok_or_else(|| {
                EncodeError::at(
                    format!("base contract {id} of `{}` is not in the source unit", contract.name),
                    contract.span,
                )
            })?;
            out.push(base);
        }
        Ok(out)
    }

    pub fn state_declarations(
        &self,
        contract: &'u ContractDefinition,
    ) -> Result<Vec<&'u VariableDeclaration>, EncodeError> {
        Ok(self
            .linearization(contract)?
            .into_iter()
            .flat_map(|c| c.state_variables.iter())
            .collect())
    }

    pub fn state_sorts(&self, contract: &'u ContractDefinition) -> Result<Vec<Sort>, EncodeError> {
        Ok(self
            .state_declarations(contract)?
            .iter()
            .map(|v| sort_of(&v.ty))
            .collect())
    }

    pub fn sort_of_var(&self, id: NodeId) -> Result<Sort, EncodeError> {
        self.decls
            .get(&id)
            .map(|v| sort_of(&v.ty))
            .ok_or_else(|| EncodeError::new(format!("unknown declaration {id}")))
    }

    fn sorts_of(&self, ids: &[NodeId]) -> Result<Vec<Sort>, EncodeError> {
        ids.iter().map(|id| self.sort_of_var(*id)).collect()
    }

    /// `[error, state, inputs, state, inputs, outputs]`, plus locals for
    /// statement blocks.
    pub fn block_sort(&self, scope: &FunctionScope, with_locals: bool) -> Result<Vec<Sort>, EncodeError> {
        let state = self.state_sorts(self.contract()?)?;
        let inputs = self.sorts_of(&scope.parameters)?;
        let mut domain = vec![Sort::Int];
        domain.extend(state.iter().cloned());
        domain.extend(inputs.iter().cloned());
        domain.extend(state);
        domain.extend(inputs);
        domain.extend(self.sorts_of(&scope.returns)?);
        if with_locals {
            domain.extend(self.sorts_of(&scope.locals)?);
        }
        Ok(domain)
    }

    /// `[error, state, inputs, state, outputs]` over the state of `contract`.
    pub fn summary_sort(
        &self,
        function: &FunctionDefinition,
        contract: &'u ContractDefinition,
    ) -> Result<Vec<Sort>, EncodeError> {
        let state = self.state_sorts(contract)?;
        let mut domain = vec![Sort::Int];
        domain.extend(state.iter().cloned());
        domain.extend(function.parameters.iter().map(|v| sort_of(&v.ty)));
        domain.extend(state);
        domain.extend(function.returns.iter().map(|v| sort_of(&v.ty)));
        Ok(domain)
    }

    pub fn constructor_sort(&self) -> Result<Vec<Sort>, EncodeError> {
        let mut domain = vec![Sort::Int];
        domain.extend(self.state_sorts(self.contract()?)?);
        Ok(domain)
    }

    /// Statement block (or function entry block when `node` is the function).
    pub fn create_block(&mut self, node: NodeId, prefix: &str) -> Result<PredicateId, EncodeError> {
        let n = self.unique_prefix();
        let contract = self.contract()?;
        let scope = self
            .function
            .as_ref()
            .ok_or_else(|| EncodeError::new(format!("block for node {node} requested outside of a function")))?;
        let is_entry = node == scope.id;
        let suffix = if is_entry {
            function_prefix(scope.kind, &scope.name)
        } else {
            scope.name.clone()
        };
        let name = format!("block_{n}_{prefix}{suffix}_{node}_{}", contract.id);
        let domain = self.block_sort(scope, !is_entry)?;
        Ok(self
            .registry
            .create(&mut *self.solver, name, domain, PredicateRole::Block { node }))
    }

    pub fn create_contract_predicate(
        &mut self,
        prefix: &str,
        domain: Vec<Sort>,
        role: PredicateRole,
    ) -> Result<PredicateId, EncodeError> {
        let contract = self.contract()?;
        let name = format!("{prefix}_{}_{}", contract.name, contract.id);
        Ok(self.registry.create(&mut *self.solver, name, domain, role))
    }

    pub fn state_at(&self, index: u32) -> Result<Vec<Term>, EncodeError> {
        self.state_variables
            .iter()
            .map(|id| self.ctx.value_at_index(*id, index))
            .collect()
    }

    pub fn current_state(&self) -> Result<Vec<Term>, EncodeError> {
        self.state_variables
            .iter()
            .map(|id| self.ctx.current_value(*id))
            .collect()
    }

    pub fn contract_state_at(&self, contract: &'u ContractDefinition, index: u32) -> Result<Vec<Term>, EncodeError> {
        self.state_declarations(contract)?
            .iter()
            .map(|v| self.ctx.value_at_index(v.id, index))
            .collect()
    }

    fn values(&self, ids: &[NodeId], index: Option<u32>) -> Result<Vec<Term>, EncodeError> {
        ids.iter()
            .map(|id| match index {
                Some(i) => self.ctx.value_at_index(*id, i),
                None => self.ctx.current_value(*id),
            })
            .collect()
    }

    pub fn current_function_variables(&self) -> Result<Vec<Term>, EncodeError> {
        let scope = self.scope()?;
        let mut args = vec![self.error.current_value()];
        args.extend(self.state_at(0)?);
        args.extend(self.values(&scope.parameters, Some(0))?);
        args.extend(self.current_state()?);
        args.extend(self.values(&scope.parameters, None)?);
        args.extend(self.values(&scope.returns, None)?);
        Ok(args)
    }

    pub fn current_block_variables(&self) -> Result<Vec<Term>, EncodeError> {
        let mut args = self.current_function_variables()?;
        args.extend(self.values(&self.scope()?.locals, None)?);
        Ok(args)
    }

    /// Block applied to the current versions of every variable in scope.
    pub fn predicate(&self, block: PredicateId) -> Result<Term, EncodeError> {
        self.registry.apply(block, self.current_block_variables()?)
    }

    /// Index 0 stays the start-of-transaction snapshot; everything in scope
    /// moves to a fresh version.
    pub fn clear_indices(&mut self) -> Result<(), EncodeError> {
        self.ctx.reset_all_indices();
        let mut ids = self.state_variables.clone();
        if let Some(scope) = &self.function {
            ids.extend(scope.variables());
        }
        for id in ids {
            self.ctx.increase_index(id)?;
        }
        Ok(())
    }

    pub fn set_current_block(&mut self, block: PredicateId) -> Result<(), EncodeError> {
        self.enter_block(block, |t| t.current_block_variables())
    }

    /// Start translating inside `block`, with arguments computed after the
    /// indices are cleared.
    pub fn enter_block(
        &mut self,
        block: PredicateId,
        args: impl FnOnce(&Self) -> Result<Vec<Term>, EncodeError>,
    ) -> Result<(), EncodeError> {
        self.ctx.clear_assumptions();
        self.clear_indices()?;
        self.ctx.push_frame();
        let args = args(self)?;
        self.current_block = self.registry.apply(block, args)?;
        Ok(())
    }

    /// `from ∧ assumptions ∧ constraints ⇒ to`.
    pub fn connect_blocks(&mut self, from: &Term, to: &Term, constraints: Term) {
        let body = Term::and([from.clone(), self.ctx.assumptions(), constraints]);
        let from_name = from.relation_name().unwrap_or("true").to_string();
        let to_name = to.relation_name().unwrap_or("false").to_string();
        let name = format!("{from_name}_to_{to_name}");
        self.add_rule(Term::implies(body, to.clone()), Some(from_name), &name);
    }

    pub fn connect_from_current(&mut self, to: &Term, constraints: Term) {
        let from = self.current_block.clone();
        self.connect_blocks(&from, to, constraints);
    }

    pub fn add_rule(&mut self, term: Term, from: Option<String>, name: &str) {
        self.solver.add_rule(&term, name);
        let to = match &term {
            Term::Implies(_, head) => head.relation_name().unwrap_or_default().to_string(),
            other => other.relation_name().unwrap_or_default().to_string(),
        };
        self.rules.push(HornRule {
            name: name.to_string(),
            from,
            to,
            term,
        });
    }

    pub fn interface_of(&self, contract: &'u ContractDefinition) -> Result<Term, EncodeError> {
        let id = self.registry.interface(contract.id)?;
        self.registry.apply(id, self.contract_state_at(contract, 0)?)
    }

    pub fn current_interface(&self) -> Result<Term, EncodeError> {
        let id = self.registry.interface(self.contract()?.id)?;
        self.registry.apply(id, self.current_state()?)
    }

    /// Summary of the current function at its current versions.
    pub fn function_summary(&self) -> Result<Term, EncodeError> {
        let contract = self.contract()?;
        let scope = self.scope()?;
        let mut args = vec![self.error.current_value()];
        args.extend(self.state_at(0)?);
        args.extend(self.values(&scope.parameters, Some(0))?);
        if contract.is_library() {
            args.extend(self.state_at(1)?);
        } else {
            args.extend(self.current_state()?);
        }
        args.extend(self.values(&scope.returns, None)?);
        self.registry
            .apply(self.registry.summary(contract.id, scope.id)?, args)
    }

    pub fn constructor_summary(&self) -> Result<Term, EncodeError> {
        let id = self
            .constructor_summary
            .ok_or_else(|| EncodeError::new("constructor summary not defined"))?;
        let mut args = vec![self.error.current_value()];
        args.extend(self.current_state()?);
        self.registry.apply(id, args)
    }

    pub fn path_condition(&self) -> Term {
        Term::and(self.path_conditions.iter().cloned())
    }

    /// Where failures of the current code are routed.
    pub fn current_summary(&self) -> Result<Term, EncodeError> {
        if self.scope()?.is_constructor() {
            self.constructor_summary()
        } else {
            self.function_summary()
        }
    }
}

/// `<kind>_<name>_` for named functions, `<kind>` otherwise.
pub(crate) fn function_prefix(kind: FunctionKind, name: &str) -> String {
    if name.is_empty() {
        kind.as_str().to_string()
    } else {
        format!("{}_{name}_", kind.as_str())
    }
}

pub(crate) fn predicate_name(node: NodeId, contract: NodeId, function: Option<&FunctionDefinition>) -> String {
    let prefix = function.map_or_else(String::new, |f| function_prefix(f.kind, &f.name));
    format!("{prefix}_{node}_{contract}")
}
