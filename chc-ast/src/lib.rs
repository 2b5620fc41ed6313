#![forbid(unsafe_code)]

//! Program tree consumed by the CHC encoder.
//!
//! The tree is produced by an external front end (parser + type checker) and
//! handed over either in memory or as JSON. Every node that can own a
//! predicate carries a [`NodeId`] that is unique within its [`SourceUnit`].

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

pub mod build;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

pub fn span(offset: usize, len: usize) -> Span {
    Span { offset, len }
}

impl From<Span> for SourceSpan {
    fn from(s: Span) -> Self {
        SourceSpan::new(s.offset.into(), s.len)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: NodeId,
    #[serde(default)]
    pub path: String,
    pub contracts: Vec<ContractDefinition>,
}

impl SourceUnit {
    pub fn contract(&self, id: NodeId) -> Option<&ContractDefinition> {
        self.contracts.iter().find(|c| c.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Contract,
    Library,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractDefinition {
    pub id: NodeId,
    pub name: String,
    pub kind: ContractKind,
    #[serde(default)]
    pub span: Span,
    /// C3 linearization without the contract itself, most derived first.
    #[serde(default)]
    pub base_contracts: Vec<NodeId>,
    #[serde(default)]
    pub state_variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub functions: Vec<FunctionDefinition>,
}

impl ContractDefinition {
    pub fn is_library(&self) -> bool {
        self.kind == ContractKind::Library
    }

    pub fn constructor(&self) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.is_constructor())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Constructor => "constructor",
            FunctionKind::Fallback => "fallback",
            FunctionKind::Receive => "receive",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub parameters: Vec<VariableDeclaration>,
    #[serde(default)]
    pub returns: Vec<VariableDeclaration>,
    pub body: Option<Block>,
}

impl FunctionDefinition {
    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn is_public(&self) -> bool {
        matches!(self.visibility, Visibility::Public | Visibility::External)
    }

    pub fn is_implemented(&self) -> bool {
        self.body.is_some()
    }

    /// What tells overloads apart: kind, name and parameter types.
    pub fn signature(&self) -> (FunctionKind, &str, Vec<&TypeName>) {
        (self.kind, &self.name, self.parameters.iter().map(|p| &p.ty).collect())
    }

    /// Variables introduced by declaration statements anywhere in the body,
    /// in lexical order.
    pub fn local_variables(&self) -> Vec<&VariableDeclaration> {
        let mut out = Vec::new();
        if let Some(body) = &self.body {
            for s in &body.statements {
                collect_locals(s, &mut out);
            }
        }
        out
    }
}

fn collect_locals<'a>(stmt: &'a Statement, out: &mut Vec<&'a VariableDeclaration>) {
    match stmt {
        Statement::Block(b) => {
            for s in &b.statements {
                collect_locals(s, out);
            }
        }
        Statement::VariableDeclaration(d) => out.extend(d.declarations.iter()),
        Statement::If(i) => {
            collect_locals(&i.true_body, out);
            if let Some(f) = &i.false_body {
                collect_locals(f, out);
            }
        }
        Statement::While(w) => collect_locals(&w.body, out),
        Statement::For(f) => {
            if let Some(init) = &f.init {
                collect_locals(init, out);
            }
            collect_locals(&f.body, out);
        }
        Statement::Expression(_)
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Return(_) => {}
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeName,
    #[serde(default)]
    pub span: Span,
    /// Initializer of a state variable.
    #[serde(default)]
    pub value: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Bool,
    Uint { bits: u16 },
    Int { bits: u16 },
    Address,
    FixedBytes { size: u8 },
    String,
    Bytes,
    Mapping { key: Box<TypeName>, value: Box<TypeName> },
    Array { base: Box<TypeName>, length: Option<u64> },
}

impl TypeName {
    pub fn uint256() -> Self {
        TypeName::Uint { bits: 256 }
    }

    pub fn mapping(key: TypeName, value: TypeName) -> Self {
        TypeName::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn is_reference_or_mapping(&self) -> bool {
        matches!(
            self,
            TypeName::String | TypeName::Bytes | TypeName::Mapping { .. } | TypeName::Array { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub statements: Vec<Statement>,
}

impl Block {
    /// Whether a `return` appears anywhere in the block.
    pub fn has_return(&self) -> bool {
        self.statements.iter().any(Statement::has_return)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block(Block),
    VariableDeclaration(VariableDeclarationStatement),
    Expression(ExpressionStatement),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Break(Jump),
    Continue(Jump),
    Return(Return),
}

impl Statement {
    pub fn has_return(&self) -> bool {
        match self {
            Statement::Return(_) => true,
            Statement::Block(b) => b.has_return(),
            Statement::If(i) => i.true_body.has_return() || i.false_body.as_ref().is_some_and(|f| f.has_return()),
            Statement::While(w) => w.body.has_return(),
            Statement::For(f) => f.body.has_return(),
            Statement::VariableDeclaration(_)
            | Statement::Expression(_)
            | Statement::Break(_)
            | Statement::Continue(_) => false,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Statement::Block(b) => b.id,
            Statement::VariableDeclaration(s) => s.id,
            Statement::Expression(s) => s.id,
            Statement::If(s) => s.id,
            Statement::While(s) => s.id,
            Statement::For(s) => s.id,
            Statement::Break(s) | Statement::Continue(s) => s.id,
            Statement::Return(s) => s.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::Block(b) => b.span,
            Statement::VariableDeclaration(s) => s.span,
            Statement::Expression(s) => s.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::For(s) => s.span,
            Statement::Break(s) | Statement::Continue(s) => s.span,
            Statement::Return(s) => s.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarationStatement {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub declarations: Vec<VariableDeclaration>,
    pub initial_value: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub expression: Expression,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub condition: Expression,
    pub true_body: Box<Statement>,
    pub false_body: Option<Box<Statement>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub condition: Expression,
    pub body: Box<Statement>,
    #[serde(default)]
    pub is_do_while: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    pub loop_expression: Option<ExpressionStatement>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub expression: Option<Expression>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    /// Type assigned by the type checker, when known.
    #[serde(default)]
    pub ty: Option<TypeName>,
    pub kind: ExpressionKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Bool(bool),
    Number(i128),
    Identifier {
        name: String,
        declaration: Option<NodeId>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Assignment {
        op: AssignOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },
    IndexAccess {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    FunctionCall {
        kind: CallKind,
        arguments: Vec<Expression>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Assert,
    Require,
    /// Call to a function of the same contract hierarchy or of a library.
    Internal {
        function: Option<NodeId>,
    },
    TypeConversion,

    External,
    DelegateCall,
    BareCall,
    BareCallCode,
    BareDelegateCall,
    BareStaticCall,
    Creation,
    Keccak256,
    EcRecover,
    Sha256,
    Ripemd160,
    BlockHash,
    AddMod,
    MulMod,
}

impl CallKind {
    /// Calls whose effect on the caller's state cannot be analysed.
    pub fn is_unknown(&self) -> bool {
        !matches!(
            self,
            CallKind::Assert | CallKind::Require | CallKind::Internal { .. } | CallKind::TypeConversion
        )
    }
}
