#![forbid(unsafe_code)]

//! Programmatic construction of program trees.
//!
//! Ids are handed out from a single counter starting at 1, so a tree built
//! twice with the same sequence of calls is identical.

use crate::*;

#[derive(Debug)]
pub struct AstBuilder {
    next: u32,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Reserve an id, e.g. for a function that is called before it is built.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn var(&mut self, name: &str, ty: TypeName) -> VariableDeclaration {
        VariableDeclaration {
            id: self.next_id(),
            name: name.to_string(),
            ty,
            span: Span::default(),
            value: None,
        }
    }

    pub fn state_var_with(&mut self, name: &str, ty: TypeName, value: Expression) -> VariableDeclaration {
        let mut v = self.var(name, ty);
        v.value = Some(value);
        v
    }

    fn expr(&mut self, ty: Option<TypeName>, kind: ExpressionKind) -> Expression {
        Expression {
            id: self.next_id(),
            span: Span::default(),
            ty,
            kind,
        }
    }

    pub fn bool_lit(&mut self, value: bool) -> Expression {
        self.expr(Some(TypeName::Bool), ExpressionKind::Bool(value))
    }

    pub fn number(&mut self, value: i128) -> Expression {
        self.expr(Some(TypeName::uint256()), ExpressionKind::Number(value))
    }

    pub fn ident(&mut self, decl: &VariableDeclaration) -> Expression {
        self.expr(
            Some(decl.ty.clone()),
            ExpressionKind::Identifier {
                name: decl.name.clone(),
                declaration: Some(decl.id),
            },
        )
    }

    /// Identifier without a declaration (`msg.sender`, `block.number`, ...).
    pub fn global(&mut self, name: &str, ty: TypeName) -> Expression {
        self.expr(
            Some(ty),
            ExpressionKind::Identifier {
                name: name.to_string(),
                declaration: None,
            },
        )
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expression) -> Expression {
        let ty = match op {
            UnaryOp::Not => Some(TypeName::Bool),
            _ => operand.ty.clone(),
        };
        self.expr(
            ty,
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
        let ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => lhs.ty.clone(),
            _ => Some(TypeName::Bool),
        };
        self.expr(
            ty,
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn assign(&mut self, lhs: Expression, rhs: Expression) -> Expression {
        self.assign_op(AssignOp::Assign, lhs, rhs)
    }

    pub fn assign_op(&mut self, op: AssignOp, lhs: Expression, rhs: Expression) -> Expression {
        let ty = lhs.ty.clone();
        self.expr(
            ty,
            ExpressionKind::Assignment {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn conditional(&mut self, condition: Expression, true_expr: Expression, false_expr: Expression) -> Expression {
        let ty = true_expr.ty.clone();
        self.expr(
            ty,
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                true_expr: Box::new(true_expr),
                false_expr: Box::new(false_expr),
            },
        )
    }

    pub fn index(&mut self, base: Expression, index: Expression) -> Expression {
        let ty = match &base.ty {
            Some(TypeName::Mapping { value, .. }) => Some((**value).clone()),
            Some(TypeName::Array { base, .. }) => Some((**base).clone()),
            _ => None,
        };
        self.expr(
            ty,
            ExpressionKind::IndexAccess {
                base: Box::new(base),
                index: Box::new(index),
            },
        )
    }

    pub fn call(&mut self, kind: CallKind, arguments: Vec<Expression>, ty: Option<TypeName>) -> Expression {
        self.expr(ty, ExpressionKind::FunctionCall { kind, arguments })
    }

    pub fn call_internal(&mut self, function: NodeId, arguments: Vec<Expression>, ty: Option<TypeName>) -> Expression {
        self.call(
            CallKind::Internal {
                function: Some(function),
            },
            arguments,
            ty,
        )
    }

    pub fn expr_stmt(&mut self, expression: Expression) -> Statement {
        Statement::Expression(self.expression_statement(expression))
    }

    pub fn expression_statement(&mut self, expression: Expression) -> ExpressionStatement {
        ExpressionStatement {
            id: self.next_id(),
            span: Span::default(),
            expression,
        }
    }

    pub fn assert_(&mut self, condition: Expression) -> Statement {
        let call = self.call(CallKind::Assert, vec![condition], None);
        self.expr_stmt(call)
    }

    pub fn require(&mut self, condition: Expression) -> Statement {
        let call = self.call(CallKind::Require, vec![condition], None);
        self.expr_stmt(call)
    }

    pub fn declare(&mut self, decl: VariableDeclaration, initial_value: Option<Expression>) -> Statement {
        Statement::VariableDeclaration(VariableDeclarationStatement {
            id: self.next_id(),
            span: Span::default(),
            declarations: vec![decl],
            initial_value,
        })
    }

    pub fn block(&mut self, statements: Vec<Statement>) -> Statement {
        Statement::Block(Block {
            id: self.next_id(),
            span: Span::default(),
            statements,
        })
    }

    pub fn if_(&mut self, condition: Expression, true_body: Statement, false_body: Option<Statement>) -> Statement {
        Statement::If(IfStatement {
            id: self.next_id(),
            span: Span::default(),
            condition,
            true_body: Box::new(true_body),
            false_body: false_body.map(Box::new),
        })
    }

    pub fn while_(&mut self, condition: Expression, body: Statement) -> Statement {
        self.loop_(condition, body, false)
    }

    pub fn do_while(&mut self, condition: Expression, body: Statement) -> Statement {
        self.loop_(condition, body, true)
    }

    fn loop_(&mut self, condition: Expression, body: Statement, is_do_while: bool) -> Statement {
        Statement::While(WhileStatement {
            id: self.next_id(),
            span: Span::default(),
            condition,
            body: Box::new(body),
            is_do_while,
        })
    }

    pub fn for_(
        &mut self,
        init: Option<Statement>,
        condition: Option<Expression>,
        loop_expression: Option<Expression>,
        body: Statement,
    ) -> Statement {
        let loop_expression = loop_expression.map(|e| self.expression_statement(e));
        Statement::For(ForStatement {
            id: self.next_id(),
            span: Span::default(),
            init: init.map(Box::new),
            condition,
            loop_expression,
            body: Box::new(body),
        })
    }

    pub fn break_(&mut self) -> Statement {
        Statement::Break(Jump {
            id: self.next_id(),
            span: Span::default(),
        })
    }

    pub fn continue_(&mut self) -> Statement {
        Statement::Continue(Jump {
            id: self.next_id(),
            span: Span::default(),
        })
    }

    pub fn return_(&mut self, expression: Option<Expression>) -> Statement {
        Statement::Return(Return {
            id: self.next_id(),
            span: Span::default(),
            expression,
        })
    }

    pub fn function(
        &mut self,
        name: &str,
        visibility: Visibility,
        parameters: Vec<VariableDeclaration>,
        returns: Vec<VariableDeclaration>,
        body: Statement,
    ) -> FunctionDefinition {
        let id = self.next_id();
        self.function_with_id(id, name, visibility, parameters, returns, body)
    }

    pub fn function_with_id(
        &mut self,
        id: NodeId,
        name: &str,
        visibility: Visibility,
        parameters: Vec<VariableDeclaration>,
        returns: Vec<VariableDeclaration>,
        body: Statement,
    ) -> FunctionDefinition {
        FunctionDefinition {
            id,
            name: name.to_string(),
            kind: FunctionKind::Function,
            visibility,
            span: Span::default(),
            parameters,
            returns,
            body: Some(self.into_block(body)),
        }
    }

    pub fn constructor(&mut self, parameters: Vec<VariableDeclaration>, body: Statement) -> FunctionDefinition {
        let id = self.next_id();
        FunctionDefinition {
            id,
            name: String::new(),
            kind: FunctionKind::Constructor,
            visibility: Visibility::Public,
            span: Span::default(),
            parameters,
            returns: Vec::new(),
            body: Some(self.into_block(body)),
        }
    }

    fn into_block(&mut self, body: Statement) -> Block {
        match body {
            Statement::Block(b) => b,
            other => Block {
                id: self.next_id(),
                span: Span::default(),
                statements: vec![other],
            },
        }
    }

    pub fn contract(
        &mut self,
        name: &str,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        self.contract_of_kind(ContractKind::Contract, name, state_variables, functions)
    }

    pub fn library(
        &mut self,
        name: &str,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        self.contract_of_kind(ContractKind::Library, name, state_variables, functions)
    }

    fn contract_of_kind(
        &mut self,
        kind: ContractKind,
        name: &str,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        ContractDefinition {
            id: self.next_id(),
            name: name.to_string(),
            kind,
            span: Span::default(),
            base_contracts: Vec::new(),
            state_variables,
            functions,
        }
    }

    /// Contract inheriting from `bases`, given most derived first.
    pub fn derived(
        &mut self,
        name: &str,
        bases: &[&ContractDefinition],
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        let mut c = self.contract(name, state_variables, functions);
        for base in bases {
            for id in std::iter::once(base.id).chain(base.base_contracts.iter().copied()) {
                if !c.base_contracts.contains(&id) {
                    c.base_contracts.push(id);
                }
            }
        }
        c
    }

    pub fn unit(&mut self, contracts: Vec<ContractDefinition>) -> SourceUnit {
        SourceUnit {
            id: self.next_id(),
            path: String::new(),
            contracts,
        }
    }
}
