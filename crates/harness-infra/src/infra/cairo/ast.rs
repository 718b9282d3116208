use super::lexer::Span;
use crate::domain::Felt;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub imports: Vec<Ident>,
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Ident,
    pub decorators: Vec<Ident>,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `name: type`; return lists may omit the name (`-> (felt)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<Ident>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub pointer: bool,
    pub span: Span,
}

impl TypeRef {
    pub fn is_felt(&self) -> bool {
        self.name == "felt" && !self.pointer
    }

    pub fn display(&self) -> String {
        if self.pointer {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Let,
    Tempvar,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return {
        values: ReturnValues,
        span: Span,
    },
    Bind {
        binding: Binding,
        target: Ident,
        ty: Option<TypeRef>,
        value: Expr,
    },
    Unpack {
        targets: Vec<Ident>,
        call: Call,
        span: Span,
    },
    Assert {
        lhs: Expr,
        rhs: Expr,
        span: Span,
    },
    Call(Call),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Return { span, .. } | Stmt::Unpack { span, .. } | Stmt::Assert { span, .. } => {
                *span
            }
            Stmt::Bind { target, value, .. } => target.span.to(value.span()),
            Stmt::Call(call) => call.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValues {
    Tuple(Vec<ReturnValue>),
    /// `return f(...)` forwards the callee's values.
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnValue {
    pub name: Option<Ident>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(Felt, Span),
    ShortString(Felt, Span),
    Var(Ident),
    Neg(Box<Expr>, Span),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call(Call),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span) | Expr::ShortString(_, span) | Expr::Neg(_, span) => *span,
            Expr::Var(ident) => ident.span,
            Expr::Binary { lhs, rhs, .. } => lhs.span().to(rhs.span()),
            Expr::Call(call) => call.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: CallTarget,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Function(Ident),
    StorageRead(Ident),
    StorageWrite(Ident),
}

impl CallTarget {
    pub fn ident(&self) -> &Ident {
        match self {
            CallTarget::Function(ident)
            | CallTarget::StorageRead(ident)
            | CallTarget::StorageWrite(ident) => ident,
        }
    }
}
