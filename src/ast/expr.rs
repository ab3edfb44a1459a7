//! Expression AST nodes.

use crate::ast::stmt::{Parameter, Stmt};
use crate::ast::types::TypeAnnotation;
use crate::span::Span;

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The dotted name spelled by an identifier/member chain (`a`, `a.b.c`),
    /// or `None` for any other shape.
    pub fn dotted_name(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name.clone()),
            ExprKind::Member { object, name } => {
                let prefix = object.dotted_name()?;
                Some(format!("{}.{}", prefix, name))
            }
            _ => None,
        }
    }
}

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: 42
    IntLiteral(i64),
    /// Float literal: 3.14
    FloatLiteral(f64),
    /// String literal: "hello"
    StringLiteral(String),
    /// Boolean literal: true, false
    BoolLiteral(bool),
    /// Null literal
    Null,

    /// Name reference: foo, this. After module resolution this may be a
    /// dotted global such as `Geometry.PI`.
    Identifier(String),

    /// Binary operation: a + b, a and b
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation: -x, not x
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },

    /// Call by (possibly dotted) name: foo(a), Math.sqrt(x), obj.greet()
    Call { name: String, arguments: Vec<Expr> },

    /// Method call on a computed receiver: items[0].length(), f().go()
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        arguments: Vec<Expr>,
    },

    /// Member access: obj.field
    Member { object: Box<Expr>, name: String },

    /// Index access: xs[i], m["k"]
    Index { object: Box<Expr>, index: Box<Expr> },

    /// List literal: [1, 2, 3]
    List(Vec<Expr>),

    /// Map literal: {"k": v}
    Map(Vec<(Expr, Expr)>),

    /// Tuple literal: (a, b)
    Tuple(Vec<Expr>),

    /// Anonymous function: fn(x) => x * 2
    Lambda {
        params: Vec<Parameter>,
        return_type: Option<TypeAnnotation>,
        body: Vec<Stmt>,
    },

    /// Conditional expression: cond ? a : b
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Object construction: new Point(1, 2)
    New {
        class_name: String,
        arguments: Vec<Expr>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Power
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Subtract => write!(f, "-"),
            BinaryOp::Multiply => write!(f, "*"),
            BinaryOp::Divide => write!(f, "/"),
            BinaryOp::Modulo => write!(f, "%"),
            BinaryOp::Power => write!(f, "**"),
            BinaryOp::Equal => write!(f, "=="),
            BinaryOp::NotEqual => write!(f, "!="),
            BinaryOp::Less => write!(f, "<"),
            BinaryOp::LessEqual => write!(f, "<="),
            BinaryOp::Greater => write!(f, ">"),
            BinaryOp::GreaterEqual => write!(f, ">="),
            BinaryOp::And => write!(f, "and"),
            BinaryOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}
