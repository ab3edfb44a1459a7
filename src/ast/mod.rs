//! Abstract Syntax Tree for Tern.

pub mod expr;
pub mod stmt;
pub mod types;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{
    ClassDecl, ClassKind, FieldDecl, FunctionDecl, ImportDecl, ImportKind, ModuleDecl, Parameter,
    Program, Stmt, StmtKind,
};
pub use types::{TypeAnnotation, TypeKind};
