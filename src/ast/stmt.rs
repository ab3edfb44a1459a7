//! Statement AST nodes.

use crate::ast::expr::Expr;
use crate::ast::types::TypeAnnotation;
use crate::span::Span;

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The name this statement declares at its own level, if any.
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            StmtKind::VarDecl { name, .. } => Some(name),
            StmtKind::Function(decl) => Some(&decl.name),
            StmtKind::Class(decl) => Some(&decl.name),
            StmtKind::Module(decl) => Some(&decl.name),
            StmtKind::Export(inner) => inner.declared_name(),
            _ => None,
        }
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression statement
    Expression(Expr),

    /// Variable declaration: var x: Int = 1, const LIMIT = 3
    VarDecl {
        name: String,
        constant: bool,
        type_annotation: Option<TypeAnnotation>,
        initializer: Option<Expr>,
    },

    /// Assignment to a name, member or index: x = 1, p.x = 1, xs[0] = 1
    Assign { target: Expr, value: Expr },

    /// Nested block with its own scope
    Block(Vec<Stmt>),

    /// if c then ... else ... end if (`elif` nests in the else branch)
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },

    /// while c do ... end while
    While { condition: Expr, body: Vec<Stmt> },

    /// for each x in xs do ... end for
    ForEach {
        variable: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },

    /// for i in a .. b do ... end for (end exclusive)
    ForRange {
        variable: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },

    Function(FunctionDecl),

    /// Class or contract declaration
    Class(ClassDecl),

    /// Inline module: module M ... end module
    Module(ModuleDecl),

    Return(Option<Expr>),

    Break,

    Continue,

    /// try ... catch e ... finally ... end try
    Try {
        body: Vec<Stmt>,
        catch_var: Option<String>,
        catch_block: Option<Vec<Stmt>>,
        finally_block: Option<Vec<Stmt>>,
    },

    Throw(Expr),

    Import(ImportDecl),

    /// export <declaration>
    Export(Box<Stmt>),
}

/// How an import splices the module into the importer.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    /// import M
    Whole,
    /// import M as A
    Alias(String),
    /// from M import a, b
    From(Vec<String>),
}

/// Import declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub module: String,
    pub kind: ImportKind,
    pub span: Span,
}

/// Function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Function parameter. Unannotated parameters are `Any`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<TypeAnnotation>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Contract,
}

/// Class or contract declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub kind: ClassKind,
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub span: Span,
}

/// Field declaration in a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub constant: bool,
    pub type_annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

/// Inline module declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A complete program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
