//! Type system for Tern: types, symbols and the semantic analyzer.

pub mod checker;
pub mod symbol;
pub mod type_repr;

pub use checker::{Analyzer, TypeAnnotations};
pub use symbol::{Scope, Symbol, SymbolKind, SymbolTable};
pub use type_repr::Type;
