//! Symbols and the scope-chain symbol table used by the analyzer.

use std::collections::HashMap;

use crate::error::SemanticError;
use crate::span::Span;
use crate::types::type_repr::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Const,
    Function,
    Class,
    Contract,
    Module,
    Parameter,
}

impl SymbolKind {
    /// Kinds whose binding can be changed by assignment.
    pub fn is_assignable(self) -> bool {
        matches!(self, SymbolKind::Var | SymbolKind::Parameter)
    }

    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Var | SymbolKind::Const | SymbolKind::Parameter
        )
    }

    pub fn is_class(self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Contract)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SymbolKind::Var => "variable",
            SymbolKind::Const => "constant",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Contract => "contract",
            SymbolKind::Module => "module",
            SymbolKind::Parameter => "parameter",
        };
        write!(f, "{}", name)
    }
}

/// A named entity. Classes, contracts and modules own the scope holding
/// their members; classes also remember their parent's name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub child_scope: Option<Box<Scope>>,
    pub parent: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            child_scope: None,
            parent: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.child_scope = Some(Box::new(scope));
        self
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent = parent;
        self
    }
}

/// One level of the scope chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Insert or replace a symbol without the redeclaration check.
    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Stack of scopes, innermost last. Index 0 is the global scope and is
/// never popped.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn exit_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Enter an existing scope, such as a class body.
    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    /// Declare in the innermost scope. Shadowing an outer name is fine;
    /// a second declaration in the same scope is not.
    pub fn declare(&mut self, symbol: Symbol, span: Span) -> Result<(), SemanticError> {
        let last = self.scopes.len() - 1;
        let scope = &mut self.scopes[last];
        if scope.contains(&symbol.name) {
            return Err(SemanticError::Redeclaration(symbol.name, span));
        }
        scope.insert(symbol);
        Ok(())
    }

    /// Replace a symbol in the innermost scope that holds it.
    pub fn update(&mut self, symbol: Symbol) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains(&symbol.name) {
                scope.insert(symbol);
                return;
            }
        }
        let last = self.scopes.len() - 1;
        self.scopes[last].insert(symbol);
    }

    pub fn lookup_current(&self, name: &str) -> Option<&Symbol> {
        self.current().get(name)
    }

    /// Resolve a name from the innermost scope outward. Dotted names are
    /// tried verbatim first (flattened module members are stored that way)
    /// and then by descending into the child scope of the longest prefix
    /// that names a class, contract or module.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        if let Some(symbol) = self.lookup_exact(name) {
            return Some(symbol);
        }
        if !name.contains('.') {
            return None;
        }

        let segments: Vec<&str> = name.split('.').collect();
        for split in (1..segments.len()).rev() {
            let prefix = segments[..split].join(".");
            if let Some(owner) = self.lookup_exact(&prefix) {
                if let Some(found) = self.descend(owner, &segments[split..]) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn lookup_exact(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Resolve a plain name, also returning the index of the scope that
    /// holds it (0 is global).
    pub fn lookup_with_depth(&self, name: &str) -> Option<(usize, &Symbol)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.get(name).map(|symbol| (depth, symbol)))
    }

    fn descend<'a>(&'a self, owner: &'a Symbol, path: &[&str]) -> Option<&'a Symbol> {
        let (first, rest) = path.split_first()?;
        let found = self.member(owner, first)?;
        if rest.is_empty() {
            Some(found)
        } else {
            self.descend(found, rest)
        }
    }

    /// A member of a class/contract/module, walking the parent class chain.
    pub fn member<'a>(&'a self, owner: &'a Symbol, name: &str) -> Option<&'a Symbol> {
        let mut current = owner;
        // Bounded walk so that a cyclic `extends` cannot loop forever.
        for _ in 0..64 {
            if let Some(found) = current.child_scope.as_ref().and_then(|s| s.get(name)) {
                return Some(found);
            }
            let parent = current.parent.as_deref()?;
            current = self.lookup_exact(parent)?;
        }
        None
    }

    /// True when class `child` is `ancestor` or inherits from it.
    pub fn is_subclass(&self, child: &str, ancestor: &str) -> bool {
        let mut current = child.to_string();
        for _ in 0..64 {
            if current == ancestor {
                return true;
            }
            match self.lookup_exact(&current).and_then(|s| s.parent.clone()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::default()
    }

    #[test]
    fn shadowing_outer_scope_is_allowed() {
        let mut table = SymbolTable::new();
        table
            .declare(Symbol::new("x", SymbolKind::Var, Type::Int), span())
            .unwrap();
        table.enter_scope();
        table
            .declare(Symbol::new("x", SymbolKind::Var, Type::String), span())
            .unwrap();
        assert_eq!(table.lookup("x").map(|s| &s.ty), Some(&Type::String));
        table.exit_scope();
        assert_eq!(table.lookup("x").map(|s| &s.ty), Some(&Type::Int));
    }

    #[test]
    fn redeclaring_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        table
            .declare(Symbol::new("x", SymbolKind::Var, Type::Int), span())
            .unwrap();
        let err = table
            .declare(Symbol::new("x", SymbolKind::Const, Type::Int), span())
            .unwrap_err();
        assert!(matches!(err, SemanticError::Redeclaration(name, _) if name == "x"));
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut table = SymbolTable::new();
        assert!(table.exit_scope().is_none());
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn dotted_lookup_descends_child_scopes_and_parents() {
        let mut table = SymbolTable::new();

        let mut animal_scope = Scope::new();
        animal_scope.insert(Symbol::new(
            "speak",
            SymbolKind::Function,
            Type::Function(vec![], Box::new(Type::String)),
        ));
        table
            .declare(
                Symbol::new("Animal", SymbolKind::Class, Type::named("Animal"))
                    .with_scope(animal_scope),
                span(),
            )
            .unwrap();

        let mut dog_scope = Scope::new();
        dog_scope.insert(Symbol::new("name", SymbolKind::Var, Type::String));
        table
            .declare(
                Symbol::new("Dog", SymbolKind::Class, Type::named("Dog"))
                    .with_scope(dog_scope)
                    .with_parent(Some("Animal".to_string())),
                span(),
            )
            .unwrap();

        assert_eq!(table.lookup("Dog.name").map(|s| s.kind), Some(SymbolKind::Var));
        assert_eq!(
            table.lookup("Dog.speak").map(|s| s.kind),
            Some(SymbolKind::Function)
        );
        assert!(table.lookup("Dog.fly").is_none());
        assert!(table.is_subclass("Dog", "Animal"));
        assert!(!table.is_subclass("Animal", "Dog"));
    }

    #[test]
    fn flattened_names_resolve_verbatim() {
        let mut table = SymbolTable::new();
        table
            .declare(
                Symbol::new("Geometry.PI", SymbolKind::Const, Type::Float),
                span(),
            )
            .unwrap();
        assert_eq!(table.lookup("Geometry.PI").map(|s| &s.ty), Some(&Type::Float));
    }
}
