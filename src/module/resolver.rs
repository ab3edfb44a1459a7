//! Module resolution for import statements.
//!
//! Imports are spliced into a single program. The `core` module is
//! flattened: its declarations become plain globals, hoisted to the top of
//! the program. Every other module is prefixed: its declarations are
//! renamed `Module.member` and its own references to them are rewritten
//! the same way. Inline `module` blocks are prefixed like imports.

use std::collections::{HashMap, HashSet};

use crate::ast::{ImportDecl, ImportKind, Program, Stmt, StmtKind};
use crate::error::ResolveError;
use crate::parser::parse_source;

use super::rename::Renamer;
use super::source::ModuleSource;

/// The module whose members are merged without a prefix.
pub const CORE_MODULE: &str = "core";

/// Statements produced for one statement list: what its imports brought in,
/// and its own (already flattened) statements.
#[derive(Debug, Default)]
struct Spliced {
    imported: Vec<Stmt>,
    own: Vec<Stmt>,
}

impl Spliced {
    fn into_statements(self) -> Vec<Stmt> {
        let mut statements = self.imported;
        statements.extend(self.own);
        statements
    }
}

/// Module resolver that handles import resolution.
pub struct ModuleResolver<'a> {
    source: &'a dyn ModuleSource,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(source: &'a dyn ModuleSource) -> Self {
        Self { source }
    }

    /// Resolve all imports of `program`, whose own module name is `root`.
    ///
    /// The returned program contains, in order:
    /// 1. everything brought in from `core`
    /// 2. all other imported declarations
    /// 3. the program's own statements, with imports removed
    pub fn resolve(&self, program: Program, root: &str) -> Result<Program, ResolveError> {
        let mut visited = HashSet::new();
        visited.insert(root.to_lowercase());
        self.resolve_with(program, &mut visited)
    }

    /// Like `resolve`, sharing a visited set across calls (the REPL resolves
    /// each entry separately).
    pub fn resolve_with(
        &self,
        program: Program,
        visited: &mut HashSet<String>,
    ) -> Result<Program, ResolveError> {
        let mut hoisted = Vec::new();
        let spliced = self.splice(program.statements, visited, &mut hoisted)?;
        hoisted.extend(spliced.into_statements());
        tracing::debug!(
            statements = hoisted.len(),
            modules = visited.len(),
            "imports resolved"
        );
        Ok(Program::new(hoisted))
    }

    fn splice(
        &self,
        statements: Vec<Stmt>,
        visited: &mut HashSet<String>,
        hoisted: &mut Vec<Stmt>,
    ) -> Result<Spliced, ResolveError> {
        let mut spliced = Spliced::default();
        let mut renames = HashMap::new();

        for stmt in statements {
            let stmt = unwrap_export(stmt);
            match stmt.kind {
                StmtKind::Import(import) => {
                    self.import(import, visited, hoisted, &mut spliced, &mut renames)?
                }
                StmtKind::Module(decl) => {
                    let inner = self.splice(decl.body, visited, hoisted)?;
                    spliced.imported.extend(inner.imported);
                    spliced.own.extend(prefix(&decl.name, inner.own));
                }
                kind => spliced.own.push(Stmt::new(kind, stmt.span)),
            }
        }

        // From-imports: the importer's references to the listed names
        if !renames.is_empty() {
            Renamer::new(&renames).rename_program(&mut spliced.own);
        }
        Ok(spliced)
    }

    fn import(
        &self,
        import: ImportDecl,
        visited: &mut HashSet<String>,
        hoisted: &mut Vec<Stmt>,
        spliced: &mut Spliced,
        renames: &mut HashMap<String, String>,
    ) -> Result<(), ResolveError> {
        let key = import.module.to_lowercase();
        let is_core = key == CORE_MODULE;

        if let ImportKind::From(names) = &import.kind {
            if !is_core {
                for name in names {
                    renames.insert(name.clone(), format!("{}.{}", import.module, name));
                }
            }
        }

        if !visited.insert(key) {
            tracing::debug!(module = %import.module, "module already imported");
            return Ok(());
        }

        let Some(text) = self.source.load(&import.module)? else {
            tracing::warn!(
                module = %import.module,
                line = import.span.line,
                "module not found, import dropped"
            );
            return Ok(());
        };

        let program = parse_source(&text).map_err(|source| ResolveError::Parse {
            module: import.module.clone(),
            source,
        })?;
        tracing::debug!(module = %import.module, "module loaded");

        let module = self.splice(program.statements, visited, hoisted)?;

        if is_core {
            hoisted.extend(module.into_statements());
            return Ok(());
        }

        let name = match &import.kind {
            ImportKind::Alias(alias) => alias.clone(),
            ImportKind::Whole | ImportKind::From(_) => import.module.clone(),
        };
        spliced.imported.extend(module.imported);
        spliced.imported.extend(prefix(&name, module.own));
        Ok(())
    }
}

/// Rename a module's own declarations to `name.member` and rewrite its
/// references to them.
fn prefix(name: &str, mut statements: Vec<Stmt>) -> Vec<Stmt> {
    let names: HashMap<String, String> = statements
        .iter()
        .filter_map(Stmt::declared_name)
        .map(|member| (member.to_string(), format!("{}.{}", name, member)))
        .collect();

    Renamer::new(&names).rename_program(&mut statements);

    for stmt in &mut statements {
        match &mut stmt.kind {
            StmtKind::VarDecl { name: member, .. } => rename_member(member, &names),
            StmtKind::Function(decl) => rename_member(&mut decl.name, &names),
            StmtKind::Class(decl) => rename_member(&mut decl.name, &names),
            _ => {}
        }
    }
    statements
}

fn rename_member(member: &mut String, names: &HashMap<String, String>) {
    if let Some(renamed) = names.get(member.as_str()) {
        *member = renamed.clone();
    }
}

fn unwrap_export(stmt: Stmt) -> Stmt {
    match stmt.kind {
        StmtKind::Export(inner) => unwrap_export(*inner),
        _ => stmt,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::ExprKind;
    use crate::module::{FileSource, MemorySource};

    fn resolve(source: &MemorySource, main: &str) -> Program {
        let program = parse_source(main).unwrap();
        ModuleResolver::new(source).resolve(program, "main").unwrap()
    }

    fn declared(program: &Program) -> Vec<String> {
        program
            .statements
            .iter()
            .filter_map(|s| s.declared_name().map(str::to_string))
            .collect()
    }

    fn call_names(program: &Program) -> Vec<String> {
        fn walk(expr: &crate::ast::Expr, out: &mut Vec<String>) {
            match &expr.kind {
                ExprKind::Call { name, arguments } => {
                    out.push(name.clone());
                    arguments.iter().for_each(|a| walk(a, out));
                }
                ExprKind::Binary { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
                _ => {}
            }
        }
        fn stmts(statements: &[Stmt], out: &mut Vec<String>) {
            for stmt in statements {
                match &stmt.kind {
                    StmtKind::Expression(e) | StmtKind::Return(Some(e)) => walk(e, out),
                    StmtKind::VarDecl {
                        initializer: Some(e),
                        ..
                    } => walk(e, out),
                    StmtKind::Function(decl) => stmts(&decl.body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        stmts(&program.statements, &mut out);
        out
    }

    const GEOMETRY: &str = r#"
        const PI = 3.14
        function square(x: Float) -> Float
            return x * x
        end function
        function area(r: Float) -> Float
            return PI * square(r)
        end function
    "#;

    #[test]
    fn whole_import_prefixes_declarations_and_internal_calls() {
        let source = MemorySource::new().with("Geometry", GEOMETRY);
        let program = resolve(&source, "import Geometry\nprint(Geometry.area(2.0))");

        assert_eq!(
            declared(&program),
            vec!["Geometry.PI", "Geometry.square", "Geometry.area"]
        );
        assert_eq!(
            call_names(&program),
            vec!["Geometry.square", "print", "Geometry.area"]
        );
    }

    #[test]
    fn internal_references_to_constants_are_prefixed() {
        let source = MemorySource::new().with("Geometry", GEOMETRY);
        let program = resolve(&source, "import Geometry");
        let StmtKind::Function(area) = &program.statements[2].kind else {
            panic!("expected a function");
        };
        let StmtKind::Return(Some(expr)) = &area.body[0].kind else {
            panic!("expected a return");
        };
        let ExprKind::Binary { left, .. } = &expr.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(left.kind, ExprKind::Identifier("Geometry.PI".to_string()));
    }

    #[test]
    fn parameters_shadow_module_members() {
        let source = MemorySource::new().with(
            "M",
            "var x = 1\nfunction f(x)\n return x\nend function\nfunction g()\n return x\nend function",
        );
        let program = resolve(&source, "import M");

        let body = |i: usize| match &program.statements[i].kind {
            StmtKind::Function(decl) => decl.body[0].clone(),
            _ => panic!("expected a function"),
        };
        let returned = |stmt: Stmt| match stmt.kind {
            StmtKind::Return(Some(e)) => e.kind,
            _ => panic!("expected a return"),
        };
        assert_eq!(returned(body(1)), ExprKind::Identifier("x".to_string()));
        assert_eq!(returned(body(2)), ExprKind::Identifier("M.x".to_string()));
    }

    #[test]
    fn alias_import_uses_the_alias_as_prefix() {
        let source = MemorySource::new().with("Geometry", GEOMETRY);
        let program = resolve(&source, "import Geometry as G\nprint(G.area(1.0))");
        assert_eq!(declared(&program), vec!["G.PI", "G.square", "G.area"]);
    }

    #[test]
    fn from_import_rewrites_importer_references() {
        let source = MemorySource::new().with("Geometry", GEOMETRY);
        let program = resolve(&source, "from Geometry import area\nvar a = area(2.0)");
        assert_eq!(
            call_names(&program),
            vec!["Geometry.square", "Geometry.area"]
        );
    }

    #[test]
    fn core_is_flattened_and_hoisted() {
        let source = MemorySource::new()
            .with("core", "function double(x)\n return x * 2\nend function")
            .with("Util", "import core\nfunction quad(x)\n return double(double(x))\nend function");
        let program = resolve(&source, "import Util\nprint(Util.quad(1))");

        assert_eq!(declared(&program), vec!["double", "Util.quad"]);
        assert_eq!(
            call_names(&program),
            vec!["double", "double", "print", "Util.quad"]
        );
    }

    #[test]
    fn diamond_imports_are_spliced_once() {
        let source = MemorySource::new()
            .with("core", "function id(x)\n return x\nend function")
            .with("A", "import core\nfunction a()\n return id(1)\nend function")
            .with("B", "import core\nfunction b()\n return id(2)\nend function");
        let program = resolve(&source, "import A\nimport B\nimport core");
        assert_eq!(declared(&program), vec!["id", "A.a", "B.b"]);
    }

    #[test]
    fn missing_module_is_dropped() {
        let source = MemorySource::new();
        let program = resolve(&source, "import Nowhere\nvar x = 1");
        assert_eq!(declared(&program), vec!["x"]);
    }

    #[test]
    fn parse_errors_in_imports_are_fatal() {
        let source = MemorySource::new().with("Broken", "function (");
        let program = parse_source("import Broken").unwrap();
        let err = ModuleResolver::new(&source)
            .resolve(program, "main")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse { ref module, .. } if module == "Broken"));
    }

    #[test]
    fn inline_modules_are_flattened_with_nested_prefixes() {
        let main = r#"
            module Outer
                module Inner
                    function f()
                        return 1
                    end function
                end module
                function g()
                    return Inner.f()
                end function
            end module
            print(Outer.g())
        "#;
        let program = resolve(&MemorySource::new(), main);
        assert_eq!(declared(&program), vec!["Outer.Inner.f", "Outer.g"]);
        assert_eq!(
            call_names(&program),
            vec!["Outer.Inner.f", "print", "Outer.g"]
        );
    }

    #[test]
    fn classes_and_constructors_are_prefixed() {
        let source = MemorySource::new().with(
            "Shapes",
            "class Point\n var x = 0\nend class\nfunction origin() -> Point\n return new Point()\nend function",
        );
        let program = resolve(&source, "import Shapes\nvar p = Shapes.origin()");
        assert_eq!(declared(&program), vec!["Shapes.Point", "Shapes.origin", "p"]);

        let StmtKind::Function(origin) = &program.statements[1].kind else {
            panic!("expected a function");
        };
        assert_eq!(
            origin.return_type.as_ref().map(|t| t.to_string()),
            Some("Shapes.Point".to_string())
        );
        let StmtKind::Return(Some(expr)) = &origin.body[0].kind else {
            panic!("expected a return");
        };
        assert!(matches!(&expr.kind, ExprKind::New { class_name, .. } if class_name == "Shapes.Point"));
    }

    #[test]
    fn resolves_modules_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("geometry.tn"), GEOMETRY).unwrap();
        let source = FileSource::new(vec![dir.path().to_path_buf()]);

        let program = parse_source("import Geometry").unwrap();
        let program = ModuleResolver::new(&source).resolve(program, "main").unwrap();
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn the_root_module_is_never_reimported() {
        let source = MemorySource::new().with("Main", "var y = 2");
        let program = resolve(&source, "import main\nvar x = 1");
        assert_eq!(declared(&program), vec!["x"]);
    }
}
