//! Tern: a small statically-checked scripting language.
//!
//! Source goes through a fixed pipeline:
//!
//! 1. **parse**: `lexer` + `parser` produce an AST
//! 2. **resolve**: `module` splices imported modules into one program
//! 3. **check**: `types` runs the semantic analyzer (optional)
//! 4. **compile**: `bytecode` lowers the AST to a flat instruction stream
//! 5. **run**: `vm` executes it
//!
//! The functions here wire the stages together for the CLI, the REPL and
//! tests.

pub mod ast;
pub mod bytecode;
pub mod config;
pub mod error;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod repl;
pub mod span;
pub mod types;
pub mod vm;

use std::io::Write;
use std::path::Path;

use ast::Program;
use bytecode::BytecodeProgram;
use config::Config;
use error::TernError;
use module::{FileSource, MemorySource, ModuleResolver, ModuleSource};

pub use error::TernError as Error;

/// Module name used for source that does not come from a file.
pub const ANONYMOUS_MODULE: &str = "main";

/// Parse source code into an AST.
pub fn parse(source: &str) -> Result<Program, TernError> {
    Ok(parser::parse_source(source)?)
}

/// Resolve, optionally analyze, and compile a parsed program.
pub fn build(
    program: Program,
    root: &str,
    modules: &dyn ModuleSource,
    check: bool,
) -> Result<BytecodeProgram, TernError> {
    let program = ModuleResolver::new(modules).resolve(program, root)?;
    if check {
        types::Analyzer::new().analyze(&program)?;
    } else {
        tracing::debug!("semantic analysis skipped");
    }
    Ok(bytecode::compile(&program))
}

/// Parse, resolve and analyze without compiling.
pub fn check_source(
    source: &str,
    root: &str,
    modules: &dyn ModuleSource,
) -> Result<types::TypeAnnotations, TernError> {
    let program = ModuleResolver::new(modules).resolve(parse(source)?, root)?;
    Ok(types::Analyzer::new().analyze(&program)?)
}

/// Compile source that imports nothing from disk.
pub fn compile_source(source: &str) -> Result<BytecodeProgram, TernError> {
    build(parse(source)?, ANONYMOUS_MODULE, &MemorySource::new(), true)
}

/// Run source code with output to stdout. Returns the exit status.
pub fn run_source(source: &str) -> Result<i32, TernError> {
    let program = compile_source(source)?;
    Ok(vm::Vm::new(program).run()?)
}

/// Run source code with its output sent to `out`.
pub fn run_with_output(
    source: &str,
    modules: &dyn ModuleSource,
    check: bool,
    out: impl Write + 'static,
) -> Result<i32, TernError> {
    let program = build(parse(source)?, ANONYMOUS_MODULE, modules, check)?;
    Ok(vm::Vm::new(program).with_output(out).run()?)
}

/// Run checked source and return what it printed.
pub fn run_capture(source: &str) -> Result<String, TernError> {
    let output = vm::CaptureOutput::new();
    run_with_output(source, &MemorySource::new(), true, output.clone())?;
    Ok(output.contents())
}

/// Module name of a script: its file stem.
pub fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| ANONYMOUS_MODULE.to_string())
}

/// Read, resolve (against the configured search path), analyze when
/// enabled, and compile a script.
pub fn compile_file(path: &Path, config: &Config) -> Result<BytecodeProgram, TernError> {
    let source = std::fs::read_to_string(path)?;
    let modules = FileSource::new(config.search_paths());
    build(parse(&source)?, &module_name(path), &modules, config.check)
}

/// Resolve and analyze a script without running it.
pub fn check_file(path: &Path, config: &Config) -> Result<types::TypeAnnotations, TernError> {
    let source = std::fs::read_to_string(path)?;
    let modules = FileSource::new(config.search_paths());
    check_source(&source, &module_name(path), &modules)
}

/// Run a script. `args` are exposed to it through `System.args`.
pub fn run_file(path: &Path, config: &Config, args: Vec<String>) -> Result<i32, TernError> {
    let program = compile_file(path, config)?;
    tracing::debug!(script = %path.display(), instructions = program.len(), "running");
    Ok(vm::Vm::new(program).with_args(args).run()?)
}
