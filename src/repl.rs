//! Interactive loop for `tern repl`.
//!
//! Every accepted entry is kept. A new entry is analyzed together with the
//! whole history, then compiled together with the earlier declarations
//! (functions, classes, imports) and run on a VM whose globals survive
//! between entries.

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::ast::{Expr, ExprKind, Program, Stmt, StmtKind};
use crate::bytecode::BytecodeProgram;
use crate::config::Config;
use crate::error::TernError;
use crate::lexer::{Scanner, TokenKind};
use crate::module::{FileSource, ModuleResolver};
use crate::types::Analyzer;
use crate::vm::Vm;
use crate::ANONYMOUS_MODULE;

const PROMPT: &str = "tern> ";
const CONTINUATION: &str = "  ... ";

type OutputFactory = Box<dyn Fn() -> Box<dyn Write>>;

pub struct Repl {
    config: Config,
    vm: Vm,
    history: Vec<Stmt>,
    output: OutputFactory,
}

impl Repl {
    pub fn new(config: Config) -> Self {
        Self::with_output(config, || Box::new(io::stdout()))
    }

    /// A REPL whose programs write to the sinks made by `output`. A new
    /// sink is requested after `.clear`.
    pub fn with_output(config: Config, output: impl Fn() -> Box<dyn Write> + 'static) -> Self {
        let vm = Vm::new(BytecodeProgram::new()).with_output(output());
        Self {
            config,
            vm,
            history: Vec::new(),
            output: Box::new(output),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        println!("Tern {} REPL", env!("CARGO_PKG_VERSION"));
        println!("Type \".help\" for available commands.\n");

        let stdin = io::stdin();
        let mut buffer = String::new();
        loop {
            print!("{}", if buffer.is_empty() { PROMPT } else { CONTINUATION });
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                println!();
                break;
            }

            if buffer.is_empty() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with('.') {
                    if !self.command(trimmed) {
                        break;
                    }
                    continue;
                }
            }

            buffer.push_str(&line);
            if !is_complete(&buffer) {
                continue;
            }
            let source = std::mem::take(&mut buffer);
            if let Err(err) = self.eval(&source) {
                eprintln!("{} {}", "Error:".red().bold(), err);
            }
        }
        Ok(())
    }

    /// Handle a `.command`. Returns false when the REPL should stop.
    pub fn command(&mut self, command: &str) -> bool {
        match command {
            ".help" => {
                println!(".help    Show this help message");
                println!(".vars    List global variables");
                println!(".clear   Forget all declarations and variables");
                println!(".exit    Leave the REPL (or Ctrl+D)");
            }
            ".vars" => {
                let names = self.vm.globals();
                if names.is_empty() {
                    println!("No variables defined.");
                }
                for name in names {
                    let value = self.vm.global(&name).map(|v| v.to_string()).unwrap_or_default();
                    println!("  {} = {}", name, value);
                }
            }
            ".clear" => {
                self.clear();
                println!("Environment reset.");
            }
            ".exit" | ".quit" => return false,
            other => println!("Unknown command: {}. Type .help for available commands.", other),
        }
        true
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.vm = Vm::new(BytecodeProgram::new()).with_output((self.output)());
    }

    /// Evaluate one complete entry. A trailing bare expression is printed.
    pub fn eval(&mut self, source: &str) -> Result<i32, TernError> {
        let mut entry = crate::parse(source)?.statements;
        echo_last_expression(&mut entry);
        let modules = FileSource::new(self.config.search_paths());

        if self.config.check {
            let mut all = self.history.clone();
            all.extend(entry.iter().cloned());
            let program = ModuleResolver::new(&modules).resolve(Program::new(all), ANONYMOUS_MODULE)?;
            Analyzer::new().analyze(&program)?;
        }

        let mut statements: Vec<Stmt> = self
            .history
            .iter()
            .filter(|stmt| is_declaration(stmt))
            .cloned()
            .collect();
        statements.extend(entry.iter().cloned());
        let program = crate::build(Program::new(statements), ANONYMOUS_MODULE, &modules, false)?;

        self.vm.load(program);
        let status = self.vm.run()?;
        self.history.extend(entry);
        Ok(status)
    }
}

/// Declarations are recompiled with every entry; everything else runs once.
fn is_declaration(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Function(_) | StmtKind::Class(_) | StmtKind::Module(_) | StmtKind::Import(_) => {
            true
        }
        StmtKind::Export(inner) => is_declaration(inner),
        _ => false,
    }
}

fn echo_last_expression(entry: &mut [Stmt]) {
    let Some(last) = entry.last_mut() else {
        return;
    };
    let StmtKind::Expression(expr) = &last.kind else {
        return;
    };
    if matches!(&expr.kind, ExprKind::Call { name, .. } if name == "print" || name == "println") {
        return;
    }
    let span = expr.span;
    let call = ExprKind::Call {
        name: "print".to_string(),
        arguments: vec![expr.clone()],
    };
    last.kind = StmtKind::Expression(Expr::new(call, span));
}

/// Whether every block opened in `source` has been closed.
pub fn is_complete(source: &str) -> bool {
    // Lexer errors are left for the parser to report.
    let Ok(tokens) = Scanner::new(source).scan_tokens() else {
        return true;
    };

    let mut depth: i64 = 0;
    let mut loop_header = false;
    let mut after_end = false;
    for token in &tokens {
        let kind = &token.kind;
        if after_end {
            after_end = false;
            if kind.opens_block() || *kind == TokenKind::Fn {
                continue;
            }
        }
        match kind {
            TokenKind::End => {
                depth -= 1;
                after_end = true;
            }
            TokenKind::While | TokenKind::For => {
                depth += 1;
                loop_header = true;
            }
            TokenKind::Do if loop_header => loop_header = false,
            // A lambda body or a bare block.
            TokenKind::Do => depth += 1,
            kind if kind.opens_block() => depth += 1,
            _ => {}
        }
    }
    depth <= 0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::vm::CaptureOutput;

    fn repl() -> (Repl, CaptureOutput) {
        let capture = CaptureOutput::new();
        let sink = capture.clone();
        let repl = Repl::with_output(Config::default(), move || Box::new(sink.clone()));
        (repl, capture)
    }

    #[test]
    fn single_lines_are_complete() {
        assert!(is_complete("var x = 1\n"));
        assert!(is_complete("print(x)\n"));
        assert!(is_complete("var f = fn(x: Int) => x * 2\n"));
    }

    #[test]
    fn open_blocks_need_more_lines() {
        assert!(!is_complete("function f()\n"));
        assert!(!is_complete("while true do\n"));
        assert!(!is_complete("if x then\n print(1)\nelse\n"));
        assert!(!is_complete("var f = fn(x) do\n"));
        assert!(!is_complete("class A\n function m()\n end function\n"));
    }

    #[test]
    fn closed_blocks_are_complete() {
        assert!(is_complete("function f()\n return 1\nend function\n"));
        assert!(is_complete("for i in 0 .. 3 do\n print(i)\nend for\n"));
        assert!(is_complete("var f = fn(x) do\n return x\nend fn\n"));
        assert!(is_complete("do\n var x = 1\nend\n"));
        assert!(is_complete("try\n throw 1\ncatch e\n print(e)\nend try\n"));
    }

    #[test]
    fn globals_persist_between_entries() {
        let (mut repl, output) = repl();
        repl.eval("var x = 40").unwrap();
        repl.eval("x = x + 1").unwrap();
        repl.eval("x + 1").unwrap();
        assert_eq!(output.contents(), "42\n");
    }

    #[test]
    fn declarations_stay_callable() {
        let (mut repl, output) = repl();
        repl.eval("function double(n: Int) -> Int\n return n * 2\nend function").unwrap();
        repl.eval("print(double(21))").unwrap();
        repl.eval("double(2)").unwrap();
        assert_eq!(output.contents(), "42\n4\n");
    }

    #[test]
    fn rejected_entries_are_forgotten() {
        let (mut repl, output) = repl();
        assert!(repl.eval("var y = nope").is_err());
        repl.eval("var y = 1").unwrap();
        repl.eval("y").unwrap();
        assert_eq!(output.contents(), "1\n");
    }

    #[test]
    fn clear_forgets_everything() {
        let (mut repl, _) = repl();
        repl.eval("var z = 1").unwrap();
        repl.clear();
        assert!(matches!(repl.eval("z"), Err(TernError::Semantic(_))));
    }
}
