//! Statement lowering: declarations, assignment, control flow and
//! exception handling.

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};

use super::compiler::{Compiler, LoopContext};
use super::instruction::Instruction;

impl Compiler {
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) {
        let line = stmt.span.line;
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expr(expr);
                self.emit(Instruction::Pop, line);
            }

            StmtKind::VarDecl {
                name, initializer, ..
            } => {
                match initializer {
                    Some(init) => self.compile_expr(init),
                    None => self.emit(Instruction::PushNull, line),
                }
                self.emit(Instruction::Define(name.clone()), line);
                self.declare_local(name);
            }

            StmtKind::Assign { target, value } => self.compile_assign(target, value, line),

            StmtKind::Block(body) => {
                self.begin_scope(line);
                self.compile_block(body);
                self.end_scope(line);
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let else_label = self.fresh_label("else");
                let end_label = self.fresh_label("endif");
                self.compile_expr(condition);
                self.emit(Instruction::JumpIfFalse(else_label.clone()), line);
                self.begin_scope(line);
                self.compile_block(then_branch);
                self.end_scope(line);
                self.emit(Instruction::Jump(end_label.clone()), line);
                self.emit(Instruction::Label(else_label), line);
                if let Some(else_branch) = else_branch {
                    self.begin_scope(line);
                    self.compile_block(else_branch);
                    self.end_scope(line);
                }
                self.emit(Instruction::Label(end_label), line);
            }

            StmtKind::While { condition, body } => {
                let loop_label = self.fresh_label("loop");
                let end_label = self.fresh_label("endloop");
                self.emit(Instruction::Label(loop_label.clone()), line);
                self.compile_expr(condition);
                self.emit(Instruction::JumpIfFalse(end_label.clone()), line);
                self.compile_loop_body(body, None, &loop_label, &end_label, line);
                self.emit(Instruction::Jump(loop_label), line);
                self.emit(Instruction::Label(end_label), line);
            }

            StmtKind::ForEach {
                variable,
                iterable,
                body,
            } => self.compile_for_each(variable, iterable, body, line),

            StmtKind::ForRange {
                variable,
                start,
                end,
                body,
            } => self.compile_for_range(variable, start, end, body, line),

            StmtKind::Function(decl) => {
                self.compile_function(&decl.name, &decl.params, &decl.body, None, decl.span.line)
            }

            StmtKind::Class(decl) => self.compile_class(decl),

            // Only reached when the resolver did not flatten an inline module.
            StmtKind::Module(decl) => self.compile_block(&decl.body),

            StmtKind::Return(value) => {
                match value {
                    Some(expr) => self.compile_expr(expr),
                    None => self.emit(Instruction::PushNull, line),
                }
                self.emit(Instruction::Return, line);
            }

            StmtKind::Break => self.compile_loop_exit(true, line),
            StmtKind::Continue => self.compile_loop_exit(false, line),

            StmtKind::Try {
                body,
                catch_var,
                catch_block,
                finally_block,
            } => self.compile_try(
                body,
                catch_var.as_deref(),
                catch_block.as_deref(),
                finally_block.as_deref(),
                line,
            ),

            StmtKind::Throw(expr) => {
                self.compile_expr(expr);
                self.emit(Instruction::Throw, line);
            }

            // Imports are gone after resolution; a leftover one has nothing to load.
            StmtKind::Import(_) => {}

            StmtKind::Export(inner) => self.compile_stmt(inner),
        }
    }

    pub(crate) fn compile_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.compile_stmt(stmt);
        }
    }

    fn compile_assign(&mut self, target: &Expr, value: &Expr, line: usize) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                self.compile_expr(value);
                self.emit(Instruction::Store(name.clone()), line);
            }
            ExprKind::Member { object, name } => match target.dotted_name() {
                Some(path) if self.is_variable(&path) => {
                    self.compile_expr(value);
                    self.emit(Instruction::Store(path), line);
                }
                _ => {
                    self.compile_expr(object);
                    self.compile_expr(value);
                    self.emit(Instruction::StoreMember(name.clone()), line);
                }
            },
            ExprKind::Index { object, index } => {
                self.compile_expr(object);
                self.compile_expr(index);
                self.compile_expr(value);
                self.emit(Instruction::StoreIndex, line);
            }
            // The parser only produces assignable targets.
            _ => {
                self.compile_expr(value);
                self.emit(Instruction::Pop, line);
            }
        }
    }

    /// One iteration's scope, optionally binding the loop variable first
    /// (its value is already on the stack).
    fn compile_loop_body(
        &mut self,
        body: &[Stmt],
        binding: Option<&str>,
        continue_label: &str,
        break_label: &str,
        line: usize,
    ) {
        self.ctx.loops.push(LoopContext {
            continue_label: continue_label.to_string(),
            break_label: break_label.to_string(),
            scope_depth: self.ctx.scope_depth,
            try_depth: self.ctx.try_depth,
        });
        self.begin_scope(line);
        if let Some(name) = binding {
            self.emit(Instruction::Define(name.to_string()), line);
            self.declare_local(name);
        }
        self.compile_block(body);
        self.end_scope(line);
        self.ctx.loops.pop();
    }

    /// `for each x in E` as a while loop over two hidden variables:
    /// `__iter_x` holds the collection and `__idx_x` the position.
    fn compile_for_each(&mut self, variable: &str, iterable: &Expr, body: &[Stmt], line: usize) {
        let iter_var = format!("__iter_{}", variable);
        let idx_var = format!("__idx_{}", variable);
        let loop_label = self.fresh_label("foreach");
        let next_label = self.fresh_label("foreach_next");
        let end_label = self.fresh_label("foreach_end");

        self.begin_scope(line);
        self.compile_expr(iterable);
        self.emit(Instruction::Define(iter_var.clone()), line);
        self.emit(Instruction::PushInt(0), line);
        self.emit(Instruction::Define(idx_var.clone()), line);
        self.declare_local(&iter_var);
        self.declare_local(&idx_var);

        self.emit(Instruction::Label(loop_label.clone()), line);
        self.emit(Instruction::Load(idx_var.clone()), line);
        self.emit(Instruction::Load(iter_var.clone()), line);
        self.emit(Instruction::Call("len".to_string(), 1), line);
        self.emit(Instruction::BinOp(crate::ast::BinaryOp::Less), line);
        self.emit(Instruction::JumpIfFalse(end_label.clone()), line);

        self.emit(Instruction::Load(iter_var), line);
        self.emit(Instruction::Load(idx_var.clone()), line);
        self.emit(Instruction::LoadIndex, line);
        self.compile_loop_body(body, Some(variable), &next_label, &end_label, line);

        self.emit(Instruction::Label(next_label), line);
        self.emit_increment(&idx_var, line);
        self.emit(Instruction::Jump(loop_label), line);
        self.emit(Instruction::Label(end_label), line);
        self.end_scope(line);
    }

    /// `for i in a .. b`, end exclusive, with hidden `__idx_i` and
    /// `__for_end_i`. The bound is evaluated once.
    fn compile_for_range(
        &mut self,
        variable: &str,
        start: &Expr,
        end: &Expr,
        body: &[Stmt],
        line: usize,
    ) {
        let idx_var = format!("__idx_{}", variable);
        let end_var = format!("__for_end_{}", variable);
        let loop_label = self.fresh_label("for");
        let next_label = self.fresh_label("for_next");
        let end_label = self.fresh_label("for_end");

        self.begin_scope(line);
        self.compile_expr(start);
        self.emit(Instruction::Define(idx_var.clone()), line);
        self.compile_expr(end);
        self.emit(Instruction::Define(end_var.clone()), line);
        self.declare_local(&idx_var);
        self.declare_local(&end_var);

        self.emit(Instruction::Label(loop_label.clone()), line);
        self.emit(Instruction::Load(idx_var.clone()), line);
        self.emit(Instruction::Load(end_var), line);
        self.emit(Instruction::BinOp(crate::ast::BinaryOp::Less), line);
        self.emit(Instruction::JumpIfFalse(end_label.clone()), line);

        self.emit(Instruction::Load(idx_var.clone()), line);
        self.compile_loop_body(body, Some(variable), &next_label, &end_label, line);

        self.emit(Instruction::Label(next_label), line);
        self.emit_increment(&idx_var, line);
        self.emit(Instruction::Jump(loop_label), line);
        self.emit(Instruction::Label(end_label), line);
        self.end_scope(line);
    }

    fn emit_increment(&mut self, name: &str, line: usize) {
        self.emit(Instruction::Load(name.to_string()), line);
        self.emit(Instruction::PushInt(1), line);
        self.emit(Instruction::BinOp(crate::ast::BinaryOp::Add), line);
        self.emit(Instruction::Store(name.to_string()), line);
    }

    /// `break` / `continue`: close the handlers and scopes opened inside
    /// the loop, then jump.
    fn compile_loop_exit(&mut self, is_break: bool, line: usize) {
        let Some(target) = self.ctx.loops.last().cloned() else {
            // Outside a loop (only reachable when checking is disabled).
            self.emit(Instruction::Halt, line);
            return;
        };
        for _ in target.try_depth..self.ctx.try_depth {
            self.emit(Instruction::TryEnd, line);
        }
        for _ in target.scope_depth..self.ctx.scope_depth {
            self.emit(Instruction::PopScope, line);
        }
        let label = if is_break {
            target.break_label
        } else {
            target.continue_label
        };
        self.emit(Instruction::Jump(label), line);
    }

    /// `try` / `catch` / `finally`.
    ///
    /// The handler restores the stack and scope chain to their state at
    /// `TryBegin`, so the catch block starts from the same depth as the
    /// body. Without a catch block the thrown value is kept in a hidden
    /// variable while `finally` runs and is then rethrown.
    fn compile_try(
        &mut self,
        body: &[Stmt],
        catch_var: Option<&str>,
        catch_block: Option<&[Stmt]>,
        finally_block: Option<&[Stmt]>,
        line: usize,
    ) {
        let catch_label = self.fresh_label("catch");
        let finally_label = self.fresh_label("finally");

        self.emit(Instruction::TryBegin(catch_label.clone()), line);
        self.ctx.try_depth += 1;
        self.begin_scope(line);
        self.compile_block(body);
        self.end_scope(line);
        self.ctx.try_depth -= 1;
        self.emit(Instruction::TryEnd, line);
        self.emit(Instruction::Jump(finally_label.clone()), line);

        self.emit(Instruction::Label(catch_label), line);
        match catch_block {
            Some(catch_block) => {
                self.begin_scope(line);
                match catch_var {
                    Some(name) => {
                        self.emit(Instruction::Define(name.to_string()), line);
                        self.declare_local(name);
                    }
                    None => self.emit(Instruction::Pop, line),
                }
                self.compile_block(catch_block);
                self.end_scope(line);
            }
            None => {
                let thrown = self.fresh_label("thrown");
                self.begin_scope(line);
                self.emit(Instruction::Define(thrown.clone()), line);
                self.declare_local(&thrown);
                self.compile_block(finally_block.unwrap_or_default());
                self.emit(Instruction::Load(thrown), line);
                self.end_scope(line);
                self.emit(Instruction::Throw, line);
            }
        }

        self.emit(Instruction::Label(finally_label), line);
        if let Some(finally_block) = finally_block {
            self.begin_scope(line);
            self.compile_block(finally_block);
            self.end_scope(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::BinaryOp;
    use crate::bytecode::compiler::Compiler;
    use crate::bytecode::instruction::Instruction;
    use crate::parser::parse_source;

    fn main_code(source: &str) -> Vec<Instruction> {
        Compiler::compile(&parse_source(source).unwrap())
            .instructions
            .into_iter()
            .skip(1)
            .take_while(|i| *i != Instruction::Halt)
            .collect()
    }

    #[test]
    fn while_loop_shape() {
        let code = main_code("var x = 3\nwhile x > 0 do x = x - 1 end while");
        assert_eq!(
            code[2..],
            [
                Instruction::Label("__loop_1".into()),
                Instruction::Load("x".into()),
                Instruction::PushInt(0),
                Instruction::BinOp(BinaryOp::Greater),
                Instruction::JumpIfFalse("__endloop_2".into()),
                Instruction::PushScope,
                Instruction::Load("x".into()),
                Instruction::PushInt(1),
                Instruction::BinOp(BinaryOp::Subtract),
                Instruction::Store("x".into()),
                Instruction::PopScope,
                Instruction::Jump("__loop_1".into()),
                Instruction::Label("__endloop_2".into()),
            ]
        );
    }

    #[test]
    fn for_each_uses_hidden_variables_named_after_the_loop_variable() {
        let code = main_code("for each v in [1, 2] do\n for each w in [3] do\n print(v + w)\n end for\nend for");
        for name in ["__iter_v", "__idx_v", "__iter_w", "__idx_w"] {
            assert!(
                code.contains(&Instruction::Define(name.into())),
                "missing {}",
                name
            );
        }
        assert!(code.contains(&Instruction::Call("len".into(), 1)));
        assert!(code.contains(&Instruction::Define("v".into())));
    }

    #[test]
    fn for_range_evaluates_bound_once() {
        let code = main_code("for i in 0 .. 5 do print(i) end for");
        assert_eq!(
            code[..4],
            [
                Instruction::PushScope,
                Instruction::PushInt(0),
                Instruction::Define("__idx_i".into()),
                Instruction::PushInt(5),
            ]
        );
        assert_eq!(
            code.iter()
                .filter(|i| **i == Instruction::PushInt(5))
                .count(),
            1
        );
    }

    #[test]
    fn break_pops_scopes_opened_inside_the_loop() {
        let code = main_code("while true do\n if true then\n break\n end if\nend while");
        let jump = code
            .iter()
            .position(|i| *i == Instruction::Jump("__endloop_2".into()))
            .unwrap();
        assert_eq!(
            code[jump - 2..jump],
            [Instruction::PopScope, Instruction::PopScope]
        );
    }

    #[test]
    fn break_inside_try_closes_the_handler() {
        let code = main_code("while true do\n try\n break\n catch e\n print(e)\n end try\nend while");
        let jump = code
            .iter()
            .position(|i| *i == Instruction::Jump("__endloop_2".into()))
            .unwrap();
        assert_eq!(
            code[jump - 3..jump],
            [Instruction::TryEnd, Instruction::PopScope, Instruction::PopScope]
        );
    }

    #[test]
    fn try_catch_binds_the_thrown_value() {
        let code = main_code("try\n throw \"boom\"\ncatch e\n print(e)\nend try");
        assert_eq!(code[0], Instruction::TryBegin("__catch_1".into()));
        let catch = code
            .iter()
            .position(|i| *i == Instruction::Label("__catch_1".into()))
            .unwrap();
        assert_eq!(
            code[catch + 1..catch + 3],
            [Instruction::PushScope, Instruction::Define("e".into())]
        );
    }

    #[test]
    fn try_without_catch_rethrows_after_finally() {
        let code = main_code("try\n throw 1\nfinally\n print(2)\nend try");
        assert!(code.contains(&Instruction::Define("__thrown_3".into())));
        let throws = code.iter().filter(|i| **i == Instruction::Throw).count();
        assert_eq!(throws, 2);
    }

    #[test]
    fn assignment_targets() {
        let code = main_code("var m = {}\nm.k = 1\nm[\"j\"] = 2");
        assert!(code.contains(&Instruction::StoreMember("k".into())));
        assert!(code.contains(&Instruction::StoreIndex));
    }
}
