//! Expression lowering. Every expression leaves exactly one value on the
//! operand stack.

use crate::ast::{BinaryOp, Expr, ExprKind};

use super::compiler::Compiler;
use super::instruction::Instruction;

impl Compiler {
    pub(crate) fn compile_expr(&mut self, expr: &Expr) {
        let line = expr.span.line;
        match &expr.kind {
            ExprKind::IntLiteral(n) => self.emit(Instruction::PushInt(*n), line),
            ExprKind::FloatLiteral(n) => self.emit(Instruction::PushFloat(*n), line),
            ExprKind::StringLiteral(s) => self.emit(Instruction::PushString(s.clone()), line),
            ExprKind::BoolLiteral(b) => self.emit(Instruction::PushBool(*b), line),
            ExprKind::Null => self.emit(Instruction::PushNull, line),

            ExprKind::Identifier(name) => self.compile_identifier(name, line),

            ExprKind::Binary {
                left,
                operator,
                right,
            } => match operator {
                BinaryOp::And => self.compile_short_circuit(left, right, false, line),
                BinaryOp::Or => self.compile_short_circuit(left, right, true, line),
                op => {
                    self.compile_expr(left);
                    self.compile_expr(right);
                    self.emit(Instruction::BinOp(*op), line);
                }
            },

            ExprKind::Unary { operator, operand } => {
                self.compile_expr(operand);
                self.emit(Instruction::UnOp(*operator), line);
            }

            ExprKind::Call { name, arguments } => self.compile_call(name, arguments, line),

            ExprKind::MethodCall {
                receiver,
                method,
                arguments,
            } => {
                self.compile_expr(receiver);
                self.compile_args(arguments);
                self.emit(
                    Instruction::MethodCall(method.clone(), arguments.len()),
                    line,
                );
            }

            ExprKind::Member { object, name } => match expr.dotted_name() {
                Some(path) => self.compile_path(&path, line),
                None => {
                    self.compile_expr(object);
                    self.emit(Instruction::LoadMember(name.clone()), line);
                }
            },

            ExprKind::Index { object, index } => {
                self.compile_expr(object);
                self.compile_expr(index);
                self.emit(Instruction::LoadIndex, line);
            }

            ExprKind::List(items) => {
                self.compile_args(items);
                self.emit(Instruction::MakeList(items.len()), line);
            }

            ExprKind::Map(entries) => {
                for (key, value) in entries {
                    self.compile_expr(key);
                    self.compile_expr(value);
                }
                self.emit(Instruction::MakeMap(entries.len()), line);
            }

            ExprKind::Tuple(items) => {
                self.compile_args(items);
                self.emit(Instruction::MakeTuple(items.len()), line);
            }

            ExprKind::Lambda { params, body, .. } => {
                let label = self.compile_lambda(params, body, line);
                self.emit(Instruction::PushString(label), line);
            }

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                let else_label = self.fresh_label("ternary_else");
                let end_label = self.fresh_label("ternary_end");
                self.compile_expr(condition);
                self.emit(Instruction::JumpIfFalse(else_label.clone()), line);
                self.compile_expr(then_branch);
                self.emit(Instruction::Jump(end_label.clone()), line);
                self.emit(Instruction::Label(else_label), line);
                self.compile_expr(else_branch);
                self.emit(Instruction::Label(end_label), line);
            }

            ExprKind::New {
                class_name,
                arguments,
            } => {
                self.compile_args(arguments);
                self.emit(
                    Instruction::New(class_name.clone(), arguments.len()),
                    line,
                );
            }
        }
    }

    pub(crate) fn compile_args(&mut self, arguments: &[Expr]) {
        for argument in arguments {
            self.compile_expr(argument);
        }
    }

    /// A bare name. Functions are values too: a function name that is not
    /// shadowed by a variable evaluates to its label string.
    fn compile_identifier(&mut self, name: &str, line: usize) {
        if !self.is_variable(name) && self.program.functions.contains_key(name) {
            self.emit(Instruction::PushString(name.to_string()), line);
        } else {
            self.emit(Instruction::Load(name.to_string()), line);
        }
    }

    /// `a and b` / `a or b`: the left value stays on the stack when it
    /// decides the result.
    fn compile_short_circuit(&mut self, left: &Expr, right: &Expr, is_or: bool, line: usize) {
        let end_label = self.fresh_label(if is_or { "or_end" } else { "and_end" });
        self.compile_expr(left);
        self.emit(Instruction::Dup, line);
        if is_or {
            self.emit(Instruction::JumpIfTrue(end_label.clone()), line);
        } else {
            self.emit(Instruction::JumpIfFalse(end_label.clone()), line);
        }
        self.emit(Instruction::Pop, line);
        self.compile_expr(right);
        self.emit(Instruction::Label(end_label), line);
    }

    /// Load a dotted path. The longest prefix naming a variable is loaded
    /// whole (flattened module globals are dotted names); the remaining
    /// segments are member accesses.
    pub(crate) fn compile_path(&mut self, path: &str, line: usize) {
        let segments: Vec<&str> = path.split('.').collect();
        let split = (1..=segments.len())
            .rev()
            .find(|&n| self.is_variable(&segments[..n].join(".")))
            .unwrap_or(1);

        self.compile_identifier(&segments[..split].join("."), line);
        for segment in &segments[split..] {
            self.emit(Instruction::LoadMember(segment.to_string()), line);
        }
    }

    /// A call by (possibly dotted) name.
    fn compile_call(&mut self, name: &str, arguments: &[Expr], line: usize) {
        let argc = arguments.len();

        if self.is_sibling_method(name) {
            self.emit(Instruction::Load("this".to_string()), line);
            self.compile_args(arguments);
            self.emit(Instruction::MethodCall(name.to_string(), argc), line);
            return;
        }

        match name.rsplit_once('.') {
            Some((receiver, method)) if !self.is_callable_name(name) => {
                self.compile_path(receiver, line);
                self.compile_args(arguments);
                self.emit(Instruction::MethodCall(method.to_string(), argc), line);
            }
            _ => {
                self.compile_args(arguments);
                self.emit(Instruction::Call(name.to_string(), argc), line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::BinaryOp;
    use crate::bytecode::compiler::Compiler;
    use crate::bytecode::instruction::Instruction;
    use crate::bytecode::program::MAIN_LABEL;
    use crate::parser::parse_source;

    fn main_code(source: &str) -> Vec<Instruction> {
        let program = Compiler::compile(&parse_source(source).unwrap());
        program
            .instructions
            .into_iter()
            .skip(1)
            .take_while(|i| *i != Instruction::Halt)
            .collect()
    }

    #[test]
    fn arithmetic_is_postfix() {
        assert_eq!(
            main_code("print(1 + 2 * 3)"),
            vec![
                Instruction::PushInt(1),
                Instruction::PushInt(2),
                Instruction::PushInt(3),
                Instruction::BinOp(BinaryOp::Multiply),
                Instruction::BinOp(BinaryOp::Add),
                Instruction::Call("print".into(), 1),
                Instruction::Pop,
            ]
        );
    }

    #[test]
    fn and_short_circuits() {
        let code = main_code("var a = true and false");
        assert_eq!(
            code,
            vec![
                Instruction::PushBool(true),
                Instruction::Dup,
                Instruction::JumpIfFalse("__and_end_1".into()),
                Instruction::Pop,
                Instruction::PushBool(false),
                Instruction::Label("__and_end_1".into()),
                Instruction::Define("a".into()),
            ]
        );
    }

    #[test]
    fn method_call_on_variable_keeps_method_name() {
        let code = main_code("var xs = [1, 2]\nprint(xs.length())");
        assert!(code.contains(&Instruction::Load("xs".into())));
        assert!(code.contains(&Instruction::MethodCall("length".into(), 0)));
    }

    #[test]
    fn namespaced_natives_are_plain_calls() {
        let code = main_code("print(String.length(\"hello\"))");
        assert_eq!(code[0], Instruction::PushString("hello".into()));
        assert_eq!(code[1], Instruction::Call("String.length".into(), 1));
    }

    #[test]
    fn dotted_globals_load_whole() {
        let mut program = parse_source("var PI = 3.14\nprint(PI)").unwrap();
        // Mimic what the module resolver produces for `import Geometry`.
        if let crate::ast::StmtKind::VarDecl { name, .. } = &mut program.statements[0].kind {
            *name = "Geometry.PI".into();
        }
        if let crate::ast::StmtKind::Expression(call) = &mut program.statements[1].kind {
            if let crate::ast::ExprKind::Call { arguments, .. } = &mut call.kind {
                arguments[0].kind = crate::ast::ExprKind::Identifier("Geometry.PI".into());
            }
        }
        let code: Vec<_> = Compiler::compile(&program)
            .instructions
            .into_iter()
            .collect();
        assert!(code.contains(&Instruction::Define("Geometry.PI".into())));
        assert!(code.contains(&Instruction::Load("Geometry.PI".into())));
        assert_eq!(code[0], Instruction::Label(MAIN_LABEL.into()));
    }

    #[test]
    fn member_chains_load_object_then_members() {
        let code = main_code("var p = {\"a\": {\"b\": 1}}\nprint(p.a.b)");
        let load = code
            .iter()
            .position(|i| *i == Instruction::Load("p".into()))
            .unwrap();
        assert_eq!(
            code[load..load + 3],
            [
                Instruction::Load("p".into()),
                Instruction::LoadMember("a".into()),
                Instruction::LoadMember("b".into()),
            ]
        );
    }

    #[test]
    fn new_pushes_arguments_first() {
        let code = main_code("class P\nend class\nvar p = new P(1, 2)");
        assert_eq!(
            code,
            vec![
                Instruction::PushInt(1),
                Instruction::PushInt(2),
                Instruction::New("P".into(), 2),
                Instruction::Define("p".into()),
            ]
        );
    }

    #[test]
    fn function_names_evaluate_to_labels() {
        let code = main_code("function double(x)\n return x * 2\nend function\nvar f = double");
        assert_eq!(code[0], Instruction::PushString("double".into()));
    }
}
