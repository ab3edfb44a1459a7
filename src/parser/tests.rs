//! Parser tests.

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_source;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_source(source).unwrap().statements
    }

    fn parse_expr(source: &str) -> Expr {
        match parse(source).into_iter().next().unwrap().kind {
            StmtKind::Expression(expr) => expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let expr = parse_expr("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                right.kind,
                ExprKind::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                }
            )),
            _ => panic!("Expected add at top"),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expr("2 ** 3 ** 2");
        match expr.kind {
            ExprKind::Binary {
                operator: BinaryOp::Power,
                left,
                right,
            } => {
                assert_eq!(left.kind, ExprKind::IntLiteral(2));
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary {
                        operator: BinaryOp::Power,
                        ..
                    }
                ));
            }
            _ => panic!("Expected power"),
        }
    }

    #[test]
    fn test_word_operators() {
        let expr = parse_expr("a and not b or c");
        assert!(matches!(
            expr.kind,
            ExprKind::Binary {
                operator: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_dotted_call_keeps_full_name() {
        let expr = parse_expr("String.length(\"hello\")");
        match expr.kind {
            ExprKind::Call { name, arguments } => {
                assert_eq!(name, "String.length");
                assert_eq!(arguments.len(), 1);
            }
            _ => panic!("Expected call"),
        }
    }

    #[test]
    fn test_method_call_on_computed_receiver() {
        let expr = parse_expr("xs[0].length()");
        match expr.kind {
            ExprKind::MethodCall {
                receiver, method, ..
            } => {
                assert_eq!(method, "length");
                assert!(matches!(receiver.kind, ExprKind::Index { .. }));
            }
            _ => panic!("Expected method call"),
        }
    }

    #[test]
    fn test_collections_and_tuple() {
        assert!(matches!(parse_expr("[1, 2, 3]").kind, ExprKind::List(items) if items.len() == 3));
        assert!(matches!(parse_expr("{\"a\": 1}").kind, ExprKind::Map(entries) if entries.len() == 1));
        assert!(matches!(parse_expr("(1, \"x\")").kind, ExprKind::Tuple(items) if items.len() == 2));
        assert_eq!(parse_expr("(7)").kind, ExprKind::IntLiteral(7));
    }

    #[test]
    fn test_ternary_and_new() {
        assert!(matches!(parse_expr("c ? 1 : 2").kind, ExprKind::Ternary { .. }));
        match parse_expr("new Geo.Point(1, 2)").kind {
            ExprKind::New {
                class_name,
                arguments,
            } => {
                assert_eq!(class_name, "Geo.Point");
                assert_eq!(arguments.len(), 2);
            }
            _ => panic!("Expected new"),
        }
    }

    #[test]
    fn test_lambda_forms() {
        match parse_expr("fn(x: Int) => x * 2").kind {
            ExprKind::Lambda { params, body, .. } => {
                assert_eq!(params.len(), 1);
                assert!(matches!(body[0].kind, StmtKind::Return(Some(_))));
            }
            _ => panic!("Expected lambda"),
        }
        match parse_expr("fn() do\n print(1)\n return 2\nend fn").kind {
            ExprKind::Lambda { body, .. } => assert_eq!(body.len(), 2),
            _ => panic!("Expected lambda"),
        }
    }

    #[test]
    fn test_var_and_assignment() {
        let stmts = parse("var x: Int = 10; x = x - 1\nconst LIMIT = 3");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::VarDecl { name, constant: false, type_annotation: Some(_), .. } if name == "x"
        ));
        assert!(matches!(stmts[1].kind, StmtKind::Assign { .. }));
        assert!(matches!(stmts[2].kind, StmtKind::VarDecl { constant: true, .. }));
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(parse_source("const X").is_err());
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse_source("f() = 3").is_err());
    }

    #[test]
    fn test_if_elif_else_nests() {
        let stmts = parse("if a then\n 1\nelif b then\n 2\nelse\n 3\nend if");
        match &stmts[0].kind {
            StmtKind::If {
                else_branch: Some(else_branch),
                ..
            } => match &else_branch[0].kind {
                StmtKind::If {
                    else_branch: Some(inner),
                    ..
                } => assert_eq!(inner.len(), 1),
                _ => panic!("Expected nested if for elif"),
            },
            _ => panic!("Expected if"),
        }
    }

    #[test]
    fn test_loops() {
        let stmts = parse(
            "while x > 0 do x = x - 1 end while\n\
             for each v in xs do print(v) end for\n\
             for v in xs do print(v) end for\n\
             for i in 0 .. 5 do print(i) end for",
        );
        assert!(matches!(stmts[0].kind, StmtKind::While { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::ForEach { .. }));
        assert!(matches!(stmts[2].kind, StmtKind::ForEach { .. }));
        assert!(matches!(stmts[3].kind, StmtKind::ForRange { .. }));
    }

    #[test]
    fn test_return_without_value_before_end() {
        let stmts = parse("function f()\n return\nend function");
        match &stmts[0].kind {
            StmtKind::Function(decl) => {
                assert!(matches!(decl.body[0].kind, StmtKind::Return(None)))
            }
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_function_declaration() {
        let stmts = parse("function add(a: Int, b: Int) -> Int\n return a + b\nend function");
        match &stmts[0].kind {
            StmtKind::Function(decl) => {
                assert_eq!(decl.name, "add");
                assert_eq!(decl.params.len(), 2);
                assert_eq!(
                    decl.return_type.as_ref().map(|t| t.to_string()),
                    Some("Int".to_string())
                );
            }
            _ => panic!("Expected function"),
        }
    }

    #[test]
    fn test_class_and_contract() {
        let stmts = parse(
            "class Dog extends Animal\n var name: String = \"rex\"\n function bark() -> String\n return \"woof\"\n end function\nend class\n\
             contract Token\n var supply: Int = 0\nend contract",
        );
        match &stmts[0].kind {
            StmtKind::Class(decl) => {
                assert_eq!(decl.kind, ClassKind::Class);
                assert_eq!(decl.superclass.as_deref(), Some("Animal"));
                assert_eq!(decl.fields.len(), 1);
                assert_eq!(decl.methods.len(), 1);
            }
            _ => panic!("Expected class"),
        }
        assert!(matches!(
            &stmts[1].kind,
            StmtKind::Class(decl) if decl.kind == ClassKind::Contract
        ));
    }

    #[test]
    fn test_imports() {
        let stmts = parse("import Geometry\nimport Geometry as G\nfrom Geometry import area, perimeter");
        let kinds: Vec<ImportKind> = stmts
            .into_iter()
            .map(|s| match s.kind {
                StmtKind::Import(decl) => decl.kind,
                _ => panic!("Expected import"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ImportKind::Whole,
                ImportKind::Alias("G".to_string()),
                ImportKind::From(vec!["area".to_string(), "perimeter".to_string()]),
            ]
        );
    }

    #[test]
    fn test_try_catch_finally() {
        let stmts = parse("try\n throw \"x\"\ncatch e\n print(e)\nfinally\n print(1)\nend try");
        match &stmts[0].kind {
            StmtKind::Try {
                catch_var,
                catch_block,
                finally_block,
                ..
            } => {
                assert_eq!(catch_var.as_deref(), Some("e"));
                assert!(catch_block.is_some());
                assert!(finally_block.is_some());
            }
            _ => panic!("Expected try"),
        }
    }

    #[test]
    fn test_catch_without_variable() {
        let stmts = parse("try\n f()\ncatch\n print(1)\nend try");
        assert!(matches!(&stmts[0].kind, StmtKind::Try { catch_var: None, .. }));
    }

    #[test]
    fn test_type_annotations() {
        let stmts = parse("var m: Map<String, List<Int>> = {}\nvar o: Int? = null\nvar f: fn(Int) -> Bool = g");
        let types: Vec<String> = stmts
            .iter()
            .map(|s| match &s.kind {
                StmtKind::VarDecl {
                    type_annotation: Some(t),
                    ..
                } => t.to_string(),
                _ => panic!("Expected annotated var"),
            })
            .collect();
        assert_eq!(
            types,
            vec!["Map<String, List<Int>>", "Int?", "fn(Int) -> Bool"]
        );
    }

    #[test]
    fn test_unterminated_block_is_an_error() {
        assert!(parse_source("while true do\n x = 1\n").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = parse_source(&parens).unwrap_err();
        assert!(err.to_string().contains("nesting deeper than"), "{}", err);

        let ifs = "if true then\n".repeat(1_000) + &"end if\n".repeat(1_000);
        assert!(parse_source(&ifs).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let parens = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(parse_expr(&parens).kind, ExprKind::IntLiteral(1)));
    }

    #[test]
    fn test_new_line_paren_starts_new_statement() {
        let stmts = parse("var x = a\n(1, 2)");
        assert_eq!(stmts.len(), 2);
    }
}
