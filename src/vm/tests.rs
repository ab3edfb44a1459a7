use pretty_assertions::assert_eq;

use crate::error::{RuntimeError, TernError};
use crate::module::MemorySource;
use crate::vm::{CaptureOutput, MAX_FRAMES};

fn run(source: &str) -> String {
    match crate::run_capture(source) {
        Ok(output) => output,
        Err(err) => panic!("program failed: {}\n{}", err, source),
    }
}

/// Run without semantic analysis and return the exit status and output.
fn run_unchecked(source: &str) -> (Result<i32, TernError>, String) {
    let output = CaptureOutput::new();
    let status = crate::run_with_output(source, &MemorySource::new(), false, output.clone());
    (status, output.contents())
}

fn runtime_error(source: &str) -> RuntimeError {
    match crate::run_capture(source) {
        Err(TernError::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn while_loop_counts_down() {
    let source = r#"
        var i = 3
        while i > 0 do
            i = i - 1
        end while
        print(i)
    "#;
    assert_eq!(run(source), "0\n");
}

#[test]
fn for_each_and_range() {
    let source = r#"
        var sum = 0
        for each x in [1, 2, 3, 4, 5] do
            sum = sum + x
        end for
        print(sum)
        var count = 0
        for i in 0 .. 5 do
            count = count + 1
        end for
        print(count)
    "#;
    assert_eq!(run(source), "15\n5\n");
}

#[test]
fn break_and_continue() {
    let source = r#"
        var total = 0
        for i in 0 .. 10 do
            if i == 5 then
                break
            end if
            if i % 2 == 0 then
                continue
            end if
            total = total + i
        end for
        print(total)
    "#;
    assert_eq!(run(source), "4\n");
}

#[test]
fn break_leaves_only_the_inner_loop() {
    let source = r#"
        var hits = 0
        for i in 0 .. 3 do
            for j in 0 .. 3 do
                if j == 1 then
                    break
                end if
                hits = hits + 1
            end for
        end for
        print(hits)
    "#;
    assert_eq!(run(source), "3\n");
}

#[test]
fn collections_alias_but_scalars_copy() {
    let source = r#"
        var a = [1, 2]
        var b = a
        List.append(b, 3)
        print(len(a))
        var x = 1
        var y = x
        y = 2
        print(x)
    "#;
    assert_eq!(run(source), "3\n1\n");
}

#[test]
fn maps_alias_through_every_handle() {
    let source = r#"
        var a = {"k": 1}
        var b = a
        b["j"] = 2
        b.z = 3
        print(Map.length(a))
        print(a["z"])
    "#;
    assert_eq!(run(source), "3\n3\n");
}

#[test]
fn callees_mutate_the_callers_collections() {
    let source = r#"
        function fill(xs, m)
            List.append(xs, 9)
            m["added"] = true
            xs = [0]
        end function
        var items = [1]
        var table = {"k": 1}
        fill(items, table)
        print(items)
        print(Map.has(table, "added"))
    "#;
    assert_eq!(run(source), "[1, 9]\ntrue\n");
}

#[test]
fn floats_strings_and_bools_copy() {
    let source = r#"
        var f = 1.5
        var g = f
        g = g + 1.0
        var s = "tern"
        var t = s
        t = t + "!"
        var p = true
        var q = p
        q = false
        print(f)
        print(s)
        print(p)
        print(g, t, q)
    "#;
    assert_eq!(run(source), "1.5\ntern\ntrue\n2.5 tern! false\n");
}

#[test]
fn self_containing_list_prints_and_compares() {
    let source = r#"
        var a = [1]
        List.append(a, a)
        print(a)
        var b = [1]
        List.append(b, b)
        print(a == b)
        print(a == a)
        print(a == [1, 2])
    "#;
    assert_eq!(run(source), "[1, [...]]\ntrue\ntrue\nfalse\n");
}

#[test]
fn self_containing_map_prints() {
    let source = r#"
        var m = {"k": 1}
        m["self"] = m
        print(m)
        print(len(m))
    "#;
    assert_eq!(run(source), "{\"k\": 1, \"self\": {...}}\n2\n");
}

#[test]
fn natives_by_namespace() {
    assert_eq!(run("print(String.length(\"hello\"))"), "5\n");
    assert_eq!(run("var m = {\"a\": 1}\nm[\"b\"] = 2\nprint(Map.keys(m))"), "[\"a\", \"b\"]\n");
}

#[test]
fn method_syntax_on_builtin_values() {
    let source = r#"
        var xs = [1, 2, 3]
        print(xs.length() == List.length(xs))
        var s = "abc"
        print(s.upper())
        print(xs.join("-"))
    "#;
    assert_eq!(run(source), "true\nABC\n1-2-3\n");
}

#[test]
fn short_circuit_skips_the_right_side() {
    let source = r#"
        function loud() -> Bool
            print("called")
            return true
        end function
        print(false and loud())
        print(true or loud())
    "#;
    assert_eq!(run(source), "false\ntrue\n");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let err = runtime_error("var z = 0\nvar x = 10 / z");
    assert_eq!(err, RuntimeError::DivisionByZero);
    assert_eq!(err.to_string(), "Div by zero");
}

#[test]
fn float_division_follows_ieee() {
    assert_eq!(run("var z = 0.0\nprint(1.0 / z)"), "inf\n");
    assert_eq!(run("print(7 / 2)\nprint(7.0 / 2)"), "3\n3.5\n");
}

#[test]
fn integer_overflow_is_a_runtime_error() {
    let err = runtime_error("var big = 4611686018427387904\nvar x = big * 2");
    assert_eq!(err, RuntimeError::IntegerOverflow);
}

#[test]
fn unknown_function_without_checking() {
    let (status, _) = run_unchecked("x()");
    let err = status.unwrap_err();
    assert_eq!(err.to_string(), "Runtime error: Function not found: x");
}

#[test]
fn unknown_native_in_known_namespace() {
    let (status, _) = run_unchecked("String.shout(\"a\")");
    assert!(matches!(
        status,
        Err(TernError::Runtime(RuntimeError::UnknownNative(ref name))) if name == "String.shout"
    ));
}

#[test]
fn recursion() {
    let source = r#"
        function fib(n: Int) -> Int
            if n < 2 then
                return n
            end if
            return fib(n - 1) + fib(n - 2)
        end function
        print(fib(15))
    "#;
    assert_eq!(run(source), "610\n");
}

#[test]
fn unbounded_recursion_overflows() {
    let source = "function down(n: Int) -> Int\n return down(n + 1)\nend function\ndown(0)";
    assert_eq!(runtime_error(source), RuntimeError::StackOverflow(MAX_FRAMES));
}

#[test]
fn new_creates_only_the_type_tag() {
    let source = r#"
        class Point
            var x: Int = 5
        end class
        var p = new Point()
        print(p.x)
        print(type_of(p))
        p.x = 2
        print(p.x)
    "#;
    assert_eq!(run(source), "null\nPoint\n2\n");
}

#[test]
fn methods_walk_the_parent_chain() {
    let source = r#"
        class Animal
            function speak() -> String
                return "..."
            end function
            function describe() -> String
                return "I say " + this.speak()
            end function
        end class
        class Dog extends Animal
            function speak() -> String
                return "woof"
            end function
        end class
        var d = new Dog()
        print(d.describe())
        var a = new Animal()
        print(a.describe())
    "#;
    assert_eq!(run(source), "I say woof\nI say ...\n");
}

#[test]
fn sibling_methods_are_called_on_this() {
    let source = r#"
        class Counter
            var count: Int = 0
            function bump()
                this.count = this.count + 1
            end function
            function twice()
                bump()
                bump()
            end function
        end class
        var c = new Counter()
        c.count = 0
        c.twice()
        print(c.count)
    "#;
    assert_eq!(run(source), "2\n");
}

#[test]
fn method_on_null_is_rejected() {
    let (status, _) = run_unchecked("var n = null\nn.go()");
    assert!(matches!(
        status,
        Err(TernError::Runtime(RuntimeError::InvalidReceiver { .. }))
    ));
}

#[test]
fn try_catch_finally() {
    let source = r#"
        try
            throw "boom"
        catch e
            print("caught " + e)
        finally
            print("done")
        end try
    "#;
    assert_eq!(run(source), "caught boom\ndone\n");
}

#[test]
fn throw_unwinds_calls() {
    let source = r#"
        function risky()
            var local = 1
            throw "bad"
        end function
        var before = 1
        try
            risky()
            print("unreachable")
        catch e
            print(e)
        end try
        print(before)
    "#;
    assert_eq!(run(source), "bad\n1\n");
}

#[test]
fn finally_runs_without_catch_and_rethrows() {
    let source = r#"
        try
            try
                throw "inner"
            finally
                print("cleanup")
            end try
        catch e
            print("outer " + e)
        end try
    "#;
    assert_eq!(run(source), "cleanup\nouter inner\n");
}

#[test]
fn uncaught_throw_ends_the_program() {
    let (status, output) = run_unchecked("print(\"a\")\nthrow \"oops\"\nprint(\"b\")");
    assert_eq!(output, "a\n");
    assert_eq!(
        status.unwrap_err().to_string(),
        "Runtime error: Uncaught exception: oops"
    );
}

#[test]
fn lambdas_and_system_call() {
    let source = r#"
        var double = fn(x: Int) -> Int => x * 2
        function square(x: Int) -> Int
            return x * x
        end function
        print(double(4))
        print(System.call(double, 5))
        print(System.call("square", 3))
        var f = square
        print(f(6))
    "#;
    assert_eq!(run(source), "8\n10\n9\n36\n");
}

#[test]
fn system_exit_sets_the_status() {
    let (status, output) = run_unchecked("print(\"a\")\nSystem.exit(3)\nprint(\"b\")");
    assert_eq!(status.unwrap(), 3);
    assert_eq!(output, "a\n");
}

#[test]
fn globals_are_visible_in_functions() {
    let source = r#"
        var hits = 0
        function hit()
            hits = hits + 1
        end function
        hit()
        hit()
        print(hits)
    "#;
    assert_eq!(run(source), "2\n");
}

#[test]
fn load_keeps_globals() {
    let first = crate::compile_source("var kept = 41").unwrap();
    let mut vm = crate::vm::Vm::new(first).with_output(CaptureOutput::new());
    vm.run().unwrap();
    let second = crate::build(
        crate::parse("kept = kept + 1").unwrap(),
        crate::ANONYMOUS_MODULE,
        &MemorySource::new(),
        false,
    )
    .unwrap();
    vm.load(second);
    vm.run().unwrap();
    assert_eq!(vm.global("kept"), Some(crate::vm::Value::Int(42)));
}
