//! Benchmarks for the compile and execute stages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::io;
use ternlang::bytecode::{BytecodeProgram, Compiler};
use ternlang::module::{MemorySource, ModuleResolver};
use ternlang::vm::Vm;

/// Parse and resolve source into an AST.
fn parse(source: &str) -> ternlang::ast::Program {
    let program = ternlang::parse(source).expect("parse error");
    ModuleResolver::new(&MemorySource::new())
        .resolve(program, ternlang::ANONYMOUS_MODULE)
        .expect("resolve error")
}

fn compile(source: &str) -> BytecodeProgram {
    Compiler::compile(&parse(source))
}

/// Execute an already compiled program.
fn execute(program: &BytecodeProgram) {
    let mut vm = Vm::new(program.clone()).with_output(io::sink());
    vm.run().expect("vm runtime error");
}

fn load_program(name: &str) -> String {
    let path = format!("benches/programs/{}.tn", name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("failed to read {}", path))
}

fn programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("programs");

    for name in ["fib_recursive", "fib_iterative", "loop_sum", "methods"] {
        let program = compile(&load_program(name));
        group.bench_with_input(BenchmarkId::new("run", name), &program, |b, program| {
            b.iter(|| execute(black_box(program)))
        });
    }

    group.finish();
}

fn fib_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib_scaling");

    for n in [10, 15, 20].iter() {
        let source = format!(
            r#"
function fib(n: Int) -> Int
    if n <= 1 then
        return n
    end if
    return fib(n - 1) + fib(n - 2)
end function
var result = fib({})
"#,
            n
        );
        let program = compile(&source);

        group.bench_with_input(BenchmarkId::new("vm", n), &program, |b, program| {
            b.iter(|| execute(black_box(program)))
        });
    }

    group.finish();
}

/// Benchmark compilation time alone (not execution).
fn compilation_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation_overhead");

    let program = parse(&load_program("fib_recursive"));
    group.bench_function("compile_fib", |b| {
        b.iter(|| Compiler::compile(black_box(&program)))
    });

    let program = parse(&load_program("methods"));
    group.bench_function("compile_methods", |b| {
        b.iter(|| Compiler::compile(black_box(&program)))
    });

    group.finish();
}

criterion_group!(benches, programs, fib_scaling, compilation_overhead);

criterion_main!(benches);
