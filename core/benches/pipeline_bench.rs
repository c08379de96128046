use coldpath_core::optimize::{OptimizeOptions, generate_optimized_code, generate_trace_code};
use coldpath_core::trace::TraceData;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

// A synthetic bundle: many small handlers, a dispatch switch, and logical
// fallback chains, so every construct pass has work to do.
fn build_source(n_functions: usize) -> String {
    let mut src = String::new();
    for i in 0..n_functions {
        src.push_str(&format!(
            "function handler{i}(arg) {{\n  prepare{i}(arg);\n  if (arg > {i}) {{\n    expensiveFallback{i}(arg, arg + 1, arg + 2);\n  }}\n  return arg || defaultValue{i}();\n}}\n",
        ));
    }
    src.push_str("function dispatch(kind) {\n  switch (kind) {\n");
    for i in 0..n_functions {
        src.push_str(&format!("    case 'k{i}':\n      return handler{i}({i});\n"));
    }
    src.push_str("    default:\n      return null;\n  }\n}\ndispatch('k0');\n");
    src
}

fn bench_trace_codegen(c: &mut Criterion) {
    let src = build_source(50);
    c.bench_function("generate_trace_code_50_fns", |b| {
        b.iter(|| generate_trace_code(black_box(&src)).unwrap());
    });
}

fn bench_optimize_codegen(c: &mut Criterion) {
    let src = build_source(50);
    // an empty trace defers everything deferrable
    let trace = TraceData::default();
    let options = OptimizeOptions {
        include_loader: false,
        keep_code: false,
    };
    c.bench_function("generate_optimized_code_50_fns", |b| {
        b.iter(|| generate_optimized_code(black_box(&src), &trace, &options).unwrap());
    });
}

criterion_group!(benches, bench_trace_codegen, bench_optimize_codegen);
criterion_main!(benches);
