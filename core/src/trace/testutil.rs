//! Trace simulation for tests.
//!
//! The repo carries no JavaScript engine, so tests stand in for the browser
//! run: the real trace-mode passes instrument a parse of the source, every
//! instrumented position is harvested together with the printed snippet of
//! its construct, and a predicate decides which constructs "ran". By
//! convention a construct whose snippet mentions `cold` did not run.

use crate::ast::{self, Expr, ExprKind, MemberProp, Program, Stmt, StmtKind};
use crate::passes::{self, Mode, NameAlloc};
use crate::trace::{TRACE_RUNTIME_GLOBAL, TraceData};

pub fn simulate_trace(source: &str) -> TraceData {
    simulate_trace_with(source, |snippet| !snippet.contains("cold"))
}

pub fn simulate_trace_with(source: &str, executed: impl Fn(&str) -> bool) -> TraceData {
    let mut data = TraceData::default();
    for (pos, snippet) in instrumented_positions(source) {
        data.counts.insert(pos, if executed(&snippet) { 1 } else { 0 });
    }
    data
}

/// Every position the trace passes instrument, with the printed snippet of
/// the construct it counts.
pub fn instrumented_positions(source: &str) -> Vec<(String, String)> {
    let mut program = ast::parse(source).expect("test source must parse");
    let mut alloc = NameAlloc::for_program(&program);
    passes::const_literal::run(&mut program, Mode::Trace).expect("const-literal trace pass");
    passes::if_else::run(&mut program).expect("if/else normalization");
    passes::block::run(&mut program, Mode::Trace).expect("block trace pass");
    passes::switch::run(&mut program, Mode::Trace, &mut alloc).expect("switch trace pass");
    passes::logical::run(&mut program, Mode::Trace).expect("logical trace pass");
    passes::conditional::run(&mut program, Mode::Trace).expect("conditional trace pass");

    let mut out = Vec::new();
    harvest_program(&program, &mut out);
    out
}

fn harvest_program(program: &Program, out: &mut Vec<(String, String)>) {
    harvest_stmts(&program.body, out);
}

fn harvest_stmts(stmts: &[Stmt], out: &mut Vec<(String, String)>) {
    for (i, stmt) in stmts.iter().enumerate() {
        if let Some(pos) = counter_pos(stmt) {
            let snippet = stmts.get(i + 1).map(|s| s.to_string()).unwrap_or_default();
            out.push((pos, snippet));
            continue;
        }
        harvest_stmt(stmt, out);
    }
}

fn harvest_stmt(stmt: &Stmt, out: &mut Vec<(String, String)>) {
    match &stmt.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => harvest_expr(e, out),
        StmtKind::Return(Some(e)) => harvest_expr(e, out),
        StmtKind::VarDecl { decls, .. } => {
            for d in decls {
                if let Some(init) = &d.init {
                    harvest_expr(init, out);
                }
            }
        }
        StmtKind::FuncDecl(f) => harvest_stmts(&f.body, out),
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            harvest_expr(test, out);
            harvest_stmt(consequent, out);
            if let Some(alt) = alternate {
                harvest_stmt(alt, out);
            }
        }
        StmtKind::Block(stmts) => harvest_stmts(stmts, out),
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(crate::ast::ForInit::VarDecl { decls, .. }) => {
                    for d in decls {
                        if let Some(e) = &d.init {
                            harvest_expr(e, out);
                        }
                    }
                }
                Some(crate::ast::ForInit::Expr(e)) => harvest_expr(e, out),
                None => {}
            }
            if let Some(e) = test {
                harvest_expr(e, out);
            }
            if let Some(e) = update {
                harvest_expr(e, out);
            }
            harvest_stmt(body, out);
        }
        StmtKind::ForIn { right, body, .. } => {
            harvest_expr(right, out);
            harvest_stmt(body, out);
        }
        StmtKind::While { test, body } => {
            harvest_expr(test, out);
            harvest_stmt(body, out);
        }
        StmtKind::DoWhile { body, test } => {
            harvest_stmt(body, out);
            harvest_expr(test, out);
        }
        StmtKind::Switch { discriminant, cases } => {
            harvest_expr(discriminant, out);
            for case in cases {
                let test_text = case
                    .test
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "default".to_string());
                if let Some(pos) = case.body.first().and_then(counter_pos) {
                    let rest: String = case.body[1..].iter().map(|s| s.to_string()).collect();
                    out.push((pos, format!("{}:{}", test_text, rest)));
                    harvest_stmts(&case.body[1..], out);
                } else {
                    harvest_stmts(&case.body, out);
                }
            }
        }
        StmtKind::Labeled { body, .. } => harvest_stmt(body, out),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            harvest_stmts(block, out);
            if let Some(handler) = handler {
                harvest_stmts(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                harvest_stmts(finalizer, out);
            }
        }
        _ => {}
    }
}

fn harvest_expr(expr: &Expr, out: &mut Vec<(String, String)>) {
    if let ExprKind::Sequence(exprs) = &expr.kind
        && exprs.len() == 2
        && let Some(pos) = runtime_call_pos(&exprs[0], "trace")
    {
        out.push((pos, exprs[1].to_string()));
        harvest_expr(&exprs[1], out);
        return;
    }
    if let ExprKind::Call { callee, args, .. } = &expr.kind
        && is_runtime_method(callee, "traceConst")
        && let [inner, Expr {
            kind: ExprKind::Str(pos),
            ..
        }] = args.as_slice()
    {
        out.push((pos.clone(), inner.to_string()));
        return;
    }
    match &expr.kind {
        ExprKind::Array(elems) => {
            for e in elems.iter().flatten() {
                harvest_expr(e, out);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    crate::ast::Prop::KeyValue { value, .. } => harvest_expr(value, out),
                    crate::ast::Prop::Method { function, .. } => harvest_stmts(&function.body, out),
                    crate::ast::Prop::Spread(e) => harvest_expr(e, out),
                    crate::ast::Prop::Shorthand(_) => {}
                }
            }
        }
        ExprKind::Function(f) => harvest_stmts(&f.body, out),
        ExprKind::Arrow(a) => match &a.body {
            crate::ast::ArrowBody::Block(stmts) => harvest_stmts(stmts, out),
            crate::ast::ArrowBody::Expr(e) => harvest_expr(e, out),
        },
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => harvest_expr(arg, out),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            harvest_expr(left, out);
            harvest_expr(right, out);
        }
        ExprKind::Assign { target, value, .. } => {
            harvest_expr(target, out);
            harvest_expr(value, out);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            harvest_expr(test, out);
            harvest_expr(consequent, out);
            harvest_expr(alternate, out);
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            harvest_expr(callee, out);
            for a in args {
                harvest_expr(a, out);
            }
        }
        ExprKind::Member { object, prop, .. } => {
            harvest_expr(object, out);
            if let MemberProp::Computed(e) = prop {
                harvest_expr(e, out);
            }
        }
        ExprKind::Sequence(exprs) => {
            for e in exprs {
                harvest_expr(e, out);
            }
        }
        ExprKind::Spread(e) | ExprKind::Await(e) => harvest_expr(e, out),
        ExprKind::Yield { arg: Some(e), .. } => harvest_expr(e, out),
        _ => {}
    }
}

/// `__COLDPATH__.trace("<pos>");` as a whole statement.
fn counter_pos(stmt: &Stmt) -> Option<String> {
    let StmtKind::Expr(expr) = &stmt.kind else {
        return None;
    };
    runtime_call_pos(expr, "trace")
}

fn runtime_call_pos(expr: &Expr, method: &str) -> Option<String> {
    let ExprKind::Call { callee, args, .. } = &expr.kind else {
        return None;
    };
    if !is_runtime_method(callee, method) {
        return None;
    }
    let [arg] = args.as_slice() else { return None };
    let ExprKind::Str(pos) = &arg.kind else { return None };
    Some(pos.clone())
}

fn is_runtime_method(callee: &Expr, method: &str) -> bool {
    let ExprKind::Member { object, prop, .. } = &callee.kind else {
        return false;
    };
    matches!(&object.kind, ExprKind::Ident(name) if name == TRACE_RUNTIME_GLOBAL)
        && matches!(prop, MemberProp::Ident(name) if name == method)
}
