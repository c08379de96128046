//! Conservative compression between materialization and fusion.
//!
//! The full general-purpose minifier is an external collaborator; this pass
//! applies only the structure-flattening rewrites fusion depends on, all of
//! them semantics-preserving on any input:
//!
//! - `if (t) <expr>;` becomes `t && <expr>;`
//! - `if (t) <a>; else <b>;` becomes `t ? <a> : <b>;`
//! - single-purpose blocks without lexical declarations are unwrapped
//! - empty statements and empty else branches are dropped
//!
//! Logical chains are rebuilt left-associated so a later flatten walks the
//! whole chain. String literals, eval arguments included, are never touched.

#[cfg(test)]
mod minify_test;

use crate::ast::{Expr, ExprKind, LogicalOp, Program, Stmt, StmtKind, UnaryOp};

pub fn compress(program: &mut Program) {
    compress_stmts(&mut program.body);
}

fn compress_stmts(stmts: &mut Vec<Stmt>) {
    for stmt in stmts.iter_mut() {
        compress_stmt(stmt);
    }
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts.drain(..) {
        match stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Block(inner) if can_unwrap(&inner) => out.extend(inner),
            kind => out.push(Stmt::at(kind, stmt.loc)),
        }
    }
    *stmts = out;
}

fn compress_stmt(stmt: &mut Stmt) {
    // children first, so an inner `if` has already collapsed to an
    // expression statement when the outer one is considered
    match &mut stmt.kind {
        StmtKind::Block(stmts) => compress_stmts(stmts),
        StmtKind::If {
            consequent, alternate, ..
        } => {
            compress_stmt(consequent);
            if let Some(alt) = alternate {
                compress_stmt(alt);
            }
        }
        StmtKind::FuncDecl(f) => compress_stmts(&mut f.body),
        StmtKind::For { body, .. }
        | StmtKind::ForIn { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => compress_stmt(body),
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                compress_stmts(&mut case.body);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            compress_stmts(block);
            if let Some(handler) = handler {
                compress_stmts(&mut handler.body);
            }
            if let Some(finalizer) = finalizer {
                compress_stmts(finalizer);
            }
        }
        StmtKind::Expr(e) | StmtKind::Throw(e) => compress_expr(e),
        StmtKind::Return(Some(e)) => compress_expr(e),
        StmtKind::VarDecl { decls, .. } => {
            for d in decls.iter_mut() {
                if let Some(init) = &mut d.init {
                    compress_expr(init);
                }
            }
        }
        StmtKind::ClassDecl(c) => compress_class(c),
        _ => {}
    }

    let StmtKind::If {
        test,
        consequent,
        alternate,
    } = &mut stmt.kind
    else {
        return;
    };

    if alternate.as_ref().is_some_and(|alt| is_empty_stmt(alt)) {
        *alternate = None;
    }

    let cons_empty = is_empty_stmt(consequent);
    let cons_is_expr = !cons_empty && single_expr(consequent).is_some();
    let alt_is_expr = alternate.as_deref().is_some_and(|alt| single_expr(alt).is_some());

    let take_test = |test: &mut Expr| std::mem::replace(test, Expr::new(ExprKind::Null));
    let replacement = if cons_is_expr && alt_is_expr {
        let cons = take_single_expr(consequent).expect("checked above");
        let alt = take_single_expr(alternate.as_mut().expect("checked above")).expect("checked above");
        Some(Expr::new(ExprKind::Conditional {
            test: Box::new(take_test(test)),
            consequent: Box::new(cons),
            alternate: Box::new(alt),
        }))
    } else if cons_is_expr && alternate.is_none() {
        let cons = take_single_expr(consequent).expect("checked above");
        Some(logical_chain(LogicalOp::And, take_test(test), cons))
    } else if cons_empty && alt_is_expr {
        let alt = take_single_expr(alternate.as_mut().expect("checked above")).expect("checked above");
        let negated = Expr::new(ExprKind::Unary {
            op: UnaryOp::Not,
            arg: Box::new(take_test(test)),
        });
        Some(logical_chain(LogicalOp::And, negated, alt))
    } else if cons_empty && alternate.is_none() {
        // the test may carry side effects; keep it
        Some(take_test(test))
    } else {
        None
    };

    if let Some(expr) = replacement {
        *stmt = Stmt::expr(expr);
    }
}

/// Function bodies in expression position are compressed too; everything
/// else is left as written.
fn compress_expr(e: &mut Expr) {
    match &mut e.kind {
        ExprKind::Function(f) => compress_stmts(&mut f.body),
        ExprKind::Arrow(a) => match &mut a.body {
            crate::ast::ArrowBody::Block(stmts) => compress_stmts(stmts),
            crate::ast::ArrowBody::Expr(inner) => compress_expr(inner),
        },
        ExprKind::ClassExpr(c) => compress_class(c),
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    crate::ast::Prop::KeyValue { value, .. } => compress_expr(value),
                    crate::ast::Prop::Method { function, .. } => compress_stmts(&mut function.body),
                    crate::ast::Prop::Spread(inner) => compress_expr(inner),
                    crate::ast::Prop::Shorthand(_) => {}
                }
            }
        }
        ExprKind::Array(elems) => {
            for inner in elems.iter_mut().flatten() {
                compress_expr(inner);
            }
        }
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => compress_expr(arg),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            compress_expr(left);
            compress_expr(right);
        }
        ExprKind::Assign { target, value, .. } => {
            compress_expr(target);
            compress_expr(value);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            compress_expr(test);
            compress_expr(consequent);
            compress_expr(alternate);
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            compress_expr(callee);
            for a in args {
                compress_expr(a);
            }
        }
        ExprKind::Member { object, prop, .. } => {
            compress_expr(object);
            if let crate::ast::MemberProp::Computed(inner) = prop {
                compress_expr(inner);
            }
        }
        ExprKind::Sequence(exprs) => {
            for inner in exprs {
                compress_expr(inner);
            }
        }
        ExprKind::Spread(inner) | ExprKind::Await(inner) => compress_expr(inner),
        ExprKind::Yield { arg: Some(inner), .. } => compress_expr(inner),
        _ => {}
    }
}

fn compress_class(c: &mut crate::ast::Class) {
    if let Some(superclass) = &mut c.superclass {
        compress_expr(superclass);
    }
    for member in &mut c.members {
        compress_stmts(&mut member.function.body);
    }
}

/// `;` or `{}` (possibly nested).
fn is_empty_stmt(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Empty => true,
        StmtKind::Block(stmts) => stmts.iter().all(is_empty_stmt),
        _ => false,
    }
}

/// The single expression a statement amounts to, if any: an expression
/// statement, possibly wrapped in blocks.
fn single_expr(stmt: &Stmt) -> Option<&Expr> {
    match &stmt.kind {
        StmtKind::Expr(e) => Some(e),
        StmtKind::Block(stmts) if stmts.len() == 1 => single_expr(&stmts[0]),
        _ => None,
    }
}

fn take_single_expr(stmt: &mut Stmt) -> Option<Expr> {
    match &mut stmt.kind {
        StmtKind::Expr(e) => Some(std::mem::replace(e, Expr::new(ExprKind::Null))),
        StmtKind::Block(stmts) if stmts.len() == 1 => take_single_expr(&mut stmts[0]),
        _ => None,
    }
}

/// Join two expressions with a logical operator, flattening both sides into
/// one left-associated chain.
fn logical_chain(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let mut operands = Vec::new();
    flatten_into(left, op, &mut operands);
    flatten_into(right, op, &mut operands);
    let mut iter = operands.into_iter();
    let first = iter.next().expect("two operands were provided");
    iter.fold(first, |l, r| {
        Expr::new(ExprKind::Logical {
            op,
            left: Box::new(l),
            right: Box::new(r),
        })
    })
}

fn flatten_into(expr: Expr, op: LogicalOp, out: &mut Vec<Expr>) {
    match expr.kind {
        ExprKind::Logical {
            op: child_op,
            left,
            right,
        } if child_op == op => {
            flatten_into(*left, op, out);
            flatten_into(*right, op, out);
        }
        kind => out.push(Expr::at(kind, expr.loc)),
    }
}

/// A block may be dissolved into its parent list when it declares nothing
/// block-scoped.
fn can_unwrap(stmts: &[Stmt]) -> bool {
    stmts.iter().all(|s| {
        !matches!(
            s.kind,
            StmtKind::VarDecl {
                kind: crate::ast::DeclKind::Let | crate::ast::DeclKind::Const,
                ..
            } | StmtKind::FuncDecl(_)
                | StmtKind::ClassDecl(_)
        )
    })
}
