//! Hoisted-declaration repair for deferred blocks.
//!
//! A `var` or function declaration inside a soon-to-be-deferred block is
//! visible (as `undefined`, or as the function binding) to code outside the
//! block before it runs. Deferral would destroy that window, so for every
//! eval-block marker that is not a function body this pass inserts, directly
//! before the still-marked block, one `var` declaration naming every `var`
//! identifier of the subtree in sorted order, followed by the block's
//! directly-declared functions in original order. The `var` statements inside
//! the block stay put: redeclaration is harmless and their assignment effect
//! must stay deferred. Function declarations move out entirely; their binding
//! must exist even when the block never runs.
//!
//! Function-body markers need no repair: nothing inside is visible outside
//! the function. Markers nested inside markers are repaired too, innermost
//! last, so every visibility window survives.

use crate::ast::{
    ArrowBody, Class, DeclKind, Declarator, Expr, ExprKind, ForHead, ForInit, Program, Prop, Stmt, StmtKind,
};
use crate::marker;
use anyhow::Result;
use rustc_hash::FxHashSet;

pub fn run(program: &mut Program) -> Result<()> {
    fix_stmts(&mut program.body);
    Ok(())
}

fn fix_stmts(stmts: &mut Vec<Stmt>) {
    let mut i = 0;
    while i < stmts.len() {
        if marker::is_eval_block_stmt(&stmts[i]) {
            let StmtKind::Block(body) = &mut stmts[i].kind else {
                unreachable!("checked by is_eval_block_stmt");
            };

            let mut names = FxHashSet::default();
            collect_var_names(body, &mut names);

            let mut hoisted: Vec<Stmt> = Vec::new();
            if !names.is_empty() {
                let mut names: Vec<String> = names.into_iter().collect();
                names.sort();
                hoisted.push(Stmt::new(StmtKind::VarDecl {
                    kind: DeclKind::Var,
                    decls: names
                        .into_iter()
                        .map(|name| Declarator { name, init: None })
                        .collect(),
                }));
            }
            let mut j = 0;
            while j < body.len() {
                if matches!(body[j].kind, StmtKind::FuncDecl(_)) {
                    hoisted.push(body.remove(j));
                } else {
                    j += 1;
                }
            }

            let count = hoisted.len();
            stmts.splice(i..i, hoisted);
            i += count;

            // repair markers nested inside this one as well
            let StmtKind::Block(body) = &mut stmts[i].kind else {
                unreachable!("the marker block was only shifted");
            };
            fix_stmts(body);
        } else {
            fix_stmt(&mut stmts[i]);
        }
        i += 1;
    }
}

fn fix_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::FuncDecl(f) => fix_stmts(&mut f.body),
        StmtKind::ClassDecl(c) => fix_class(c),
        StmtKind::If {
            consequent, alternate, ..
        } => {
            fix_boxed(consequent);
            if let Some(alt) = alternate {
                fix_boxed(alt);
            }
        }
        StmtKind::Block(stmts) => fix_stmts(stmts),
        StmtKind::For { body, .. }
        | StmtKind::ForIn { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => fix_boxed(body),
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                fix_stmts(&mut case.body);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            fix_stmts(block);
            if let Some(handler) = handler {
                fix_stmts(&mut handler.body);
            }
            if let Some(finalizer) = finalizer {
                fix_stmts(finalizer);
            }
        }
        StmtKind::Expr(e) | StmtKind::Throw(e) => fix_expr(e),
        StmtKind::Return(Some(e)) => fix_expr(e),
        StmtKind::VarDecl { decls, .. } => {
            for d in decls {
                if let Some(init) = &mut d.init {
                    fix_expr(init);
                }
            }
        }
        _ => {}
    }
}

/// A boxed statement position cannot hold a marker block directly after the
/// if/else normalization, but descend defensively through whatever is there.
fn fix_boxed(stmt: &mut Box<Stmt>) {
    if let StmtKind::Block(stmts) = &mut stmt.kind {
        if marker::is_eval_block(stmts) {
            // a marker in a non-list position has nowhere to put hoisted
            // declarations; treat it as a one-element list
            let inner = std::mem::take(stmts);
            let mut list = vec![Stmt::new(StmtKind::Block(inner))];
            fix_stmts(&mut list);
            **stmt = Stmt::new(StmtKind::Block(list));
            return;
        }
    }
    fix_stmt(stmt);
}

/// Functions in expression position carry their own scopes; look inside for
/// markers but collect nothing from them.
fn fix_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Function(f) => fix_stmts(&mut f.body),
        ExprKind::Arrow(a) => match &mut a.body {
            ArrowBody::Block(stmts) => fix_stmts(stmts),
            ArrowBody::Expr(e) => fix_expr(e),
        },
        ExprKind::ClassExpr(c) => fix_class(c),
        ExprKind::Array(elems) => {
            for e in elems.iter_mut().flatten() {
                fix_expr(e);
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { value, .. } => fix_expr(value),
                    Prop::Method { function, .. } => fix_stmts(&mut function.body),
                    Prop::Spread(e) => fix_expr(e),
                    Prop::Shorthand(_) => {}
                }
            }
        }
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => fix_expr(arg),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            fix_expr(left);
            fix_expr(right);
        }
        ExprKind::Assign { target, value, .. } => {
            fix_expr(target);
            fix_expr(value);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            fix_expr(test);
            fix_expr(consequent);
            fix_expr(alternate);
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            fix_expr(callee);
            for a in args {
                fix_expr(a);
            }
        }
        ExprKind::Member { object, prop, .. } => {
            fix_expr(object);
            if let crate::ast::MemberProp::Computed(e) = prop {
                fix_expr(e);
            }
        }
        ExprKind::Sequence(exprs) => {
            for e in exprs {
                fix_expr(e);
            }
        }
        ExprKind::Spread(e) | ExprKind::Await(e) => fix_expr(e),
        ExprKind::Yield { arg: Some(e), .. } => fix_expr(e),
        _ => {}
    }
}

fn fix_class(c: &mut Class) {
    if let Some(superclass) = &mut c.superclass {
        fix_expr(superclass);
    }
    for member in &mut c.members {
        fix_stmts(&mut member.function.body);
    }
}

/// Every `var`-declared name in the subtree whose function scope is the one
/// enclosing the marker block; nested functions keep their own vars.
fn collect_var_names(stmts: &[Stmt], names: &mut FxHashSet<String>) {
    for stmt in stmts {
        collect_in_stmt(stmt, names);
    }
}

fn collect_in_stmt(stmt: &Stmt, names: &mut FxHashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl {
            kind: DeclKind::Var,
            decls,
        } => {
            for d in decls {
                names.insert(d.name.clone());
            }
        }
        StmtKind::If {
            consequent, alternate, ..
        } => {
            collect_in_stmt(consequent, names);
            if let Some(alt) = alternate {
                collect_in_stmt(alt, names);
            }
        }
        StmtKind::Block(stmts) => collect_var_names(stmts, names),
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::VarDecl {
                kind: DeclKind::Var,
                decls,
            }) = init
            {
                for d in decls {
                    names.insert(d.name.clone());
                }
            }
            collect_in_stmt(body, names);
        }
        StmtKind::ForIn { left, body, .. } => {
            if let ForHead::VarDecl {
                kind: DeclKind::Var,
                name,
            } = left
            {
                names.insert(name.clone());
            }
            collect_in_stmt(body, names);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
            collect_in_stmt(body, names)
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                collect_var_names(&case.body, names);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, names);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, names);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, names);
            }
        }
        // function declarations and expressions open a new var scope
        _ => {}
    }
}
