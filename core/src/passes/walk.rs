//! Shared traversal for the construct passes.
//!
//! Each pass declares the node kinds it handles through the [`Pass`] trait;
//! the walker owns the recursion. Marker subtrees are never entered: an
//! eval-expression sequence or an eval-block block is finished work owned by
//! a later stage. A handler that rebuilds a node returns [`Flow::Skip`] and
//! descends into the surviving children itself, so a pass never re-enters a
//! subtree it just created.

use crate::ast::{ArrowBody, Class, Expr, ExprKind, ForHead, ForInit, Function, Program, Prop, PropKey, Stmt, StmtKind};
use crate::marker;
use anyhow::Result;

pub(crate) enum Flow {
    Descend,
    Skip,
}

pub(crate) trait Pass {
    /// Called for every block-scoped statement list: `{}` blocks, function
    /// bodies, try/catch/finally bodies. Not called for the program body or
    /// switch-case bodies, which are not blocks.
    fn block(&mut self, _stmts: &mut Vec<Stmt>, _function_body: bool) -> Result<()> {
        Ok(())
    }

    fn stmt(&mut self, _stmt: &mut Stmt) -> Result<Flow> {
        Ok(Flow::Descend)
    }

    fn expr(&mut self, _expr: &mut Expr) -> Result<Flow> {
        Ok(Flow::Descend)
    }
}

pub(crate) fn walk_program<P: Pass>(pass: &mut P, program: &mut Program) -> Result<()> {
    walk_stmts(pass, &mut program.body)
}

pub(crate) fn walk_stmts<P: Pass>(pass: &mut P, stmts: &mut [Stmt]) -> Result<()> {
    for stmt in stmts {
        walk_stmt(pass, stmt)?;
    }
    Ok(())
}

pub(crate) fn walk_block<P: Pass>(pass: &mut P, stmts: &mut Vec<Stmt>, function_body: bool) -> Result<()> {
    if marker::is_eval_block(stmts) {
        return Ok(());
    }
    pass.block(stmts, function_body)?;
    // the handler may have marked the whole list
    if marker::is_eval_block(stmts) {
        return Ok(());
    }
    walk_stmts(pass, stmts)
}

pub(crate) fn walk_stmt<P: Pass>(pass: &mut P, stmt: &mut Stmt) -> Result<()> {
    if marker::is_eval_block_stmt(stmt) {
        return Ok(());
    }
    match pass.stmt(stmt)? {
        Flow::Skip => return Ok(()),
        Flow::Descend => {}
    }
    match &mut stmt.kind {
        StmtKind::Expr(e) => walk_expr(pass, e)?,
        StmtKind::VarDecl { decls, .. } => {
            for d in decls {
                if let Some(init) = &mut d.init {
                    walk_expr(pass, init)?;
                }
            }
        }
        StmtKind::FuncDecl(f) => walk_function(pass, f)?,
        StmtKind::ClassDecl(c) => walk_class(pass, c)?,
        StmtKind::Return(value) => {
            if let Some(e) = value {
                walk_expr(pass, e)?;
            }
        }
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            walk_expr(pass, test)?;
            walk_stmt(pass, consequent)?;
            if let Some(alt) = alternate {
                walk_stmt(pass, alt)?;
            }
        }
        StmtKind::Block(stmts) => walk_block(pass, stmts, false)?,
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::VarDecl { decls, .. }) => {
                    for d in decls {
                        if let Some(e) = &mut d.init {
                            walk_expr(pass, e)?;
                        }
                    }
                }
                Some(ForInit::Expr(e)) => walk_expr(pass, e)?,
                None => {}
            }
            if let Some(e) = test {
                walk_expr(pass, e)?;
            }
            if let Some(e) = update {
                walk_expr(pass, e)?;
            }
            walk_stmt(pass, body)?;
        }
        StmtKind::ForIn { left, right, body, .. } => {
            if let ForHead::Pattern(e) = left {
                walk_expr(pass, e)?;
            }
            walk_expr(pass, right)?;
            walk_stmt(pass, body)?;
        }
        StmtKind::While { test, body } => {
            walk_expr(pass, test)?;
            walk_stmt(pass, body)?;
        }
        StmtKind::DoWhile { body, test } => {
            walk_stmt(pass, body)?;
            walk_expr(pass, test)?;
        }
        StmtKind::Switch { discriminant, cases } => {
            walk_expr(pass, discriminant)?;
            for case in cases {
                if let Some(t) = &mut case.test {
                    walk_expr(pass, t)?;
                }
                walk_stmts(pass, &mut case.body)?;
            }
        }
        StmtKind::Break(_) | StmtKind::Continue(_) | StmtKind::Empty | StmtKind::Debugger => {}
        StmtKind::Labeled { body, .. } => walk_stmt(pass, body)?,
        StmtKind::Throw(e) => walk_expr(pass, e)?,
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_block(pass, block, false)?;
            if let Some(handler) = handler {
                walk_block(pass, &mut handler.body, false)?;
            }
            if let Some(finalizer) = finalizer {
                walk_block(pass, finalizer, false)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn walk_expr<P: Pass>(pass: &mut P, expr: &mut Expr) -> Result<()> {
    if marker::is_eval_expression(expr) {
        return Ok(());
    }
    match pass.expr(expr)? {
        Flow::Skip => return Ok(()),
        Flow::Descend => {}
    }
    match &mut expr.kind {
        ExprKind::Ident(_)
        | ExprKind::Num(_)
        | ExprKind::Str(_)
        | ExprKind::Template(_)
        | ExprKind::Regex(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::This
        | ExprKind::Super => {}
        ExprKind::Array(elems) => {
            for e in elems.iter_mut().flatten() {
                walk_expr(pass, e)?;
            }
        }
        ExprKind::Object(props) => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        walk_prop_key(pass, key)?;
                        walk_expr(pass, value)?;
                    }
                    Prop::Shorthand(_) => {}
                    Prop::Method { key, function, .. } => {
                        walk_prop_key(pass, key)?;
                        walk_function(pass, function)?;
                    }
                    Prop::Spread(e) => walk_expr(pass, e)?,
                }
            }
        }
        ExprKind::Function(f) => walk_function(pass, f)?,
        ExprKind::Arrow(a) => {
            for p in &mut a.params {
                if let Some(d) = &mut p.default {
                    walk_expr(pass, d)?;
                }
            }
            match &mut a.body {
                ArrowBody::Block(stmts) => walk_block(pass, stmts, true)?,
                ArrowBody::Expr(e) => walk_expr(pass, e)?,
            }
        }
        ExprKind::ClassExpr(c) => walk_class(pass, c)?,
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => walk_expr(pass, arg)?,
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            walk_expr(pass, left)?;
            walk_expr(pass, right)?;
        }
        ExprKind::Assign { target, value, .. } => {
            walk_expr(pass, target)?;
            walk_expr(pass, value)?;
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            walk_expr(pass, test)?;
            walk_expr(pass, consequent)?;
            walk_expr(pass, alternate)?;
        }
        ExprKind::Call { callee, args, .. } => {
            walk_expr(pass, callee)?;
            for a in args {
                walk_expr(pass, a)?;
            }
        }
        ExprKind::New { callee, args } => {
            walk_expr(pass, callee)?;
            for a in args {
                walk_expr(pass, a)?;
            }
        }
        ExprKind::Member { object, prop, .. } => {
            walk_expr(pass, object)?;
            if let crate::ast::MemberProp::Computed(e) = prop {
                walk_expr(pass, e)?;
            }
        }
        ExprKind::Sequence(exprs) => {
            for e in exprs {
                walk_expr(pass, e)?;
            }
        }
        ExprKind::Spread(e) | ExprKind::Await(e) => walk_expr(pass, e)?,
        ExprKind::Yield { arg, .. } => {
            if let Some(e) = arg {
                walk_expr(pass, e)?;
            }
        }
    }
    Ok(())
}

fn walk_prop_key<P: Pass>(pass: &mut P, key: &mut PropKey) -> Result<()> {
    if let PropKey::Computed(e) = key {
        walk_expr(pass, e)?;
    }
    Ok(())
}

pub(crate) fn walk_function<P: Pass>(pass: &mut P, f: &mut Function) -> Result<()> {
    for p in &mut f.params {
        if let Some(d) = &mut p.default {
            walk_expr(pass, d)?;
        }
    }
    walk_block(pass, &mut f.body, true)
}

fn walk_class<P: Pass>(pass: &mut P, c: &mut Class) -> Result<()> {
    if let Some(superclass) = &mut c.superclass {
        walk_expr(pass, superclass)?;
    }
    for member in &mut c.members {
        walk_prop_key(pass, &mut member.key)?;
        walk_function(pass, &mut member.function)?;
    }
    Ok(())
}
