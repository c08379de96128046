//! Conversion of abstract markers into real lazy-eval calls.
//!
//! Markers are consumed innermost-first, so a nested marker is already a
//! real eval call by the time the enclosing region's source is captured; no
//! reserved lexeme can survive embedded in a payload string.
//!
//! - eval-expression marker: `eval("<prefix>;(()=>{return (<src>)})()")`
//! - eval-block marker that is a function body: the body becomes
//!   `return eval("<prefix>;(()=>{<src>})()")`
//! - any other eval-block marker: the escaping-jump transformer rewrites the
//!   region, the region becomes the eval argument, and the call site gets
//!   the transformer's stub
//!
//! A region containing `await` or `yield` anywhere keeps its code inline:
//! suspension cannot cross the eval boundary, and correctness wins over the
//! size reduction. Its marker is still consumed.

use crate::ast::{ArrowBody, Class, Expr, ExprKind, Program, Prop, Stmt, StmtKind};
use crate::marker;
use crate::passes::{jumps, NameAlloc};
use anyhow::Result;

pub fn run(program: &mut Program, alloc: &mut NameAlloc) -> Result<()> {
    let mut m = Materializer {
        alloc,
        stub_name: None,
    };
    m.stmts(&mut program.body, false)
}

struct Materializer<'a> {
    alloc: &'a mut NameAlloc,
    /// one result identifier serves every stub; each binds it with `let`
    /// inside its own block
    stub_name: Option<String>,
}

impl Materializer<'_> {
    fn stub_name(&mut self) -> String {
        if self.stub_name.is_none() {
            self.stub_name = Some(self.alloc.fresh_ident("$8"));
        }
        self.stub_name.clone().expect("just set")
    }

    fn stmts(&mut self, stmts: &mut Vec<Stmt>, function_body: bool) -> Result<()> {
        if function_body && marker::is_eval_block(stmts) {
            let mut body = marker::strip_eval_block(std::mem::take(stmts));
            self.stmts(&mut body, false)?;
            if body.is_empty() {
                *stmts = body;
                return Ok(());
            }
            if has_await_or_yield_stmts(&body) {
                tracing::debug!("deferred function body contains await/yield; keeping it inline");
                *stmts = body;
                return Ok(());
            }
            let code = jumps::eval_code(&body);
            *stmts = vec![Stmt::new(StmtKind::Return(Some(marker::eval_call(&code))))];
            return Ok(());
        }
        for stmt in stmts.iter_mut() {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        if marker::is_eval_block_stmt(stmt) {
            let StmtKind::Block(block) = &mut stmt.kind else {
                unreachable!("checked by is_eval_block_stmt");
            };
            let mut body = marker::strip_eval_block(std::mem::take(block));
            self.stmts(&mut body, false)?;
            if body.is_empty() {
                *stmt = Stmt::new(StmtKind::Block(body));
                return Ok(());
            }
            if has_await_or_yield_stmts(&body) {
                tracing::debug!("deferred block contains await/yield; keeping it inline");
                *stmt = Stmt::new(StmtKind::Block(body));
                return Ok(());
            }
            let escaping = jumps::transform(&mut body)?;
            let call = marker::eval_call(&jumps::eval_code(&body));
            let stub = if escaping.is_empty() {
                escaping.stub("", call)
            } else {
                let name = self.stub_name();
                escaping.stub(&name, call)
            };
            *stmt = Stmt::new(StmtKind::Block(stub));
            return Ok(());
        }
        match &mut stmt.kind {
            StmtKind::Expr(e) | StmtKind::Throw(e) => self.expr(e)?,
            StmtKind::Return(Some(e)) => self.expr(e)?,
            StmtKind::VarDecl { decls, .. } => {
                for d in decls {
                    if let Some(init) = &mut d.init {
                        self.expr(init)?;
                    }
                }
            }
            StmtKind::FuncDecl(f) => self.function(f)?,
            StmtKind::ClassDecl(c) => self.class(c)?,
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test)?;
                self.stmt(consequent)?;
                if let Some(alt) = alternate {
                    self.stmt(alt)?;
                }
            }
            StmtKind::Block(stmts) => self.stmts(stmts, false)?,
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(crate::ast::ForInit::VarDecl { decls, .. }) => {
                        for d in decls {
                            if let Some(e) = &mut d.init {
                                self.expr(e)?;
                            }
                        }
                    }
                    Some(crate::ast::ForInit::Expr(e)) => self.expr(e)?,
                    None => {}
                }
                if let Some(e) = test {
                    self.expr(e)?;
                }
                if let Some(e) = update {
                    self.expr(e)?;
                }
                self.stmt(body)?;
            }
            StmtKind::ForIn { left, right, body, .. } => {
                if let crate::ast::ForHead::Pattern(e) = left {
                    self.expr(e)?;
                }
                self.expr(right)?;
                self.stmt(body)?;
            }
            StmtKind::While { test, body } => {
                self.expr(test)?;
                self.stmt(body)?;
            }
            StmtKind::DoWhile { body, test } => {
                self.stmt(body)?;
                self.expr(test)?;
            }
            StmtKind::Switch { discriminant, cases } => {
                self.expr(discriminant)?;
                for case in cases {
                    if let Some(t) = &mut case.test {
                        self.expr(t)?;
                    }
                    self.stmts(&mut case.body, false)?;
                }
            }
            StmtKind::Labeled { body, .. } => self.stmt(body)?,
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.stmts(block, false)?;
                if let Some(handler) = handler {
                    self.stmts(&mut handler.body, false)?;
                }
                if let Some(finalizer) = finalizer {
                    self.stmts(finalizer, false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr) -> Result<()> {
        // children first, so inner markers are already materialized when an
        // enclosing marker's source is captured
        match &mut expr.kind {
            ExprKind::Array(elems) => {
                for e in elems.iter_mut().flatten() {
                    self.expr(e)?;
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            if let crate::ast::PropKey::Computed(e) = key {
                                self.expr(e)?;
                            }
                            self.expr(value)?;
                        }
                        Prop::Shorthand(_) => {}
                        Prop::Method { key, function, .. } => {
                            if let crate::ast::PropKey::Computed(e) = key {
                                self.expr(e)?;
                            }
                            self.function(function)?;
                        }
                        Prop::Spread(e) => self.expr(e)?,
                    }
                }
            }
            ExprKind::Function(f) => self.function(f)?,
            ExprKind::Arrow(a) => match &mut a.body {
                ArrowBody::Block(stmts) => self.stmts(stmts, true)?,
                ArrowBody::Expr(e) => self.expr(e)?,
            },
            ExprKind::ClassExpr(c) => self.class(c)?,
            ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => self.expr(arg)?,
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)?;
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(target)?;
                self.expr(value)?;
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test)?;
                self.expr(consequent)?;
                self.expr(alternate)?;
            }
            ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
                self.expr(callee)?;
                for a in args {
                    self.expr(a)?;
                }
            }
            ExprKind::Member { object, prop, .. } => {
                self.expr(object)?;
                if let crate::ast::MemberProp::Computed(e) = prop {
                    self.expr(e)?;
                }
            }
            ExprKind::Sequence(exprs) => {
                for e in exprs {
                    self.expr(e)?;
                }
            }
            ExprKind::Spread(e) | ExprKind::Await(e) => self.expr(e)?,
            ExprKind::Yield { arg: Some(e), .. } => self.expr(e)?,
            _ => {}
        }

        if marker::is_eval_expression(expr) {
            let inner = marker::unwrap_eval_expression(std::mem::replace(expr, Expr::new(ExprKind::Null)));
            if has_await_or_yield_expr(&inner) {
                tracing::debug!("deferred expression contains await/yield; keeping it inline");
                *expr = inner;
            } else {
                *expr = marker::eval_call(&format!("(()=>{{return ({})}})()", inner));
            }
        }
        Ok(())
    }

    fn function(&mut self, f: &mut crate::ast::Function) -> Result<()> {
        for p in &mut f.params {
            if let Some(d) = &mut p.default {
                self.expr(d)?;
            }
        }
        self.stmts(&mut f.body, true)
    }

    fn class(&mut self, c: &mut Class) -> Result<()> {
        if let Some(superclass) = &mut c.superclass {
            self.expr(superclass)?;
        }
        for member in &mut c.members {
            if let crate::ast::PropKey::Computed(e) = &mut member.key {
                self.expr(e)?;
            }
            self.function(&mut member.function)?;
        }
        Ok(())
    }
}

pub(crate) fn has_await_or_yield_stmts(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_has_await_or_yield)
}

fn stmt_has_await_or_yield(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Expr(e) | StmtKind::Throw(e) => has_await_or_yield_expr(e),
        StmtKind::Return(value) => value.as_ref().is_some_and(has_await_or_yield_expr),
        StmtKind::VarDecl { decls, .. } => decls
            .iter()
            .any(|d| d.init.as_ref().is_some_and(has_await_or_yield_expr)),
        StmtKind::FuncDecl(f) => has_await_or_yield_stmts(&f.body),
        StmtKind::ClassDecl(c) => class_has_await_or_yield(c),
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            has_await_or_yield_expr(test)
                || stmt_has_await_or_yield(consequent)
                || alternate.as_ref().is_some_and(|s| stmt_has_await_or_yield(s))
        }
        StmtKind::Block(stmts) => has_await_or_yield_stmts(stmts),
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            (match init {
                Some(crate::ast::ForInit::VarDecl { decls, .. }) => decls
                    .iter()
                    .any(|d| d.init.as_ref().is_some_and(has_await_or_yield_expr)),
                Some(crate::ast::ForInit::Expr(e)) => has_await_or_yield_expr(e),
                None => false,
            }) || test.as_ref().is_some_and(has_await_or_yield_expr)
                || update.as_ref().is_some_and(has_await_or_yield_expr)
                || stmt_has_await_or_yield(body)
        }
        StmtKind::ForIn { left, right, body, .. } => {
            matches!(left, crate::ast::ForHead::Pattern(e) if has_await_or_yield_expr(e))
                || has_await_or_yield_expr(right)
                || stmt_has_await_or_yield(body)
        }
        StmtKind::While { test, body } => has_await_or_yield_expr(test) || stmt_has_await_or_yield(body),
        StmtKind::DoWhile { body, test } => stmt_has_await_or_yield(body) || has_await_or_yield_expr(test),
        StmtKind::Switch { discriminant, cases } => {
            has_await_or_yield_expr(discriminant)
                || cases.iter().any(|case| {
                    case.test.as_ref().is_some_and(has_await_or_yield_expr)
                        || has_await_or_yield_stmts(&case.body)
                })
        }
        StmtKind::Labeled { body, .. } => stmt_has_await_or_yield(body),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            has_await_or_yield_stmts(block)
                || handler
                    .as_ref()
                    .is_some_and(|h| has_await_or_yield_stmts(&h.body))
                || finalizer.as_ref().is_some_and(|f| has_await_or_yield_stmts(f))
        }
        _ => false,
    }
}

pub(crate) fn has_await_or_yield_expr(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Await(_) | ExprKind::Yield { .. } => true,
        ExprKind::Array(elems) => elems.iter().flatten().any(has_await_or_yield_expr),
        ExprKind::Object(props) => props.iter().any(|prop| match prop {
            Prop::KeyValue { key, value } => {
                matches!(key, crate::ast::PropKey::Computed(e) if has_await_or_yield_expr(e))
                    || has_await_or_yield_expr(value)
            }
            Prop::Shorthand(_) => false,
            Prop::Method { key, function, .. } => {
                matches!(key, crate::ast::PropKey::Computed(e) if has_await_or_yield_expr(e))
                    || has_await_or_yield_stmts(&function.body)
            }
            Prop::Spread(e) => has_await_or_yield_expr(e),
        }),
        ExprKind::Function(f) => has_await_or_yield_stmts(&f.body),
        ExprKind::Arrow(a) => match &a.body {
            ArrowBody::Block(stmts) => has_await_or_yield_stmts(stmts),
            ArrowBody::Expr(e) => has_await_or_yield_expr(e),
        },
        ExprKind::ClassExpr(c) => class_has_await_or_yield(c),
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => has_await_or_yield_expr(arg),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            has_await_or_yield_expr(left) || has_await_or_yield_expr(right)
        }
        ExprKind::Assign { target, value, .. } => {
            has_await_or_yield_expr(target) || has_await_or_yield_expr(value)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            has_await_or_yield_expr(test)
                || has_await_or_yield_expr(consequent)
                || has_await_or_yield_expr(alternate)
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            has_await_or_yield_expr(callee) || args.iter().any(has_await_or_yield_expr)
        }
        ExprKind::Member { object, prop, .. } => {
            has_await_or_yield_expr(object)
                || matches!(prop, crate::ast::MemberProp::Computed(e) if has_await_or_yield_expr(e))
        }
        ExprKind::Sequence(exprs) => exprs.iter().any(has_await_or_yield_expr),
        ExprKind::Spread(e) => has_await_or_yield_expr(e),
        _ => false,
    }
}

fn class_has_await_or_yield(c: &Class) -> bool {
    c.superclass.as_ref().is_some_and(|e| has_await_or_yield_expr(e))
        || c.members.iter().any(|m| {
            matches!(&m.key, crate::ast::PropKey::Computed(e) if has_await_or_yield_expr(e))
                || has_await_or_yield_stmts(&m.function.body)
        })
}
