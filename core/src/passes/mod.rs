//! The trace/optimize construct passes and the rewrite stages behind them.
//!
//! Each pass is a full tree-to-tree walk; the pipeline runs them in a fixed
//! order (see `optimize.rs`). A pass never descends into a marker subtree,
//! and never re-enters a subtree it just created.

pub(crate) mod walk;

pub mod block;
pub mod conditional;
pub mod const_literal;
pub mod extract;
pub mod fusion;
pub mod hoist;
pub mod if_else;
pub mod jumps;
pub mod logical;
pub mod materialize;
pub mod switch;

#[cfg(test)]
mod fusion_test;
#[cfg(test)]
mod hoist_test;
#[cfg(test)]
mod jumps_test;
#[cfg(test)]
mod materialize_test;
#[cfg(test)]
mod switch_test;

use crate::ast::{
    Arrow, ArrowBody, Class, Expr, ExprKind, ForHead, ForInit, Function, Program, Prop, PropKey, Stmt, StmtKind,
};
use crate::trace::TraceData;
use rustc_hash::{FxHashMap, FxHashSet};

/// Which half of the pipeline a construct pass is running in. Trace
/// instruments, optimize marks cold regions; the two never interleave
/// within one pass invocation.
#[derive(Clone, Copy)]
pub enum Mode<'a> {
    Trace,
    Optimize(&'a TraceData),
}

/// Allocator for labels and identifiers synthesized during rewriting.
///
/// Seeded with every identifier and label appearing in the original source,
/// so a fresh name can never collide with user code or with another fresh
/// name. Passed through each pass invocation instead of living in module
/// state.
pub struct NameAlloc {
    idents: FxHashSet<String>,
    labels: FxHashSet<String>,
    counters: FxHashMap<String, u32>,
}

impl NameAlloc {
    pub fn for_program(program: &Program) -> Self {
        let mut alloc = Self {
            idents: FxHashSet::default(),
            labels: FxHashSet::default(),
            counters: FxHashMap::default(),
        };
        for stmt in &program.body {
            alloc.seed_stmt(stmt);
        }
        alloc
    }

    /// A fresh identifier: the bare prefix when unused, otherwise the prefix
    /// with the first free numeric suffix (`_S`, `_S2`, `_S3`, ...).
    pub fn fresh_ident(&mut self, prefix: &str) -> String {
        if self.idents.insert(prefix.to_string()) {
            return prefix.to_string();
        }
        let counter = self.counters.entry(prefix.to_string()).or_insert(2);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if self.idents.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// A fresh label, always numbered (`cpSwitchL1`, `cpSwitchL2`, ...).
    pub fn fresh_label(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(format!("label:{}", prefix)).or_insert(1);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if self.labels.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn seed_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(e) => self.seed_expr(e),
            StmtKind::VarDecl { decls, .. } => {
                for d in decls {
                    self.idents.insert(d.name.clone());
                    if let Some(init) = &d.init {
                        self.seed_expr(init);
                    }
                }
            }
            StmtKind::FuncDecl(f) => self.seed_function(f),
            StmtKind::ClassDecl(c) => self.seed_class(c),
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.seed_expr(e);
                }
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.seed_expr(test);
                self.seed_stmt(consequent);
                if let Some(alt) = alternate {
                    self.seed_stmt(alt);
                }
            }
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.seed_stmt(s);
                }
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(ForInit::VarDecl { decls, .. }) => {
                        for d in decls {
                            self.idents.insert(d.name.clone());
                            if let Some(e) = &d.init {
                                self.seed_expr(e);
                            }
                        }
                    }
                    Some(ForInit::Expr(e)) => self.seed_expr(e),
                    None => {}
                }
                if let Some(e) = test {
                    self.seed_expr(e);
                }
                if let Some(e) = update {
                    self.seed_expr(e);
                }
                self.seed_stmt(body);
            }
            StmtKind::ForIn { left, right, body, .. } => {
                match left {
                    ForHead::VarDecl { name, .. } => {
                        self.idents.insert(name.clone());
                    }
                    ForHead::Pattern(e) => self.seed_expr(e),
                }
                self.seed_expr(right);
                self.seed_stmt(body);
            }
            StmtKind::While { test, body } => {
                self.seed_expr(test);
                self.seed_stmt(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.seed_stmt(body);
                self.seed_expr(test);
            }
            StmtKind::Switch { discriminant, cases } => {
                self.seed_expr(discriminant);
                for case in cases {
                    if let Some(t) = &case.test {
                        self.seed_expr(t);
                    }
                    for s in &case.body {
                        self.seed_stmt(s);
                    }
                }
            }
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                if let Some(label) = label {
                    self.labels.insert(label.clone());
                }
            }
            StmtKind::Labeled { label, body } => {
                self.labels.insert(label.clone());
                self.seed_stmt(body);
            }
            StmtKind::Throw(e) => self.seed_expr(e),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                for s in block {
                    self.seed_stmt(s);
                }
                if let Some(handler) = handler {
                    if let Some(param) = &handler.param {
                        self.idents.insert(param.clone());
                    }
                    for s in &handler.body {
                        self.seed_stmt(s);
                    }
                }
                if let Some(finalizer) = finalizer {
                    for s in finalizer {
                        self.seed_stmt(s);
                    }
                }
            }
            StmtKind::Empty | StmtKind::Debugger => {}
        }
    }

    fn seed_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => {
                self.idents.insert(name.clone());
            }
            ExprKind::Num(_)
            | ExprKind::Str(_)
            | ExprKind::Template(_)
            | ExprKind::Regex(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::This
            | ExprKind::Super => {}
            ExprKind::Array(elems) => {
                for e in elems.iter().flatten() {
                    self.seed_expr(e);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            self.seed_prop_key(key);
                            self.seed_expr(value);
                        }
                        Prop::Shorthand(name) => {
                            self.idents.insert(name.clone());
                        }
                        Prop::Method { key, function, .. } => {
                            self.seed_prop_key(key);
                            self.seed_function(function);
                        }
                        Prop::Spread(e) => self.seed_expr(e),
                    }
                }
            }
            ExprKind::Function(f) => self.seed_function(f),
            ExprKind::Arrow(a) => self.seed_arrow(a),
            ExprKind::ClassExpr(c) => self.seed_class(c),
            ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => self.seed_expr(arg),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.seed_expr(left);
                self.seed_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.seed_expr(target);
                self.seed_expr(value);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.seed_expr(test);
                self.seed_expr(consequent);
                self.seed_expr(alternate);
            }
            ExprKind::Call { callee, args, .. } => {
                self.seed_expr(callee);
                for a in args {
                    self.seed_expr(a);
                }
            }
            ExprKind::New { callee, args } => {
                self.seed_expr(callee);
                for a in args {
                    self.seed_expr(a);
                }
            }
            ExprKind::Member { object, prop, .. } => {
                self.seed_expr(object);
                if let crate::ast::MemberProp::Computed(e) = prop {
                    self.seed_expr(e);
                }
            }
            ExprKind::Sequence(exprs) => {
                for e in exprs {
                    self.seed_expr(e);
                }
            }
            ExprKind::Spread(e) | ExprKind::Await(e) => self.seed_expr(e),
            ExprKind::Yield { arg, .. } => {
                if let Some(e) = arg {
                    self.seed_expr(e);
                }
            }
        }
    }

    fn seed_prop_key(&mut self, key: &PropKey) {
        if let PropKey::Computed(e) = key {
            self.seed_expr(e);
        }
    }

    fn seed_function(&mut self, f: &Function) {
        if let Some(name) = &f.name {
            self.idents.insert(name.clone());
        }
        for p in &f.params {
            self.idents.insert(p.name.clone());
            if let Some(d) = &p.default {
                self.seed_expr(d);
            }
        }
        for s in &f.body {
            self.seed_stmt(s);
        }
    }

    fn seed_arrow(&mut self, a: &Arrow) {
        for p in &a.params {
            self.idents.insert(p.name.clone());
            if let Some(d) = &p.default {
                self.seed_expr(d);
            }
        }
        match &a.body {
            ArrowBody::Block(stmts) => {
                for s in stmts {
                    self.seed_stmt(s);
                }
            }
            ArrowBody::Expr(e) => self.seed_expr(e),
        }
    }

    fn seed_class(&mut self, c: &Class) {
        if let Some(name) = &c.name {
            self.idents.insert(name.clone());
        }
        if let Some(superclass) = &c.superclass {
            self.seed_expr(superclass);
        }
        for member in &c.members {
            self.seed_prop_key(&member.key);
            self.seed_function(&member.function);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    #[test]
    fn fresh_ident_avoids_source_names() {
        let program = ast::parse("var _S = 1; _S2();").unwrap();
        let mut alloc = NameAlloc::for_program(&program);
        assert_eq!(alloc.fresh_ident("_S"), "_S3");
        assert_eq!(alloc.fresh_ident("_S"), "_S4");
        assert_eq!(alloc.fresh_ident("$8"), "$8");
    }

    #[test]
    fn fresh_label_avoids_source_labels() {
        let program = ast::parse("cpSwitchL1: for(;;) { break cpSwitchL1; }").unwrap();
        let mut alloc = NameAlloc::for_program(&program);
        assert_eq!(alloc.fresh_label("cpSwitchL"), "cpSwitchL2");
        assert_eq!(alloc.fresh_label("cpSwitchL"), "cpSwitchL3");
    }
}
