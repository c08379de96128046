//! Identifier-binding validation over the rewritten tree.
//!
//! Contract: given the fully rewritten tree, fail fast if any identifier now
//! resolves to a different binding than before rewriting. The pipeline's
//! rewrites may move code and add fresh bindings but must never change what
//! an existing identifier refers to, which shows up in the free-variable
//! sets: rewriting may neither introduce a free identifier nor capture one
//! that used to be free. Runs after the hoisting repair, while every
//! identifier is still a tree node.

use crate::ast::{
    Arrow, ArrowBody, Class, DeclKind, Expr, ExprKind, ForHead, ForInit, Function, Program, Prop, PropKey, Stmt,
    StmtKind,
};
use anyhow::{Result, bail};
use rustc_hash::FxHashSet;

pub fn validate(original: &Program, rewritten: &Program) -> Result<()> {
    let before = free_vars(original);
    let after = free_vars(rewritten);

    let mut introduced: Vec<&String> = after.difference(&before).collect();
    if !introduced.is_empty() {
        introduced.sort();
        bail!(
            "rewriting introduced unbound identifier(s): {}",
            introduced.into_iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    let mut captured: Vec<&String> = before.difference(&after).collect();
    if !captured.is_empty() {
        captured.sort();
        bail!(
            "rewriting captured previously free identifier(s): {}",
            captured.into_iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

/// Every identifier in the program that resolves to no binding within it.
pub fn free_vars(program: &Program) -> FxHashSet<String> {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        free: FxHashSet::default(),
    };
    resolver.enter_function_scope(&[], None, &program.body);
    resolver.stmts(&program.body);
    resolver.scopes.pop();
    resolver.free
}

struct Resolver {
    scopes: Vec<FxHashSet<String>>,
    free: FxHashSet<String>,
}

impl Resolver {
    fn reference(&mut self, name: &str) {
        if !self.scopes.iter().rev().any(|scope| scope.contains(name)) {
            self.free.insert(name.to_string());
        }
    }

    /// A function-level scope: parameters, the function's own name, every
    /// `var` reachable without crossing another function, and the top-level
    /// lexical declarations of the body.
    fn enter_function_scope(&mut self, params: &[crate::ast::Param], own_name: Option<&str>, body: &[Stmt]) {
        let mut scope = FxHashSet::default();
        if let Some(name) = own_name {
            scope.insert(name.to_string());
        }
        for p in params {
            scope.insert(p.name.clone());
        }
        collect_hoisted(body, &mut scope);
        collect_lexical(body, &mut scope);
        self.scopes.push(scope);
    }

    fn enter_block_scope(&mut self, body: &[Stmt]) {
        let mut scope = FxHashSet::default();
        collect_lexical(body, &mut scope);
        self.scopes.push(scope);
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        self.enter_block_scope(stmts);
        self.stmts(stmts);
        self.scopes.pop();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(e) | StmtKind::Throw(e) => self.expr(e),
            StmtKind::VarDecl { decls, .. } => {
                for d in decls {
                    if let Some(init) = &d.init {
                        self.expr(init);
                    }
                }
            }
            StmtKind::FuncDecl(f) => self.function(f),
            StmtKind::ClassDecl(c) => self.class(c),
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.expr(e);
                }
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alt) = alternate {
                    self.stmt(alt);
                }
            }
            StmtKind::Block(stmts) => self.block(stmts),
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                let mut scope = FxHashSet::default();
                if let Some(ForInit::VarDecl { kind, decls }) = init
                    && !matches!(kind, DeclKind::Var)
                {
                    for d in decls {
                        scope.insert(d.name.clone());
                    }
                }
                self.scopes.push(scope);
                match init {
                    Some(ForInit::VarDecl { decls, .. }) => {
                        for d in decls {
                            if let Some(e) = &d.init {
                                self.expr(e);
                            }
                        }
                    }
                    Some(ForInit::Expr(e)) => self.expr(e),
                    None => {}
                }
                if let Some(e) = test {
                    self.expr(e);
                }
                if let Some(e) = update {
                    self.expr(e);
                }
                self.stmt(body);
                self.scopes.pop();
            }
            StmtKind::ForIn { left, right, body, .. } => {
                let mut scope = FxHashSet::default();
                match left {
                    ForHead::VarDecl { kind, name } => {
                        if !matches!(kind, DeclKind::Var) {
                            scope.insert(name.clone());
                        }
                    }
                    ForHead::Pattern(e) => self.expr(e),
                }
                self.scopes.push(scope);
                self.expr(right);
                self.stmt(body);
                self.scopes.pop();
            }
            StmtKind::While { test, body } => {
                self.expr(test);
                self.stmt(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.stmt(body);
                self.expr(test);
            }
            StmtKind::Switch { discriminant, cases } => {
                self.expr(discriminant);
                // one lexical scope spans every case body
                let mut scope = FxHashSet::default();
                for case in cases {
                    collect_lexical(&case.body, &mut scope);
                }
                self.scopes.push(scope);
                for case in cases {
                    if let Some(t) = &case.test {
                        self.expr(t);
                    }
                    self.stmts(&case.body);
                }
                self.scopes.pop();
            }
            StmtKind::Labeled { body, .. } => self.stmt(body),
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block(block);
                if let Some(handler) = handler {
                    let mut scope = FxHashSet::default();
                    if let Some(param) = &handler.param {
                        scope.insert(param.clone());
                    }
                    collect_lexical(&handler.body, &mut scope);
                    self.scopes.push(scope);
                    self.stmts(&handler.body);
                    self.scopes.pop();
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer);
                }
            }
            _ => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ident(name) => self.reference(name),
            ExprKind::Array(elems) => {
                for e in elems.iter().flatten() {
                    self.expr(e);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            self.prop_key(key);
                            self.expr(value);
                        }
                        Prop::Shorthand(name) => self.reference(name),
                        Prop::Method { key, function, .. } => {
                            self.prop_key(key);
                            self.function(function);
                        }
                        Prop::Spread(e) => self.expr(e),
                    }
                }
            }
            ExprKind::Function(f) => self.function(f),
            ExprKind::Arrow(a) => self.arrow(a),
            ExprKind::ClassExpr(c) => self.class(c),
            ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } => self.expr(arg),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
                self.expr(callee);
                for a in args {
                    self.expr(a);
                }
            }
            ExprKind::Member { object, prop, .. } => {
                self.expr(object);
                if let crate::ast::MemberProp::Computed(e) = prop {
                    self.expr(e);
                }
            }
            ExprKind::Sequence(exprs) => {
                for e in exprs {
                    self.expr(e);
                }
            }
            ExprKind::Spread(e) | ExprKind::Await(e) => self.expr(e),
            ExprKind::Yield { arg: Some(e), .. } => self.expr(e),
            _ => {}
        }
    }

    fn prop_key(&mut self, key: &PropKey) {
        if let PropKey::Computed(e) = key {
            self.expr(e);
        }
    }

    fn function(&mut self, f: &Function) {
        for p in &f.params {
            if let Some(d) = &p.default {
                self.expr(d);
            }
        }
        self.enter_function_scope(&f.params, f.name.as_deref(), &f.body);
        self.stmts(&f.body);
        self.scopes.pop();
    }

    fn arrow(&mut self, a: &Arrow) {
        for p in &a.params {
            if let Some(d) = &p.default {
                self.expr(d);
            }
        }
        match &a.body {
            ArrowBody::Block(stmts) => {
                self.enter_function_scope(&a.params, None, stmts);
                self.stmts(stmts);
                self.scopes.pop();
            }
            ArrowBody::Expr(e) => {
                let mut scope = FxHashSet::default();
                for p in &a.params {
                    scope.insert(p.name.clone());
                }
                self.scopes.push(scope);
                self.expr(e);
                self.scopes.pop();
            }
        }
    }

    fn class(&mut self, c: &Class) {
        if let Some(superclass) = &c.superclass {
            self.expr(superclass);
        }
        let mut scope = FxHashSet::default();
        if let Some(name) = &c.name {
            scope.insert(name.clone());
        }
        self.scopes.push(scope);
        for member in &c.members {
            self.prop_key(&member.key);
            self.function(&member.function);
        }
        self.scopes.pop();
    }
}

/// `var` and function-declaration names hoisted to the nearest function
/// scope; nested functions keep theirs.
fn collect_hoisted(stmts: &[Stmt], scope: &mut FxHashSet<String>) {
    for stmt in stmts {
        collect_hoisted_stmt(stmt, scope);
    }
}

fn collect_hoisted_stmt(stmt: &Stmt, scope: &mut FxHashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl {
            kind: DeclKind::Var,
            decls,
        } => {
            for d in decls {
                scope.insert(d.name.clone());
            }
        }
        StmtKind::FuncDecl(f) => {
            if let Some(name) = &f.name {
                scope.insert(name.clone());
            }
        }
        StmtKind::If {
            consequent, alternate, ..
        } => {
            collect_hoisted_stmt(consequent, scope);
            if let Some(alt) = alternate {
                collect_hoisted_stmt(alt, scope);
            }
        }
        StmtKind::Block(inner) => collect_hoisted(inner, scope),
        StmtKind::For { init, body, .. } => {
            if let Some(ForInit::VarDecl {
                kind: DeclKind::Var,
                decls,
            }) = init
            {
                for d in decls {
                    scope.insert(d.name.clone());
                }
            }
            collect_hoisted_stmt(body, scope);
        }
        StmtKind::ForIn { left, body, .. } => {
            if let ForHead::VarDecl {
                kind: DeclKind::Var,
                name,
            } = left
            {
                scope.insert(name.clone());
            }
            collect_hoisted_stmt(body, scope);
        }
        StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } | StmtKind::Labeled { body, .. } => {
            collect_hoisted_stmt(body, scope)
        }
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                collect_hoisted(&case.body, scope);
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_hoisted(block, scope);
            if let Some(handler) = handler {
                collect_hoisted(&handler.body, scope);
            }
            if let Some(finalizer) = finalizer {
                collect_hoisted(finalizer, scope);
            }
        }
        _ => {}
    }
}

/// `let`/`const`/`class` names declared directly in this list. Function
/// declarations are handled by [`collect_hoisted`]; in the sloppy-mode code
/// this tool targets they behave function-scoped.
fn collect_lexical(stmts: &[Stmt], scope: &mut FxHashSet<String>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VarDecl {
                kind: DeclKind::Let | DeclKind::Const,
                decls,
            } => {
                for d in decls {
                    scope.insert(d.name.clone());
                }
            }
            StmtKind::ClassDecl(c) => {
                if let Some(name) = &c.name {
                    scope.insert(name.clone());
                }
            }
            StmtKind::FuncDecl(f) => {
                if let Some(name) = &f.name {
                    scope.insert(name.clone());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    fn free(src: &str) -> Vec<String> {
        let program = ast::parse(src).unwrap();
        let mut names: Vec<String> = free_vars(&program).into_iter().collect();
        names.sort();
        names
    }

    #[test]
    fn resolves_declarations() {
        assert_eq!(free("var a = 1; a + b;"), ["b"]);
        assert_eq!(free("function f(x) { return x + y; } f(1);"), ["y"]);
        assert_eq!(free("used(); function used() {}"), Vec::<String>::new());
        assert_eq!(free("let a = 1; { let b = a; } b;"), ["b"]);
        assert_eq!(free("for (let i = 0; i < n; i++) use(i);"), ["n", "use"]);
        assert_eq!(free("try { f(); } catch (e) { log(e); }"), ["f", "log"]);
    }

    #[test]
    fn validate_accepts_identity() {
        let program = ast::parse("var a = 1; fn(a);").unwrap();
        validate(&program, &program.clone()).unwrap();
    }

    #[test]
    fn validate_rejects_introduced_free_identifier() {
        let before = ast::parse("var a = 1;").unwrap();
        let after = ast::parse("var a = stray;").unwrap();
        let err = validate(&before, &after).unwrap_err();
        assert!(err.to_string().contains("stray"));
    }

    #[test]
    fn validate_rejects_captured_identifier() {
        let before = ast::parse("fn(data);").unwrap();
        let after = ast::parse("var data; fn(data);").unwrap();
        let err = validate(&before, &after).unwrap_err();
        assert!(err.to_string().contains("data"));
    }
}
