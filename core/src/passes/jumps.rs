//! Rewriting of jumps that escape a deferred region.
//!
//! A deferred statement subtree runs behind a synchronous call boundary a raw
//! `return`/`break`/`continue` cannot cross. Each escaping jump becomes a
//! `return` of a small record (`{R:1,V:<expr>}` for a value return,
//! `{R:true}` for a bare return, `{<id>:1}` for a break or continue), and the
//! call site gets a stub that inspects the record and performs the real jump.
//!
//! Escaping means: a `return` outside every function nested in the subtree;
//! an unlabelled `break`/`continue` outside every loop or switch in the
//! subtree; a labelled jump whose label is not declared in the subtree.
//! Identical jump statements share one identifier from a fixed `a`-`z`
//! alphabet; running out of letters aborts the run.

use crate::ast::{DeclKind, Declarator, Expr, ExprKind, ForHead, ForInit, Prop, PropKey, Stmt, StmtKind};
use anyhow::{Result, bail};
use rustc_hash::FxHashMap;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Registry of the escaping jumps found in one region.
#[derive(Debug)]
pub struct EscapingJumps {
    has_return: bool,
    /// identifier and original statement, in first-seen order
    registered: Vec<(String, Stmt)>,
    by_text: FxHashMap<String, usize>,
}

impl EscapingJumps {
    pub fn is_empty(&self) -> bool {
        !self.has_return && self.registered.is_empty()
    }

    /// Call-site statements: bind the invocation result, then replay
    /// whichever jump the record names.
    pub fn stub(&self, result_name: &str, eval_call: Expr) -> Vec<Stmt> {
        if self.is_empty() {
            return vec![Stmt::expr(eval_call)];
        }
        let res = |prop: &str| {
            Expr::new(ExprKind::Member {
                object: Box::new(Expr::ident(result_name)),
                prop: crate::ast::MemberProp::Ident(prop.to_string()),
                optional: false,
            })
        };
        let mut checks: Vec<Stmt> = self
            .registered
            .iter()
            .map(|(id, stmt)| {
                Stmt::new(StmtKind::If {
                    test: res(id),
                    consequent: Box::new(stmt.clone()),
                    alternate: None,
                })
            })
            .collect();
        if self.has_return {
            checks.push(Stmt::new(StmtKind::If {
                test: res("R"),
                consequent: Box::new(Stmt::new(StmtKind::Return(Some(res("V"))))),
                alternate: None,
            }));
        }
        vec![
            Stmt::new(StmtKind::VarDecl {
                kind: DeclKind::Let,
                decls: vec![Declarator {
                    name: result_name.to_string(),
                    init: Some(eval_call),
                }],
            }),
            Stmt::new(StmtKind::If {
                test: Expr::ident(result_name),
                consequent: Box::new(Stmt::new(StmtKind::Block(checks))),
                alternate: None,
            }),
        ]
    }

    fn register(&mut self, stmt: &Stmt) -> Result<String> {
        let text = stmt.to_string();
        if let Some(&idx) = self.by_text.get(&text) {
            return Ok(self.registered[idx].0.clone());
        }
        let Some(&byte) = ALPHABET.get(self.registered.len()) else {
            bail!("escaping-jump identifier alphabet exhausted; abandoning this region");
        };
        let id = (byte as char).to_string();
        self.by_text.insert(text, self.registered.len());
        self.registered.push((id.clone(), stmt.clone()));
        Ok(id)
    }
}

/// Rewrite every escaping jump in `body` in place and return the registry.
pub fn transform(body: &mut [Stmt]) -> Result<EscapingJumps> {
    let mut rw = Rewriter {
        jumps: EscapingJumps {
            has_return: false,
            registered: Vec::new(),
            by_text: FxHashMap::default(),
        },
        loop_or_switch: 0,
        functions: 0,
        labels: Vec::new(),
    };
    for stmt in body.iter_mut() {
        rw.stmt(stmt)?;
    }
    Ok(rw.jumps)
}

/// The region's invocable form: an arrow IIFE whose body is the rewritten
/// statement list.
pub fn eval_code(body: &[Stmt]) -> String {
    let mut src = String::new();
    for stmt in body {
        src.push_str(&stmt.to_string());
    }
    format!("(()=>{{{}}})()", src)
}

struct Rewriter {
    jumps: EscapingJumps,
    loop_or_switch: u32,
    functions: u32,
    labels: Vec<String>,
}

impl Rewriter {
    fn stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match &mut stmt.kind {
            StmtKind::Break(label) | StmtKind::Continue(label) => {
                let escaping = match label {
                    Some(label) => !self.labels.contains(label),
                    None => self.loop_or_switch == 0,
                };
                if escaping {
                    let id = self.jumps.register(stmt)?;
                    *stmt = Stmt::new(StmtKind::Return(Some(record(vec![(
                        id,
                        Expr::num(1.0),
                    )]))));
                }
            }
            StmtKind::Return(value) => {
                if self.functions == 0 {
                    self.jumps.has_return = true;
                    let rewritten = match value.take() {
                        Some(arg) => record(vec![("R".to_string(), Expr::num(1.0)), ("V".to_string(), arg)]),
                        None => record(vec![("R".to_string(), Expr::new(ExprKind::Bool(true)))]),
                    };
                    *stmt = Stmt::new(StmtKind::Return(Some(rewritten)));
                } else if let Some(e) = value {
                    self.expr(e)?;
                }
            }
            StmtKind::Expr(e) | StmtKind::Throw(e) => self.expr(e)?,
            StmtKind::VarDecl { decls, .. } => {
                for d in decls {
                    if let Some(init) = &mut d.init {
                        self.expr(init)?;
                    }
                }
            }
            StmtKind::FuncDecl(f) => {
                self.functions += 1;
                self.stmts(&mut f.body)?;
                self.functions -= 1;
            }
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
            StmtKind::Block(stmts) => self.stmts(stmts)?,
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
                                self.expr(e)?;
                            }
                        }
                    }
                    Some(ForInit::Expr(e)) => self.expr(e)?,
                    None => {}
                }
                if let Some(e) = test {
                    self.expr(e)?;
                }
                if let Some(e) = update {
                    self.expr(e)?;
                }
                self.in_loop_or_switch(body)?;
            }
            StmtKind::ForIn { left, right, body, .. } => {
                if let ForHead::Pattern(e) = left {
                    self.expr(e)?;
                }
                self.expr(right)?;
                self.in_loop_or_switch(body)?;
            }
            StmtKind::While { test, body } => {
                self.expr(test)?;
                self.in_loop_or_switch(body)?;
            }
            StmtKind::DoWhile { body, test } => {
                self.in_loop_or_switch(body)?;
                self.expr(test)?;
            }
            StmtKind::Switch { discriminant, cases } => {
                self.expr(discriminant)?;
                self.loop_or_switch += 1;
                for case in cases.iter_mut() {
                    if let Some(t) = &mut case.test {
                        self.expr(t)?;
                    }
                    self.stmts(&mut case.body)?;
                }
                self.loop_or_switch -= 1;
            }
            StmtKind::Labeled { label, body } => {
                self.labels.push(label.clone());
                self.stmt(body)?;
                self.labels.pop();
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.stmts(block)?;
                if let Some(handler) = handler {
                    self.stmts(&mut handler.body)?;
                }
                if let Some(finalizer) = finalizer {
                    self.stmts(finalizer)?;
                }
            }
            StmtKind::Empty | StmtKind::Debugger => {}
        }
        Ok(())
    }

    fn stmts(&mut self, stmts: &mut [Stmt]) -> Result<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn in_loop_or_switch(&mut self, body: &mut Stmt) -> Result<()> {
        self.loop_or_switch += 1;
        self.stmt(body)?;
        self.loop_or_switch -= 1;
        Ok(())
    }

    fn function_body(&mut self, body: &mut [Stmt]) -> Result<()> {
        self.functions += 1;
        self.stmts(body)?;
        self.functions -= 1;
        Ok(())
    }

    fn class(&mut self, c: &mut crate::ast::Class) -> Result<()> {
        if let Some(superclass) = &mut c.superclass {
            self.expr(superclass)?;
        }
        for member in &mut c.members {
            if let PropKey::Computed(e) = &mut member.key {
                self.expr(e)?;
            }
            self.function_body(&mut member.function.body)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &mut Expr) -> Result<()> {
        match &mut expr.kind {
            ExprKind::Yield { .. } => {
                bail!("generator suspension cannot cross an eval boundary");
            }
            ExprKind::Function(f) => self.function_body(&mut f.body)?,
            ExprKind::Arrow(a) => match &mut a.body {
                crate::ast::ArrowBody::Block(stmts) => self.function_body(stmts)?,
                crate::ast::ArrowBody::Expr(e) => {
                    self.functions += 1;
                    self.expr(e)?;
                    self.functions -= 1;
                }
            },
            ExprKind::ClassExpr(c) => self.class(c)?,
            ExprKind::Array(elems) => {
                for e in elems.iter_mut().flatten() {
                    self.expr(e)?;
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        Prop::KeyValue { key, value } => {
                            if let PropKey::Computed(e) = key {
                                self.expr(e)?;
                            }
                            self.expr(value)?;
                        }
                        Prop::Shorthand(_) => {}
                        Prop::Method { key, function, .. } => {
                            if let PropKey::Computed(e) = key {
                                self.expr(e)?;
                            }
                            self.function_body(&mut function.body)?;
                        }
                        Prop::Spread(e) => self.expr(e)?,
                    }
                }
            }
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
            ExprKind::Call { callee, args, .. } => {
                self.expr(callee)?;
                for a in args {
                    self.expr(a)?;
                }
            }
            ExprKind::New { callee, args } => {
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
            _ => {}
        }
        Ok(())
    }
}

fn record(props: Vec<(String, Expr)>) -> Expr {
    Expr::new(ExprKind::Object(
        props
            .into_iter()
            .map(|(key, value)| Prop::KeyValue {
                key: PropKey::Ident(key),
                value,
            })
            .collect(),
    ))
}
