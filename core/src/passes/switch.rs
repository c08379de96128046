//! Per-case tracing and cold-run collapse for switch statements.
//!
//! Trace mode prepends a position-tagged counter to every case body, so
//! fallthrough entry is observed case by case. Optimize mode rewrites the
//! whole switch into
//!
//! ```text
//! { let _S = <discriminant>; cpSwitchL1: switch (_S) { ... } }
//! ```
//!
//! and collapses each run of never-entered cases into a nested switch on the
//! same `_S`, wrapped in an eval-block marker and placed on the run's final
//! case so the emptied earlier cases fall through into it. Unlabelled breaks
//! targeting the original switch are rewritten to the fresh outer label
//! first; after nesting they would otherwise bind to the inner switch.

use crate::ast::{DeclKind, Declarator, Expr, ForHead, ForInit, Program, Stmt, StmtKind, SwitchCase};
use crate::consteval;
use crate::marker;
use crate::passes::walk::{self, Flow, Pass};
use crate::passes::{Mode, NameAlloc};
use crate::trace::{self, ConstructKind};
use anyhow::{Result, anyhow, bail};

pub fn run(program: &mut Program, mode: Mode<'_>, alloc: &mut NameAlloc) -> Result<()> {
    walk::walk_program(&mut SwitchPass { mode, alloc }, program)
}

struct SwitchPass<'a, 'b> {
    mode: Mode<'a>,
    alloc: &'b mut NameAlloc,
}

impl Pass for SwitchPass<'_, '_> {
    fn stmt(&mut self, stmt: &mut Stmt) -> Result<Flow> {
        if !matches!(stmt.kind, StmtKind::Switch { .. }) {
            return Ok(Flow::Descend);
        }
        ensure_var_only(stmt)?;

        match self.mode {
            Mode::Trace => {
                let StmtKind::Switch { cases, .. } = &mut stmt.kind else {
                    unreachable!("matched above");
                };
                for case in cases {
                    if let Some(pos) = trace::node_pos(ConstructKind::SwitchCase, case.loc.as_ref()) {
                        case.body.insert(0, Stmt::expr(trace::trace_call(&pos)));
                    }
                }
                Ok(Flow::Descend)
            }
            Mode::Optimize(trace_data) => {
                let loc = stmt.loc.take();
                let StmtKind::Switch {
                    mut discriminant,
                    mut cases,
                } = std::mem::replace(&mut stmt.kind, StmtKind::Empty)
                else {
                    unreachable!("matched above");
                };

                let sid = self.alloc.fresh_ident("_S");
                let label = self.alloc.fresh_label("cpSwitchL");
                for case in &mut cases {
                    relabel_unlabelled_breaks(&mut case.body, &label);
                }

                // collapse runs of never-entered cases
                let mut run: Vec<usize> = Vec::new();
                for i in 0..cases.len() {
                    let pos = trace::node_pos(ConstructKind::SwitchCase, cases[i].loc.as_ref())
                        .ok_or_else(|| anyhow!("switch case without source location"))?;
                    if trace_data.is_executed(&pos) {
                        run.clear();
                        continue;
                    }
                    run.push(i);
                    let next_executed = match cases.get(i + 1) {
                        None => true,
                        Some(next) => {
                            let next_pos = trace::node_pos(ConstructKind::SwitchCase, next.loc.as_ref())
                                .ok_or_else(|| anyhow!("switch case without source location"))?;
                            trace_data.is_executed(&next_pos)
                        }
                    };
                    if !next_executed {
                        continue;
                    }
                    let collapsible = run.iter().any(|&j| !cases[j].body.is_empty())
                        && run
                            .iter()
                            .all(|&j| cases[j].test.as_ref().is_none_or(consteval::is_pure));
                    if collapsible {
                        let inner_cases: Vec<SwitchCase> = run
                            .iter()
                            .map(|&j| SwitchCase {
                                test: cases[j].test.clone(),
                                body: std::mem::take(&mut cases[j].body),
                                loc: None,
                            })
                            .collect();
                        let inner = Stmt::new(StmtKind::Switch {
                            discriminant: Expr::ident(sid.clone()),
                            cases: inner_cases,
                        });
                        // the run's final case carries the deferred switch;
                        // the emptied earlier cases fall through into it
                        cases[i].body = vec![Stmt::new(StmtKind::Block(marker::mark_eval_block(vec![inner])))];
                    }
                    run.clear();
                }

                // process the surviving case bodies before wrapping, so the
                // rebuilt switch itself is never re-entered
                walk::walk_expr(self, &mut discriminant)?;
                for case in &mut cases {
                    if let Some(test) = &mut case.test {
                        walk::walk_expr(self, test)?;
                    }
                    walk::walk_stmts(self, &mut case.body)?;
                }

                let inner_switch = Stmt::at(
                    StmtKind::Switch {
                        discriminant: Expr::ident(sid.clone()),
                        cases,
                    },
                    loc,
                );
                *stmt = Stmt::new(StmtKind::Block(vec![
                    Stmt::new(StmtKind::VarDecl {
                        kind: DeclKind::Let,
                        decls: vec![Declarator {
                            name: sid,
                            init: Some(discriminant),
                        }],
                    }),
                    Stmt::new(StmtKind::Labeled {
                        label,
                        body: Box::new(inner_switch),
                    }),
                ]));
                Ok(Flow::Skip)
            }
        }
    }
}

/// Rewrite every unlabelled `break` that targets this switch to the given
/// label. Nested switches and loops claim their own breaks and are not
/// entered.
fn relabel_unlabelled_breaks(stmts: &mut [Stmt], label: &str) {
    for stmt in stmts {
        relabel_in_stmt(stmt, label);
    }
}

fn relabel_in_stmt(stmt: &mut Stmt, label: &str) {
    match &mut stmt.kind {
        StmtKind::Break(target @ None) => {
            *target = Some(label.to_string());
        }
        StmtKind::Switch { .. }
        | StmtKind::For { .. }
        | StmtKind::ForIn { .. }
        | StmtKind::While { .. }
        | StmtKind::DoWhile { .. } => {}
        StmtKind::Block(stmts) => relabel_unlabelled_breaks(stmts, label),
        StmtKind::If {
            consequent, alternate, ..
        } => {
            relabel_in_stmt(consequent, label);
            if let Some(alt) = alternate {
                relabel_in_stmt(alt, label);
            }
        }
        StmtKind::Labeled { body, .. } => relabel_in_stmt(body, label),
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            relabel_unlabelled_breaks(block, label);
            if let Some(handler) = handler {
                relabel_unlabelled_breaks(&mut handler.body, label);
            }
            if let Some(finalizer) = finalizer {
                relabel_unlabelled_breaks(finalizer, label);
            }
        }
        _ => {}
    }
}

/// Lexical declarations inside a switch would need scope surgery the
/// collapse cannot do; refuse the whole run. Checks the entire subtree,
/// marker blocks and nested functions included.
fn ensure_var_only(stmt: &Stmt) -> Result<()> {
    let fail = || bail!("let/const declarations inside a switch statement are not supported");
    match &stmt.kind {
        StmtKind::VarDecl { kind, .. } if !matches!(kind, DeclKind::Var) => fail()?,
        StmtKind::For {
            init: Some(ForInit::VarDecl { kind, .. }),
            ..
        } if !matches!(kind, DeclKind::Var) => fail()?,
        StmtKind::ForIn {
            left: ForHead::VarDecl { kind, .. },
            ..
        } if !matches!(kind, DeclKind::Var) => fail()?,
        _ => {}
    }
    match &stmt.kind {
        StmtKind::FuncDecl(f) => ensure_var_only_list(&f.body)?,
        StmtKind::If {
            consequent, alternate, ..
        } => {
            ensure_var_only(consequent)?;
            if let Some(alt) = alternate {
                ensure_var_only(alt)?;
            }
        }
        StmtKind::Block(stmts) => ensure_var_only_list(stmts)?,
        StmtKind::For { body, .. }
        | StmtKind::ForIn { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Labeled { body, .. } => ensure_var_only(body)?,
        StmtKind::Switch { cases, .. } => {
            for case in cases {
                ensure_var_only_list(&case.body)?;
            }
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            ensure_var_only_list(block)?;
            if let Some(handler) = handler {
                ensure_var_only_list(&handler.body)?;
            }
            if let Some(finalizer) = finalizer {
                ensure_var_only_list(finalizer)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn ensure_var_only_list(stmts: &[Stmt]) -> Result<()> {
    for stmt in stmts {
        ensure_var_only(stmt)?;
    }
    Ok(())
}
