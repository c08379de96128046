//! Statement-level tracing and cold-tail deferral.
//!
//! Trace mode prepends a position-tagged counter call before every statement
//! of a block. Optimize mode truncates each block at its first never-executed
//! statement and wraps the cold tail in an eval-block marker; a function body
//! that never ran at all is marked wholesale.

use crate::ast::{Program, Stmt, StmtKind};
use crate::marker;
use crate::passes::walk::{self, Pass};
use crate::passes::Mode;
use crate::trace::{self, ConstructKind};
use anyhow::Result;

pub fn run(program: &mut Program, mode: Mode<'_>) -> Result<()> {
    walk::walk_program(&mut BlockPass { mode }, program)
}

struct BlockPass<'a> {
    mode: Mode<'a>,
}

impl Pass for BlockPass<'_> {
    fn block(&mut self, stmts: &mut Vec<Stmt>, function_body: bool) -> Result<()> {
        match self.mode {
            Mode::Trace => {
                let mut instrumented = Vec::with_capacity(stmts.len() * 2);
                for stmt in stmts.drain(..) {
                    if let Some(pos) = trace::node_pos(ConstructKind::Statement, stmt.loc.as_ref()) {
                        instrumented.push(Stmt::expr(trace::trace_call(&pos)));
                    }
                    instrumented.push(stmt);
                }
                *stmts = instrumented;
            }
            Mode::Optimize(trace_data) => {
                if stmts.is_empty() {
                    return Ok(());
                }
                let mut executed = Vec::with_capacity(stmts.len());
                for stmt in stmts.iter() {
                    let Some(pos) = trace::node_pos(ConstructKind::Statement, stmt.loc.as_ref()) else {
                        // a synthesized statement means this list was already rewritten
                        return Ok(());
                    };
                    executed.push(trace_data.is_executed(&pos));
                }

                // a function whose body never ran is deferred wholesale
                if function_body && executed.iter().all(|e| !e) {
                    *stmts = marker::mark_eval_block(std::mem::take(stmts));
                    return Ok(());
                }

                if let Some(idx) = executed.iter().position(|e| !e) {
                    let tail = stmts.split_off(idx);
                    stmts.push(Stmt::new(StmtKind::Block(marker::mark_eval_block(tail))));
                }
            }
        }
        Ok(())
    }
}
