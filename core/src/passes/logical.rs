//! Short-circuit right-operand tracing and cold marking.
//!
//! For `&&` and `||`, only the right operand can be skipped at runtime, so
//! only it is traced and only it can become a deferred region. `??` is left
//! alone.

use crate::ast::{Expr, ExprKind, LogicalOp, Program};
use crate::marker;
use crate::passes::walk::{self, Flow, Pass};
use crate::passes::Mode;
use crate::trace::{self, ConstructKind};
use anyhow::Result;

pub fn run(program: &mut Program, mode: Mode<'_>) -> Result<()> {
    walk::walk_program(&mut LogicalPass { mode }, program)
}

struct LogicalPass<'a> {
    mode: Mode<'a>,
}

impl Pass for LogicalPass<'_> {
    fn expr(&mut self, expr: &mut Expr) -> Result<Flow> {
        let ExprKind::Logical { op, right, .. } = &mut expr.kind else {
            return Ok(Flow::Descend);
        };
        if !matches!(op, LogicalOp::And | LogicalOp::Or) {
            return Ok(Flow::Descend);
        }
        let Some(pos) = trace::node_pos(ConstructKind::LogicalExpression, right.loc.as_ref()) else {
            return Ok(Flow::Descend);
        };
        match self.mode {
            Mode::Trace => {
                let inner = std::mem::replace(&mut **right, Expr::new(ExprKind::Null));
                **right = Expr::new(ExprKind::Sequence(vec![trace::trace_call(&pos), inner]));
            }
            Mode::Optimize(trace_data) => {
                if !trace_data.is_executed(&pos) {
                    let inner = std::mem::replace(&mut **right, Expr::new(ExprKind::Null));
                    **right = marker::mark_eval_expression(inner);
                }
            }
        }
        Ok(Flow::Descend)
    }
}
