//! Ternary branch tracing and cold-branch marking.
//!
//! The consequent and alternate of a conditional expression are independent
//! single-expression regions; each is tagged by its own position and marked
//! cold on its own. The test always executes and is left alone.

use crate::ast::{Expr, ExprKind, Program};
use crate::marker;
use crate::passes::walk::{self, Flow, Pass};
use crate::passes::Mode;
use crate::trace::{self, ConstructKind};
use anyhow::Result;

pub fn run(program: &mut Program, mode: Mode<'_>) -> Result<()> {
    walk::walk_program(&mut ConditionalPass { mode }, program)
}

struct ConditionalPass<'a> {
    mode: Mode<'a>,
}

impl Pass for ConditionalPass<'_> {
    fn expr(&mut self, expr: &mut Expr) -> Result<Flow> {
        if let ExprKind::Conditional {
            consequent, alternate, ..
        } = &mut expr.kind
        {
            visit_branch(self.mode, consequent);
            visit_branch(self.mode, alternate);
        }
        Ok(Flow::Descend)
    }
}

fn visit_branch(mode: Mode<'_>, branch: &mut Box<Expr>) {
    let Some(pos) = trace::node_pos(ConstructKind::ConditionalExpression, branch.loc.as_ref()) else {
        return;
    };
    match mode {
        Mode::Trace => {
            let inner = std::mem::replace(&mut **branch, Expr::new(ExprKind::Null));
            **branch = Expr::new(ExprKind::Sequence(vec![trace::trace_call(&pos), inner]));
        }
        Mode::Optimize(trace_data) => {
            if !trace_data.is_executed(&pos) {
                let inner = std::mem::replace(&mut **branch, Expr::new(ExprKind::Null));
                **branch = marker::mark_eval_expression(inner);
            }
        }
    }
}
