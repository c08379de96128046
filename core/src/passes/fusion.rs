//! Fusion of adjacent synthesized eval calls.
//!
//! Runs after minification, which flattens nested `if`/logical structure
//! into longer `&&`/`||` chains and thereby creates the adjacency this pass
//! feeds on. For each homogeneous chain the leftmost synthesized eval call
//! and everything to its right merge into one call whose body joins the
//! operand sources with the same operator. Operands left of the first
//! synthesized call, and user-authored eval, are never touched: short-circuit
//! order and side effects stay exactly as written.
//!
//! Cold operands always form a suffix of a chain (an operand that never ran
//! implies nothing to its right ran either), so a non-synthesized operand
//! after the first synthesized one means an earlier stage misbehaved.

use crate::ast::{Expr, ExprKind, LogicalOp, Program};
use crate::marker;
use crate::passes::walk::{self, Flow, Pass};
use anyhow::{Result, bail};

pub fn run(program: &mut Program) -> Result<()> {
    walk::walk_program(&mut FusionPass, program)
}

struct FusionPass;

impl Pass for FusionPass {
    fn expr(&mut self, expr: &mut Expr) -> Result<Flow> {
        let ExprKind::Logical { op, .. } = &expr.kind else {
            return Ok(Flow::Descend);
        };
        let op = *op;
        if !matches!(op, LogicalOp::And | LogicalOp::Or) {
            return Ok(Flow::Descend);
        }

        let chain = std::mem::replace(expr, Expr::new(ExprKind::Null));
        let mut operands = Vec::new();
        flatten(chain, op, &mut operands);

        // operands may hold different-operator chains of their own
        for operand in &mut operands {
            walk::walk_expr(self, operand)?;
        }

        let first_eval = operands.iter().position(marker::is_eval_call);
        match first_eval {
            None => {
                *expr = rebuild(op, operands);
            }
            Some(0) => bail!("a logical chain cannot start with a synthesized eval call"),
            Some(index) => {
                let fused = operands.split_off(index);
                if fused.len() > 1 {
                    tracing::debug!("fusing {} eval calls", fused.len());
                }
                let mut sources = Vec::with_capacity(fused.len());
                for operand in &fused {
                    let Some(code) = marker::parse_eval_code(operand) else {
                        bail!("non-deferred operand to the right of a deferred one");
                    };
                    sources.push(format!("({})", code));
                }
                let joined = sources.join(op_text(op));
                operands.push(marker::eval_call(&joined));
                *expr = rebuild(op, operands);
            }
        }
        Ok(Flow::Skip)
    }
}

/// Decompose the left spine of a homogeneous chain into operands in
/// evaluation order.
fn flatten(expr: Expr, op: LogicalOp, out: &mut Vec<Expr>) {
    match expr.kind {
        ExprKind::Logical {
            op: child_op,
            left,
            right,
        } if child_op == op => {
            flatten(*left, op, out);
            out.push(*right);
        }
        kind => out.push(Expr::at(kind, expr.loc)),
    }
}

/// Rebuild a left-associated chain, the shape the parser produces.
fn rebuild(op: LogicalOp, operands: Vec<Expr>) -> Expr {
    let mut iter = operands.into_iter();
    let first = iter.next().expect("a chain has at least one operand");
    iter.fold(first, |left, right| {
        Expr::new(ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    })
}

fn op_text(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "&&",
        LogicalOp::Or => "||",
        LogicalOp::Nullish => unreachable!("nullish chains are never fused"),
    }
}
