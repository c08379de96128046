//! Large constant-literal detection.
//!
//! Trace mode wraps statically-evaluable object/array literals above a size
//! threshold in a read-observing proxy so the trace records whether the value
//! was ever used. Optimize mode detects the same literals but deliberately
//! takes no action: the lazy materialization of cold constants is an
//! unfinished seam, kept instrumented but inert.

use crate::ast::{Expr, Program};
use crate::consteval;
use crate::passes::walk::{self, Flow, Pass};
use crate::passes::Mode;
use crate::trace::{self, ConstructKind};
use anyhow::Result;

/// JSON text sizes at or below this are not worth observing.
const MIN_CONST_JSON_SIZE: usize = 10;

pub fn run(program: &mut Program, mode: Mode<'_>) -> Result<()> {
    walk::walk_program(&mut ConstLiteralPass { mode }, program)
}

struct ConstLiteralPass<'a> {
    mode: Mode<'a>,
}

impl Pass for ConstLiteralPass<'_> {
    fn expr(&mut self, expr: &mut Expr) -> Result<Flow> {
        let Some(pos) = trace::node_pos(ConstructKind::ConstDef, expr.loc.as_ref()) else {
            return Ok(Flow::Descend);
        };
        let Some(value) = consteval::evaluate(expr) else {
            return Ok(Flow::Descend);
        };
        if !(value.is_object() || value.is_array()) || consteval::json_size(&value) <= MIN_CONST_JSON_SIZE {
            return Ok(Flow::Descend);
        }
        match self.mode {
            Mode::Trace => {
                let inner = std::mem::replace(expr, Expr::new(crate::ast::ExprKind::Null));
                *expr = trace::trace_const_call(inner, &pos);
            }
            Mode::Optimize(trace_data) => {
                if !trace_data.is_executed(&pos) {
                    tracing::debug!("cold constant literal at {pos} left inline");
                }
            }
        }
        // the value is fully known; nothing deeper needs visiting
        Ok(Flow::Skip)
    }
}
