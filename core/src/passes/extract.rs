//! Externalization of eval payload strings.
//!
//! Synthesized eval calls shorter than the minimum size are not worth a
//! round-trip through the payload and are inlined back to plain source.
//! Everything else moves into an ordered payload list; the call site becomes
//! `eval(_X(<index>))`, resolved at runtime by the loader. With `keep_code`
//! the source stays inline as a plain eval argument, which keeps the output
//! self-contained for debugging.

use crate::ast::{self, Expr, ExprKind, Program};
use crate::marker;
use crate::passes::walk::{self, Flow, Pass};
use anyhow::{Context, Result};

const MIN_CODE_SIZE_TO_BE_EXTRACTED: usize = 32;

/// Runtime accessor installed by the loader prelude.
pub const PAYLOAD_ACCESSOR: &str = "_X";

pub fn run(program: &mut Program, keep_code: bool) -> Result<Vec<String>> {
    let mut pass = ExtractPass {
        keep_code,
        extracted: Vec::new(),
    };
    walk::walk_program(&mut pass, program)?;
    Ok(pass.extracted)
}

struct ExtractPass {
    keep_code: bool,
    extracted: Vec<String>,
}

impl Pass for ExtractPass {
    fn expr(&mut self, expr: &mut Expr) -> Result<Flow> {
        let Some(code) = marker::parse_eval_code(expr) else {
            return Ok(Flow::Descend);
        };
        let code = code.to_string();

        if code.len() < MIN_CODE_SIZE_TO_BE_EXTRACTED {
            // the inlined source may itself hold a synthesized call; keep
            // descending so it is handled too
            *expr = ast::parse_expression(&code)
                .with_context(|| format!("reparsing inlined eval payload `{code}`"))?;
            return Ok(Flow::Descend);
        }

        if self.keep_code {
            *expr = Expr::new(ExprKind::Call {
                callee: Box::new(Expr::ident("eval")),
                args: vec![Expr::str(code)],
                optional: false,
            });
            return Ok(Flow::Skip);
        }

        let index = self.extracted.len();
        self.extracted.push(code);
        *expr = Expr::new(ExprKind::Call {
            callee: Box::new(Expr::ident("eval")),
            args: vec![Expr::new(ExprKind::Call {
                callee: Box::new(Expr::ident(PAYLOAD_ACCESSOR)),
                args: vec![Expr::num(index as f64)],
                optional: false,
            })],
            optional: false,
        });
        Ok(Flow::Skip)
    }
}
