//! Execution-trace model and the instrumentation runtime.
//!
//! A position key is `"<ConstructKind>/<line>:<column>"` derived from a
//! construct's start coordinate (1-based line, 0-based column). The trace run
//! and the optimize run parse the same original source, so both derive
//! identical keys; the key is the join between the two passes.


#[cfg(test)]
pub mod testutil;

use crate::ast::{Expr, ExprKind, MemberProp};
use crate::token::Position;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Global object holding per-position counters in the traced run.
pub const TRACE_DATA_GLOBAL: &str = "__COLDPATH_TRACE__";
/// Global object exposing the counter functions in the traced run.
pub const TRACE_RUNTIME_GLOBAL: &str = "__COLDPATH__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    Statement,
    SwitchCase,
    ConditionalExpression,
    LogicalExpression,
    ConstDef,
}

impl ConstructKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstructKind::Statement => "Statement",
            ConstructKind::SwitchCase => "SwitchCase",
            ConstructKind::ConditionalExpression => "ConditionalExpression",
            ConstructKind::LogicalExpression => "LogicalExpression",
            ConstructKind::ConstDef => "ConstDef",
        }
    }
}

/// Position key for a construct, or `None` for synthesized nodes.
pub fn node_pos(kind: ConstructKind, loc: Option<&Position>) -> Option<String> {
    loc.map(|p| format!("{}/{}:{}", kind.as_str(), p.line, p.column))
}

/// The trace artifact: one execution's per-position counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceData {
    pub counts: FxHashMap<String, u64>,
}

impl TraceData {
    pub fn is_executed(&self, pos: &str) -> bool {
        self.counts.get(pos).copied().unwrap_or(0) > 0
    }
}

/// Build the `__COLDPATH__.trace("<pos>")` increment expression.
pub fn trace_call(pos: &str) -> Expr {
    runtime_call("trace", vec![Expr::str(pos)])
}

/// Build `__COLDPATH__.traceConst(<exp>, "<pos>")`, the read-observing proxy
/// wrapper for large constant literals.
pub fn trace_const_call(exp: Expr, pos: &str) -> Expr {
    runtime_call("traceConst", vec![exp, Expr::str(pos)])
}

fn runtime_call(method: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        callee: Box::new(Expr::new(ExprKind::Member {
            object: Box::new(Expr::ident(TRACE_RUNTIME_GLOBAL)),
            prop: MemberProp::Ident(method.to_string()),
            optional: false,
        })),
        args,
        optional: false,
    })
}

/// Counter runtime injected ahead of instrumented code. After the session it
/// leaves the collected counts readable at `__COLDPATH_TRACE__`.
pub fn runtime_code() -> String {
    format!(
        r#"globalThis.{data} = {{counts: {{}}}};
globalThis.{rt} = {{
  trace(pos) {{
    const traceData = globalThis.{data};
    const count = traceData.counts[pos];
    traceData.counts[pos] = count === undefined ? 1 : count + 1;
  }},
  traceConst(exp, pos) {{
    return new Proxy(
      exp,
      new Proxy({{}}, {{
        get(_target, prop, _receiver) {{
          return (...args) => {{
            const traceData = globalThis.{data};
            const count = traceData.counts[pos];
            traceData.counts[pos] = count === undefined ? 1 : count + 1;
            return Reflect[prop](...args);
          }};
        }},
      }})
    );
  }}
}};
"#,
        data = TRACE_DATA_GLOBAL,
        rt = TRACE_RUNTIME_GLOBAL,
    )
}
