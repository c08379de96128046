//! Reserved in-source marker lexemes.
//!
//! Markers must round-trip through source text (eval arguments are plain
//! strings at runtime), so they are in-band sentinels. Every reserved lexeme
//! lives here; nothing else in the crate spells them out. Three forms exist:
//!
//! - eval-expression region: a sequence expression whose first element is the
//!   string literal [`EVAL_EXPRESSION_MARKER`];
//! - eval-block region: a statement list whose first statement is the string
//!   expression statement [`EVAL_BLOCK_MARKER`];
//! - synthesized eval call: `eval("<arg>")` whose string argument starts with
//!   the quoted [`EVAL_CALL_MARKER`] followed by `;`.
//!
//! All markers are consumed before final output; the synthesized-call prefix
//! is the only lexeme that may survive, inside extracted payload text, where
//! it is part of the evaluated source by design.

use crate::ast::{Expr, ExprKind, Stmt, StmtKind};

pub const EVAL_CALL_MARKER: &str = "$CP_eval";
pub const EVAL_EXPRESSION_MARKER: &str = "$CP_evalExp";
pub const EVAL_BLOCK_MARKER: &str = "$CP_evalBlock";

/// Build a synthesized `eval("<prefix>;<code>")` call.
pub fn eval_call(code: &str) -> Expr {
    Expr::new(ExprKind::Call {
        callee: Box::new(Expr::ident("eval")),
        args: vec![Expr::str(format!("\"{}\";{}", EVAL_CALL_MARKER, code))],
        optional: false,
    })
}

/// True for synthesized eval calls; user-authored `eval` never matches
/// because its argument lacks the reserved prefix.
pub fn is_eval_call(expr: &Expr) -> bool {
    parse_eval_code(expr).is_some()
}

/// The code carried by a synthesized eval call.
pub fn parse_eval_code(expr: &Expr) -> Option<&str> {
    let ExprKind::Call {
        callee,
        args,
        optional: false,
    } = &expr.kind
    else {
        return None;
    };
    if !matches!(&callee.kind, ExprKind::Ident(name) if name == "eval") {
        return None;
    }
    let [arg] = args.as_slice() else { return None };
    let ExprKind::Str(value) = &arg.kind else { return None };
    value.strip_prefix(&format!("\"{}\";", EVAL_CALL_MARKER))
}

/// Wrap an expression into an eval-expression region marker.
pub fn mark_eval_expression(expr: Expr) -> Expr {
    Expr::new(ExprKind::Sequence(vec![Expr::str(EVAL_EXPRESSION_MARKER), expr]))
}

pub fn is_eval_expression(expr: &Expr) -> bool {
    let ExprKind::Sequence(exprs) = &expr.kind else {
        return false;
    };
    if exprs.len() != 2 {
        return false;
    }
    matches!(&exprs[0].kind, ExprKind::Str(value) if value == EVAL_EXPRESSION_MARKER)
}

/// Strip an eval-expression marker, returning the wrapped expression.
/// Callers must check [`is_eval_expression`] first.
pub fn unwrap_eval_expression(expr: Expr) -> Expr {
    debug_assert!(is_eval_expression(&expr));
    match expr.kind {
        ExprKind::Sequence(mut exprs) => exprs.pop().expect("marker sequence has two elements"),
        _ => unreachable!("checked by is_eval_expression"),
    }
}

/// Prepend the eval-block marker to a statement list.
pub fn mark_eval_block(body: Vec<Stmt>) -> Vec<Stmt> {
    let mut stmts = Vec::with_capacity(body.len() + 1);
    stmts.push(Stmt::expr(Expr::str(EVAL_BLOCK_MARKER)));
    stmts.extend(body);
    stmts
}

pub fn is_eval_block(stmts: &[Stmt]) -> bool {
    let Some(first) = stmts.first() else { return false };
    let StmtKind::Expr(expr) = &first.kind else { return false };
    matches!(&expr.kind, ExprKind::Str(value) if value == EVAL_BLOCK_MARKER)
}

/// Remove the leading marker statement. Callers must check
/// [`is_eval_block`] first.
pub fn strip_eval_block(mut stmts: Vec<Stmt>) -> Vec<Stmt> {
    debug_assert!(is_eval_block(&stmts));
    stmts.remove(0);
    stmts
}

/// True for a block statement carrying the eval-block marker.
pub fn is_eval_block_stmt(stmt: &Stmt) -> bool {
    matches!(&stmt.kind, StmtKind::Block(stmts) if is_eval_block(stmts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    #[test]
    fn eval_call_roundtrip() {
        let call = eval_call("hello();");
        assert!(is_eval_call(&call));
        assert_eq!(parse_eval_code(&call), Some("hello();"));
        assert_eq!(
            Stmt::expr(call).to_string(),
            "eval(\"\\\"$CP_eval\\\";hello();\");"
        );
    }

    #[test]
    fn eval_call_survives_reparse() {
        let printed = Stmt::expr(eval_call("f(1)")).to_string();
        let reparsed = ast::parse(&printed).unwrap();
        let ast::StmtKind::Expr(expr) = &reparsed.body[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(parse_eval_code(expr), Some("f(1)"));
    }

    #[test]
    fn user_eval_is_not_synthesized() {
        let expr = ast::parse_expression("eval(\"f()\")").unwrap();
        assert!(!is_eval_call(&expr));
        let expr = ast::parse_expression("eval(code)").unwrap();
        assert!(!is_eval_call(&expr));
    }

    #[test]
    fn eval_expression_marker() {
        let marked = mark_eval_expression(Expr::ident("x"));
        assert!(is_eval_expression(&marked));
        let inner = unwrap_eval_expression(marked);
        assert_eq!(inner, Expr::ident("x"));
    }

    #[test]
    fn eval_block_marker() {
        let body = vec![Stmt::expr(Expr::ident("a"))];
        let marked = mark_eval_block(body);
        assert!(is_eval_block(&marked));
        assert_eq!(
            Stmt::new(StmtKind::Block(marked.clone())).to_string(),
            "{\"$CP_evalBlock\";a;}"
        );
        let stripped = strip_eval_block(marked);
        assert_eq!(stripped.len(), 1);
        assert!(!is_eval_block(&stripped));
    }
}
