//! Confident static evaluation of side-effect-free expressions.
//!
//! The stand-in for a full abstract interpreter: it only claims a value when
//! the expression is a closed literal computation. Used by the switch pass
//! (a run of cold cases may only collapse when every test is statically
//! evaluable) and by the const-literal pass (size threshold on the JSON
//! form of the value).

use crate::ast::{Expr, ExprKind, Prop, PropKey, UnaryOp};
use serde_json::{Map, Number, Value, json};

/// Evaluate an expression to a JSON value, or `None` when not confident.
pub fn evaluate(expr: &Expr) -> Option<Value> {
    match &expr.kind {
        ExprKind::Num(n) => Number::from_f64(*n).map(Value::Number),
        ExprKind::Str(s) => Some(Value::String(s.clone())),
        ExprKind::Bool(b) => Some(Value::Bool(*b)),
        ExprKind::Null => Some(Value::Null),
        ExprKind::Template(raw) => {
            let inner = raw.strip_prefix('`')?.strip_suffix('`')?;
            if inner.contains("${") || inner.contains('\\') {
                return None;
            }
            Some(Value::String(inner.to_string()))
        }
        ExprKind::Array(elems) => {
            let mut values = Vec::with_capacity(elems.len());
            for elem in elems {
                let elem = elem.as_ref()?;
                if matches!(elem.kind, ExprKind::Spread(_)) {
                    return None;
                }
                values.push(evaluate(elem)?);
            }
            Some(Value::Array(values))
        }
        ExprKind::Object(props) => {
            let mut map = Map::new();
            for prop in props {
                let Prop::KeyValue { key, value } = prop else {
                    return None;
                };
                let key = match key {
                    PropKey::Ident(name) => name.clone(),
                    PropKey::Str(s) => s.clone(),
                    PropKey::Num(n) => crate::ast::js_number(*n),
                    PropKey::Computed(_) => return None,
                };
                map.insert(key, evaluate(value)?);
            }
            Some(Value::Object(map))
        }
        ExprKind::Unary { op, arg } => {
            let value = evaluate(arg)?;
            match op {
                UnaryOp::Neg => Number::from_f64(-value.as_f64()?).map(Value::Number),
                UnaryOp::Pos => Number::from_f64(value.as_f64()?).map(Value::Number),
                UnaryOp::Not => Some(Value::Bool(!js_truthy(&value))),
                UnaryOp::Void => Some(Value::Null),
                UnaryOp::Typeof => Some(Value::String(
                    match value {
                        Value::Number(_) => "number",
                        Value::String(_) => "string",
                        Value::Bool(_) => "boolean",
                        Value::Null => "object",
                        Value::Array(_) | Value::Object(_) => "object",
                    }
                    .to_string(),
                )),
                UnaryOp::BitNot | UnaryOp::Delete => None,
            }
        }
        ExprKind::Binary { op, left, right } => {
            use crate::ast::BinOp;
            let l = evaluate(left)?;
            let r = evaluate(right)?;
            match op {
                BinOp::Add => match (&l, &r) {
                    (Value::String(a), Value::String(b)) => Some(json!(format!("{a}{b}"))),
                    (Value::String(a), Value::Number(b)) => Some(json!(format!("{a}{b}"))),
                    (Value::Number(a), Value::String(b)) => Some(json!(format!("{a}{b}"))),
                    (Value::Number(_), Value::Number(_)) => {
                        Number::from_f64(l.as_f64()? + r.as_f64()?).map(Value::Number)
                    }
                    _ => None,
                },
                BinOp::Sub => Number::from_f64(l.as_f64()? - r.as_f64()?).map(Value::Number),
                BinOp::Mul => Number::from_f64(l.as_f64()? * r.as_f64()?).map(Value::Number),
                BinOp::Div => Number::from_f64(l.as_f64()? / r.as_f64()?).map(Value::Number),
                BinOp::Mod => Number::from_f64(l.as_f64()? % r.as_f64()?).map(Value::Number),
                _ => None,
            }
        }
        _ => None,
    }
}

/// True when the expression is statically evaluable and side-effect-free.
pub fn is_pure(expr: &Expr) -> bool {
    evaluate(expr).is_some()
}

/// Size of the value in its JSON text form.
pub fn json_size(value: &Value) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_expression;

    fn eval(src: &str) -> Option<Value> {
        evaluate(&parse_expression(src).unwrap())
    }

    #[test]
    fn literals() {
        assert_eq!(eval("123"), Some(json!(123.0)));
        assert_eq!(eval("'hi'"), Some(json!("hi")));
        assert_eq!(eval("({\"hello\": \"world\", \"n\": 123})"), Some(json!({"hello": "world", "n": 123.0})));
        assert_eq!(eval("[1, 'two', null]"), Some(json!([1.0, "two", null])));
    }

    #[test]
    fn not_confident() {
        assert_eq!(eval("fn()"), None);
        assert_eq!(eval("({\"hello\": fn()})"), None);
        assert_eq!(eval("[x]"), None);
        assert_eq!(eval("[...xs]"), None);
    }

    #[test]
    fn operators() {
        assert_eq!(eval("-1"), Some(json!(-1.0)));
        assert_eq!(eval("!0"), Some(json!(true)));
        assert_eq!(eval("1 + 2"), Some(json!(3.0)));
        assert_eq!(eval("'a' + 'b'"), Some(json!("ab")));
        assert_eq!(eval("typeof 'x'"), Some(json!("string")));
    }

    #[test]
    fn json_sizes() {
        assert_eq!(json_size(&json!({"a": 1})), "{\"a\":1}".len());
    }
}
