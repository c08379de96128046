//! Compact, deterministic code generation.
//!
//! All pipeline stages that serialize code (eval payload strings, the final
//! output, structural dedup keys) go through this printer, so its output must
//! be stable: same tree, same bytes.

use super::nodes::*;
use std::fmt::{self, Display, Write};

const PREC_SEQ: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_COND: u8 = 3;
const PREC_NULLISH: u8 = 4;
const PREC_OR: u8 = 5;
const PREC_AND: u8 = 6;
const PREC_BITOR: u8 = 7;
const PREC_BITXOR: u8 = 8;
const PREC_BITAND: u8 = 9;
const PREC_EQ: u8 = 10;
const PREC_REL: u8 = 11;
const PREC_SHIFT: u8 = 12;
const PREC_ADD: u8 = 13;
const PREC_MUL: u8 = 14;
const PREC_EXP: u8 = 15;
const PREC_UNARY: u8 = 16;
const PREC_POSTFIX: u8 = 17;
const PREC_CALL: u8 = 19;
const PREC_PRIMARY: u8 = 20;

fn bin_op_prec(op: BinOp) -> u8 {
    use BinOp::*;
    match op {
        BitOr => PREC_BITOR,
        BitXor => PREC_BITXOR,
        BitAnd => PREC_BITAND,
        Eq | Ne | StrictEq | StrictNe => PREC_EQ,
        Lt | Gt | Le | Ge | In | Instanceof => PREC_REL,
        Shl | Shr | UShr => PREC_SHIFT,
        Add | Sub => PREC_ADD,
        Mul | Div | Mod => PREC_MUL,
        Exp => PREC_EXP,
    }
}

fn logical_op_prec(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::Nullish => PREC_NULLISH,
        LogicalOp::Or => PREC_OR,
        LogicalOp::And => PREC_AND,
    }
}

fn prec(kind: &ExprKind) -> u8 {
    match kind {
        ExprKind::Sequence(_) => PREC_SEQ,
        ExprKind::Assign { .. } | ExprKind::Arrow(_) | ExprKind::Yield { .. } | ExprKind::Spread(_) => PREC_ASSIGN,
        ExprKind::Conditional { .. } => PREC_COND,
        ExprKind::Logical { op, .. } => logical_op_prec(*op),
        ExprKind::Binary { op, .. } => bin_op_prec(*op),
        ExprKind::Unary { .. } | ExprKind::Await(_) => PREC_UNARY,
        ExprKind::Update { prefix, .. } => {
            if *prefix {
                PREC_UNARY
            } else {
                PREC_POSTFIX
            }
        }
        ExprKind::Call { .. } | ExprKind::Member { .. } | ExprKind::New { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

fn bin_op_text(op: BinOp) -> &'static str {
    use BinOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        Exp => "**",
        Eq => "==",
        Ne => "!=",
        StrictEq => "===",
        StrictNe => "!==",
        Lt => "<",
        Gt => ">",
        Le => "<=",
        Ge => ">=",
        Shl => "<<",
        Shr => ">>",
        UShr => ">>>",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        In => " in ",
        Instanceof => " instanceof ",
    }
}

fn logical_op_text(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "&&",
        LogicalOp::Or => "||",
        LogicalOp::Nullish => "??",
    }
}

fn assign_op_text(op: AssignOp) -> &'static str {
    use AssignOp::*;
    match op {
        Assign => "=",
        Add => "+=",
        Sub => "-=",
        Mul => "*=",
        Div => "/=",
        Mod => "%=",
        Exp => "**=",
        Shl => "<<=",
        Shr => ">>=",
        UShr => ">>>=",
        BitAnd => "&=",
        BitOr => "|=",
        BitXor => "^=",
        And => "&&=",
        Or => "||=",
        Nullish => "??=",
    }
}

/// Print a number the way JS source spells it.
pub fn js_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 9_007_199_254_740_992.0 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

/// Escape a cooked string value into a double-quoted JS string literal.
pub fn write_js_string(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// True when an expression statement would start with `{`, `function` or
/// `class` and misparse; the whole expression is then wrapped in parens.
fn starts_ambiguously(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Object(_) | ExprKind::Function(_) | ExprKind::ClassExpr(_) => true,
        ExprKind::Binary { left, .. } | ExprKind::Logical { left, .. } => starts_ambiguously(left),
        ExprKind::Assign { target, .. } => starts_ambiguously(target),
        ExprKind::Conditional { test, .. } => starts_ambiguously(test),
        ExprKind::Sequence(exprs) => exprs.first().is_some_and(starts_ambiguously),
        ExprKind::Call { callee, .. } => starts_ambiguously(callee),
        ExprKind::Member { object, .. } => starts_ambiguously(object),
        ExprKind::Update { prefix: false, arg, .. } => starts_ambiguously(arg),
        _ => false,
    }
}

/// True when a `new` callee would swallow an argument list.
fn member_chain_has_call(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Call { .. } => true,
        ExprKind::Member { object, .. } => member_chain_has_call(object),
        _ => false,
    }
}

/// True when an expression printed in a for-init would expose a top-level
/// `in` operator (which the for grammar would claim).
fn exposes_in_operator(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Binary { op: BinOp::In, .. } => true,
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            exposes_in_operator(left) || exposes_in_operator(right)
        }
        ExprKind::Assign { value, .. } => exposes_in_operator(value),
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => exposes_in_operator(test) || exposes_in_operator(consequent) || exposes_in_operator(alternate),
        ExprKind::Sequence(exprs) => exprs.iter().any(exposes_in_operator),
        ExprKind::Unary { arg, .. } | ExprKind::Update { arg, .. } | ExprKind::Await(arg) => exposes_in_operator(arg),
        _ => false,
    }
}

pub struct Printer {
    out: String,
}

impl Printer {
    pub fn new() -> Self {
        Self { out: String::new() }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn program(&mut self, program: &Program) {
        for stmt in &program.body {
            self.stmt(stmt);
        }
    }

    pub fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                if starts_ambiguously(expr) {
                    self.out.push('(');
                    self.expr(expr, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(expr, PREC_SEQ);
                }
                self.out.push(';');
            }
            StmtKind::VarDecl { kind, decls } => {
                self.var_decl(*kind, decls);
                self.out.push(';');
            }
            StmtKind::FuncDecl(function) => self.function(function),
            StmtKind::ClassDecl(class) => self.class(class),
            StmtKind::Return(value) => {
                self.out.push_str("return");
                if let Some(expr) = value {
                    self.out.push(' ');
                    self.expr(expr, PREC_SEQ);
                }
                self.out.push(';');
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.out.push_str("if(");
                self.expr(test, PREC_SEQ);
                self.out.push(')');
                if alternate.is_some() && !matches!(consequent.kind, StmtKind::Block(_)) {
                    // keep the else attached to this if
                    self.out.push('{');
                    self.stmt(consequent);
                    self.out.push('}');
                } else {
                    self.stmt(consequent);
                }
                if let Some(alt) = alternate {
                    self.out.push_str("else ");
                    self.stmt(alt);
                }
            }
            StmtKind::Block(stmts) => {
                self.out.push('{');
                for s in stmts {
                    self.stmt(s);
                }
                self.out.push('}');
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.out.push_str("for(");
                match init {
                    Some(ForInit::VarDecl { kind, decls }) => self.var_decl(*kind, decls),
                    Some(ForInit::Expr(expr)) => {
                        if exposes_in_operator(expr) {
                            self.out.push('(');
                            self.expr(expr, PREC_SEQ);
                            self.out.push(')');
                        } else {
                            self.expr(expr, PREC_SEQ);
                        }
                    }
                    None => {}
                }
                self.out.push(';');
                if let Some(expr) = test {
                    self.expr(expr, PREC_SEQ);
                }
                self.out.push(';');
                if let Some(expr) = update {
                    self.expr(expr, PREC_SEQ);
                }
                self.out.push(')');
                self.stmt(body);
            }
            StmtKind::ForIn { left, right, body, of } => {
                self.out.push_str("for(");
                match left {
                    ForHead::VarDecl { kind, name } => {
                        self.decl_kind(*kind);
                        self.out.push(' ');
                        self.out.push_str(name);
                    }
                    ForHead::Pattern(expr) => self.expr(expr, PREC_CALL),
                }
                self.out.push_str(if *of { " of " } else { " in " });
                self.expr(right, PREC_ASSIGN);
                self.out.push(')');
                self.stmt(body);
            }
            StmtKind::While { test, body } => {
                self.out.push_str("while(");
                self.expr(test, PREC_SEQ);
                self.out.push(')');
                self.stmt(body);
            }
            StmtKind::DoWhile { body, test } => {
                if matches!(body.kind, StmtKind::Block(_)) {
                    self.out.push_str("do");
                } else {
                    self.out.push_str("do ");
                }
                self.stmt(body);
                self.out.push_str("while(");
                self.expr(test, PREC_SEQ);
                self.out.push_str(");");
            }
            StmtKind::Switch { discriminant, cases } => {
                self.out.push_str("switch(");
                self.expr(discriminant, PREC_SEQ);
                self.out.push_str("){");
                for case in cases {
                    match &case.test {
                        Some(test) => {
                            self.out.push_str("case ");
                            self.expr(test, PREC_SEQ);
                            self.out.push(':');
                        }
                        None => self.out.push_str("default:"),
                    }
                    for s in &case.body {
                        self.stmt(s);
                    }
                }
                self.out.push('}');
            }
            StmtKind::Break(label) => {
                self.out.push_str("break");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            StmtKind::Continue(label) => {
                self.out.push_str("continue");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.out.push_str(label);
                }
                self.out.push(';');
            }
            StmtKind::Labeled { label, body } => {
                self.out.push_str(label);
                self.out.push(':');
                self.stmt(body);
            }
            StmtKind::Throw(expr) => {
                self.out.push_str("throw ");
                self.expr(expr, PREC_SEQ);
                self.out.push(';');
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.out.push_str("try{");
                for s in block {
                    self.stmt(s);
                }
                self.out.push('}');
                if let Some(handler) = handler {
                    self.out.push_str("catch");
                    if let Some(param) = &handler.param {
                        self.out.push('(');
                        self.out.push_str(param);
                        self.out.push(')');
                    }
                    self.out.push('{');
                    for s in &handler.body {
                        self.stmt(s);
                    }
                    self.out.push('}');
                }
                if let Some(finalizer) = finalizer {
                    self.out.push_str("finally{");
                    for s in finalizer {
                        self.stmt(s);
                    }
                    self.out.push('}');
                }
            }
            StmtKind::Empty => self.out.push(';'),
            StmtKind::Debugger => self.out.push_str("debugger;"),
        }
    }

    fn decl_kind(&mut self, kind: DeclKind) {
        self.out.push_str(match kind {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        });
    }

    fn var_decl(&mut self, kind: DeclKind, decls: &[Declarator]) {
        self.decl_kind(kind);
        self.out.push(' ');
        for (i, d) in decls.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.out.push_str(&d.name);
            if let Some(init) = &d.init {
                self.out.push('=');
                self.expr(init, PREC_ASSIGN);
            }
        }
    }

    fn function(&mut self, function: &Function) {
        if function.is_async {
            self.out.push_str("async ");
        }
        self.out.push_str("function");
        if function.is_generator {
            self.out.push('*');
        }
        if let Some(name) = &function.name {
            self.out.push(' ');
            self.out.push_str(name);
        }
        self.params(&function.params);
        self.out.push('{');
        for s in &function.body {
            self.stmt(s);
        }
        self.out.push('}');
    }

    fn params(&mut self, params: &[Param]) {
        self.out.push('(');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            if p.rest {
                self.out.push_str("...");
            }
            self.out.push_str(&p.name);
            if let Some(default) = &p.default {
                self.out.push('=');
                self.expr(default, PREC_ASSIGN);
            }
        }
        self.out.push(')');
    }

    fn class(&mut self, class: &Class) {
        self.out.push_str("class");
        if let Some(name) = &class.name {
            self.out.push(' ');
            self.out.push_str(name);
        }
        if let Some(superclass) = &class.superclass {
            self.out.push_str(" extends ");
            self.expr(superclass, PREC_CALL);
        }
        self.out.push('{');
        for member in &class.members {
            if member.is_static {
                self.out.push_str("static ");
            }
            self.method_head(member.kind, &member.function);
            self.prop_key(&member.key);
            self.params(&member.function.params);
            self.out.push('{');
            for s in &member.function.body {
                self.stmt(s);
            }
            self.out.push('}');
        }
        self.out.push('}');
    }

    fn method_head(&mut self, kind: MethodKind, function: &Function) {
        match kind {
            MethodKind::Get => self.out.push_str("get "),
            MethodKind::Set => self.out.push_str("set "),
            MethodKind::Method => {
                if function.is_async {
                    self.out.push_str("async ");
                }
                if function.is_generator {
                    self.out.push('*');
                }
            }
        }
    }

    fn prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.out.push_str(name),
            PropKey::Str(value) => write_js_string(&mut self.out, value),
            PropKey::Num(n) => self.out.push_str(&js_number(*n)),
            PropKey::Computed(expr) => {
                self.out.push('[');
                self.expr(expr, PREC_ASSIGN);
                self.out.push(']');
            }
        }
    }

    pub fn expr(&mut self, e: &Expr, min_prec: u8) {
        let own = prec(&e.kind);
        if own < min_prec {
            self.out.push('(');
            self.expr_inner(e);
            self.out.push(')');
        } else {
            self.expr_inner(e);
        }
    }

    fn expr_inner(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Ident(name) => self.out.push_str(name),
            ExprKind::Num(n) => self.out.push_str(&js_number(*n)),
            ExprKind::Str(value) => write_js_string(&mut self.out, value),
            ExprKind::Template(raw) | ExprKind::Regex(raw) => self.out.push_str(raw),
            ExprKind::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            ExprKind::Null => self.out.push_str("null"),
            ExprKind::This => self.out.push_str("this"),
            ExprKind::Super => self.out.push_str("super"),
            ExprKind::Array(elems) => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    if let Some(elem) = elem {
                        self.expr(elem, PREC_ASSIGN);
                    }
                }
                if matches!(elems.last(), Some(None)) {
                    self.out.push(',');
                }
                self.out.push(']');
            }
            ExprKind::Object(props) => {
                self.out.push('{');
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    match prop {
                        Prop::KeyValue { key, value } => {
                            self.prop_key(key);
                            self.out.push(':');
                            self.expr(value, PREC_ASSIGN);
                        }
                        Prop::Shorthand(name) => self.out.push_str(name),
                        Prop::Method { key, kind, function } => {
                            self.method_head(*kind, function);
                            self.prop_key(key);
                            self.params(&function.params);
                            self.out.push('{');
                            for s in &function.body {
                                self.stmt(s);
                            }
                            self.out.push('}');
                        }
                        Prop::Spread(expr) => {
                            self.out.push_str("...");
                            self.expr(expr, PREC_ASSIGN);
                        }
                    }
                }
                self.out.push('}');
            }
            ExprKind::Function(function) => self.function(function),
            ExprKind::Arrow(arrow) => {
                if arrow.is_async {
                    self.out.push_str("async ");
                }
                match arrow.params.as_slice() {
                    [p] if p.default.is_none() && !p.rest => self.out.push_str(&p.name),
                    params => self.params(params),
                }
                self.out.push_str("=>");
                match &arrow.body {
                    ArrowBody::Block(stmts) => {
                        self.out.push('{');
                        for s in stmts {
                            self.stmt(s);
                        }
                        self.out.push('}');
                    }
                    ArrowBody::Expr(expr) => {
                        if matches!(expr.kind, ExprKind::Object(_)) {
                            self.out.push('(');
                            self.expr(expr, PREC_SEQ);
                            self.out.push(')');
                        } else {
                            self.expr(expr, PREC_ASSIGN);
                        }
                    }
                }
            }
            ExprKind::ClassExpr(class) => self.class(class),
            ExprKind::Unary { op, arg } => {
                let (text, word) = match op {
                    UnaryOp::Neg => ("-", false),
                    UnaryOp::Pos => ("+", false),
                    UnaryOp::Not => ("!", false),
                    UnaryOp::BitNot => ("~", false),
                    UnaryOp::Typeof => ("typeof", true),
                    UnaryOp::Void => ("void", true),
                    UnaryOp::Delete => ("delete", true),
                };
                self.out.push_str(text);
                if word {
                    self.out.push(' ');
                }
                let sign_clash = matches!(
                    (op, &arg.kind),
                    (UnaryOp::Neg, ExprKind::Unary { op: UnaryOp::Neg, .. })
                        | (UnaryOp::Neg, ExprKind::Update { op: UpdateOp::Dec, prefix: true, .. })
                        | (UnaryOp::Pos, ExprKind::Unary { op: UnaryOp::Pos, .. })
                        | (UnaryOp::Pos, ExprKind::Update { op: UpdateOp::Inc, prefix: true, .. })
                );
                if sign_clash {
                    self.out.push('(');
                    self.expr(arg, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(arg, PREC_UNARY);
                }
            }
            ExprKind::Update { op, prefix, arg } => {
                let text = match op {
                    UpdateOp::Inc => "++",
                    UpdateOp::Dec => "--",
                };
                if *prefix {
                    self.out.push_str(text);
                    self.expr(arg, PREC_UNARY);
                } else {
                    self.expr(arg, PREC_POSTFIX);
                    self.out.push_str(text);
                }
            }
            ExprKind::Binary { op, left, right } => {
                let p = bin_op_prec(*op);
                if *op == BinOp::Exp {
                    // unary operands of ** must be parenthesized
                    if matches!(left.kind, ExprKind::Unary { .. } | ExprKind::Await(_)) {
                        self.out.push('(');
                        self.expr(left, PREC_SEQ);
                        self.out.push(')');
                    } else {
                        self.expr(left, p + 1);
                    }
                    self.out.push_str(bin_op_text(*op));
                    self.expr(right, p);
                } else {
                    self.expr(left, p);
                    self.out.push_str(bin_op_text(*op));
                    self.expr(right, p + 1);
                }
            }
            ExprKind::Logical { op, left, right } => {
                let p = logical_op_prec(*op);
                let mixes = |child: &Expr| {
                    matches!(
                        (op, &child.kind),
                        (LogicalOp::Nullish, ExprKind::Logical { op: LogicalOp::And, .. })
                            | (LogicalOp::Nullish, ExprKind::Logical { op: LogicalOp::Or, .. })
                            | (LogicalOp::And, ExprKind::Logical { op: LogicalOp::Nullish, .. })
                            | (LogicalOp::Or, ExprKind::Logical { op: LogicalOp::Nullish, .. })
                    )
                };
                if mixes(left) {
                    self.out.push('(');
                    self.expr(left, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(left, p);
                }
                self.out.push_str(logical_op_text(*op));
                if mixes(right) {
                    self.out.push('(');
                    self.expr(right, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(right, p + 1);
                }
            }
            ExprKind::Assign { op, target, value } => {
                self.expr(target, PREC_CALL);
                self.out.push_str(assign_op_text(*op));
                self.expr(value, PREC_ASSIGN);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test, PREC_NULLISH);
                self.out.push('?');
                self.expr(consequent, PREC_ASSIGN);
                self.out.push(':');
                self.expr(alternate, PREC_ASSIGN);
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                self.expr(callee, PREC_CALL);
                if *optional {
                    self.out.push_str("?.");
                }
                self.args(args);
            }
            ExprKind::New { callee, args } => {
                self.out.push_str("new ");
                if member_chain_has_call(callee) {
                    self.out.push('(');
                    self.expr(callee, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(callee, PREC_CALL);
                }
                self.args(args);
            }
            ExprKind::Member {
                object,
                prop,
                optional,
            } => {
                if matches!(object.kind, ExprKind::Num(_)) {
                    self.out.push('(');
                    self.expr(object, PREC_SEQ);
                    self.out.push(')');
                } else {
                    self.expr(object, PREC_CALL);
                }
                match prop {
                    MemberProp::Ident(name) => {
                        self.out.push_str(if *optional { "?." } else { "." });
                        self.out.push_str(name);
                    }
                    MemberProp::Computed(expr) => {
                        if *optional {
                            self.out.push_str("?.");
                        }
                        self.out.push('[');
                        self.expr(expr, PREC_SEQ);
                        self.out.push(']');
                    }
                }
            }
            ExprKind::Sequence(exprs) => {
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.expr(expr, PREC_ASSIGN);
                }
            }
            ExprKind::Spread(expr) => {
                self.out.push_str("...");
                self.expr(expr, PREC_ASSIGN);
            }
            ExprKind::Await(arg) => {
                self.out.push_str("await ");
                self.expr(arg, PREC_UNARY);
            }
            ExprKind::Yield { arg, delegate } => {
                self.out.push_str("yield");
                if *delegate {
                    self.out.push('*');
                }
                if let Some(arg) = arg {
                    self.out.push(' ');
                    self.expr(arg, PREC_ASSIGN);
                }
            }
        }
    }

    fn args(&mut self, args: &[Expr]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.expr(arg, PREC_ASSIGN);
        }
        self.out.push(')');
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.program(self);
        f.write_str(&p.finish())
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.stmt(self);
        f.write_str(&p.finish())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new();
        p.expr(self, PREC_SEQ);
        f.write_str(&p.finish())
    }
}

/// Generate source text for a whole program.
pub fn gen_code(program: &Program) -> String {
    let mut p = Printer::new();
    p.program(program);
    p.finish()
}
