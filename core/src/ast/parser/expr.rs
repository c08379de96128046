use super::Parser;
use crate::ast::{
    Arrow, ArrowBody, AssignOp, BinOp, Expr, ExprKind, Function, LogicalOp, MemberProp, MethodKind, Param, Prop,
    PropKey, UnaryOp, UpdateOp,
};
use crate::token::Token;
use anyhow::{Result, bail};

impl<'a> Parser<'a> {
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assign()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let loc = first.loc.clone();
        let mut exprs = vec![first];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_assign()?);
        }
        Ok(Expr::at(ExprKind::Sequence(exprs), loc))
    }

    pub fn parse_assign(&mut self) -> Result<Expr> {
        // arrow functions need lookahead before the ladder claims `(`
        match self.peek() {
            Some(Token::Id(_)) if self.peek_at(1) == Some(&Token::Arrow) => {
                return self.parse_arrow(false);
            }
            Some(Token::LParen) if self.is_arrow_ahead(self.pos) => {
                return self.parse_arrow(false);
            }
            Some(Token::Async)
                if matches!(self.peek_at(1), Some(Token::Id(_))) && self.peek_at(2) == Some(&Token::Arrow) =>
            {
                self.pos += 1;
                return self.parse_arrow(true);
            }
            Some(Token::Async) if self.peek_at(1) == Some(&Token::LParen) && self.is_arrow_ahead(self.pos + 1) => {
                self.pos += 1;
                return self.parse_arrow(true);
            }
            Some(Token::Yield) => return self.parse_yield(),
            _ => {}
        }

        let expr = self.parse_conditional()?;

        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::AddAssign) => AssignOp::Add,
            Some(Token::SubAssign) => AssignOp::Sub,
            Some(Token::MulAssign) => AssignOp::Mul,
            Some(Token::DivAssign) => AssignOp::Div,
            Some(Token::ModAssign) => AssignOp::Mod,
            Some(Token::ExpAssign) => AssignOp::Exp,
            Some(Token::ShlAssign) => AssignOp::Shl,
            Some(Token::ShrAssign) => AssignOp::Shr,
            Some(Token::UShrAssign) => AssignOp::UShr,
            Some(Token::BitAndAssign) => AssignOp::BitAnd,
            Some(Token::BitOrAssign) => AssignOp::BitOr,
            Some(Token::BitXorAssign) => AssignOp::BitXor,
            Some(Token::AndAssign) => AssignOp::And,
            Some(Token::OrAssign) => AssignOp::Or,
            Some(Token::NullishAssign) => AssignOp::Nullish,
            _ => return Ok(expr),
        };
        self.pos += 1;

        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } => {}
            ExprKind::Array(_) | ExprKind::Object(_) => {
                bail!(self.err("Destructuring assignment targets are not supported"))
            }
            _ => bail!(self.err("Invalid assignment target")),
        }

        let loc = expr.loc.clone();
        let value = self.parse_assign()?;
        Ok(Expr::at(
            ExprKind::Assign {
                op,
                target: Box::new(expr),
                value: Box::new(value),
            },
            loc,
        ))
    }

    fn parse_yield(&mut self) -> Result<Expr> {
        let loc = self.loc_here();
        self.expect_token(Token::Yield)?;
        let delegate = self.eat(&Token::Mul);
        let arg = if delegate || self.can_start_expression() {
            Some(Box::new(self.parse_assign()?))
        } else {
            None
        };
        Ok(Expr::at(ExprKind::Yield { arg, delegate }, loc))
    }

    fn can_start_expression(&self) -> bool {
        if self.has_newline_before() {
            return false;
        }
        !matches!(
            self.peek(),
            None | Some(
                Token::Semicolon
                    | Token::RParen
                    | Token::RBracket
                    | Token::RBrace
                    | Token::Comma
                    | Token::Colon
            )
        )
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let test = self.parse_nullish()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assign()?;
        self.expect_token(Token::Colon)?;
        let alternate = self.parse_assign()?;
        let loc = test.loc.clone();
        Ok(Expr::at(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            loc,
        ))
    }

    fn parse_nullish(&mut self) -> Result<Expr> {
        let mut expr = self.parse_or()?;
        while self.eat(&Token::Nullish) {
            let right = self.parse_or()?;
            let loc = expr.loc.clone();
            expr = Expr::at(
                ExprKind::Logical {
                    op: LogicalOp::Nullish,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            let loc = expr.loc.clone();
            expr = Expr::at(
                ExprKind::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_bin(0)?;
        while self.eat(&Token::And) {
            let right = self.parse_bin(0)?;
            let loc = expr.loc.clone();
            expr = Expr::at(
                ExprKind::Logical {
                    op: LogicalOp::And,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(expr)
    }

    /// Binary operator ladder from bitwise-or down to exponentiation.
    /// `level` indexes [BIN_LEVELS].
    fn parse_bin(&mut self, level: usize) -> Result<Expr> {
        if level >= BIN_LEVELS.len() {
            return self.parse_exponent();
        }
        let mut expr = self.parse_bin(level + 1)?;
        loop {
            let op = match BIN_LEVELS[level].iter().find(|(tok, _)| self.at(tok)) {
                Some((_, op)) => *op,
                None => break,
            };
            if op == BinOp::In && self.no_in {
                break;
            }
            self.pos += 1;
            let right = self.parse_bin(level + 1)?;
            let loc = expr.loc.clone();
            expr = Expr::at(
                ExprKind::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(expr)
    }

    fn parse_exponent(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        if !self.eat(&Token::Exp) {
            return Ok(left);
        }
        // right-associative
        let right = self.parse_exponent()?;
        let loc = left.loc.clone();
        Ok(Expr::at(
            ExprKind::Binary {
                op: BinOp::Exp,
                left: Box::new(left),
                right: Box::new(right),
            },
            loc,
        ))
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let loc = self.loc_here();
        let op = match self.peek() {
            Some(Token::Not) => Some(UnaryOp::Not),
            Some(Token::BitNot) => Some(UnaryOp::BitNot),
            Some(Token::Add) => Some(UnaryOp::Pos),
            Some(Token::Sub) => Some(UnaryOp::Neg),
            Some(Token::Typeof) => Some(UnaryOp::Typeof),
            Some(Token::Void) => Some(UnaryOp::Void),
            Some(Token::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let arg = self.parse_unary()?;
            return Ok(Expr::at(ExprKind::Unary { op, arg: Box::new(arg) }, loc));
        }
        if matches!(self.peek(), Some(Token::Inc | Token::Dec)) {
            let op = if self.at(&Token::Inc) { UpdateOp::Inc } else { UpdateOp::Dec };
            self.pos += 1;
            let arg = self.parse_unary()?;
            return Ok(Expr::at(
                ExprKind::Update {
                    op,
                    prefix: true,
                    arg: Box::new(arg),
                },
                loc,
            ));
        }
        if self.eat(&Token::Await) {
            let arg = self.parse_unary()?;
            return Ok(Expr::at(ExprKind::Await(Box::new(arg)), loc));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_lhs()?;
        if !self.has_newline_before()
            && let Some(tok @ (Token::Inc | Token::Dec)) = self.peek()
        {
            let op = if *tok == Token::Inc { UpdateOp::Inc } else { UpdateOp::Dec };
            self.pos += 1;
            let loc = expr.loc.clone();
            return Ok(Expr::at(
                ExprKind::Update {
                    op,
                    prefix: false,
                    arg: Box::new(expr),
                },
                loc,
            ));
        }
        Ok(expr)
    }

    pub(crate) fn parse_lhs(&mut self) -> Result<Expr> {
        let mut expr = if self.at(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            let loc = expr.loc.clone();
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.ident_name()?;
                    expr = Expr::at(
                        ExprKind::Member {
                            object: Box::new(expr),
                            prop: MemberProp::Ident(name),
                            optional: false,
                        },
                        loc,
                    );
                }
                Some(Token::OptionalDot) => {
                    self.pos += 1;
                    match self.peek() {
                        Some(Token::LParen) => {
                            let args = self.parse_args()?;
                            expr = Expr::at(
                                ExprKind::Call {
                                    callee: Box::new(expr),
                                    args,
                                    optional: true,
                                },
                                loc,
                            );
                        }
                        Some(Token::LBracket) => {
                            self.pos += 1;
                            let no_in = std::mem::replace(&mut self.no_in, false);
                            let prop = self.parse_expression();
                            self.no_in = no_in;
                            expr = Expr::at(
                                ExprKind::Member {
                                    object: Box::new(expr),
                                    prop: MemberProp::Computed(Box::new(prop?)),
                                    optional: true,
                                },
                                loc,
                            );
                            self.expect_token(Token::RBracket)?;
                        }
                        _ => {
                            let name = self.ident_name()?;
                            expr = Expr::at(
                                ExprKind::Member {
                                    object: Box::new(expr),
                                    prop: MemberProp::Ident(name),
                                    optional: true,
                                },
                                loc,
                            );
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let no_in = std::mem::replace(&mut self.no_in, false);
                    let prop = self.parse_expression();
                    self.no_in = no_in;
                    expr = Expr::at(
                        ExprKind::Member {
                            object: Box::new(expr),
                            prop: MemberProp::Computed(Box::new(prop?)),
                            optional: false,
                        },
                        loc,
                    );
                    self.expect_token(Token::RBracket)?;
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    expr = Expr::at(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        loc,
                    );
                }
                Some(Token::Template(_)) => {
                    bail!(self.err("Tagged template literals are not supported"))
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr> {
        let loc = self.loc_here();
        self.expect_token(Token::New)?;
        if self.at(&Token::Dot) {
            bail!(self.err("new.target is not supported"));
        }
        let mut callee = if self.at(&Token::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // member-only tail; a call ends the callee
        loop {
            let callee_loc = callee.loc.clone();
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = self.ident_name()?;
                    callee = Expr::at(
                        ExprKind::Member {
                            object: Box::new(callee),
                            prop: MemberProp::Ident(name),
                            optional: false,
                        },
                        callee_loc,
                    );
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let no_in = std::mem::replace(&mut self.no_in, false);
                    let prop = self.parse_expression();
                    self.no_in = no_in;
                    callee = Expr::at(
                        ExprKind::Member {
                            object: Box::new(callee),
                            prop: MemberProp::Computed(Box::new(prop?)),
                            optional: false,
                        },
                        callee_loc,
                    );
                    self.expect_token(Token::RBracket)?;
                }
                _ => break,
            }
        }
        let args = if self.at(&Token::LParen) { self.parse_args()? } else { Vec::new() };
        Ok(Expr::at(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            loc,
        ))
    }

    pub(crate) fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect_token(Token::LParen)?;
        let no_in = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_args_inner();
        self.no_in = no_in;
        result
    }

    fn parse_args_inner(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.at(&Token::RParen) {
            let loc = self.loc_here();
            if self.eat(&Token::Ellipsis) {
                let arg = self.parse_assign()?;
                args.push(Expr::at(ExprKind::Spread(Box::new(arg)), loc));
            } else {
                args.push(self.parse_assign()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let loc = self.loc_here();
        let kind = match self.peek() {
            Some(Token::Num(n)) => {
                let n = *n;
                self.pos += 1;
                ExprKind::Num(n)
            }
            Some(Token::Str(value)) => {
                let value = value.clone();
                self.pos += 1;
                ExprKind::Str(value)
            }
            Some(Token::Template(raw)) => {
                let raw = raw.clone();
                self.pos += 1;
                ExprKind::Template(raw)
            }
            Some(Token::Regex(raw)) => {
                let raw = raw.clone();
                self.pos += 1;
                ExprKind::Regex(raw)
            }
            Some(Token::True) => {
                self.pos += 1;
                ExprKind::Bool(true)
            }
            Some(Token::False) => {
                self.pos += 1;
                ExprKind::Bool(false)
            }
            Some(Token::Null) => {
                self.pos += 1;
                ExprKind::Null
            }
            Some(Token::This) => {
                self.pos += 1;
                ExprKind::This
            }
            Some(Token::Super) => {
                self.pos += 1;
                ExprKind::Super
            }
            Some(Token::Id(name)) => {
                let name = name.clone();
                self.pos += 1;
                ExprKind::Ident(name)
            }
            Some(Token::Async) => {
                if self.peek_at(1) == Some(&Token::Function) {
                    self.pos += 1;
                    ExprKind::Function(self.parse_function(true, false)?)
                } else {
                    // plain identifier named `async`
                    self.pos += 1;
                    ExprKind::Ident("async".to_string())
                }
            }
            Some(Token::Function) => ExprKind::Function(self.parse_function(false, false)?),
            Some(Token::Class) => ExprKind::ClassExpr(self.parse_class(false)?),
            Some(Token::LParen) => {
                self.pos += 1;
                let no_in = std::mem::replace(&mut self.no_in, false);
                let inner = self.parse_expression();
                self.no_in = no_in;
                let inner = inner?;
                self.expect_token(Token::RParen)?;
                return Ok(inner);
            }
            Some(Token::LBracket) => self.parse_array()?,
            Some(Token::LBrace) => self.parse_object()?,
            Some(_) => bail!(self.err("Unexpected token in expression")),
            None => bail!(self.err("Unexpected end of input in expression")),
        };
        Ok(Expr::at(kind, loc))
    }

    fn parse_array(&mut self) -> Result<ExprKind> {
        self.expect_token(Token::LBracket)?;
        let no_in = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_array_inner();
        self.no_in = no_in;
        result
    }

    fn parse_array_inner(&mut self) -> Result<ExprKind> {
        let mut elems = Vec::new();
        loop {
            if self.at(&Token::RBracket) {
                break;
            }
            if self.at(&Token::Comma) {
                self.pos += 1;
                elems.push(None); // elision hole
                continue;
            }
            let loc = self.loc_here();
            let elem = if self.eat(&Token::Ellipsis) {
                Expr::at(ExprKind::Spread(Box::new(self.parse_assign()?)), loc)
            } else {
                self.parse_assign()?
            };
            elems.push(Some(elem));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RBracket)?;
        Ok(ExprKind::Array(elems))
    }

    fn parse_object(&mut self) -> Result<ExprKind> {
        self.expect_token(Token::LBrace)?;
        let no_in = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_object_inner();
        self.no_in = no_in;
        result
    }

    fn parse_object_inner(&mut self) -> Result<ExprKind> {
        let mut props = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.eat(&Token::Ellipsis) {
                props.push(Prop::Spread(self.parse_assign()?));
            } else {
                props.push(self.parse_prop()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RBrace)?;
        Ok(ExprKind::Object(props))
    }

    fn parse_prop(&mut self) -> Result<Prop> {
        let key_follows = |tok: Option<&Token>| !matches!(tok, Some(Token::Colon | Token::Comma | Token::RBrace | Token::LParen) | None);

        let mut is_async = false;
        if self.at(&Token::Async) && key_follows(self.peek_at(1)) {
            is_async = true;
            self.pos += 1;
        }
        let is_generator = self.eat(&Token::Mul);

        if !is_async && !is_generator {
            let accessor = match self.peek() {
                Some(Token::Id(id)) if id == "get" => Some(MethodKind::Get),
                Some(Token::Id(id)) if id == "set" => Some(MethodKind::Set),
                _ => None,
            };
            if let Some(kind) = accessor
                && key_follows(self.peek_at(1))
            {
                self.pos += 1;
                let key = self.parse_prop_key()?;
                let function = self.parse_method_function(false, false)?;
                return Ok(Prop::Method { key, kind, function });
            }
        }

        let key = self.parse_prop_key()?;
        if is_async || is_generator || self.at(&Token::LParen) {
            let function = self.parse_method_function(is_async, is_generator)?;
            return Ok(Prop::Method {
                key,
                kind: MethodKind::Method,
                function,
            });
        }
        if self.eat(&Token::Colon) {
            let value = self.parse_assign()?;
            return Ok(Prop::KeyValue { key, value });
        }
        match key {
            PropKey::Ident(name) => {
                if self.at(&Token::Assign) {
                    bail!(self.err("Destructuring object patterns are not supported"));
                }
                Ok(Prop::Shorthand(name))
            }
            _ => bail!(self.err("Expected ':' after property key")),
        }
    }

    fn parse_method_function(&mut self, is_async: bool, is_generator: bool) -> Result<Function> {
        let params = self.parse_params()?;
        self.expect_token(Token::LBrace)?;
        let body = self.parse_statement_list(&Token::RBrace)?;
        self.expect_token(Token::RBrace)?;
        Ok(Function {
            name: None,
            params,
            body,
            is_async,
            is_generator,
        })
    }

    fn parse_arrow(&mut self, is_async: bool) -> Result<Expr> {
        let loc = self.loc_here();
        let params = if let Some(Token::Id(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            vec![Param {
                name,
                default: None,
                rest: false,
            }]
        } else {
            self.parse_params()?
        };
        self.expect_token(Token::Arrow)?;

        let no_in = std::mem::replace(&mut self.no_in, false);
        let body = if self.at(&Token::LBrace) {
            self.pos += 1;
            let stmts = self.parse_statement_list(&Token::RBrace);
            let end = stmts.and_then(|stmts| {
                self.expect_token(Token::RBrace)?;
                Ok(stmts)
            });
            end.map(ArrowBody::Block)
        } else {
            self.parse_assign().map(|e| ArrowBody::Expr(Box::new(e)))
        };
        self.no_in = no_in;

        Ok(Expr::at(
            ExprKind::Arrow(Arrow {
                params,
                body: body?,
                is_async,
            }),
            loc,
        ))
    }

    /// Look ahead from a `(` to see whether its matching `)` is followed by
    /// `=>`, which makes it an arrow parameter list.
    fn is_arrow_ahead(&self, start: usize) -> bool {
        if self.tokens.get(start) != Some(&Token::LParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut i = start;
        while i < self.len {
            match &self.tokens[i] {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.tokens.get(i + 1) == Some(&Token::Arrow);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }
}

/// Binary operator levels from loosest to tightest; each row is left
/// associative.
const BIN_LEVELS: &[&[(Token, BinOp)]] = &[
    &[(Token::BitOr, BinOp::BitOr)],
    &[(Token::BitXor, BinOp::BitXor)],
    &[(Token::BitAnd, BinOp::BitAnd)],
    &[
        (Token::StrictEq, BinOp::StrictEq),
        (Token::StrictNe, BinOp::StrictNe),
        (Token::Eq, BinOp::Eq),
        (Token::Ne, BinOp::Ne),
    ],
    &[
        (Token::Le, BinOp::Le),
        (Token::Ge, BinOp::Ge),
        (Token::Lt, BinOp::Lt),
        (Token::Gt, BinOp::Gt),
        (Token::In, BinOp::In),
        (Token::Instanceof, BinOp::Instanceof),
    ],
    &[
        (Token::UShr, BinOp::UShr),
        (Token::Shl, BinOp::Shl),
        (Token::Shr, BinOp::Shr),
    ],
    &[(Token::Add, BinOp::Add), (Token::Sub, BinOp::Sub)],
    &[
        (Token::Mul, BinOp::Mul),
        (Token::Div, BinOp::Div),
        (Token::Mod, BinOp::Mod),
    ],
];
