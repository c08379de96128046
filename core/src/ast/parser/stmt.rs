use super::Parser;
use crate::ast::{
    CatchClause, Class, ClassMember, DeclKind, Declarator, Expr, ExprKind, ForHead, ForInit, Function, MethodKind,
    Param, PropKey, Stmt, StmtKind, SwitchCase,
};
use crate::token::Token;
use anyhow::{Result, anyhow, bail};

impl<'a> Parser<'a> {
    pub fn parse_statement(&mut self) -> Result<Stmt> {
        let loc = self.loc_here();
        let stmt = match self.peek() {
            Some(Token::LBrace) => {
                self.pos += 1;
                let stmts = self.parse_statement_list(&Token::RBrace)?;
                self.expect_token(Token::RBrace)?;
                StmtKind::Block(stmts)
            }
            Some(Token::Var) => self.parse_var_decl(DeclKind::Var)?,
            Some(Token::Let) => self.parse_var_decl(DeclKind::Let)?,
            Some(Token::Const) => self.parse_var_decl(DeclKind::Const)?,
            Some(Token::Function) => {
                let function = self.parse_function(false, true)?;
                StmtKind::FuncDecl(function)
            }
            Some(Token::Async) if self.peek_at(1) == Some(&Token::Function) => {
                self.pos += 1;
                let function = self.parse_function(true, true)?;
                StmtKind::FuncDecl(function)
            }
            Some(Token::Class) => StmtKind::ClassDecl(self.parse_class(true)?),
            Some(Token::Return) => {
                self.pos += 1;
                let value = if self.eof()
                    || self.at(&Token::Semicolon)
                    || self.at(&Token::RBrace)
                    || self.has_newline_before()
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(value)
            }
            Some(Token::If) => self.parse_if_stmt()?,
            Some(Token::For) => self.parse_for_stmt()?,
            Some(Token::While) => {
                self.pos += 1;
                self.expect_token(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect_token(Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { test, body }
            }
            Some(Token::Do) => {
                self.pos += 1;
                let body = Box::new(self.parse_statement()?);
                self.expect_token(Token::While)?;
                self.expect_token(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect_token(Token::RParen)?;
                // the trailing semicolon after do..while is optional everywhere
                self.eat(&Token::Semicolon);
                StmtKind::DoWhile { body, test }
            }
            Some(Token::Switch) => self.parse_switch_stmt()?,
            Some(Token::Break) => {
                self.pos += 1;
                let label = self.parse_jump_label()?;
                self.consume_semicolon()?;
                StmtKind::Break(label)
            }
            Some(Token::Continue) => {
                self.pos += 1;
                let label = self.parse_jump_label()?;
                self.consume_semicolon()?;
                StmtKind::Continue(label)
            }
            Some(Token::Throw) => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Throw(expr)
            }
            Some(Token::Try) => self.parse_try_stmt()?,
            Some(Token::Semicolon) => {
                self.pos += 1;
                StmtKind::Empty
            }
            Some(Token::Debugger) => {
                self.pos += 1;
                self.consume_semicolon()?;
                StmtKind::Debugger
            }
            Some(Token::Id(name)) if self.peek_at(1) == Some(&Token::Colon) => {
                let label = name.clone();
                self.pos += 2;
                let body = Box::new(self.parse_statement()?);
                StmtKind::Labeled { label, body }
            }
            Some(Token::Id(name)) if name == "import" || name == "export" => {
                bail!(self.err("Module syntax (import/export) is not supported"))
            }
            Some(Token::Id(name)) if name == "with" && self.peek_at(1) == Some(&Token::LParen) => {
                bail!(self.err("'with' statements are not supported"))
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                StmtKind::Expr(expr)
            }
            None => bail!(self.err("Unexpected end of input")),
        };
        Ok(Stmt::at(stmt, loc))
    }

    fn parse_jump_label(&mut self) -> Result<Option<String>> {
        if self.has_newline_before() {
            return Ok(None);
        }
        if let Some(Token::Id(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            return Ok(Some(name));
        }
        Ok(None)
    }

    fn parse_var_decl(&mut self, kind: DeclKind) -> Result<StmtKind> {
        self.pos += 1; // var/let/const
        let decls = self.parse_declarators()?;
        self.consume_semicolon()?;
        Ok(StmtKind::VarDecl { kind, decls })
    }

    fn parse_declarators(&mut self) -> Result<Vec<Declarator>> {
        let mut decls = Vec::new();
        loop {
            let name = self.binding_ident()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_assign()?)
            } else {
                None
            };
            decls.push(Declarator { name, init });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(decls)
    }

    fn parse_if_stmt(&mut self) -> Result<StmtKind> {
        self.expect_token(Token::If)?;
        self.expect_token(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect_token(Token::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for_stmt(&mut self) -> Result<StmtKind> {
        self.expect_token(Token::For)?;
        self.expect_token(Token::LParen)?;

        // empty init
        if self.eat(&Token::Semicolon) {
            return self.parse_for_tail(None);
        }

        if matches!(self.peek(), Some(Token::Var | Token::Let | Token::Const)) {
            let kind = match self.peek() {
                Some(Token::Var) => DeclKind::Var,
                Some(Token::Let) => DeclKind::Let,
                _ => DeclKind::Const,
            };
            self.pos += 1;
            let name = self.binding_ident()?;

            if self.eat(&Token::In) {
                return self.parse_for_in_tail(ForHead::VarDecl { kind, name }, false);
            }
            if matches!(self.peek(), Some(Token::Id(id)) if id == "of") {
                self.pos += 1;
                return self.parse_for_in_tail(ForHead::VarDecl { kind, name }, true);
            }

            // classic for with declarations; finish the first declarator
            let init = if self.eat(&Token::Assign) {
                self.no_in = true;
                let e = self.parse_assign();
                self.no_in = false;
                Some(e?)
            } else {
                None
            };
            let mut decls = vec![Declarator { name, init }];
            if self.eat(&Token::Comma) {
                self.no_in = true;
                let rest = self.parse_declarators();
                self.no_in = false;
                decls.extend(rest?);
            }
            self.expect_token(Token::Semicolon)?;
            return self.parse_for_tail(Some(ForInit::VarDecl { kind, decls }));
        }

        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;

        if self.eat(&Token::In) {
            let head = self.for_target(init)?;
            return self.parse_for_in_tail(head, false);
        }
        if matches!(self.peek(), Some(Token::Id(id)) if id == "of") {
            self.pos += 1;
            let head = self.for_target(init)?;
            return self.parse_for_in_tail(head, true);
        }

        self.expect_token(Token::Semicolon)?;
        self.parse_for_tail(Some(ForInit::Expr(init)))
    }

    fn for_target(&self, expr: Expr) -> Result<ForHead> {
        match &expr.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } => Ok(ForHead::Pattern(expr)),
            _ => Err(anyhow!(self.err("Unsupported for-in/of target"))),
        }
    }

    fn parse_for_tail(&mut self, init: Option<ForInit>) -> Result<StmtKind> {
        let test = if self.at(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(Token::Semicolon)?;
        let update = if self.at(&Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(Token::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_for_in_tail(&mut self, left: ForHead, of: bool) -> Result<StmtKind> {
        let right = if of { self.parse_assign()? } else { self.parse_expression()? };
        self.expect_token(Token::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::ForIn { left, right, body, of })
    }

    fn parse_switch_stmt(&mut self) -> Result<StmtKind> {
        self.expect_token(Token::Switch)?;
        self.expect_token(Token::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_token(Token::RParen)?;
        self.expect_token(Token::LBrace)?;

        let mut cases = Vec::new();
        while !self.eof() && !self.at(&Token::RBrace) {
            let loc = self.loc_here();
            let test = if self.eat(&Token::Case) {
                Some(self.parse_expression()?)
            } else {
                self.expect_token(Token::Default)?;
                None
            };
            self.expect_token(Token::Colon)?;
            let mut body = Vec::new();
            while !self.eof()
                && !self.at(&Token::Case)
                && !self.at(&Token::Default)
                && !self.at(&Token::RBrace)
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body, loc });
        }
        self.expect_token(Token::RBrace)?;
        Ok(StmtKind::Switch { discriminant, cases })
    }

    fn parse_try_stmt(&mut self) -> Result<StmtKind> {
        self.expect_token(Token::Try)?;
        self.expect_token(Token::LBrace)?;
        let block = self.parse_statement_list(&Token::RBrace)?;
        self.expect_token(Token::RBrace)?;

        let handler = if self.eat(&Token::Catch) {
            let param = if self.eat(&Token::LParen) {
                let name = self.binding_ident()?;
                self.expect_token(Token::RParen)?;
                Some(name)
            } else {
                None
            };
            self.expect_token(Token::LBrace)?;
            let body = self.parse_statement_list(&Token::RBrace)?;
            self.expect_token(Token::RBrace)?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat(&Token::Finally) {
            self.expect_token(Token::LBrace)?;
            let body = self.parse_statement_list(&Token::RBrace)?;
            self.expect_token(Token::RBrace)?;
            Some(body)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            bail!(self.err("Expected catch or finally after try"));
        }
        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    /// Parse a function after any `async` prefix was consumed.
    /// `named` requires a name (declarations); expressions may omit it.
    pub(crate) fn parse_function(&mut self, is_async: bool, named: bool) -> Result<Function> {
        self.expect_token(Token::Function)?;
        let is_generator = self.eat(&Token::Mul);
        let name = if let Some(Token::Id(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            Some(name)
        } else if named {
            bail!(self.err("Expected function name"));
        } else {
            None
        };
        let params = self.parse_params()?;
        self.expect_token(Token::LBrace)?;
        let body = self.parse_statement_list(&Token::RBrace)?;
        self.expect_token(Token::RBrace)?;
        Ok(Function {
            name,
            params,
            body,
            is_async,
            is_generator,
        })
    }

    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.expect_token(Token::LParen)?;
        let mut params = Vec::new();
        while !self.at(&Token::RParen) {
            let rest = self.eat(&Token::Ellipsis);
            let name = self.binding_ident()?;
            let default = if !rest && self.eat(&Token::Assign) {
                Some(self.parse_assign()?)
            } else {
                None
            };
            params.push(Param { name, default, rest });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RParen)?;
        Ok(params)
    }

    pub(crate) fn parse_class(&mut self, named: bool) -> Result<Class> {
        self.expect_token(Token::Class)?;
        let name = if let Some(Token::Id(name)) = self.peek() {
            let name = name.clone();
            self.pos += 1;
            Some(name)
        } else if named {
            bail!(self.err("Expected class name"));
        } else {
            None
        };
        let superclass = if self.eat(&Token::Extends) {
            Some(Box::new(self.parse_lhs()?))
        } else {
            None
        };
        self.expect_token(Token::LBrace)?;

        let mut members = Vec::new();
        while !self.eof() && !self.at(&Token::RBrace) {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect_token(Token::RBrace)?;
        Ok(Class {
            name,
            superclass,
            members,
        })
    }

    fn parse_class_member(&mut self) -> Result<ClassMember> {
        let is_static = matches!(self.peek(), Some(Token::Id(id)) if id == "static")
            && !matches!(self.peek_at(1), Some(Token::LParen | Token::Assign));
        if is_static {
            self.pos += 1;
        }

        let mut is_async = false;
        let mut is_generator = false;
        let mut kind = MethodKind::Method;

        if self.at(&Token::Async) && !matches!(self.peek_at(1), Some(Token::LParen | Token::Assign)) {
            is_async = true;
            self.pos += 1;
        }
        if self.eat(&Token::Mul) {
            is_generator = true;
        }
        if !is_async && !is_generator {
            let accessor = match self.peek() {
                Some(Token::Id(id)) if id == "get" => Some(MethodKind::Get),
                Some(Token::Id(id)) if id == "set" => Some(MethodKind::Set),
                _ => None,
            };
            if let Some(accessor) = accessor
                && !matches!(self.peek_at(1), Some(Token::LParen | Token::Assign))
            {
                kind = accessor;
                self.pos += 1;
            }
        }

        let key = self.parse_prop_key()?;
        if self.at(&Token::Assign) || !self.at(&Token::LParen) {
            bail!(self.err("Class fields are not supported"));
        }
        let params = self.parse_params()?;
        self.expect_token(Token::LBrace)?;
        let body = self.parse_statement_list(&Token::RBrace)?;
        self.expect_token(Token::RBrace)?;

        Ok(ClassMember {
            key,
            kind,
            is_static,
            function: Function {
                name: None,
                params,
                body,
                is_async,
                is_generator,
            },
        })
    }

    pub(crate) fn parse_prop_key(&mut self) -> Result<PropKey> {
        match self.peek() {
            Some(Token::Str(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(PropKey::Str(value))
            }
            Some(Token::Num(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(PropKey::Num(n))
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let expr = self.parse_assign()?;
                self.expect_token(Token::RBracket)?;
                Ok(PropKey::Computed(expr))
            }
            _ => Ok(PropKey::Ident(self.ident_name()?)),
        }
    }
}
