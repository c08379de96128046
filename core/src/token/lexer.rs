use crate::token::{Position, Span};
use anyhow::{Result, anyhow, bail};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,      // (
    RParen,      // )
    LBrace,      // {
    RBrace,      // }
    LBracket,    // [
    RBracket,    // ]
    Semicolon,   // ;
    Comma,       // ,
    Dot,         // .
    Ellipsis,    // ...
    Colon,       // :
    Question,    // ?
    OptionalDot, // ?.
    Arrow,       // =>
    Assign,      // =
    Add,         // +
    Sub,         // -
    Mul,         // *
    Div,         // /
    Mod,         // %
    Exp,         // **
    Inc,         // ++
    Dec,         // --
    BitAnd,      // &
    BitOr,       // |
    BitXor,      // ^
    BitNot,      // ~
    Shl,         // <<
    Shr,         // >>
    UShr,        // >>>
    And,         // &&
    Or,          // ||
    Nullish,     // ??
    Not,         // !
    Eq,          // ==
    Ne,          // !=
    StrictEq,    // ===
    StrictNe,    // !==
    Gt,          // >
    Lt,          // <
    Ge,          // >=
    Le,          // <=
    AddAssign,     // +=
    SubAssign,     // -=
    MulAssign,     // *=
    DivAssign,     // /=
    ModAssign,     // %=
    ExpAssign,     // **=
    ShlAssign,     // <<=
    ShrAssign,     // >>=
    UShrAssign,    // >>>=
    BitAndAssign,  // &=
    BitOrAssign,   // |=
    BitXorAssign,  // ^=
    AndAssign,     // &&=
    OrAssign,      // ||=
    NullishAssign, // ??=
    // Keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    New,
    Delete,
    Typeof,
    Instanceof,
    In,
    Void,
    This,
    Null,
    True,
    False,
    Throw,
    Try,
    Catch,
    Finally,
    Class,
    Extends,
    Super,
    Yield,
    Async,
    Await,
    Debugger,
    // Literals
    Num(f64),
    Str(String),      // cooked value, quotes stripped, escapes resolved
    Template(String), // raw text including backticks and substitutions
    Regex(String),    // raw text including slashes and flags
    Id(String),
}

/// Tokenizer output: tokens plus per-token spans and a flag telling whether a
/// line terminator occurred before the token (needed for semicolon insertion
/// and the restricted productions of return/break/continue).
#[derive(Debug)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    pub spans: Vec<Span>,
    pub newline_before: Vec<bool>,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

fn keyword(word: &str) -> Option<Token> {
    let tok = match word {
        "var" => Token::Var,
        "let" => Token::Let,
        "const" => Token::Const,
        "function" => Token::Function,
        "return" => Token::Return,
        "if" => Token::If,
        "else" => Token::Else,
        "for" => Token::For,
        "while" => Token::While,
        "do" => Token::Do,
        "switch" => Token::Switch,
        "case" => Token::Case,
        "default" => Token::Default,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "new" => Token::New,
        "delete" => Token::Delete,
        "typeof" => Token::Typeof,
        "instanceof" => Token::Instanceof,
        "in" => Token::In,
        "void" => Token::Void,
        "this" => Token::This,
        "null" => Token::Null,
        "true" => Token::True,
        "false" => Token::False,
        "throw" => Token::Throw,
        "try" => Token::Try,
        "catch" => Token::Catch,
        "finally" => Token::Finally,
        "class" => Token::Class,
        "extends" => Token::Extends,
        "super" => Token::Super,
        "yield" => Token::Yield,
        "async" => Token::Async,
        "await" => Token::Await,
        "debugger" => Token::Debugger,
        _ => return None,
    };
    Some(tok)
}

/// A `/` starts a regex literal when the previous token cannot end an
/// expression. After `)` `]` `}` and postfix `++`/`--` it is division.
fn regex_allowed(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => !matches!(
            t,
            Token::Id(_)
                | Token::Num(_)
                | Token::Str(_)
                | Token::Template(_)
                | Token::Regex(_)
                | Token::This
                | Token::Null
                | Token::True
                | Token::False
                | Token::Super
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
                | Token::Inc
                | Token::Dec
        ),
    }
}

/// [chars] and [idx] can be used for syntax error reporting.
pub struct Tokenizer<'a> {
    chars: Vec<char>,
    idx: usize,
    len: usize,
    tokens: Vec<Token>,
    spans: Vec<Span>,
    newline_before: Vec<bool>,
    newline_pending: bool,
    line: u32,
    column: u32,
    input: &'a str,
}

impl<'a> Tokenizer<'a> {
    pub fn tokenize(s: &str) -> Result<TokenStream> {
        let chars: Vec<char> = s.chars().collect();
        let mut t = Tokenizer {
            len: chars.len(),
            chars,
            idx: 0,
            tokens: Vec::with_capacity(s.len() / 4),
            spans: Vec::with_capacity(s.len() / 4),
            newline_before: Vec::with_capacity(s.len() / 4),
            newline_pending: false,
            line: 1,
            column: 0,
            input: s,
        };
        t.parse()?;
        Ok(TokenStream {
            tokens: t.tokens,
            spans: t.spans,
            newline_before: t.newline_before,
        })
    }

    pub fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.idx)
    }

    fn eof(&self) -> bool {
        self.idx >= self.len
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).copied()
    }

    fn expect(&mut self, s: &str) -> bool {
        let start_idx = self.idx;
        let start_line = self.line;
        let start_column = self.column;

        for c in s.chars() {
            if self.idx >= self.len || self.chars[self.idx] != c {
                self.idx = start_idx;
                self.line = start_line;
                self.column = start_column;
                return false;
            }
            self.advance_char();
        }
        true
    }

    fn err<T: AsRef<str>>(&self, msg: T) -> String {
        let r_idx = (self.idx + 5).min(self.len);
        let l_idx = self.idx.saturating_sub(5);
        let near: String = self.chars[l_idx..r_idx].iter().collect();
        let ctx = if let Some(&c) = self.chars.get(self.idx) {
            format!("'{}' at index {}, near '{}'", c, self.idx, near)
        } else {
            format!("at end, near '{}'", near)
        };

        let line_context = self.get_line_context();
        format!(
            "Syntax error:\n{} ({})\nLine {}: {}",
            msg.as_ref(),
            ctx,
            self.line,
            line_context
        )
    }

    fn get_line_context(&self) -> String {
        let target = (self.line as usize).saturating_sub(1);
        self.input
            .lines()
            .nth(target)
            .map(|line| line.to_string())
            .unwrap_or_default()
    }

    fn advance_char(&mut self) {
        if !self.eof() && self.chars[self.idx] == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.idx += 1;
    }

    fn push(&mut self, tok: Token, start: Position) {
        let end = self.current_position();
        self.tokens.push(tok);
        self.spans.push(Span::new(start, end));
        self.newline_before.push(self.newline_pending);
        self.newline_pending = false;
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while !self.eof() && self.chars[self.idx].is_whitespace() {
                if matches!(self.chars[self.idx], '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                    self.newline_pending = true;
                }
                self.advance_char();
            }
            if self.expect("//") {
                while !self.eof() && self.chars[self.idx] != '\n' {
                    self.advance_char();
                }
                continue;
            }
            if self.chars.get(self.idx) == Some(&'/') && self.peek(1) == Some('*') {
                self.advance_char();
                self.advance_char();
                loop {
                    if self.eof() {
                        bail!(self.err("Block comment not closed"));
                    }
                    if self.chars[self.idx] == '\n' {
                        self.newline_pending = true;
                    }
                    if self.expect("*/") {
                        break;
                    }
                    self.advance_char();
                }
                continue;
            }
            return Ok(());
        }
    }

    fn parse(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.eof() {
                return Ok(());
            }
            let start = self.current_position();
            let c = self.chars[self.idx];

            if is_ident_start(c) {
                self.parse_ident(start);
                continue;
            }
            if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
                self.parse_number(start)?;
                continue;
            }
            match c {
                '\'' | '"' => self.parse_str(start)?,
                '`' => self.parse_template(start)?,
                '/' => {
                    if regex_allowed(self.tokens.last()) {
                        self.parse_regex(start)?;
                    } else if self.expect("/=") {
                        self.push(Token::DivAssign, start);
                    } else {
                        self.advance_char();
                        self.push(Token::Div, start);
                    }
                }
                _ => self.parse_operator(start)?,
            }
        }
    }

    fn parse_ident(&mut self, start: Position) {
        let mut word = String::new();
        while !self.eof() && is_ident_continue(self.chars[self.idx]) {
            word.push(self.chars[self.idx]);
            self.advance_char();
        }
        match keyword(&word) {
            Some(tok) => self.push(tok, start),
            None => self.push(Token::Id(word), start),
        }
    }

    fn parse_number(&mut self, start: Position) -> Result<()> {
        let value: f64;
        if self.expect("0x") || self.expect("0X") {
            value = self.parse_radix_digits(16)?;
        } else if self.expect("0o") || self.expect("0O") {
            value = self.parse_radix_digits(8)?;
        } else if self.expect("0b") || self.expect("0B") {
            value = self.parse_radix_digits(2)?;
        } else {
            let mut text = String::new();
            while !self.eof() && (self.chars[self.idx].is_ascii_digit() || self.chars[self.idx] == '_') {
                if self.chars[self.idx] != '_' {
                    text.push(self.chars[self.idx]);
                }
                self.advance_char();
            }
            if !self.eof() && self.chars[self.idx] == '.' && self.peek(1) != Some('.') {
                text.push('.');
                self.advance_char();
                while !self.eof() && (self.chars[self.idx].is_ascii_digit() || self.chars[self.idx] == '_') {
                    if self.chars[self.idx] != '_' {
                        text.push(self.chars[self.idx]);
                    }
                    self.advance_char();
                }
            }
            if !self.eof() && matches!(self.chars[self.idx], 'e' | 'E') {
                text.push('e');
                self.advance_char();
                if !self.eof() && matches!(self.chars[self.idx], '+' | '-') {
                    text.push(self.chars[self.idx]);
                    self.advance_char();
                }
                if self.eof() || !self.chars[self.idx].is_ascii_digit() {
                    bail!(self.err("Expected exponent digits"));
                }
                while !self.eof() && self.chars[self.idx].is_ascii_digit() {
                    text.push(self.chars[self.idx]);
                    self.advance_char();
                }
            }
            value = text
                .parse::<f64>()
                .map_err(|_| anyhow!(self.err("Invalid number literal")))?;
        }
        if !self.eof() && self.chars[self.idx] == 'n' {
            bail!(self.err("BigInt literals are not supported"));
        }
        self.push(Token::Num(value), start);
        Ok(())
    }

    fn parse_radix_digits(&mut self, radix: u32) -> Result<f64> {
        let mut value = 0f64;
        let mut any = false;
        while !self.eof() {
            let c = self.chars[self.idx];
            if c == '_' {
                self.advance_char();
                continue;
            }
            match c.to_digit(radix) {
                Some(d) => {
                    value = value * radix as f64 + d as f64;
                    any = true;
                    self.advance_char();
                }
                None => break,
            }
        }
        if !any {
            bail!(self.err("Expected digits after radix prefix"));
        }
        Ok(value)
    }

    fn parse_str(&mut self, start: Position) -> Result<()> {
        let quote = self.chars[self.idx];
        self.advance_char();
        let mut content = String::new();

        while !self.eof() {
            let c = self.chars[self.idx];
            if c == quote {
                self.advance_char();
                self.push(Token::Str(content), start);
                return Ok(());
            }
            if c == '\n' {
                bail!(self.err("String not closed before end of line"));
            }
            if c == '\\' {
                self.advance_char();
                if self.eof() {
                    bail!(self.err("Incomplete escape sequence at end of string"));
                }
                let escaped = self.chars[self.idx];
                match escaped {
                    'n' => content.push('\n'),
                    'r' => content.push('\r'),
                    't' => content.push('\t'),
                    'b' => content.push('\u{8}'),
                    'f' => content.push('\u{c}'),
                    'v' => content.push('\u{b}'),
                    '0' if !self.peek(1).is_some_and(|n| n.is_ascii_digit()) => content.push('\0'),
                    'x' => {
                        self.advance_char();
                        let h = self.read_hex_digits(2)?;
                        content.push(char::from_u32(h).ok_or_else(|| anyhow!(self.err("Invalid \\x escape")))?);
                        continue;
                    }
                    'u' => {
                        self.advance_char();
                        let cp = if self.chars.get(self.idx) == Some(&'{') {
                            self.advance_char();
                            let mut v = 0u32;
                            while !self.eof() && self.chars[self.idx] != '}' {
                                let d = self.chars[self.idx]
                                    .to_digit(16)
                                    .ok_or_else(|| anyhow!(self.err("Invalid \\u{...} escape")))?;
                                v = v * 16 + d;
                                self.advance_char();
                            }
                            if !self.expect("}") {
                                bail!(self.err("Unterminated \\u{...} escape"));
                            }
                            v
                        } else {
                            self.read_hex_digits(4)?
                        };
                        // Lone surrogates cannot be held in a Rust String; they do
                        // not occur in code the pipeline round-trips.
                        content.push(char::from_u32(cp).ok_or_else(|| anyhow!(self.err("Invalid \\u escape")))?);
                        continue;
                    }
                    '\n' => {} // line continuation
                    other => content.push(other),
                }
                self.advance_char();
            } else {
                content.push(c);
                self.advance_char();
            }
        }

        bail!(self.err("String not closed"))
    }

    fn read_hex_digits(&mut self, count: usize) -> Result<u32> {
        let mut v = 0u32;
        for _ in 0..count {
            let d = self
                .chars
                .get(self.idx)
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| anyhow!(self.err("Invalid hex escape")))?;
            v = v * 16 + d;
            self.advance_char();
        }
        Ok(v)
    }

    /// Template literals are kept as raw text (backticks included) and treated
    /// as opaque primary expressions by the rest of the pipeline.
    fn parse_template(&mut self, start: Position) -> Result<()> {
        let mut raw = String::new();
        raw.push('`');
        self.advance_char();

        // Nesting stack: each entry is the brace depth of one `${...}`
        // substitution; an empty stack means we are in template text.
        let mut substitutions: Vec<u32> = Vec::new();

        while !self.eof() {
            let c = self.chars[self.idx];
            if substitutions.is_empty() {
                match c {
                    '`' => {
                        raw.push('`');
                        self.advance_char();
                        self.push(Token::Template(raw), start);
                        return Ok(());
                    }
                    '\\' => {
                        raw.push(c);
                        self.advance_char();
                        if self.eof() {
                            bail!(self.err("Incomplete escape in template literal"));
                        }
                        raw.push(self.chars[self.idx]);
                        self.advance_char();
                    }
                    '$' if self.peek(1) == Some('{') => {
                        raw.push_str("${");
                        self.advance_char();
                        self.advance_char();
                        substitutions.push(1);
                    }
                    _ => {
                        raw.push(c);
                        self.advance_char();
                    }
                }
            } else {
                match c {
                    '{' => {
                        *substitutions.last_mut().unwrap() += 1;
                        raw.push(c);
                        self.advance_char();
                    }
                    '}' => {
                        let depth = substitutions.last_mut().unwrap();
                        *depth -= 1;
                        if *depth == 0 {
                            substitutions.pop();
                        }
                        raw.push(c);
                        self.advance_char();
                    }
                    '`' => {
                        // nested template inside the substitution
                        raw.push(c);
                        self.advance_char();
                        self.copy_raw_template_text(&mut raw)?;
                    }
                    '\'' | '"' => {
                        self.copy_raw_string(&mut raw)?;
                    }
                    _ => {
                        raw.push(c);
                        self.advance_char();
                    }
                }
            }
        }

        bail!(self.err("Template literal not closed"))
    }

    /// Copy a nested template's raw text up to its closing backtick. Nested
    /// substitutions are balanced the same way as the outer loop.
    fn copy_raw_template_text(&mut self, raw: &mut String) -> Result<()> {
        let mut substitutions: Vec<u32> = Vec::new();
        while !self.eof() {
            let c = self.chars[self.idx];
            if substitutions.is_empty() {
                match c {
                    '`' => {
                        raw.push('`');
                        self.advance_char();
                        return Ok(());
                    }
                    '\\' => {
                        raw.push(c);
                        self.advance_char();
                        if self.eof() {
                            bail!(self.err("Incomplete escape in template literal"));
                        }
                        raw.push(self.chars[self.idx]);
                        self.advance_char();
                    }
                    '$' if self.peek(1) == Some('{') => {
                        raw.push_str("${");
                        self.advance_char();
                        self.advance_char();
                        substitutions.push(1);
                    }
                    _ => {
                        raw.push(c);
                        self.advance_char();
                    }
                }
            } else {
                match c {
                    '{' => {
                        *substitutions.last_mut().unwrap() += 1;
                        raw.push(c);
                        self.advance_char();
                    }
                    '}' => {
                        let depth = substitutions.last_mut().unwrap();
                        *depth -= 1;
                        if *depth == 0 {
                            substitutions.pop();
                        }
                        raw.push(c);
                        self.advance_char();
                    }
                    '`' => {
                        raw.push(c);
                        self.advance_char();
                        self.copy_raw_template_text(raw)?;
                    }
                    '\'' | '"' => {
                        self.copy_raw_string(raw)?;
                    }
                    _ => {
                        raw.push(c);
                        self.advance_char();
                    }
                }
            }
        }
        bail!(self.err("Template literal not closed"))
    }

    /// Copy a quoted string verbatim (used inside template substitutions,
    /// where a brace in a string must not affect substitution balancing).
    fn copy_raw_string(&mut self, raw: &mut String) -> Result<()> {
        let quote = self.chars[self.idx];
        raw.push(quote);
        self.advance_char();
        while !self.eof() {
            let c = self.chars[self.idx];
            raw.push(c);
            self.advance_char();
            if c == '\\' {
                if self.eof() {
                    break;
                }
                raw.push(self.chars[self.idx]);
                self.advance_char();
            } else if c == quote {
                return Ok(());
            }
        }
        bail!(self.err("String not closed"))
    }

    fn parse_regex(&mut self, start: Position) -> Result<()> {
        let mut raw = String::new();
        raw.push('/');
        self.advance_char();

        let mut in_class = false;
        loop {
            if self.eof() {
                bail!(self.err("Regex literal not closed"));
            }
            let c = self.chars[self.idx];
            if c == '\n' {
                bail!(self.err("Regex literal not closed before end of line"));
            }
            raw.push(c);
            self.advance_char();
            match c {
                '\\' => {
                    if self.eof() {
                        bail!(self.err("Incomplete escape in regex literal"));
                    }
                    raw.push(self.chars[self.idx]);
                    self.advance_char();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        while !self.eof() && is_ident_continue(self.chars[self.idx]) {
            raw.push(self.chars[self.idx]);
            self.advance_char();
        }
        self.push(Token::Regex(raw), start);
        Ok(())
    }

    fn parse_operator(&mut self, start: Position) -> Result<()> {
        // Longest match first within each leading character.
        let table: &[(&str, Token)] = &[
            (">>>=", Token::UShrAssign),
            (">>>", Token::UShr),
            (">>=", Token::ShrAssign),
            (">>", Token::Shr),
            (">=", Token::Ge),
            (">", Token::Gt),
            ("<<=", Token::ShlAssign),
            ("<<", Token::Shl),
            ("<=", Token::Le),
            ("<", Token::Lt),
            ("===", Token::StrictEq),
            ("==", Token::Eq),
            ("=>", Token::Arrow),
            ("=", Token::Assign),
            ("!==", Token::StrictNe),
            ("!=", Token::Ne),
            ("!", Token::Not),
            ("&&=", Token::AndAssign),
            ("&&", Token::And),
            ("&=", Token::BitAndAssign),
            ("&", Token::BitAnd),
            ("||=", Token::OrAssign),
            ("||", Token::Or),
            ("|=", Token::BitOrAssign),
            ("|", Token::BitOr),
            ("??=", Token::NullishAssign),
            ("??", Token::Nullish),
            ("?", Token::Question), // `?.` handled below to keep `a?.5:b` parsing
            ("**=", Token::ExpAssign),
            ("**", Token::Exp),
            ("*=", Token::MulAssign),
            ("*", Token::Mul),
            ("++", Token::Inc),
            ("+=", Token::AddAssign),
            ("+", Token::Add),
            ("--", Token::Dec),
            ("-=", Token::SubAssign),
            ("-", Token::Sub),
            ("%=", Token::ModAssign),
            ("%", Token::Mod),
            ("^=", Token::BitXorAssign),
            ("^", Token::BitXor),
            ("~", Token::BitNot),
            ("...", Token::Ellipsis),
            (".", Token::Dot),
            ("(", Token::LParen),
            (")", Token::RParen),
            ("{", Token::LBrace),
            ("}", Token::RBrace),
            ("[", Token::LBracket),
            ("]", Token::RBracket),
            (";", Token::Semicolon),
            (",", Token::Comma),
            (":", Token::Colon),
        ];

        if self.chars[self.idx] == '?'
            && self.peek(1) == Some('.')
            && !self.peek(2).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance_char();
            self.advance_char();
            self.push(Token::OptionalDot, start);
            return Ok(());
        }

        for (text, tok) in table {
            if self.expect(text) {
                self.push(tok.clone(), start);
                return Ok(());
            }
        }
        bail!(self.err("Unexpected character"))
    }
}
