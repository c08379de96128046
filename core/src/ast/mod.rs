mod display;
mod nodes;
pub mod parser;


pub use display::*;
pub use nodes::*;
pub use parser::Parser;

use crate::token::Tokenizer;
use anyhow::{Result, anyhow};

/// Parse JavaScript source into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    let stream = Tokenizer::tokenize(source)?;
    Parser::new(&stream).parse_program()
}

/// Parse a source string that holds exactly one expression statement and
/// return the expression.
pub fn parse_expression(source: &str) -> Result<Expr> {
    let program = parse(source)?;
    let mut body = program.body;
    if body.len() != 1 {
        return Err(anyhow!("expected a single expression, got {} statements", body.len()));
    }
    match body.pop().map(|s| s.kind) {
        Some(StmtKind::Expr(expr)) => Ok(expr),
        _ => Err(anyhow!("expected an expression statement")),
    }
}
