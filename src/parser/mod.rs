//! Parser module for Tern.

mod core;
mod declarations;
mod expressions;
mod precedence;
mod statements;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::Parser;

use crate::ast::Program;
use crate::error::ParserError;
use crate::lexer::Scanner;

/// Scan and parse a complete source text.
pub fn parse_source(source: &str) -> Result<Program, ParserError> {
    let tokens = Scanner::new(source).scan_tokens()?;
    Parser::new(tokens).parse()
}
