//! Model source to surface syntax tree
//!
//! `parse` either returns a complete [`ast::Module`] or the first syntax
//! error with its line and column; there is no partial result.

pub mod ast;
pub mod lexer;
mod parser;

pub use ast::Module;

use crate::error::ParseError;
use ast::Pos;

/// Parses model source text
pub fn parse(source: &str) -> Result<Module, ParseError> {
    let lines = LineIndex::new(source);
    let tokens = lexer::tokenize(source, &lines)?;
    parser::Parser::new(source, tokens, lines).parse_module()
}

/// Maps byte offsets to 1-based line and column numbers
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Indexes the line starts of `source`
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// Line and column of a byte offset; columns count characters
    pub fn position(&self, source: &str, offset: usize) -> Pos {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        let column = source
            .get(start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(0);
        Pos { line, column: column + 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_positions() {
        let source = "sig A {}\n  sig B {}\n";
        let lines = LineIndex::new(source);
        assert_eq!(lines.position(source, 0), Pos { line: 1, column: 1 });
        assert_eq!(lines.position(source, 4), Pos { line: 1, column: 5 });
        assert_eq!(lines.position(source, 11), Pos { line: 2, column: 3 });
        assert_eq!(lines.position(source, source.len()), Pos { line: 3, column: 1 });
    }
}
