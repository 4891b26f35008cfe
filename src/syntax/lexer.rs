//! Tokens of the model language

use super::LineIndex;
use crate::error::ParseError;
use logos::Logos;
use std::ops::Range;

/// Skips a block comment up to and including the first `*/`
fn block_comment(lex: &mut logos::Lexer<Token>) -> logos::FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            logos::FilterResult::Skip
        }
        None => logos::FilterResult::Error(()),
    }
}

/// Model language tokens
#[allow(missing_docs)]
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    /// `//`, `--` and `/* */` comments
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"--[^\n]*", logos::skip)]
    #[token("/*", block_comment)]
    Comment,

    #[token("sig")]
    Sig,
    #[token("abstract")]
    Abstract,
    #[token("extends")]
    Extends,
    #[token("one")]
    One,
    #[token("lone")]
    Lone,
    #[token("some")]
    Some,
    #[token("set")]
    Set,
    #[token("no")]
    No,
    #[token("all")]
    All,
    #[token("fact")]
    Fact,
    #[token("pred")]
    Pred,
    #[token("assert")]
    Assert,
    #[token("run")]
    Run,
    #[token("check")]
    Check,
    #[token("for")]
    For,
    #[token("but")]
    But,
    #[token("exactly")]
    Exactly,
    #[token("disj")]
    Disj,
    #[token("let")]
    Let,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("implies")]
    Implies,
    #[token("iff")]
    Iff,
    #[token("else")]
    Else,
    #[token("in")]
    In,
    #[token("this")]
    This,
    #[token("univ")]
    Univ,
    #[token("none")]
    None,
    #[token("iden")]
    Iden,

    #[token(".")]
    Dot,
    #[token("^")]
    Caret,
    #[token("*")]
    Star,
    #[token("~")]
    Tilde,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("&")]
    Amp,
    #[token("++")]
    PlusPlus,
    #[token("->")]
    Arrow,
    #[token("<:")]
    DomRestrict,
    #[token(":>")]
    RanRestrict,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=<")]
    #[token("<=")]
    Lte,
    #[token(">=")]
    Gte,
    #[token("#")]
    Hash,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("=>")]
    FatArrow,
    #[token("<=>")]
    DoubleArrow,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("|")]
    Bar,
    #[token("@")]
    At,

    #[regex(r#"[A-Za-z_][A-Za-z0-9_'"]*"#, |lex| lex.slice().to_owned())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Int(u32),
}

/// A token and its byte range in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// Byte range
    pub span: Range<usize>,
}

/// Splits `source` into tokens, skipping whitespace and comments
pub fn tokenize(source: &str, lines: &LineIndex) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(next) = lexer.next() {
        let span = lexer.span();
        match next {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => {
                let pos = lines.position(source, span.start);
                let expected = if lexer.slice() == "/*" {
                    "`*/` closing the comment"
                } else {
                    "a token"
                };
                return Err(ParseError {
                    line: pos.line,
                    column: pos.column,
                    expected: expected.to_string(),
                    found: format!("`{}`", lexer.slice()),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        let lines = LineIndex::new(source);
        tokenize(source, &lines)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("sig signal extends x'"),
            vec![
                Token::Sig,
                Token::Ident("signal".into()),
                Token::Extends,
                Token::Ident("x'".into()),
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("<=> <= =< => <: :> ++ + -> !="),
            vec![
                Token::DoubleArrow,
                Token::Lte,
                Token::Lte,
                Token::FatArrow,
                Token::DomRestrict,
                Token::RanRestrict,
                Token::PlusPlus,
                Token::Plus,
                Token::Arrow,
                Token::NotEq,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let source = "sig // line\n A -- other\n /* block\n * more */ { }";
        assert_eq!(
            kinds(source),
            vec![Token::Sig, Token::Ident("A".into()), Token::LBrace, Token::RBrace]
        );
    }

    #[test]
    fn block_comments_may_contain_stars() {
        let source = "/** doc */ sig /* a * b ** c\n * d\n **/ A /**/ { }";
        assert_eq!(
            kinds(source),
            vec![Token::Sig, Token::Ident("A".into()), Token::LBrace, Token::RBrace]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let source = "sig A {}\n/* open * ended";
        let lines = LineIndex::new(source);
        let err = tokenize(source, &lines).unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
        assert_eq!(err.expected, "`*/` closing the comment");
    }

    #[test]
    fn bad_character_reports_position() {
        let source = "sig A {\n  $\n}";
        let lines = LineIndex::new(source);
        let err = tokenize(source, &lines).unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));
        assert_eq!(err.found, "`$`");
    }
}
