//! Recursive-descent parser over the token stream
//!
//! Operator precedence, loosest first:
//!
//! | level | operators |
//! |-------|-----------|
//! | quantifiers, `let` | `all x: A \| f` (body extends to the right) |
//! | disjunction | `\|\|` `or` |
//! | equivalence | `<=>` `iff` |
//! | implication | `=>` `implies` (right associative, optional `else`) |
//! | conjunction | `&&` `and` |
//! | negation | `!` `not` |
//! | comparison | `in` `=` `<` `>` `=<` `>=`, optionally negated |
//! | multiplicity | `no` `some` `lone` `one` |
//! | union | `+` `-` |
//! | cardinality | `#` |
//! | override | `++` |
//! | intersection | `&` |
//! | product | `->` |
//! | restriction | `<:` then `:>` |
//! | join | `.` and `[]` |
//! | unary | `~` `^` `*` |

use super::ast::*;
use super::lexer::{Spanned, Token};
use super::LineIndex;
use crate::error::ParseError;

type PResult<T> = Result<T, ParseError>;

/// Deepest expression nesting accepted before parsing gives up
const MAX_DEPTH: usize = 100;

pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned>,
    lines: LineIndex,
    cursor: usize,
    last_end: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str, tokens: Vec<Spanned>, lines: LineIndex) -> Self {
        Self {
            source,
            tokens,
            lines,
            cursor: 0,
            last_end: 0,
            depth: 0,
        }
    }

    pub(crate) fn parse_module(mut self) -> PResult<Module> {
        let mut paragraphs = Vec::new();
        while !self.at_end() {
            paragraphs.push(self.paragraph()?);
        }
        Ok(Module {
            paragraphs,
            source: self.source.to_string(),
        })
    }

    // ---- token plumbing ----

    fn at_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + n).map(|s| &s.token)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.cursor).cloned()?;
        self.cursor += 1;
        self.last_end = spanned.span.end;
        Some(spanned)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> PResult<Spanned> {
        if self.check(token) {
            self.advance().ok_or_else(|| self.error(expected))
        } else {
            Err(self.error(expected))
        }
    }

    /// Byte offset of the next token (end of input if none)
    fn offset(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|s| s.span.start)
            .unwrap_or(self.source.len())
    }

    fn pos_at(&self, offset: usize) -> Pos {
        self.lines.position(self.source, offset)
    }

    fn error(&self, expected: &str) -> ParseError {
        let pos = self.pos_at(self.offset());
        let found = match self.tokens.get(self.cursor) {
            Some(s) => format!("`{}`", &self.source[s.span.clone()]),
            None => "end of input".to_string(),
        };
        ParseError {
            line: pos.line,
            column: pos.column,
            expected: expected.to_string(),
            found,
        }
    }

    /// Runs `parse` one nesting level deeper
    fn nested(&mut self, parse: fn(&mut Self) -> PResult<Node>) -> PResult<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn ident(&mut self, expected: &str) -> PResult<Ident> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                let pos = self.pos_at(self.offset());
                self.advance();
                Ok(Ident { name, pos })
            }
            _ => Err(self.error(expected)),
        }
    }

    fn int(&mut self, expected: &str) -> PResult<u32> {
        match self.peek() {
            Some(Token::Int(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn node(&self, kind: NodeKind, start: usize) -> Node {
        Node {
            kind,
            pos: self.pos_at(start),
            span: Span {
                start,
                end: self.last_end.max(start),
            },
        }
    }

    // ---- paragraphs ----

    fn paragraph(&mut self) -> PResult<Paragraph> {
        match self.peek() {
            Some(Token::Abstract | Token::One | Token::Lone | Token::Some | Token::Sig) => {
                self.sig_decl().map(Paragraph::Sig)
            }
            Some(Token::Fact) => self.fact_decl().map(Paragraph::Fact),
            Some(Token::Pred) => self.pred_decl().map(Paragraph::Pred),
            Some(Token::Assert) => self.assert_decl().map(Paragraph::Assert),
            Some(Token::Run | Token::Check) => self.command_decl(None).map(Paragraph::Command),
            Some(Token::Ident(_)) if self.peek_at(1) == Some(&Token::Colon) => {
                let label = self.ident("a command label")?;
                self.advance();
                self.command_decl(Some(label)).map(Paragraph::Command)
            }
            _ => Err(self.error("a paragraph (sig, fact, pred, assert, run or check)")),
        }
    }

    fn sig_decl(&mut self) -> PResult<SigDecl> {
        let mut is_abstract = false;
        let mut mult = None;
        loop {
            let next = match self.peek() {
                Some(Token::Abstract) if !is_abstract => {
                    is_abstract = true;
                    None
                }
                Some(Token::One) if mult.is_none() => Some(SigMult::One),
                Some(Token::Lone) if mult.is_none() => Some(SigMult::Lone),
                Some(Token::Some) if mult.is_none() => Some(SigMult::Some),
                _ => break,
            };
            if next.is_some() {
                mult = next;
            }
            self.advance();
        }
        self.expect(&Token::Sig, "`sig`")?;

        let mut names = vec![self.ident("a signature name")?];
        while self.eat(&Token::Comma) {
            names.push(self.ident("a signature name")?);
        }
        let parent = if self.eat(&Token::Extends) {
            Some(self.ident("a parent signature name")?)
        } else {
            None
        };

        self.expect(&Token::LBrace, "`{`")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) {
            fields.push(self.field_decl()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace, "`,` or `}`")?;

        let fact = if self.check(&Token::LBrace) {
            Some(self.block()?)
        } else {
            None
        };

        Ok(SigDecl {
            names,
            is_abstract,
            mult,
            parent,
            fields,
            fact,
        })
    }

    fn field_decl(&mut self) -> PResult<FieldDecl> {
        let mut names = vec![self.ident("a field name")?];
        while self.eat(&Token::Comma) {
            names.push(self.ident("a field name")?);
        }
        self.expect(&Token::Colon, "`:`")?;

        let mult = match self.peek() {
            Some(Token::Set) => Some(FieldMult::Set),
            Some(Token::One) => Some(FieldMult::One),
            Some(Token::Lone) => Some(FieldMult::Lone),
            Some(Token::Some) => Some(FieldMult::Some),
            _ => None,
        };
        if mult.is_some() {
            self.advance();
        }

        let mut columns = vec![self.column_type()?];
        while self.eat(&Token::Arrow) {
            columns.push(self.column_type()?);
        }
        Ok(FieldDecl { names, mult, columns })
    }

    fn column_type(&mut self) -> PResult<Ident> {
        if self.check(&Token::Univ) {
            let pos = self.pos_at(self.offset());
            self.advance();
            return Ok(Ident {
                name: "univ".to_string(),
                pos,
            });
        }
        self.ident("a signature name")
    }

    fn fact_decl(&mut self) -> PResult<FactDecl> {
        self.expect(&Token::Fact, "`fact`")?;
        let name = match self.peek() {
            Some(Token::Ident(_)) => Some(self.ident("a fact name")?),
            _ => None,
        };
        let body = self.block()?;
        Ok(FactDecl { name, body })
    }

    fn pred_decl(&mut self) -> PResult<PredDecl> {
        self.expect(&Token::Pred, "`pred`")?;
        let name = self.ident("a predicate name")?;
        let mut params = Vec::new();
        let close = if self.eat(&Token::LBracket) {
            Some((Token::RBracket, "`]`"))
        } else if self.eat(&Token::LParen) {
            Some((Token::RParen, "`)`"))
        } else {
            None
        };
        if let Some((close, expected)) = close {
            if !self.check(&close) {
                params = self.decl_groups()?;
            }
            self.expect(&close, expected)?;
        }
        let body = self.block()?;
        Ok(PredDecl { name, params, body })
    }

    fn assert_decl(&mut self) -> PResult<AssertDecl> {
        self.expect(&Token::Assert, "`assert`")?;
        let name = self.ident("an assertion name")?;
        let body = self.block()?;
        Ok(AssertDecl { name, body })
    }

    fn command_decl(&mut self, label: Option<Ident>) -> PResult<CommandDecl> {
        let start = self.offset();
        let pos = self.pos_at(start);
        let kind = match self.advance().map(|s| s.token) {
            Some(Token::Run) => CommandKind::Run,
            Some(Token::Check) => CommandKind::Check,
            _ => return Err(self.error("`run` or `check`")),
        };

        let target = if self.check(&Token::LBrace) {
            CommandTarget::Block(self.block()?)
        } else {
            CommandTarget::Named(self.ident("a predicate, assertion or `{`")?)
        };

        let mut default_scope = None;
        let mut type_scopes = Vec::new();
        if self.eat(&Token::For) {
            // `for 3 A` is a type scope; `for 3` and `for 3 but ...` set the default
            let has_default =
                matches!(self.peek(), Some(Token::Int(_))) && !matches!(self.peek_at(1), Some(Token::Ident(_)));
            if has_default {
                default_scope = Some(self.int("a scope")?);
                if self.eat(&Token::But) {
                    type_scopes = self.type_scopes()?;
                }
            } else {
                type_scopes = self.type_scopes()?;
            }
        }

        Ok(CommandDecl {
            label,
            kind,
            target,
            default_scope,
            type_scopes,
            text: self.source[start..self.last_end].to_string(),
            pos,
        })
    }

    fn type_scopes(&mut self) -> PResult<Vec<TypeScope>> {
        let mut scopes = vec![self.type_scope()?];
        while self.eat(&Token::Comma) {
            scopes.push(self.type_scope()?);
        }
        Ok(scopes)
    }

    fn type_scope(&mut self) -> PResult<TypeScope> {
        let exact = self.eat(&Token::Exactly);
        let count = self.int("a scope")?;
        let sig = self.ident("a signature name")?;
        Ok(TypeScope { sig, count, exact })
    }

    // ---- declarations ----

    /// True if a declaration (`disj`? `x, y:`) starts `n` tokens ahead
    fn decl_starts_at(&self, mut n: usize) -> bool {
        if self.peek_at(n) == Some(&Token::Disj) {
            return true;
        }
        loop {
            if !matches!(self.peek_at(n), Some(Token::Ident(_))) {
                return false;
            }
            match self.peek_at(n + 1) {
                Some(Token::Colon) => return true,
                Some(Token::Comma) => n += 2,
                _ => return false,
            }
        }
    }

    fn decl_groups(&mut self) -> PResult<Vec<DeclGroup>> {
        let mut groups = vec![self.decl_group()?];
        while self.eat(&Token::Comma) {
            groups.push(self.decl_group()?);
        }
        Ok(groups)
    }

    fn decl_group(&mut self) -> PResult<DeclGroup> {
        let disjoint = self.eat(&Token::Disj);
        let mut names = vec![self.ident("a variable name")?];
        while self.eat(&Token::Comma) {
            names.push(self.ident("a variable name")?);
        }
        self.expect(&Token::Colon, "`:`")?;
        // `x: one A` is the default for declarations
        self.eat(&Token::One);
        let domain = self.union()?;
        Ok(DeclGroup {
            disjoint,
            names,
            domain,
        })
    }

    // ---- formulas and expressions ----

    /// `{ f g ... }`
    fn block(&mut self) -> PResult<Node> {
        let start = self.offset();
        self.expect(&Token::LBrace, "`{`")?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error("`}`"));
            }
            body.push(self.expr()?);
        }
        self.advance();
        Ok(self.node(NodeKind::Block(body), start))
    }

    /// Parses a formula or expression
    pub(crate) fn expr(&mut self) -> PResult<Node> {
        self.nested(Self::or)
    }

    fn binary_chain(
        &mut self,
        next: fn(&mut Self) -> PResult<Node>,
        op_of: fn(&Token) -> Option<BinaryOp>,
    ) -> PResult<Node> {
        let start = self.offset();
        let mut lhs = next(self)?;
        while let Some(op) = self.peek().and_then(op_of) {
            self.advance();
            let rhs = next(self)?;
            lhs = self.node(NodeKind::Binary(op, Box::new(lhs), Box::new(rhs)), start);
        }
        Ok(lhs)
    }

    fn or(&mut self) -> PResult<Node> {
        self.binary_chain(Self::iff, |t| match t {
            Token::OrOr | Token::Or => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn iff(&mut self) -> PResult<Node> {
        self.binary_chain(Self::implies, |t| match t {
            Token::DoubleArrow | Token::Iff => Some(BinaryOp::Iff),
            _ => None,
        })
    }

    fn implies(&mut self) -> PResult<Node> {
        let start = self.offset();
        let lhs = self.and()?;
        if !(self.eat(&Token::FatArrow) || self.eat(&Token::Implies)) {
            return Ok(lhs);
        }
        let then = self.nested(Self::implies)?;
        if self.eat(&Token::Else) {
            let otherwise = self.nested(Self::implies)?;
            return Ok(self.node(
                NodeKind::IfElse(Box::new(lhs), Box::new(then), Box::new(otherwise)),
                start,
            ));
        }
        Ok(self.node(NodeKind::Binary(BinaryOp::Implies, Box::new(lhs), Box::new(then)), start))
    }

    fn and(&mut self) -> PResult<Node> {
        self.binary_chain(Self::negation, |t| match t {
            Token::AndAnd | Token::And => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn negation(&mut self) -> PResult<Node> {
        let start = self.offset();
        match self.peek() {
            Some(Token::Bang | Token::Not) => {
                self.advance();
                let inner = self.nested(Self::negation)?;
                Ok(self.node(NodeKind::Unary(UnaryOp::Not, Box::new(inner)), start))
            }
            Some(Token::Let) => self.let_expr(),
            Some(Token::All) => self.quantified(QuantKind::All),
            Some(Token::Some) if self.decl_starts_at(1) => self.quantified(QuantKind::Some),
            Some(Token::No) if self.decl_starts_at(1) => self.quantified(QuantKind::No),
            Some(Token::One) if self.decl_starts_at(1) => self.quantified(QuantKind::One),
            Some(Token::Lone) if self.decl_starts_at(1) => self.quantified(QuantKind::Lone),
            _ => self.comparison(),
        }
    }

    fn quantified(&mut self, kind: QuantKind) -> PResult<Node> {
        let start = self.offset();
        self.advance();
        let decls = self.decl_groups()?;
        let body = self.binder_body()?;
        Ok(self.node(NodeKind::Quant(kind, decls, Box::new(body)), start))
    }

    /// `| f` or `{ ... }`
    fn binder_body(&mut self) -> PResult<Node> {
        if self.eat(&Token::Bar) {
            self.expr()
        } else if self.check(&Token::LBrace) {
            self.block()
        } else {
            Err(self.error("`|` or `{`"))
        }
    }

    fn let_expr(&mut self) -> PResult<Node> {
        let start = self.offset();
        self.expect(&Token::Let, "`let`")?;
        let mut bindings = Vec::new();
        loop {
            let name = self.ident("a variable name")?;
            self.expect(&Token::Eq, "`=`")?;
            let value = self.expr()?;
            bindings.push((name, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let body = self.binder_body()?;
        Ok(self.node(NodeKind::Let(bindings, Box::new(body)), start))
    }

    fn comparison_op(token: &Token) -> Option<BinaryOp> {
        match token {
            Token::In => Some(BinaryOp::In),
            Token::Eq => Some(BinaryOp::Eq),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Lte => Some(BinaryOp::Lte),
            Token::Gte => Some(BinaryOp::Gte),
            _ => None,
        }
    }

    fn comparison(&mut self) -> PResult<Node> {
        let start = self.offset();
        let lhs = self.multiplicity()?;

        let (negated, op) = match self.peek() {
            Some(Token::NotEq) => (true, BinaryOp::Eq),
            Some(Token::Bang | Token::Not) => match self.peek_at(1).and_then(Self::comparison_op) {
                Some(op) => {
                    self.advance();
                    (true, op)
                }
                None => return Ok(lhs),
            },
            Some(token) => match Self::comparison_op(token) {
                Some(op) => (false, op),
                None => return Ok(lhs),
            },
            None => return Ok(lhs),
        };
        self.advance();

        let rhs = self.multiplicity()?;
        let cmp = self.node(NodeKind::Binary(op, Box::new(lhs), Box::new(rhs)), start);
        if negated {
            Ok(self.node(NodeKind::Unary(UnaryOp::Not, Box::new(cmp)), start))
        } else {
            Ok(cmp)
        }
    }

    fn multiplicity(&mut self) -> PResult<Node> {
        let start = self.offset();
        let op = match self.peek() {
            Some(Token::No) => UnaryOp::No,
            Some(Token::Some) => UnaryOp::Some,
            Some(Token::One) => UnaryOp::One,
            Some(Token::Lone) => UnaryOp::Lone,
            _ => return self.union(),
        };
        self.advance();
        let operand = self.union()?;
        Ok(self.node(NodeKind::Unary(op, Box::new(operand)), start))
    }

    fn union(&mut self) -> PResult<Node> {
        self.binary_chain(Self::cardinality, |t| match t {
            Token::Plus => Some(BinaryOp::Union),
            Token::Minus => Some(BinaryOp::Difference),
            _ => None,
        })
    }

    fn cardinality(&mut self) -> PResult<Node> {
        let start = self.offset();
        if self.eat(&Token::Hash) {
            let operand = self.override_()?;
            return Ok(self.node(NodeKind::Unary(UnaryOp::Cardinality, Box::new(operand)), start));
        }
        self.override_()
    }

    fn override_(&mut self) -> PResult<Node> {
        self.binary_chain(Self::intersection, |t| match t {
            Token::PlusPlus => Some(BinaryOp::Override),
            _ => None,
        })
    }

    fn intersection(&mut self) -> PResult<Node> {
        self.binary_chain(Self::product, |t| match t {
            Token::Amp => Some(BinaryOp::Intersection),
            _ => None,
        })
    }

    fn product(&mut self) -> PResult<Node> {
        self.binary_chain(Self::domain_restriction, |t| match t {
            Token::Arrow => Some(BinaryOp::Product),
            _ => None,
        })
    }

    fn domain_restriction(&mut self) -> PResult<Node> {
        self.binary_chain(Self::range_restriction, |t| match t {
            Token::DomRestrict => Some(BinaryOp::DomainRestrict),
            _ => None,
        })
    }

    fn range_restriction(&mut self) -> PResult<Node> {
        self.binary_chain(Self::join, |t| match t {
            Token::RanRestrict => Some(BinaryOp::RangeRestrict),
            _ => None,
        })
    }

    fn join(&mut self) -> PResult<Node> {
        let start = self.offset();
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Dot) {
                let rhs = self.unary()?;
                lhs = self.node(NodeKind::Binary(BinaryOp::Join, Box::new(lhs), Box::new(rhs)), start);
            } else if self.eat(&Token::LBracket) {
                let mut args = Vec::new();
                if !self.check(&Token::RBracket) {
                    args.push(self.expr()?);
                    while self.eat(&Token::Comma) {
                        args.push(self.expr()?);
                    }
                }
                self.expect(&Token::RBracket, "`,` or `]`")?;
                lhs = self.node(NodeKind::BoxJoin(Box::new(lhs), args), start);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> PResult<Node> {
        let start = self.offset();
        let op = match self.peek() {
            Some(Token::Tilde) => UnaryOp::Transpose,
            Some(Token::Caret) => UnaryOp::Closure,
            Some(Token::Star) => UnaryOp::ReflexiveClosure,
            _ => return self.primary(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(self.node(NodeKind::Unary(op, Box::new(operand)), start))
    }

    fn primary(&mut self) -> PResult<Node> {
        let start = self.offset();
        let kind = match self.peek() {
            Some(Token::Ident(name)) => NodeKind::Name(name.clone()),
            Some(Token::This) => NodeKind::This,
            Some(Token::Univ) => NodeKind::Univ,
            Some(Token::None) => NodeKind::None,
            Some(Token::Iden) => NodeKind::Iden,
            Some(Token::Int(n)) => NodeKind::Int(*n),
            Some(Token::At) => {
                self.advance();
                let field = self.ident("a field name")?;
                return Ok(self.node(NodeKind::RawField(field.name), start));
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.expr()?;
                self.expect(&Token::RParen, "`)`")?;
                return Ok(inner);
            }
            Some(Token::LBrace) if self.decl_starts_at(1) => {
                self.advance();
                let decls = self.decl_groups()?;
                self.expect(&Token::Bar, "`|`")?;
                let body = self.expr()?;
                self.expect(&Token::RBrace, "`}`")?;
                return Ok(self.node(NodeKind::Comprehension(decls, Box::new(body)), start));
            }
            Some(Token::LBrace) => return self.block(),
            _ => return Err(self.error("an expression")),
        };
        self.advance();
        Ok(self.node(kind, start))
    }
}
