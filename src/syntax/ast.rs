//! Surface syntax tree
//!
//! Formulas and expressions share one node type here, as they share one
//! grammar; the resolver decides what each node denotes.

/// 1-based source position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    /// Line number
    pub line: usize,
    /// Column number, in characters
    pub column: usize,
}

/// Byte range of a node in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// First byte
    pub start: usize,
    /// One past the last byte
    pub end: usize,
}

/// An identifier occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// The name
    pub name: String,
    /// Where it occurs
    pub pos: Pos,
}

/// A parsed model: its paragraphs in source order
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Top-level declarations
    pub paragraphs: Vec<Paragraph>,
    /// The source text the spans refer to
    pub source: String,
}

impl Module {
    /// Source text of a span
    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.start..span.end).unwrap_or_default()
    }
}

/// Top-level declaration
#[derive(Debug, Clone)]
pub enum Paragraph {
    /// `sig`
    Sig(SigDecl),
    /// `fact`
    Fact(FactDecl),
    /// `pred`
    Pred(PredDecl),
    /// `assert`
    Assert(AssertDecl),
    /// `run` / `check`
    Command(CommandDecl),
}

/// Signature multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigMult {
    /// Exactly one atom
    One,
    /// At most one atom
    Lone,
    /// At least one atom
    Some,
}

/// Field multiplicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMult {
    /// Any number of tuples per owner atom
    Set,
    /// Exactly one
    One,
    /// At most one
    Lone,
    /// At least one
    Some,
}

/// `abstract one sig A, B extends C { fields } { fact }`
#[derive(Debug, Clone)]
pub struct SigDecl {
    /// Declared names (one signature each)
    pub names: Vec<Ident>,
    /// `abstract`
    pub is_abstract: bool,
    /// `one` / `lone` / `some`
    pub mult: Option<SigMult>,
    /// `extends` target
    pub parent: Option<Ident>,
    /// Field declarations
    pub fields: Vec<FieldDecl>,
    /// Signature fact block
    pub fact: Option<Node>,
}

/// `f, g: lone A -> B`
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Declared names
    pub names: Vec<Ident>,
    /// Multiplicity keyword, if any
    pub mult: Option<FieldMult>,
    /// Target column signatures (`univ` allowed)
    pub columns: Vec<Ident>,
}

/// `fact name { ... }`
#[derive(Debug, Clone)]
pub struct FactDecl {
    /// Optional name
    pub name: Option<Ident>,
    /// Body block
    pub body: Node,
}

/// `pred name[x: A] { ... }`
#[derive(Debug, Clone)]
pub struct PredDecl {
    /// Name
    pub name: Ident,
    /// Parameters
    pub params: Vec<DeclGroup>,
    /// Body block
    pub body: Node,
}

/// `assert name { ... }`
#[derive(Debug, Clone)]
pub struct AssertDecl {
    /// Name
    pub name: Ident,
    /// Body block
    pub body: Node,
}

/// Command kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Search for an instance
    Run,
    /// Search for a counterexample
    Check,
}

/// What a command runs or checks
#[derive(Debug, Clone)]
pub enum CommandTarget {
    /// A predicate or assertion name
    Named(Ident),
    /// An inline block
    Block(Node),
}

/// `exactly 3 A`
#[derive(Debug, Clone)]
pub struct TypeScope {
    /// The signature
    pub sig: Ident,
    /// Atom bound
    pub count: u32,
    /// Exact count rather than upper bound
    pub exact: bool,
}

/// `label: run target for 3 but exactly 2 A`
#[derive(Debug, Clone)]
pub struct CommandDecl {
    /// Optional label
    pub label: Option<Ident>,
    /// `run` or `check`
    pub kind: CommandKind,
    /// Predicate, assertion or block
    pub target: CommandTarget,
    /// `for N`
    pub default_scope: Option<u32>,
    /// Per-signature scopes
    pub type_scopes: Vec<TypeScope>,
    /// Command source text
    pub text: String,
    /// Position of the command keyword
    pub pos: Pos,
}

/// `disj x, y: A`
#[derive(Debug, Clone)]
pub struct DeclGroup {
    /// `disj`
    pub disjoint: bool,
    /// Declared names
    pub names: Vec<Ident>,
    /// Domain expression
    pub domain: Node,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!f`, `not f`
    Not,
    /// `~r`
    Transpose,
    /// `^r`
    Closure,
    /// `*r`
    ReflexiveClosure,
    /// `#e`
    Cardinality,
    /// `some e`
    Some,
    /// `no e`
    No,
    /// `one e`
    One,
    /// `lone e`
    Lone,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`, `or`
    Or,
    /// `&&`, `and`
    And,
    /// `<=>`, `iff`
    Iff,
    /// `=>`, `implies`
    Implies,
    /// `in`
    In,
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `=<`, `<=`
    Lte,
    /// `>=`
    Gte,
    /// `+`
    Union,
    /// `-`
    Difference,
    /// `++`
    Override,
    /// `&`
    Intersection,
    /// `->`
    Product,
    /// `<:`
    DomainRestrict,
    /// `:>`
    RangeRestrict,
    /// `.`
    Join,
}

/// Quantifier keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantKind {
    /// `all`
    All,
    /// `some`
    Some,
    /// `no`
    No,
    /// `one`
    One,
    /// `lone`
    Lone,
}

/// Formula or expression node
#[derive(Debug, Clone)]
pub struct Node {
    /// What the node is
    pub kind: NodeKind,
    /// Position of its first token
    pub pos: Pos,
    /// Source range
    pub span: Span,
}

/// Node kinds
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Identifier
    Name(String),
    /// `@field`, a field without the implicit `this.`
    RawField(String),
    /// `this`
    This,
    /// `univ`
    Univ,
    /// `none`
    None,
    /// `iden`
    Iden,
    /// Integer literal
    Int(u32),
    /// Prefix operator
    Unary(UnaryOp, Box<Node>),
    /// Infix operator
    Binary(BinaryOp, Box<Node>, Box<Node>),
    /// `c => a else b`
    IfElse(Box<Node>, Box<Node>, Box<Node>),
    /// `e[a, b]`: box join or predicate call
    BoxJoin(Box<Node>, Vec<Node>),
    /// Quantified formula
    Quant(QuantKind, Vec<DeclGroup>, Box<Node>),
    /// `{x: A | f}`
    Comprehension(Vec<DeclGroup>, Box<Node>),
    /// `let x = e | body`
    Let(Vec<(Ident, Node)>, Box<Node>),
    /// `{ f g ... }`, the conjunction of its formulas
    Block(Vec<Node>),
}
