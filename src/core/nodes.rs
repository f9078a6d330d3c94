//! AST Node Definitions
//!
//! This module defines the complete set of Abstract Syntax Tree (AST) node
//! types that represent the parsed structure of a delimited PCRE pattern.
//! The AST is the direct output of the parser and is the single shape shared
//! by every analysis and transformation pass.
//!
//! AST nodes are designed to:
//!   - Closely mirror the source pattern syntax
//!   - Carry byte-offset spans for diagnostics
//!   - Be serializable to a tagged JSON representation
//!   - Support independent passes through the visitor protocol
//!
//! Nodes are constructed by the parser and are immutable afterwards; the
//! only transforming pass (the modernizer) builds fresh trees.

use serde::{Deserialize, Serialize};

/// Byte range of a node in the source pattern (inclusive start, exclusive end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both operands.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Group flavor, covering every `(...)` construct the parser recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    Capturing,
    NonCapturing,
    Named,
    LookaheadPositive,
    LookaheadNegative,
    LookbehindPositive,
    LookbehindNegative,
    Atomic,
    BranchReset,
    InlineFlags,
}

impl GroupKind {
    pub fn is_lookbehind(self) -> bool {
        matches!(
            self,
            GroupKind::LookbehindPositive | GroupKind::LookbehindNegative
        )
    }

    pub fn is_lookaround(self) -> bool {
        matches!(
            self,
            GroupKind::LookaheadPositive
                | GroupKind::LookaheadNegative
                | GroupKind::LookbehindPositive
                | GroupKind::LookbehindNegative
        )
    }

    /// Capturing and named groups take part in group numbering.
    pub fn is_counted(self) -> bool {
        matches!(self, GroupKind::Capturing | GroupKind::Named)
    }
}

/// Backtracking mode of a quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantifierKind {
    Greedy,
    Lazy,
    Possessive,
}

/// `^` or `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorKind {
    Start,
    End,
}

/// Character-class set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassOpKind {
    Intersection,
    Subtraction,
}

/// Enum encompassing all AST node variants.
///
/// The set is closed: passes match exhaustively and a new construct means a
/// new variant plus one method on every visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Regex(Regex),
    Alternation(Alternation),
    Sequence(Sequence),
    Group(Group),
    Quantifier(Quantifier),
    Literal(Literal),
    CharLiteral(CharLiteral),
    CharType(CharType),
    Dot(Dot),
    Anchor(Anchor),
    Assertion(Assertion),
    Keep(Keep),
    CharClass(CharClass),
    Range(Range),
    Backref(Backref),
    Unicode(Unicode),
    Octal(Octal),
    UnicodeProp(UnicodeProp),
    PosixClass(PosixClass),
    Comment(Comment),
    Conditional(Conditional),
    Subroutine(Subroutine),
    PcreVerb(PcreVerb),
    Define(Define),
    LimitMatch(LimitMatch),
    Callout(Callout),
    ClassOperation(ClassOperation),
    ControlChar(ControlChar),
    ScriptRun(ScriptRun),
    VersionCondition(VersionCondition),
}

impl Node {
    /// Source span of this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Regex(n) => n.span,
            Node::Alternation(n) => n.span,
            Node::Sequence(n) => n.span,
            Node::Group(n) => n.span,
            Node::Quantifier(n) => n.span,
            Node::Literal(n) => n.span,
            Node::CharLiteral(n) => n.span,
            Node::CharType(n) => n.span,
            Node::Dot(n) => n.span,
            Node::Anchor(n) => n.span,
            Node::Assertion(n) => n.span,
            Node::Keep(n) => n.span,
            Node::CharClass(n) => n.span,
            Node::Range(n) => n.span,
            Node::Backref(n) => n.span,
            Node::Unicode(n) => n.span,
            Node::Octal(n) => n.span,
            Node::UnicodeProp(n) => n.span,
            Node::PosixClass(n) => n.span,
            Node::Comment(n) => n.span,
            Node::Conditional(n) => n.span,
            Node::Subroutine(n) => n.span,
            Node::PcreVerb(n) => n.span,
            Node::Define(n) => n.span,
            Node::LimitMatch(n) => n.span,
            Node::Callout(n) => n.span,
            Node::ClassOperation(n) => n.span,
            Node::ControlChar(n) => n.span,
            Node::ScriptRun(n) => n.span,
            Node::VersionCondition(n) => n.span,
        }
    }

    /// Stable variant name, used as the metrics bucket key and serde tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Regex(_) => "Regex",
            Node::Alternation(_) => "Alternation",
            Node::Sequence(_) => "Sequence",
            Node::Group(_) => "Group",
            Node::Quantifier(_) => "Quantifier",
            Node::Literal(_) => "Literal",
            Node::CharLiteral(_) => "CharLiteral",
            Node::CharType(_) => "CharType",
            Node::Dot(_) => "Dot",
            Node::Anchor(_) => "Anchor",
            Node::Assertion(_) => "Assertion",
            Node::Keep(_) => "Keep",
            Node::CharClass(_) => "CharClass",
            Node::Range(_) => "Range",
            Node::Backref(_) => "Backref",
            Node::Unicode(_) => "Unicode",
            Node::Octal(_) => "Octal",
            Node::UnicodeProp(_) => "UnicodeProp",
            Node::PosixClass(_) => "PosixClass",
            Node::Comment(_) => "Comment",
            Node::Conditional(_) => "Conditional",
            Node::Subroutine(_) => "Subroutine",
            Node::PcreVerb(_) => "PcreVerb",
            Node::Define(_) => "Define",
            Node::LimitMatch(_) => "LimitMatch",
            Node::Callout(_) => "Callout",
            Node::ClassOperation(_) => "ClassOperation",
            Node::ControlChar(_) => "ControlChar",
            Node::ScriptRun(_) => "ScriptRun",
            Node::VersionCondition(_) => "VersionCondition",
        }
    }

    /// True for nodes that serialise to nothing: the empty literal and the
    /// empty sequence. The compiler uses this for `(?flags)` bodies.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Literal(lit) => lit.value.is_empty(),
            Node::Sequence(seq) => seq.children.is_empty(),
            _ => false,
        }
    }
}

/// Root node: one pattern child plus the delimiter and flag characters that
/// framed it in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regex {
    pub span: Span,
    pub pattern: Box<Node>,
    pub delimiter: char,
    /// Flag letters exactly as written, a subset of `imsxuADUXJ`.
    pub flags: String,
}

impl Regex {
    pub fn new(pattern: Node, delimiter: char, flags: String, span: Span) -> Self {
        Regex {
            span,
            pattern: Box::new(pattern),
            delimiter,
            flags,
        }
    }

    pub fn has_flag(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }
}

/// Ordered choice between branches (`a|b|c`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternation {
    pub span: Span,
    pub alternatives: Vec<Node>,
}

impl Alternation {
    pub fn new(alternatives: Vec<Node>, span: Span) -> Self {
        Alternation { span, alternatives }
    }
}

/// Concatenation of children in source order. May be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub span: Span,
    pub children: Vec<Node>,
}

impl Sequence {
    pub fn new(children: Vec<Node>, span: Span) -> Self {
        Sequence { span, children }
    }
}

/// Any parenthesised construct that wraps a subpattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub span: Span,
    pub kind: GroupKind,
    pub child: Box<Node>,
    /// Set for `GroupKind::Named`.
    pub name: Option<String>,
    /// Set for `GroupKind::InlineFlags`, e.g. `i`, `-i`, `im-sx`.
    pub flags: Option<String>,
}

impl Group {
    pub fn new(kind: GroupKind, child: Node, span: Span) -> Self {
        Group {
            span,
            kind,
            child: Box::new(child),
            name: None,
            flags: None,
        }
    }

    pub fn named(name: String, child: Node, span: Span) -> Self {
        Group {
            span,
            kind: GroupKind::Named,
            child: Box::new(child),
            name: Some(name),
            flags: None,
        }
    }

    pub fn inline_flags(flags: String, child: Node, span: Span) -> Self {
        Group {
            span,
            kind: GroupKind::InlineFlags,
            child: Box::new(child),
            name: None,
            flags: Some(flags),
        }
    }
}

/// Repetition of a single child. The textual form (`*`, `+`, `?`, `{n}`,
/// `{n,}`, `{n,m}`) is preserved verbatim for round-tripping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    pub span: Span,
    pub child: Box<Node>,
    pub quantifier: String,
    pub kind: QuantifierKind,
}

impl Quantifier {
    pub fn new(child: Node, quantifier: String, kind: QuantifierKind, span: Span) -> Self {
        Quantifier {
            span,
            child: Box::new(child),
            quantifier,
            kind,
        }
    }

    /// Decode the textual quantifier to `(min, max)` bounds, `None` max
    /// meaning unbounded. Returns `None` when the text is not one of the
    /// recognised forms; the validator turns that into an error and every
    /// other pass may rely on well-formed input.
    pub fn bounds(&self) -> Option<(u32, Option<u32>)> {
        match self.quantifier.as_str() {
            "*" => Some((0, None)),
            "+" => Some((1, None)),
            "?" => Some((0, Some(1))),
            text => {
                let inner = text.strip_prefix('{')?.strip_suffix('}')?;
                match inner.split_once(',') {
                    None => {
                        let n: u32 = inner.parse().ok()?;
                        Some((n, Some(n)))
                    }
                    Some((lo, "")) => {
                        let n: u32 = lo.parse().ok()?;
                        Some((n, None))
                    }
                    Some((lo, hi)) => {
                        let n: u32 = lo.parse().ok()?;
                        let m: u32 = hi.parse().ok()?;
                        Some((n, Some(m)))
                    }
                }
            }
        }
    }
}

/// One or more raw characters matched verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub span: Span,
    pub value: String,
}

impl Literal {
    pub fn new(value: String, span: Span) -> Self {
        Literal { span, value }
    }
}

/// A single character together with the escape text it was written as
/// (`\-`, `\t`, …), preserved so compilation reproduces the source form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharLiteral {
    pub span: Span,
    pub value: char,
    pub original: String,
}

impl CharLiteral {
    pub fn new(value: char, original: String, span: Span) -> Self {
        CharLiteral {
            span,
            value,
            original,
        }
    }
}

/// Predefined class escape: one of `d D w W s S h H v V R`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharType {
    pub span: Span,
    pub letter: char,
}

impl CharType {
    pub fn new(letter: char, span: Span) -> Self {
        CharType { span, letter }
    }
}

/// `.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot {
    pub span: Span,
}

impl Dot {
    pub fn new(span: Span) -> Self {
        Dot { span }
    }
}

/// `^` or `$`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub span: Span,
    pub kind: AnchorKind,
}

impl Anchor {
    pub fn new(kind: AnchorKind, span: Span) -> Self {
        Anchor { span, kind }
    }
}

/// Zero-width assertion escape: one of `A z Z G b B`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub span: Span,
    pub letter: char,
}

impl Assertion {
    pub fn new(letter: char, span: Span) -> Self {
        Assertion { span, letter }
    }
}

/// `\K`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keep {
    pub span: Span,
}

impl Keep {
    pub fn new(span: Span) -> Self {
        Keep { span }
    }
}

/// Bracket expression `[...]`. The expression child is an `Alternation`
/// when the class holds more than one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharClass {
    pub span: Span,
    pub expression: Box<Node>,
    pub negated: bool,
}

impl CharClass {
    pub fn new(expression: Node, negated: bool, span: Span) -> Self {
        CharClass {
            span,
            expression: Box::new(expression),
            negated,
        }
    }
}

/// Character range inside a class, e.g. `a-z`. Both endpoints must be
/// single-character literals; the validator enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub span: Span,
    pub start: Box<Node>,
    pub end: Box<Node>,
}

impl Range {
    pub fn new(start: Node, end: Node, span: Span) -> Self {
        Range {
            span,
            start: Box::new(start),
            end: Box::new(end),
        }
    }
}

/// Backreference. Numeric references store digits only; other forms store
/// the full text after the backslash (`k<name>`, `k{name}`, `g{2}`, `g2`),
/// so the compiler always emits `\` + reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backref {
    pub span: Span,
    pub reference: String,
}

impl Backref {
    pub fn new(reference: String, span: Span) -> Self {
        Backref { span, reference }
    }
}

/// Character code escape, e.g. `\x41` or `\x{1F600}`. The `code` field is
/// the text after the backslash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unicode {
    pub span: Span,
    pub code: String,
}

impl Unicode {
    pub fn new(code: String, span: Span) -> Self {
        Unicode { span, code }
    }

    /// Numeric codepoint value, if the escape text is well-formed hex.
    pub fn value(&self) -> Option<u32> {
        let body = self.code.as_str();
        let hex = if let Some(rest) = body.strip_prefix("x{").or_else(|| body.strip_prefix("u{")) {
            rest.strip_suffix('}')?
        } else if let Some(rest) = body.strip_prefix('x') {
            rest
        } else {
            return None;
        };
        if hex.is_empty() {
            // `\x` with no digits is NUL
            return Some(0);
        }
        u32::from_str_radix(hex, 16).ok()
    }
}

/// Octal character escape: modern `\o{17}` or legacy `\012`. The `code`
/// field is the text after the backslash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Octal {
    pub span: Span,
    pub code: String,
}

impl Octal {
    pub fn new(code: String, span: Span) -> Self {
        Octal { span, code }
    }

    pub fn value(&self) -> Option<u32> {
        let digits = match self.code.strip_prefix("o{") {
            Some(rest) => rest.strip_suffix('}')?,
            None => self.code.as_str(),
        };
        if digits.is_empty() {
            return None;
        }
        u32::from_str_radix(digits, 8).ok()
    }
}

/// Unicode property escape `\p{L}`, `\pL`, `\P{L}`, `\p{^N}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnicodeProp {
    pub span: Span,
    /// Property name, possibly with a leading `^`.
    pub name: String,
    pub has_braces: bool,
    /// True for the capital-P form.
    pub negated: bool,
}

impl UnicodeProp {
    pub fn new(name: String, has_braces: bool, negated: bool, span: Span) -> Self {
        UnicodeProp {
            span,
            name,
            has_braces,
            negated,
        }
    }
}

/// POSIX class `[:alpha:]` inside a character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixClass {
    pub span: Span,
    pub name: String,
}

impl PosixClass {
    pub fn new(name: String, span: Span) -> Self {
        PosixClass { span, name }
    }
}

/// `(?#...)` comment, or a `#...` line comment in extended mode. The text
/// of a line comment keeps its `#` prefix and trailing newline so extended
/// patterns re-compile to a parseable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub span: Span,
    pub text: String,
}

impl Comment {
    pub fn new(text: String, span: Span) -> Self {
        Comment { span, text }
    }
}

/// `(?(condition)yes|no)`. A missing `no` branch is `None` and compiles to
/// the single-branch form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub span: Span,
    pub condition: Box<Node>,
    pub yes: Box<Node>,
    pub no: Option<Box<Node>>,
}

impl Conditional {
    pub fn new(condition: Node, yes: Node, no: Option<Node>, span: Span) -> Self {
        Conditional {
            span,
            condition: Box::new(condition),
            yes: Box::new(yes),
            no: no.map(Box::new),
        }
    }
}

/// Subroutine call. `syntax` selects the spelling: `&` for `(?&name)`,
/// `P>` for `(?P>name)`, `g` for `\g<name>`, empty for `(?R)`/`(?0)`/`(?±n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subroutine {
    pub span: Span,
    pub reference: String,
    pub syntax: String,
}

impl Subroutine {
    pub fn new(reference: String, syntax: String, span: Span) -> Self {
        Subroutine {
            span,
            reference,
            syntax,
        }
    }
}

/// Backtracking-control verb `(*VERB)` or `(*NAME:ARG)`, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcreVerb {
    pub span: Span,
    pub verb: String,
}

impl PcreVerb {
    pub fn new(verb: String, span: Span) -> Self {
        PcreVerb { span, verb }
    }

    /// Verb head before any `:ARG` suffix.
    pub fn head(&self) -> &str {
        match self.verb.split_once(':') {
            Some((head, _)) => head,
            None => self.verb.as_str(),
        }
    }
}

/// `(?(DEFINE)...)` definition block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Define {
    pub span: Span,
    pub content: Box<Node>,
}

impl Define {
    pub fn new(content: Node, span: Span) -> Self {
        Define {
            span,
            content: Box::new(content),
        }
    }
}

/// `(*LIMIT_MATCH=n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitMatch {
    pub span: Span,
    pub limit: u32,
}

impl LimitMatch {
    pub fn new(limit: u32, span: Span) -> Self {
        LimitMatch { span, limit }
    }
}

/// `(?C)`, `(?C1)` or `(?C"tag")` callout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callout {
    pub span: Span,
    pub identifier: String,
    pub is_string: bool,
}

impl Callout {
    pub fn new(identifier: String, is_string: bool, span: Span) -> Self {
        Callout {
            span,
            identifier,
            is_string,
        }
    }
}

/// Class set operation: `left&&right` or `left--right` inside a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOperation {
    pub span: Span,
    pub kind: ClassOpKind,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

impl ClassOperation {
    pub fn new(kind: ClassOpKind, left: Node, right: Node, span: Span) -> Self {
        ClassOperation {
            span,
            kind,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Control character escape `\cX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlChar {
    pub span: Span,
    pub letter: char,
}

impl ControlChar {
    pub fn new(letter: char, span: Span) -> Self {
        ControlChar { span, letter }
    }
}

/// `(*script_run:...)`, content stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRun {
    pub span: Span,
    pub name: String,
}

impl ScriptRun {
    pub fn new(name: String, span: Span) -> Self {
        ScriptRun { span, name }
    }
}

/// `VERSION>=n` / `VERSION=n` condition inside a conditional group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCondition {
    pub span: Span,
    pub operator: String,
    pub version: String,
}

impl VersionCondition {
    pub fn new(operator: String, version: String, span: Span) -> Self {
        VersionCondition {
            span,
            operator,
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_serialization_tag() {
        let node = Node::Literal(Literal::new("abc".to_string(), Span::new(1, 4)));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "Literal");
        assert_eq!(json["value"], "abc");
        assert_eq!(json["span"]["start"], 1);
    }

    #[test]
    fn test_quantifier_bounds() {
        let child = Node::Dot(Dot::new(Span::new(0, 1)));
        let make = |text: &str| {
            Quantifier::new(
                child.clone(),
                text.to_string(),
                QuantifierKind::Greedy,
                Span::new(1, 1 + text.len()),
            )
        };
        assert_eq!(make("*").bounds(), Some((0, None)));
        assert_eq!(make("+").bounds(), Some((1, None)));
        assert_eq!(make("?").bounds(), Some((0, Some(1))));
        assert_eq!(make("{3}").bounds(), Some((3, Some(3))));
        assert_eq!(make("{2,}").bounds(), Some((2, None)));
        assert_eq!(make("{2,5}").bounds(), Some((2, Some(5))));
        assert_eq!(make("{,5}").bounds(), None);
        assert_eq!(make("{a}").bounds(), None);
    }

    #[test]
    fn test_unicode_value() {
        assert_eq!(
            Unicode::new("x41".to_string(), Span::default()).value(),
            Some(0x41)
        );
        assert_eq!(
            Unicode::new("x{1F600}".to_string(), Span::default()).value(),
            Some(0x1F600)
        );
        assert_eq!(
            Unicode::new("u{0041}".to_string(), Span::default()).value(),
            Some(0x41)
        );
        assert_eq!(
            Unicode::new("x".to_string(), Span::default()).value(),
            Some(0)
        );
    }

    #[test]
    fn test_octal_value() {
        assert_eq!(
            Octal::new("o{17}".to_string(), Span::default()).value(),
            Some(0o17)
        );
        assert_eq!(
            Octal::new("012".to_string(), Span::default()).value(),
            Some(0o12)
        );
        assert_eq!(Octal::new("o{}".to_string(), Span::default()).value(), None);
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(3, 7).merge(Span::new(5, 12));
        assert_eq!(merged, Span::new(3, 12));
    }
}
