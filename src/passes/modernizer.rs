//! Modernizer - AST to Simplified AST
//!
//! A pure rewriter on the identity base: the input tree is never mutated
//! and every replacement copies the originating node's span. Rules:
//!
//!   - `[0-9]` collapses to `\d`, `[\t\n\r\f\v]` (exactly those five, in
//!     that order) collapses to `\s`
//!   - redundant `(?:...)` groups unwrap, except directly under a
//!     quantifier (the compiler re-groups there) and around a bare
//!     alternation (unwrapping would change precedence)
//!   - identity escapes whose character needs no escape drop the backslash
//!   - numeric `\N` backreferences become `\g{N}`
//!
//! Everything else rebuilds structurally with modernised children.

use crate::core::lexer::closing_delimiter;
use crate::core::nodes::*;
use crate::core::visitor::Rewriter;

/// The five whitespace escapes that fold into `\s`, in required order.
const WHITESPACE_CLASS: [char; 5] = ['\t', '\n', '\r', '\u{0C}', '\u{0B}'];

#[derive(Default)]
pub struct Modernizer {
    delimiter: char,
    closing: char,
    in_char_class: bool,
}

impl Modernizer {
    pub fn new() -> Self {
        Modernizer {
            delimiter: '/',
            closing: '/',
            in_char_class: false,
        }
    }

    /// Modernize a parsed pattern, returning a fresh root.
    pub fn modernize(regex: &Regex) -> Regex {
        match Modernizer::new().rewrite_regex_root(regex) {
            Node::Regex(regex) => regex,
            _ => unreachable!("regex rewrite yields a regex"),
        }
    }

    fn rewrite_regex_root(&mut self, node: &Regex) -> Node {
        Rewriter::rewrite_regex(self, node)
    }

    fn is_redundant_group(group: &Group) -> bool {
        group.kind == GroupKind::NonCapturing && group.name.is_none() && group.flags.is_none()
    }

    /// Single character denoted by a class member, if any.
    fn member_char(node: &Node) -> Option<char> {
        match node {
            Node::Literal(lit) => {
                let mut chars = lit.value.chars();
                let ch = chars.next()?;
                chars.next().is_none().then_some(ch)
            }
            Node::CharLiteral(lit) => Some(lit.value),
            _ => None,
        }
    }

    /// Escape-worthy characters in the current context; dropping a
    /// backslash is only safe outside this set.
    fn is_meta(&self, ch: char) -> bool {
        if self.in_char_class {
            matches!(ch, '\\' | ']' | '-' | '^')
        } else {
            matches!(
                ch,
                '\\' | '.' | '^' | '$' | '[' | ']' | '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}'
            ) || ch == self.delimiter
                || ch == self.closing
        }
    }

    /// `[0-9]` and `[\t\n\r\f\v]` have predefined-class equivalents.
    fn collapse_char_class(&self, node: &CharClass) -> Option<Node> {
        if node.negated {
            return None;
        }
        if let Node::Range(range) = node.expression.as_ref() {
            if Self::member_char(&range.start) == Some('0')
                && Self::member_char(&range.end) == Some('9')
            {
                return Some(Node::CharType(CharType::new('d', node.span)));
            }
        }
        if let Node::Alternation(alt) = node.expression.as_ref() {
            if alt.alternatives.len() == WHITESPACE_CLASS.len() {
                let matches_order = alt
                    .alternatives
                    .iter()
                    .zip(WHITESPACE_CLASS)
                    .all(|(member, expected)| Self::member_char(member) == Some(expected));
                if matches_order {
                    return Some(Node::CharType(CharType::new('s', node.span)));
                }
            }
        }
        None
    }
}

impl Rewriter for Modernizer {
    fn rewrite_regex(&mut self, node: &Regex) -> Node {
        self.delimiter = node.delimiter;
        self.closing = closing_delimiter(node.delimiter);
        self.in_char_class = false;
        Node::Regex(Regex::new(
            self.rewrite(&node.pattern),
            node.delimiter,
            node.flags.clone(),
            node.span,
        ))
    }

    fn rewrite_group(&mut self, node: &Group) -> Node {
        if Self::is_redundant_group(node) {
            let child = self.rewrite(&node.child);
            // Unwrapping a bare alternation would splice its branches into
            // the surrounding sequence
            if !matches!(child, Node::Alternation(_)) {
                return child;
            }
            return Node::Group(Group::new(node.kind, child, node.span));
        }
        let mut group = Group::new(node.kind, self.rewrite(&node.child), node.span);
        group.name = node.name.clone();
        group.flags = node.flags.clone();
        Node::Group(group)
    }

    fn rewrite_quantifier(&mut self, node: &Quantifier) -> Node {
        // The grouping of a quantified (?:...) is load-bearing; modernise
        // its body but keep the group itself
        let child = match node.child.as_ref() {
            Node::Group(group) if Self::is_redundant_group(group) => Node::Group(Group::new(
                group.kind,
                self.rewrite(&group.child),
                group.span,
            )),
            other => self.rewrite(other),
        };
        Node::Quantifier(Quantifier::new(
            child,
            node.quantifier.clone(),
            node.kind,
            node.span,
        ))
    }

    fn rewrite_char_class(&mut self, node: &CharClass) -> Node {
        if let Some(collapsed) = self.collapse_char_class(node) {
            return collapsed;
        }
        let was_in_class = self.in_char_class;
        self.in_char_class = true;
        let expression = self.rewrite(&node.expression);
        self.in_char_class = was_in_class;
        Node::CharClass(CharClass::new(expression, node.negated, node.span))
    }

    fn rewrite_char_literal(&mut self, node: &CharLiteral) -> Node {
        // Only identity escapes qualify; `\t` and friends denote a
        // different character than the one after the backslash
        let mut original = node.original.chars();
        let is_identity = original.next() == Some('\\')
            && original.next() == Some(node.value)
            && original.next().is_none();
        if is_identity && !self.is_meta(node.value) {
            return Node::Literal(Literal::new(node.value.to_string(), node.span));
        }
        Node::CharLiteral(node.clone())
    }

    fn rewrite_backref(&mut self, node: &Backref) -> Node {
        if !node.reference.is_empty() && node.reference.chars().all(|c| c.is_ascii_digit()) {
            return Node::Backref(Backref::new(
                format!("g{{{}}}", node.reference),
                node.span,
            ));
        }
        Node::Backref(node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;
    use crate::passes::compiler::Compiler;

    fn parse(input: &str) -> Regex {
        Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed")
    }

    fn modernized(input: &str) -> String {
        Compiler::compile(&Modernizer::modernize(&parse(input)))
    }

    #[test]
    fn test_digit_class_collapses() {
        assert_eq!(modernized("/[0-9]{3}/"), r"/\d{3}/");
    }

    #[test]
    fn test_whitespace_class_collapses() {
        assert_eq!(modernized(r"/[\t\n\r\f\v]/"), r"/\s/");
    }

    #[test]
    fn test_whitespace_class_wrong_order_kept() {
        assert_eq!(modernized(r"/[\n\t\r\f\v]/"), r"/[\n\t\r\f\v]/");
    }

    #[test]
    fn test_negated_digit_class_kept() {
        assert_eq!(modernized("/[^0-9]/"), "/[^0-9]/");
    }

    #[test]
    fn test_redundant_group_unwrapped() {
        assert_eq!(modernized("/(?:hello)/"), "/hello/");
        assert_eq!(modernized("/a(?:bc)d/"), "/abcd/");
    }

    #[test]
    fn test_quantified_group_kept() {
        assert_eq!(modernized("/(?:ab)+/"), "/(?:ab)+/");
    }

    #[test]
    fn test_alternation_group_kept_in_sequence() {
        assert_eq!(modernized("/x(?:a|b)y/"), "/x(?:a|b)y/");
    }

    #[test]
    fn test_named_and_atomic_groups_kept() {
        assert_eq!(modernized("/(?<w>a)/"), "/(?<w>a)/");
        assert_eq!(modernized("/(?>a)/"), "/(?>a)/");
        assert_eq!(modernized("/(?i:a)/"), "/(?i:a)/");
    }

    #[test]
    fn test_gratuitous_escape_dropped() {
        assert_eq!(modernized(r"/a\%b/"), "/a%b/");
        assert_eq!(modernized(r"/\q/"), "/q/");
    }

    #[test]
    fn test_meta_escape_kept() {
        assert_eq!(modernized(r"/a\.b/"), r"/a\.b/");
        assert_eq!(modernized(r"/a\/b/"), r"/a\/b/");
        // '-' is a class meta, so the escape survives inside a class only
        assert_eq!(modernized(r"/[a\-z]/"), r"/[a\-z]/");
        assert_eq!(modernized(r"/a\-z/"), "/a-z/");
    }

    #[test]
    fn test_control_escape_kept() {
        assert_eq!(modernized(r"/a\tb/"), r"/a\tb/");
    }

    #[test]
    fn test_numeric_backref_canonicalised() {
        assert_eq!(modernized(r"/(a)\1/"), r"/(a)\g{1}/");
        assert_eq!(modernized(r"/(?<x>a)\k<x>/"), r"/(?<x>a)\k<x>/");
    }

    #[test]
    fn test_identity_on_untargeted_pattern() {
        let regex = parse(r"/^(?<w>foo)[a-c]+\g{1}$/i");
        let modern = Modernizer::modernize(&regex);
        assert_eq!(modern, regex);
    }

    #[test]
    fn test_spans_preserved_on_replacement() {
        let regex = parse("/[0-9]/");
        let class_span = regex.pattern.span();
        let modern = Modernizer::modernize(&regex);
        assert_eq!(modern.pattern.span(), class_span);
    }
}
