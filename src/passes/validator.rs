//! Validator - Semantic Gate over Parsed Patterns
//!
//! A pure side-effect pass: walking the tree either succeeds or stops at
//! the first violation with a descriptive error. The checks cover
//! quantifier syntax, lookbehind restrictions, nested-quantifier
//! backtracking hazards, group and name bookkeeping, backreference and
//! subroutine scope, range ordering, character-code limits, and the closed
//! name sets for assertions, POSIX classes, Unicode properties and verbs.
//!
//! Traversal state (group count, named-group set, quantifier depth,
//! lookbehind depth) lives on the visitor and is reset whenever a new root
//! is entered. The AST is never mutated.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::core::errors::ValidationError;
use crate::core::nodes::*;
use crate::core::visitor::Visitor;

static QUANTIFIER_SHAPE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^(?:[*+?]|\{\d+(?:,\d*)?\})$").expect("quantifier shape"));

static POSIX_CLASSES: &[&str] = &[
    "alnum", "alpha", "ascii", "blank", "cntrl", "digit", "graph", "lower", "print", "punct",
    "space", "upper", "word", "xdigit",
];

static UNICODE_PROPERTIES: &[&str] = &["L", "Lu", "Ll", "M", "N", "P", "S", "Z", "C"];

static VERBS: &[&str] = &[
    "FAIL",
    "ACCEPT",
    "COMMIT",
    "PRUNE",
    "SKIP",
    "THEN",
    "DEFINE",
    "MARK",
    "UTF8",
    "UTF",
    "UCP",
    "CR",
    "LF",
    "CRLF",
    "BSR_ANYCRLF",
    "BSR_UNICODE",
    "NO_AUTO_POSSESS",
];

const MAX_CODEPOINT: u32 = 0x10FFFF;

type Check = Result<(), ValidationError>;

/// Semantic validator. One instance may be reused across trees; state is
/// reset on every root.
#[derive(Default)]
pub struct Validator {
    group_count: u32,
    named_groups: HashSet<String>,
    quantifier_depth: u32,
    lookbehind_depth: u32,
    class_depth: u32,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    fn fail(message: impl Into<String>) -> Check {
        Err(ValidationError::new(message))
    }

    /// Numeric group index must already be counted.
    fn check_group_index(&self, digits: &str, original: &str) -> Check {
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 && n <= self.group_count => Ok(()),
            _ => Self::fail(format!("Backreference to non-existent group: \\{}", original)),
        }
    }

    fn check_named(&self, name: &str) -> Check {
        if self.named_groups.contains(name) {
            Ok(())
        } else {
            Self::fail(format!("Backreference to non-existent named group: {}", name))
        }
    }

    /// Negative relative references count back from the current group.
    fn check_relative(&self, digits: &str) -> Check {
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 && n <= self.group_count => Ok(()),
            _ => Self::fail(format!("Relative backreference out of range: -{}", digits)),
        }
    }

    /// Validate every textual backreference form the parser produces:
    /// digits, `±n` (conditions), `g{N}`/`gN`/`g±N`/`g{name}`,
    /// `k<name>`/`k{name}`/`k'name'`, `<name>` and bare names.
    fn check_reference(&self, reference: &str) -> Check {
        if reference.is_empty() {
            return Self::fail("Empty backreference");
        }
        if reference.chars().all(|c| c.is_ascii_digit()) {
            return self.check_group_index(reference, reference);
        }
        if let Some(rest) = reference.strip_prefix('-') {
            return self.check_relative(rest);
        }
        if let Some(rest) = reference.strip_prefix('+') {
            // Forward relative references resolve against groups not yet
            // counted in pre-order; only their shape can be checked here
            return if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
                Ok(())
            } else {
                Self::fail(format!("Malformed backreference: \\{}", reference))
            };
        }
        if let Some(rest) = reference.strip_prefix('g') {
            let body = rest
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .unwrap_or(rest);
            if body == "0" {
                // \g{0} refers to the whole pattern
                return Ok(());
            }
            if let Some(negative) = body.strip_prefix('-') {
                return self.check_relative(negative);
            }
            if let Some(forward) = body.strip_prefix('+') {
                return if forward.chars().all(|c| c.is_ascii_digit()) && !forward.is_empty() {
                    Ok(())
                } else {
                    Self::fail(format!("Malformed backreference: \\{}", reference))
                };
            }
            if body.chars().all(|c| c.is_ascii_digit()) && !body.is_empty() {
                return self.check_group_index(body, reference);
            }
            return self.check_named(body);
        }
        if let Some(rest) = reference.strip_prefix('k') {
            let name = rest
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                .or_else(|| rest.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
                .or_else(|| rest.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
            return match name {
                Some(name) => self.check_named(name),
                None => Self::fail(format!("Malformed backreference: \\{}", reference)),
            };
        }
        if let Some(name) = reference.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            return self.check_named(name);
        }
        self.check_named(reference)
    }

    fn check_subroutine_reference(&self, reference: &str) -> Check {
        if reference == "R" || reference == "0" {
            return Ok(());
        }
        if let Some(rest) = reference.strip_prefix("R&") {
            return self.check_named(rest);
        }
        if let Some(rest) = reference.strip_prefix('R') {
            if rest.chars().all(|c| c.is_ascii_digit()) {
                return self.check_subroutine_index(rest, reference);
            }
        }
        if reference.chars().all(|c| c.is_ascii_digit()) {
            return self.check_subroutine_index(reference, reference);
        }
        if let Some(rest) = reference.strip_prefix('-') {
            return self.check_relative(rest);
        }
        if let Some(rest) = reference.strip_prefix('+') {
            return if rest.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() {
                Ok(())
            } else {
                Self::fail(format!("Malformed subroutine call: {}", reference))
            };
        }
        if self.named_groups.contains(reference) {
            Ok(())
        } else {
            Self::fail(format!("Subroutine call to non-existent group: {}", reference))
        }
    }

    fn check_subroutine_index(&self, digits: &str, original: &str) -> Check {
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 && n <= self.group_count => Ok(()),
            _ => Self::fail(format!("Subroutine call to non-existent group: {}", original)),
        }
    }

    /// Range endpoints must denote exactly one codepoint.
    fn endpoint_codepoint(node: &Node) -> Option<u32> {
        match node {
            Node::Literal(lit) => {
                let mut chars = lit.value.chars();
                let ch = chars.next()?;
                chars.next().is_none().then_some(ch as u32)
            }
            Node::CharLiteral(lit) => Some(lit.value as u32),
            Node::Unicode(code) => code.value(),
            Node::Octal(code) => code.value(),
            _ => None,
        }
    }
}

impl Visitor for Validator {
    type Output = Check;

    fn visit_regex(&mut self, node: &Regex) -> Check {
        self.group_count = 0;
        self.named_groups.clear();
        self.quantifier_depth = 0;
        self.lookbehind_depth = 0;
        self.class_depth = 0;
        node.pattern.accept(self)
    }

    fn visit_alternation(&mut self, node: &Alternation) -> Check {
        for alternative in &node.alternatives {
            alternative.accept(self)?;
        }
        Ok(())
    }

    fn visit_sequence(&mut self, node: &Sequence) -> Check {
        for child in &node.children {
            child.accept(self)?;
        }
        Ok(())
    }

    fn visit_group(&mut self, node: &Group) -> Check {
        if node.kind.is_counted() {
            self.group_count += 1;
        }
        if node.kind == GroupKind::Named {
            let name = node.name.as_deref().unwrap_or_default();
            if name.is_empty() {
                return Self::fail("Named group without a name");
            }
            if !self.named_groups.insert(name.to_string()) {
                return Self::fail(format!("Duplicate group name: {}", name));
            }
        }
        if node.kind.is_lookbehind() {
            self.lookbehind_depth += 1;
            let result = node.child.accept(self);
            self.lookbehind_depth -= 1;
            return result;
        }
        node.child.accept(self)
    }

    fn visit_quantifier(&mut self, node: &Quantifier) -> Check {
        if self.class_depth > 0 {
            return Self::fail("Quantifier inside character class");
        }
        if !QUANTIFIER_SHAPE.is_match(&node.quantifier) {
            return Self::fail(format!("Invalid quantifier: {}", node.quantifier));
        }
        let (min, max) = node
            .bounds()
            .ok_or_else(|| ValidationError::new(format!("Invalid quantifier: {}", node.quantifier)))?;
        if let Some(max) = max {
            if min > max {
                return Self::fail(format!(
                    "Numbers out of order in quantifier: {}",
                    node.quantifier
                ));
            }
        } else if self.lookbehind_depth > 0 {
            // *, + and {n,} have no upper bound
            return Self::fail(format!(
                "Variable-length quantifier inside lookbehind: {}",
                node.quantifier
            ));
        }
        if self.quantifier_depth > 0 {
            return Self::fail("Potential catastrophic backtracking: nested quantifiers");
        }
        self.quantifier_depth += 1;
        let result = node.child.accept(self);
        self.quantifier_depth -= 1;
        result
    }

    fn visit_literal(&mut self, _node: &Literal) -> Check {
        Ok(())
    }

    fn visit_char_literal(&mut self, _node: &CharLiteral) -> Check {
        Ok(())
    }

    fn visit_char_type(&mut self, node: &CharType) -> Check {
        if "dDwWsShHvVR".contains(node.letter) {
            Ok(())
        } else {
            Self::fail(format!("Unknown character type: \\{}", node.letter))
        }
    }

    fn visit_dot(&mut self, _node: &Dot) -> Check {
        Ok(())
    }

    fn visit_anchor(&mut self, _node: &Anchor) -> Check {
        Ok(())
    }

    fn visit_assertion(&mut self, node: &Assertion) -> Check {
        if "AzZGbB".contains(node.letter) {
            Ok(())
        } else {
            Self::fail(format!("Invalid assertion: \\{}", node.letter))
        }
    }

    fn visit_keep(&mut self, _node: &Keep) -> Check {
        if self.lookbehind_depth > 0 {
            return Self::fail("\\K is not allowed inside lookbehind");
        }
        Ok(())
    }

    fn visit_char_class(&mut self, node: &CharClass) -> Check {
        self.class_depth += 1;
        let result = node.expression.accept(self);
        self.class_depth -= 1;
        result
    }

    fn visit_range(&mut self, node: &Range) -> Check {
        let start = Self::endpoint_codepoint(&node.start);
        let end = Self::endpoint_codepoint(&node.end);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => Ok(()),
            (Some(_), Some(_)) => Self::fail("Range out of order in character class"),
            _ => Self::fail("Range endpoint must be a single character"),
        }
    }

    fn visit_backref(&mut self, node: &Backref) -> Check {
        self.check_reference(&node.reference)
    }

    fn visit_unicode(&mut self, node: &Unicode) -> Check {
        match node.value() {
            Some(value) if value <= MAX_CODEPOINT => Ok(()),
            Some(_) => Self::fail(format!("Character code exceeds 0x10FFFF: \\{}", node.code)),
            None => Self::fail(format!("Malformed character code: \\{}", node.code)),
        }
    }

    fn visit_octal(&mut self, node: &Octal) -> Check {
        match node.value() {
            Some(value) if value <= MAX_CODEPOINT => Ok(()),
            Some(_) => Self::fail(format!("Octal value exceeds 0x10FFFF: \\{}", node.code)),
            None => Self::fail(format!("Malformed octal code: \\{}", node.code)),
        }
    }

    fn visit_unicode_prop(&mut self, node: &UnicodeProp) -> Check {
        let name = node.name.strip_prefix('^').unwrap_or(&node.name);
        if UNICODE_PROPERTIES.contains(&name) {
            Ok(())
        } else {
            Self::fail(format!("Unknown Unicode property: {}", node.name))
        }
    }

    fn visit_posix_class(&mut self, node: &PosixClass) -> Check {
        if POSIX_CLASSES.contains(&node.name.as_str()) {
            Ok(())
        } else {
            Self::fail(format!("Unknown POSIX class: {}", node.name))
        }
    }

    fn visit_comment(&mut self, _node: &Comment) -> Check {
        Ok(())
    }

    fn visit_conditional(&mut self, node: &Conditional) -> Check {
        node.condition.accept(self)?;
        node.yes.accept(self)?;
        match &node.no {
            Some(no) => no.accept(self),
            None => Ok(()),
        }
    }

    fn visit_subroutine(&mut self, node: &Subroutine) -> Check {
        self.check_subroutine_reference(&node.reference)
    }

    fn visit_pcre_verb(&mut self, node: &PcreVerb) -> Check {
        if VERBS.contains(&node.head()) {
            Ok(())
        } else {
            Self::fail(format!("Unknown verb: (*{})", node.verb))
        }
    }

    fn visit_define(&mut self, node: &Define) -> Check {
        node.content.accept(self)
    }

    fn visit_limit_match(&mut self, _node: &LimitMatch) -> Check {
        Ok(())
    }

    fn visit_callout(&mut self, _node: &Callout) -> Check {
        Ok(())
    }

    fn visit_class_operation(&mut self, node: &ClassOperation) -> Check {
        node.left.accept(self)?;
        node.right.accept(self)
    }

    fn visit_control_char(&mut self, _node: &ControlChar) -> Check {
        Ok(())
    }

    fn visit_script_run(&mut self, _node: &ScriptRun) -> Check {
        Ok(())
    }

    fn visit_version_condition(&mut self, node: &VersionCondition) -> Check {
        if node.operator == ">=" || node.operator == "=" {
            Ok(())
        } else {
            Self::fail(format!("Invalid version operator: {}", node.operator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;

    fn validate(input: &str) -> Check {
        let regex = Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed");
        regex.accept(&mut Validator::new())
    }

    fn validate_err(input: &str) -> String {
        validate(input).expect_err("expected validation failure").message
    }

    #[test]
    fn test_simple_patterns_pass() {
        assert!(validate("/(a|b)c/").is_ok());
        assert!(validate("/^foo.*bar$/").is_ok());
        assert!(validate(r"/([a-z])\1/").is_ok());
        assert!(validate("/a{2,4}?b+/").is_ok());
    }

    #[test]
    fn test_backref_out_of_scope() {
        assert_eq!(
            validate_err(r"/([a-z])\2/"),
            "Backreference to non-existent group: \\2"
        );
    }

    #[test]
    fn test_backref_must_follow_group() {
        // Pre-order counting: the reference comes before the group opens
        assert!(validate(r"/\1(a)/").is_err());
    }

    #[test]
    fn test_named_backref_scope() {
        assert!(validate(r"/(?<x>a)\k<x>/").is_ok());
        assert!(validate_err(r"/\k<x>(?<x>a)/").contains("non-existent named group"));
    }

    #[test]
    fn test_g_reference_forms() {
        assert!(validate(r"/(a)\g{1}/").is_ok());
        assert!(validate(r"/(a)\g1/").is_ok());
        assert!(validate(r"/(a)\g{-1}/").is_ok());
        assert!(validate(r"/(a)\g{0}/").is_ok());
        assert!(validate(r"/(a)\g{2}/").is_err());
        assert!(validate(r"/(a)\g{-2}/").is_err());
    }

    #[test]
    fn test_nested_quantifiers_rejected() {
        assert_eq!(
            validate_err("/(a+)*/"),
            "Potential catastrophic backtracking: nested quantifiers"
        );
        assert!(validate("/(a+)(b*)/").is_ok());
        assert_eq!(
            validate_err("/(?:a{2}){3}/"),
            "Potential catastrophic backtracking: nested quantifiers"
        );
    }

    #[test]
    fn test_lookbehind_restrictions() {
        assert!(validate("/(?<=ab)c/").is_ok());
        assert!(validate("/(?<=a{3})c/").is_ok());
        assert!(validate_err("/(?<=a*)c/").contains("lookbehind"));
        assert!(validate_err("/(?<=a+)c/").contains("lookbehind"));
        assert!(validate_err("/(?<=a{2,})c/").contains("lookbehind"));
        assert!(validate_err(r"/(?<=a\K)c/").contains("\\K"));
        // Variable quantifiers are fine in lookaheads
        assert!(validate("/(?=a*)c/").is_ok());
    }

    #[test]
    fn test_duplicate_group_names() {
        assert!(validate_err("/(?<x>a)(?<x>b)/").contains("Duplicate group name"));
    }

    #[test]
    fn test_quantifier_order() {
        assert!(validate_err("/a{4,2}/").contains("out of order"));
    }

    #[test]
    fn test_range_order() {
        assert!(validate("/[a-z]/").is_ok());
        assert!(validate_err("/[z-a]/").contains("Range out of order"));
        assert!(validate(r"/[\x41-\x45]/").is_ok());
        assert!(validate_err(r"/[a-\d]/").contains("single character"));
    }

    #[test]
    fn test_character_codes() {
        assert!(validate(r"/\x{10FFFF}/").is_ok());
        assert!(validate_err(r"/\x{110000}/").contains("0x10FFFF"));
        assert!(validate(r"/\o{17}/").is_ok());
        assert!(validate_err(r"/\o{7777777}/").contains("0x10FFFF"));
    }

    #[test]
    fn test_posix_names() {
        assert!(validate("/[[:alpha:]]/").is_ok());
        assert!(validate_err("/[[:alfa:]]/").contains("Unknown POSIX class"));
    }

    #[test]
    fn test_unicode_property_names() {
        assert!(validate(r"/\p{L}/").is_ok());
        assert!(validate(r"/\p{^N}/").is_ok());
        assert!(validate(r"/\pL/").is_ok());
        assert!(validate_err(r"/\p{Greek}/").contains("Unknown Unicode property"));
    }

    #[test]
    fn test_subroutine_scope() {
        assert!(validate("/(?R)/").is_ok());
        assert!(validate("/(?0)/").is_ok());
        assert!(validate("/(a)(?1)/").is_ok());
        assert!(validate_err("/(a)(?2)/").contains("non-existent group"));
        assert!(validate("/(?<x>a)(?&x)/").is_ok());
        assert!(validate_err("/(?&x)(?<x>a)/").contains("non-existent group"));
    }

    #[test]
    fn test_verbs() {
        assert!(validate("/(*COMMIT)a/").is_ok());
        assert!(validate("/(*MARK:here)a/").is_ok());
        assert!(validate_err("/(*BOOM)a/").contains("Unknown verb"));
    }

    #[test]
    fn test_state_resets_between_roots() {
        let mut validator = Validator::new();
        let first = Parser::new(lex("/(?<x>a)/").expect("lex"))
            .parse()
            .expect("parse");
        assert!(first.accept(&mut validator).is_ok());
        // The name table from the first tree must not leak into the second
        let second = Parser::new(lex(r"/\k<x>/").expect("lex"))
            .parse()
            .expect("parse");
        assert!(second.accept(&mut validator).is_err());
    }
}
