//! Literal Extractor - Guaranteed Prefixes and Suffixes
//!
//! Computes a `LiteralSet` for a pattern: a finite set of strings one of
//! which every match is guaranteed to start with, a set one of which every
//! match ends with, and a `complete` bit meaning the sets enumerate the
//! exact full matching strings. The algebra:
//!
//!   - concatenation multiplies sets out while the left (for prefixes) or
//!     right (for suffixes) operand stays complete
//!   - alternation unions sets, dropping completeness unless both sides
//!     keep it, and degrades to no-information when either side has none
//!   - any operation growing past 128 strings collapses to no-information
//!
//! Case-insensitive scopes (the `i` flag, inline-flag groups) expand
//! literals into their case variants, bailing above 8 characters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::nodes::*;
use crate::core::visitor::Visitor;

/// Cap on the number of distinct strings a set may hold before the
/// analysis gives up on the subtree.
pub const MAX_LITERALS: usize = 128;

/// Longest literal that case expansion will enumerate.
const MAX_CASE_EXPANSION_LEN: usize = 8;

/// Guaranteed literal information for one subtree.
///
/// The empty set signals "no useful information"; the singleton `{""}`
/// signals "matches exactly the empty string" and is what zero-width nodes
/// contribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiteralSet {
    pub prefixes: BTreeSet<String>,
    pub suffixes: BTreeSet<String>,
    pub complete: bool,
}

impl LiteralSet {
    /// No useful information.
    pub fn empty() -> Self {
        LiteralSet::default()
    }

    /// The exact-match set of a fixed string.
    pub fn from_string(value: &str) -> Self {
        let mut set = BTreeSet::new();
        set.insert(value.to_string());
        LiteralSet {
            prefixes: set.clone(),
            suffixes: set,
            complete: true,
        }
    }

    /// True when this set carries no information at all.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.suffixes.is_empty()
    }

    fn capped(prefixes: BTreeSet<String>, suffixes: BTreeSet<String>, complete: bool) -> Self {
        if prefixes.len() > MAX_LITERALS || suffixes.len() > MAX_LITERALS {
            return LiteralSet::empty();
        }
        LiteralSet {
            prefixes,
            suffixes,
            complete,
        }
    }

    fn cross(left: &BTreeSet<String>, right: &BTreeSet<String>) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for a in left {
            for b in right {
                out.insert(format!("{}{}", a, b));
                if out.len() > MAX_LITERALS {
                    return out;
                }
            }
        }
        out
    }

    /// Sequence composition. A complete left side multiplies out against
    /// the right side's prefixes, except that an information-free right
    /// side leaves the left side's prefixes standing (the guarantee still
    /// holds, only completeness is lost). Suffixes mirror the rule from
    /// the right: a complete right side crosses against the accumulated
    /// suffixes, so a suffix set already lost stays lost.
    pub fn concat(&self, other: &LiteralSet) -> LiteralSet {
        let prefixes = if self.complete && !other.prefixes.is_empty() {
            Self::cross(&self.prefixes, &other.prefixes)
        } else {
            self.prefixes.clone()
        };
        let suffixes = if other.complete {
            Self::cross(&self.suffixes, &other.suffixes)
        } else {
            other.suffixes.clone()
        };
        Self::capped(prefixes, suffixes, self.complete && other.complete)
    }

    /// Alternation composition. A guarantee must hold for every branch, so
    /// a component missing on either side is missing from the union.
    pub fn unite(&self, other: &LiteralSet) -> LiteralSet {
        let prefixes: BTreeSet<String> =
            if self.prefixes.is_empty() || other.prefixes.is_empty() {
                BTreeSet::new()
            } else {
                self.prefixes.union(&other.prefixes).cloned().collect()
            };
        let suffixes: BTreeSet<String> =
            if self.suffixes.is_empty() || other.suffixes.is_empty() {
                BTreeSet::new()
            } else {
                self.suffixes.union(&other.suffixes).cloned().collect()
            };
        let complete = self.complete && other.complete && !prefixes.is_empty();
        Self::capped(prefixes, suffixes, complete)
    }

    /// All case spellings of `value`, or no-information when the expansion
    /// would be too large.
    pub fn expand_case_insensitive(value: &str) -> LiteralSet {
        if value.chars().count() > MAX_CASE_EXPANSION_LEN {
            return LiteralSet::empty();
        }
        let mut variants: BTreeSet<String> = BTreeSet::new();
        variants.insert(String::new());
        for ch in value.chars() {
            let lower: String = ch.to_lowercase().collect();
            let upper: String = ch.to_uppercase().collect();
            let mut next = BTreeSet::new();
            for variant in &variants {
                if lower == upper {
                    next.insert(format!("{}{}", variant, ch));
                } else {
                    next.insert(format!("{}{}", variant, lower));
                    next.insert(format!("{}{}", variant, upper));
                }
            }
            if next.len() > MAX_LITERALS {
                return LiteralSet::empty();
            }
            variants = next;
        }
        LiteralSet {
            prefixes: variants.clone(),
            suffixes: variants,
            complete: true,
        }
    }
}

/// Visitor computing the `LiteralSet` of a pattern. The case-insensitive
/// scope is a stack: the root pushes the `i` flag, inline-flag groups push
/// and pop their own scope.
pub struct LiteralExtractor {
    case_scopes: Vec<bool>,
}

impl LiteralExtractor {
    pub fn new() -> Self {
        LiteralExtractor {
            case_scopes: vec![false],
        }
    }

    /// Extract in one call.
    pub fn extract(regex: &Regex) -> LiteralSet {
        regex.accept(&mut LiteralExtractor::new())
    }

    fn case_insensitive(&self) -> bool {
        *self.case_scopes.last().unwrap_or(&false)
    }

    fn literal_set(&self, value: &str) -> LiteralSet {
        if self.case_insensitive() {
            LiteralSet::expand_case_insensitive(value)
        } else {
            LiteralSet::from_string(value)
        }
    }

    /// Effect of an inline-flag string like `i`, `-i` or `m-ix` on the
    /// case scope; `None` inherits.
    fn scope_from_flags(flags: &str) -> Option<bool> {
        let (enabled, disabled) = match flags.split_once('-') {
            Some((enabled, disabled)) => (enabled, disabled),
            None => (flags, ""),
        };
        if disabled.contains('i') {
            Some(false)
        } else if enabled.contains('i') {
            Some(true)
        } else {
            None
        }
    }

    /// Single-character alternatives of a class expression, or `None` when
    /// the class holds anything but plain literals.
    fn class_members(expression: &Node) -> Option<Vec<String>> {
        let member = |node: &Node| -> Option<String> {
            match node {
                Node::Literal(lit) => Some(lit.value.clone()),
                Node::CharLiteral(lit) => Some(lit.value.to_string()),
                _ => None,
            }
        };
        match expression {
            Node::Alternation(alt) => alt.alternatives.iter().map(member).collect(),
            single => member(single).map(|value| vec![value]),
        }
    }
}

impl Default for LiteralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for LiteralExtractor {
    type Output = LiteralSet;

    fn visit_regex(&mut self, node: &Regex) -> LiteralSet {
        self.case_scopes = vec![node.has_flag('i')];
        node.pattern.accept(self)
    }

    fn visit_alternation(&mut self, node: &Alternation) -> LiteralSet {
        let mut alternatives = node.alternatives.iter();
        let mut set = match alternatives.next() {
            Some(first) => first.accept(self),
            None => return LiteralSet::empty(),
        };
        for alternative in alternatives {
            set = set.unite(&alternative.accept(self));
        }
        set
    }

    fn visit_sequence(&mut self, node: &Sequence) -> LiteralSet {
        let mut set = LiteralSet::from_string("");
        for child in &node.children {
            set = set.concat(&child.accept(self));
        }
        set
    }

    fn visit_group(&mut self, node: &Group) -> LiteralSet {
        if node.kind.is_lookaround() {
            return LiteralSet::from_string("");
        }
        if node.kind == GroupKind::InlineFlags {
            let scope = node
                .flags
                .as_deref()
                .and_then(Self::scope_from_flags)
                .unwrap_or_else(|| self.case_insensitive());
            self.case_scopes.push(scope);
            let set = node.child.accept(self);
            self.case_scopes.pop();
            return set;
        }
        node.child.accept(self)
    }

    fn visit_quantifier(&mut self, node: &Quantifier) -> LiteralSet {
        match node.bounds() {
            Some((min, Some(max))) if min == max => {
                if min == 0 {
                    return LiteralSet::from_string("");
                }
                let child = node.child.accept(self);
                let mut set = LiteralSet::from_string("");
                for _ in 0..min {
                    set = set.concat(&child);
                }
                set
            }
            Some((min, _)) if min >= 1 => {
                // The literal occurs at least once; everything after the
                // first repetition is unknown, so the suffix is lost
                let child = node.child.accept(self);
                LiteralSet {
                    prefixes: child.prefixes,
                    suffixes: BTreeSet::new(),
                    complete: false,
                }
            }
            _ => LiteralSet::empty(),
        }
    }

    fn visit_literal(&mut self, node: &Literal) -> LiteralSet {
        self.literal_set(&node.value)
    }

    fn visit_char_literal(&mut self, node: &CharLiteral) -> LiteralSet {
        self.literal_set(&node.value.to_string())
    }

    fn visit_char_type(&mut self, _node: &CharType) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_dot(&mut self, _node: &Dot) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_anchor(&mut self, _node: &Anchor) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_assertion(&mut self, _node: &Assertion) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_keep(&mut self, _node: &Keep) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_char_class(&mut self, node: &CharClass) -> LiteralSet {
        if node.negated {
            return LiteralSet::empty();
        }
        let Some(members) = Self::class_members(&node.expression) else {
            return LiteralSet::empty();
        };
        let mut set = LiteralSet::empty();
        let mut first = true;
        for member in members {
            let member_set = self.literal_set(&member);
            set = if first { member_set } else { set.unite(&member_set) };
            first = false;
        }
        set
    }

    fn visit_range(&mut self, _node: &Range) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_backref(&mut self, _node: &Backref) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_unicode(&mut self, _node: &Unicode) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_octal(&mut self, _node: &Octal) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_unicode_prop(&mut self, _node: &UnicodeProp) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_posix_class(&mut self, _node: &PosixClass) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_comment(&mut self, _node: &Comment) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_conditional(&mut self, _node: &Conditional) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_subroutine(&mut self, _node: &Subroutine) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_pcre_verb(&mut self, _node: &PcreVerb) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_define(&mut self, _node: &Define) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_limit_match(&mut self, _node: &LimitMatch) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_callout(&mut self, _node: &Callout) -> LiteralSet {
        LiteralSet::from_string("")
    }

    fn visit_class_operation(&mut self, _node: &ClassOperation) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_control_char(&mut self, _node: &ControlChar) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_script_run(&mut self, _node: &ScriptRun) -> LiteralSet {
        LiteralSet::empty()
    }

    fn visit_version_condition(&mut self, _node: &VersionCondition) -> LiteralSet {
        LiteralSet::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;

    fn extract(input: &str) -> LiteralSet {
        let regex = Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed");
        LiteralExtractor::extract(&regex)
    }

    fn strings(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_literal_is_complete() {
        let set = extract("/hello/");
        assert_eq!(set.prefixes, strings(&["hello"]));
        assert_eq!(set.suffixes, strings(&["hello"]));
        assert!(set.complete);
    }

    #[test]
    fn test_alternation_of_literals() {
        let set = extract("/(a|b)c/");
        assert_eq!(set.prefixes, strings(&["ac", "bc"]));
        assert_eq!(set.suffixes, strings(&["ac", "bc"]));
        assert!(set.complete);
    }

    #[test]
    fn test_anchored_prefix_with_dot_star() {
        let set = extract("/^foo.*bar$/");
        assert_eq!(set.prefixes, strings(&["foo"]));
        assert!(set.suffixes.is_empty());
        assert!(!set.complete);
    }

    #[test]
    fn test_exact_quantifier_unrolls() {
        let set = extract("/ab{2}c/");
        assert_eq!(set.prefixes, strings(&["abbc"]));
        assert!(set.complete);
    }

    #[test]
    fn test_zero_quantifier_is_empty_string() {
        let set = extract("/a{0}b/");
        assert_eq!(set.prefixes, strings(&["b"]));
        assert!(set.complete);
    }

    #[test]
    fn test_plus_keeps_prefix_loses_suffix() {
        let set = extract("/ab+/");
        assert_eq!(set.prefixes, strings(&["ab"]));
        assert!(set.suffixes.is_empty());
        assert!(!set.complete);
    }

    #[test]
    fn test_star_yields_no_information() {
        let set = extract("/a*/");
        assert!(set.is_empty());
    }

    #[test]
    fn test_char_class_of_literals() {
        let set = extract("/[abc]/");
        assert_eq!(set.prefixes, strings(&["a", "b", "c"]));
        assert!(set.complete);
    }

    #[test]
    fn test_char_class_with_range_is_opaque() {
        assert!(extract("/[a-c]/").is_empty());
        assert!(extract("/[^a]/").is_empty());
    }

    #[test]
    fn test_case_insensitive_expansion() {
        let set = extract("/ab/i");
        assert_eq!(set.prefixes, strings(&["AB", "Ab", "aB", "ab"]));
        assert!(set.complete);
    }

    #[test]
    fn test_case_expansion_bails_on_long_literals() {
        assert!(extract("/verylongword/i").is_empty());
        // Without the flag the literal survives unexpanded
        assert!(!extract("/verylongword/").is_empty());
    }

    #[test]
    fn test_inline_flag_scope() {
        // Only the scoped part expands
        let set = extract("/a(?i:b)c/");
        assert_eq!(set.prefixes, strings(&["aBc", "abc"]));
        assert!(set.complete);
    }

    #[test]
    fn test_inline_flag_disable_scope() {
        let set = extract("/(?-i:ab)/i");
        assert_eq!(set.prefixes, strings(&["ab"]));
    }

    #[test]
    fn test_lookaround_contributes_empty_string() {
        let set = extract("/(?=x)ab/");
        assert_eq!(set.prefixes, strings(&["ab"]));
        assert!(set.complete);
    }

    #[test]
    fn test_opaque_branch_poisons_alternation() {
        let set = extract(r"/(a|\d)/");
        assert!(set.is_empty());
    }

    #[test]
    fn test_backref_breaks_suffix_chain() {
        let set = extract(r"/(abc)\1/");
        assert_eq!(set.prefixes, strings(&["abc"]));
        assert!(set.suffixes.is_empty());
        assert!(!set.complete);
    }

    #[test]
    fn test_cap_collapses_oversized_sets() {
        // 2^10 case spellings exceed the cap through concat of expansions
        let set = extract("/abcdefgh/i");
        assert!(set.prefixes.len() <= MAX_LITERALS);
        let oversized = extract("/abcd(?:efgh)ijkl/i");
        assert!(oversized.prefixes.len() <= MAX_LITERALS);
    }

    #[test]
    fn test_concat_with_incomplete_left_keeps_left_prefixes() {
        let incomplete = LiteralSet {
            prefixes: strings(&["x"]),
            suffixes: strings(&["x"]),
            complete: false,
        };
        let complete = LiteralSet::from_string("y");
        let combined = incomplete.concat(&complete);
        assert_eq!(combined.prefixes, strings(&["x"]));
        assert_eq!(combined.suffixes, strings(&["xy"]));
        assert!(!combined.complete);
    }
}
