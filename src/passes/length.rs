//! Length Range - Minimum and Maximum Match Width
//!
//! Computes the `(min, max)` character-width envelope of any match, with
//! `None` as the unbounded maximum. Sequences sum componentwise and
//! alternations take the envelope; quantifiers multiply by their decoded
//! bounds. Backreferences and subroutine calls have unknowable width and
//! report `(0, unbounded)`. Arithmetic saturates rather than overflowing
//! on pathological bounds.

use serde::{Deserialize, Serialize};

use crate::core::nodes::*;
use crate::core::visitor::Visitor;

/// Match-width envelope. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl LengthRange {
    pub fn exact(width: u32) -> Self {
        LengthRange {
            min: width,
            max: Some(width),
        }
    }

    pub fn unbounded(min: u32) -> Self {
        LengthRange { min, max: None }
    }

    /// Componentwise sum; an unbounded side absorbs the maximum.
    fn add(self, other: LengthRange) -> LengthRange {
        LengthRange {
            min: self.min.saturating_add(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                _ => None,
            },
        }
    }

    /// Envelope of two alternatives.
    fn envelope(self, other: LengthRange) -> LengthRange {
        LengthRange {
            min: self.min.min(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            },
        }
    }

    /// Width under repetition bounds.
    fn repeat(self, times_min: u32, times_max: Option<u32>) -> LengthRange {
        LengthRange {
            min: self.min.saturating_mul(times_min),
            max: match (self.max, times_max) {
                (Some(width), Some(times)) => Some(width.saturating_mul(times)),
                _ => None,
            },
        }
    }
}

/// Visitor computing the width envelope of a pattern.
#[derive(Default)]
pub struct LengthAnalyzer;

impl LengthAnalyzer {
    pub fn new() -> Self {
        LengthAnalyzer
    }

    /// Analyse in one call.
    pub fn analyze(regex: &Regex) -> LengthRange {
        regex.accept(&mut LengthAnalyzer::new())
    }
}

impl Visitor for LengthAnalyzer {
    type Output = LengthRange;

    fn visit_regex(&mut self, node: &Regex) -> LengthRange {
        node.pattern.accept(self)
    }

    fn visit_alternation(&mut self, node: &Alternation) -> LengthRange {
        let mut alternatives = node.alternatives.iter();
        let mut range = match alternatives.next() {
            Some(first) => first.accept(self),
            None => LengthRange::exact(0),
        };
        for alternative in alternatives {
            range = range.envelope(alternative.accept(self));
        }
        range
    }

    fn visit_sequence(&mut self, node: &Sequence) -> LengthRange {
        let mut range = LengthRange::exact(0);
        for child in &node.children {
            range = range.add(child.accept(self));
        }
        range
    }

    fn visit_group(&mut self, node: &Group) -> LengthRange {
        if node.kind.is_lookaround() {
            return LengthRange::exact(0);
        }
        node.child.accept(self)
    }

    fn visit_quantifier(&mut self, node: &Quantifier) -> LengthRange {
        let child = node.child.accept(self);
        match node.bounds() {
            Some((min, max)) => child.repeat(min, max),
            // Malformed quantifier text; the validator rejects this shape
            None => LengthRange::unbounded(0),
        }
    }

    fn visit_literal(&mut self, node: &Literal) -> LengthRange {
        LengthRange::exact(node.value.chars().count() as u32)
    }

    fn visit_char_literal(&mut self, _node: &CharLiteral) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_char_type(&mut self, _node: &CharType) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_dot(&mut self, _node: &Dot) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_anchor(&mut self, _node: &Anchor) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_assertion(&mut self, _node: &Assertion) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_keep(&mut self, _node: &Keep) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_char_class(&mut self, _node: &CharClass) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_range(&mut self, _node: &Range) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_backref(&mut self, _node: &Backref) -> LengthRange {
        LengthRange::unbounded(0)
    }

    fn visit_unicode(&mut self, _node: &Unicode) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_octal(&mut self, _node: &Octal) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_unicode_prop(&mut self, _node: &UnicodeProp) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_posix_class(&mut self, _node: &PosixClass) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_comment(&mut self, _node: &Comment) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_conditional(&mut self, node: &Conditional) -> LengthRange {
        let yes = node.yes.accept(self);
        let no = match &node.no {
            Some(no) => no.accept(self),
            None => LengthRange::exact(0),
        };
        yes.envelope(no)
    }

    fn visit_subroutine(&mut self, _node: &Subroutine) -> LengthRange {
        LengthRange::unbounded(0)
    }

    fn visit_pcre_verb(&mut self, _node: &PcreVerb) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_define(&mut self, _node: &Define) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_limit_match(&mut self, _node: &LimitMatch) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_callout(&mut self, _node: &Callout) -> LengthRange {
        LengthRange::exact(0)
    }

    fn visit_class_operation(&mut self, _node: &ClassOperation) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_control_char(&mut self, _node: &ControlChar) -> LengthRange {
        LengthRange::exact(1)
    }

    fn visit_script_run(&mut self, _node: &ScriptRun) -> LengthRange {
        LengthRange::unbounded(0)
    }

    fn visit_version_condition(&mut self, _node: &VersionCondition) -> LengthRange {
        LengthRange::exact(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;

    fn analyze(input: &str) -> LengthRange {
        let regex = Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed");
        LengthAnalyzer::analyze(&regex)
    }

    #[test]
    fn test_fixed_width() {
        assert_eq!(analyze("/(a|b)c/"), LengthRange::exact(2));
        assert_eq!(analyze("/abc/"), LengthRange::exact(3));
    }

    #[test]
    fn test_anchors_are_zero_width() {
        assert_eq!(analyze("/^foo.*bar$/"), LengthRange::unbounded(6));
    }

    #[test]
    fn test_backref_is_unbounded() {
        assert_eq!(analyze(r"/([a-z])\1/"), LengthRange::unbounded(1));
    }

    #[test]
    fn test_quantifier_bounds() {
        assert_eq!(analyze("/a{2,4}/"), LengthRange { min: 2, max: Some(4) });
        assert_eq!(analyze("/a{3,}/"), LengthRange::unbounded(3));
        assert_eq!(analyze("/a?/"), LengthRange { min: 0, max: Some(1) });
        assert_eq!(analyze("/(ab){2}/"), LengthRange::exact(4));
    }

    #[test]
    fn test_alternation_envelope() {
        assert_eq!(analyze("/ab|cde/"), LengthRange { min: 2, max: Some(3) });
        assert_eq!(analyze("/ab|c*/"), LengthRange::unbounded(0));
    }

    #[test]
    fn test_lookarounds_are_transparent_zero() {
        assert_eq!(analyze("/(?=abc)x/"), LengthRange::exact(1));
        assert_eq!(analyze("/(?<=abc)x/"), LengthRange::exact(1));
    }

    #[test]
    fn test_conditional_envelope() {
        assert_eq!(
            analyze("/(a)(?(1)bb|c)/"),
            LengthRange { min: 2, max: Some(3) }
        );
        assert_eq!(analyze("/(a)(?(1)bb)/"), LengthRange { min: 1, max: Some(3) });
    }

    #[test]
    fn test_class_and_escapes_are_width_one() {
        assert_eq!(analyze(r"/[a-z]\d\x41\p{L}[[:alpha:]]/"), LengthRange::exact(5));
    }

    #[test]
    fn test_subroutine_unbounded() {
        assert_eq!(analyze("/(a)(?1)/"), LengthRange::unbounded(1));
    }
}
