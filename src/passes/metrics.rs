//! Metrics - Node Histogram and Tree Depth
//!
//! Depth-first walk producing a per-variant count, the node total and the
//! maximum concurrent depth (the root sits at depth 1). The visitor can be
//! reused; state resets on every root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::nodes::*;
use crate::core::visitor::Visitor;

/// Result of a metrics run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counts: BTreeMap<String, u32>,
    pub total: u32,
    #[serde(rename = "maxDepth")]
    pub max_depth: u32,
}

/// Counting visitor. Run with `regex.accept(&mut metrics)`, then read
/// `snapshot()`.
#[derive(Default)]
pub struct Metrics {
    counts: BTreeMap<String, u32>,
    total: u32,
    depth: u32,
    max_depth: u32,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Measure in one call.
    pub fn measure(regex: &Regex) -> MetricsSnapshot {
        let mut metrics = Metrics::new();
        regex.accept(&mut metrics);
        metrics.snapshot()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counts: self.counts.clone(),
            total: self.total,
            max_depth: self.max_depth,
        }
    }

    fn enter(&mut self, name: &'static str) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.total += 1;
        *self.counts.entry(name.to_string()).or_insert(0) += 1;
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

impl Visitor for Metrics {
    type Output = ();

    fn visit_regex(&mut self, node: &Regex) {
        self.counts.clear();
        self.total = 0;
        self.depth = 0;
        self.max_depth = 0;
        self.enter("Regex");
        node.pattern.accept(self);
        self.leave();
    }

    fn visit_alternation(&mut self, node: &Alternation) {
        self.enter("Alternation");
        for alternative in &node.alternatives {
            alternative.accept(self);
        }
        self.leave();
    }

    fn visit_sequence(&mut self, node: &Sequence) {
        self.enter("Sequence");
        for child in &node.children {
            child.accept(self);
        }
        self.leave();
    }

    fn visit_group(&mut self, node: &Group) {
        self.enter("Group");
        node.child.accept(self);
        self.leave();
    }

    fn visit_quantifier(&mut self, node: &Quantifier) {
        self.enter("Quantifier");
        node.child.accept(self);
        self.leave();
    }

    fn visit_literal(&mut self, _node: &Literal) {
        self.enter("Literal");
        self.leave();
    }

    fn visit_char_literal(&mut self, _node: &CharLiteral) {
        self.enter("CharLiteral");
        self.leave();
    }

    fn visit_char_type(&mut self, _node: &CharType) {
        self.enter("CharType");
        self.leave();
    }

    fn visit_dot(&mut self, _node: &Dot) {
        self.enter("Dot");
        self.leave();
    }

    fn visit_anchor(&mut self, _node: &Anchor) {
        self.enter("Anchor");
        self.leave();
    }

    fn visit_assertion(&mut self, _node: &Assertion) {
        self.enter("Assertion");
        self.leave();
    }

    fn visit_keep(&mut self, _node: &Keep) {
        self.enter("Keep");
        self.leave();
    }

    fn visit_char_class(&mut self, node: &CharClass) {
        self.enter("CharClass");
        node.expression.accept(self);
        self.leave();
    }

    fn visit_range(&mut self, node: &Range) {
        self.enter("Range");
        node.start.accept(self);
        node.end.accept(self);
        self.leave();
    }

    fn visit_backref(&mut self, _node: &Backref) {
        self.enter("Backref");
        self.leave();
    }

    fn visit_unicode(&mut self, _node: &Unicode) {
        self.enter("Unicode");
        self.leave();
    }

    fn visit_octal(&mut self, _node: &Octal) {
        self.enter("Octal");
        self.leave();
    }

    fn visit_unicode_prop(&mut self, _node: &UnicodeProp) {
        self.enter("UnicodeProp");
        self.leave();
    }

    fn visit_posix_class(&mut self, _node: &PosixClass) {
        self.enter("PosixClass");
        self.leave();
    }

    fn visit_comment(&mut self, _node: &Comment) {
        self.enter("Comment");
        self.leave();
    }

    fn visit_conditional(&mut self, node: &Conditional) {
        self.enter("Conditional");
        node.condition.accept(self);
        node.yes.accept(self);
        if let Some(no) = &node.no {
            no.accept(self);
        }
        self.leave();
    }

    fn visit_subroutine(&mut self, _node: &Subroutine) {
        self.enter("Subroutine");
        self.leave();
    }

    fn visit_pcre_verb(&mut self, _node: &PcreVerb) {
        self.enter("PcreVerb");
        self.leave();
    }

    fn visit_define(&mut self, node: &Define) {
        self.enter("Define");
        node.content.accept(self);
        self.leave();
    }

    fn visit_limit_match(&mut self, _node: &LimitMatch) {
        self.enter("LimitMatch");
        self.leave();
    }

    fn visit_callout(&mut self, _node: &Callout) {
        self.enter("Callout");
        self.leave();
    }

    fn visit_class_operation(&mut self, node: &ClassOperation) {
        self.enter("ClassOperation");
        node.left.accept(self);
        node.right.accept(self);
        self.leave();
    }

    fn visit_control_char(&mut self, _node: &ControlChar) {
        self.enter("ControlChar");
        self.leave();
    }

    fn visit_script_run(&mut self, _node: &ScriptRun) {
        self.enter("ScriptRun");
        self.leave();
    }

    fn visit_version_condition(&mut self, _node: &VersionCondition) {
        self.enter("VersionCondition");
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;

    fn measure(input: &str) -> MetricsSnapshot {
        let regex = Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed");
        Metrics::measure(&regex)
    }

    #[test]
    fn test_counts_and_total_agree() {
        let snapshot = measure("/(a|b)c*[x-z]/");
        let sum: u32 = snapshot.counts.values().sum();
        assert_eq!(snapshot.total, sum);
        assert_eq!(snapshot.counts.get("Regex"), Some(&1));
        assert_eq!(snapshot.counts.get("Group"), Some(&1));
        assert_eq!(snapshot.counts.get("Alternation"), Some(&1));
        assert_eq!(snapshot.counts.get("Quantifier"), Some(&1));
        assert_eq!(snapshot.counts.get("CharClass"), Some(&1));
        assert_eq!(snapshot.counts.get("Range"), Some(&1));
    }

    #[test]
    fn test_depth_counts_root() {
        let snapshot = measure("/a/");
        // Regex -> Literal
        assert_eq!(snapshot.max_depth, 2);
        assert_eq!(snapshot.total, 2);
    }

    #[test]
    fn test_depth_follows_nesting() {
        let shallow = measure("/ab/");
        let deep = measure("/((((a))))/");
        assert!(deep.max_depth > shallow.max_depth);
        assert_eq!(deep.max_depth, 6);
    }

    #[test]
    fn test_state_resets_between_roots() {
        let mut metrics = Metrics::new();
        let first = Parser::new(lex("/abc/").expect("lex")).parse().expect("parse");
        first.accept(&mut metrics);
        let second = Parser::new(lex("/x/").expect("lex")).parse().expect("parse");
        second.accept(&mut metrics);
        assert_eq!(metrics.snapshot().total, 2);
    }
}
