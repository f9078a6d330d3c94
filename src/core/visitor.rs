//! Visitor Protocol - Double Dispatch over the AST
//!
//! Every pass in this crate is a visitor: a type with one method per node
//! variant, parametrised by a result type through the associated `Output`.
//! `Node::accept` performs the dispatch; traversal order is entirely the
//! visitor's business, and visitors may carry push/pop-disciplined mutable
//! state (flag scopes, quantifier depth, group counters).
//!
//! Two reusable behaviours are provided:
//!   - `visit_children`: recurse into every child of a node, discarding
//!     results. Passes that only act on a subset of variants call this from
//!     their composite methods.
//!   - `Rewriter`: an identity rewriter base. Default methods return leaves
//!     unchanged and rebuild composites from rewritten children; a
//!     transforming pass overrides only the variants it targets.

use crate::core::nodes::*;

/// One method per AST variant, returning the pass-specific `Output`.
pub trait Visitor {
    type Output;

    fn visit_regex(&mut self, node: &Regex) -> Self::Output;
    fn visit_alternation(&mut self, node: &Alternation) -> Self::Output;
    fn visit_sequence(&mut self, node: &Sequence) -> Self::Output;
    fn visit_group(&mut self, node: &Group) -> Self::Output;
    fn visit_quantifier(&mut self, node: &Quantifier) -> Self::Output;
    fn visit_literal(&mut self, node: &Literal) -> Self::Output;
    fn visit_char_literal(&mut self, node: &CharLiteral) -> Self::Output;
    fn visit_char_type(&mut self, node: &CharType) -> Self::Output;
    fn visit_dot(&mut self, node: &Dot) -> Self::Output;
    fn visit_anchor(&mut self, node: &Anchor) -> Self::Output;
    fn visit_assertion(&mut self, node: &Assertion) -> Self::Output;
    fn visit_keep(&mut self, node: &Keep) -> Self::Output;
    fn visit_char_class(&mut self, node: &CharClass) -> Self::Output;
    fn visit_range(&mut self, node: &Range) -> Self::Output;
    fn visit_backref(&mut self, node: &Backref) -> Self::Output;
    fn visit_unicode(&mut self, node: &Unicode) -> Self::Output;
    fn visit_octal(&mut self, node: &Octal) -> Self::Output;
    fn visit_unicode_prop(&mut self, node: &UnicodeProp) -> Self::Output;
    fn visit_posix_class(&mut self, node: &PosixClass) -> Self::Output;
    fn visit_comment(&mut self, node: &Comment) -> Self::Output;
    fn visit_conditional(&mut self, node: &Conditional) -> Self::Output;
    fn visit_subroutine(&mut self, node: &Subroutine) -> Self::Output;
    fn visit_pcre_verb(&mut self, node: &PcreVerb) -> Self::Output;
    fn visit_define(&mut self, node: &Define) -> Self::Output;
    fn visit_limit_match(&mut self, node: &LimitMatch) -> Self::Output;
    fn visit_callout(&mut self, node: &Callout) -> Self::Output;
    fn visit_class_operation(&mut self, node: &ClassOperation) -> Self::Output;
    fn visit_control_char(&mut self, node: &ControlChar) -> Self::Output;
    fn visit_script_run(&mut self, node: &ScriptRun) -> Self::Output;
    fn visit_version_condition(&mut self, node: &VersionCondition) -> Self::Output;
}

impl Node {
    /// Dispatch to the visitor method for this variant. This is the sole
    /// polymorphic surface the tree exposes.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Node::Regex(n) => visitor.visit_regex(n),
            Node::Alternation(n) => visitor.visit_alternation(n),
            Node::Sequence(n) => visitor.visit_sequence(n),
            Node::Group(n) => visitor.visit_group(n),
            Node::Quantifier(n) => visitor.visit_quantifier(n),
            Node::Literal(n) => visitor.visit_literal(n),
            Node::CharLiteral(n) => visitor.visit_char_literal(n),
            Node::CharType(n) => visitor.visit_char_type(n),
            Node::Dot(n) => visitor.visit_dot(n),
            Node::Anchor(n) => visitor.visit_anchor(n),
            Node::Assertion(n) => visitor.visit_assertion(n),
            Node::Keep(n) => visitor.visit_keep(n),
            Node::CharClass(n) => visitor.visit_char_class(n),
            Node::Range(n) => visitor.visit_range(n),
            Node::Backref(n) => visitor.visit_backref(n),
            Node::Unicode(n) => visitor.visit_unicode(n),
            Node::Octal(n) => visitor.visit_octal(n),
            Node::UnicodeProp(n) => visitor.visit_unicode_prop(n),
            Node::PosixClass(n) => visitor.visit_posix_class(n),
            Node::Comment(n) => visitor.visit_comment(n),
            Node::Conditional(n) => visitor.visit_conditional(n),
            Node::Subroutine(n) => visitor.visit_subroutine(n),
            Node::PcreVerb(n) => visitor.visit_pcre_verb(n),
            Node::Define(n) => visitor.visit_define(n),
            Node::LimitMatch(n) => visitor.visit_limit_match(n),
            Node::Callout(n) => visitor.visit_callout(n),
            Node::ClassOperation(n) => visitor.visit_class_operation(n),
            Node::ControlChar(n) => visitor.visit_control_char(n),
            Node::ScriptRun(n) => visitor.visit_script_run(n),
            Node::VersionCondition(n) => visitor.visit_version_condition(n),
        }
    }
}

impl Regex {
    /// Entry point for running a pass over a parsed pattern.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_regex(self)
    }
}

/// Recurse into every child of `node`, discarding the per-child results.
/// Leaves are no-ops. This is the noop traversal base: a pass that only
/// cares about a few variants calls this from everything else.
pub fn visit_children<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Regex(n) => {
            n.pattern.accept(visitor);
        }
        Node::Alternation(n) => {
            for alt in &n.alternatives {
                alt.accept(visitor);
            }
        }
        Node::Sequence(n) => {
            for child in &n.children {
                child.accept(visitor);
            }
        }
        Node::Group(n) => {
            n.child.accept(visitor);
        }
        Node::Quantifier(n) => {
            n.child.accept(visitor);
        }
        Node::CharClass(n) => {
            n.expression.accept(visitor);
        }
        Node::Range(n) => {
            n.start.accept(visitor);
            n.end.accept(visitor);
        }
        Node::Conditional(n) => {
            n.condition.accept(visitor);
            n.yes.accept(visitor);
            if let Some(no) = &n.no {
                no.accept(visitor);
            }
        }
        Node::Define(n) => {
            n.content.accept(visitor);
        }
        Node::ClassOperation(n) => {
            n.left.accept(visitor);
            n.right.accept(visitor);
        }
        _ => {}
    }
}

/// Identity rewriter: returns an equivalent fresh tree, never mutating the
/// input. Transforming passes override the variants they care about; every
/// default clones leaves and rebuilds composites from rewritten children,
/// keeping the originating spans.
pub trait Rewriter {
    fn rewrite(&mut self, node: &Node) -> Node {
        match node {
            Node::Regex(n) => self.rewrite_regex(n),
            Node::Alternation(n) => self.rewrite_alternation(n),
            Node::Sequence(n) => self.rewrite_sequence(n),
            Node::Group(n) => self.rewrite_group(n),
            Node::Quantifier(n) => self.rewrite_quantifier(n),
            Node::Literal(n) => self.rewrite_literal(n),
            Node::CharLiteral(n) => self.rewrite_char_literal(n),
            Node::CharType(n) => self.rewrite_char_type(n),
            Node::Dot(n) => self.rewrite_dot(n),
            Node::Anchor(n) => self.rewrite_anchor(n),
            Node::Assertion(n) => self.rewrite_assertion(n),
            Node::Keep(n) => self.rewrite_keep(n),
            Node::CharClass(n) => self.rewrite_char_class(n),
            Node::Range(n) => self.rewrite_range(n),
            Node::Backref(n) => self.rewrite_backref(n),
            Node::Unicode(n) => self.rewrite_unicode(n),
            Node::Octal(n) => self.rewrite_octal(n),
            Node::UnicodeProp(n) => self.rewrite_unicode_prop(n),
            Node::PosixClass(n) => self.rewrite_posix_class(n),
            Node::Comment(n) => self.rewrite_comment(n),
            Node::Conditional(n) => self.rewrite_conditional(n),
            Node::Subroutine(n) => self.rewrite_subroutine(n),
            Node::PcreVerb(n) => self.rewrite_pcre_verb(n),
            Node::Define(n) => self.rewrite_define(n),
            Node::LimitMatch(n) => self.rewrite_limit_match(n),
            Node::Callout(n) => self.rewrite_callout(n),
            Node::ClassOperation(n) => self.rewrite_class_operation(n),
            Node::ControlChar(n) => self.rewrite_control_char(n),
            Node::ScriptRun(n) => self.rewrite_script_run(n),
            Node::VersionCondition(n) => self.rewrite_version_condition(n),
        }
    }

    fn rewrite_regex(&mut self, node: &Regex) -> Node {
        Node::Regex(Regex::new(
            self.rewrite(&node.pattern),
            node.delimiter,
            node.flags.clone(),
            node.span,
        ))
    }

    fn rewrite_alternation(&mut self, node: &Alternation) -> Node {
        let alternatives = node.alternatives.iter().map(|a| self.rewrite(a)).collect();
        Node::Alternation(Alternation::new(alternatives, node.span))
    }

    fn rewrite_sequence(&mut self, node: &Sequence) -> Node {
        let children = node.children.iter().map(|c| self.rewrite(c)).collect();
        Node::Sequence(Sequence::new(children, node.span))
    }

    fn rewrite_group(&mut self, node: &Group) -> Node {
        let mut group = Group::new(node.kind, self.rewrite(&node.child), node.span);
        group.name = node.name.clone();
        group.flags = node.flags.clone();
        Node::Group(group)
    }

    fn rewrite_quantifier(&mut self, node: &Quantifier) -> Node {
        Node::Quantifier(Quantifier::new(
            self.rewrite(&node.child),
            node.quantifier.clone(),
            node.kind,
            node.span,
        ))
    }

    fn rewrite_literal(&mut self, node: &Literal) -> Node {
        Node::Literal(node.clone())
    }

    fn rewrite_char_literal(&mut self, node: &CharLiteral) -> Node {
        Node::CharLiteral(node.clone())
    }

    fn rewrite_char_type(&mut self, node: &CharType) -> Node {
        Node::CharType(node.clone())
    }

    fn rewrite_dot(&mut self, node: &Dot) -> Node {
        Node::Dot(node.clone())
    }

    fn rewrite_anchor(&mut self, node: &Anchor) -> Node {
        Node::Anchor(node.clone())
    }

    fn rewrite_assertion(&mut self, node: &Assertion) -> Node {
        Node::Assertion(node.clone())
    }

    fn rewrite_keep(&mut self, node: &Keep) -> Node {
        Node::Keep(node.clone())
    }

    fn rewrite_char_class(&mut self, node: &CharClass) -> Node {
        Node::CharClass(CharClass::new(
            self.rewrite(&node.expression),
            node.negated,
            node.span,
        ))
    }

    fn rewrite_range(&mut self, node: &Range) -> Node {
        Node::Range(Range::new(
            self.rewrite(&node.start),
            self.rewrite(&node.end),
            node.span,
        ))
    }

    fn rewrite_backref(&mut self, node: &Backref) -> Node {
        Node::Backref(node.clone())
    }

    fn rewrite_unicode(&mut self, node: &Unicode) -> Node {
        Node::Unicode(node.clone())
    }

    fn rewrite_octal(&mut self, node: &Octal) -> Node {
        Node::Octal(node.clone())
    }

    fn rewrite_unicode_prop(&mut self, node: &UnicodeProp) -> Node {
        Node::UnicodeProp(node.clone())
    }

    fn rewrite_posix_class(&mut self, node: &PosixClass) -> Node {
        Node::PosixClass(node.clone())
    }

    fn rewrite_comment(&mut self, node: &Comment) -> Node {
        Node::Comment(node.clone())
    }

    fn rewrite_conditional(&mut self, node: &Conditional) -> Node {
        Node::Conditional(Conditional::new(
            self.rewrite(&node.condition),
            self.rewrite(&node.yes),
            node.no.as_deref().map(|no| self.rewrite(no)),
            node.span,
        ))
    }

    fn rewrite_subroutine(&mut self, node: &Subroutine) -> Node {
        Node::Subroutine(node.clone())
    }

    fn rewrite_pcre_verb(&mut self, node: &PcreVerb) -> Node {
        Node::PcreVerb(node.clone())
    }

    fn rewrite_define(&mut self, node: &Define) -> Node {
        Node::Define(Define::new(self.rewrite(&node.content), node.span))
    }

    fn rewrite_limit_match(&mut self, node: &LimitMatch) -> Node {
        Node::LimitMatch(node.clone())
    }

    fn rewrite_callout(&mut self, node: &Callout) -> Node {
        Node::Callout(node.clone())
    }

    fn rewrite_class_operation(&mut self, node: &ClassOperation) -> Node {
        Node::ClassOperation(ClassOperation::new(
            node.kind,
            self.rewrite(&node.left),
            self.rewrite(&node.right),
            node.span,
        ))
    }

    fn rewrite_control_char(&mut self, node: &ControlChar) -> Node {
        Node::ControlChar(node.clone())
    }

    fn rewrite_script_run(&mut self, node: &ScriptRun) -> Node {
        Node::ScriptRun(node.clone())
    }

    fn rewrite_version_condition(&mut self, node: &VersionCondition) -> Node {
        Node::VersionCondition(node.clone())
    }
}
