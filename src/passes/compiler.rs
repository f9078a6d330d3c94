//! Compiler - AST to Canonical Pattern Text
//!
//! Re-emits a delimited PCRE pattern from the AST. The emission reaches a
//! fixed point after one compile: whatever the first compile normalises
//! (alternate named-group spellings, insignificant whitespace, escape
//! form of raw control bytes), re-parsing and re-compiling reproduces the
//! same bytes.
//!
//! Escaping is context-sensitive through a single `in_char_class` bit:
//! outside a class the metacharacters `\ . ^ $ [ ( ) | * + ? { }` plus the
//! active delimiter are escaped (a literal `]` needs no escape there);
//! inside a class only `\ ] - ^` are. Non-printable bytes use the shortest
//! canonical escape. The compiler never introduces constructs that are
//! absent from the AST.

use crate::core::lexer::closing_delimiter;
use crate::core::nodes::*;
use crate::core::visitor::Visitor;

/// Pattern emitter. Construct once, run with `regex.accept(&mut compiler)`.
#[derive(Default)]
pub struct Compiler {
    delimiter: char,
    closing: char,
    flags: String,
    in_char_class: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            delimiter: '/',
            closing: '/',
            flags: String::new(),
            in_char_class: false,
        }
    }

    /// Compile a full pattern in one call.
    pub fn compile(regex: &Regex) -> String {
        regex.accept(&mut Compiler::new())
    }

    fn escape_char(&self, ch: char) -> String {
        match ch {
            '\t' => return "\\t".to_string(),
            '\n' => return "\\n".to_string(),
            '\r' => return "\\r".to_string(),
            '\u{0C}' => return "\\f".to_string(),
            '\u{1B}' => return "\\e".to_string(),
            _ => {}
        }
        let code = ch as u32;
        if code < 32 || code == 127 || (128..256).contains(&code) {
            return format!("\\x{:02X}", code);
        }

        let is_meta = if self.in_char_class {
            matches!(ch, '\\' | ']' | '-' | '^')
        } else {
            matches!(
                ch,
                '\\' | '.' | '^' | '$' | '[' | '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}'
            ) || ch == self.delimiter
                || ch == self.closing
        };
        if is_meta {
            format!("\\{}", ch)
        } else {
            ch.to_string()
        }
    }

    fn escape_literal(&self, value: &str) -> String {
        value.chars().map(|ch| self.escape_char(ch)).collect()
    }

    /// Conditions render without the reference escape: `(?(1)...)`,
    /// `(?(<name>)...)`, `(?(R)...)`.
    fn emit_condition(&mut self, condition: &Node) -> String {
        match condition {
            Node::Backref(backref) => backref.reference.clone(),
            Node::Subroutine(subroutine) => subroutine.reference.clone(),
            other => other.accept(self),
        }
    }
}

impl Visitor for Compiler {
    type Output = String;

    fn visit_regex(&mut self, node: &Regex) -> String {
        self.delimiter = node.delimiter;
        self.closing = closing_delimiter(node.delimiter);
        self.flags = node.flags.clone();
        self.in_char_class = false;
        let body = node.pattern.accept(self);
        format!("{}{}{}{}", node.delimiter, body, self.closing, node.flags)
    }

    fn visit_alternation(&mut self, node: &Alternation) -> String {
        let separator = if self.in_char_class { "" } else { "|" };
        node.alternatives
            .iter()
            .map(|alt| alt.accept(self))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn visit_sequence(&mut self, node: &Sequence) -> String {
        node.children.iter().map(|c| c.accept(self)).collect()
    }

    fn visit_group(&mut self, node: &Group) -> String {
        let body = node.child.accept(self);
        match node.kind {
            GroupKind::Capturing => format!("({})", body),
            GroupKind::NonCapturing => format!("(?:{})", body),
            GroupKind::Named => {
                format!("(?<{}>{})", node.name.as_deref().unwrap_or_default(), body)
            }
            GroupKind::LookaheadPositive => format!("(?={})", body),
            GroupKind::LookaheadNegative => format!("(?!{})", body),
            GroupKind::LookbehindPositive => format!("(?<={})", body),
            GroupKind::LookbehindNegative => format!("(?<!{})", body),
            GroupKind::Atomic => format!("(?>{})", body),
            GroupKind::BranchReset => format!("(?|{})", body),
            GroupKind::InlineFlags => {
                let flags = node.flags.as_deref().unwrap_or_default();
                if node.child.is_empty() {
                    format!("(?{})", flags)
                } else {
                    format!("(?{}:{})", flags, body)
                }
            }
        }
    }

    fn visit_quantifier(&mut self, node: &Quantifier) -> String {
        let body = node.child.accept(self);
        // A bare sequence or alternation would change meaning under the
        // quantifier; regroup it
        let body = match node.child.as_ref() {
            Node::Sequence(_) | Node::Alternation(_) => format!("(?:{})", body),
            _ => body,
        };
        let suffix = match node.kind {
            QuantifierKind::Greedy => "",
            QuantifierKind::Lazy => "?",
            QuantifierKind::Possessive => "+",
        };
        format!("{}{}{}", body, node.quantifier, suffix)
    }

    fn visit_literal(&mut self, node: &Literal) -> String {
        self.escape_literal(&node.value)
    }

    fn visit_char_literal(&mut self, node: &CharLiteral) -> String {
        node.original.clone()
    }

    fn visit_char_type(&mut self, node: &CharType) -> String {
        format!("\\{}", node.letter)
    }

    fn visit_dot(&mut self, _node: &Dot) -> String {
        ".".to_string()
    }

    fn visit_anchor(&mut self, node: &Anchor) -> String {
        match node.kind {
            AnchorKind::Start => "^".to_string(),
            AnchorKind::End => "$".to_string(),
        }
    }

    fn visit_assertion(&mut self, node: &Assertion) -> String {
        format!("\\{}", node.letter)
    }

    fn visit_keep(&mut self, _node: &Keep) -> String {
        "\\K".to_string()
    }

    fn visit_char_class(&mut self, node: &CharClass) -> String {
        let was_in_class = self.in_char_class;
        self.in_char_class = true;
        let body = node.expression.accept(self);
        self.in_char_class = was_in_class;
        if node.negated {
            format!("[^{}]", body)
        } else {
            format!("[{}]", body)
        }
    }

    fn visit_range(&mut self, node: &Range) -> String {
        format!("{}-{}", node.start.accept(self), node.end.accept(self))
    }

    fn visit_backref(&mut self, node: &Backref) -> String {
        format!("\\{}", node.reference)
    }

    fn visit_unicode(&mut self, node: &Unicode) -> String {
        format!("\\{}", node.code)
    }

    fn visit_octal(&mut self, node: &Octal) -> String {
        format!("\\{}", node.code)
    }

    fn visit_unicode_prop(&mut self, node: &UnicodeProp) -> String {
        let letter = if node.negated { 'P' } else { 'p' };
        if node.has_braces {
            format!("\\{}{{{}}}", letter, node.name)
        } else {
            format!("\\{}{}", letter, node.name)
        }
    }

    fn visit_posix_class(&mut self, node: &PosixClass) -> String {
        format!("[:{}:]", node.name)
    }

    fn visit_comment(&mut self, node: &Comment) -> String {
        if self.flags.contains('x') && node.text.starts_with('#') {
            node.text.clone()
        } else {
            format!("(?#{})", node.text)
        }
    }

    fn visit_conditional(&mut self, node: &Conditional) -> String {
        let condition = self.emit_condition(&node.condition);
        let yes = node.yes.accept(self);
        match &node.no {
            Some(no) => {
                let no = no.accept(self);
                format!("(?({}){}|{})", condition, yes, no)
            }
            None => format!("(?({}){})", condition, yes),
        }
    }

    fn visit_subroutine(&mut self, node: &Subroutine) -> String {
        match node.syntax.as_str() {
            "&" => format!("(?&{})", node.reference),
            "P>" => format!("(?P>{})", node.reference),
            "g" => format!("\\g<{}>", node.reference),
            _ => format!("(?{})", node.reference),
        }
    }

    fn visit_pcre_verb(&mut self, node: &PcreVerb) -> String {
        format!("(*{})", node.verb)
    }

    fn visit_define(&mut self, node: &Define) -> String {
        format!("(?(DEFINE){})", node.content.accept(self))
    }

    fn visit_limit_match(&mut self, node: &LimitMatch) -> String {
        format!("(*LIMIT_MATCH={})", node.limit)
    }

    fn visit_callout(&mut self, node: &Callout) -> String {
        if node.is_string {
            format!("(?C\"{}\")", node.identifier)
        } else {
            format!("(?C{})", node.identifier)
        }
    }

    fn visit_class_operation(&mut self, node: &ClassOperation) -> String {
        let operator = match node.kind {
            ClassOpKind::Intersection => "&&",
            ClassOpKind::Subtraction => "--",
        };
        format!(
            "{}{}{}",
            node.left.accept(self),
            operator,
            node.right.accept(self)
        )
    }

    fn visit_control_char(&mut self, node: &ControlChar) -> String {
        format!("\\c{}", node.letter)
    }

    fn visit_script_run(&mut self, node: &ScriptRun) -> String {
        format!("(*script_run:{})", node.name)
    }

    fn visit_version_condition(&mut self, node: &VersionCondition) -> String {
        format!("VERSION{}{}", node.operator, node.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;
    use crate::core::parser::Parser;

    fn roundtrip(input: &str) -> String {
        let regex = Parser::new(lex(input).expect("lex"))
            .parse()
            .expect("parse should succeed");
        Compiler::compile(&regex)
    }

    /// One compile may normalise; from then on the bytes are fixed.
    fn assert_fixed_point(input: &str) {
        let first = roundtrip(input);
        let second = roundtrip(&first);
        assert_eq!(first, second, "compile not a fixed point for {}", input);
    }

    #[test]
    fn test_roundtrip_identity() {
        for input in [
            "/(a|b)c/",
            "/^foo.*bar$/i",
            r"/([a-z])\1/",
            "/(?:hello)/",
            "/[0-9]{3}/",
            "/(?<name>x)(?&name)/",
            "/(?<=ab)c(?!d)/",
            "/(?>ab)+x/",
            r"/\d+\s\K\x41\p{L}/",
            "/(?(1)a|b)/",
            "/(?i)x(?m-s:y)/",
            "/(*COMMIT)(*MARK:top)a/",
            "/a(?#note)b/",
            r#"/(?C7)(?C"t")a/"#,
            "/[^a-f]|[[:digit:]]/",
            "/(?(DEFINE)(?<d>x))y/",
            "/(?(VERSION>=10.4)a|b)/",
            "/(*LIMIT_MATCH=99)a/",
            r"/\g{1}(a)\cX/",
        ] {
            assert_eq!(roundtrip(input), input, "for {}", input);
        }
    }

    #[test]
    fn test_delimiter_handling() {
        // '/' inside the body is not a meta under '#' delimiters
        assert_eq!(roundtrip("#foo/bar#i"), "#foo/bar#i");
        // Bracket delimiters close with the counterpart
        assert_eq!(roundtrip("{ab}i"), "{ab}i");
    }

    #[test]
    fn test_delimiter_is_escaped_in_literals() {
        assert_eq!(roundtrip(r"/a\/b/"), r"/a\/b/");
        // A '#' literal under '#' delimiters must come out escaped
        assert_eq!(roundtrip(r"#a\#b#"), r"#a\#b#");
    }

    #[test]
    fn test_close_bracket_literal_unescaped_outside_class() {
        assert_eq!(roundtrip("/a]b/"), "/a]b/");
    }

    #[test]
    fn test_quantified_alternation_regrouped() {
        // Hand-built: quantifier directly over an alternation
        let alternation = Node::Alternation(Alternation::new(
            vec![
                Node::Literal(Literal::new("a".into(), Span::new(1, 2))),
                Node::Literal(Literal::new("b".into(), Span::new(3, 4))),
            ],
            Span::new(1, 4),
        ));
        let quantified = Node::Quantifier(Quantifier::new(
            alternation,
            "*".into(),
            QuantifierKind::Greedy,
            Span::new(1, 5),
        ));
        let regex = Regex::new(quantified, '/', String::new(), Span::new(0, 7));
        assert_eq!(Compiler::compile(&regex), "/(?:a|b)*/");
    }

    #[test]
    fn test_nonprintables_use_shortest_escape() {
        let regex = Regex::new(
            Node::Literal(Literal::new("\t\n\r\u{0C}\u{1B}\u{01}\u{7F}".into(), Span::new(1, 8))),
            '/',
            String::new(),
            Span::new(0, 9),
        );
        assert_eq!(Compiler::compile(&regex), r"/\t\n\r\f\e\x01\x7F/");
    }

    #[test]
    fn test_raw_control_bytes_reach_fixed_point() {
        assert_fixed_point("/a\tb/");
    }

    #[test]
    fn test_class_escape_normalisation_is_fixed() {
        assert_fixed_point("/[]a]/");
        assert_fixed_point("/[a^]/");
        assert_fixed_point("/[a-]/");
    }

    #[test]
    fn test_named_group_spellings_normalise() {
        assert_eq!(roundtrip("/(?P<w>a)/"), "/(?<w>a)/");
        assert_eq!(roundtrip("/(?'w'a)/"), "/(?<w>a)/");
        assert_fixed_point("/(?P<w>a)(?P=w)/");
    }

    #[test]
    fn test_extended_mode_comment_kept_verbatim() {
        assert_eq!(roundtrip("/a#note\nb/x"), "/a#note\nb/x");
        assert_fixed_point("/a b #note\nc/x");
    }

    #[test]
    fn test_lazy_and_possessive_suffixes() {
        assert_eq!(roundtrip("/a*?b++c{2,3}?/"), "/a*?b++c{2,3}?/");
    }

    #[test]
    fn test_empty_alternation_branch() {
        assert_eq!(roundtrip("/a|/"), "/a|/");
        assert_eq!(roundtrip("/(|a)/"), "/(|a)/");
    }
}
