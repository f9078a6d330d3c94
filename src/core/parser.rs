//! PCRE Parser - Recursive Descent over the Pattern Body
//!
//! This module implements a hand-rolled recursive-descent parser that
//! transforms the body of a delimited PCRE pattern into AST nodes. The
//! parser handles:
//!   - Alternation and sequencing with literal coalescing
//!   - Character classes with ranges, POSIX classes and set operations
//!   - Quantifiers (greedy, lazy, possessive)
//!   - All group flavors (capturing, non-capturing, named, atomic,
//!     branch-reset, inline-flag, the four lookarounds)
//!   - Backreferences, subroutine calls and conditionals
//!   - Escapes: predefined classes, control escapes, `\x`/`\u`/`\o` codes,
//!     Unicode properties, `\cX`, `\K` and the zero-width assertions
//!   - Verbs `(*...)`, callouts `(?C...)` and comments, including `#` line
//!     comments in extended mode
//!
//! Every node carries the byte span of the source text it came from,
//! offset so spans index into the full delimited input. Errors carry a
//! position into the pattern body for caret diagnostics.

use crate::core::errors::ParserError;
use crate::core::lexer::LexedPattern;
use crate::core::nodes::*;

const FLAG_CHARS: &str = "imsxuADUXJ";

/// Recursive-descent parser for one pattern body.
pub struct Parser {
    pattern: String,
    pos: usize,
    /// Byte offset of the pattern body inside the delimited input; added to
    /// every span.
    base: usize,
    total_len: usize,
    delimiter: char,
    flags: String,
    extended: bool,
    in_class: usize,
}

impl Parser {
    pub fn new(lexed: LexedPattern) -> Self {
        let total_len = lexed.pattern_offset
            + lexed.pattern.len()
            + lexed.closing.len_utf8()
            + lexed.flags.len();
        let extended = lexed.flags.contains('x');
        Parser {
            pattern: lexed.pattern,
            pos: 0,
            base: lexed.pattern_offset,
            total_len,
            delimiter: lexed.delimiter,
            flags: lexed.flags,
            extended,
            in_class: 0,
        }
    }

    // ---- cursor primitives ----

    fn eof(&self) -> bool {
        self.pos >= self.pattern.len()
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.pattern[self.pos..].chars().nth(n)
    }

    fn take(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.pattern[self.pos..].starts_with(s)
    }

    fn match_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Extended mode treats unescaped whitespace outside classes as
    /// insignificant.
    fn skip_ws(&mut self) {
        if !self.extended || self.in_class > 0 {
            return;
        }
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn err(&self, message: impl Into<String>, pos: usize) -> ParserError {
        ParserError::new(message, pos, self.pattern.clone())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.base + start, self.base + self.pos)
    }

    fn expect_char(&mut self, expected: char, message: &str) -> Result<(), ParserError> {
        match self.take() {
            Some(ch) if ch == expected => Ok(()),
            _ => Err(self.err(message, self.pos.min(self.pattern.len()))),
        }
    }

    /// Consume characters up to (and including) `terminator`.
    fn read_until(&mut self, terminator: char, what: &str) -> Result<String, ParserError> {
        let start = self.pos;
        let mut out = String::new();
        loop {
            match self.take() {
                None => return Err(self.err(format!("Unterminated {}", what), start)),
                Some(ch) if ch == terminator => return Ok(out),
                Some(ch) => out.push(ch),
            }
        }
    }

    /// Group/reference name: one or more word characters.
    fn read_name(&mut self) -> Result<String, ParserError> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                name.push(ch);
                self.take();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.err("Empty group name", start));
        }
        Ok(name)
    }

    // ---- top level ----

    /// Parse the whole pattern body into the root node.
    pub fn parse(&mut self) -> Result<Regex, ParserError> {
        let pattern = self.parse_alternation()?;
        self.skip_ws();
        if !self.eof() {
            if self.peek() == Some(')') {
                return Err(self.err("Unmatched ')'", self.pos));
            }
            return Err(self.err("Unexpected trailing input", self.pos));
        }
        Ok(Regex::new(
            pattern,
            self.delimiter,
            self.flags.clone(),
            Span::new(0, self.total_len),
        ))
    }

    /// alternation: sequence ('|' sequence)*
    fn parse_alternation(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        let mut branches = vec![self.parse_sequence()?];
        while self.peek() == Some('|') {
            self.take();
            branches.push(self.parse_sequence()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().expect("one branch"))
        } else {
            Ok(Node::Alternation(Alternation::new(
                branches,
                self.span_from(start),
            )))
        }
    }

    /// sequence: term* — a term is an atom with an optional quantifier.
    /// Adjacent unquantified literal characters coalesce into one node.
    fn parse_sequence(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        let mut children: Vec<Node> = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some('#') if self.extended => {
                    children.push(self.parse_line_comment());
                    continue;
                }
                _ => {}
            }

            let atom_start = self.pos;
            let atom = self.parse_atom()?;
            self.skip_ws();

            if let Some((text, kind)) = self.try_quantifier() {
                children.push(Node::Quantifier(Quantifier::new(
                    atom,
                    text,
                    kind,
                    self.span_from(atom_start),
                )));
                continue;
            }

            // Coalesce plain literals so `abc` is one node
            if let (Node::Literal(new_lit), Some(Node::Literal(prev))) =
                (&atom, children.last_mut())
            {
                prev.value.push_str(&new_lit.value);
                prev.span = prev.span.merge(new_lit.span);
                continue;
            }
            children.push(atom);
        }

        match children.len() {
            1 => Ok(children.pop().expect("one child")),
            _ => Ok(Node::Sequence(Sequence::new(
                children,
                self.span_from(start),
            ))),
        }
    }

    /// `#` to end of line in extended mode. The stored text keeps the `#`
    /// and the terminating newline so re-compilation stays parseable.
    fn parse_line_comment(&mut self) -> Node {
        let start = self.pos;
        let mut text = String::new();
        while let Some(ch) = self.take() {
            text.push(ch);
            if ch == '\n' {
                break;
            }
        }
        Node::Comment(Comment::new(text, self.span_from(start)))
    }

    /// Quantifier following an atom: `*`, `+`, `?` or a well-formed brace
    /// form, plus an optional lazy/possessive suffix. A brace that does not
    /// scan as a quantifier is left for the literal path.
    fn try_quantifier(&mut self) -> Option<(String, QuantifierKind)> {
        let text = match self.peek()? {
            '*' => {
                self.take();
                "*".to_string()
            }
            '+' => {
                self.take();
                "+".to_string()
            }
            '?' => {
                self.take();
                "?".to_string()
            }
            '{' => self.scan_brace_quantifier()?,
            _ => return None,
        };

        let kind = match self.peek() {
            Some('?') => {
                self.take();
                QuantifierKind::Lazy
            }
            Some('+') => {
                self.take();
                QuantifierKind::Possessive
            }
            _ => QuantifierKind::Greedy,
        };
        Some((text, kind))
    }

    /// `{n}`, `{n,}` or `{n,m}` with digit bounds. Consumes nothing unless
    /// the full form is present.
    fn scan_brace_quantifier(&mut self) -> Option<String> {
        let rest = &self.pattern[self.pos..];
        let mut saw_digit = false;
        let mut saw_comma = false;
        for (idx, ch) in rest.char_indices().skip(1) {
            match ch {
                '0'..='9' => saw_digit = true,
                ',' if !saw_comma && saw_digit => saw_comma = true,
                '}' if saw_digit => {
                    let text = rest[..idx + 1].to_string();
                    self.pos += idx + 1;
                    return Some(text);
                }
                _ => return None,
            }
        }
        None
    }

    // ---- atoms ----

    fn parse_atom(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        let ch = self
            .peek()
            .ok_or_else(|| self.err("Unexpected end of pattern", self.pos))?;

        match ch {
            '.' => {
                self.take();
                Ok(Node::Dot(Dot::new(self.span_from(start))))
            }
            '^' => {
                self.take();
                Ok(Node::Anchor(Anchor::new(
                    AnchorKind::Start,
                    self.span_from(start),
                )))
            }
            '$' => {
                self.take();
                Ok(Node::Anchor(Anchor::new(
                    AnchorKind::End,
                    self.span_from(start),
                )))
            }
            '(' => self.parse_group(),
            '[' => self.parse_char_class(),
            '\\' => self.parse_escape(),
            '*' | '+' | '?' => {
                Err(self.err("Quantifier does not follow a repeatable item", self.pos))
            }
            _ => {
                self.take();
                Ok(Node::Literal(Literal::new(
                    ch.to_string(),
                    self.span_from(start),
                )))
            }
        }
    }

    // ---- groups and parenthesised constructs ----

    fn parse_group(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        self.take(); // consume '('
        self.parse_group_body(start)
    }

    fn parse_group_body(&mut self, start: usize) -> Result<Node, ParserError> {
        if self.peek() == Some('*') {
            self.take();
            return self.parse_verb(start);
        }

        if !self.match_str("?") {
            let body = self.parse_alternation()?;
            self.expect_char(')', "Unterminated group")?;
            return Ok(Node::Group(Group::new(
                GroupKind::Capturing,
                body,
                self.span_from(start),
            )));
        }

        let ch = self
            .peek()
            .ok_or_else(|| self.err("Unterminated group", start))?;

        match ch {
            ':' => {
                self.take();
                self.wrap_simple_group(GroupKind::NonCapturing, start, "Unterminated group")
            }
            '=' => {
                self.take();
                self.wrap_simple_group(GroupKind::LookaheadPositive, start, "Unterminated lookahead")
            }
            '!' => {
                self.take();
                self.wrap_simple_group(GroupKind::LookaheadNegative, start, "Unterminated lookahead")
            }
            '>' => {
                self.take();
                self.wrap_simple_group(GroupKind::Atomic, start, "Unterminated atomic group")
            }
            '|' => {
                self.take();
                self.wrap_simple_group(GroupKind::BranchReset, start, "Unterminated group")
            }
            '#' => {
                self.take();
                let text = self.read_until(')', "comment")?;
                Ok(Node::Comment(Comment::new(text, self.span_from(start))))
            }
            '<' => {
                self.take();
                match self.peek() {
                    Some('=') => {
                        self.take();
                        self.wrap_simple_group(
                            GroupKind::LookbehindPositive,
                            start,
                            "Unterminated lookbehind",
                        )
                    }
                    Some('!') => {
                        self.take();
                        self.wrap_simple_group(
                            GroupKind::LookbehindNegative,
                            start,
                            "Unterminated lookbehind",
                        )
                    }
                    _ => {
                        let name = self.read_name()?;
                        self.expect_char('>', "Unterminated group name")?;
                        let body = self.parse_alternation()?;
                        self.expect_char(')', "Unterminated group")?;
                        Ok(Node::Group(Group::named(name, body, self.span_from(start))))
                    }
                }
            }
            '\'' => {
                self.take();
                let name = self.read_name()?;
                self.expect_char('\'', "Unterminated group name")?;
                let body = self.parse_alternation()?;
                self.expect_char(')', "Unterminated group")?;
                Ok(Node::Group(Group::named(name, body, self.span_from(start))))
            }
            'P' => {
                self.take();
                match self.peek() {
                    Some('<') => {
                        self.take();
                        let name = self.read_name()?;
                        self.expect_char('>', "Unterminated group name")?;
                        let body = self.parse_alternation()?;
                        self.expect_char(')', "Unterminated group")?;
                        Ok(Node::Group(Group::named(name, body, self.span_from(start))))
                    }
                    Some('>') => {
                        self.take();
                        let name = self.read_name()?;
                        self.expect_char(')', "Unterminated subroutine call")?;
                        Ok(Node::Subroutine(Subroutine::new(
                            name,
                            "P>".to_string(),
                            self.span_from(start),
                        )))
                    }
                    Some('=') => {
                        self.take();
                        let name = self.read_name()?;
                        self.expect_char(')', "Unterminated backreference")?;
                        Ok(Node::Backref(Backref::new(
                            format!("k<{}>", name),
                            self.span_from(start),
                        )))
                    }
                    _ => Err(self.err("Unknown group construct: (?P", self.pos)),
                }
            }
            '&' => {
                self.take();
                let name = self.read_name()?;
                self.expect_char(')', "Unterminated subroutine call")?;
                Ok(Node::Subroutine(Subroutine::new(
                    name,
                    "&".to_string(),
                    self.span_from(start),
                )))
            }
            'C' => {
                self.take();
                self.parse_callout(start)
            }
            '(' => {
                self.take();
                self.parse_conditional(start)
            }
            'R' if self.peek_at(1) == Some(')') => {
                self.take();
                self.take();
                Ok(Node::Subroutine(Subroutine::new(
                    "R".to_string(),
                    String::new(),
                    self.span_from(start),
                )))
            }
            '+' | '-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                let reference = self.read_signed_number();
                self.expect_char(')', "Unterminated subroutine call")?;
                Ok(Node::Subroutine(Subroutine::new(
                    reference,
                    String::new(),
                    self.span_from(start),
                )))
            }
            '0'..='9' => {
                let reference = self.read_signed_number();
                self.expect_char(')', "Unterminated subroutine call")?;
                Ok(Node::Subroutine(Subroutine::new(
                    reference,
                    String::new(),
                    self.span_from(start),
                )))
            }
            _ if FLAG_CHARS.contains(ch) || ch == '-' => self.parse_inline_flags(start),
            _ => Err(self.err(format!("Unknown group construct: (?{}", ch), self.pos)),
        }
    }

    fn wrap_simple_group(
        &mut self,
        kind: GroupKind,
        start: usize,
        unterminated: &str,
    ) -> Result<Node, ParserError> {
        let body = self.parse_alternation()?;
        self.expect_char(')', unterminated)?;
        Ok(Node::Group(Group::new(kind, body, self.span_from(start))))
    }

    fn read_signed_number(&mut self) -> String {
        let mut out = String::new();
        if matches!(self.peek(), Some('+') | Some('-')) {
            out.push(self.take().expect("sign"));
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                out.push(ch);
                self.take();
            } else {
                break;
            }
        }
        out
    }

    /// `(?i)`, `(?im-sx)` or `(?i:...)`.
    fn parse_inline_flags(&mut self, start: usize) -> Result<Node, ParserError> {
        let mut flags = String::new();
        let mut seen_dash = false;
        loop {
            match self.peek() {
                Some(ch) if FLAG_CHARS.contains(ch) => {
                    flags.push(ch);
                    self.take();
                }
                Some('-') if !seen_dash => {
                    seen_dash = true;
                    flags.push('-');
                    self.take();
                }
                Some(':') => {
                    self.take();
                    let body = self.parse_alternation()?;
                    self.expect_char(')', "Unterminated group")?;
                    return Ok(Node::Group(Group::inline_flags(
                        flags,
                        body,
                        self.span_from(start),
                    )));
                }
                Some(')') => {
                    self.take();
                    let span = self.span_from(start);
                    let body = Node::Sequence(Sequence::new(Vec::new(), span));
                    return Ok(Node::Group(Group::inline_flags(flags, body, span)));
                }
                Some(ch) => {
                    return Err(self.err(format!("Unknown inline flag '{}'", ch), self.pos));
                }
                None => return Err(self.err("Unterminated group", start)),
            }
        }
    }

    /// `(?C)`, `(?C255)` or `(?C"tag")`.
    fn parse_callout(&mut self, start: usize) -> Result<Node, ParserError> {
        if self.peek() == Some('"') {
            self.take();
            let tag = self.read_until('"', "callout string")?;
            self.expect_char(')', "Unterminated callout")?;
            return Ok(Node::Callout(Callout::new(
                tag,
                true,
                self.span_from(start),
            )));
        }
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.take();
            } else {
                break;
            }
        }
        self.expect_char(')', "Unterminated callout")?;
        Ok(Node::Callout(Callout::new(
            digits,
            false,
            self.span_from(start),
        )))
    }

    /// Backtracking verbs and verb-like constructs after `(*`.
    fn parse_verb(&mut self, start: usize) -> Result<Node, ParserError> {
        let content = self.read_until(')', "verb")?;

        if let Some(value) = content.strip_prefix("LIMIT_MATCH=") {
            let limit: u32 = value
                .parse()
                .map_err(|_| self.err(format!("Invalid match limit: {}", value), start))?;
            return Ok(Node::LimitMatch(LimitMatch::new(
                limit,
                self.span_from(start),
            )));
        }
        if let Some(body) = content
            .strip_prefix("script_run:")
            .or_else(|| content.strip_prefix("sr:"))
        {
            return Ok(Node::ScriptRun(ScriptRun::new(
                body.to_string(),
                self.span_from(start),
            )));
        }
        Ok(Node::PcreVerb(PcreVerb::new(content, self.span_from(start))))
    }

    /// `(?(condition)yes|no)`. The leading `(?(` has been consumed.
    fn parse_conditional(&mut self, start: usize) -> Result<Node, ParserError> {
        let cond_start = self.pos - 1; // position of the condition's '('

        if self.match_str("DEFINE)") {
            let content = self.parse_alternation()?;
            self.expect_char(')', "Unterminated group")?;
            return Ok(Node::Define(Define::new(content, self.span_from(start))));
        }

        let condition = if self.match_str("VERSION") {
            let ver_start = cond_start;
            let operator = if self.match_str(">=") {
                ">=".to_string()
            } else if self.match_str("=") {
                "=".to_string()
            } else {
                return Err(self.err("Expected '=' or '>=' after VERSION", self.pos));
            };
            let mut version = String::new();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() || ch == '.' {
                    version.push(ch);
                    self.take();
                } else {
                    break;
                }
            }
            self.expect_char(')', "Unterminated condition")?;
            Node::VersionCondition(VersionCondition::new(
                operator,
                version,
                self.span_from(ver_start),
            ))
        } else if self.peek() == Some('?') {
            // Lookaround condition: re-enter group parsing at the '(' we
            // already consumed
            self.parse_group_body(cond_start)?
        } else if self.peek() == Some('R') {
            let mut reference = String::new();
            self.take();
            reference.push('R');
            if self.peek() == Some('&') {
                self.take();
                reference.push('&');
                reference.push_str(&self.read_name()?);
            } else {
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        reference.push(ch);
                        self.take();
                    } else {
                        break;
                    }
                }
            }
            self.expect_char(')', "Unterminated condition")?;
            Node::Subroutine(Subroutine::new(
                reference,
                String::new(),
                self.span_from(cond_start),
            ))
        } else if self.peek() == Some('<') {
            self.take();
            let name = self.read_name()?;
            self.expect_char('>', "Unterminated condition")?;
            self.expect_char(')', "Unterminated condition")?;
            Node::Backref(Backref::new(format!("<{}>", name), self.span_from(cond_start)))
        } else if self.peek() == Some('\'') {
            self.take();
            let name = self.read_name()?;
            self.expect_char('\'', "Unterminated condition")?;
            self.expect_char(')', "Unterminated condition")?;
            Node::Backref(Backref::new(format!("<{}>", name), self.span_from(cond_start)))
        } else if matches!(self.peek(), Some('+') | Some('-'))
            || self.peek().is_some_and(|c| c.is_ascii_digit())
        {
            let reference = self.read_signed_number();
            self.expect_char(')', "Unterminated condition")?;
            Node::Backref(Backref::new(reference, self.span_from(cond_start)))
        } else {
            let name = self.read_name()?;
            self.expect_char(')', "Unterminated condition")?;
            Node::Backref(Backref::new(name, self.span_from(cond_start)))
        };

        let body = self.parse_alternation()?;
        self.expect_char(')', "Unterminated group")?;

        let (yes, no) = match body {
            Node::Alternation(alt) if alt.alternatives.len() == 2 => {
                let mut alts = alt.alternatives;
                let no = alts.pop().expect("two branches");
                let yes = alts.pop().expect("two branches");
                (yes, Some(no))
            }
            Node::Alternation(_) => {
                return Err(self.err("Conditional group contains more than two branches", start));
            }
            other => (other, None),
        };

        Ok(Node::Conditional(Conditional::new(
            condition,
            yes,
            no,
            self.span_from(start),
        )))
    }

    // ---- escapes ----

    fn parse_escape(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        self.take(); // consume '\'
        let ch = self
            .take()
            .ok_or_else(|| self.err("Pattern may not end with a backslash", start))?;

        match ch {
            '1'..='9' => {
                let mut digits = String::from(ch);
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.take();
                    } else {
                        break;
                    }
                }
                Ok(Node::Backref(Backref::new(digits, self.span_from(start))))
            }
            '0' => {
                let mut code = String::from('0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(c @ '0'..='7') => {
                            code.push(c);
                            self.take();
                        }
                        _ => break,
                    }
                }
                Ok(Node::Octal(Octal::new(code, self.span_from(start))))
            }
            'g' => self.parse_g_escape(start),
            'k' => self.parse_k_escape(start),
            'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'h' | 'H' | 'v' | 'V' | 'R' => Ok(Node::CharType(
                CharType::new(ch, self.span_from(start)),
            )),
            'A' | 'z' | 'Z' | 'G' | 'b' | 'B' => Ok(Node::Assertion(Assertion::new(
                ch,
                self.span_from(start),
            ))),
            'K' => Ok(Node::Keep(Keep::new(self.span_from(start)))),
            'x' => {
                let mut code = String::from('x');
                if self.peek() == Some('{') {
                    self.take();
                    code.push('{');
                    code.push_str(&self.read_until('}', "character code")?);
                    code.push('}');
                } else {
                    for _ in 0..2 {
                        match self.peek() {
                            Some(c) if c.is_ascii_hexdigit() => {
                                code.push(c);
                                self.take();
                            }
                            _ => break,
                        }
                    }
                }
                Ok(Node::Unicode(Unicode::new(code, self.span_from(start))))
            }
            'u' if self.peek() == Some('{') => {
                self.take();
                let mut code = String::from("u{");
                code.push_str(&self.read_until('}', "character code")?);
                code.push('}');
                Ok(Node::Unicode(Unicode::new(code, self.span_from(start))))
            }
            'o' if self.peek() == Some('{') => {
                self.take();
                let mut code = String::from("o{");
                code.push_str(&self.read_until('}', "octal code")?);
                code.push('}');
                Ok(Node::Octal(Octal::new(code, self.span_from(start))))
            }
            'p' | 'P' => self.parse_unicode_prop(ch == 'P', start),
            'c' => {
                let letter = self
                    .take()
                    .ok_or_else(|| self.err("Expected character after \\c", self.pos))?;
                Ok(Node::ControlChar(ControlChar::new(
                    letter,
                    self.span_from(start),
                )))
            }
            't' => Ok(self.control_literal('\t', "\\t", start)),
            'n' => Ok(self.control_literal('\n', "\\n", start)),
            'r' => Ok(self.control_literal('\r', "\\r", start)),
            'f' => Ok(self.control_literal('\u{0C}', "\\f", start)),
            'e' => Ok(self.control_literal('\u{1B}', "\\e", start)),
            'a' => Ok(self.control_literal('\u{07}', "\\a", start)),
            other => Ok(Node::CharLiteral(CharLiteral::new(
                other,
                format!("\\{}", other),
                self.span_from(start),
            ))),
        }
    }

    fn control_literal(&self, value: char, original: &str, start: usize) -> Node {
        Node::CharLiteral(CharLiteral::new(
            value,
            original.to_string(),
            self.span_from(start),
        ))
    }

    /// `\g{N}`, `\g{-N}`, `\gN`, `\g-N` are backreferences; `\g<name>` and
    /// `\g'name'` are subroutine calls.
    fn parse_g_escape(&mut self, start: usize) -> Result<Node, ParserError> {
        match self.peek() {
            Some('{') => {
                self.take();
                let body = self.read_until('}', "group reference")?;
                Ok(Node::Backref(Backref::new(
                    format!("g{{{}}}", body),
                    self.span_from(start),
                )))
            }
            Some('<') => {
                self.take();
                let body = self.read_until('>', "subroutine reference")?;
                Ok(Node::Subroutine(Subroutine::new(
                    body,
                    "g".to_string(),
                    self.span_from(start),
                )))
            }
            Some('\'') => {
                self.take();
                let body = self.read_until('\'', "subroutine reference")?;
                Ok(Node::Subroutine(Subroutine::new(
                    body,
                    "g".to_string(),
                    self.span_from(start),
                )))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                let number = self.read_signed_number();
                Ok(Node::Backref(Backref::new(
                    format!("g{}", number),
                    self.span_from(start),
                )))
            }
            _ => Err(self.err("Expected group reference after \\g", self.pos)),
        }
    }

    /// `\k<name>`, `\k{name}` or `\k'name'`, preserved in their written form.
    fn parse_k_escape(&mut self, start: usize) -> Result<Node, ParserError> {
        let reference = match self.peek() {
            Some('<') => {
                self.take();
                format!("k<{}>", self.read_until('>', "named reference")?)
            }
            Some('{') => {
                self.take();
                format!("k{{{}}}", self.read_until('}', "named reference")?)
            }
            Some('\'') => {
                self.take();
                format!("k'{}'", self.read_until('\'', "named reference")?)
            }
            _ => return Err(self.err("Expected named reference after \\k", self.pos)),
        };
        Ok(Node::Backref(Backref::new(reference, self.span_from(start))))
    }

    fn parse_unicode_prop(&mut self, negated: bool, start: usize) -> Result<Node, ParserError> {
        if self.peek() == Some('{') {
            self.take();
            let name = self.read_until('}', "property name")?;
            return Ok(Node::UnicodeProp(UnicodeProp::new(
                name,
                true,
                negated,
                self.span_from(start),
            )));
        }
        match self.take() {
            Some(ch) if ch.is_alphanumeric() => Ok(Node::UnicodeProp(UnicodeProp::new(
                ch.to_string(),
                false,
                negated,
                self.span_from(start),
            ))),
            _ => Err(self.err("Expected property name after \\p", self.pos)),
        }
    }

    // ---- character classes ----

    fn parse_char_class(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        self.take(); // consume '['
        self.in_class += 1;

        let negated = if self.peek() == Some('^') {
            self.take();
            true
        } else {
            false
        };

        // A ']' directly after the opening (or after '^') is a literal
        let mut initial = Vec::new();
        if self.peek() == Some(']') {
            let lit_start = self.pos;
            self.take();
            initial.push(Node::Literal(Literal::new(
                "]".to_string(),
                self.span_from(lit_start),
            )));
        }

        let expression = self.parse_class_expression(initial, start)?;
        self.expect_char(']', "Unterminated character class")?;
        self.in_class -= 1;

        Ok(Node::CharClass(CharClass::new(
            expression,
            negated,
            self.span_from(start),
        )))
    }

    /// Class members up to (but not consuming) the closing `]`. A `&&` or
    /// `--` at member level splits the class into a set operation.
    fn parse_class_expression(
        &mut self,
        mut parts: Vec<Node>,
        class_start: usize,
    ) -> Result<Node, ParserError> {
        let expr_start = parts
            .first()
            .map(|n| n.span().start - self.base)
            .unwrap_or(self.pos);

        loop {
            match self.peek() {
                None => {
                    return Err(self.err("Unterminated character class", class_start));
                }
                Some(']') => break,
                _ => {}
            }

            if !parts.is_empty() && (self.starts_with("&&") || self.starts_with("--")) {
                let kind = if self.starts_with("&&") {
                    ClassOpKind::Intersection
                } else {
                    ClassOpKind::Subtraction
                };
                self.take();
                self.take();
                let left = self.wrap_class_parts(parts, expr_start);
                let right = self.parse_class_expression(Vec::new(), class_start)?;
                return Ok(Node::ClassOperation(ClassOperation::new(
                    kind,
                    left,
                    right,
                    self.span_from(expr_start),
                )));
            }

            let atom_start = self.pos;
            let atom = self.parse_class_atom()?;

            // Range: `a-z`, unless the '-' is trailing or starts `--`
            let is_range = self.peek() == Some('-')
                && !matches!(self.peek_at(1), None | Some(']') | Some('-'));
            if is_range && Self::range_endpoint(&atom) {
                self.take(); // consume '-'
                let end = self.parse_class_atom()?;
                parts.push(Node::Range(Range::new(
                    atom,
                    end,
                    self.span_from(atom_start),
                )));
            } else {
                parts.push(atom);
            }
        }

        Ok(self.wrap_class_parts(parts, expr_start))
    }

    /// Only plain characters can open a range; `\d-x` keeps the dash literal.
    fn range_endpoint(node: &Node) -> bool {
        matches!(node, Node::Literal(_) | Node::CharLiteral(_) | Node::Unicode(_) | Node::Octal(_))
    }

    fn wrap_class_parts(&self, mut parts: Vec<Node>, expr_start: usize) -> Node {
        match parts.len() {
            0 => Node::Sequence(Sequence::new(Vec::new(), self.span_from(expr_start))),
            1 => parts.pop().expect("one part"),
            _ => Node::Alternation(Alternation::new(parts, self.span_from(expr_start))),
        }
    }

    fn parse_class_atom(&mut self) -> Result<Node, ParserError> {
        let start = self.pos;
        let ch = self
            .peek()
            .ok_or_else(|| self.err("Unterminated character class", self.pos))?;

        if ch == '[' && self.peek_at(1) == Some(':') {
            self.take();
            self.take();
            let name = self.read_until(':', "POSIX class")?;
            self.expect_char(']', "Unterminated POSIX class")?;
            return Ok(Node::PosixClass(PosixClass::new(
                name,
                self.span_from(start),
            )));
        }

        if ch != '\\' {
            self.take();
            return Ok(Node::Literal(Literal::new(
                ch.to_string(),
                self.span_from(start),
            )));
        }

        // Escape inside a class
        self.take(); // consume '\'
        let esc = self
            .take()
            .ok_or_else(|| self.err("Pattern may not end with a backslash", start))?;
        match esc {
            'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'h' | 'H' | 'V' => Ok(Node::CharType(
                CharType::new(esc, self.span_from(start)),
            )),
            // Inside a class, \v and \b fall back to their literal meanings
            'v' => Ok(self.control_literal('\u{0B}', "\\v", start)),
            'b' => Ok(self.control_literal('\u{08}', "\\b", start)),
            't' => Ok(self.control_literal('\t', "\\t", start)),
            'n' => Ok(self.control_literal('\n', "\\n", start)),
            'r' => Ok(self.control_literal('\r', "\\r", start)),
            'f' => Ok(self.control_literal('\u{0C}', "\\f", start)),
            'e' => Ok(self.control_literal('\u{1B}', "\\e", start)),
            'a' => Ok(self.control_literal('\u{07}', "\\a", start)),
            'x' => {
                let mut code = String::from('x');
                if self.peek() == Some('{') {
                    self.take();
                    code.push('{');
                    code.push_str(&self.read_until('}', "character code")?);
                    code.push('}');
                } else {
                    for _ in 0..2 {
                        match self.peek() {
                            Some(c) if c.is_ascii_hexdigit() => {
                                code.push(c);
                                self.take();
                            }
                            _ => break,
                        }
                    }
                }
                Ok(Node::Unicode(Unicode::new(code, self.span_from(start))))
            }
            'u' if self.peek() == Some('{') => {
                self.take();
                let mut code = String::from("u{");
                code.push_str(&self.read_until('}', "character code")?);
                code.push('}');
                Ok(Node::Unicode(Unicode::new(code, self.span_from(start))))
            }
            'o' if self.peek() == Some('{') => {
                self.take();
                let mut code = String::from("o{");
                code.push_str(&self.read_until('}', "octal code")?);
                code.push('}');
                Ok(Node::Octal(Octal::new(code, self.span_from(start))))
            }
            'p' | 'P' => self.parse_unicode_prop(esc == 'P', start),
            'c' => {
                let letter = self
                    .take()
                    .ok_or_else(|| self.err("Expected character after \\c", self.pos))?;
                Ok(Node::ControlChar(ControlChar::new(
                    letter,
                    self.span_from(start),
                )))
            }
            '0'..='7' => {
                let mut code = String::from(esc);
                for _ in 0..2 {
                    match self.peek() {
                        Some(c @ '0'..='7') => {
                            code.push(c);
                            self.take();
                        }
                        _ => break,
                    }
                }
                Ok(Node::Octal(Octal::new(code, self.span_from(start))))
            }
            other => Ok(Node::CharLiteral(CharLiteral::new(
                other,
                format!("\\{}", other),
                self.span_from(start),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::lex;

    fn parse_ok(input: &str) -> Regex {
        let lexed = lex(input).expect("lex should succeed");
        Parser::new(lexed).parse().expect("parse should succeed")
    }

    fn parse_err(input: &str) -> ParserError {
        let lexed = lex(input).expect("lex should succeed");
        Parser::new(lexed).parse().expect_err("parse should fail")
    }

    #[test]
    fn test_parse_coalesced_literal() {
        let regex = parse_ok("/hello/");
        match regex.pattern.as_ref() {
            Node::Literal(lit) => {
                assert_eq!(lit.value, "hello");
                assert_eq!(lit.span, Span::new(1, 6));
            }
            other => panic!("Expected Literal node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_alternation() {
        let regex = parse_ok("/a|b|c/");
        match regex.pattern.as_ref() {
            Node::Alternation(alt) => assert_eq!(alt.alternatives.len(), 3),
            other => panic!("Expected Alternation node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_quantifier_binds_last_char() {
        let regex = parse_ok("/ab*/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert_eq!(seq.children.len(), 2);
                match &seq.children[1] {
                    Node::Quantifier(q) => {
                        assert_eq!(q.quantifier, "*");
                        assert_eq!(q.kind, QuantifierKind::Greedy);
                        match q.child.as_ref() {
                            Node::Literal(lit) => assert_eq!(lit.value, "b"),
                            other => panic!("Expected Literal child, got {:?}", other),
                        }
                    }
                    other => panic!("Expected Quantifier, got {:?}", other),
                }
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_lazy_and_possessive() {
        let regex = parse_ok("/a+?b{2,4}+/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                match &seq.children[0] {
                    Node::Quantifier(q) => assert_eq!(q.kind, QuantifierKind::Lazy),
                    other => panic!("Expected Quantifier, got {:?}", other),
                }
                match &seq.children[1] {
                    Node::Quantifier(q) => {
                        assert_eq!(q.kind, QuantifierKind::Possessive);
                        assert_eq!(q.quantifier, "{2,4}");
                    }
                    other => panic!("Expected Quantifier, got {:?}", other),
                }
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_brace_that_is_not_a_quantifier_stays_literal() {
        let regex = parse_ok("/a{b}/");
        match regex.pattern.as_ref() {
            Node::Literal(lit) => assert_eq!(lit.value, "a{b}"),
            other => panic!("Expected coalesced Literal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_kinds() {
        let cases = [
            ("/(a)/", GroupKind::Capturing),
            ("/(?:a)/", GroupKind::NonCapturing),
            ("/(?=a)/", GroupKind::LookaheadPositive),
            ("/(?!a)/", GroupKind::LookaheadNegative),
            ("/(?<=a)/", GroupKind::LookbehindPositive),
            ("/(?<!a)/", GroupKind::LookbehindNegative),
            ("/(?>a)/", GroupKind::Atomic),
            ("/(?|a)/", GroupKind::BranchReset),
        ];
        for (input, expected) in cases {
            let regex = parse_ok(input);
            match regex.pattern.as_ref() {
                Node::Group(group) => assert_eq!(group.kind, expected, "for {}", input),
                other => panic!("Expected Group for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_parse_named_group_variants() {
        for input in ["/(?<word>a)/", "/(?'word'a)/", "/(?P<word>a)/"] {
            let regex = parse_ok(input);
            match regex.pattern.as_ref() {
                Node::Group(group) => {
                    assert_eq!(group.kind, GroupKind::Named, "for {}", input);
                    assert_eq!(group.name.as_deref(), Some("word"), "for {}", input);
                }
                other => panic!("Expected Group for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_parse_inline_flags_group() {
        let regex = parse_ok("/(?im-sx:a)/");
        match regex.pattern.as_ref() {
            Node::Group(group) => {
                assert_eq!(group.kind, GroupKind::InlineFlags);
                assert_eq!(group.flags.as_deref(), Some("im-sx"));
            }
            other => panic!("Expected Group node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inline_flags_without_body() {
        let regex = parse_ok("/(?i)a/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => match &seq.children[0] {
                Node::Group(group) => {
                    assert_eq!(group.kind, GroupKind::InlineFlags);
                    assert!(group.child.is_empty());
                }
                other => panic!("Expected Group, got {:?}", other),
            },
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_char_class_with_range() {
        let regex = parse_ok("/[a-z0]/");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => {
                assert!(!class.negated);
                match class.expression.as_ref() {
                    Node::Alternation(alt) => {
                        assert_eq!(alt.alternatives.len(), 2);
                        assert!(matches!(alt.alternatives[0], Node::Range(_)));
                        assert!(matches!(alt.alternatives[1], Node::Literal(_)));
                    }
                    other => panic!("Expected Alternation, got {:?}", other),
                }
            }
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_negated_class_single_member() {
        let regex = parse_ok("/[^a]/");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => {
                assert!(class.negated);
                assert!(matches!(class.expression.as_ref(), Node::Literal(_)));
            }
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_leading_bracket_is_literal() {
        let regex = parse_ok("/[]a]/");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => match class.expression.as_ref() {
                Node::Alternation(alt) => {
                    assert_eq!(alt.alternatives.len(), 2);
                    match &alt.alternatives[0] {
                        Node::Literal(lit) => assert_eq!(lit.value, "]"),
                        other => panic!("Expected Literal, got {:?}", other),
                    }
                }
                other => panic!("Expected Alternation, got {:?}", other),
            },
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_posix_class() {
        let regex = parse_ok("/[[:alpha:]]/");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => match class.expression.as_ref() {
                Node::PosixClass(posix) => assert_eq!(posix.name, "alpha"),
                other => panic!("Expected PosixClass, got {:?}", other),
            },
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_class_operation() {
        let regex = parse_ok("/[a-z&&k]/");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => match class.expression.as_ref() {
                Node::ClassOperation(op) => {
                    assert_eq!(op.kind, ClassOpKind::Intersection);
                    assert!(matches!(op.left.as_ref(), Node::Range(_)));
                    assert!(matches!(op.right.as_ref(), Node::Literal(_)));
                }
                other => panic!("Expected ClassOperation, got {:?}", other),
            },
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_escapes() {
        let regex = parse_ok(r"/\d\K\A\x41\o{17}\p{L}\cA/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert!(matches!(&seq.children[0], Node::CharType(t) if t.letter == 'd'));
                assert!(matches!(&seq.children[1], Node::Keep(_)));
                assert!(matches!(&seq.children[2], Node::Assertion(a) if a.letter == 'A'));
                assert!(matches!(&seq.children[3], Node::Unicode(u) if u.code == "x41"));
                assert!(matches!(&seq.children[4], Node::Octal(o) if o.code == "o{17}"));
                assert!(
                    matches!(&seq.children[5], Node::UnicodeProp(p) if p.name == "L" && p.has_braces)
                );
                assert!(matches!(&seq.children[6], Node::ControlChar(c) if c.letter == 'A'));
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_backref_forms() {
        let cases = [
            (r"/(a)\1/", "1"),
            (r"/(?<x>a)\k<x>/", "k<x>"),
            (r"/(?<x>a)\k{x}/", "k{x}"),
            (r"/(a)\g{1}/", "g{1}"),
            (r"/(a)\g1/", "g1"),
            (r"/(a)\g{-1}/", "g{-1}"),
        ];
        for (input, expected) in cases {
            let regex = parse_ok(input);
            match regex.pattern.as_ref() {
                Node::Sequence(seq) => match seq.children.last().unwrap() {
                    Node::Backref(backref) => {
                        assert_eq!(backref.reference, expected, "for {}", input)
                    }
                    other => panic!("Expected Backref for {}, got {:?}", input, other),
                },
                other => panic!("Expected Sequence for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_parse_subroutine_forms() {
        let cases = [
            ("/(?R)/", "R", ""),
            ("/(?0)/", "0", ""),
            ("/(a)(?1)/", "1", ""),
            ("/(a)(?-1)/", "-1", ""),
            ("/(?<x>a)(?&x)/", "x", "&"),
            ("/(?<x>a)(?P>x)/", "x", "P>"),
            (r"/(?<x>a)\g<x>/", "x", "g"),
        ];
        for (input, reference, syntax) in cases {
            let regex = parse_ok(input);
            let node = match regex.pattern.as_ref() {
                Node::Sequence(seq) => seq.children.last().unwrap().clone(),
                other => other.clone(),
            };
            match node {
                Node::Subroutine(sub) => {
                    assert_eq!(sub.reference, reference, "for {}", input);
                    assert_eq!(sub.syntax, syntax, "for {}", input);
                }
                other => panic!("Expected Subroutine for {}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_parse_conditional_with_else() {
        let regex = parse_ok("/(a)(?(1)b|c)/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => match &seq.children[1] {
                Node::Conditional(cond) => {
                    assert!(matches!(cond.condition.as_ref(), Node::Backref(b) if b.reference == "1"));
                    assert!(cond.no.is_some());
                }
                other => panic!("Expected Conditional, got {:?}", other),
            },
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_conditional_define() {
        let regex = parse_ok("/(?(DEFINE)(?<digits>[0-9]))/");
        match regex.pattern.as_ref() {
            Node::Define(define) => {
                assert!(matches!(define.content.as_ref(), Node::Group(_)));
            }
            other => panic!("Expected Define node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_conditional_version() {
        let regex = parse_ok("/(?(VERSION>=10.4)a|b)/");
        match regex.pattern.as_ref() {
            Node::Conditional(cond) => match cond.condition.as_ref() {
                Node::VersionCondition(ver) => {
                    assert_eq!(ver.operator, ">=");
                    assert_eq!(ver.version, "10.4");
                }
                other => panic!("Expected VersionCondition, got {:?}", other),
            },
            other => panic!("Expected Conditional node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_verbs_and_limit() {
        let regex = parse_ok("/(*COMMIT)(*MARK:top)(*LIMIT_MATCH=100)/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert!(matches!(&seq.children[0], Node::PcreVerb(v) if v.verb == "COMMIT"));
                assert!(matches!(&seq.children[1], Node::PcreVerb(v) if v.verb == "MARK:top"));
                assert!(matches!(&seq.children[2], Node::LimitMatch(l) if l.limit == 100));
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_callout_forms() {
        let regex = parse_ok(r#"/(?C)(?C7)(?C"tag")/"#);
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert!(
                    matches!(&seq.children[0], Node::Callout(c) if c.identifier.is_empty() && !c.is_string)
                );
                assert!(matches!(&seq.children[1], Node::Callout(c) if c.identifier == "7"));
                assert!(
                    matches!(&seq.children[2], Node::Callout(c) if c.identifier == "tag" && c.is_string)
                );
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_comment_group() {
        let regex = parse_ok("/a(?#note)b/");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert!(matches!(&seq.children[1], Node::Comment(c) if c.text == "note"));
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_extended_mode_skips_whitespace_and_keeps_line_comments() {
        let regex = parse_ok("/a b #note\nc/x");
        match regex.pattern.as_ref() {
            Node::Sequence(seq) => {
                assert_eq!(seq.children.len(), 3);
                assert!(matches!(&seq.children[0], Node::Literal(l) if l.value == "ab"));
                assert!(matches!(&seq.children[1], Node::Comment(c) if c.text == "#note\n"));
                assert!(matches!(&seq.children[2], Node::Literal(l) if l.value == "c"));
            }
            other => panic!("Expected Sequence node, got {:?}", other),
        }
    }

    #[test]
    fn test_extended_mode_class_keeps_whitespace() {
        let regex = parse_ok("/[a b]/x");
        match regex.pattern.as_ref() {
            Node::CharClass(class) => match class.expression.as_ref() {
                Node::Alternation(alt) => assert_eq!(alt.alternatives.len(), 3),
                other => panic!("Expected Alternation, got {:?}", other),
            },
            other => panic!("Expected CharClass node, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_alternation_branches_allowed() {
        let regex = parse_ok("/a|/");
        match regex.pattern.as_ref() {
            Node::Alternation(alt) => {
                assert_eq!(alt.alternatives.len(), 2);
                assert!(alt.alternatives[1].is_empty());
            }
            other => panic!("Expected Alternation node, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_close_paren() {
        let err = parse_err("/test)/");
        assert!(err.message.contains("Unmatched ')'"));
    }

    #[test]
    fn test_unterminated_group() {
        let err = parse_err("/(a/");
        assert!(err.message.contains("Unterminated group"));
    }

    #[test]
    fn test_unterminated_class() {
        let err = parse_err("/[abc/");
        assert!(err.message.contains("Unterminated character class"));
    }

    #[test]
    fn test_trailing_backslash() {
        // A trailing backslash cannot survive the lexer's escape-aware
        // scan, so feed the parser a raw body directly
        let lexed = LexedPattern {
            delimiter: '/',
            closing: '/',
            pattern: "a\\".to_string(),
            flags: String::new(),
            pattern_offset: 1,
        };
        let err = Parser::new(lexed).parse().expect_err("parse should fail");
        assert!(err.message.contains("backslash"));
    }

    #[test]
    fn test_bare_quantifier_rejected() {
        let err = parse_err("/*a/");
        assert!(err.message.contains("Quantifier"));
    }

    #[test]
    fn test_spans_are_offset_into_full_input() {
        let regex = parse_ok("/ab/i");
        assert_eq!(regex.span, Span::new(0, 5));
        assert_eq!(regex.pattern.span(), Span::new(1, 3));
    }
}
