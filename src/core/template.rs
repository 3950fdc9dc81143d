//! Message template parsing and rendering
//!
//! A template such as `"Hello, {Name}!"` is parsed once into literal text and
//! property tokens. Parsing is total: anything that is not a well-formed
//! placeholder is kept as text, so a bad template degrades to literal output
//! instead of failing the log call.

use super::value::PropertyValue;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// How a placeholder's argument is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destructuring {
    /// Scalars stay scalars, collections are kept, other values become text
    #[default]
    Default,
    /// `@`: capture the full structure
    Destructure,
    /// `$`: capture the string rendering
    Stringify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left(usize),
    Right(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyToken {
    pub name: String,
    pub destructuring: Destructuring,
    pub alignment: Option<Alignment>,
    pub format: Option<String>,
    /// The placeholder exactly as written, used when no value is bound
    pub raw: String,
}

impl PropertyToken {
    /// Position for `{0}`-style placeholders
    pub fn position(&self) -> Option<usize> {
        if self.name.bytes().all(|b| b.is_ascii_digit()) {
            self.name.parse().ok()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Property(PropertyToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
    tokens: Vec<Token>,
}

impl MessageTemplate {
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: parse_tokens(text),
        }
    }

    /// A template with no placeholders at all
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            tokens: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn property_tokens(&self) -> impl Iterator<Item = &PropertyToken> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Property(p) => Some(p),
            Token::Text(_) => None,
        })
    }

    /// True when every placeholder is positional (`{0}`, `{1}`, ...)
    pub fn is_positional(&self) -> bool {
        let mut any = false;
        for token in self.property_tokens() {
            if token.position().is_none() {
                return false;
            }
            any = true;
        }
        any
    }

    /// Render against a property lookup; unbound placeholders render as written
    pub fn render<'a, F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a PropertyValue>,
    {
        let mut out = String::with_capacity(self.text.len());
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Property(prop) => match lookup(&prop.name) {
                    Some(value) => render_property(prop, value, &mut out),
                    None => out.push_str(&prop.raw),
                },
            }
        }
        out
    }
}

fn render_property(token: &PropertyToken, value: &PropertyValue, out: &mut String) {
    let mut rendered = String::new();
    match token.format.as_deref() {
        Some("j") => {
            let _ = write!(rendered, "{}", value.to_json_value());
        }
        // "l" and unknown formats both render the literal value
        _ => value.render_raw(&mut rendered),
    }

    match token.alignment {
        None => out.push_str(&rendered),
        Some(alignment) => {
            let width = match alignment {
                Alignment::Left(w) | Alignment::Right(w) => w,
            };
            let pad = width.saturating_sub(rendered.chars().count());
            if matches!(alignment, Alignment::Right(_)) {
                out.extend(std::iter::repeat(' ').take(pad));
            }
            out.push_str(&rendered);
            if matches!(alignment, Alignment::Left(_)) {
                out.extend(std::iter::repeat(' ').take(pad));
            }
        }
    }
}

fn parse_tokens(template: &str) -> Vec<Token> {
    let chars: Vec<char> = template.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let (text, next) = parse_text(&chars, pos);
        if !text.is_empty() {
            push_text(&mut tokens, text);
        }
        pos = next;

        if pos < chars.len() && chars[pos] == '{' {
            let (token, next) = parse_property(&chars, pos);
            match token {
                Token::Text(text) => push_text(&mut tokens, text),
                property => tokens.push(property),
            }
            pos = next;
        }
    }

    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: String) {
    if let Some(Token::Text(last)) = tokens.last_mut() {
        last.push_str(&text);
    } else {
        tokens.push(Token::Text(text));
    }
}

/// Consume literal text up to the next unescaped `{`
fn parse_text(chars: &[char], start: usize) -> (String, usize) {
    let mut accum = String::new();
    let mut pos = start;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '{' {
            if pos + 1 < chars.len() && chars[pos + 1] == '{' {
                accum.push('{');
                pos += 1;
            } else {
                break;
            }
        } else {
            accum.push(c);
            if c == '}' && pos + 1 < chars.len() && chars[pos + 1] == '}' {
                pos += 1;
            }
        }
        pos += 1;
    }
    (accum, pos)
}

fn parse_property(chars: &[char], start: usize) -> (Token, usize) {
    let mut pos = start + 1;
    while pos < chars.len() && is_valid_in_tag(chars[pos]) {
        pos += 1;
    }

    if pos == chars.len() || chars[pos] != '}' {
        let text: String = chars[start..pos].iter().collect();
        return (Token::Text(text), pos);
    }

    let next = pos + 1;
    let raw: String = chars[start..next].iter().collect();
    let content: String = chars[start + 1..pos].iter().collect();

    match parse_tag_content(&content, &raw) {
        Some(token) => (Token::Property(token), next),
        None => (Token::Text(raw), next),
    }
}

fn parse_tag_content(content: &str, raw: &str) -> Option<PropertyToken> {
    if content.is_empty() {
        return None;
    }

    let (name_part, alignment, format) = split_tag_content(content)?;

    let (destructuring, name) = match name_part.chars().next() {
        Some('@') => (Destructuring::Destructure, &name_part[1..]),
        Some('$') => (Destructuring::Stringify, &name_part[1..]),
        _ => (Destructuring::Default, name_part),
    };

    if !is_valid_name(name) {
        return None;
    }

    if let Some(format) = format {
        if format.is_empty() || !format.chars().all(is_valid_in_format) {
            return None;
        }
    }

    let alignment = match alignment {
        Some(text) => Some(parse_alignment(text)?),
        None => None,
    };

    Some(PropertyToken {
        name: name.to_string(),
        destructuring,
        alignment,
        format: format.map(str::to_string),
        raw: raw.to_string(),
    })
}

/// Split `Name[,alignment][:format]`
fn split_tag_content(content: &str) -> Option<(&str, Option<&str>, Option<&str>)> {
    let format_delim = content.find(':');
    let alignment_delim = content.find(',');

    match (alignment_delim, format_delim) {
        (None, None) => Some((content, None, None)),
        (None, Some(f)) => Some((&content[..f], None, Some(&content[f + 1..]))),
        (Some(a), Some(f)) if a > f => Some((&content[..f], None, Some(&content[f + 1..]))),
        (Some(a), None) => Some((&content[..a], Some(&content[a + 1..]), None)),
        (Some(a), Some(f)) => {
            if f == a + 1 {
                return None;
            }
            Some((
                &content[..a],
                Some(&content[a + 1..f]),
                Some(&content[f + 1..]),
            ))
        }
    }
}

fn parse_alignment(text: &str) -> Option<Alignment> {
    let (left, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width: usize = digits.parse().ok()?;
    if width == 0 {
        return None;
    }
    Some(if left {
        Alignment::Left(width)
    } else {
        Alignment::Right(width)
    })
}

fn is_valid_in_tag(c: char) -> bool {
    c == '@' || c == '$' || c == ':' || is_valid_in_name(c) || is_valid_in_format(c)
}

fn is_valid_in_name(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_valid_in_format(c: char) -> bool {
    c != '}' && c != '{' && (c.is_alphanumeric() || c.is_ascii_punctuation() || c == ' ')
}

/// Property names are non-empty and made of letters, digits and `_`
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_valid_in_name)
}

const MAX_CACHED_TEMPLATES: usize = 1000;
const MAX_CACHED_TEMPLATE_LENGTH: usize = 1024;

/// Parsed templates keyed by their text.
///
/// Bounded in both entry count and template length so that templates built
/// from dynamic data cannot grow it without limit.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: RwLock<HashMap<String, Arc<MessageTemplate>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, text: &str) -> Arc<MessageTemplate> {
        if text.len() > MAX_CACHED_TEMPLATE_LENGTH {
            return Arc::new(MessageTemplate::parse(text));
        }

        if let Some(found) = self.templates.read().get(text) {
            return Arc::clone(found);
        }

        let parsed = Arc::new(MessageTemplate::parse(text));
        let mut templates = self.templates.write();
        if templates.len() < MAX_CACHED_TEMPLATES {
            templates
                .entry(text.to_string())
                .or_insert_with(|| Arc::clone(&parsed));
        }
        parsed
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }
}
