//! Code templates.
//!
//! Every `code` field of a definition is parsed into a [`CodeTemplate`]: an
//! ordered list of literal text and placeholder slots. The recognised
//! placeholders are:
//!
//! | text       | slot                                  |
//! |------------|---------------------------------------|
//! | `$_self`   | [`Placeholder::Subject`]              |
//! | `$_builder`| [`Placeholder::Builder`]              |
//! | `$_ctx`    | [`Placeholder::Context`]              |
//! | `$_op`     | [`Placeholder::Op`]                   |
//! | `$0`, `$1` | [`Placeholder::Positional`]           |
//!
//! `$$` stands for a literal `$`. Any other `$name` is plain text.
//!
//! Instantiation is total: a slot without a value is rendered back as its
//! placeholder, so a template can be filled in several steps.

use std::fmt;

/// A placeholder slot inside a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    Subject,
    Builder,
    Context,
    Op,
    Positional(usize),
}

/// Text of the subject placeholder.
pub const SUBJECT: &str = "$_self";

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Subject => f.write_str(SUBJECT),
            Placeholder::Builder => f.write_str("$_builder"),
            Placeholder::Context => f.write_str("$_ctx"),
            Placeholder::Op => f.write_str("$_op"),
            Placeholder::Positional(idx) => write!(f, "${idx}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A parsed code fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeTemplate {
    source: String,
    segments: Vec<Segment>,
}

/// Names bound to the ambient placeholders.
///
/// Passed explicitly to every instantiation instead of being resolved by
/// naming convention inside the generated code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ambient {
    pub builder: String,
    pub context: String,
    pub op: String,
}

impl Default for Ambient {
    fn default() -> Self {
        Self {
            builder: "builder".to_owned(),
            context: "ctx".to_owned(),
            op: "op".to_owned(),
        }
    }
}

/// Values for one instantiation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateArgs<'a> {
    pub subject: Option<&'a str>,
    pub ambient: Option<&'a Ambient>,
    pub positional: &'a [String],
}

impl<'a> TemplateArgs<'a> {
    pub fn new(ambient: &'a Ambient) -> Self {
        Self {
            ambient: Some(ambient),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_positional(mut self, positional: &'a [String]) -> Self {
        self.positional = positional;
        self
    }

    fn lookup(&self, slot: Placeholder) -> Option<&'a str> {
        match slot {
            Placeholder::Subject => self.subject,
            Placeholder::Builder => self.ambient.map(|a| a.builder.as_str()),
            Placeholder::Context => self.ambient.map(|a| a.context.as_str()),
            Placeholder::Op => self.ambient.map(|a| a.op.as_str()),
            Placeholder::Positional(idx) => self.positional.get(idx).map(String::as_str),
        }
    }
}

impl CodeTemplate {
    /// Parse a code fragment. Parsing never fails.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = parse_segments(&source);
        Self { source, segments }
    }

    /// The original text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Placeholder slots in textual order.
    pub fn slots(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Slot(slot) => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    pub fn mentions(&self, slot: Placeholder) -> bool {
        self.slots().any(|s| s == slot)
    }

    /// Fill in the slots that `args` provides.
    pub fn instantiate(&self, args: &TemplateArgs<'_>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for seg in &self.segments {
            match seg {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(slot) => match args.lookup(*slot) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&slot.to_string()),
                },
            }
        }
        out
    }

    /// Literal substring replacement on the source text, then re-parse.
    ///
    /// Replacement text is inserted as-is and never re-scanned.
    pub fn replace_text(&self, pattern: &str, replacement: &str) -> CodeTemplate {
        if pattern.is_empty() {
            return self.clone();
        }
        CodeTemplate::parse(self.source.replace(pattern, replacement))
    }
}

impl fmt::Display for CodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for CodeTemplate {
    fn from(source: &str) -> Self {
        CodeTemplate::parse(source)
    }
}

fn parse_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            text.push('$');
            rest = tail;
            continue;
        }

        let ident_len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map_or(after.len(), |(idx, _)| idx);
        let ident = &after[..ident_len];

        match placeholder_for(ident) {
            Some(slot) => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Slot(slot));
            }
            None => {
                text.push('$');
                text.push_str(ident);
            }
        }
        rest = &after[ident_len..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

fn placeholder_for(ident: &str) -> Option<Placeholder> {
    match ident {
        "_self" => Some(Placeholder::Subject),
        "_builder" => Some(Placeholder::Builder),
        "_ctx" => Some(Placeholder::Context),
        "_op" => Some(Placeholder::Op),
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse().ok().map(Placeholder::Positional)
        }
        _ => None,
    }
}
