//! Filename templates.
//!
//! A template such as `{date}_{sender}_{original}` is rendered into an
//! attachment filename. Four placeholders are recognized:
//!
//! - `{date}`     : message receipt date, `YYYY-MM-DD`, in the `Date:` offset
//! - `{subject}`  : message subject, verbatim
//! - `{sender}`   : local part of the sender address (before `@`)
//! - `{original}` : original attachment filename without its extension
//!
//! Anything else, including unknown `{tokens}` and unbalanced braces, is
//! copied through literally. Substituted values are never re-scanned.
//! Rendering does not deduplicate names; that is up to the storage layer.

use std::fmt;

use crate::model::mail::MailEntry;

/// A recognized placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Date,
    Subject,
    Sender,
    Original,
}

impl Placeholder {
    /// All placeholders, in documentation order.
    pub const ALL: [Placeholder; 4] = [
        Placeholder::Date,
        Placeholder::Subject,
        Placeholder::Sender,
        Placeholder::Original,
    ];

    /// Token name without braces.
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Subject => "subject",
            Self::Sender => "sender",
            Self::Original => "original",
        }
    }

    /// Look up a token name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNameFields {
    pub date: String,
    pub subject: String,
    pub sender: String,
    pub original: String,
}

impl FileNameFields {
    /// Build the fields for one attachment of a message.
    ///
    /// Returns the fields together with the original extension (if any),
    /// which the caller passes to [`FileNameFormat::render_with_extension`].
    pub fn from_message(entry: &MailEntry, attachment_name: &str) -> (Self, Option<String>) {
        let (stem, ext) = split_extension(attachment_name);
        let fields = Self {
            date: entry.local_date().format("%Y-%m-%d").to_string(),
            subject: entry.subject.clone(),
            sender: entry.from.local_part().to_string(),
            original: stem.to_string(),
        };
        (fields, ext.map(str::to_string))
    }

    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Date => &self.date,
            Placeholder::Subject => &self.subject,
            Placeholder::Sender => &self.sender,
            Placeholder::Original => &self.original,
        }
    }
}

/// A parsed filename template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameFormat {
    raw: String,
    segments: Vec<Segment>,
    unknown: Vec<String>,
}

impl FileNameFormat {
    /// Parse a template. Never fails.
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut unknown = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let token = after
                .find('}')
                .map(|close| &after[..close])
                .filter(|inner| !inner.contains('{'));

            match token {
                Some(inner) => {
                    if let Some(p) = Placeholder::from_name(inner) {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Field(p));
                    } else {
                        unknown.push(format!("{{{inner}}}"));
                        literal.push('{');
                        literal.push_str(inner);
                        literal.push('}');
                    }
                    rest = &after[inner.len() + 1..];
                }
                None => {
                    // Unbalanced or nested brace: keep it and rescan after it
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            raw: raw.to_string(),
            segments,
            unknown,
        }
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Brace tokens that are not placeholders, in order of appearance.
    pub fn unknown_tokens(&self) -> &[String] {
        &self.unknown
    }

    /// Placeholders used, in order of appearance (repeats included).
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    /// Whether the template substitutes `placeholder` anywhere.
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.placeholders().any(|p| p == placeholder)
    }

    /// Substitute every placeholder with its value.
    pub fn render(&self, fields: &FileNameFields) -> String {
        let mut out = String::with_capacity(self.raw.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => out.push_str(fields.get(*p)),
            }
        }
        out
    }

    /// Render and reattach the original extension, if there was one.
    pub fn render_with_extension(&self, fields: &FileNameFields, extension: Option<&str>) -> String {
        let mut name = self.render(fields);
        if let Some(ext) = extension.filter(|e| !e.is_empty()) {
            name.push('.');
            name.push_str(ext);
        }
        name
    }
}

impl fmt::Display for FileNameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Render `format` in one call.
pub fn render(format: &str, fields: &FileNameFields) -> String {
    FileNameFormat::parse(format).render(fields)
}

/// Split `invoice.pdf` into `("invoice", Some("pdf"))`.
///
/// Only the last extension is split off. Dotfiles (`.env`) and names
/// ending in a dot have no extension.
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(0) | None => (filename, None),
        Some(i) if i + 1 == filename.len() => (filename, None),
        Some(i) => (&filename[..i], Some(&filename[i + 1..])),
    }
}
