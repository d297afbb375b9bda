//! Keyword expressions.
//!
//! Each configured keyword is a small search expression:
//!
//! - `請求書`: plain text, matched in subject, sender, recipients and
//!   attachment filenames
//! - `from:billing@example.com`, `to:`, `subject:`, `label:`, `filename:`
//! - `has:attachment`
//! - `"exact phrase"` and `subject:"two words"`
//! - `-term`: exclusion
//! - `a b`: both must match; `a OR b`: either
//!
//! Other `word:value` operators are not interpreted; the whole token is
//! searched as plain text. Parentheses are not supported and are trimmed.
//! Matching is case-insensitive substring matching.

use crate::model::attachment::AttachmentMeta;
use crate::model::mail::MailEntry;

/// Which part of a message a term looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    /// Subject, sender, recipients, and attachment filenames.
    Any,
    From,
    To,
    Subject,
    Label,
    Filename,
    HasAttachment,
}

/// One search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub field: SearchField,
    /// Lowercased needle. Empty for [`SearchField::HasAttachment`].
    pub value: String,
    pub negated: bool,
}

/// A parsed keyword: alternatives (OR) of conjunctions (AND) of terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordExpr {
    raw: String,
    alternatives: Vec<Vec<Term>>,
}

impl KeywordExpr {
    /// Parse a keyword. Never fails; an expression without terms is
    /// reported by [`KeywordExpr::is_empty`].
    pub fn parse(raw: &str) -> Self {
        let mut alternatives = Vec::new();
        let mut current = Vec::new();

        for token in tokenize(raw) {
            if token == "OR" {
                if !current.is_empty() {
                    alternatives.push(std::mem::take(&mut current));
                }
                continue;
            }
            if let Some(term) = parse_term(&token) {
                current.push(term);
            }
        }
        if !current.is_empty() {
            alternatives.push(current);
        }

        Self {
            raw: raw.trim().to_string(),
            alternatives,
        }
    }

    /// The keyword as configured (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` when parsing produced no usable term.
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn alternatives(&self) -> &[Vec<Term>] {
        &self.alternatives
    }

    /// Whether the keyword needs grouping when OR-combined with others.
    pub fn is_compound(&self) -> bool {
        tokenize(&self.raw).len() > 1
    }

    /// Evaluate against a message and its attachments.
    pub fn matches(&self, entry: &MailEntry, attachments: &[AttachmentMeta]) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|t| term_matches(t, entry, attachments)))
    }
}

/// Split on whitespace, keeping quoted runs together (quotes retained).
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_term(token: &str) -> Option<Term> {
    let token = token.trim_matches(|c: char| c == '(' || c == ')');
    let (negated, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let field_value = token.split_once(':').and_then(|(op, value)| {
        let field = match op.to_lowercase().as_str() {
            "from" => SearchField::From,
            "to" => SearchField::To,
            "subject" => SearchField::Subject,
            "label" => SearchField::Label,
            "filename" => SearchField::Filename,
            "has" if value.eq_ignore_ascii_case("attachment") => SearchField::HasAttachment,
            _ => return None,
        };
        Some((field, value))
    });

    let (field, value) = field_value.unwrap_or((SearchField::Any, token));
    let value = unquote(value).to_lowercase();

    if field == SearchField::HasAttachment {
        return Some(Term {
            field,
            value: String::new(),
            negated,
        });
    }
    if value.is_empty() {
        return None;
    }

    Some(Term {
        field,
        value,
        negated,
    })
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(s)
}

fn term_matches(term: &Term, entry: &MailEntry, attachments: &[AttachmentMeta]) -> bool {
    let needle = term.value.as_str();
    let hit = match term.field {
        SearchField::Any => {
            contains(&entry.subject, needle)
                || contains(&entry.from.address, needle)
                || contains(&entry.from.display_name, needle)
                || entry
                    .to
                    .iter()
                    .any(|a| contains(&a.address, needle) || contains(&a.display_name, needle))
                || attachments.iter().any(|a| contains(&a.filename, needle))
        }
        SearchField::From => {
            contains(&entry.from.address, needle) || contains(&entry.from.display_name, needle)
        }
        SearchField::To => entry
            .to
            .iter()
            .any(|a| contains(&a.address, needle) || contains(&a.display_name, needle)),
        SearchField::Subject => contains(&entry.subject, needle),
        SearchField::Label => entry.labels.iter().any(|l| label_matches(l, needle)),
        SearchField::Filename => attachments.iter().any(|a| contains(&a.filename, needle)),
        SearchField::HasAttachment => attachments.iter().any(|a| !a.is_inline),
    };
    hit != term.negated
}

fn contains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Gmail accepts `-` in place of `/` and spaces in label searches.
fn label_matches(label: &str, needle_lower: &str) -> bool {
    let label = label.to_lowercase();
    let spelled: String = label
        .chars()
        .map(|c| if c == '/' || c.is_whitespace() { '-' } else { c })
        .collect();
    label == needle_lower || spelled == needle_lower
}
