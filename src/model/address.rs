//! Email address parsing (RFC 5322 §3.4), just enough for sender matching.

use serde::{Deserialize, Serialize};

/// A parsed email address.
///
/// - `"請求担当 <billing@example.com>"` → `display_name = "請求担当"`, `address = "billing@example.com"`
/// - `"billing@example.com"` → `display_name = ""`, `address = "billing@example.com"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare address (`user@domain`), or the raw value if unparseable.
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address from a header value.
    ///
    /// Accepts `user@domain`, `<user@domain>`, `Name <user@domain>` and
    /// `"Quoted, Name" <user@domain>`. Anything else is kept as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        let angled = trimmed
            .rfind('<')
            .zip(trimmed.rfind('>'))
            .filter(|(start, end)| end > start);

        match angled {
            Some((start, end)) => Self {
                display_name: strip_quotes(&trimmed[..start]),
                address: trimmed[start + 1..end].trim().to_string(),
            },
            None => Self {
                display_name: String::new(),
                address: trimmed.to_string(),
            },
        }
    }

    /// Parse a comma-separated list, honoring commas inside quotes and angles.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        let mut results = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;
        let mut in_angle = false;

        for (i, ch) in raw.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' if !in_quotes && !in_angle => {
                    results.push(Self::parse(&raw[start..i]));
                    start = i + 1;
                }
                _ => {}
            }
        }
        results.push(Self::parse(&raw[start..]));
        results.retain(|a| !a.address.is_empty());
        results
    }

    /// Part before `@` (the whole address if there is no `@`).
    pub fn local_part(&self) -> &str {
        self.address.split('@').next().unwrap_or("").trim()
    }

    /// Part after `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.address.split_once('@').map(|(_, d)| d)
    }

    /// `"Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("billing@example.com");
        assert_eq!(addr.address, "billing@example.com");
        assert_eq!(addr.display_name, "");
    }

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("Invoice Desk <invoice@company.co.jp>");
        assert_eq!(addr.address, "invoice@company.co.jp");
        assert_eq!(addr.display_name, "Invoice Desk");
        assert_eq!(addr.local_part(), "invoice");
        assert_eq!(addr.domain(), Some("company.co.jp"));
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Accounts, Payable\" <ap@example.com>");
        assert_eq!(addr.display_name, "Accounts, Payable");
        assert_eq!(addr.address, "ap@example.com");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com, ");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[1].address, "other@c.com");
    }

    #[test]
    fn test_local_part_without_at() {
        let addr = EmailAddress::parse("MAILER-DAEMON");
        assert_eq!(addr.local_part(), "MAILER-DAEMON");
        assert_eq!(addr.domain(), None);
    }

    #[test]
    fn test_display() {
        let addr = EmailAddress::parse("Alice <alice@example.com>");
        assert_eq!(addr.to_string(), "Alice <alice@example.com>");
        assert_eq!(EmailAddress::parse("alice@example.com").display(), "alice@example.com");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(EmailAddress::parse("").address, "");
        assert!(EmailAddress::parse_list("").is_empty());
    }
}
