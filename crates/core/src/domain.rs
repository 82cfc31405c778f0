use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hostname grammar: dot-separated labels of 1-63 alphanumeric-or-hyphen
/// characters, where a label never starts or ends with a hyphen.
///
/// This is the single source of truth for domain name validity. Both the
/// stanza handler and the REST controller go through it, so the two entry
/// points can never disagree on what a valid domain name is.
static DOMAIN_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("domain name pattern is valid")
});

/// Returns true when `name` satisfies the hostname grammar.
///
/// Pure predicate, no normalization. Empty input is invalid.
pub fn is_valid_domain_name(name: &str) -> bool {
    !name.is_empty() && DOMAIN_NAME_RE.is_match(name)
}

/// A validated, case-normalized domain name.
///
/// Domain names are compared and stored in lowercase; construction goes
/// through [`DomainName::parse`] so an instance always satisfies the
/// hostname grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainName(String);

#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid domain name")]
pub struct InvalidDomainName(pub String);

impl DomainName {
    /// Validates and normalizes a candidate domain name.
    pub fn parse(raw: &str) -> Result<Self, InvalidDomainName> {
        let normalized = raw.trim().to_ascii_lowercase();
        if is_valid_domain_name(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(InvalidDomainName(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
