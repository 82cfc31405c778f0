use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::is_valid_domain_name;

/// A bare JID: a node (local part) qualified by a domain.
///
/// Resources are out of scope for provisioning; the subsystem only needs
/// to identify requesters and the administrator login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jid {
    node: String,
    domain: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid bare JID")]
pub struct InvalidJid(pub String);

impl Jid {
    /// Parses `node@domain`. The domain part must satisfy the hostname
    /// grammar; the node must be non-empty and free of `@`.
    pub fn parse(raw: &str) -> Result<Self, InvalidJid> {
        let (node, domain) = raw
            .split_once('@')
            .ok_or_else(|| InvalidJid(raw.to_owned()))?;
        if node.is_empty() {
            return Err(InvalidJid(raw.to_owned()));
        }
        let domain = domain.to_ascii_lowercase();
        if !is_valid_domain_name(&domain) {
            return Err(InvalidJid(raw.to_owned()));
        }
        Ok(Self {
            node: node.to_owned(),
            domain,
        })
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node, self.domain)
    }
}

impl FromStr for Jid {
    type Err = InvalidJid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Jid {
    type Error = InvalidJid;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}
