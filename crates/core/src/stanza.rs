//! In-memory IQ stanza framing for the one custom extension this
//! subsystem owns. Wire-level XMPP is handled by the surrounding session
//! layer; these types are what the handler registry dispatches on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::jid::Jid;

/// Element name of the domain creation extension.
pub const CREATE_DOMAIN_ELEMENT: &str = "create-domain";
/// Namespace of the domain creation extension.
pub const CREATE_DOMAIN_NAMESPACE: &str = "urn:timplus:domain:create";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IqType {
    Get,
    Set,
    Result,
    Error,
}

/// A child-bearing payload element, identified by name and namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StanzaElement {
    pub name: String,
    pub namespace: String,
    /// Child elements as (name, text) pairs, in document order.
    #[serde(default)]
    pub children: Vec<(String, String)>,
}

impl StanzaElement {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.children.push((name.into(), text.into()));
        self
    }

    /// Trimmed text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, text)| text.trim())
    }
}

/// An info/query stanza, reduced to the fields provisioning dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iq {
    pub id: String,
    pub from: Option<Jid>,
    pub to: Option<Jid>,
    #[serde(rename = "type")]
    pub ty: IqType,
    pub payload: Option<StanzaElement>,
    pub error: Option<ErrorCondition>,
}

impl Iq {
    /// A `set` request carrying a payload element.
    pub fn set(id: impl Into<String>, from: Option<Jid>, payload: StanzaElement) -> Self {
        Self {
            id: id.into(),
            from,
            to: None,
            ty: IqType::Set,
            payload: Some(payload),
            error: None,
        }
    }

    /// A `result` reply mirroring this request's id, with addressing swapped.
    pub fn result_reply(&self, payload: Option<StanzaElement>) -> Self {
        Self {
            id: self.id.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
            ty: IqType::Result,
            payload,
            error: None,
        }
    }

    /// An `error` reply mirroring this request's id.
    pub fn error_reply(&self, condition: ErrorCondition) -> Self {
        Self {
            id: self.id.clone(),
            from: self.to.clone(),
            to: self.from.clone(),
            ty: IqType::Error,
            payload: self.payload.clone(),
            error: Some(condition),
        }
    }
}

/// Standard protocol error conditions the provisioning handlers emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCondition {
    BadRequest,
    Forbidden,
    NotAcceptable,
    Conflict,
    InternalServerError,
    ServiceUnavailable,
}

impl ErrorCondition {
    /// The XMPP defined-condition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad-request",
            Self::Forbidden => "forbidden",
            Self::NotAcceptable => "not-acceptable",
            Self::Conflict => "conflict",
            Self::InternalServerError => "internal-server-error",
            Self::ServiceUnavailable => "service-unavailable",
        }
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
