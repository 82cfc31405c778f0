//! Core types shared across the TIM+ provisioning crates.
//!
//! This crate carries no I/O: identifier newtypes with their validation
//! rules, and the in-memory representation of the one custom stanza
//! extension (`urn:timplus:domain:create`) used for client-initiated
//! domain creation.

pub mod domain;
pub mod jid;
pub mod stanza;

pub use domain::{DomainName, InvalidDomainName, is_valid_domain_name};
pub use jid::{InvalidJid, Jid};
pub use stanza::{
    CREATE_DOMAIN_ELEMENT, CREATE_DOMAIN_NAMESPACE, ErrorCondition, Iq, IqType, StanzaElement,
};
