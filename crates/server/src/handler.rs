//! Stanza-facing adapter: the custom IQ handler that lets clients create
//! new domains, and the handler registry the session layer dispatches
//! through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use timplus_core::{
    CREATE_DOMAIN_ELEMENT, CREATE_DOMAIN_NAMESPACE, ErrorCondition, Iq, IqType, StanzaElement,
};

use crate::gateway::DomainCreationGateway;

/// A handler for one (element, namespace) pair of IQ payloads.
#[async_trait]
pub trait IqHandler: Send + Sync {
    fn element(&self) -> &'static str;
    fn namespace(&self) -> &'static str;
    async fn handle_iq(&self, iq: &Iq) -> Iq;
}

/// Dispatches inbound IQs to the handler registered for their payload.
///
/// Unhandled payloads answer `service-unavailable`, so a deployment that
/// leaves client domain creation disabled rejects those requests at the
/// protocol level.
#[derive(Default)]
pub struct IqRouter {
    handlers: HashMap<(String, String), Arc<dyn IqHandler>>,
}

impl IqRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn IqHandler>) {
        let key = (handler.element().to_owned(), handler.namespace().to_owned());
        self.handlers.insert(key, handler);
    }

    pub async fn handle(&self, iq: &Iq) -> Iq {
        let handler = iq.payload.as_ref().and_then(|payload| {
            self.handlers
                .get(&(payload.name.clone(), payload.namespace.clone()))
        });
        match handler {
            Some(handler) => handler.handle_iq(iq).await,
            None => iq.error_reply(ErrorCondition::ServiceUnavailable),
        }
    }
}

/// Handles `create-domain` requests in `urn:timplus:domain:create`.
///
/// The sender must hold administrator privilege; that check runs through
/// the directory's admin-membership query inside the gateway.
pub struct DomainCreationIqHandler {
    gateway: Arc<DomainCreationGateway>,
}

impl DomainCreationIqHandler {
    pub fn new(gateway: Arc<DomainCreationGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl IqHandler for DomainCreationIqHandler {
    fn element(&self) -> &'static str {
        CREATE_DOMAIN_ELEMENT
    }

    fn namespace(&self) -> &'static str {
        CREATE_DOMAIN_NAMESPACE
    }

    async fn handle_iq(&self, iq: &Iq) -> Iq {
        if iq.ty != IqType::Set {
            return iq.error_reply(ErrorCondition::BadRequest);
        }
        let Some(payload) = iq.payload.as_ref() else {
            return iq.error_reply(ErrorCondition::BadRequest);
        };
        let domain_name = match payload.child_text("domain") {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => return iq.error_reply(ErrorCondition::BadRequest),
        };
        // Anonymous senders cannot hold admin privilege.
        let Some(from) = iq.from.as_ref() else {
            return iq.error_reply(ErrorCondition::Forbidden);
        };

        match self.gateway.create_domain(Some(from), &domain_name).await {
            Ok(created) => iq.result_reply(Some(
                StanzaElement::new(CREATE_DOMAIN_ELEMENT, CREATE_DOMAIN_NAMESPACE)
                    .with_child("domain", created.name.as_str())
                    .with_child("status", "created"),
            )),
            Err(err) => iq.error_reply(err.protocol_condition()),
        }
    }
}

#[cfg(test)]
mod tests {
    use timplus_core::Jid;

    use super::*;
    use crate::directory::{DirectoryService, MemoryDirectory};

    async fn fixture() -> (IqRouter, Arc<MemoryDirectory>) {
        let directory = Arc::new(MemoryDirectory::new());
        let gateway = Arc::new(DomainCreationGateway::new(directory.clone()));
        let mut router = IqRouter::new();
        router.register(Arc::new(DomainCreationIqHandler::new(gateway)));
        (router, directory)
    }

    fn create_iq(from: Option<&str>, domain: &str) -> Iq {
        Iq::set(
            "iq-1",
            from.map(|f| Jid::parse(f).unwrap()),
            StanzaElement::new(CREATE_DOMAIN_ELEMENT, CREATE_DOMAIN_NAMESPACE)
                .with_child("domain", domain),
        )
    }

    #[tokio::test]
    async fn admin_creates_domain_and_gets_created_status() {
        let (router, directory) = fixture().await;
        directory
            .add_admin_account("admin@new.test", "new.test")
            .await
            .unwrap();

        let reply = router
            .handle(&create_iq(Some("admin@new.test"), "tenant.example"))
            .await;
        assert_eq!(reply.ty, IqType::Result);
        let payload = reply.payload.unwrap();
        assert_eq!(payload.namespace, CREATE_DOMAIN_NAMESPACE);
        assert_eq!(payload.child_text("domain"), Some("tenant.example"));
        assert_eq!(payload.child_text("status"), Some("created"));
        assert!(directory
            .is_registered_domain("tenant.example")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn non_set_iq_is_bad_request() {
        let (router, _) = fixture().await;
        let mut iq = create_iq(Some("admin@new.test"), "tenant.example");
        iq.ty = IqType::Get;
        let reply = router.handle(&iq).await;
        assert_eq!(reply.error, Some(ErrorCondition::BadRequest));
    }

    #[tokio::test]
    async fn missing_domain_child_is_bad_request() {
        let (router, _) = fixture().await;
        let iq = Iq::set(
            "iq-2",
            Some(Jid::parse("admin@new.test").unwrap()),
            StanzaElement::new(CREATE_DOMAIN_ELEMENT, CREATE_DOMAIN_NAMESPACE),
        );
        let reply = router.handle(&iq).await;
        assert_eq!(reply.error, Some(ErrorCondition::BadRequest));
    }

    #[tokio::test]
    async fn non_admin_sender_is_forbidden() {
        let (router, directory) = fixture().await;
        let reply = router
            .handle(&create_iq(Some("mallory@new.test"), "tenant.example"))
            .await;
        assert_eq!(reply.error, Some(ErrorCondition::Forbidden));
        assert!(!directory
            .is_registered_domain("tenant.example")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_creation_is_conflict() {
        let (router, directory) = fixture().await;
        directory
            .add_admin_account("admin@new.test", "new.test")
            .await
            .unwrap();

        let first = router
            .handle(&create_iq(Some("admin@new.test"), "tenant.example"))
            .await;
        assert_eq!(first.ty, IqType::Result);
        let second = router
            .handle(&create_iq(Some("admin@new.test"), "tenant.example"))
            .await;
        assert_eq!(second.error, Some(ErrorCondition::Conflict));
    }

    #[tokio::test]
    async fn invalid_name_is_not_acceptable() {
        let (router, directory) = fixture().await;
        directory
            .add_admin_account("admin@new.test", "new.test")
            .await
            .unwrap();
        let reply = router
            .handle(&create_iq(Some("admin@new.test"), "-bad.example"))
            .await;
        assert_eq!(reply.error, Some(ErrorCondition::NotAcceptable));
    }

    #[tokio::test]
    async fn unregistered_payload_is_service_unavailable() {
        let router = IqRouter::new();
        let iq = Iq::set(
            "iq-3",
            None,
            StanzaElement::new("ping", "urn:xmpp:ping"),
        );
        let reply = router.handle(&iq).await;
        assert_eq!(reply.error, Some(ErrorCondition::ServiceUnavailable));
    }
}
