//! REST adapter for domain management.
//!
//! Endpoints mirror the stanza handler onto HTTP:
//! - `POST /api/domains/create` — create a domain
//! - `GET /api/domains/{domain_name}/exists` — read-only existence check
//! - `GET /health` — liveness probe
//!
//! Authorization for the create endpoint is delegated entirely to the
//! surrounding HTTP security layer; the existence check is deliberately
//! unauthenticated (domain existence is not a secret).

use std::sync::Arc;

use salvo::affix_state;
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DomainCreationError;
use crate::gateway::DomainCreationGateway;

/// Shared state injected into the REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<DomainCreationGateway>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCreationRequest {
    pub domain_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCreationResponse {
    pub success: bool,
    pub message: String,
    pub domain_name: String,
}

/// Builds the REST router with `state` affixed.
pub fn router(state: AppState) -> Router {
    Router::new()
        .hoop(affix_state::inject(state))
        .push(
            Router::with_path("api/domains")
                .push(Router::with_path("create").post(create_domain))
                .push(Router::with_path("{domain_name}/exists").get(domain_exists)),
        )
        .push(Router::with_path("health").get(health_check))
}

fn http_status(err: &DomainCreationError) -> StatusCode {
    match err {
        DomainCreationError::InvalidRequest | DomainCreationError::InvalidFormat(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainCreationError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainCreationError::Conflict(_) => StatusCode::CONFLICT,
        DomainCreationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[handler]
async fn create_domain(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(state) = depot.obtain::<AppState>() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };
    let body = match req.parse_json::<DomainCreationRequest>().await {
        Ok(body) => body,
        Err(_) => {
            res.status_code(StatusCode::BAD_REQUEST);
            res.render(Json(DomainCreationResponse {
                success: false,
                message: "malformed request body".to_owned(),
                domain_name: String::new(),
            }));
            return;
        }
    };

    match state.gateway.create_domain(None, &body.domain_name).await {
        Ok(created) => {
            res.render(Json(DomainCreationResponse {
                success: true,
                message: "Domain created successfully".to_owned(),
                domain_name: created.name.as_str().to_owned(),
            }));
        }
        Err(err) => {
            res.status_code(http_status(&err));
            res.render(Json(DomainCreationResponse {
                success: false,
                message: err.to_string(),
                domain_name: body.domain_name,
            }));
        }
    }
}

#[handler]
async fn domain_exists(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let Ok(state) = depot.obtain::<AppState>() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };
    let Some(name) = req.param::<String>("domain_name") else {
        res.status_code(StatusCode::BAD_REQUEST);
        return;
    };
    match state.gateway.domain_exists(&name).await {
        Ok(exists) => res.render(Json(exists)),
        Err(err) => {
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            res.render(Json(serde_json::json!({ "error": err.to_string() })));
        }
    }
}

#[handler]
async fn health_check() -> &'static str {
    "OK"
}
