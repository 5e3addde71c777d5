// rmos-ingress/src/server.rs
// ============================================================================
// Module: Ingress HTTP Server
// Description: Router assembly, bearer-token auth, and the `tokio`/`axum`
//              serve loop.
// Purpose: Compose the pipeline, run, and governance route groups behind a
//          single router and bind it to the configured address.
// Dependencies: axum, rmos-config, tokio
// ============================================================================

//! ## Overview
//! [`build_router`] wires every route group onto one [`axum::Router`] and
//! layers the deprecation-header middleware so it runs uniformly across
//! every lane. [`serve`] is the process entry point: it builds state from
//! configuration and binds `tokio`'s TCP listener.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::response::Response;
use rmos_config::RmosConfig;
use thiserror::Error;

use crate::governance;
use crate::pipeline;
use crate::runs;
use crate::state::AppState;
use crate::state::StateError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while starting the ingress server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Application state could not be built from configuration.
    #[error(transparent)]
    State(#[from] StateError),
    /// The configured bind address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The server loop exited with an I/O error.
    #[error(transparent)]
    Serve(#[from] std::io::Error),
}

// ============================================================================
// SECTION: Router Assembly
// ============================================================================

/// Builds the fully wired router for the given state, including the
/// deprecation middleware and (when configured) bearer-token auth.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let bearer_tokens = state.bearer_tokens.clone();
    let mut router = Router::new()
        .merge(pipeline::router())
        .merge(runs::router())
        .merge(governance::router())
        .layer(from_fn_with_state(state.clone(), governance::deprecation_middleware));

    if !bearer_tokens.is_empty() {
        router = router.layer(from_fn_with_state(bearer_tokens, bearer_auth_middleware));
    }

    router.with_state(state)
}

/// Rejects requests whose `Authorization: Bearer` header doesn't match one
/// of the configured tokens. A request to `/api/health` is always admitted
/// so orchestration layers can probe liveness without credentials.
async fn bearer_auth_middleware(State(tokens): State<Vec<String>>, request: Request<Body>, next: Next) -> Response {
    if request.uri().path() == "/api/health" {
        return next.run(request).await;
    }
    if !authorized(request.headers(), &tokens) {
        return (StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response();
    }
    next.run(request).await
}

fn authorized(headers: &HeaderMap, tokens: &[String]) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let Some(token) = value.strip_prefix("Bearer ") else {
        return false;
    };
    tokens.iter().any(|candidate| candidate == token)
}

// ============================================================================
// SECTION: Serve Loop
// ============================================================================

/// Builds application state from `config` and serves the ingress HTTP API
/// until the process is terminated.
///
/// # Errors
///
/// Returns [`ServerError`] if state cannot be built or the configured
/// address cannot be bound.
pub async fn serve(config: &RmosConfig) -> Result<(), ServerError> {
    let state = AppState::build(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|source| ServerError::Bind { addr: config.server.bind_addr.clone(), source })?;

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(!authorized(&headers, &["secret".to_string()]));
    }

    #[test]
    fn matching_bearer_token_is_authorized() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer secret".parse().expect("valid header value"));
        assert!(authorized(&headers, &["secret".to_string()]));
    }

    #[test]
    fn mismatched_bearer_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer wrong".parse().expect("valid header value"));
        assert!(!authorized(&headers, &["secret".to_string()]));
    }
}
