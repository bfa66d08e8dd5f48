//! `/login`, `/logout`, `/session/keepalive`, `/session/check` (§4.7, §6).

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use common::prelude::*;

use crate::dto::{LoginRequest, LoginResponse, SessionCheckResponse};
use crate::extract::{AuthenticatedPrincipal, SESSION_COOKIE};
use crate::state::SharedState;

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
}

pub async fn login(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), CoreError> {
    let started = Instant::now();
    let principal =
        auth::resolve_principal(&req.username, &req.password, &state.roles, state.directory.as_deref())
            .await;

    let (principal, outcome) = match principal {
        Ok(p) => (p, "success"),
        Err(e) => {
            audit_login(&state, &req.username, addr, "failure", started).await;
            return Err(e);
        }
    };

    let cookie_value = state.session.issue(&principal);
    audit_login(&state, &principal.name, addr, outcome, started).await;

    Ok((jar.add(session_cookie(cookie_value)), Json(LoginResponse { role: principal.role })))
}

/// A login audit failure is logged but never turned into an error response
/// — I5's "audit write precedes success response" binds privileged writes
/// on switches, not the login attempt itself, so a broken audit sink
/// shouldn't additionally lock operators out of the service.
async fn audit_login(
    state: &SharedState,
    username: &str,
    addr: SocketAddr,
    outcome: &str,
    started: Instant,
) {
    let Ok(mut client) = dal::new_client(&state.db).await else {
        tracing::error!(username, "could not open a database connection to audit a login attempt");
        return;
    };
    let input = engine::AuditInput {
        principal: username.to_owned(),
        role: models::Role::least_privileged(),
        operation: "login".to_owned(),
        inputs: serde_json::json!({"username": username}),
        outcome: outcome.to_owned(),
        duration_ms: started.elapsed().as_millis() as i64,
        source_addr: addr.to_string(),
    };
    if let Err(e) = engine::write_audit_standalone(&mut *client, input).await {
        tracing::error!(username, error = %e, "failed to audit a login attempt");
    }
}

pub async fn logout(
    State(state): State<SharedState>,
    AuthenticatedPrincipal(_principal): AuthenticatedPrincipal,
    jar: CookieJar,
) -> Result<CookieJar, CoreError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok((_, session_id)) = state.session.verify(cookie.value()) {
            state.session.revoke(session_id);
        }
    }
    Ok(jar.remove(Cookie::named(SESSION_COOKIE)))
}

pub async fn keepalive(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<CookieJar, CoreError> {
    let cookie = jar.get(SESSION_COOKIE).ok_or(CoreError::Unauthenticated)?;
    let refreshed = state.session.refresh(cookie.value())?;
    Ok(jar.add(session_cookie(refreshed)))
}

pub async fn session_check(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Json<SessionCheckResponse> {
    let result = jar.get(SESSION_COOKIE).and_then(|c| state.session.check(c.value()));
    Json(match result {
        Some((principal, remaining_seconds)) => {
            SessionCheckResponse { valid: true, role: Some(principal.role), remaining_seconds }
        }
        None => SessionCheckResponse { valid: false, role: None, remaining_seconds: 0 },
    })
}
