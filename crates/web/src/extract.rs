//! The one place a request's session cookie is turned into a `Principal`
//! (§4.8: "invoking the gates in order: auth -> role -> host-load ->
//! engine"). Every gated handler takes `AuthenticatedPrincipal` as an
//! extractor argument; the role gate itself is a plain function call inside
//! the handler, since which role an operation needs varies per-route.

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use common::prelude::*;
use models::Principal;

use crate::state::SharedState;

pub const SESSION_COOKIE: &str = "switchyard_session";

pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared = SharedState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(SESSION_COOKIE).ok_or(CoreError::Unauthenticated)?;
        let (principal, _session_id) = shared.session.verify(cookie.value())?;
        Ok(Self(principal))
    }
}
