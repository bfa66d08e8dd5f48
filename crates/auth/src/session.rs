//! Session handling (§4.7, §9 supplemented feature): an opaque,
//! server-signed cookie carrying the principal, role, issue time, and last
//! activity time, plus a small in-memory registry swept on a timer so
//! revoked/expired session ids don't accumulate forever.
//!
//! The cookie itself is the source of truth for validity (stateless,
//! verified by HMAC on every request); the registry exists only so an
//! operator-visible session count stays bounded and idle entries get
//! evicted, mirroring the governor's own "never let a map grow unbounded"
//! posture (§5).

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use common::prelude::*;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use models::{Principal, Role};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(serde::Serialize, serde::Deserialize)]
struct SessionPayload {
    session_id: Uuid,
    name: String,
    role: Role,
    issued_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Signs and verifies session cookies, and tracks live session ids for the
/// idle sweep. Cheap to clone: the signing key is a small `Vec<u8>` and the
/// registry is an `Arc`-free `DashMap` shared by reference from callers that
/// hold one instance for the process lifetime.
pub struct SessionCodec {
    key: Vec<u8>,
    idle_timeout: Duration,
    registry: DashMap<Uuid, DateTime<Utc>>,
}

impl SessionCodec {
    pub fn new(signing_key: &str, idle_timeout: Duration) -> Self {
        Self {
            key: signing_key.as_bytes().to_vec(),
            idle_timeout,
            registry: DashMap::new(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts a key of any length")
    }

    /// Issues a new signed cookie value for a freshly authenticated principal.
    pub fn issue(&self, principal: &Principal) -> String {
        let now = Utc::now();
        let payload = SessionPayload {
            session_id: Uuid::new_v4(),
            name: principal.name.clone(),
            role: principal.role,
            issued_at: now,
            last_activity: now,
        };
        self.registry.insert(payload.session_id, now);
        self.encode(&payload)
    }

    fn encode(&self, payload: &SessionPayload) -> String {
        let body = serde_json::to_vec(payload).expect("session payload is always serializable");
        let body_b64 = URL_SAFE_NO_PAD.encode(body);

        let mut mac = self.mac();
        mac.update(body_b64.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{body_b64}.{sig_b64}")
    }

    /// Verifies the signature and idle timeout, returning the principal and
    /// the session id if the cookie is still live. Does not itself bump
    /// `last_activity` — callers that want to extend the session call
    /// [`refresh`](Self::refresh) instead.
    pub fn verify(&self, cookie: &str) -> Result<(Principal, Uuid), CoreError> {
        let (body_b64, sig_b64) = cookie
            .split_once('.')
            .ok_or(CoreError::Unauthenticated)?;

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| CoreError::Unauthenticated)?;
        let mut mac = self.mac();
        mac.update(body_b64.as_bytes());
        mac.verify_slice(&sig).map_err(|_| CoreError::Unauthenticated)?;

        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| CoreError::Unauthenticated)?;
        let payload: SessionPayload =
            serde_json::from_slice(&body).map_err(|_| CoreError::Unauthenticated)?;

        // A cookie revoked by `/logout` still carries a valid signature and
        // an unexpired idle window; the registry is what actually makes
        // `revoke` take effect rather than only clearing the client's jar.
        if !self.registry.contains_key(&payload.session_id) {
            return Err(CoreError::Unauthenticated);
        }

        let idle_for = Utc::now().signed_duration_since(payload.last_activity);
        if idle_for.num_seconds() < 0
            || idle_for.to_std().unwrap_or(Duration::MAX) > self.idle_timeout
        {
            self.registry.remove(&payload.session_id);
            return Err(CoreError::Unauthenticated);
        }

        Ok((Principal::new(payload.name, payload.role), payload.session_id))
    }

    /// `/session/keepalive`: verifies the existing cookie, then re-signs it
    /// with `last_activity` bumped to now and the original `issued_at`
    /// preserved.
    pub fn refresh(&self, cookie: &str) -> Result<String, CoreError> {
        let (body_b64, sig_b64) = cookie
            .split_once('.')
            .ok_or(CoreError::Unauthenticated)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| CoreError::Unauthenticated)?;
        let mut mac = self.mac();
        mac.update(body_b64.as_bytes());
        mac.verify_slice(&sig).map_err(|_| CoreError::Unauthenticated)?;

        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| CoreError::Unauthenticated)?;
        let mut payload: SessionPayload =
            serde_json::from_slice(&body).map_err(|_| CoreError::Unauthenticated)?;

        if !self.registry.contains_key(&payload.session_id) {
            return Err(CoreError::Unauthenticated);
        }

        let idle_for = Utc::now().signed_duration_since(payload.last_activity);
        if idle_for.num_seconds() < 0
            || idle_for.to_std().unwrap_or(Duration::MAX) > self.idle_timeout
        {
            self.registry.remove(&payload.session_id);
            return Err(CoreError::Unauthenticated);
        }

        payload.last_activity = Utc::now();
        self.registry.insert(payload.session_id, payload.last_activity);
        Ok(self.encode(&payload))
    }

    /// `/session/check` (§6): unlike [`verify`](Self::verify), never returns
    /// an error — an absent or expired session is just `None`, since this
    /// endpoint's whole purpose is to answer "is there a valid session?"
    /// rather than enforce one.
    pub fn check(&self, cookie: &str) -> Option<(Principal, i64)> {
        let (principal, _id) = self.verify(cookie).ok()?;
        let (body_b64, _sig_b64) = cookie.split_once('.')?;
        let body = URL_SAFE_NO_PAD.decode(body_b64).ok()?;
        let payload: SessionPayload = serde_json::from_slice(&body).ok()?;
        let idle_for = Utc::now().signed_duration_since(payload.last_activity);
        let remaining = self.idle_timeout.as_secs() as i64 - idle_for.num_seconds();
        Some((principal, remaining.max(0)))
    }

    pub fn revoke(&self, session_id: Uuid) {
        self.registry.remove(&session_id);
    }

    /// Drops any tracked session id whose last known activity is older than
    /// the idle timeout. The cookie itself would already fail `verify` by
    /// then; this just keeps the bookkeeping map from growing forever.
    pub fn sweep(&self) {
        let idle = chrono::Duration::from_std(self.idle_timeout).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - idle;
        self.registry.retain(|_, last_activity| *last_activity >= cutoff);
    }

    /// Spawns the periodic sweep task (mirrors the Host-Load Guard's own
    /// `spawn_sampler` shape: a detached tokio task owning an `Arc` clone).
    pub fn spawn_sweeper(
        self: std::sync::Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.sweep();
            }
        })
    }

    pub fn tracked_session_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_fresh_cookie() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_secs(300));
        let principal = Principal::new("alice", Role::NetAdmin);
        let cookie = codec.issue(&principal);

        let (resolved, _id) = codec.verify(&cookie).unwrap();
        assert_eq!(resolved, principal);
    }

    #[test]
    fn rejects_tampered_cookie() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_secs(300));
        let cookie = codec.issue(&Principal::new("alice", Role::Viewer));
        let mut tampered = cookie.clone();
        tampered.push('x');
        assert!(matches!(codec.verify(&tampered), Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn rejects_cookie_signed_with_a_different_key() {
        let issuer = SessionCodec::new("key-one", Duration::from_secs(300));
        let verifier = SessionCodec::new("key-two", Duration::from_secs(300));
        let cookie = issuer.issue(&Principal::new("alice", Role::Viewer));
        assert!(matches!(verifier.verify(&cookie), Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn rejects_idle_expired_cookie() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_millis(0));
        let cookie = codec.issue(&Principal::new("alice", Role::Viewer));
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(codec.verify(&cookie), Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn refresh_extends_last_activity_and_keeps_identity() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_secs(300));
        let principal = Principal::new("alice", Role::SuperAdmin);
        let cookie = codec.issue(&principal);
        let refreshed = codec.refresh(&cookie).unwrap();

        let (resolved, _id) = codec.verify(&refreshed).unwrap();
        assert_eq!(resolved, principal);
    }

    #[test]
    fn check_reports_remaining_time_without_erroring_on_garbage() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_secs(300));
        let cookie = codec.issue(&Principal::new("alice", Role::Viewer));
        let (principal, remaining) = codec.check(&cookie).expect("fresh cookie is valid");
        assert_eq!(principal.name, "alice");
        assert!(remaining > 0 && remaining <= 300);

        assert!(codec.check("not-a-cookie").is_none());
    }

    #[test]
    fn revoked_session_fails_verify_even_within_the_idle_window() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_secs(300));
        let cookie = codec.issue(&Principal::new("alice", Role::Viewer));
        let (_, session_id) = codec.verify(&cookie).unwrap();

        codec.revoke(session_id);

        assert!(matches!(codec.verify(&cookie), Err(CoreError::Unauthenticated)));
        assert!(matches!(codec.refresh(&cookie), Err(CoreError::Unauthenticated)));
    }

    #[test]
    fn sweep_drops_stale_registry_entries() {
        let codec = SessionCodec::new("test-signing-key", Duration::from_millis(0));
        let _cookie = codec.issue(&Principal::new("alice", Role::Viewer));
        std::thread::sleep(Duration::from_millis(5));
        codec.sweep();
        assert_eq!(codec.tracked_session_count(), 0);
    }
}
