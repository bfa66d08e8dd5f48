//! Directory bind (§4.7): authenticate against a central directory over
//! REST and read back the caller's group memberships, the same
//! login-then-query shape as the teacher's `users::ipa::IPA` client, trimmed
//! to the one round trip this service needs.

use common::prelude::*;
use config::DirectoryConfig;
use serde::Deserialize;
use serde_json::json;

pub struct DirectoryClient {
    client: reqwest::Client,
    config: DirectoryConfig,
}

#[derive(Deserialize)]
struct GroupsResponse {
    groups: Vec<String>,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build directory http client");
        Self { client, config }
    }

    /// Binds as `username`/`password`, then asks the directory for the
    /// bound principal's group memberships. A bind failure and a directory
    /// outage both surface as `CoreError::Unauthenticated` to the caller —
    /// §4.7 doesn't distinguish "wrong password" from "directory down" at
    /// the session layer, only at the log line.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>, CoreError> {
        let bind = self
            .client
            .post(format!("{}/bind", self.config.url))
            .json(&json!({ "dn": format!("uid={username},{}", self.config.base_dn), "password": password }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "directory bind request failed");
                CoreError::Unauthenticated
            })?;

        if !bind.status().is_success() {
            tracing::info!(username, status = %bind.status(), "directory bind rejected");
            return Err(CoreError::Unauthenticated);
        }

        let groups = self
            .client
            .get(format!("{}/groups", self.config.url))
            .query(&[("dn", format!("uid={username},{}", self.config.base_dn))])
            .basic_auth(&self.config.bind_username, Some(&self.config.bind_password))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "directory group lookup failed");
                CoreError::Unauthenticated
            })?
            .json::<GroupsResponse>()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "directory returned an unparsable group list");
                CoreError::Unauthenticated
            })?;

        Ok(groups.groups)
    }
}
