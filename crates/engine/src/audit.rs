//! Audit Sink (§4.9): the single, insert-only writer for `AuditRecord`s.
//!
//! Sits beside the engines rather than inside them — the request router
//! calls this after an engine call returns (success or failure) and before
//! it answers the caller, per I5: a privileged write whose audit record
//! fails to persist must not be reported as a success, even though the
//! switch-side change, once sent, cannot be rolled back.

use chrono::Utc;
use common::prelude::*;
use dal::{AsEasyTransaction, EasyTransaction, NewRow, ID};
use models::{AuditRecord, Role};

/// Everything the router knows about a request by the time it's ready to
/// audit it. `inputs` must already have secrets redacted by the caller —
/// the sink itself does no scrubbing.
pub struct AuditInput {
    pub principal: String,
    pub role: Role,
    pub operation: String,
    pub inputs: serde_json::Value,
    pub outcome: String,
    pub duration_ms: i64,
    pub source_addr: String,
}

/// Inserts one audit record and returns its id. A failure here is the
/// caller's signal to convert an otherwise-successful response into
/// `CoreError::Internal` (§4.9).
pub async fn write_audit(t: &mut EasyTransaction<'_>, input: AuditInput) -> Result<ID, CoreError> {
    let record = AuditRecord {
        id: dal::FKey::new_id_dangling(),
        at: Utc::now(),
        principal: input.principal,
        role: input.role,
        operation: input.operation,
        inputs: input.inputs,
        outcome: input.outcome,
        duration_ms: input.duration_ms,
        source_addr: input.source_addr,
    };
    let fkey = NewRow::new(record).insert(t).await.internal()?;
    Ok(fkey.into_id())
}

/// Convenience wrapper for call sites that only hold a `Client`/`ClientPair`
/// rather than an already-open transaction (e.g. the router, which owns the
/// connection pool, not the engines).
pub async fn write_audit_standalone(
    client: &mut impl AsEasyTransaction,
    input: AuditInput,
) -> Result<ID, CoreError> {
    let mut t = client.easy_transaction().await.internal()?;
    let id = write_audit(&mut t, input).await?;
    t.commit().await.internal()?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_input_carries_pre_redacted_json_only() {
        let input = AuditInput {
            principal: "jdoe".to_owned(),
            role: Role::NetAdmin,
            operation: "vlan_change.execute".to_owned(),
            inputs: serde_json::json!({"switch": "SW-1", "vlan": 100}),
            outcome: "success".to_owned(),
            duration_ms: 1200,
            source_addr: "10.0.0.5".to_owned(),
        };
        assert_eq!(input.inputs["vlan"], 100);
    }
}
