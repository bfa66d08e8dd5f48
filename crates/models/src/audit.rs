use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dal::{web::AnyWay, DBTable, EasyTransaction, ExistingRow, ToSqlObject, FKey, ID};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Append-only audit trail entry (§3 AuditRecord, §4.9 Audit Sink).
///
/// `update`/`delete` are overridden below to refuse outright — the sink is
/// insert-only, in keeping with I5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: FKey<AuditRecord>,
    pub at: DateTime<Utc>,
    pub principal: String,
    pub role: Role,
    pub operation: String,
    /// JSON-encoded request inputs with secrets redacted before storage.
    pub inputs: serde_json::Value,
    pub outcome: String,
    pub duration_ms: i64,
    pub source_addr: String,
}

impl DBTable for AuditRecord {
    fn table_name() -> &'static str {
        "audit_records"
    }

    fn id(&self) -> ID {
        self.id.into_id()
    }

    fn from_row(row: tokio_postgres::Row) -> Result<ExistingRow<Self>, anyhow::Error> {
        Ok(ExistingRow::from_existing(Self {
            id: row.try_get("id").anyway()?,
            at: row.try_get("at").anyway()?,
            principal: row.try_get("principal").anyway()?,
            role: role_from_str(&row.try_get::<_, String>("role").anyway()?)?,
            operation: row.try_get("operation").anyway()?,
            inputs: row.try_get("inputs").anyway()?,
            outcome: row.try_get("outcome").anyway()?,
            duration_ms: row.try_get("duration_ms").anyway()?,
            source_addr: row.try_get("source_addr").anyway()?,
        }))
    }

    fn to_rowlike(&self) -> Result<HashMap<&str, Box<dyn ToSqlObject>>, anyhow::Error> {
        let c: [(&str, Box<dyn ToSqlObject>); 9] = [
            ("id", Box::new(self.id)),
            ("at", Box::new(self.at)),
            ("principal", Box::new(self.principal.clone())),
            ("role", Box::new(self.role.to_string())),
            ("operation", Box::new(self.operation.clone())),
            ("inputs", Box::new(self.inputs.clone())),
            ("outcome", Box::new(self.outcome.clone())),
            ("duration_ms", Box::new(self.duration_ms)),
            ("source_addr", Box::new(self.source_addr.clone())),
        ];
        Ok(c.into_iter().collect())
    }

    async fn update(&self, _t: &mut EasyTransaction<'_>) -> Result<(), anyhow::Error> {
        anyhow::bail!("audit records are append-only and cannot be updated")
    }
}

fn role_from_str(s: &str) -> Result<Role, anyhow::Error> {
    match s {
        "viewer" => Ok(Role::Viewer),
        "net-admin" => Ok(Role::NetAdmin),
        "super-admin" => Ok(Role::SuperAdmin),
        other => anyhow::bail!("unrecognized role column value: {other}"),
    }
}
