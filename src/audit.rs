use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// One row of `audit_logs`. The id and timestamp come from column defaults.
#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

impl AuditEntry<'_> {
    pub async fn write(&self, pool: &DbPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audit_logs (user_id, action, resource, metadata) VALUES ($1, $2, $3, $4)",
        )
        .bind(self.actor)
        .bind(self.action)
        .bind(self.resource)
        .bind(&self.metadata)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Failures are logged and never surface to the caller.
pub async fn record(
    pool: &DbPool,
    actor: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let entry = AuditEntry {
        actor,
        action,
        resource,
        metadata,
    };
    if let Err(err) = entry.write(pool).await {
        tracing::warn!(error = %err, action, resource, "audit write failed");
    }
}
