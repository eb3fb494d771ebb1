use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{HistoryEntry, HistoryEntryType, HistoryError};

pub struct HistoryService {
    supabase: SupabaseClient,
}

impl HistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Append one journal entry. Each append inserts its own row keyed by
    /// user id; there is no read-modify-write of an owning document, so two
    /// simultaneous appends both land.
    pub async fn append(
        &self,
        user_id: Uuid,
        entry_type: HistoryEntryType,
        payload: Value,
        auth_token: Option<&str>,
    ) -> Result<HistoryEntry, HistoryError> {
        debug!("Appending {} history entry for user {}", entry_type, user_id);

        let entry_data = json!({
            "user_id": user_id,
            "entry_type": entry_type.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
            "payload": payload,
        });

        let created = self
            .supabase
            .insert_returning("/rest/v1/user_history_entries", auth_token, entry_data)
            .await
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        let row = created.into_iter().next().ok_or_else(|| {
            HistoryError::DatabaseError("Store returned no row for appended entry".to_string())
        })?;

        serde_json::from_value(row).map_err(|e| HistoryError::DatabaseError(e.to_string()))
    }

    /// Read every entry for a user. The store returns rows in no particular
    /// order; display ordering is the caller's concern.
    pub async fn list(
        &self,
        user_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        debug!("Listing history for user {}", user_id);

        let path = format!("/rest/v1/user_history_entries?user_id=eq.{}", user_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| HistoryError::DatabaseError(e.to_string()))
            })
            .collect()
    }
}
