use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Column holding the owner id on every synced table.
pub const OWNER_COLUMN: &str = "user_id";

/// A row type that can live both in the remote table and in the local fallback cache.
pub trait SyncRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Create: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;

    /// Remote table name.
    const TABLE: &'static str;
    /// Local cache key prefix; the owner id is appended.
    const LOCAL_PREFIX: &'static str;

    fn id(&self) -> &str;

    fn owner_id(&self) -> &str;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Build a record for the local cache when the remote insert failed.
    fn new_local(id: String, owner_id: &str, input: &Self::Create, now: DateTime<Utc>) -> Self;

    /// Merge a partial update over this record and refresh `updated_at`.
    fn apply_patch(&mut self, patch: &Self::Patch, now: DateTime<Utc>);

    /// Body sent to the remote insert.
    fn insert_payload(owner_id: &str, input: &Self::Create) -> Result<Value, serde_json::Error> {
        owned_payload(owner_id, input)
    }
}

/// Serialize `input` and stamp it with the owner column.
pub fn owned_payload<I: Serialize>(owner_id: &str, input: &I) -> Result<Value, serde_json::Error> {
    let mut payload = serde_json::to_value(input)?;
    if let Some(object) = payload.as_object_mut() {
        object.insert(OWNER_COLUMN.to_string(), Value::String(owner_id.to_string()));
    }
    Ok(payload)
}
