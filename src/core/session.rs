use crate::shared::errors::StorageError;
use crate::storage::KeyValueStore;
use crate::sync::PostgrestStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Key under which the minted guest id is persisted.
pub const GUEST_KEY: &str = "guest_user_id";

/// Who the current records belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    User {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    Guest {
        id: String,
    },
}

impl Identity {
    pub fn owner_id(&self) -> &str {
        match self {
            Identity::User { id, .. } | Identity::Guest { id } => id,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest { .. })
    }
}

pub trait OwnerProvider: Send + Sync {
    /// The active owner id, if a session exists.
    fn current_owner_id(&self) -> Option<String>;

    /// The active owner id, minting and persisting a guest id when there is none.
    fn ensure_owner_id(&self) -> Result<String, StorageError>;
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    identity: RwLock<Option<Identity>>,
    remote: Option<Arc<PostgrestStore>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            identity: RwLock::new(None),
            remote: None,
        }
    }

    /// Forward access tokens to `remote` on sign-in/sign-out.
    pub fn with_remote(mut self, remote: Arc<PostgrestStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().ok().and_then(|guard| guard.clone())
    }

    fn set_identity(&self, identity: Option<Identity>) -> Result<(), StorageError> {
        let mut guard = self
            .identity
            .write()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        *guard = identity;
        Ok(())
    }

    /// Switch to an authenticated user. The token, if any, authorizes remote calls.
    pub fn sign_in(
        &self,
        user_id: &str,
        email: Option<String>,
        access_token: Option<String>,
    ) -> Result<Identity, StorageError> {
        let identity = Identity::User {
            id: user_id.to_string(),
            email,
        };
        self.set_identity(Some(identity.clone()))?;
        if let Some(remote) = &self.remote {
            remote.set_access_token(access_token);
        }

        tracing::info!(target: "session", owner_id = %user_id, "Signed in");
        Ok(identity)
    }

    /// Drop the authenticated user. The persisted guest id survives and is reused.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        let previous = self.identity();
        self.set_identity(None)?;
        if let Some(remote) = &self.remote {
            remote.set_access_token(None);
        }

        if let Some(identity) = previous {
            tracing::info!(target: "session", owner_id = %identity.owner_id(), "Signed out");
        }
        Ok(())
    }

    fn guest_identity(&self) -> Result<Identity, StorageError> {
        if let Some(id) = self.store.get(GUEST_KEY)? {
            return Ok(Identity::Guest { id });
        }

        let id = format!("guest_{}", uuid::Uuid::new_v4());
        self.store.set(GUEST_KEY, &id)?;
        tracing::info!(target: "session", owner_id = %id, "Minted guest identity");
        Ok(Identity::Guest { id })
    }
}

impl OwnerProvider for SessionManager {
    fn current_owner_id(&self) -> Option<String> {
        self.identity().map(|identity| identity.owner_id().to_string())
    }

    fn ensure_owner_id(&self) -> Result<String, StorageError> {
        if let Some(owner_id) = self.current_owner_id() {
            return Ok(owner_id);
        }

        let guest = self.guest_identity()?;
        let owner_id = guest.owner_id().to_string();
        self.set_identity(Some(guest))?;
        Ok(owner_id)
    }
}
