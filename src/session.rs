//! Session and account services over a storage backend

use crate::address::{convert_public_key_to_algorand_address, validate_address};
use crate::error::WasmAlgoError;
use crate::storage::StorageBackend;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SESSION_PREFIX: &str = "session_";
const ACCOUNT_PREFIX: &str = "account_";

/// A dApp origin approved to request signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub origin: String,
    #[serde(default)]
    pub app_name: String,
    /// Base64 genesis hash of the network the session is bound to
    #[serde(default)]
    pub genesis_hash: String,
    #[serde(default)]
    pub authorized_addresses: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub used_at: DateTime<Utc>,
}

impl Session {
    /// New session for `origin`, stamped now
    pub fn new(origin: impl Into<String>, genesis_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        let origin = origin.into();
        Session {
            id: uuid::Uuid::new_v4().to_string(),
            app_name: origin.clone(),
            origin,
            genesis_hash: genesis_hash.into(),
            authorized_addresses: Vec::new(),
            created_at: now,
            used_at: now,
        }
    }

    pub fn authorizes(&self, address: &str) -> bool {
        self.authorized_addresses.iter().any(|a| a == address)
    }
}

/// An account whose key the wallet holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Hex encoded Ed25519 public key
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Account {
    pub fn address(&self) -> Result<String, WasmAlgoError> {
        convert_public_key_to_algorand_address(&self.public_key)
    }
}

fn read_all<S: StorageBackend, T: DeserializeOwned>(
    storage: &S,
    prefix: &str,
) -> Result<Vec<T>, WasmAlgoError> {
    let mut records = Vec::new();
    for key in storage.keys(prefix)? {
        match storage.get(&key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable record"),
            },
            None => continue,
        }
    }
    Ok(records)
}

fn read_one<S: StorageBackend, T: DeserializeOwned>(
    storage: &S,
    key: &str,
) -> Result<Option<T>, WasmAlgoError> {
    storage
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(WasmAlgoError::from))
        .transpose()
}

/// Persisted dApp sessions
#[derive(Debug, Clone)]
pub struct SessionService<S: StorageBackend> {
    storage: S,
}

impl<S: StorageBackend> SessionService<S> {
    pub fn new(storage: S) -> Self {
        SessionService { storage }
    }

    fn key(id: &str) -> String {
        format!("{SESSION_PREFIX}{id}")
    }

    /// Insert or overwrite the session with the same id
    pub fn save(&self, session: Session) -> Result<Session, WasmAlgoError> {
        if session.id.is_empty() {
            return Err(WasmAlgoError::Validation("Session id is required".to_string()));
        }
        let raw = serde_json::to_string(&session)?;
        self.storage.set(&Self::key(&session.id), &raw)?;
        debug!(session_id = %session.id, origin = %session.origin, "Saved session");
        Ok(session)
    }

    pub fn get_all(&self) -> Result<Vec<Session>, WasmAlgoError> {
        read_all(&self.storage, SESSION_PREFIX)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Session>, WasmAlgoError> {
        read_one(&self.storage, &Self::key(id))
    }

    /// Sessions for an origin, most recently used first
    pub fn get_by_origin(&self, origin: &str) -> Result<Vec<Session>, WasmAlgoError> {
        let mut sessions: Vec<Session> = self
            .get_all()?
            .into_iter()
            .filter(|s| s.origin == origin)
            .collect();
        sessions.sort_by(|a, b| b.used_at.cmp(&a.used_at));
        Ok(sessions)
    }

    pub fn remove_by_id(&self, id: &str) -> Result<(), WasmAlgoError> {
        self.storage.remove(&Self::key(id))?;
        info!(session_id = %id, "Removed session");
        Ok(())
    }

    /// Remove every session that authorizes `address`, returning them
    pub fn remove_by_address(&self, address: &str) -> Result<Vec<Session>, WasmAlgoError> {
        let removed: Vec<Session> = self
            .get_all()?
            .into_iter()
            .filter(|s| s.authorizes(address))
            .collect();
        for session in &removed {
            self.remove_by_id(&session.id)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<(), WasmAlgoError> {
        for key in self.storage.keys(SESSION_PREFIX)? {
            self.storage.remove(&key)?;
        }
        info!("Cleared all sessions");
        Ok(())
    }
}

/// Persisted accounts
#[derive(Debug, Clone)]
pub struct AccountService<S: StorageBackend> {
    storage: S,
}

impl<S: StorageBackend> AccountService<S> {
    pub fn new(storage: S) -> Self {
        AccountService { storage }
    }

    fn key(id: &str) -> String {
        format!("{ACCOUNT_PREFIX}{id}")
    }

    /// Insert or overwrite the account with the same id
    pub fn save(&self, account: Account) -> Result<Account, WasmAlgoError> {
        if account.id.is_empty() {
            return Err(WasmAlgoError::Validation("Account id is required".to_string()));
        }
        // Reject keys that do not derive an address
        account.address()?;
        let raw = serde_json::to_string(&account)?;
        self.storage.set(&Self::key(&account.id), &raw)?;
        debug!(account_id = %account.id, "Saved account");
        Ok(account)
    }

    pub fn get_all(&self) -> Result<Vec<Account>, WasmAlgoError> {
        read_all(&self.storage, ACCOUNT_PREFIX)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Account>, WasmAlgoError> {
        read_one(&self.storage, &Self::key(id))
    }

    pub fn remove_by_id(&self, id: &str) -> Result<(), WasmAlgoError> {
        self.storage.remove(&Self::key(id))?;
        info!(account_id = %id, "Removed account");
        Ok(())
    }

    /// Address for a hex public key
    pub fn convert_public_key_to_algorand_address(
        &self,
        public_key: &str,
    ) -> Result<String, WasmAlgoError> {
        convert_public_key_to_algorand_address(public_key)
    }

    /// Whether any stored account has this address
    pub fn is_account_known(&self, address: &str) -> Result<bool, WasmAlgoError> {
        if !validate_address(address) {
            return Ok(false);
        }
        Ok(self
            .get_all()?
            .iter()
            .any(|account| account.address().map(|a| a == address).unwrap_or(false)))
    }

    /// Account with the given address, if stored
    pub fn get_by_address(&self, address: &str) -> Result<Option<Account>, WasmAlgoError> {
        Ok(self
            .get_all()?
            .into_iter()
            .find(|account| account.address().map(|a| a == address).unwrap_or(false)))
    }
}
