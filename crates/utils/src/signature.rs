use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

/// A user-authored block of text appended to outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub id: i64,

    /// Owner of the signature.
    pub user_id: i64,

    #[serde(default)]
    pub title: String,

    /// Raw signature text, formatted before it is appended.
    pub signature: String,

    /// Whether this is the owner's default signature.
    #[serde(default)]
    pub default_flag: bool,

    /// Soft deletion timestamp, `0` while the signature is live.
    #[serde(default)]
    pub time_deleted: i64,
}

impl Signature {
    pub fn new(id: i64, user_id: i64, signature: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            title: String::new(),
            signature: signature.into(),
            default_flag: false,
            time_deleted: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.time_deleted > 0
    }
}

/// Trait for signature lookups.
///
/// Lookups are scoped by owner: a signature belonging to another user is
/// reported as missing, as is a soft deleted one.
pub trait SignatureStore: Send + Sync {
    /// Finds `signature_id` if it belongs to `user_id` and is not deleted.
    fn find_user_signature(&self, signature_id: i64, user_id: i64) -> Option<Signature>;

    /// Finds the live default signature of `user_id`.
    fn default_signature(&self, user_id: i64) -> Option<Signature>;
}

/// In-memory signature store keyed by signature id.
#[derive(Debug, Clone, Default)]
pub struct MemorySignatureStore {
    signatures: Arc<HashMap<i64, Signature>>,
}

impl MemorySignatureStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `signatures`, later duplicates of an id win.
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        let signatures = signatures.into_iter().map(|s| (s.id, s)).collect();
        Self {
            signatures: Arc::new(signatures),
        }
    }

    /// Loads signatures from a JSON array.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let signatures: Vec<Signature> = serde_json::from_str(raw)?;
        Ok(Self::from_signatures(signatures))
    }

    /// Adds or replaces a signature.
    ///
    /// Note: clones the internal map when it is shared with other handles.
    pub fn insert(&mut self, signature: Signature) {
        Arc::make_mut(&mut self.signatures).insert(signature.id, signature);
    }

    /// Returns the number of stored signatures, deleted ones included.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl SignatureStore for MemorySignatureStore {
    fn find_user_signature(&self, signature_id: i64, user_id: i64) -> Option<Signature> {
        self.signatures
            .get(&signature_id)
            .filter(|s| s.user_id == user_id && !s.is_deleted())
            .cloned()
    }

    fn default_signature(&self, user_id: i64) -> Option<Signature> {
        self.signatures
            .values()
            .filter(|s| s.user_id == user_id && s.default_flag && !s.is_deleted())
            .min_by_key(|s| s.id)
            .cloned()
    }
}
