//! Request surface for the keys endpoint
//!
//! [`KeysBackend`] is what a routing layer calls into. It turns loosely typed
//! request fields (key type strings, base64 context and nonce) into
//! validated store operations and shapes the results into serializable
//! responses.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use transit_core::{KeyType, validate};
use transit_crypto::{CryptoError, KDF_NAME};

use crate::config::TransitConfig;
use crate::derivation::derive_public_key;
use crate::error::{DerivationError, PolicyError, PolicyResult};
use crate::policy::Policy;
use crate::request::PolicyRequest;
use crate::store::PolicyStore;

/// Body of a create-or-get call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteKeyRequest {
    pub name: String,
    /// Key type identifier; the backend default applies when absent
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub derived: bool,
    pub convergent_encryption: bool,
    pub exportable: bool,
}

impl WriteKeyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, key_type: impl Into<String>) -> Self {
        self.key_type = Some(key_type.into());
        self
    }

    pub fn with_derived(mut self, derived: bool) -> Self {
        self.derived = derived;
        self
    }

    pub fn with_convergent_encryption(mut self, convergent: bool) -> Self {
        self.convergent_encryption = convergent;
        self
    }

    pub fn with_exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }
}

/// Result of a create-or-get call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteKeyResponse {
    pub created: bool,
    /// Advisory messages; a redundant create is reported here, not as an error
    pub warnings: Vec<String>,
}

/// Parameters of a read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadKeyRequest {
    pub name: String,
    /// Base64 derivation context
    pub context: Option<String>,
    /// Base64 12-byte nonce, for convergent policies
    pub nonce: Option<String>,
    /// Include raw key material (exportable policies only)
    pub export: bool,
}

impl ReadKeyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }
}

/// Public metadata for one key version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyVersionInfo {
    pub creation_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Read response for a named key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub derived: bool,
    pub convergent_encryption: bool,
    pub exportable: bool,
    pub latest_version: u32,
    pub supports_encryption: bool,
    pub supports_decryption: bool,
    pub supports_derivation: bool,
    pub supports_signing: bool,
    pub keys: BTreeMap<u32, KeyVersionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kdf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_public_key: Option<String>,
    /// Base64 private material per version, only on an explicit export
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_keys: Option<BTreeMap<u32, String>>,
}

impl KeyInfo {
    /// Describe `policy` for a read
    ///
    /// A `context` yields a derived public key for derived asymmetric
    /// policies and is otherwise ignored. A `nonce` is only accepted by
    /// convergent policies.
    ///
    /// Deriving an RSA or ECDSA public key generates a key pair, so async
    /// callers should run this on a blocking thread.
    pub fn describe(
        policy: &Policy,
        context: Option<&[u8]>,
        nonce: Option<&[u8]>,
        export: bool,
    ) -> PolicyResult<Self> {
        if nonce.is_some() && !policy.convergent() {
            return Err(DerivationError::NonceNotAllowed.into());
        }

        let key_type = policy.key_type();

        let exported_keys = if export {
            if !policy.exportable() {
                return Err(PolicyError::invalid_request("key is not exportable"));
            }
            Some(
                policy
                    .versions()
                    .map(|(version, entry)| (version, entry.export()))
                    .collect(),
            )
        } else {
            None
        };

        let derived_public_key = match context {
            Some(context) if policy.derived() && key_type.supports_public_key_export() => Some(
                derive_public_key(policy, policy.latest_version(), context, nonce)?,
            ),
            _ => None,
        };

        let keys = policy
            .versions()
            .map(|(version, entry)| {
                let info = KeyVersionInfo {
                    creation_time: entry.creation_time(),
                    public_key: entry.public_key().map(str::to_string),
                };
                (version, info)
            })
            .collect();

        Ok(Self {
            name: policy.name().to_string(),
            key_type,
            derived: policy.derived(),
            convergent_encryption: policy.convergent(),
            exportable: policy.exportable(),
            latest_version: policy.latest_version(),
            supports_encryption: key_type.supports_encryption(),
            supports_decryption: key_type.supports_decryption(),
            supports_derivation: key_type.supports_derivation(),
            supports_signing: key_type.supports_signing(),
            keys,
            kdf: policy.derived().then(|| KDF_NAME.to_string()),
            derived_public_key,
            exported_keys,
        })
    }
}

/// The keys endpoint
pub struct KeysBackend {
    store: Arc<PolicyStore>,
    default_key_type: KeyType,
}

impl KeysBackend {
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self {
            store,
            default_key_type: KeyType::default(),
        }
    }

    /// Key type used when a write omits `type`
    pub fn with_default_key_type(mut self, key_type: KeyType) -> Self {
        self.default_key_type = key_type;
        self
    }

    /// Wire storage, store and backend from configuration
    pub async fn from_config(config: &TransitConfig) -> PolicyResult<Self> {
        let storage = config.open_storage().await?;
        let store = Arc::new(PolicyStore::new(storage));
        Ok(Self::new(store).with_default_key_type(config.default_key_type))
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    pub async fn list_keys(&self) -> PolicyResult<Vec<String>> {
        self.store.list_names().await
    }

    /// Create a key, or report that it already exists
    pub async fn write_key(&self, request: WriteKeyRequest) -> PolicyResult<WriteKeyResponse> {
        let identifier = request
            .key_type
            .as_deref()
            .unwrap_or(self.default_key_type.as_str());
        let key_type = validate(request.derived, request.convergent_encryption, identifier)?;

        let policy_request = PolicyRequest::new(request.name, key_type)
            .with_derived(request.derived)
            .with_convergent(request.convergent_encryption)
            .with_exportable(request.exportable);

        let (policy, created) = self.store.create_or_get(&policy_request).await?;
        drop(policy);

        let mut warnings = Vec::new();
        if !created {
            warn!(policy = %policy_request.name, "Key already existed");
            warnings.push(format!("key {} already existed", policy_request.name));
        }

        Ok(WriteKeyResponse { created, warnings })
    }

    /// Read a key's metadata, or `None` if it does not exist
    pub async fn read_key(&self, request: ReadKeyRequest) -> PolicyResult<Option<KeyInfo>> {
        // Decode before touching the store
        let context = decode_field(request.context.as_deref(), "context")?;
        let nonce = decode_field(request.nonce.as_deref(), "nonce")?;

        let Some(policy) = self.store.get_shared(&request.name).await? else {
            debug!(policy = %request.name, "Key not found");
            return Ok(None);
        };

        // Derived RSA and ECDSA public keys mean a full key pair generation
        let export = request.export;
        let info = tokio::task::spawn_blocking(move || {
            KeyInfo::describe(&policy, context.as_deref(), nonce.as_deref(), export)
        })
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))??;

        Ok(Some(info))
    }

    pub async fn delete_key(&self, name: &str) -> PolicyResult<()> {
        self.store.delete(name).await
    }

    /// Add a version to a key; `None` if it does not exist
    pub async fn rotate_key(&self, name: &str) -> PolicyResult<Option<u32>> {
        self.store.rotate(name).await
    }
}

/// Decode an optional base64 field; an empty string counts as absent
fn decode_field(value: Option<&str>, field: &str) -> PolicyResult<Option<Vec<u8>>> {
    value
        .filter(|encoded| !encoded.is_empty())
        .map(|encoded| {
            STANDARD.decode(encoded).map_err(|_| {
                PolicyError::invalid_request(format!("failed to base64-decode {}", field))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_storage::InMemoryStorage;

    fn backend() -> KeysBackend {
        KeysBackend::new(Arc::new(PolicyStore::new(Arc::new(InMemoryStorage::new()))))
    }

    #[tokio::test]
    async fn test_write_defaults_to_aes() {
        let backend = backend();
        let request = WriteKeyRequest::new("default-key");
        let response = backend.write_key(request).await.unwrap();
        assert!(response.created);
        assert!(response.warnings.is_empty());

        let info = backend
            .read_key(ReadKeyRequest::new("default-key"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.key_type, KeyType::Aes256Gcm96);
        assert!(info.kdf.is_none());
        assert!(info.keys[&1].public_key.is_none());
    }

    #[tokio::test]
    async fn test_configured_default_type() {
        let backend = backend().with_default_key_type(KeyType::Ed25519);
        let request = WriteKeyRequest::new("sig-key");
        backend.write_key(request).await.unwrap();

        let info = backend
            .read_key(ReadKeyRequest::new("sig-key"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.key_type, KeyType::Ed25519);
        assert!(info.keys[&1].public_key.is_some());
    }

    #[tokio::test]
    async fn test_unknown_type_is_invalid_request() {
        let backend = backend();
        let err = backend
            .write_key(WriteKeyRequest::new("bad").with_type("des"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(err.to_string(), "unknown key type des");
        assert!(backend.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_convergent_without_derivation_message() {
        let backend = backend();
        let err = backend
            .write_key(WriteKeyRequest::new("bad").with_convergent_encryption(true))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "convergent encryption requires derivation to be enabled"
        );
    }

    #[tokio::test]
    async fn test_export_rules() {
        let backend = backend();
        let request = WriteKeyRequest::new("locked");
        backend.write_key(request).await.unwrap();
        backend
            .write_key(WriteKeyRequest::new("open").with_exportable(true))
            .await
            .unwrap();

        let err = backend
            .read_key(ReadKeyRequest::new("locked").with_export(true))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "key is not exportable");

        let info = backend
            .read_key(ReadKeyRequest::new("open"))
            .await
            .unwrap()
            .unwrap();
        assert!(info.exported_keys.is_none());

        let info = backend
            .read_key(ReadKeyRequest::new("open").with_export(true))
            .await
            .unwrap()
            .unwrap();
        let exported = info.exported_keys.unwrap();
        assert_eq!(STANDARD.decode(&exported[&1]).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_empty_context_is_absent() {
        let backend = backend();
        let request = WriteKeyRequest::new("sig-key")
            .with_type("ed25519")
            .with_derived(true);
        backend.write_key(request).await.unwrap();

        let info = backend
            .read_key(ReadKeyRequest::new("sig-key").with_context(""))
            .await
            .unwrap()
            .unwrap();
        assert!(info.derived_public_key.is_none());
    }

    #[tokio::test]
    async fn test_read_bad_nonce_encoding() {
        let backend = backend();
        let err = backend
            .read_key(ReadKeyRequest::new("whatever").with_nonce("%%%"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to base64-decode nonce");
    }

    #[tokio::test]
    async fn test_rotate_surfaces_in_read() {
        let backend = backend();
        backend
            .write_key(WriteKeyRequest::new("sig-key").with_type("ed25519"))
            .await
            .unwrap();
        assert_eq!(backend.rotate_key("sig-key").await.unwrap(), Some(2));

        let info = backend
            .read_key(ReadKeyRequest::new("sig-key"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.latest_version, 2);
        assert_eq!(info.keys.len(), 2);
        assert_ne!(info.keys[&1].public_key, info.keys[&2].public_key);
    }
}
