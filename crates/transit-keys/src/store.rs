//! Policy store and per-name lock manager
//!
//! Every name maps to a slot guarded by its own [`RwLock`]. The name map is a
//! [`DashMap`] whose shard locks are held only while a slot is looked up,
//! inserted or removed, never across an await point.
//!
//! A slot is retired when its policy is deleted or when a load finds nothing
//! in storage. Retiring happens under the slot's write lock and removes the
//! slot from the map in the same step. A task that acquires a retired slot
//! starts over from the map, so at most one live slot exists per name.
//!
//! Storage is written before a new or changed policy becomes visible in the
//! cache. A failed write leaves the cache untouched.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::{Instrument, debug, info, info_span, warn};

use transit_core::{Storage, StorageError, validate_name};
use transit_crypto::{CryptoError, CryptoResult};
use transit_logging::spans;

use crate::error::{PolicyError, PolicyResult};
use crate::policy::{POLICY_PREFIX, Policy};
use crate::request::PolicyRequest;

#[derive(Default)]
struct PolicySlot {
    policy: Option<Policy>,
    retired: bool,
}

type SlotHandle = Arc<RwLock<PolicySlot>>;

/// A shared, lock-protected view of a policy
///
/// Holds the policy's read lock until dropped. Writers for the same name,
/// including delete and rotate, wait until every view is released.
pub struct PolicyRef {
    guard: OwnedRwLockReadGuard<PolicySlot, Policy>,
}

impl PolicyRef {
    fn from_guard(guard: OwnedRwLockReadGuard<PolicySlot>) -> Option<Self> {
        OwnedRwLockReadGuard::try_map(guard, |slot| slot.policy.as_ref())
            .ok()
            .map(|guard| Self { guard })
    }
}

impl Deref for PolicyRef {
    type Target = Policy;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl fmt::Debug for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolicyRef").field(&*self.guard).finish()
    }
}

/// The store of named policies
///
/// One instance is constructed at startup and shared (usually behind an
/// `Arc`) by every caller. Storage is the source of truth; the in-memory map
/// caches policies that have been created or read through this instance.
pub struct PolicyStore {
    storage: Arc<dyn Storage>,
    slots: DashMap<String, SlotHandle>,
}

impl PolicyStore {
    /// Create a store backed by `storage`
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            slots: DashMap::new(),
        }
    }

    /// The storage collaborator
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Number of names currently cached in memory
    pub fn cached_len(&self) -> usize {
        self.slots.len()
    }

    /// Return the policy for `request.name`, creating it if it does not exist
    ///
    /// The boolean is `true` only for the single call that created the
    /// policy. An existing policy is returned unchanged even when the request
    /// asks for different parameters.
    pub async fn create_or_get(&self, request: &PolicyRequest) -> PolicyResult<(PolicyRef, bool)> {
        request.validate()?;

        let span = info_span!(
            spans::POLICY_CREATE_OR_GET,
            policy = %request.name,
            key_type = %request.key_type
        );
        self.create_or_get_inner(request).instrument(span).await
    }

    /// Return a shared view of the policy named `name`, or `None` if unknown
    pub async fn get_shared(&self, name: &str) -> PolicyResult<Option<PolicyRef>> {
        validate_name(name)?;

        let span = info_span!(spans::POLICY_READ, policy = %name);
        self.get_shared_inner(name).instrument(span).await
    }

    /// Delete the policy named `name` and all of its versions
    ///
    /// Waits for outstanding views to be released. Deleting an unknown name
    /// succeeds.
    pub async fn delete(&self, name: &str) -> PolicyResult<()> {
        validate_name(name)?;

        let span = info_span!(spans::POLICY_DELETE, policy = %name);
        self.delete_inner(name).instrument(span).await
    }

    /// Names of every stored policy, in ascending order
    ///
    /// Read from storage, so policies persisted by other instances are
    /// included.
    pub async fn list_names(&self) -> PolicyResult<Vec<String>> {
        let span = info_span!(spans::POLICY_LIST);
        self.list_names_inner().instrument(span).await
    }

    /// Append a new version to the policy named `name`
    ///
    /// Returns the new latest version, or `None` if the name is unknown.
    pub async fn rotate(&self, name: &str) -> PolicyResult<Option<u32>> {
        validate_name(name)?;

        let span = info_span!(spans::POLICY_ROTATE, policy = %name);
        self.rotate_inner(name).instrument(span).await
    }

    async fn create_or_get_inner(
        &self,
        request: &PolicyRequest,
    ) -> PolicyResult<(PolicyRef, bool)> {
        loop {
            let slot = self.slot(&request.name);

            let guard = Arc::clone(&slot).read_owned().await;
            if guard.retired {
                continue;
            }
            if let Some(policy) = PolicyRef::from_guard(guard) {
                debug!("Policy already exists");
                return Ok((policy, false));
            }

            let mut guard = Arc::clone(&slot).write_owned().await;
            if guard.retired {
                continue;
            }

            // Another creator may have finished while we waited
            let mut created = false;
            if guard.policy.is_none() {
                match self.load_or_create(request).await {
                    Ok((policy, was_created)) => {
                        guard.policy = Some(policy);
                        created = was_created;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to create policy");
                        self.retire(&request.name, &slot, &mut guard);
                        return Err(e);
                    }
                }
            }

            if let Some(policy) = PolicyRef::from_guard(guard.downgrade()) {
                return Ok((policy, created));
            }
        }
    }

    async fn get_shared_inner(&self, name: &str) -> PolicyResult<Option<PolicyRef>> {
        loop {
            let slot = self.slot(name);

            let guard = Arc::clone(&slot).read_owned().await;
            if guard.retired {
                continue;
            }
            if let Some(policy) = PolicyRef::from_guard(guard) {
                return Ok(Some(policy));
            }

            // Not cached: load from storage under the write lock
            let mut guard = Arc::clone(&slot).write_owned().await;
            if guard.retired {
                continue;
            }
            if !self.ensure_loaded(name, &slot, &mut guard).await? {
                return Ok(None);
            }

            if let Some(policy) = PolicyRef::from_guard(guard.downgrade()) {
                return Ok(Some(policy));
            }
        }
    }

    async fn delete_inner(&self, name: &str) -> PolicyResult<()> {
        loop {
            let slot = self.slot(name);

            let mut guard = Arc::clone(&slot).write_owned().await;
            if guard.retired {
                continue;
            }

            return match self.storage.delete(&Policy::storage_key(name)).await {
                Ok(()) => {
                    let was_cached = guard.policy.is_some();
                    self.retire(name, &slot, &mut guard);
                    info!(was_cached, "Deleted policy");
                    Ok(())
                }
                Err(e) => {
                    warn!(error = %e, "Failed to delete policy from storage");
                    if guard.policy.is_none() {
                        self.retire(name, &slot, &mut guard);
                    }
                    Err(e.into())
                }
            };
        }
    }

    async fn list_names_inner(&self) -> PolicyResult<Vec<String>> {
        let mut names: Vec<String> = self
            .storage
            .list(POLICY_PREFIX)
            .await?
            .into_iter()
            .filter(|name| !name.ends_with('/'))
            .collect();
        names.sort();

        debug!(count = names.len(), "Listed policies");
        Ok(names)
    }

    async fn rotate_inner(&self, name: &str) -> PolicyResult<Option<u32>> {
        loop {
            let slot = self.slot(name);

            let mut guard = Arc::clone(&slot).write_owned().await;
            if guard.retired {
                continue;
            }
            if !self.ensure_loaded(name, &slot, &mut guard).await? {
                return Ok(None);
            }
            let Some(current) = guard.policy.clone() else {
                continue;
            };

            let rotated = run_blocking(move || {
                let mut policy = current;
                policy.rotate()?;
                Ok(policy)
            })
            .await?;

            // Storage first; the cached policy stays as it was on failure
            self.storage
                .put(&Policy::storage_key(name), &rotated.to_bytes()?)
                .await?;

            let version = rotated.latest_version();
            guard.policy = Some(rotated);
            info!(version, "Rotated policy");
            return Ok(Some(version));
        }
    }

    /// Look up or insert the slot for `name`
    fn slot(&self, name: &str) -> SlotHandle {
        if let Some(slot) = self.slots.get(name) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(name.to_string()).or_default().value())
    }

    /// Mark a write-locked slot dead and drop it from the map
    fn retire(&self, name: &str, slot: &SlotHandle, state: &mut PolicySlot) {
        state.policy = None;
        state.retired = true;
        self.slots
            .remove_if(name, |_, current| Arc::ptr_eq(current, slot));
    }

    /// Fill a write-locked slot from storage if it is empty
    ///
    /// Returns whether the slot now holds a policy. A slot left empty is
    /// retired.
    async fn ensure_loaded(
        &self,
        name: &str,
        slot: &SlotHandle,
        state: &mut PolicySlot,
    ) -> PolicyResult<bool> {
        if state.policy.is_some() {
            return Ok(true);
        }

        match self.load(name).await {
            Ok(Some(policy)) => {
                debug!(version = policy.latest_version(), "Loaded policy from storage");
                state.policy = Some(policy);
                Ok(true)
            }
            Ok(None) => {
                self.retire(name, slot, state);
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load policy");
                self.retire(name, slot, state);
                Err(e)
            }
        }
    }

    async fn load(&self, name: &str) -> PolicyResult<Option<Policy>> {
        let Some(bytes) = self.storage.get(&Policy::storage_key(name)).await? else {
            return Ok(None);
        };

        let policy = Policy::from_bytes(&bytes)?;
        if policy.name() != name {
            return Err(StorageError::deserialization(format!(
                "policy stored under {} is named {}",
                name,
                policy.name()
            ))
            .into());
        }
        Ok(Some(policy))
    }

    async fn load_or_create(&self, request: &PolicyRequest) -> PolicyResult<(Policy, bool)> {
        if let Some(policy) = self.load(&request.name).await? {
            debug!(
                version = policy.latest_version(),
                "Policy already exists in storage"
            );
            return Ok((policy, false));
        }

        let generate_request = request.clone();
        let policy = run_blocking(move || Policy::generate(&generate_request)).await?;

        self.storage
            .put(&Policy::storage_key(&request.name), &policy.to_bytes()?)
            .await?;

        info!(
            derived = request.derived,
            convergent = request.convergent,
            exportable = request.exportable,
            "Created policy"
        );
        Ok((policy, true))
    }
}

/// Run key generation off the async worker threads
async fn run_blocking<T, F>(f: F) -> PolicyResult<T>
where
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    result.map_err(PolicyError::from)
}
