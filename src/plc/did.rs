// src/plc/did.rs
//! DID lifecycle controller.
//!
//! A [`Did`] owns a PLC identifier's key material across its lifetime and
//! drives every directory interaction: genesis creation, diff-based
//! updates, verification-key management, and read-only log retrieval.
//!
//! Ordering rules the controller enforces:
//! - At genesis the id is derived from the signed operation *before*
//!   submission (the submission URL contains it), and the record is
//!   persisted only after the directory accepted the operation, so no DID is
//!   ever stored with an unsubmitted genesis.
//! - Key-set mutations happen in memory first and reach the directory only
//!   through [`Did::update`]; a failed submission leaves persisted state
//!   untouched, and the caller must discard the in-memory instance instead
//!   of reusing it.
//! - Updates diff against the directory's latest operation and skip the
//!   submission entirely when nothing changed; every submitted operation is
//!   permanent, so redundant ones are never sent.

use crate::keys::{Curve, Key, KeyCache, KeyError};
use crate::models::did::DidRecord;
use crate::models::operation::{
    Operation, Service, SignedOperation, PACKAGE_SIGNING_METHOD, TYPE_OPERATION,
};
use crate::plc::cid::{cid_for_operation, genesis_to_plc};
use crate::plc::signing::sign_operation;
use crate::plc::PlcError;
use crate::services::directory::DirectoryClient;
use crate::storage::record_store::{RecordStore, StoreError};

/// Service id of the package-repository slot this engine manages.
pub const SERVICE_ID: &str = "fairpm_repo";

/// Service type tag for the package-repository endpoint.
pub const SERVICE_TYPE: &str = "FairPackageManagementRepo";

/// Shared collaborators for DID operations: the directory client plus the
/// base URL under which package-repository endpoints are published.
pub struct PlcContext {
    /// Client for the PLC directory.
    pub directory: DirectoryClient,
    /// Base URL of the hosting package repository, without trailing slash.
    package_repo_base: String,
}

impl PlcContext {
    /// Creates a context.
    pub fn new(directory: DirectoryClient, package_repo_base: impl Into<String>) -> Self {
        let mut package_repo_base = package_repo_base.into();
        while package_repo_base.ends_with('/') {
            package_repo_base.pop();
        }
        PlcContext {
            directory,
            package_repo_base,
        }
    }

    /// The package-repository endpoint advertised for a DID.
    pub fn package_endpoint(&self, did: &str) -> String {
        format!("{}/packages/{}", self.package_repo_base, did)
    }
}

/// Result of [`Did::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The directory already reflects the current state; nothing was sent.
    NoChanges,
    /// A new operation was signed and accepted by the directory.
    Submitted,
}

/// A PLC DID under this host's control.
#[derive(Debug)]
pub struct Did {
    id: String,
    rotation_keys: Vec<String>,
    verification_keys: Vec<String>,
}

impl Did {
    /// The DID identifier, e.g. `did:plc:ewvi7nxzyoun6zhxrhs64oiz`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reconstructs a DID from its persisted record.
    pub fn from_record(record: DidRecord) -> Self {
        Did {
            id: record.id,
            rotation_keys: record.rotation_keys,
            verification_keys: record.verification_keys,
        }
    }

    /// The persistable form of this DID.
    pub fn record(&self) -> DidRecord {
        DidRecord {
            id: self.id.clone(),
            rotation_keys: self.rotation_keys.clone(),
            verification_keys: self.verification_keys.clone(),
        }
    }

    /// Loads a DID from storage, or `None` if it was never persisted.
    pub fn get(store: &dyn RecordStore, id: &str) -> Result<Option<Self>, StoreError> {
        Ok(store.load(id)?.map(Did::from_record))
    }

    /// Persists this DID's record.
    pub fn save(&self, store: &dyn RecordStore) -> Result<(), StoreError> {
        store.save(&self.record())
    }

    /// Decodes the rotation keys (private capability).
    pub fn rotation_keys(&self, cache: &mut KeyCache) -> Result<Vec<Key>, KeyError> {
        self.rotation_keys
            .iter()
            .map(|encoded| cache.decode_private(encoded))
            .collect()
    }

    /// Decodes the verification keys (private capability).
    pub fn verification_keys(&self, cache: &mut KeyCache) -> Result<Vec<Key>, KeyError> {
        self.verification_keys
            .iter()
            .map(|encoded| cache.decode_private(encoded))
            .collect()
    }

    /// Creates a brand-new DID: generates a secp256k1 rotation and
    /// verification key, signs the genesis operation, derives the
    /// identifier from its hash, registers it with the directory, and
    /// persists the record.
    ///
    /// Persistence happens strictly after the directory accepted the
    /// genesis operation; a rejected submission leaves no trace in storage.
    pub async fn create(ctx: &PlcContext, store: &dyn RecordStore) -> Result<Self, PlcError> {
        let rotation_key = Key::generate(Curve::K256);
        let verification_key = Key::generate(Curve::K256);

        let genesis = Operation {
            operation_type: TYPE_OPERATION.to_string(),
            rotation_keys: vec![rotation_key.clone()],
            verification_methods: vec![(
                PACKAGE_SIGNING_METHOD.to_string(),
                verification_key.clone(),
            )],
            also_known_as: vec![],
            services: vec![],
            prev: None,
        };

        // Sign the op, then derive the DID from it. The id must exist
        // before submission: the directory addresses operations by DID.
        let genesis_signed = sign_operation(genesis, &rotation_key)?;
        let id = format!("did:plc:{}", genesis_to_plc(&genesis_signed));

        let did = Did {
            id,
            rotation_keys: vec![rotation_key.encode_private()?],
            verification_keys: vec![verification_key.encode_private()?],
        };

        log::info!("registering new DID {}", did.id);
        ctx.directory.submit_operation(&did.id, &genesis_signed).await?;
        did.save(store)?;
        Ok(did)
    }

    /// Pushes the DID's current state to the directory if it differs from
    /// the directory's latest operation.
    ///
    /// The candidate operation carries the controller's current rotation
    /// and verification keys, preserves the fetched `alsoKnownAs`, and
    /// overwrites the service map with the one package-repository slot this
    /// engine owns. If rotation keys, verification methods, aliases, and
    /// services all match the fetched operation, nothing is submitted.
    pub async fn update(
        &self,
        ctx: &PlcContext,
        cache: &mut KeyCache,
    ) -> Result<UpdateOutcome, PlcError> {
        match self.prepare_update_op(ctx, cache).await? {
            Some(op) => {
                ctx.directory.submit_operation(&self.id, &op).await?;
                log::info!("submitted update for {}", self.id);
                Ok(UpdateOutcome::Submitted)
            }
            None => {
                log::info!("no changes to update for {}", self.id);
                Ok(UpdateOutcome::NoChanges)
            }
        }
    }

    /// Builds and signs the next operation, or `None` when the directory
    /// already matches.
    async fn prepare_update_op(
        &self,
        ctx: &PlcContext,
        cache: &mut KeyCache,
    ) -> Result<Option<SignedOperation>, PlcError> {
        let last_signed = ctx.directory.fetch_last_operation(&self.id, cache).await?;
        let last_cid = cid_for_operation(&last_signed);
        let last = last_signed.operation();

        let rotation_keys = self.rotation_keys(cache)?;
        let verification_keys = self.verification_keys(cache)?;
        let package_signing_key = verification_keys.first().cloned().ok_or_else(|| {
            PlcError::KeyConstraintViolation(format!("{} has no verification keys", self.id))
        })?;

        let candidate = Operation {
            operation_type: TYPE_OPERATION.to_string(),
            rotation_keys: rotation_keys.clone(),
            verification_methods: vec![(PACKAGE_SIGNING_METHOD.to_string(), package_signing_key)],
            also_known_as: last.also_known_as.clone(),
            services: vec![(
                SERVICE_ID.to_string(),
                Service {
                    endpoint: ctx.package_endpoint(&self.id),
                    service_type: SERVICE_TYPE.to_string(),
                },
            )],
            prev: Some(last_cid),
        };

        if candidate.rotation_keys == last.rotation_keys
            && candidate.verification_methods == last.verification_methods
            && candidate.also_known_as == last.also_known_as
            && candidate.services == last.services
        {
            return Ok(None);
        }

        let signing_key = rotation_keys.first().ok_or_else(|| {
            PlcError::KeyConstraintViolation(format!("{} has no rotation keys", self.id))
        })?;
        Ok(Some(sign_operation(candidate, signing_key)?))
    }

    /// Generates a new verification key and appends it to the in-memory
    /// set, returning its encoded public form.
    ///
    /// The change reaches the directory only on the next [`Did::update`];
    /// callers must update and persist afterwards.
    pub fn generate_verification_key(&mut self) -> Result<String, KeyError> {
        let key = Key::generate(Curve::K256);
        self.verification_keys.push(key.encode_private()?);
        Ok(key.encode_public())
    }

    /// Removes a verification key, identified by its encoded public form.
    ///
    /// A DID must always retain at least one usable verification key, so
    /// removing the last one is refused. As with
    /// [`Did::generate_verification_key`], callers must follow up with
    /// [`Did::update`] and persistence.
    ///
    /// # Errors
    /// [`PlcError::KeyConstraintViolation`] if the key is unknown or is the
    /// last remaining verification key. The key set is left unchanged.
    pub fn invalidate_verification_key(
        &mut self,
        encoded_public: &str,
        cache: &mut KeyCache,
    ) -> Result<(), PlcError> {
        let mut position = None;
        for (index, encoded) in self.verification_keys.iter().enumerate() {
            if cache.decode_private(encoded)?.encode_public() == encoded_public {
                position = Some(index);
                break;
            }
        }

        let position = position.ok_or_else(|| {
            PlcError::KeyConstraintViolation(format!(
                "{encoded_public} is not a verification key of {}",
                self.id
            ))
        })?;

        if self.verification_keys.len() == 1 {
            return Err(PlcError::KeyConstraintViolation(format!(
                "cannot revoke the last verification key of {}",
                self.id
            )));
        }

        self.verification_keys.remove(position);
        Ok(())
    }

    /// Fetches the DID's full operation history for display.
    ///
    /// Read-only; any failure degrades to `None` instead of propagating.
    pub async fn fetch_audit_log(&self, ctx: &PlcContext) -> Option<Vec<serde_json::Value>> {
        match ctx.directory.fetch_audit_log(&self.id).await {
            Ok(entries) => Some(entries),
            Err(err) => {
                log::warn!("audit log unavailable for {}: {err}", self.id);
                None
            }
        }
    }

    /// Whether the DID currently resolves on the directory (404 = never
    /// registered, 410 = tombstoned; both report `false`).
    pub async fn is_published(&self, ctx: &PlcContext) -> bool {
        ctx.directory.resolve(&self.id).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::OperationDocument;
    use crate::storage::record_store::MemoryStore;
    use mockito::Matcher;

    /// A DID whose key material is generated fresh, with an id that stays
    /// outside the base32 alphabet so it cannot collide with mocks matching
    /// real PLC identifiers.
    fn test_did(id: &str) -> (Did, Key, Key) {
        let rotation = Key::generate(Curve::K256);
        let verification = Key::generate(Curve::K256);
        let did = Did {
            id: id.to_string(),
            rotation_keys: vec![rotation.encode_private().unwrap()],
            verification_keys: vec![verification.encode_private().unwrap()],
        };
        (did, rotation, verification)
    }

    fn context() -> PlcContext {
        PlcContext::new(
            DirectoryClient::new(mockito::server_url()),
            "https://example.com/wp-json/fair",
        )
    }

    /// The last-operation document the directory would return once the
    /// DID's current state is fully synchronized.
    fn synced_last_op(did: &Did, rotation: &Key, verification: &Key, ctx: &PlcContext) -> String {
        let operation = Operation {
            operation_type: TYPE_OPERATION.to_string(),
            rotation_keys: vec![rotation.clone()],
            verification_methods: vec![(PACKAGE_SIGNING_METHOD.to_string(), verification.clone())],
            also_known_as: vec!["https://example.com/plugin".to_string()],
            services: vec![(
                SERVICE_ID.to_string(),
                Service {
                    endpoint: ctx.package_endpoint(did.id()),
                    service_type: SERVICE_TYPE.to_string(),
                },
            )],
            prev: None,
        };
        let signed = operation.sign(rotation).unwrap();
        serde_json::to_string(&OperationDocument::from_signed(&signed)).unwrap()
    }

    #[tokio::test]
    async fn test_create_lifecycle() {
        let ctx = context();
        let store = MemoryStore::new();

        // A rejected genesis submission must leave storage untouched.
        let rejected = mockito::mock("POST", Matcher::Regex(r"^/did:plc:[a-z2-7]{24}$".to_string()))
            .with_status(409)
            .with_body("operation rejected")
            .create();
        let err = Did::create(&ctx, &store).await.unwrap_err();
        assert!(matches!(err, PlcError::Directory(_)));
        assert_eq!(store.count(), 0);

        // Registered later, so it shadows the rejection mock.
        let accepted = mockito::mock("POST", Matcher::Regex(r"^/did:plc:[a-z2-7]{24}$".to_string()))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create();
        let did = Did::create(&ctx, &store).await.unwrap();
        accepted.assert();
        drop(rejected);

        assert!(did.id().starts_with("did:plc:"));
        assert_eq!(did.id().len(), "did:plc:".len() + 24);
        assert_eq!(store.load(did.id()).unwrap(), Some(did.record()));

        // Both keys round-trip to private-capable secp256k1 keys.
        let mut cache = KeyCache::new();
        let rotation = did.rotation_keys(&mut cache).unwrap();
        let verification = did.verification_keys(&mut cache).unwrap();
        assert_eq!(rotation.len(), 1);
        assert_eq!(verification.len(), 1);
        assert!(rotation[0].is_private());
        assert_eq!(rotation[0].curve(), Curve::K256);
        assert_eq!(verification[0].curve(), Curve::K256);
    }

    #[tokio::test]
    async fn test_update_is_noop_when_directory_matches() {
        let (did, rotation, verification) = test_did("did:plc:update_noop_0000000001");
        let ctx = context();

        let _last = mockito::mock("GET", format!("/{}/log/last", did.id()).as_str())
            .with_status(200)
            .with_body(synced_last_op(&did, &rotation, &verification, &ctx))
            .create();
        let post = mockito::mock("POST", format!("/{}", did.id()).as_str())
            .expect(0)
            .create();

        let mut cache = KeyCache::new();
        // Twice in a row: both calls must decide against submitting.
        assert_eq!(
            did.update(&ctx, &mut cache).await.unwrap(),
            UpdateOutcome::NoChanges
        );
        assert_eq!(
            did.update(&ctx, &mut cache).await.unwrap(),
            UpdateOutcome::NoChanges
        );
        post.assert();
    }

    #[tokio::test]
    async fn test_update_submits_when_keys_rotated() {
        let (did, rotation, _verification) = test_did("did:plc:update_rotated_0000002");
        let ctx = context();

        // The directory still carries a retired verification key.
        let retired = Key::generate(Curve::K256);
        let _last = mockito::mock("GET", format!("/{}/log/last", did.id()).as_str())
            .with_status(200)
            .with_body(synced_last_op(&did, &rotation, &retired, &ctx))
            .create();
        let post = mockito::mock("POST", format!("/{}", did.id()).as_str())
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create();

        let mut cache = KeyCache::new();
        assert_eq!(
            did.update(&ctx, &mut cache).await.unwrap(),
            UpdateOutcome::Submitted
        );
        post.assert();
    }

    #[tokio::test]
    async fn test_update_chains_prev_to_fetched_cid() {
        let (did, rotation, verification) = test_did("did:plc:update_chained_0000003");
        let ctx = context();

        let last_body = synced_last_op(&did, &rotation, &verification, &ctx);
        let last_doc: OperationDocument = serde_json::from_str(&last_body).unwrap();
        let mut cache = KeyCache::new();
        let expected_prev = cid_for_operation(&last_doc.into_signed(&mut cache).unwrap());

        let _last = mockito::mock("GET", format!("/{}/log/last", did.id()).as_str())
            .with_status(200)
            .with_body(last_body)
            .create();

        // Force a difference so an operation is prepared.
        let mut changed = Did::from_record(did.record());
        changed.generate_verification_key().unwrap();
        changed.verification_keys.remove(0);

        let prepared = changed
            .prepare_update_op(&ctx, &mut cache)
            .await
            .unwrap()
            .expect("rotated key must produce an operation");
        assert_eq!(prepared.operation().prev.as_deref(), Some(expected_prev.as_str()));
        assert_eq!(
            prepared.operation().also_known_as,
            vec!["https://example.com/plugin".to_string()]
        );
        assert!(verify_rotation_signature(&prepared, &rotation));
    }

    fn verify_rotation_signature(op: &SignedOperation, rotation: &Key) -> bool {
        crate::plc::signing::verify_operation(op, rotation).unwrap()
    }

    #[test]
    fn test_generate_verification_key_appends() {
        let (mut did, _rotation, _verification) = test_did("did:plc:generate_key_00000004");
        let encoded_public = did.generate_verification_key().unwrap();
        assert!(encoded_public.starts_with('z'));
        assert_eq!(did.record().verification_keys.len(), 2);
    }

    #[test]
    fn test_cannot_revoke_last_verification_key() {
        let (mut did, _rotation, verification) = test_did("did:plc:revoke_last_000000005");
        let mut cache = KeyCache::new();

        let err = did
            .invalidate_verification_key(&verification.encode_public(), &mut cache)
            .unwrap_err();
        assert!(matches!(err, PlcError::KeyConstraintViolation(_)));
        assert_eq!(did.record().verification_keys.len(), 1);
    }

    #[test]
    fn test_revoke_removes_only_named_key() {
        let (mut did, _rotation, original) = test_did("did:plc:revoke_named_00000006");
        let mut cache = KeyCache::new();

        let added = did.generate_verification_key().unwrap();
        did.invalidate_verification_key(&original.encode_public(), &mut cache)
            .unwrap();

        let remaining = did.verification_keys(&mut cache).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].encode_public(), added);

        // Unknown keys are refused without touching the set.
        let stranger = Key::generate(Curve::K256);
        let err = did
            .invalidate_verification_key(&stranger.encode_public(), &mut cache)
            .unwrap_err();
        assert!(matches!(err, PlcError::KeyConstraintViolation(_)));
        assert_eq!(did.record().verification_keys.len(), 1);
    }

    #[tokio::test]
    async fn test_audit_log_degrades_to_none() {
        let (did, _rotation, _verification) = test_did("did:plc:audit_degrade_0000007");
        let _mock = mockito::mock("GET", format!("/{}/log/audit", did.id()).as_str())
            .with_status(500)
            .create();

        let ctx = context();
        assert!(did.fetch_audit_log(&ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_audit_log_returns_entries() {
        let (did, _rotation, _verification) = test_did("did:plc:audit_entries_0000008");
        let _mock = mockito::mock("GET", format!("/{}/log/audit", did.id()).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"did":"x","operation":{}}]"#)
            .create();

        let ctx = context();
        let entries = did.fetch_audit_log(&ctx).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_is_published_probe() {
        let (did, _rotation, _verification) = test_did("did:plc:published_000000000009");
        let _mock = mockito::mock("GET", format!("/{}", did.id()).as_str())
            .with_status(200)
            .with_body("{}")
            .create();

        let ctx = context();
        assert!(did.is_published(&ctx).await);
    }

    #[test]
    fn test_record_round_trip() {
        let (did, _rotation, _verification) = test_did("did:plc:record_trip_000000010");
        let restored = Did::from_record(did.record());
        assert_eq!(restored.id(), did.id());
        assert_eq!(restored.record(), did.record());
    }
}
