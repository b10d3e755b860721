// src/services/directory.rs
//! HTTP client for the external PLC directory service.
//!
//! Speaks the directory's JSON protocol:
//! - `GET {directory}/{did}/log/last`: the most recent operation
//! - `GET {directory}/{did}/log/audit`: the full operation history
//! - `GET {directory}/{did}`: resolution probe (200 / 404 / 410)
//! - `POST {directory}/{did}`: submit a signed operation, success is
//!   exactly HTTP 200
//!
//! Key fields travel as `did:key:` strings. Responses are deserialized with
//! order-preserving maps: the order of `verificationMethods` and `services`
//! entries feeds straight into canonical CBOR when a fetched operation is
//! re-encoded for its CID.
//!
//! All failures surface as [`PlcError::Directory`] with the URL and status
//! attached. The client never retries; retry policy belongs to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::KeyCache;
use crate::models::operation::{Operation, Service, SignedOperation};
use crate::plc::PlcError;

/// JSON form of a service descriptor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceDocument {
    /// Endpoint URL.
    pub endpoint: String,
    /// Service type tag.
    #[serde(rename = "type")]
    pub service_type: String,
}

/// JSON form of a (possibly signed) PLC operation, as the directory sends
/// and receives it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OperationDocument {
    #[serde(rename = "type")]
    pub operation_type: String,

    /// Rotation keys as `did:key:` strings.
    #[serde(rename = "rotationKeys", default)]
    pub rotation_keys: Vec<String>,

    /// Method id → `did:key:` string, order preserved.
    #[serde(rename = "verificationMethods", default)]
    pub verification_methods: Map<String, Value>,

    #[serde(rename = "alsoKnownAs", default)]
    pub also_known_as: Vec<String>,

    /// Service id → descriptor object, order preserved.
    #[serde(default)]
    pub services: Map<String, Value>,

    #[serde(default)]
    pub prev: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl OperationDocument {
    /// Builds the wire document for a signed operation.
    pub fn from_signed(operation: &SignedOperation) -> Self {
        let op = operation.operation();

        let mut verification_methods = Map::new();
        for (id, key) in &op.verification_methods {
            verification_methods.insert(id.clone(), Value::String(key.encode_did_key()));
        }

        let mut services = Map::new();
        for (id, service) in &op.services {
            let mut descriptor = Map::new();
            descriptor.insert("endpoint".to_string(), Value::String(service.endpoint.clone()));
            descriptor.insert("type".to_string(), Value::String(service.service_type.clone()));
            services.insert(id.clone(), Value::Object(descriptor));
        }

        OperationDocument {
            operation_type: op.operation_type.clone(),
            rotation_keys: op.rotation_keys.iter().map(|key| key.encode_did_key()).collect(),
            verification_methods,
            also_known_as: op.also_known_as.clone(),
            services,
            prev: op.prev.clone(),
            sig: Some(operation.sig().to_string()),
        }
    }

    /// Reconstructs a signed operation from the wire document, decoding all
    /// `did:key:` strings to public keys.
    pub fn into_signed(self, cache: &mut KeyCache) -> Result<SignedOperation, PlcError> {
        let sig = self.sig.clone().ok_or_else(|| {
            PlcError::Directory("operation document is missing its signature".to_string())
        })?;
        Ok(SignedOperation::new(self.into_operation(cache)?, sig))
    }

    /// Reconstructs the operation itself, ignoring any signature.
    pub fn into_operation(self, cache: &mut KeyCache) -> Result<Operation, PlcError> {
        let mut rotation_keys = Vec::with_capacity(self.rotation_keys.len());
        for did_key in &self.rotation_keys {
            rotation_keys.push(cache.decode_did_key(did_key)?);
        }

        let mut verification_methods = Vec::with_capacity(self.verification_methods.len());
        for (id, value) in &self.verification_methods {
            let did_key = value.as_str().ok_or_else(|| {
                PlcError::Directory(format!("verification method {id} is not a did:key string"))
            })?;
            verification_methods.push((id.clone(), cache.decode_did_key(did_key)?));
        }

        let mut services = Vec::with_capacity(self.services.len());
        for (id, value) in self.services {
            let descriptor: ServiceDocument = serde_json::from_value(value).map_err(|err| {
                PlcError::Directory(format!("malformed service descriptor {id}: {err}"))
            })?;
            services.push((
                id,
                Service {
                    endpoint: descriptor.endpoint,
                    service_type: descriptor.service_type,
                },
            ));
        }

        Ok(Operation {
            operation_type: self.operation_type,
            rotation_keys,
            verification_methods,
            also_known_as: self.also_known_as,
            services,
            prev: self.prev,
        })
    }
}

/// Client for one PLC directory deployment.
pub struct DirectoryClient {
    base_url: String,
    http: reqwest::Client,
}

impl DirectoryClient {
    /// The public PLC directory.
    pub const DEFAULT_URL: &'static str = "https://plc.directory";

    /// Creates a client for the directory at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        DirectoryClient {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches and decodes the most recent operation in a DID's log.
    pub async fn fetch_last_operation(
        &self,
        did: &str,
        cache: &mut KeyCache,
    ) -> Result<SignedOperation, PlcError> {
        let url = format!("{}/{}/log/last", self.base_url, did);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/did+ld+json")
            .send()
            .await
            .map_err(|err| PlcError::Directory(format!("GET {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlcError::Directory(format!(
                "GET {url} returned status {status}"
            )));
        }

        let document: OperationDocument = response
            .json()
            .await
            .map_err(|err| PlcError::Directory(format!("error decoding last op: {err}")))?;
        document.into_signed(cache)
    }

    /// Submits a signed operation for a DID. Success is exactly HTTP 200.
    pub async fn submit_operation(
        &self,
        did: &str,
        operation: &SignedOperation,
    ) -> Result<(), PlcError> {
        let url = format!("{}/{}", self.base_url, did);
        let document = OperationDocument::from_signed(operation);

        log::debug!("submitting operation to {url}");
        let response = self
            .http
            .post(&url)
            .json(&document)
            .send()
            .await
            .map_err(|err| PlcError::Directory(format!("POST {url} failed: {err}")))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(PlcError::Directory(format!(
                "POST {url} returned status {status}: {body}"
            )));
        }
        Ok(())
    }

    /// Fetches the full operation history for display purposes.
    pub async fn fetch_audit_log(&self, did: &str) -> Result<Vec<Value>, PlcError> {
        let url = format!("{}/{}/log/audit", self.base_url, did);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/did+ld+json")
            .send()
            .await
            .map_err(|err| PlcError::Directory(format!("GET {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlcError::Directory(format!(
                "GET {url} returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| PlcError::Directory(format!("error decoding audit log: {err}")))
    }

    /// Probes whether a DID currently resolves on the directory.
    ///
    /// 404 means never registered; 410 means tombstoned. Both report
    /// `false`; only transport failures are errors.
    pub async fn resolve(&self, did: &str) -> Result<bool, PlcError> {
        let url = format!("{}/{}", self.base_url, did);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/did+ld+json")
            .send()
            .await
            .map_err(|err| PlcError::Directory(format!("GET {url} failed: {err}")))?;

        Ok(response.status().as_u16() == 200)
    }
}
