//! The per-request inference pipeline.
//!
//! One request flows: decode envelope → reserve quota → look up task →
//! ensure a fresh key → derive session key → open envelope → format
//! prompts → provider call → parse and validate output → seal canonical
//! result under the same key. The quota reservation survives every
//! failure past it; that is deliberate anti-abuse accounting.
//!
//! ```text
//! Start
//!   │ authenticated principal + task tag + envelope
//!   ▼
//! Envelope-decode ── DecodeError ──▶ Reject(invalid_envelope)
//!   ▼
//! Quota-check ── Exhausted ──▶ Reject(quota_exceeded)
//!   ▼
//! Task-lookup ── UnknownTask ──▶ Reject(unknown_task)
//!   ▼
//! Key-ready ── RotationFailure ──▶ Reject(server_error)
//!   ▼
//! Decrypt ── AuthError ──▶ Reject(decrypt_failed)
//!   ▼
//! Format+Dispatch ── ProviderError ──▶ Reject(mapped)
//!   ▼
//! Parse+Validate ── MalformedOutput ──▶ Reject(model_output_invalid)
//!   ▼
//! Seal ──▶ Reply(sealed result, post-increment usage)
//! ```
//!
//! # Security
//!
//! - The derived key, the plaintext, the formatted prompts, the model
//!   output, and the canonical result JSON are all held in zeroizing
//!   containers: they are overwritten on every exit path, early returns
//!   included.
//! - No log record contains plaintext, prompts, model output, or any
//!   field of a task result. Result logs carry length and SHA-256 only.
//! - There are no retries here; retrying is the client's decision.

use std::sync::Arc;

use echolia_crypto::NONCE_LEN;
use echolia_proto::{
    encode_base64, ExecuteRequest, ExecuteResponse, ProviderInfo, PublicKeyResponse,
};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::env::Environment;
use crate::error::InferenceError;
use crate::keystore::KeyStore;
use crate::provider::{ChatRequest, Provider};
use crate::quota::{QuotaLedger, QuotaStore, Reservation, TierSource, UsageSnapshot};
use crate::registry::TaskRegistry;

/// The top-level pipeline, generic over its collaborators.
///
/// Construction wires the collaborators once; the orchestrator itself is
/// immutable and shared across request tasks.
pub struct Orchestrator<E: Environment, S, T, P> {
    env: E,
    keys: Arc<KeyStore<E>>,
    ledger: QuotaLedger<S, T>,
    registry: TaskRegistry,
    provider: P,
}

impl<E, S, T, P> Orchestrator<E, S, T, P>
where
    E: Environment,
    S: QuotaStore,
    T: TierSource,
    P: Provider,
{
    /// Wire the pipeline together.
    pub fn new(env: E, keys: Arc<KeyStore<E>>, ledger: QuotaLedger<S, T>, provider: P) -> Self {
        Self { env, keys, ledger, registry: TaskRegistry::new(), provider }
    }

    /// The public-key advertisement, rotating first if the key is stale.
    ///
    /// # Errors
    ///
    /// Returns a server error if a due rotation cannot be persisted.
    pub fn public_key(&self) -> Result<PublicKeyResponse, InferenceError> {
        let identity = self.keys.rotate_if_stale()?;

        Ok(PublicKeyResponse {
            public_key: encode_base64(identity.public()),
            key_id: identity.key_id().to_string(),
            expires_at: identity
                .expires_at()
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            algorithm: "X25519".to_string(),
        })
    }

    /// Read-only usage standing for a principal. Reserves nothing.
    ///
    /// # Errors
    ///
    /// Returns a server error if the ledger is unavailable.
    pub fn usage(&self, principal: &str) -> Result<UsageSnapshot, InferenceError> {
        Ok(self.ledger.peek(principal, self.env.now_utc())?)
    }

    /// The configured backend and model.
    pub fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
        }
    }

    /// Run one inference request for an authenticated principal.
    ///
    /// # Errors
    ///
    /// Exactly one of the canonical error kinds; see the state diagram in
    /// the module docs for which step produces which.
    pub async fn execute(
        &self,
        principal: &str,
        request: &ExecuteRequest,
    ) -> Result<ExecuteResponse, InferenceError> {
        // Pure syntax checking; a request that does not even decode costs
        // no quota.
        let envelope = request.envelope()?;
        let now = self.env.now_utc();

        tracing::info!(
            principal,
            task = %request.task,
            client_version = %request.client_version,
            "inference request"
        );

        // Reserve before validating the task: probing tag names is not
        // free. The increment below is never rolled back.
        let usage = match self.ledger.reserve(principal, now)? {
            Reservation::Granted(snapshot) => snapshot,
            Reservation::Exhausted(snapshot) => {
                return Err(InferenceError::QuotaExceeded(snapshot));
            }
        };

        let Some(descriptor) = self.registry.lookup(&request.task) else {
            return Err(InferenceError::BadTask(request.task.clone()));
        };

        let identity = self.keys.rotate_if_stale()?;

        let key = echolia_crypto::derive_session_key(identity.secret(), &envelope.ephemeral_public);

        let plaintext_bytes =
            echolia_crypto::open(&key, &envelope.nonce, &envelope.ciphertext, &envelope.tag)
                .map_err(|_| InferenceError::DecryptFailed)?;
        let plaintext = match std::str::from_utf8(&plaintext_bytes) {
            Ok(text) => Zeroizing::new(text.to_string()),
            // Non-UTF-8 plaintext is indistinguishable from a bad envelope.
            Err(_) => return Err(InferenceError::DecryptFailed),
        };
        drop(plaintext_bytes);

        let (system, user) = descriptor.format(&plaintext, now);
        let chat = ChatRequest::for_task(system, user);
        drop(plaintext);

        let completion = self.provider.generate(&chat).await.map_err(InferenceError::from)?;
        drop(chat);

        let output = Zeroizing::new(completion.text);
        let result = descriptor.parse(&output).map_err(|err| {
            tracing::warn!(
                task = %descriptor.kind(),
                error = %err,
                output_length = output.len(),
                "model output failed validation"
            );
            InferenceError::ModelOutputInvalid
        })?;
        drop(output);

        let canonical = Zeroizing::new(result.canonical_json());
        tracing::info!(
            principal,
            task = %descriptor.kind(),
            model = %completion.model,
            finish_reason = %completion.finish_reason,
            result_length = canonical.len(),
            result_sha256 = %sha256_hex(canonical.as_bytes()),
            "task result produced"
        );

        // Re-seal under the same derived key with an independent fresh
        // nonce.
        let nonce = self.env.random_array::<NONCE_LEN>();
        let (ciphertext, tag) = echolia_crypto::seal(&key, &nonce, canonical.as_bytes());

        tracing::info!(
            principal,
            task = %descriptor.kind(),
            remaining = usage.requests_remaining,
            "inference complete"
        );

        Ok(ExecuteResponse {
            encrypted_result: encode_base64(&ciphertext),
            nonce: encode_base64(&nonce),
            mac: encode_base64(&tag),
            usage: usage.to_wire(),
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
