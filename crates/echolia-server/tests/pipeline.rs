//! End-to-end pipeline scenarios against the orchestrator.
//!
//! Uses the in-memory quota store, a deterministic environment, and a
//! scripted provider so every step of the state machine can be driven
//! explicitly: happy path, quota exhaustion, tampering, unknown tasks,
//! key rotation replay, and malformed model output.

use std::sync::{Arc, Mutex};

use chrono::Duration;
use echolia_core::env::test_utils::MockEnv;
use echolia_core::env::Environment;
use echolia_core::error::InferenceError;
use echolia_core::keystore::KeyStore;
use echolia_core::orchestrator::Orchestrator;
use echolia_core::provider::{ChatRequest, Completion, Provider, ProviderError, TokenUsage};
use echolia_core::quota::{date_key, QuotaLedger, QuotaLimits, QuotaStore};
use echolia_crypto::{derive_session_key, keypair_from_seed, open, seal, NONCE_LEN};
use echolia_proto::{decode_base64, encode_base64, ErrorTag, ExecuteRequest, Tier};
use echolia_server::storage::MemoryQuotaStore;
use echolia_server::StaticTiers;
use tempfile::TempDir;
use zeroize::Zeroizing;

const MEMORY_JSON: &str = r#"{"memories": [{"type": "commitment", "content": "call Ada tomorrow", "confidence": 0.9}], "confidence": 0.85}"#;

/// Provider that returns a preset body (or a preset failure) and records
/// nothing.
#[derive(Clone)]
struct ScriptedProvider {
    reply: Arc<Mutex<Result<String, ProviderError>>>,
}

impl ScriptedProvider {
    fn returning(text: &str) -> Self {
        Self { reply: Arc::new(Mutex::new(Ok(text.to_string()))) }
    }

    fn set_reply(&self, reply: Result<String, ProviderError>) {
        *self.reply.lock().unwrap() = reply;
    }
}

impl Provider for ScriptedProvider {
    async fn generate(&self, _request: &ChatRequest) -> Result<Completion, ProviderError> {
        self.reply.lock().unwrap().clone().map(|text| Completion {
            text,
            model: "echo-1".to_string(),
            usage: TokenUsage { input_tokens: 42, output_tokens: 17, total_tokens: 59 },
            finish_reason: "stop".to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

struct Gateway {
    env: MockEnv,
    store: MemoryQuotaStore,
    provider: ScriptedProvider,
    orchestrator: Orchestrator<MockEnv, MemoryQuotaStore, StaticTiers, ScriptedProvider>,
    _dir: TempDir,
}

fn gateway() -> Gateway {
    let dir = tempfile::tempdir().unwrap();
    let env = MockEnv::new();
    let store = MemoryQuotaStore::new();
    let provider = ScriptedProvider::returning(MEMORY_JSON);

    let keys = KeyStore::initialize(env.clone(), dir.path().join("inference_key.bin"), Duration::days(30))
        .unwrap();
    let ledger =
        QuotaLedger::new(store.clone(), StaticTiers::default(), QuotaLimits::default());

    let orchestrator = Orchestrator::new(env.clone(), Arc::new(keys), ledger, provider.clone());

    Gateway { env, store, provider, orchestrator, _dir: dir }
}

/// Seal a plaintext as an honest client would: fresh ephemeral keypair,
/// shared key against the server's advertised public key, random nonce.
fn sealed_request(
    gateway: &Gateway,
    task: &str,
    plaintext: &[u8],
) -> (ExecuteRequest, Zeroizing<[u8; 32]>) {
    let server_public = decode_base64(
        "public_key",
        &gateway.orchestrator.public_key().unwrap().public_key,
    )
    .unwrap();
    let server_public: [u8; 32] = server_public.try_into().unwrap();

    let (client_secret, client_public) = keypair_from_seed(gateway.env.random_array::<32>());
    let key = derive_session_key(&client_secret, &server_public);

    let nonce = gateway.env.random_array::<NONCE_LEN>();
    let (ciphertext, tag) = seal(&key, &nonce, plaintext);

    let request = ExecuteRequest {
        task: task.to_string(),
        encrypted_content: encode_base64(&ciphertext),
        nonce: encode_base64(&nonce),
        mac: encode_base64(&tag),
        ephemeral_public_key: encode_base64(&client_public),
        client_version: "1.4.2".to_string(),
    };

    (request, key)
}

fn count_today(gateway: &Gateway, principal: &str) -> u64 {
    gateway.store.count(principal, &date_key(gateway.env.now_utc())).unwrap()
}

#[tokio::test]
async fn happy_path_returns_sealed_result_and_decrements_quota() {
    let gateway = gateway();
    let (request, key) = sealed_request(&gateway, "memory_distillation", b"I promised to call Ada tomorrow.");

    let response = gateway.orchestrator.execute("u1", &request).await.unwrap();

    assert_eq!(response.usage.requests_remaining, 9);
    assert_eq!(response.usage.tier, Tier::Free);
    assert_eq!(count_today(&gateway, "u1"), 1);

    // The response opens under the same derived key.
    let ciphertext = decode_base64("encrypted_result", &response.encrypted_result).unwrap();
    let nonce: [u8; 12] =
        decode_base64("nonce", &response.nonce).unwrap().try_into().unwrap();
    let tag: [u8; 16] = decode_base64("mac", &response.mac).unwrap().try_into().unwrap();

    let result_bytes = open(&key, &nonce, &ciphertext, &tag).unwrap();
    let result: serde_json::Value = serde_json::from_slice(&result_bytes).unwrap();

    assert_eq!(result["memories"][0]["type"], "commitment");
    assert_eq!(result["memories"][0]["content"], "call Ada tomorrow");
    assert!(result["confidence"].as_f64().unwrap() >= 0.5);
}

#[tokio::test]
async fn response_nonce_is_fresh_per_seal() {
    let gateway = gateway();
    let (request, _key) = sealed_request(&gateway, "memory_distillation", b"note");

    let response = gateway.orchestrator.execute("u1", &request).await.unwrap();
    assert_ne!(response.nonce, request.nonce);
}

#[tokio::test]
async fn exhausted_quota_rejects_with_usage_and_keeps_overcount() {
    let gateway = gateway();
    let now = gateway.env.now_utc();
    for _ in 0..10 {
        gateway.store.increment("u2", &date_key(now), now).unwrap();
    }

    let (request, _key) = sealed_request(&gateway, "memory_distillation", b"entry");
    let err = gateway.orchestrator.execute("u2", &request).await.unwrap_err();

    let InferenceError::QuotaExceeded(snapshot) = err else {
        panic!("expected quota exhaustion, got {err}");
    };
    assert_eq!(snapshot.requests_remaining, 0);
    assert_eq!(snapshot.reset_at.to_rfc3339(), "2026-03-02T00:00:00+00:00");

    // Increment-then-compare: the over-count is recorded.
    assert_eq!(count_today(&gateway, "u2"), 11);
}

#[tokio::test]
async fn tampered_ciphertext_is_rejected_after_consuming_quota() {
    let gateway = gateway();
    let (mut request, _key) = sealed_request(&gateway, "memory_distillation", b"secret entry");

    let mut ciphertext = decode_base64("encrypted_content", &request.encrypted_content).unwrap();
    ciphertext[0] ^= 0x01;
    request.encrypted_content = encode_base64(&ciphertext);

    let err = gateway.orchestrator.execute("u3", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::DecryptFailed);
    assert_eq!(count_today(&gateway, "u3"), 1);
}

#[tokio::test]
async fn unknown_task_is_rejected_after_consuming_quota() {
    let gateway = gateway();
    let (request, _key) = sealed_request(&gateway, "summarization", b"entry");

    let err = gateway.orchestrator.execute("u4", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::UnknownTask);

    // Reservation precedes task lookup; probing tag names is not free.
    assert_eq!(count_today(&gateway, "u4"), 1);
}

#[tokio::test]
async fn malformed_envelope_is_rejected_before_quota() {
    let gateway = gateway();
    let (mut request, _key) = sealed_request(&gateway, "memory_distillation", b"entry");
    request.nonce = encode_base64(&[0u8; 11]);

    let err = gateway.orchestrator.execute("u5", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::InvalidEnvelope);
    assert_eq!(count_today(&gateway, "u5"), 0);
}

#[tokio::test]
async fn envelope_sealed_against_rotated_key_no_longer_opens() {
    let gateway = gateway();

    // Client caches the key at T0 and seals against it much later.
    let (request, _key) = sealed_request(&gateway, "memory_distillation", b"stale entry");
    let old_key_id = gateway.orchestrator.public_key().unwrap().key_id;

    gateway.env.advance(Duration::days(31));

    let err = gateway.orchestrator.execute("u6", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::DecryptFailed);

    // The next fetch advertises the replacement key.
    let new_key = gateway.orchestrator.public_key().unwrap();
    assert_ne!(new_key.key_id, old_key_id);
}

#[tokio::test]
async fn malformed_model_output_maps_to_model_output_invalid() {
    let gateway = gateway();
    gateway.provider.set_reply(Ok("not json".to_string()));

    let (request, _key) = sealed_request(&gateway, "memory_distillation", b"entry");
    let err = gateway.orchestrator.execute("u7", &request).await.unwrap_err();

    assert_eq!(err.tag(), ErrorTag::ModelOutputInvalid);
    assert_eq!(count_today(&gateway, "u7"), 1);
}

#[tokio::test]
async fn provider_failures_map_to_their_categories() {
    let gateway = gateway();
    let (request, _key) = sealed_request(&gateway, "memory_distillation", b"entry");

    gateway.provider.set_reply(Err(ProviderError::Transport("timeout".to_string())));
    let err = gateway.orchestrator.execute("u8", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::ProviderUnavailable);

    gateway.provider.set_reply(Err(ProviderError::BadRequest("too long".to_string())));
    let err = gateway.orchestrator.execute("u8", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::ProviderRejected);

    gateway.provider.set_reply(Err(ProviderError::Server("boom".to_string())));
    let err = gateway.orchestrator.execute("u8", &request).await.unwrap_err();
    assert_eq!(err.tag(), ErrorTag::ProviderError);

    // Each failure still consumed its reservation.
    assert_eq!(count_today(&gateway, "u8"), 3);
}

#[tokio::test]
async fn empty_plaintext_is_accepted() {
    let gateway = gateway();
    gateway
        .provider
        .set_reply(Ok(r#"{"tags": [], "confidence": 0.4}"#.to_string()));

    let (request, key) = sealed_request(&gateway, "tagging", b"");
    let response = gateway.orchestrator.execute("u9", &request).await.unwrap();

    let ciphertext = decode_base64("encrypted_result", &response.encrypted_result).unwrap();
    let nonce: [u8; 12] = decode_base64("nonce", &response.nonce).unwrap().try_into().unwrap();
    let tag: [u8; 16] = decode_base64("mac", &response.mac).unwrap().try_into().unwrap();
    let result_bytes = open(&key, &nonce, &ciphertext, &tag).unwrap();

    assert_eq!(result_bytes.as_slice(), br#"{"tags":[],"confidence":0.4}"#);
}

#[tokio::test]
async fn usage_is_read_only() {
    let gateway = gateway();

    let before = gateway.orchestrator.usage("u10").unwrap();
    assert_eq!(before.requests_remaining, 10);

    let after = gateway.orchestrator.usage("u10").unwrap();
    assert_eq!(after.requests_remaining, 10);
    assert_eq!(count_today(&gateway, "u10"), 0);
}

#[tokio::test]
async fn public_key_advertises_x25519_with_expiry() {
    let gateway = gateway();
    let advertised = gateway.orchestrator.public_key().unwrap();

    assert_eq!(advertised.algorithm, "X25519");
    assert_eq!(advertised.key_id, "srv-2026-03");
    assert_eq!(decode_base64("public_key", &advertised.public_key).unwrap().len(), 32);
    assert!(advertised.expires_at.ends_with('Z'));
}
