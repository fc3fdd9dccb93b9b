//! Echolia inference gateway wire types.
//!
//! Everything that crosses the wire between a client and the gateway lives
//! here: the sealed envelope carrying encrypted journal content, the HTTP
//! request/response bodies, the task tags, the structured task results, and
//! the canonical error tags.
//!
//! Binary fields (ciphertext, nonce, authentication tag, ephemeral public
//! key) travel base64-encoded. Decoding is part of validation: an envelope
//! whose fields do not decode, or decode to the wrong length, is rejected
//! before any cryptographic work happens.
//!
//! # Invariants
//!
//! - Envelope lengths are fixed: 12-byte nonce, 16-byte tag, 32-byte
//!   ephemeral public key. The ciphertext length equals the plaintext
//!   length (the tag is carried separately).
//! - Task results serialize canonically: declaration-order fields, compact
//!   JSON, UTF-8, no embedded newlines. Re-serializing a parsed result
//!   produces identical bytes.
//! - Each error kind maps to exactly one canonical tag and one HTTP status.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod messages;
mod result;
mod tags;
mod task;

pub use envelope::{
    EnvelopeError, SealedEnvelope, NONCE_LEN, PUBLIC_KEY_LEN, TAG_LEN, decode_base64,
    encode_base64,
};
pub use messages::{
    ErrorBody, ExecuteRequest, ExecuteResponse, ProviderInfo, PublicKeyResponse, QuotaErrorBody,
    Tier, UsageInfo,
};
pub use result::{
    CaptureIntent, CaptureMetadataResult, InsightExtractionResult, MemoryDistillationResult,
    MemoryItem, MemoryKind, TagItem, TaggingResult, TaskResult,
};
pub use tags::ErrorTag;
pub use task::{TaskKind, UnknownTask};
