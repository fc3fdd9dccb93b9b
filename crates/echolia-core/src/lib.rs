//! Echolia inference gateway core.
//!
//! Sans-IO domain logic for the E2EE inference pipeline. This crate owns
//! the per-request state machine and its collaborators, but performs no
//! network or terminal I/O itself: time and randomness come from an
//! injected [`env::Environment`], quota storage from a [`quota::QuotaStore`]
//! implementation, entitlements from a [`quota::TierSource`], and the LLM
//! backend from a [`provider::Provider`]. The server crate supplies the
//! production implementations.
//!
//! # Components
//!
//! - [`keystore::KeyStore`]: the server's long-lived X25519 identity with
//!   deterministic rotation and crash-safe persistence
//! - [`quota::QuotaLedger`]: atomic daily request accounting per principal
//! - [`registry::TaskRegistry`]: the closed table of supported analyses
//! - [`provider::Provider`]: normalized LLM backend interface
//! - [`orchestrator::Orchestrator`]: the request pipeline tying it all
//!   together
//!
//! # Security
//!
//! - Plaintext, derived keys, shared secrets, and canonical result JSON
//!   are wrapped in zeroizing containers and overwritten on every exit
//!   path of the pipeline.
//! - No log record anywhere in this crate carries plaintext, prompt
//!   contents, model output, or any field of a task result. Logs are
//!   limited to identifiers, lengths, hashes, counts, and tags.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod keystore;
pub mod orchestrator;
pub mod provider;
pub mod quota;
pub mod registry;
