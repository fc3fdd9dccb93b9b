//! Echolia production inference gateway server.
//!
//! Production "glue" wrapping [`echolia_core`]'s Sans-IO pipeline with
//! real I/O: Axum for the HTTP surface, redb for the durable quota
//! ledger, reqwest clients for the LLM backends, JWT bearer tokens for
//! the identity collaborator, and system time plus the OS CSPRNG.
//!
//! # Components
//!
//! - [`SystemEnv`]: production environment (real UTC clock, crypto RNG)
//! - [`storage`]: `QuotaStore` backends (in-memory and redb)
//! - [`providers`]: the sealed set of LLM backends behind one gateway
//! - [`JwtIdentity`] / [`StaticTiers`]: identity and entitlement
//!   collaborators
//! - [`router`]: the Axum routes for the public-key, execute, usage, and
//!   provider endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod identity;
pub mod providers;
mod routes;
mod state;
pub mod storage;
mod system_env;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use identity::{JwtIdentity, Principal, StaticTiers};
pub use routes::router;
pub use state::{AppState, GatewayOrchestrator};
pub use system_env::SystemEnv;
