//! Shared application state.
//!
//! [`AppState`] is `Clone` and shared across request tasks. The
//! orchestrator inside is immutable after construction; the key store it
//! owns handles its own interior rotation.

use std::sync::Arc;

use chrono::Duration;
use echolia_core::keystore::{KeyStore, KeyStoreError};
use echolia_core::orchestrator::Orchestrator;
use echolia_core::quota::{QuotaError, QuotaLedger, QuotaLimits};
use thiserror::Error;

use crate::config::Config;
use crate::identity::{JwtIdentity, StaticTiers};
use crate::providers::{ProviderGateway, ProviderInitError};
use crate::storage::RedbQuotaStore;
use crate::system_env::SystemEnv;

/// The production orchestrator: system environment, redb ledger,
/// configured tiers, and the selected provider backend.
pub type GatewayOrchestrator =
    Orchestrator<SystemEnv, RedbQuotaStore, StaticTiers, ProviderGateway>;

/// State passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The inference pipeline.
    pub orchestrator: Arc<GatewayOrchestrator>,
    /// Bearer token verifier.
    pub auth: Arc<JwtIdentity>,
}

/// Fatal startup failure.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The server identity could not be loaded or durably created.
    #[error("key store initialization failed: {0}")]
    Keys(#[from] KeyStoreError),

    /// The quota database could not be opened.
    #[error("quota store initialization failed: {0}")]
    Quota(#[from] QuotaError),

    /// No usable provider backend.
    #[error("provider initialization failed: {0}")]
    Provider(#[from] ProviderInitError),
}

impl AppState {
    /// Build the full production state from configuration.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal; the server must not start without a
    /// durable identity, a reachable ledger, and a configured backend.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let env = SystemEnv::new();

        let keys = KeyStore::initialize(
            env.clone(),
            config.key_path(),
            Duration::days(config.key_rotation_days),
        )?;

        let store = RedbQuotaStore::open(config.quota_path())?;
        let tiers = StaticTiers::new(config.elevated_principals.clone());
        let limits = QuotaLimits {
            free_daily_limit: config.free_daily_limit,
            elevated_daily_limit: config.elevated_daily_limit,
        };
        let ledger = QuotaLedger::new(store, tiers, limits);

        let provider = ProviderGateway::from_config(config)?;

        Ok(Self {
            orchestrator: Arc::new(Orchestrator::new(env, Arc::new(keys), ledger, provider)),
            auth: Arc::new(JwtIdentity::new(&config.jwt_secret)),
        })
    }
}
