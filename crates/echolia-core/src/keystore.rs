//! Server identity key store.
//!
//! Owns the gateway's long-lived X25519 identity: generation, crash-safe
//! persistence, deterministic rotation, and read-only public views. The
//! on-disk format is the versioned blob from `echolia-crypto`; writes go
//! `write temp → fsync → rename` so a crash mid-write leaves the previous
//! identity intact.
//!
//! # Concurrency
//!
//! Readers take a snapshot `Arc` of the current identity; the read
//! critical section is a pointer clone. Rotation serializes on the write
//! half of the lock and only swaps the snapshot after the new identity is
//! durably on disk.
//!
//! # Failure semantics
//!
//! - Persistence failure at initialize is fatal: the process must not
//!   serve requests without a durable identity.
//! - Persistence failure during rotation aborts the rotation; the old
//!   identity keeps serving and the error is logged and returned.
//! - A corrupt blob at initialize is fatal. An unreadable blob cannot
//!   reveal its expiry, so it is never silently replaced.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use echolia_crypto::{
    decode_key_blob, encode_key_blob, keypair_from_seed, KeyBlob, KeyBlobError,
};
use thiserror::Error;
use zeroize::Zeroize;

use crate::env::Environment;

/// Default rotation period: keys are replaced monthly.
pub const DEFAULT_ROTATION_DAYS: i64 = 30;

/// The server's active X25519 identity.
///
/// The private scalar is only ever exposed as a borrowed view; callers
/// must not copy it beyond the call. Zeroized on drop.
pub struct ServerIdentity {
    secret: [u8; 32],
    public: [u8; 32],
    key_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ServerIdentity {
    /// Borrow the private scalar for a single derivation.
    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// The public point.
    pub fn public(&self) -> &[u8; 32] {
        &self.public
    }

    /// Stable identifier binding this (private, public) pair.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Creation instant.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Expiration instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether this identity has passed its expiration.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Drop for ServerIdentity {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Externally safe view of the identity: public half only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyView {
    /// The X25519 public point.
    pub public: [u8; 32],
    /// Stable key identifier.
    pub key_id: String,
    /// Expiration instant; clients may cache the key until then.
    pub expires_at: DateTime<Utc>,
}

/// Errors from key store initialization and rotation.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Reading or durably writing the key file failed.
    #[error("key persistence failed: {0}")]
    Io(#[from] io::Error),

    /// The on-disk blob failed to decode.
    #[error("corrupt key blob: {0}")]
    Corrupt(#[from] KeyBlobError),

    /// The on-disk blob carries a timestamp outside the representable
    /// range.
    #[error("key blob timestamp out of range")]
    BadTimestamp,
}

/// Long-lived key store with cooperative rotation.
pub struct KeyStore<E: Environment> {
    env: E,
    path: PathBuf,
    rotation_period: Duration,
    current: RwLock<Arc<ServerIdentity>>,
}

impl<E: Environment> std::fmt::Debug for KeyStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("path", &self.path)
            .field("rotation_period", &self.rotation_period)
            .finish_non_exhaustive()
    }
}

impl<E: Environment> KeyStore<E> {
    /// Load or create the server identity at `path`.
    ///
    /// Idempotent: an existing unexpired identity is loaded as-is; an
    /// expired one is rotated before the store is returned; a missing
    /// file produces a fresh identity.
    ///
    /// # Errors
    ///
    /// Any persistence failure here is fatal, as is a corrupt blob.
    pub fn initialize(
        env: E,
        path: impl Into<PathBuf>,
        rotation_period: Duration,
    ) -> Result<Self, KeyStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let now = env.now_utc();
        let identity = match fs::read(&path) {
            Ok(bytes) => {
                let loaded = identity_from_blob(decode_key_blob(&bytes)?)?;
                if loaded.is_expired(now) {
                    tracing::info!(key_id = %loaded.key_id, "server identity expired, rotating");
                    generate_and_persist(&env, &path, rotation_period, now)?
                } else {
                    tracing::info!(
                        key_id = %loaded.key_id,
                        expires_at = %loaded.expires_at,
                        "server identity loaded"
                    );
                    loaded
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                generate_and_persist(&env, &path, rotation_period, now)?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self { env, path, rotation_period, current: RwLock::new(Arc::new(identity)) })
    }

    /// Snapshot of the active identity.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned (a thread panicked while rotating).
    pub fn current(&self) -> Arc<ServerIdentity> {
        Arc::clone(&self.current.read().expect("key store lock poisoned"))
    }

    /// Externally safe view of the active identity.
    pub fn public_view(&self) -> PublicKeyView {
        let identity = self.current();
        PublicKeyView {
            public: *identity.public(),
            key_id: identity.key_id.clone(),
            expires_at: identity.expires_at,
        }
    }

    /// Rotate if the active identity has expired, then return a snapshot.
    ///
    /// Invoked cooperatively at the start of every operation that needs
    /// the key. Concurrent callers serialize on the writer lock; the
    /// second caller observes the first one's rotation and returns the
    /// same identity.
    ///
    /// # Errors
    ///
    /// If the new identity cannot be durably persisted the rotation is
    /// aborted: the old identity remains active and the error is
    /// returned.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn rotate_if_stale(&self) -> Result<Arc<ServerIdentity>, KeyStoreError> {
        let now = self.env.now_utc();

        {
            let current = self.current.read().expect("key store lock poisoned");
            if !current.is_expired(now) {
                return Ok(Arc::clone(&current));
            }
        }

        let mut slot = self.current.write().expect("key store lock poisoned");
        if !slot.is_expired(now) {
            // Another writer rotated while we waited for the lock.
            return Ok(Arc::clone(&slot));
        }

        match generate_and_persist(&self.env, &self.path, self.rotation_period, now) {
            Ok(identity) => {
                let identity = Arc::new(identity);
                *slot = Arc::clone(&identity);
                Ok(identity)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    key_id = %slot.key_id,
                    "key rotation failed, expired identity remains active"
                );
                Err(err)
            }
        }
    }
}

fn generate_and_persist<E: Environment>(
    env: &E,
    path: &Path,
    rotation_period: Duration,
    now: DateTime<Utc>,
) -> Result<ServerIdentity, KeyStoreError> {
    let mut seed = env.random_array::<32>();
    let (secret, public) = keypair_from_seed(seed);
    seed.zeroize();

    // Truncate to whole seconds so the identity round-trips through the
    // blob's i64 timestamps exactly.
    let created_at = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
    let expires_at = created_at + rotation_period;
    let key_id = format!("srv-{}", created_at.format("%Y-%m"));

    let identity = ServerIdentity { secret, public, key_id, created_at, expires_at };
    persist(path, &identity)?;

    tracing::info!(
        key_id = %identity.key_id,
        expires_at = %identity.expires_at,
        "server identity generated"
    );

    Ok(identity)
}

fn persist(path: &Path, identity: &ServerIdentity) -> Result<(), io::Error> {
    let blob = KeyBlob {
        secret: identity.secret,
        public: identity.public,
        created_at_secs: identity.created_at.timestamp(),
        expires_at_secs: identity.expires_at.timestamp(),
        key_id: identity.key_id.clone(),
    };
    let bytes = encode_key_blob(&blob);

    let tmp = path.with_extension("bin.tmp");
    let mut file = fs::File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)
}

fn identity_from_blob(blob: KeyBlob) -> Result<ServerIdentity, KeyStoreError> {
    let created_at =
        DateTime::from_timestamp(blob.created_at_secs, 0).ok_or(KeyStoreError::BadTimestamp)?;
    let expires_at =
        DateTime::from_timestamp(blob.expires_at_secs, 0).ok_or(KeyStoreError::BadTimestamp)?;

    Ok(ServerIdentity {
        secret: blob.secret,
        public: blob.public,
        key_id: blob.key_id.clone(),
        created_at,
        expires_at,
    })
}
