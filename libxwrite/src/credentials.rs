//! Secure credential storage for xwrite
//!
//! The four X API secrets are stored under fixed keys in a secret store.
//! They always travel together as a [`CredentialSet`]: either all four are
//! present or the credentials are treated as absent.
//!
//! # Architecture
//!
//! - `CredentialStore` trait: common interface for storage backends
//! - `KeyringStore`: OS-native secure storage (primary)
//! - `EncryptedFileStore`: password-protected `age` files (fallback)
//! - `MemoryStore`: in-process storage for tests
//! - `CredentialManager`: facade that manages fallback and whole-set access
//!
//! # Example
//!
//! ```no_run
//! use libxwrite::credentials::{CredentialConfig, CredentialManager, CredentialSet};
//!
//! # fn example() -> libxwrite::Result<()> {
//! let manager = CredentialManager::new(CredentialConfig::default())?;
//!
//! let set = CredentialSet::new("key", "secret", "token", "token-secret");
//! manager.save(&set)?;
//!
//! if let Some(loaded) = manager.load()? {
//!     println!("Credentials ready ({:?})", loaded);
//! }
//!
//! manager.reset()?;
//! # Ok(())
//! # }
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{CredentialError, Result, XWriteError};

/// Keyring service name all xwrite secrets live under
pub const KEYRING_SERVICE: &str = "xwrite";

/// One of the four canonical credential fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    ApiKey,
    ApiSecret,
    AccessToken,
    AccessSecret,
}

impl Slot {
    /// All slots in canonical order
    pub const ALL: [Slot; 4] = [
        Slot::ApiKey,
        Slot::ApiSecret,
        Slot::AccessToken,
        Slot::AccessSecret,
    ];

    /// Canonical env-style field name, used when reporting missing fields
    pub fn field_name(&self) -> &'static str {
        match self {
            Slot::ApiKey => "API_KEY",
            Slot::ApiSecret => "API_SECRET",
            Slot::AccessToken => "ACCESS_TOKEN",
            Slot::AccessSecret => "ACCESS_SECRET",
        }
    }

    /// Key the secret is stored under
    pub fn storage_key(&self) -> &'static str {
        match self {
            Slot::ApiKey => "twitter.apiKey",
            Slot::ApiSecret => "twitter.apiSecret",
            Slot::AccessToken => "twitter.accessToken",
            Slot::AccessSecret => "twitter.accessSecret",
        }
    }

    /// Human label for prompts and listings
    pub fn label(&self) -> &'static str {
        match self {
            Slot::ApiKey => "API Key",
            Slot::ApiSecret => "API Secret",
            Slot::AccessToken => "Access Token",
            Slot::AccessSecret => "Access Secret",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The four X API secrets
///
/// Values are wrapped in [`SecretString`]: `Debug` output is redacted and the
/// memory is zeroed on drop.
#[derive(Debug)]
pub struct CredentialSet {
    api_key: SecretString,
    api_secret: SecretString,
    access_token: SecretString,
    access_secret: SecretString,
}

impl CredentialSet {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            access_token: SecretString::from(access_token.into()),
            access_secret: SecretString::from(access_secret.into()),
        }
    }

    /// Expose the secret held in `slot`
    pub fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::ApiKey => self.api_key.expose_secret(),
            Slot::ApiSecret => self.api_secret.expose_secret(),
            Slot::AccessToken => self.access_token.expose_secret(),
            Slot::AccessSecret => self.access_secret.expose_secret(),
        }
    }

    pub fn api_key(&self) -> &str {
        self.get(Slot::ApiKey)
    }

    pub fn api_secret(&self) -> &str {
        self.get(Slot::ApiSecret)
    }

    pub fn access_token(&self) -> &str {
        self.get(Slot::AccessToken)
    }

    pub fn access_secret(&self) -> &str {
        self.get(Slot::AccessSecret)
    }
}

/// Trait for credential storage backends
///
/// Keys are the fixed [`Slot::storage_key`] names (e.g. `twitter.apiKey`).
pub trait CredentialStore: Send + Sync {
    /// Store a credential, replacing any previous value
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a credential
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotFound` if the key is absent.
    fn retrieve(&self, key: &str) -> Result<String>;

    /// Delete a credential; deleting an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Short backend identifier for diagnostics ("keyring", "encrypted_file")
    fn backend_name(&self) -> &str;
}

/// OS keyring storage backend
///
/// Uses the platform secret service (macOS Keychain, Windows Credential
/// Manager, Linux Secret Service) under the service name `xwrite`.
pub struct KeyringStore;

impl KeyringStore {
    /// Create a new KeyringStore
    ///
    /// Reads a probe entry so a missing secret service is detected here
    /// rather than on the first write.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::KeyringUnavailable` if the OS keyring
    /// cannot be accessed (e.g., headless Linux without Secret Service).
    pub fn new() -> Result<Self> {
        Self::from_probe(Self::entry("availability_check")?.get_password())
    }

    fn from_probe(probe: std::result::Result<String, keyring::Error>) -> Result<Self> {
        match probe {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(Self),
            Err(e @ (keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_))) => {
                Err(CredentialError::KeyringUnavailable(format!(
                    "OS keyring not accessible: {}",
                    e
                ))
                .into())
            }
            Err(e) => {
                tracing::debug!("Keyring probe returned {}, treating keyring as usable", e);
                Ok(Self)
            }
        }
    }

    fn entry(key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, key)
            .map_err(|e| CredentialError::KeyringUnavailable(e.to_string()).into())
    }
}

impl CredentialStore for KeyringStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| CredentialError::Keyring(e.to_string()))?;

        tracing::debug!("Stored credential {} in OS keyring", key);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        match Self::entry(key)?.get_password() {
            Ok(password) => {
                tracing::debug!("Retrieved credential {} from OS keyring", key);
                Ok(password)
            }
            Err(keyring::Error::NoEntry) => Err(CredentialError::NotFound(key.to_string()).into()),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_password() {
            Ok(_) => {
                tracing::debug!("Deleted credential {} from OS keyring", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("Credential {} not found (already deleted)", key);
                Ok(())
            }
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        match Self::entry(key)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredentialError::Keyring(e.to_string()).into()),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}

/// Refuse to follow a symlinked credential file
pub fn validate_not_symlink(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| {
        CredentialError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read metadata for '{}': {}", path.display(), e),
        ))
    })?;

    if metadata.is_symlink() {
        return Err(CredentialError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "Credential file '{}' is a symbolic link; credential files must be regular files",
                path.display()
            ),
        ))
        .into());
    }

    Ok(())
}

/// Encrypted file storage backend
///
/// Each credential is an `age` passphrase-encrypted file named `{key}.age`
/// under the base directory, with mode 600 on Unix. The master password must
/// be set before storing or retrieving.
pub struct EncryptedFileStore {
    base_path: PathBuf,
    master_password: Arc<RwLock<Option<String>>>,
}

impl EncryptedFileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            master_password: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the master password for encryption/decryption
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::WeakPassword` if the password is less than 8 characters.
    pub fn set_master_password(&self, password: String) -> Result<()> {
        if password.len() < 8 {
            return Err(CredentialError::WeakPassword.into());
        }

        *self.master_password.write().unwrap() = Some(password);
        tracing::debug!("Master password set for encrypted file store");
        Ok(())
    }

    fn encrypt(&self, data: &str) -> Result<Vec<u8>> {
        let password = self.master_password.read().unwrap();
        let password = password
            .as_ref()
            .ok_or(CredentialError::MasterPasswordNotSet)?;

        let encryptor =
            age::Encryptor::with_user_passphrase(age::secrecy::Secret::new(password.clone()));

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        writer
            .write_all(data.as_bytes())
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        Ok(encrypted)
    }

    fn decrypt(&self, data: &[u8]) -> Result<String> {
        let password = self.master_password.read().unwrap();
        let password = password
            .as_ref()
            .ok_or(CredentialError::MasterPasswordNotSet)?;

        let decryptor = match age::Decryptor::new(data) {
            Ok(age::Decryptor::Passphrase(d)) => d,
            Ok(_) => {
                return Err(CredentialError::Encryption(
                    "Invalid encryption format (expected passphrase)".to_string(),
                )
                .into())
            }
            Err(e) => return Err(CredentialError::Encryption(e.to_string()).into()),
        };

        let mut decrypted = vec![];
        let mut reader = decryptor
            .decrypt(&age::secrecy::Secret::new(password.clone()), None)
            .map_err(|e| {
                if e.to_string().contains("decryption") || e.to_string().contains("MAC") {
                    CredentialError::DecryptionFailed
                } else {
                    CredentialError::Encryption(e.to_string())
                }
            })?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CredentialError::Encryption(e.to_string()))?;

        Ok(String::from_utf8(decrypted)
            .map_err(|e| CredentialError::Encryption(format!("Invalid UTF-8: {}", e)))?)
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.age", key))
    }
}

impl CredentialStore for EncryptedFileStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let encrypted = self.encrypt(value)?;
        let file_path = self.file_path(key);

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(CredentialError::Io)?;
        }

        std::fs::write(&file_path, encrypted).map_err(CredentialError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&file_path, perms).map_err(CredentialError::Io)?;
        }

        tracing::debug!("Stored encrypted credential {} at {:?}", key, file_path);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let file_path = self.file_path(key);

        if !file_path.exists() {
            return Err(CredentialError::NotFound(key.to_string()).into());
        }

        validate_not_symlink(&file_path)?;

        let encrypted = std::fs::read(&file_path).map_err(CredentialError::Io)?;
        let decrypted = self.decrypt(&encrypted)?;

        tracing::debug!("Retrieved encrypted credential {} from {:?}", key, file_path);
        Ok(decrypted)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.file_path(key);

        if file_path.exists() {
            std::fs::remove_file(&file_path).map_err(CredentialError::Io)?;
            tracing::debug!("Deleted encrypted credential {} at {:?}", key, file_path);
        } else {
            tracing::debug!("Credential {} not found (already deleted)", key);
        }

        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.file_path(key).exists())
    }

    fn backend_name(&self) -> &str {
        "encrypted_file"
    }
}

/// In-process credential storage
///
/// Available in all builds so integration tests and dry runs can use it.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        self.values
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(key.to_string()).into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().unwrap().contains_key(key))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Storage backend type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS-native keyring (macOS Keychain, Windows Credential Manager, Linux Secret Service)
    #[default]
    Keyring,
    /// Encrypted files with master password
    Encrypted,
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub storage: StorageBackend,

    /// Directory for encrypted file storage (keyring doesn't use files)
    #[serde(default = "default_credential_path")]
    pub path: String,

    /// Master password for encrypted storage (not serialized)
    #[serde(skip)]
    pub master_password: Option<String>,
}

fn default_credential_path() -> String {
    "~/.config/xwrite/credentials".to_string()
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Keyring,
            path: default_credential_path(),
            master_password: None,
        }
    }
}

impl CredentialConfig {
    /// Pick up the master password from `XWRITE_MASTER_PASSWORD` if set
    pub fn load_master_password_from_env(&mut self) {
        if let Ok(password) = std::env::var("XWRITE_MASTER_PASSWORD") {
            if !password.is_empty() {
                self.master_password = Some(password);
                tracing::debug!(
                    "Loaded master password from XWRITE_MASTER_PASSWORD environment variable"
                );
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(
                CredentialError::Encryption("Credential path cannot be empty".to_string()).into(),
            );
        }
        Ok(())
    }

    pub fn expand_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Credential manager facade
///
/// Manages the storage backends with fallback (keyring first, then encrypted
/// files) and reads and writes the four credentials as one set.
pub struct CredentialManager {
    stores: Vec<Box<dyn CredentialStore>>,
}

impl CredentialManager {
    /// Create a new CredentialManager from configuration
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NoStoreAvailable` if no backend can be used.
    pub fn new(config: CredentialConfig) -> Result<Self> {
        config.validate()?;

        let keyring = match config.storage {
            StorageBackend::Keyring => Some(KeyringStore::new()),
            StorageBackend::Encrypted => None,
        };
        Self::with_keyring(&config, keyring)
    }

    /// Assemble the backends given the outcome of opening the keyring
    fn with_keyring(
        config: &CredentialConfig,
        keyring: Option<Result<KeyringStore>>,
    ) -> Result<Self> {
        let mut stores: Vec<Box<dyn CredentialStore>> = vec![];

        if let Some(keyring) = keyring {
            match keyring {
                Ok(store) => {
                    tracing::info!("Using OS keyring for credential storage");
                    stores.push(Box::new(store));
                }
                Err(e) => {
                    tracing::warn!(
                        "OS keyring unavailable: {}. Falling back to encrypted files.",
                        e
                    );
                }
            }
        }

        if stores.is_empty() {
            if let Some(store) = Self::encrypted_store(config) {
                stores.push(Box::new(store));
            }
        }

        if stores.is_empty() {
            return Err(CredentialError::NoStoreAvailable.into());
        }

        Ok(Self { stores })
    }

    /// Wrap a single backend, bypassing configuration
    pub fn with_store(store: Box<dyn CredentialStore>) -> Self {
        Self {
            stores: vec![store],
        }
    }

    fn encrypted_store(config: &CredentialConfig) -> Option<EncryptedFileStore> {
        let store = EncryptedFileStore::new(config.expand_path());

        let password = match &config.master_password {
            Some(password) => password.clone(),
            None if atty::is(atty::Stream::Stdin) => {
                match rpassword::prompt_password(
                    "Enter master password for credential encryption: ",
                ) {
                    Ok(password) if !password.is_empty() => password,
                    Ok(_) => {
                        tracing::error!(
                            "Empty master password provided. No secure storage available."
                        );
                        return None;
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to prompt for master password: {}. No secure storage available.",
                            e
                        );
                        return None;
                    }
                }
            }
            None => {
                tracing::error!(
                    "Master password not set and no TTY available. No secure storage available."
                );
                return None;
            }
        };

        match store.set_master_password(password) {
            Ok(_) => {
                tracing::info!("Using encrypted file storage for credentials");
                Some(store)
            }
            Err(e) => {
                tracing::error!("Failed to set master password: {}", e);
                None
            }
        }
    }

    /// Store all four credentials in the primary backend
    ///
    /// Replaces whatever was stored before. If any write fails, every slot
    /// in that backend is cleared so a mix of old and new values is never
    /// loaded as a set.
    pub fn save(&self, set: &CredentialSet) -> Result<()> {
        let store = self
            .stores
            .first()
            .ok_or(CredentialError::NoStoreAvailable)?;

        for slot in Slot::ALL {
            if let Err(e) = store.store(slot.storage_key(), set.get(slot)) {
                tracing::warn!("Failed to store {}, clearing partial credential set", slot);
                for stale in Slot::ALL {
                    if let Err(cleanup) = store.delete(stale.storage_key()) {
                        tracing::warn!("Failed to clear {}: {}", stale, cleanup);
                    }
                }
                return Err(e);
            }
        }

        tracing::info!("Stored credentials using {} backend", store.backend_name());
        Ok(())
    }

    /// Retrieve a single credential, trying all backends in order
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::NotFound` if no backend has the slot.
    pub fn retrieve(&self, slot: Slot) -> Result<String> {
        let key = slot.storage_key();

        for store in &self.stores {
            match store.retrieve(key) {
                Ok(value) => return Ok(value),
                Err(XWriteError::Credential(CredentialError::NotFound(_))) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(CredentialError::NotFound(key.to_string()).into())
    }

    fn find(&self, slot: Slot) -> Result<Option<String>> {
        match self.retrieve(slot) {
            Ok(value) => Ok(Some(value)),
            Err(XWriteError::Credential(CredentialError::NotFound(_))) => {
                tracing::debug!("Credential {} missing", slot);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Load the full credential set
    ///
    /// Returns `None` unless all four credentials are present.
    pub fn load(&self) -> Result<Option<CredentialSet>> {
        let (Some(api_key), Some(api_secret), Some(access_token), Some(access_secret)) = (
            self.find(Slot::ApiKey)?,
            self.find(Slot::ApiSecret)?,
            self.find(Slot::AccessToken)?,
            self.find(Slot::AccessSecret)?,
        ) else {
            return Ok(None);
        };

        Ok(Some(CredentialSet::new(
            api_key,
            api_secret,
            access_token,
            access_secret,
        )))
    }

    /// Presence of each slot in any backend; values are never returned
    pub fn status(&self) -> Result<Vec<(Slot, bool)>> {
        let mut status = Vec::with_capacity(Slot::ALL.len());
        for slot in Slot::ALL {
            status.push((slot, self.exists(slot)?));
        }
        Ok(status)
    }

    pub fn exists(&self, slot: Slot) -> Result<bool> {
        for store in &self.stores {
            if store.exists(slot.storage_key())? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete all four credentials from every backend
    pub fn reset(&self) -> Result<()> {
        for store in &self.stores {
            for slot in Slot::ALL {
                store.delete(slot.storage_key())?;
            }
        }

        tracing::info!("Deleted credentials from all backends");
        Ok(())
    }

    pub fn backends(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.backend_name()).collect()
    }

    pub fn primary_backend(&self) -> Option<&str> {
        self.stores.first().map(|s| s.backend_name())
    }
}
