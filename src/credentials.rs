//! Storage for the bearer token and the backend connection address.
//!
//! Both strings live in the platform keychain under one service name with
//! two accounts ([`KeyringCredentialStore`]). [`FileCredentialStore`] keeps
//! the same layout in a JSON file for machines without a keychain, and
//! [`MemoryCredentialStore`] keeps it in memory.

use std::collections::HashMap;
use std::fs::{self, File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::{debug, info};

use crate::config::{Config, CredentialBackend};
use crate::error::StoreError;

pub const SERVICE: &str = "ASPENLOG2020";
pub const TOKEN_ACCOUNT: &str = "TokenAccount";
pub const CONNECTION_ACCOUNT: &str = "ConnectionAccount";

/// Where the token and connection address live between sessions.
pub trait CredentialStore: Send + Sync {
    fn get_password(&self, account: &str) -> Result<Option<String>, StoreError>;

    fn set_password(&self, account: &str, value: &str) -> Result<(), StoreError>;

    fn get_token(&self) -> Result<String, StoreError> {
        self.get_password(TOKEN_ACCOUNT)?
            .ok_or(StoreError::Missing("token"))
    }

    fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.set_password(TOKEN_ACCOUNT, token)
    }

    fn get_connection_address(&self) -> Result<String, StoreError> {
        self.get_password(CONNECTION_ACCOUNT)?
            .ok_or(StoreError::Missing("connection address"))
    }

    fn set_connection_address(&self, address: &str) -> Result<(), StoreError> {
        self.set_password(CONNECTION_ACCOUNT, address)
    }
}

/// Open the store selected by the configuration.
pub fn open_store(config: &Config) -> Result<Box<dyn CredentialStore>, StoreError> {
    match config.credential_backend {
        CredentialBackend::Keyring => {
            info!("Credentials in the system keychain ({})", SERVICE);
            Ok(Box::new(KeyringCredentialStore::open()?))
        }
        CredentialBackend::File => {
            let store = FileCredentialStore::open(&config.credentials_path)?;
            info!("Credentials in {}", store.path().display());
            Ok(Box::new(store))
        }
    }
}

/// Platform keychain store, one entry per account under [`SERVICE`].
pub struct KeyringCredentialStore {
    token: keyring::Entry,
    connection: keyring::Entry,
}

impl KeyringCredentialStore {
    pub fn open() -> Result<Self, StoreError> {
        Ok(KeyringCredentialStore {
            token: keyring::Entry::new(SERVICE, TOKEN_ACCOUNT)?,
            connection: keyring::Entry::new(SERVICE, CONNECTION_ACCOUNT)?,
        })
    }

    fn entry(&self, account: &str) -> Result<&keyring::Entry, StoreError> {
        match account {
            TOKEN_ACCOUNT => Ok(&self.token),
            CONNECTION_ACCOUNT => Ok(&self.connection),
            other => Err(StoreError::UnknownAccount(other.to_string())),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get_password(&self, account: &str) -> Result<Option<String>, StoreError> {
        match self.entry(account)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_password(&self, account: &str, value: &str) -> Result<(), StoreError> {
        self.entry(account)?.set_password(value)?;
        debug!("stored {} in the keychain", account);
        Ok(())
    }
}

/// Accounts of one service, as written to disk.
type Accounts = HashMap<String, String>;

/// JSON file store: `{ "ASPENLOG2020": { "TokenAccount": "...", ... } }`.
pub struct FileCredentialStore {
    path: PathBuf,
    // serialises read-modify-write of the file
    lock: RwLock<()>,
}

impl FileCredentialStore {
    /// Open the store at `path`, creating the parent directory and an empty
    /// file if they don't exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(b"{}")?;
        }
        Ok(FileCredentialStore {
            path,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, Accounts>, StoreError> {
        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    // written beside the target and renamed over it, so readers never see a
    // half-written file
    fn write_all(&self, services: &HashMap<String, Accounts>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(services)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_password(&self, account: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let services = self.read_all()?;
        Ok(services
            .get(SERVICE)
            .and_then(|accounts| accounts.get(account))
            .cloned())
    }

    fn set_password(&self, account: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut services = self.read_all()?;
        services
            .entry(SERVICE.to_string())
            .or_default()
            .insert(account.to_string(), value.to_string());
        self.write_all(&services)?;
        debug!("stored {} in {}", account, self.path.display());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<Accounts>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(token: &str, address: &str) -> Self {
        let store = Self::default();
        {
            let mut accounts = store.accounts.write().unwrap_or_else(|e| e.into_inner());
            accounts.insert(TOKEN_ACCOUNT.to_string(), token.to_string());
            accounts.insert(CONNECTION_ACCOUNT.to_string(), address.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_password(&self, account: &str) -> Result<Option<String>, StoreError> {
        let accounts = self.accounts.read().unwrap_or_else(|e| e.into_inner());
        Ok(accounts.get(account).cloned())
    }

    fn set_password(&self, account: &str, value: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts.insert(account.to_string(), value.to_string());
        Ok(())
    }
}
