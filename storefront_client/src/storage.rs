//! Client-side persistent key-value storage.
//!
//! The storefront keeps a handful of values across the redirect to and from the hosted payment page: the access
//! token, the signed-in user, the cart, and the ids of the last order and gateway reference. These are continuity
//! tokens: written once per checkout attempt and never explicitly invalidated.
use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use dirs::home_dir;
use log::*;

use crate::StorageError;

pub const AUTH_TOKEN: &str = "auth_token";
pub const AUTH_USER: &str = "auth_user";
pub const LAST_ORDER_ID: &str = "last_order_id";
pub const LAST_REF_PAYCO: &str = "last_ref_payco";
pub const LAST_EPAYCO_INVOICE: &str = "last_epayco_invoice";
pub const CART: &str = "cart";

pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: ClientStorage + ?Sized> ClientStorage for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Reads `last_order_id`. A value that is not an integer is treated as absent.
pub fn last_order_id<S: ClientStorage + ?Sized>(storage: &S) -> Option<i64> {
    let raw = storage.get(LAST_ORDER_ID)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|e| warn!("🗄️ Ignoring unreadable {LAST_ORDER_ID} value '{raw}'. {e}"))
        .ok()
}

//--------------------------------------    MemoryStorage    ---------------------------------------------------------
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

//--------------------------------------     FileStorage     ---------------------------------------------------------
/// A JSON object on disk, written through on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens (creating if needed) `storage.json` in the given directory, or in `~/.storefront` when `dir` is `None`.
    pub fn open(dir: Option<&Path>) -> Result<Self, StorageError> {
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => home_dir()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?
                .join(".storefront"),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            set_permissions(&dir, 0o700)?;
        }
        let path = dir.join("storage.json");
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))?
        } else {
            info!("🗄️ Creating client store at {}", path.display());
            fs::write(&path, "{}")?;
            set_permissions(&path, 0o600)?;
            BTreeMap::new()
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F: FnOnce(&mut BTreeMap<String, String>)>(&self, f: F) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut values);
        let json = serde_json::to_string_pretty(&*values).map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        trace!("🗄️ set {key}");
        self.update(|v| {
            v.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        trace!("🗄️ remove {key}");
        self.update(|v| {
            v.remove(key);
        })
    }
}

fn set_permissions(path: &Path, perms: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(perms);
        fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = (path, perms);
    Ok(())
}
