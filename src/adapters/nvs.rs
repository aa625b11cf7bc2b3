//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the station configuration: one postcard
//! blob under the `washcfg` namespace.
//!
//! - Config validation: every field is range-checked before persistence
//!   and again after loading, so a blob written by older firmware cannot
//!   map a service to a missing relay.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Simulation: an in-memory map keyed by `namespace::key`.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::StationConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "washcfg";
const CONFIG_KEY: &str = "station";
#[cfg(target_os = "espidf")]
const CONFIG_KEY_C: &[u8] = b"station\0";

/// Upper bound on the stored blob; a larger size means a corrupt entry.
const MAX_BLOB_SIZE: usize = 2048;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Raw blob write, bypassing validation (simulation only; used to
    /// plant corrupt entries in tests).
    #[cfg(not(target_os = "espidf"))]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.store
            .insert(Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes.to_vec());
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Stored blob, `Ok(None)` when the key has never been written.
    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        Ok(self.store.get(&key).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A namespace that was never opened for writing does not exist yet.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.write_raw(bytes);
        info!("NvsAdapter: config saved (simulation)");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    CONFIG_KEY_C.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                Ok(())
            }
            Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(ConfigError::StorageFull),
            Err(e) => {
                warn!("NvsAdapter: NVS write error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<StationConfig, ConfigError> {
        let Some(bytes) = self.read_blob()? else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(StationConfig::default());
        };
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::Corrupted);
        }

        let cfg: StationConfig =
            postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        if let Err(e) = cfg.validate() {
            warn!("NvsAdapter: stored config rejected ({})", e);
            return Err(ConfigError::Corrupted);
        }
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &StationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.write_blob(&bytes)
    }
}
