//! # Driver registry
//!
//! Process-wide table mapping driver names to registered [`Driver`]s.
//! Populated during program initialization, read thereafter; never
//! unregistered during normal operation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::warn;

use crate::db::Bbs;
use crate::error::{BbsError, Result};
use crate::traits::Driver;

static DRIVERS: Lazy<RwLock<HashMap<String, Arc<dyn Driver>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a driver under `name`.
///
/// Registering the same name twice silently replaces the previous driver
/// (a warning is traced). Caller discipline required: keep registration
/// in program initialization, before any `open`.
pub fn register(name: &str, driver: Arc<dyn Driver>) {
    let mut drivers = DRIVERS.write().expect("driver registry lock poisoned");
    if drivers.insert(name.to_string(), driver).is_some() {
        warn!(driver = name, "driver re-registered, previous one replaced");
    }
}

/// Opens the driver registered under `name` against `data_source_name`
/// and returns the bound facade.
///
/// Fails with [`BbsError::DriverNotFound`] for an unregistered name and
/// with [`BbsError::DriverOpen`] when the driver rejects the data source.
pub async fn open(name: &str, data_source_name: &str) -> Result<Bbs> {
    let driver = {
        let drivers = DRIVERS.read().expect("driver registry lock poisoned");
        drivers.get(name).cloned()
    };
    let Some(driver) = driver else {
        return Err(BbsError::DriverNotFound(name.to_string()));
    };

    let connector = driver
        .open(data_source_name)
        .await
        .map_err(|source| BbsError::DriverOpen {
            driver: name.to_string(),
            source: Box::new(source),
        })?;

    Ok(Bbs::bind(connector))
}
