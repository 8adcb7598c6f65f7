//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads; commands load the configuration once
//! and read it through `cfg()`.

use crate::config::SystemConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<SystemConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(SystemConfig::default()));

#[inline]
pub fn cfg() -> Arc<SystemConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: SystemConfig) -> Arc<SystemConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}
