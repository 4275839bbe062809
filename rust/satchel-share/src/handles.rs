use std::sync::Arc;

use satchel_common::Clock;
use satchel_storage::ObjectStore;

use crate::{CapabilityStore, FileRegistry};

/// Backend clients shared by every component, built once at startup and
/// passed in explicitly.
#[derive(Debug, Clone)]
pub struct Handles {
    /// Capability records
    pub shares: Arc<dyn CapabilityStore>,
    /// File records
    pub files: Arc<dyn FileRegistry>,
    /// File bytes and read credentials
    pub objects: Arc<dyn ObjectStore>,
    /// The time source for expiry and signing decisions
    pub clock: Arc<dyn Clock>,
}
