//! In-memory data records served by the mock.
//!
//! Records live in an immutable [`StoreSnapshot`]. The [`MockStore`] holds the
//! current snapshot and swaps it whole when the data is cleared or reset, so a
//! request that took a snapshot keeps a consistent view until it finishes.
//! Writes through the API are still acknowledged without touching records.
//!
//! Service accounts are split at load time: secrets go to the authorization
//! gate's credential table and only the [`ServicePrincipal`] half is visible
//! here.

use crate::config::MockConfig;
use crate::security::ServicePrincipal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub vm_size: String,
    pub os_type: String,
    pub provisioning_state: String,
    pub power_state: String,
    /// Internal lifecycle status (`running`, `stopped`, ...). Not exposed verbatim.
    pub status: String,
    pub tags: BTreeMap<String, String>,
    pub owner: String,
    pub cost_center: String,
    pub environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub user_principal_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    pub account_enabled: bool,
    pub roles: Vec<String>,
}

/// Read-only view over the mock's records.
///
/// Response mappers only see data through this trait, which lets the
/// authorization layer hand them a filtered view.
pub trait DataAccess {
    fn resource_groups(&self) -> Vec<&ResourceGroup>;
    fn virtual_machines(&self) -> Vec<&VirtualMachine>;
    fn users(&self) -> Vec<&User>;
    fn service_principals(&self) -> Vec<&ServicePrincipal>;

    fn find_user(&self, key: &str) -> Option<&User> {
        let users = self.users();
        users
            .iter()
            .find(|u| u.id == key)
            .or_else(|| users.iter().find(|u| u.user_principal_name == key))
            .copied()
    }
}

/// Aggregate counters for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_vms: usize,
    pub running_vms: usize,
    pub stopped_vms: usize,
    pub total_users: usize,
}

/// One immutable generation of records.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    resource_groups: Vec<ResourceGroup>,
    virtual_machines: Vec<VirtualMachine>,
    users: Vec<User>,
    principals: Vec<Arc<ServicePrincipal>>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn new(
        resource_groups: Vec<ResourceGroup>,
        virtual_machines: Vec<VirtualMachine>,
        users: Vec<User>,
        principals: Vec<Arc<ServicePrincipal>>,
    ) -> Self {
        Self {
            resource_groups,
            virtual_machines,
            users,
            principals,
        }
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let total_vms = self.virtual_machines.len();
        let running_vms = self
            .virtual_machines
            .iter()
            .filter(|vm| vm.status.eq_ignore_ascii_case("running"))
            .count();
        // anything not running counts as stopped
        StoreStats {
            total_vms,
            running_vms,
            stopped_vms: total_vms - running_vms,
            total_users: self.users.len(),
        }
    }
}

impl DataAccess for StoreSnapshot {
    fn resource_groups(&self) -> Vec<&ResourceGroup> {
        self.resource_groups.iter().collect()
    }

    fn virtual_machines(&self) -> Vec<&VirtualMachine> {
        self.virtual_machines.iter().collect()
    }

    fn users(&self) -> Vec<&User> {
        self.users.iter().collect()
    }

    fn service_principals(&self) -> Vec<&ServicePrincipal> {
        self.principals.iter().map(AsRef::as_ref).collect()
    }
}

/// The process-wide record store.
///
/// Readers take the current snapshot with [`MockStore::snapshot`]; the lock is
/// held only while the `Arc` is cloned or replaced.
#[derive(Debug)]
pub struct MockStore {
    current: RwLock<Arc<StoreSnapshot>>,
    initial: Arc<StoreSnapshot>,
    data_file: Option<PathBuf>,
}

impl MockStore {
    /// A store whose reset restores `initial`.
    #[must_use]
    pub fn new(initial: StoreSnapshot) -> Self {
        let initial = Arc::new(initial);
        Self {
            current: RwLock::new(Arc::clone(&initial)),
            initial,
            data_file: None,
        }
    }

    /// Reset re-reads records from `path` instead of restoring the startup copy.
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.current.read())
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.snapshot().stats()
    }

    /// Drop every virtual machine and user. Resource groups and service
    /// principals stay.
    pub fn clear(&self) {
        let mut current = self.current.write();
        let cleared = StoreSnapshot {
            resource_groups: current.resource_groups.clone(),
            virtual_machines: Vec::new(),
            users: Vec::new(),
            principals: current.principals.clone(),
        };
        *current = Arc::new(cleared);
        info!("Mock data cleared");
    }

    /// Restore the records the process started with.
    ///
    /// With a data file the file is read again, so edits made since startup
    /// take effect. Service principals are kept: credentials live in the
    /// authorization gate and are not reloaded.
    ///
    /// # Errors
    ///
    /// Fails if the data file cannot be read or decoded. The current records
    /// are left untouched in that case.
    pub fn reset(&self) -> anyhow::Result<()> {
        let restored = match &self.data_file {
            Some(path) => {
                let config = MockConfig::load(path)?;
                Arc::new(StoreSnapshot::new(
                    config.resource_groups,
                    config.vms,
                    config.users,
                    self.initial.principals.clone(),
                ))
            }
            None => Arc::clone(&self.initial),
        };
        let stats = restored.stats();
        *self.current.write() = restored;
        info!(
            virtual_machines = stats.total_vms,
            users = stats.total_users,
            "Mock data reset"
        );
        Ok(())
    }
}
