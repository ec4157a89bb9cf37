//! # Configuration Module
//!
//! The mock's data file: resource groups, virtual machines, users, service
//! accounts and optional pre-registered OAuth2 callers.
//!
//! The file is YAML or JSON, picked by extension. Anything else is tried as
//! YAML first, then JSON. Unknown keys are ignored so data files written for
//! other tools still load.
//!
//! ```yaml
//! resourceGroups:
//!   - { id: /subscriptions/sub/resourceGroups/rg-dev, name: rg-dev, location: eastus }
//! serviceAccounts:
//!   - applicationId: sandman-app-id-12345
//!     secret: sandman-secret-key-development-only
//!     permissions:
//!       - { resourceGroup: "*", permissions: ["*"] }
//! auth:
//!   reject_invalid_credentials: false
//! ```
//!
//! Service accounts are split by [`ServiceAccount::into_parts`]: the secret goes
//! to the authorization gate and the rest becomes a [`ServicePrincipal`].

use crate::identity::RegisteredCaller;
use crate::security::{Permission, ServicePrincipal};
use crate::store::{ResourceGroup, User, VirtualMachine};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document is neither YAML ({yaml}) nor JSON ({json})")]
    Undecodable {
        yaml: serde_yaml::Error,
        json: serde_json::Error,
    },
    #[error("service account #{0} has no applicationId")]
    MissingApplicationId(usize),
    #[error("duplicate service account applicationId: {0}")]
    DuplicateApplicationId(String),
}

/// Syntax of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    /// Unknown extension: YAML, then JSON.
    Auto,
}

impl ConfigFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            Some("json") => Self::Json,
            _ => Self::Auto,
        }
    }
}

/// A `{resourceGroup, permissions}` entry of a service account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceGroupPermission {
    pub resource_group: String,
    pub permissions: Vec<String>,
}

impl From<ResourceGroupPermission> for Permission {
    fn from(p: ResourceGroupPermission) -> Self {
        Permission {
            scope: p.resource_group,
            verbs: p.permissions,
        }
    }
}

fn enabled() -> bool {
    true
}

/// A service account as written in the data file, secret included.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled")]
    pub account_enabled: bool,
    #[serde(default)]
    pub permissions: Vec<ResourceGroupPermission>,
    #[serde(default)]
    pub graph_permissions: Vec<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("id", &self.id)
            .field("application_id", &self.application_id)
            .field("secret", &"***")
            .field("display_name", &self.display_name)
            .field("account_enabled", &self.account_enabled)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    /// Split into the principal and its secret.
    ///
    /// The object id falls back to the application id when `id` is empty.
    #[must_use]
    pub fn into_parts(self) -> (ServicePrincipal, String) {
        let object_id = if self.id.is_empty() {
            self.application_id.clone()
        } else {
            self.id
        };
        let principal = ServicePrincipal {
            object_id,
            application_id: self.application_id,
            display_name: self.display_name,
            description: self.description,
            enabled: self.account_enabled,
            permissions: self.permissions.into_iter().map(Permission::from).collect(),
            graph_permissions: self.graph_permissions,
        };
        (principal, self.secret)
    }
}

/// Authentication knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Answer 401 on present-but-invalid credentials instead of continuing
    /// anonymously.
    pub reject_invalid_credentials: bool,
}

/// The decoded data file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MockConfig {
    pub resource_groups: Vec<ResourceGroup>,
    pub vms: Vec<VirtualMachine>,
    pub users: Vec<User>,
    pub service_accounts: Vec<ServiceAccount>,
    pub clients: Vec<RegisteredCaller>,
    pub auth: AuthSettings,
}

impl MockConfig {
    /// Decode and validate a data document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on syntax errors, on a service account without
    /// an application id, or on duplicate application ids.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: MockConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Auto => match serde_yaml::from_str(content) {
                Ok(c) => c,
                Err(yaml) => serde_json::from_str(content)
                    .map_err(|json| ConfigError::Undecodable { yaml, json })?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a data file from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or does not decode.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read data file {}", path.display()))?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("failed to decode data file {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, account) in self.service_accounts.iter().enumerate() {
            if account.application_id.is_empty() {
                return Err(ConfigError::MissingApplicationId(index));
            }
            if !seen.insert(account.application_id.as_str()) {
                return Err(ConfigError::DuplicateApplicationId(
                    account.application_id.clone(),
                ));
            }
        }
        Ok(())
    }
}
