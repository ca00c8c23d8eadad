//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive (e.g., "info", "keyed_rest=debug")
    ///
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Configuration for one resource route family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource name, used in logs (e.g., "users")
    pub name: String,

    /// Path of the collection (e.g., "/users")
    pub collection_path: String,

    /// Name of the path placeholder carrying the key
    #[serde(default = "default_key_param")]
    pub key_param: String,

    /// Answer 404 on update of an absent entity instead of creating it
    #[serde(default = "default_true")]
    pub update_requires_existing: bool,

    /// Answer 409 instead of 500 on duplicate create
    #[serde(default)]
    pub conflict_on_duplicate: bool,
}

impl ResourceConfig {
    /// Create a configuration with the default policies
    pub fn new(name: impl Into<String>, collection_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_path: collection_path.into(),
            key_param: default_key_param(),
            update_requires_existing: true,
            conflict_on_duplicate: false,
        }
    }

    /// Path of a single item, e.g. `/users/{id}`
    pub fn item_path(&self) -> String {
        format!(
            "{}/{{{}}}",
            self.collection_path.trim_end_matches('/'),
            self.key_param
        )
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Service name reported by the health route
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Address the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub log: LogConfig,

    /// Resource route families
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bind_addr: default_bind_addr(),
            log: LogConfig::default(),
            resources: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid config file {}", path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Find a resource configuration by name
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Check that resource names are unique and paths are absolute
    pub fn validate(&self) -> Result<()> {
        for (i, resource) in self.resources.iter().enumerate() {
            if !resource.collection_path.starts_with('/') {
                anyhow::bail!(
                    "Resource '{}': collection_path must start with '/', got '{}'",
                    resource.name,
                    resource.collection_path
                );
            }
            if resource.key_param.is_empty() {
                anyhow::bail!("Resource '{}': key_param must not be empty", resource.name);
            }
            if self.resources[..i].iter().any(|r| r.name == resource.name) {
                anyhow::bail!("Resource '{}' is configured twice", resource.name);
            }
        }
        Ok(())
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_key_param() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "keyed-rest".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}
