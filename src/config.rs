//! Child registry parsing and gateway options.
//!
//! The registry maps a child name to the command that launches it. It is
//! read once at startup from a `.json` file (`mcpServers` key) or a `.toml`
//! file (`mcp_servers` key) and never mutated afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppError, Result};

/// Registry key used by JSON files.
pub const JSON_SERVERS_KEY: &str = "mcpServers";

/// Registry key used by TOML files.
pub const TOML_SERVERS_KEY: &str = "mcp_servers";

/// Launch description for one child server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ChildDescriptor {
    /// Unique registry key; filled from the map key, not the entry body.
    #[serde(skip_deserializing, default)]
    pub name: String,
    /// Executable launched for this child.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Variables overlaid on the gateway's own environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ChildDescriptor {
    /// Build a descriptor directly, mostly useful for tests and embedding.
    #[must_use]
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }
}

/// Read-only, declaration-ordered view of the registered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildRegistry {
    children: Vec<ChildDescriptor>,
}

impl ChildRegistry {
    /// Build a registry from already-parsed descriptors.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a name is empty or duplicated, or a
    /// command is empty.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ChildDescriptor>) -> Result<Self> {
        let mut children: Vec<ChildDescriptor> = Vec::new();
        for descriptor in descriptors {
            if descriptor.name.is_empty() {
                return Err(AppError::Config("child name must not be empty".into()));
            }
            if descriptor.command.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "child '{}' has an empty command",
                    descriptor.name
                )));
            }
            if children.iter().any(|c| c.name == descriptor.name) {
                return Err(AppError::Config(format!(
                    "duplicate child name '{}'",
                    descriptor.name
                )));
            }
            children.push(descriptor);
        }
        Ok(Self { children })
    }

    /// Load a registry from a `.json` or `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file is missing, has an unsupported
    /// extension, fails to parse, or lacks the servers key.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let extension = path.extension().and_then(|ext| ext.to_str());
        let raw = match extension {
            Some("json" | "toml") => fs::read_to_string(path).map_err(|err| {
                AppError::Config(format!(
                    "failed to read config file '{}': {err}",
                    path.display()
                ))
            })?,
            _ => {
                return Err(AppError::Config(format!(
                    "config file must be .json or .toml, got: {}",
                    path.display()
                )))
            }
        };

        let parsed = if extension == Some("json") {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        };
        parsed.map_err(|err| match err {
            AppError::Config(msg) => {
                AppError::Config(format!("failed to load '{}': {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse a registry from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on malformed JSON or a missing servers key.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    /// Parse a registry from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on malformed TOML or a missing servers key.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let document: Value = toml::from_str(raw)?;
        Self::from_document(document)
    }

    fn from_document(document: Value) -> Result<Self> {
        let Value::Object(mut root) = document else {
            return Err(AppError::Config("config root must be a table".into()));
        };

        // `mcp_servers` wins when both are present, matching TOML normalization.
        let servers = root
            .remove(TOML_SERVERS_KEY)
            .or_else(|| root.remove(JSON_SERVERS_KEY))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "config file must contain '{JSON_SERVERS_KEY}' (JSON) or '{TOML_SERVERS_KEY}' (TOML) key"
                ))
            })?;

        let Value::Object(entries) = servers else {
            return Err(AppError::Config("servers entry must be a table".into()));
        };

        let mut descriptors = Vec::with_capacity(entries.len());
        for (name, body) in entries {
            let mut descriptor: ChildDescriptor = serde_json::from_value(body)
                .map_err(|err| AppError::Config(format!("invalid entry for child '{name}': {err}")))?;
            descriptor.name = name;
            descriptors.push(descriptor);
        }

        Self::from_descriptors(descriptors)
    }

    /// Look up a child by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ChildDescriptor> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Registered child names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|c| c.name.as_str())
    }

    /// Iterate descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ChildDescriptor> {
        self.children.iter()
    }

    /// Number of registered children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no children are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Time bounds applied to child interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on launching a child and completing the handshake.
    pub handshake: Duration,
    /// Bound on a single tool call or schema listing.
    pub call: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(30),
            call: Duration::from_secs(60),
        }
    }
}

/// Complete gateway configuration assembled at startup.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Registered children.
    pub registry: ChildRegistry,
    /// Handshake and call bounds.
    pub timeouts: Timeouts,
    /// Optional JSON file summarizing the children for callers.
    pub children_abstract: Option<PathBuf>,
    /// Start every child at startup instead of on first access.
    pub prestart: bool,
    /// Forward child stderr to the gateway's stderr instead of discarding it.
    pub forward_child_stderr: bool,
}

impl GatewayConfig {
    /// Build a configuration with default options around `registry`.
    #[must_use]
    pub fn new(registry: ChildRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }
}

/// Validate the `--children-abstract` path, returning `None` with a reason
/// when it must be ignored.
///
/// # Errors
///
/// Returns `AppError::Config` describing why a supplied path was rejected.
pub fn validate_abstract_path(path: Option<PathBuf>) -> Result<Option<PathBuf>> {
    match path {
        None => Ok(None),
        Some(p) if p.extension().and_then(|e| e.to_str()) == Some("json") => Ok(Some(p)),
        Some(p) => Err(AppError::Config(format!(
            "--children-abstract must specify a .json file. Got: {}",
            p.display()
        ))),
    }
}
