//! YAML configuration file.
//!
//! ```yaml
//! mysql:
//!   host: 127.0.0.1
//!   port: 3306
//!   user: repl
//!   password: secret
//!   server_id: 1001
//!   checkpoint_dir: /var/lib/binlog-index-sync
//! meilisearch:
//!   host: http://127.0.0.1:7700
//!   api_key: masterKey
//! sync:
//!   - db: shop
//!     table: products
//!     index: products
//!     primary_key: id
//!     filterable_fields: [category]
//! ```

use std::path::{Path, PathBuf};

use meilisearch_sink::MeilisearchOpts;
use mysql_async::{Opts, OptsBuilder};
use serde::Deserialize;
use sync_core::{SyncRule, SyncRules};
use thiserror::Error;

const DEFAULT_MYSQL_PORT: u16 = 3306;
const DEFAULT_SERVER_ID: u32 = 1001;

/// Errors raised while loading the configuration. All are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config has no sync rules")]
    NoSyncRules,

    #[error("sync rule #{rule} has an empty '{field}'")]
    EmptyField { rule: usize, field: &'static str },

    #[error("mysql.{0} must not be empty")]
    EmptyMySQLField(&'static str),

    #[error("meilisearch.host must not be empty")]
    EmptyMeilisearchHost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mysql: MySQLConfig,
    pub meilisearch: MeilisearchConfig,
    pub sync: Vec<SyncRuleConfig>,
}

#[derive(Clone, Deserialize)]
pub struct MySQLConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Replica id announced to the server; unique per replica.
    #[serde(default = "default_server_id")]
    pub server_id: u32,
    pub checkpoint_dir: PathBuf,
}

impl std::fmt::Debug for MySQLConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySQLConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("server_id", &self.server_id)
            .field("checkpoint_dir", &self.checkpoint_dir)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeilisearchConfig {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// One entry of the `sync` list.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRuleConfig {
    pub db: String,
    pub table: String,
    pub index: String,
    pub primary_key: String,
    #[serde(default)]
    pub filterable_fields: Vec<String>,
}

fn default_mysql_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

fn default_server_id() -> u32 {
    DEFAULT_SERVER_ID
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate config content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mysql.host.is_empty() {
            return Err(ConfigError::EmptyMySQLField("host"));
        }
        if self.mysql.user.is_empty() {
            return Err(ConfigError::EmptyMySQLField("user"));
        }
        if self.mysql.checkpoint_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyMySQLField("checkpoint_dir"));
        }
        if self.meilisearch.host.is_empty() {
            return Err(ConfigError::EmptyMeilisearchHost);
        }
        if self.sync.is_empty() {
            return Err(ConfigError::NoSyncRules);
        }

        for (i, rule) in self.sync.iter().enumerate() {
            let fields = [
                ("db", &rule.db),
                ("table", &rule.table),
                ("index", &rule.index),
                ("primary_key", &rule.primary_key),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
                return Err(ConfigError::EmptyField {
                    rule: i,
                    field: *field,
                });
            }
        }

        Ok(())
    }

    /// Connection options for the source server.
    pub fn mysql_opts(&self) -> Opts {
        let mysql = &self.mysql;
        let password = Some(mysql.password.as_str()).filter(|p| !p.is_empty());
        OptsBuilder::default()
            .ip_or_hostname(mysql.host.as_str())
            .tcp_port(mysql.port)
            .user(Some(mysql.user.as_str()))
            .pass(password)
            .into()
    }

    pub fn meilisearch_opts(&self) -> MeilisearchOpts {
        MeilisearchOpts {
            host: self.meilisearch.host.clone(),
            api_key: self.meilisearch.api_key.clone(),
        }
    }

    /// Build the rule table in configuration order.
    pub fn sync_rules(&self) -> SyncRules {
        SyncRules::new(
            self.sync
                .iter()
                .map(|rule| {
                    SyncRule::new(
                        &rule.db,
                        &rule.table,
                        &rule.index,
                        &rule.primary_key,
                        &rule.filterable_fields,
                    )
                })
                .collect(),
        )
    }
}
