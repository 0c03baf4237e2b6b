use std::{fs, path::Path};

use serde::Deserialize;

use crate::{CrosslistError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// store config
    pub store: StoreConfig,
    /// posting schedule config
    pub posting: PostingConfig,
    /// search cache config
    pub search: SearchConfig,
    /// number of async worker threads driving the database pool, defaults to 4
    pub async_worker_thread_number: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// store type
    pub store_type: StoreType,
    /// sqlite config
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Mem,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// sqlite database url, e.g. `sqlite://crosslist.db` or `sqlite::memory:`
    pub database_url: String,
    /// pool size, forced to 1 for in-memory databases
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    /// gap between platforms when no explicit schedule is given
    pub schedule_stagger_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// number of cached search results
    pub cache_capacity: usize,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            posting: PostingConfig::default(),
            search: SearchConfig::default(),
            async_worker_thread_number: 4,
        }
    }
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            schedule_stagger_secs: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
        }
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())
            .map_err(|e| CrosslistError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        if config.store.store_type == StoreType::Sqlite && config.store.sqlite.is_none() {
            return Err(CrosslistError::Config("[store.sqlite] is required when store_type is sqlite".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use crate::{Config, StoreType};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        async_worker_thread_number = 10
        [store]
        store_type = "sqlite"

        [store.sqlite]
        database_url = "sqlite://crosslist.db"

        [posting]
        schedule_stagger_secs = 60
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.async_worker_thread_number, 10);
        assert_eq!(config.store.store_type, StoreType::Sqlite);
        assert_eq!(config.posting.schedule_stagger_secs, 60);
        assert_eq!(config.search.cache_capacity, 256);

        let sqlite = config.store.sqlite.unwrap();
        assert_eq!(sqlite.database_url, "sqlite://crosslist.db");
        assert_eq!(sqlite.max_connections, 5);
    }

    #[test]
    fn test_config_defaults_from_empty() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.store.store_type, StoreType::Mem);
        assert_eq!(config.async_worker_thread_number, 4);
        assert_eq!(config.posting.schedule_stagger_secs, 300);
    }

    #[test]
    fn test_config_sqlite_requires_section() {
        let err = Config::load_from_str("[store]\nstore_type = \"sqlite\"\n").unwrap_err();
        assert!(err.to_string().contains("store.sqlite"));
    }

    #[test]
    fn test_config_rejects_bad_toml() {
        assert!(Config::load_from_str("store = 3").is_err());
    }
}
