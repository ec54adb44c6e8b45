//! Application-level configuration loading, including the office service catalog.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{CounterEntity, ServiceTypeEntity},
    dto::validation::validate_service_tag,
    state::{DEFAULT_DISPLAY_CAPACITY, DEFAULT_STORE_TIMEOUT, StateSettings},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "OFFICE_QUEUE_CONFIG_PATH";
/// Namespace for ids derived from service tags and counter names.
const CATALOG_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a0e_93b4_4d5e_8a7f_0c3d_51e2_b948);

/// Stable id of a service type, derived from its tag.
pub fn service_id_for_tag(tag: &str) -> Uuid {
    Uuid::new_v5(&CATALOG_NAMESPACE, format!("service:{tag}").as_bytes())
}

/// Stable id of a counter, derived from its name.
pub fn counter_id_for_name(name: &str) -> Uuid {
    Uuid::new_v5(&CATALOG_NAMESPACE, format!("counter:{name}").as_bytes())
}

/// Service types and counters seeded into the store whenever it comes online.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub services: Vec<ServiceTypeEntity>,
    pub counters: Vec<CounterEntity>,
}

impl Catalog {
    /// Look up a service type by tag.
    pub fn service_by_tag(&self, tag: &str) -> Option<&ServiceTypeEntity> {
        self.services.iter().find(|service| service.tag == tag)
    }

    /// Look up a counter by name.
    pub fn counter_by_name(&self, name: &str) -> Option<&CounterEntity> {
        self.counters.iter().find(|counter| counter.name == name)
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    catalog: Catalog,
    store_timeout: Option<Duration>,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in catalog.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        services = app_config.catalog.services.len(),
                        counters = app_config.catalog.counters.len(),
                        "loaded office catalog from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Invalid catalog entries are skipped with a warning.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Service types and counters to seed.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Upper bound applied to every storage call; `None` when disabled.
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout
    }

    /// Settings used to build the shared state.
    pub fn state_settings(&self) -> StateSettings {
        StateSettings {
            store_timeout: self.store_timeout,
            display_capacity: self.sse_capacity,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            store_timeout: Some(DEFAULT_STORE_TIMEOUT),
            sse_capacity: DEFAULT_DISPLAY_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    services: Vec<RawService>,
    #[serde(default)]
    counters: Vec<RawCounter>,
    /// `0` disables the storage timeout.
    store_timeout_ms: Option<u64>,
    sse_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a service type entry.
struct RawService {
    id: Option<Uuid>,
    tag: String,
    /// Seconds.
    average_service_time: u32,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a counter entry; `services` lists service tags.
struct RawCounter {
    id: Option<Uuid>,
    name: String,
    services: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let catalog = if value.services.is_empty() {
            warn!("config declares no services; using built-in catalog");
            default_catalog()
        } else {
            build_catalog(value.services, value.counters)
        };

        let store_timeout = match value.store_timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(DEFAULT_STORE_TIMEOUT),
        };

        Self {
            catalog,
            store_timeout,
            sse_capacity: value
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_DISPLAY_CAPACITY),
        }
    }
}

fn build_catalog(raw_services: Vec<RawService>, raw_counters: Vec<RawCounter>) -> Catalog {
    let mut services = Vec::with_capacity(raw_services.len());
    let mut ids_by_tag: HashMap<String, Uuid> = HashMap::new();

    for raw in raw_services {
        if let Err(err) = validate_service_tag(&raw.tag) {
            warn!(tag = %raw.tag, error = %err, "skipping service with invalid tag");
            continue;
        }
        if ids_by_tag.contains_key(&raw.tag) {
            warn!(tag = %raw.tag, "skipping duplicate service tag");
            continue;
        }

        let id = raw.id.unwrap_or_else(|| service_id_for_tag(&raw.tag));
        ids_by_tag.insert(raw.tag.clone(), id);
        services.push(ServiceTypeEntity {
            id,
            tag: raw.tag,
            average_service_time: raw.average_service_time,
            description: raw.description,
        });
    }

    let counters = raw_counters
        .into_iter()
        .map(|raw| {
            let service_ids = raw
                .services
                .iter()
                .filter_map(|tag| {
                    let id = ids_by_tag.get(tag).copied();
                    if id.is_none() {
                        warn!(counter = %raw.name, tag = %tag, "counter references unknown service tag");
                    }
                    id
                })
                .collect();

            CounterEntity {
                id: raw.id.unwrap_or_else(|| counter_id_for_name(&raw.name)),
                name: raw.name,
                service_ids,
            }
        })
        .collect();

    Catalog { services, counters }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalog shipped with the binary.
fn default_catalog() -> Catalog {
    let service = |tag: &str, seconds: u32, description: &str| ServiceTypeEntity {
        id: service_id_for_tag(tag),
        tag: tag.to_string(),
        average_service_time: seconds,
        description: Some(description.to_string()),
    };
    let counter = |name: &str, tags: &[&str]| CounterEntity {
        id: counter_id_for_name(name),
        name: name.to_string(),
        service_ids: tags.iter().map(|tag| service_id_for_tag(tag)).collect(),
    };

    Catalog {
        services: vec![
            service("A", 300, "Mail & Delivery"),
            service("B", 600, "Accounts & Payments"),
            service("C", 900, "Identity Documents"),
        ],
        counters: vec![
            counter("Counter 1", &["A", "B"]),
            counter("Counter 2", &["B", "C"]),
            counter("Counter 3", &["A"]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_links_counters_to_services() {
        let config = AppConfig::default();
        let catalog = config.catalog();

        let a = catalog.service_by_tag("A").unwrap();
        let counter = catalog.counter_by_name("Counter 3").unwrap();
        assert_eq!(counter.service_ids, vec![a.id]);
        assert_eq!(config.store_timeout(), Some(DEFAULT_STORE_TIMEOUT));
    }

    #[test]
    fn ids_are_stable_across_loads() {
        assert_eq!(service_id_for_tag("A"), service_id_for_tag("A"));
        assert_ne!(service_id_for_tag("A"), counter_id_for_name("A"));
    }

    #[test]
    fn parses_catalog_and_skips_invalid_entries() {
        let explicit = Uuid::new_v4();
        let json = format!(
            r#"{{
                "services": [
                    {{ "tag": "P", "average_service_time": 120 }},
                    {{ "id": "{explicit}", "tag": "Q", "average_service_time": 60, "description": "Quick" }},
                    {{ "tag": "bad1", "average_service_time": 10 }},
                    {{ "tag": "P", "average_service_time": 999 }}
                ],
                "counters": [
                    {{ "name": "Desk", "services": ["Q", "P", "ZZ"] }}
                ],
                "store_timeout_ms": 0,
                "sse_capacity": 8
            }}"#
        );

        let config = AppConfig::from_json(&json).unwrap();
        let catalog = config.catalog();
        let tags: Vec<_> = catalog.services.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["P", "Q"]);
        assert_eq!(catalog.service_by_tag("P").unwrap().average_service_time, 120);

        let desk = catalog.counter_by_name("Desk").unwrap();
        assert_eq!(desk.id, counter_id_for_name("Desk"));
        assert_eq!(desk.service_ids, vec![explicit, service_id_for_tag("P")]);

        assert_eq!(config.store_timeout(), None);
        assert_eq!(config.state_settings().display_capacity, 8);
    }

    #[test]
    fn empty_service_list_falls_back_to_defaults() {
        let config = AppConfig::from_json(r#"{ "services": [] }"#).unwrap();
        assert_eq!(config.catalog(), &default_catalog());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }
}
