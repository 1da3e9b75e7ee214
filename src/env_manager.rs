//! Resolution of environment names against the global env bucket.
//!
//! The global env bucket holds one JSON config object per environment name, plus
//! `<name>.ecosystem` objects describing whole naming regimes. An [`EnvManager`]
//! is the resolved result: the portal URL, Elasticsearch URL, and canonical env
//! name for one environment.
//!
//! Environment descriptors are mid-migration between two key vocabularies: the
//! legacy keys (`fourfront`, `es`, `ff_env`) and their successors (`portal_url`,
//! `es_url`, `env_name`). Readers accept both, preferring the legacy spelling,
//! so descriptors can carry either or both during the transition.

use crate::envs::NamingRegistry;
use crate::error::{self, Result};
use crate::health::HealthPage;
use crate::{EnvBucketMediator, HealthMediator};
use log::warn;
use snafu::{ensure, ResultExt};
use std::collections::HashSet;

/// The global env bucket the legacy (pre-orchestration) deployments used.
pub const LEGACY_GLOBAL_ENV_BUCKET: &str = "foursight-test-envs";

const LEGACY_PORTAL_URL_KEY: &str = "fourfront";
const PORTAL_URL_KEY: &str = "portal_url";
const LEGACY_ES_URL_KEY: &str = "es";
const ES_URL_KEY: &str = "es_url";
const LEGACY_ENV_NAME_KEY: &str = "ff_env";
const ENV_NAME_KEY: &str = "env_name";

const ECOSYSTEM_KEY: &str = "ecosystem";
const ECOSYSTEM_SUFFIX: &str = ".ecosystem";

// Deprecated spelling first; some tools still set it.
const GLOBAL_BUCKET_ENV_VAR: &str = "GLOBAL_BUCKET_ENV";
const GLOBAL_ENV_BUCKET_VAR: &str = "GLOBAL_ENV_BUCKET";

/// The name of the current global env bucket, from the `GLOBAL_ENV_BUCKET`
/// environment variable or its deprecated synonym `GLOBAL_BUCKET_ENV`. Setting
/// both to different values is a configuration error, not a precedence question.
pub fn global_env_bucket_name() -> Result<Option<String>> {
    global_env_bucket_from(
        std::env::var(GLOBAL_BUCKET_ENV_VAR).ok(),
        std::env::var(GLOBAL_ENV_BUCKET_VAR).ok(),
    )
}

/// The pure core of [`global_env_bucket_name`], taking the two variable values
/// explicitly so callers (and tests) need not touch the process environment.
pub fn global_env_bucket_from(
    global_bucket_env: Option<String>,
    global_env_bucket: Option<String>,
) -> Result<Option<String>> {
    if let (Some(old), Some(new)) = (global_bucket_env.as_deref(), global_env_bucket.as_deref()) {
        ensure!(
            old == new,
            error::SynonymousEnvironmentVariablesMismatched {
                var1: GLOBAL_BUCKET_ENV_VAR,
                val1: old,
                var2: GLOBAL_ENV_BUCKET_VAR,
                val2: new,
            }
        );
    }
    Ok(global_env_bucket.or(global_bucket_env))
}

/// Lists the environment config names in the global env bucket: keys without a
/// dot in them, sorted.
pub async fn get_all_environments(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
) -> Result<Vec<String>> {
    let keys = list_config_keys(mediator, env_bucket).await?;
    let mut envs: Vec<String> = keys.into_iter().filter(|k| !k.contains('.')).collect();
    envs.sort();
    Ok(envs)
}

/// Lists the ecosystem names in the global env bucket: keys ending in
/// `.ecosystem`, with the suffix removed, sorted.
pub async fn get_all_ecosystems(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
) -> Result<Vec<String>> {
    let keys = list_config_keys(mediator, env_bucket).await?;
    let mut ecosystems: Vec<String> = keys
        .into_iter()
        .filter_map(|k| k.strip_suffix(ECOSYSTEM_SUFFIX).map(String::from))
        .collect();
    ecosystems.sort();
    Ok(ecosystems)
}

async fn list_config_keys(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
) -> Result<Vec<String>> {
    mediator
        .list_keys(env_bucket)
        .await
        .context(error::EnvBucketAccess {
            global_bucket: env_bucket,
        })
}

/// Fetches a config object from the global env bucket, following `"ecosystem"`
/// pointers: a config may delegate to `<name>.ecosystem`, which may delegate
/// further. Following stops at the first object without a pointer, or at the
/// first pointer that refers back to something already visited, so circular
/// declarations resolve to the last new object instead of looping.
pub async fn get_config_ecosystem(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
    config_key: &str,
) -> Result<serde_json::Value> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(
        config_key
            .strip_suffix(ECOSYSTEM_SUFFIX)
            .unwrap_or(config_key)
            .to_string(),
    );
    let mut current = fetch_config(mediator, env_bucket, config_key).await?;
    loop {
        let pointer = current
            .get(ECOSYSTEM_KEY)
            .and_then(|v| v.as_str())
            .map(String::from);
        match pointer {
            Some(name) if !seen.contains(&name) => {
                let key = format!("{}{}", name, ECOSYSTEM_SUFFIX);
                let next = fetch_config(mediator, env_bucket, &key).await?;
                seen.insert(name);
                current = next;
            }
            _ => return Ok(current),
        }
    }
}

/// Loads the named ecosystem declaration and builds a [`NamingRegistry`] from it.
pub async fn load_naming_registry(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
    ecosystem: &str,
) -> Result<NamingRegistry> {
    let key = format!("{}{}", ecosystem, ECOSYSTEM_SUFFIX);
    let declared = get_config_ecosystem(mediator, env_bucket, &key).await?;
    NamingRegistry::from_declared_data(&declared)
}

async fn fetch_config(
    mediator: &impl EnvBucketMediator,
    env_bucket: &str,
    config_key: &str,
) -> Result<serde_json::Value> {
    mediator
        .get_object_json(env_bucket, config_key)
        .await
        .context(error::DeclaredDataLoad {
            env_bucket,
            config_key,
        })
}

/// The resolved identity of one environment: where its portal is, where its
/// Elasticsearch is, and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvManager {
    portal_url: String,
    es_url: String,
    env_name: String,
}

impl EnvManager {
    /// Builds an `EnvManager` directly from its three constituents, bypassing the
    /// global env bucket. Useful when the values are already known, as in tests
    /// or locally configured tools.
    pub fn compose(portal_url: &str, es_url: &str, env_name: &str) -> Self {
        EnvManager {
            portal_url: portal_url.trim_end_matches('/').to_string(),
            es_url: es_url.to_string(),
            env_name: env_name.to_string(),
        }
    }

    /// Builds an `EnvManager` from an environment descriptor as stored in the
    /// global env bucket. Both key vocabularies are accepted; a descriptor
    /// missing a portal URL, ES URL, or env name is rejected here rather than
    /// surfacing as an empty field later.
    pub fn from_description(description: &serde_json::Value) -> Result<Self> {
        let env_name = described_value(description, LEGACY_ENV_NAME_KEY, ENV_NAME_KEY)?;
        let portal_url = described_value(description, LEGACY_PORTAL_URL_KEY, PORTAL_URL_KEY)?;
        let es_url = described_value(description, LEGACY_ES_URL_KEY, ES_URL_KEY)?;
        Ok(EnvManager {
            portal_url: portal_url.trim_end_matches('/').to_string(),
            es_url,
            env_name,
        })
    }

    /// Verifies that the env has a config in the global env bucket and loads it.
    ///
    /// The env name is normalized through the registry first, so aliases and
    /// short names find their full-name configs. When no env is named and the
    /// bucket declares exactly one, that one is inferred; any other count is an
    /// error, since guessing among several environments would be reckless.
    pub async fn verify_and_get_env_config(
        mediator: &impl EnvBucketMediator,
        registry: &NamingRegistry,
        global_bucket: &str,
        env: Option<&str>,
    ) -> Result<Self> {
        warn!("Fetching bucket data via global env bucket: {}", global_bucket);
        let named = match env {
            Some(e) => Some(registry.full_env_name(e)?),
            None => None,
        };
        let keys = get_all_environments(mediator, global_bucket).await?;
        let env = match named {
            Some(e) => e,
            None => {
                ensure!(
                    keys.len() == 1,
                    error::CannotInferEnvFromManyGlobalEnvs {
                        global_bucket,
                        keys: keys.clone(),
                    }
                );
                let only = keys[0].clone();
                warn!(
                    "No env was specified, but {} is the only one available, so using that.",
                    only
                );
                only
            }
        };
        ensure!(
            keys.contains(&env),
            error::MissingGlobalEnv {
                global_bucket,
                keys: keys.clone(),
                env: env.as_str(),
            }
        );
        let description = mediator
            .get_object_json(global_bucket, &env)
            .await
            .context(error::EnvBucketAccess {
                global_bucket,
            })?;
        Self::from_description(&description)
    }

    /// Fetches this environment's portal health page.
    pub async fn fetch_health_page(&self, health: &impl HealthMediator) -> Result<HealthPage> {
        health
            .fetch_health_page(&self.portal_url)
            .await
            .context(error::HealthPageFetch {
                portal_url: self.portal_url.as_str(),
            })
    }

    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    pub fn es_url(&self) -> &str {
        &self.es_url
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }
}

// Non-string and empty values count as missing, like the falsy checks the
// stored descriptors have always been read with.
fn described_value(
    description: &serde_json::Value,
    legacy_key: &'static str,
    key: &'static str,
) -> Result<String> {
    for k in &[legacy_key, key] {
        if let Some(value) = description.get(k).and_then(|v| v.as_str()) {
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }
    }
    error::MissingDescriptionKey {
        legacy_key,
        key,
        description: description.to_string(),
    }
    .fail()
}
