//! Declarative naming conventions for orchestrated (account-per-app) portals.
//!
//! An orchestrated ecosystem serves exactly one portal application, names its
//! environments with a declared prefix, and publishes its aliases in a
//! `public_url_table`. The whole description arrives as one JSON object, usually
//! the `*.ecosystem` config in the global env bucket, and deserializes into
//! [`OrchestratedRegistry`]. Unknown names with the right prefix are perfectly
//! legal environments; the table only adds facts (aliasing, production status),
//! it never gates existence.

use crate::envs::{PortalApp, PublicUrlEntry, ServerClassification, ServerKind};
use crate::error::{self, Result};
use serde::Deserialize;
use snafu::ensure;
use std::collections::BTreeMap;
use url::Url;

/// A declared ecosystem description. Field names match the JSON keys of the
/// stored declaration; everything is optional with conservative defaults, so a
/// minimal declaration like `{"full_env_prefix": "acme-"}` is usable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratedRegistry {
    orchestrated_app: PortalApp,
    full_env_prefix: String,
    prd_env_name: Option<String>,
    stg_env_name: Option<String>,
    stage_mirroring_enabled: bool,
    // The pseudo-env whose name is used for the shared stg/prd buckets.
    webprod_pseudo_env: Option<String>,
    public_url_table: Vec<PublicUrlEntry>,
    test_envs: Vec<String>,
    hotseat_envs: Vec<String>,
    dev_data_set_table: BTreeMap<String, String>,
    dev_env_domain_suffix: String,
    foursight_url_prefix: Option<String>,
}

impl Default for OrchestratedRegistry {
    fn default() -> Self {
        OrchestratedRegistry {
            orchestrated_app: PortalApp::Cgap,
            full_env_prefix: String::new(),
            prd_env_name: None,
            stg_env_name: None,
            stage_mirroring_enabled: false,
            webprod_pseudo_env: None,
            public_url_table: Vec::new(),
            test_envs: Vec::new(),
            hotseat_envs: Vec::new(),
            dev_data_set_table: BTreeMap::new(),
            dev_env_domain_suffix: String::new(),
            foursight_url_prefix: None,
        }
    }
}

impl OrchestratedRegistry {
    /// A small CGAP-style ecosystem for demonstrations and tests: prefix `acme-`,
    /// production `acme-prd`, no staging, four public aliases.
    pub fn sample_cgap() -> Self {
        OrchestratedRegistry {
            orchestrated_app: PortalApp::Cgap,
            full_env_prefix: "acme-".to_string(),
            prd_env_name: Some("acme-prd".to_string()),
            stg_env_name: None,
            stage_mirroring_enabled: false,
            webprod_pseudo_env: Some("production-data".to_string()),
            public_url_table: vec![
                public_entry("cgap", "https://cgap.genetics.example.com", "acme-prd"),
                public_entry("stg", "https://staging.genetics.example.com", "acme-stg"),
                public_entry("testing", "https://testing.genetics.example.com", "acme-pubtest"),
                public_entry("demo", "https://demo.genetics.example.com", "acme-pubdemo"),
            ],
            test_envs: strings(&["acme-test", "acme-mastertest", "acme-pubtest"]),
            hotseat_envs: strings(&["acme-hotseat", "acme-pubdemo"]),
            dev_data_set_table: [("acme-hotseat", "prod"), ("acme-test", "test")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            dev_env_domain_suffix: ".dev.genetics.example.com".to_string(),
            foursight_url_prefix: Some(
                "https://foursight.genetics.example.com/api/view/".to_string(),
            ),
        }
    }

    /// A Fourfront-style counterpart of [`Self::sample_cgap`], with a declared
    /// staging env and mirroring enabled.
    pub fn sample_fourfront() -> Self {
        OrchestratedRegistry {
            orchestrated_app: PortalApp::Fourfront,
            full_env_prefix: "acme-".to_string(),
            prd_env_name: Some("acme-prd".to_string()),
            stg_env_name: Some("acme-stg".to_string()),
            stage_mirroring_enabled: true,
            webprod_pseudo_env: Some("production-data".to_string()),
            public_url_table: vec![
                public_entry("data", "https://genetics.example.com", "acme-prd"),
                public_entry("staging", "https://stg.genetics.example.com", "acme-stg"),
                public_entry("test", "https://testing.genetics.example.com", "acme-pubtest"),
                public_entry("hot", "https://hot.genetics.example.com", "acme-hotseat"),
            ],
            test_envs: strings(&["acme-test", "acme-mastertest", "acme-pubtest"]),
            hotseat_envs: strings(&["acme-hotseat"]),
            dev_data_set_table: [("acme-hotseat", "prod"), ("acme-test", "test")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            dev_env_domain_suffix: ".dev.genetics.example.com".to_string(),
            foursight_url_prefix: Some(
                "https://foursight.genetics.example.com/api/view/".to_string(),
            ),
        }
    }

    pub fn app(&self) -> PortalApp {
        self.orchestrated_app
    }

    pub(crate) fn foursight_url_prefix(&self) -> Option<&str> {
        self.foursight_url_prefix.as_deref()
    }

    /// Mirroring is in effect only when both switched on and a staging env is
    /// declared. A declared `stg_env_name` without the flag is just an ordinary env.
    pub(crate) fn mirroring_enabled(&self) -> bool {
        self.stage_mirroring_enabled && self.stg_env_name.is_some()
    }

    fn entry_for_name(&self, name: &str) -> Option<&PublicUrlEntry> {
        self.public_url_table.iter().find(|e| e.name == name)
    }

    fn entry_for_env(&self, env: &str) -> Option<&PublicUrlEntry> {
        self.public_url_table.iter().find(|e| e.environment == env)
    }

    fn entry_for_host(&self, host: &str) -> Option<&PublicUrlEntry> {
        self.public_url_table.iter().find(|e| e.host == host)
    }

    // A public alias stands for the environment it is declared for.
    fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.entry_for_name(name)
            .map(|e| e.environment.as_str())
            .unwrap_or(name)
    }

    fn is_app_env(&self, envname: &str) -> bool {
        !envname.is_empty()
            && (envname.starts_with(&self.full_env_prefix) || self.entry_for_name(envname).is_some())
    }

    pub(crate) fn is_cgap_env(&self, envname: &str) -> bool {
        self.orchestrated_app == PortalApp::Cgap && self.is_app_env(envname)
    }

    pub(crate) fn is_fourfront_env(&self, envname: &str) -> bool {
        self.orchestrated_app == PortalApp::Fourfront && self.is_app_env(envname)
    }

    pub(crate) fn is_stg_or_prd_env(&self, envname: &str) -> bool {
        if envname.is_empty() {
            return false;
        }
        let resolved = self.resolve_alias(envname);
        if self.prd_env_name.as_deref() == Some(resolved) {
            return true;
        }
        self.mirroring_enabled() && self.stg_env_name.as_deref() == Some(resolved)
    }

    pub(crate) fn is_test_env(&self, envname: &str) -> bool {
        let resolved = self.resolve_alias(envname);
        self.test_envs.iter().any(|e| e == resolved)
    }

    pub(crate) fn is_hotseat_env(&self, envname: &str) -> bool {
        let resolved = self.resolve_alias(envname);
        self.hotseat_envs.iter().any(|e| e == resolved)
    }

    /// The declared staging/production partner. Alias in, alias out: asking for
    /// the mirror of a public name answers with the partner's public name when it
    /// has one.
    pub(crate) fn get_standard_mirror_env(&self, envname: &str) -> Option<String> {
        if !self.mirroring_enabled() {
            return None;
        }
        let prd = self.prd_env_name.as_deref()?;
        let stg = self.stg_env_name.as_deref()?;
        let was_alias = self.entry_for_name(envname).is_some();
        let resolved = self.resolve_alias(envname);
        let partner = if resolved == prd {
            stg
        } else if resolved == stg {
            prd
        } else {
            return None;
        };
        if was_alias {
            if let Some(entry) = self.entry_for_env(partner) {
                return Some(entry.name.clone());
            }
        }
        Some(partner.to_string())
    }

    pub(crate) fn prod_bucket_env(&self, envname: &str) -> Option<String> {
        if !self.is_stg_or_prd_env(envname) {
            return None;
        }
        self.webprod_pseudo_env
            .clone()
            .or_else(|| self.prd_env_name.clone())
    }

    pub(crate) fn dev_data_set(&self, envname: &str) -> Option<String> {
        self.dev_data_set_table
            .get(envname)
            .or_else(|| self.dev_data_set_table.get(self.resolve_alias(envname)))
            .cloned()
    }

    pub(crate) fn full_env_name(&self, envname: &str) -> Result<String> {
        if let Some(entry) = self.entry_for_name(envname) {
            return Ok(entry.environment.clone());
        }
        if !self.full_env_prefix.is_empty() && envname.starts_with(&self.full_env_prefix) {
            Ok(envname.to_string())
        } else {
            Ok(format!("{}{}", self.full_env_prefix, envname))
        }
    }

    /// Like [`Self::full_env_name`] but only for the app this ecosystem serves;
    /// a single-app orchestration has no names belonging to the other app.
    pub(crate) fn full_app_env_name(&self, envname: &str, app: PortalApp) -> Result<String> {
        ensure!(
            self.orchestrated_app == app,
            error::WrongAppEnv {
                envname,
                app: app.to_string()
            }
        );
        self.full_env_name(envname)
    }

    pub(crate) fn short_env_name(&self, envname: &str) -> String {
        let resolved = self.resolve_alias(envname);
        if self.full_env_prefix.is_empty() {
            return resolved.to_string();
        }
        resolved
            .strip_prefix(&self.full_env_prefix)
            .unwrap_or(resolved)
            .to_string()
    }

    /// The alias-to-URL mapping. A single-app ecosystem has one table for all
    /// names, so no argument is needed.
    pub(crate) fn public_url_mappings(&self) -> BTreeMap<String, String> {
        self.public_url_table
            .iter()
            .map(|e| (e.name.clone(), e.url.clone()))
            .collect()
    }

    pub(crate) fn get_env_real_url(&self, envname: &str) -> String {
        if let Some(entry) = self.entry_for_name(envname) {
            return entry.url.clone();
        }
        if let Ok(full) = self.full_env_name(envname) {
            if let Some(entry) = self.entry_for_env(&full) {
                return entry.url.clone();
            }
        }
        match self.orchestrated_app {
            // Fourfront development servers historically prefer plain http and
            // short names in their hostnames.
            PortalApp::Fourfront => format!(
                "http://{}{}",
                self.short_env_name(envname),
                self.dev_env_domain_suffix
            ),
            PortalApp::Cgap => format!("https://{}{}", envname, self.dev_env_domain_suffix),
        }
    }

    pub(crate) fn foursight_env_name(&self, envname: &str) -> String {
        if let Ok(full) = self.full_env_name(envname) {
            if let Some(entry) = self.entry_for_env(&full) {
                return entry.name.clone();
            }
        }
        self.short_env_name(envname)
    }

    pub(crate) fn classify_server_url(
        &self,
        url: &str,
        raise_error: bool,
    ) -> Result<ServerClassification> {
        let parsed = Url::parse(url).ok();
        let hostname = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or("")
            .to_string();
        let hostname1 = hostname.split('.').next().unwrap_or("");

        if hostname1 == "localhost" || hostname == "127.0.0.1" {
            return Ok(ServerClassification::unknown(ServerKind::Localhost));
        }

        let (server_env, public_name) = if let Some(entry) = self.entry_for_host(&hostname) {
            (entry.environment.clone(), Some(entry.name.clone()))
        } else if !self.dev_env_domain_suffix.is_empty()
            && hostname.ends_with(&self.dev_env_domain_suffix)
        {
            let label = hostname
                .strip_suffix(&self.dev_env_domain_suffix)
                .unwrap_or(&hostname)
                .to_string();
            let public_name = self.entry_for_env(&label).map(|e| e.name.clone());
            (label, public_name)
        } else {
            ensure!(
                !raise_error,
                error::UnknownServerUrl {
                    url,
                    app: self.orchestrated_app.to_string()
                }
            );
            return Ok(ServerClassification::unknown(ServerKind::Unknown));
        };

        let is_stg_or_prd = self.is_stg_or_prd_env(&server_env);
        let environment = self
            .prod_bucket_env(&server_env)
            .unwrap_or_else(|| server_env.clone());
        let kind = match self.orchestrated_app {
            PortalApp::Cgap => ServerKind::Cgap,
            PortalApp::Fourfront => ServerKind::Fourfront,
        };
        Ok(ServerClassification {
            kind,
            environment: environment.clone(),
            bucket_env: environment,
            server_env,
            is_stg_or_prd,
            public_name,
        })
    }
}

fn public_entry(name: &str, url: &str, environment: &str) -> PublicUrlEntry {
    let host = url.trim_start_matches("https://").trim_start_matches("http://");
    PublicUrlEntry {
        name: name.to_string(),
        url: url.to_string(),
        host: host.to_string(),
        environment: environment.to_string(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
