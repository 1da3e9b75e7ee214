/*!
`envs` holds the naming-convention tables and the classification predicates that
interpret environment names against them.

The two regimes are variants of [`NamingRegistry`]: [`legacy`] wires in the
historical Fourfront/CGAP ElasticBeanstalk names, [`orchestrated`] interprets a
declared ecosystem description. A registry is immutable once constructed; every
predicate is a pure function of (name, registry). Names absent from all tables are
never an error — they classify as "ordinary" (not test, not staging/production, no
mirror), which is the right default for arbitrary feature-branch environments.
*/

pub mod legacy;
pub mod orchestrated;

use crate::error::{self, Result};
use serde::Deserialize;
use snafu::{ensure, ResultExt};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub use legacy::LegacyRegistry;
pub use orchestrated::OrchestratedRegistry;

/// Which portal application an orchestrated ecosystem serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalApp {
    Cgap,
    Fourfront,
}

impl Display for PortalApp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalApp::Cgap => write!(f, "cgap"),
            PortalApp::Fourfront => write!(f, "fourfront"),
        }
    }
}

/// The ecosystem a server URL was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Cgap,
    Fourfront,
    Localhost,
    Unknown,
}

impl Display for ServerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerKind::Cgap => write!(f, "cgap"),
            ServerKind::Fourfront => write!(f, "fourfront"),
            ServerKind::Localhost => write!(f, "localhost"),
            ServerKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// What a server URL means within the active ecosystem.
///
/// `environment` and `bucket_env` name the environment whose buckets the server
/// uses (staging and production collapse to the shared bucket env); `server_env`
/// names the concrete deployment behind the URL; `public_name` is the declared
/// public alias, when the URL is a public one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerClassification {
    pub kind: ServerKind,
    pub environment: String,
    pub bucket_env: String,
    pub server_env: String,
    pub is_stg_or_prd: bool,
    pub public_name: Option<String>,
}

impl ServerClassification {
    pub(crate) fn unknown(kind: ServerKind) -> Self {
        ServerClassification {
            kind,
            environment: "unknown".to_string(),
            bucket_env: "unknown".to_string(),
            server_env: "unknown".to_string(),
            is_stg_or_prd: false,
            public_name: None,
        }
    }
}

/// One row of a `PUBLIC_URL_TABLE`: a public alias, the URL it serves, and the
/// concrete environment behind it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicUrlEntry {
    pub name: String,
    pub url: String,
    pub host: String,
    pub environment: String,
}

/// The active naming regime. Constructed once and passed explicitly to every
/// predicate; tests build a fresh registry instead of mutating shared state.
#[derive(Debug, Clone)]
pub enum NamingRegistry {
    Legacy(LegacyRegistry),
    Orchestrated(OrchestratedRegistry),
}

impl NamingRegistry {
    /// The hard-coded legacy Fourfront/CGAP conventions.
    pub fn legacy() -> Self {
        NamingRegistry::Legacy(LegacyRegistry::new())
    }

    /// Builds a registry from a declared ecosystem description, as stored in the
    /// global env bucket. A declaration carrying `"is_legacy": true` selects the
    /// legacy tables; anything else is interpreted as an orchestrated ecosystem.
    pub fn from_declared_data(data: &serde_json::Value) -> Result<Self> {
        if data.get("is_legacy").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(NamingRegistry::legacy());
        }
        let registry: OrchestratedRegistry =
            serde_json::from_value(data.clone()).context(error::BadDeclaredData)?;
        Ok(NamingRegistry::Orchestrated(registry))
    }

    /// True if the given string looks like a CGAP environment name in this regime.
    pub fn is_cgap_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_cgap_env(envname),
            NamingRegistry::Orchestrated(r) => r.is_cgap_env(envname),
        }
    }

    /// True if the given string looks like a Fourfront environment name in this regime.
    pub fn is_fourfront_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_fourfront_env(envname),
            NamingRegistry::Orchestrated(r) => r.is_fourfront_env(envname),
        }
    }

    /// True if the name is live data or something ready to be swapped in as live.
    /// This does not change as blue or green is deployed; it asks whether the name
    /// is of production class, not which side is currently serving.
    pub fn is_stg_or_prd_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_stg_or_prd_env(envname),
            NamingRegistry::Orchestrated(r) => r.is_stg_or_prd_env(envname),
        }
    }

    pub fn is_test_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_test_env(envname),
            NamingRegistry::Orchestrated(r) => r.is_test_env(envname),
        }
    }

    pub fn is_hotseat_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_hotseat_env(envname),
            NamingRegistry::Orchestrated(r) => r.is_hotseat_env(envname),
        }
    }

    pub fn is_indexer_env(&self, envname: &str) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_indexer_env(envname),
            // The indexer is not deployed as a named environment in containerized
            // orchestrations, so nothing classifies as one.
            NamingRegistry::Orchestrated(_) => false,
        }
    }

    /// The indexer environment serving the given env, or `None` for the indexer
    /// itself and for orchestrated ecosystems (which have no indexer env).
    pub fn indexer_env_for_env(&self, envname: &str) -> Option<String> {
        match self {
            NamingRegistry::Legacy(r) => r.indexer_env_for_env(envname),
            NamingRegistry::Orchestrated(_) => None,
        }
    }

    /// The declared blue/green or staging/production partner of the given env.
    ///
    /// Unlike [`blue_green_mirror_env`] this consults declarations, not name
    /// syntax. Alias inputs produce alias outputs (`"data"` ↔ `"staging"`).
    /// Returns `None` when no partner is declared or, in the orchestrated regime,
    /// when stage mirroring is disabled: mirroring is an opt-in capability, and a
    /// configured `stg_env_name` is deliberately reported as ordinary until the
    /// flag turns on.
    pub fn get_standard_mirror_env(&self, envname: &str) -> Option<String> {
        match self {
            NamingRegistry::Legacy(r) => r.get_standard_mirror_env(envname),
            NamingRegistry::Orchestrated(r) => r.get_standard_mirror_env(envname),
        }
    }

    /// The env whose buckets a production-class env uses, or `None` for ordinary
    /// envs. Staging and production siblings resolve to the same value, enforcing
    /// that blue/green pairs share storage.
    pub fn prod_bucket_env(&self, envname: &str) -> Option<String> {
        match self {
            NamingRegistry::Legacy(r) => r.prod_bucket_env(envname),
            NamingRegistry::Orchestrated(r) => r.prod_bucket_env(envname),
        }
    }

    /// Like [`Self::prod_bucket_env`] but total: ordinary envs use their own name.
    pub fn get_bucket_env(&self, envname: &str) -> String {
        if self.is_stg_or_prd_env(envname) {
            self.prod_bucket_env(envname)
                .unwrap_or_else(|| envname.to_string())
        } else {
            envname.to_string()
        }
    }

    /// Expands a possibly-short env name to its fully prefixed form. Public
    /// aliases expand to the environment they are declared for; names already
    /// carrying the prefix pass through unchanged. Errors only for names that are
    /// structurally unusable (the legacy special tokens `data`/`staging`).
    pub fn full_env_name(&self, envname: &str) -> Result<String> {
        match self {
            NamingRegistry::Legacy(r) => r.full_env_name(envname),
            NamingRegistry::Orchestrated(r) => r.full_env_name(envname),
        }
    }

    /// Like [`Self::full_env_name`], but errors for names outside the CGAP ecosystem.
    pub fn full_cgap_env_name(&self, envname: &str) -> Result<String> {
        match self {
            NamingRegistry::Legacy(r) => r.full_cgap_env_name(envname),
            NamingRegistry::Orchestrated(r) => r.full_app_env_name(envname, PortalApp::Cgap),
        }
    }

    /// Like [`Self::full_env_name`], but errors for names outside the Fourfront ecosystem.
    pub fn full_fourfront_env_name(&self, envname: &str) -> Result<String> {
        match self {
            NamingRegistry::Legacy(r) => r.full_fourfront_env_name(envname),
            NamingRegistry::Orchestrated(r) => r.full_app_env_name(envname, PortalApp::Fourfront),
        }
    }

    /// The inverse of [`Self::full_env_name`]: strips the regime's prefix when
    /// present. Aliases resolve to their environment first, so `"demo"` can come
    /// back as `"pubdemo"`.
    pub fn short_env_name(&self, envname: &str) -> String {
        match self {
            NamingRegistry::Legacy(r) => r.short_env_name(envname),
            NamingRegistry::Orchestrated(r) => r.short_env_name(envname),
        }
    }

    /// True if the two tokens name the same environment, modulo aliasing and
    /// prefix expansion.
    pub fn env_equals(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let canon = |n: &str| match self {
            NamingRegistry::Legacy(r) => r.full_env_name(n).unwrap_or_else(|_| n.to_string()),
            NamingRegistry::Orchestrated(r) => {
                r.full_env_name(n).unwrap_or_else(|_| n.to_string())
            }
        };
        canon(a) == canon(b)
    }

    /// The table of public aliases and their URLs for the ecosystem the given
    /// name resides in.
    pub fn public_url_mappings(&self, envname: &str) -> BTreeMap<String, String> {
        match self {
            NamingRegistry::Legacy(r) => r.public_url_mappings(envname),
            NamingRegistry::Orchestrated(r) => r.public_url_mappings(),
        }
    }

    /// The URL actually serving the given env: its declared public URL when one
    /// exists, otherwise the conventional development-domain form.
    pub fn get_env_real_url(&self, envname: &str) -> String {
        match self {
            NamingRegistry::Legacy(r) => r.get_env_real_url(envname),
            NamingRegistry::Orchestrated(r) => r.get_env_real_url(envname),
        }
    }

    /// Which data set to load into the environment. Production-class environments
    /// are always `"prod"`; others consult the declared dev table, then `default`.
    pub fn data_set_for_env(&self, envname: &str, default: Option<&str>) -> Option<String> {
        if self.is_stg_or_prd_env(envname) {
            return Some("prod".to_string());
        }
        let declared = match self {
            NamingRegistry::Legacy(r) => r.dev_data_set(envname),
            NamingRegistry::Orchestrated(r) => r.dev_data_set(envname),
        };
        declared.or_else(|| default.map(String::from))
    }

    /// The source repository that deploys to the given env.
    pub fn infer_repo_from_env(&self, envname: &str) -> Option<&'static str> {
        if envname.is_empty() {
            None
        } else if self.is_cgap_env(envname) {
            Some("cgap-portal")
        } else if self.is_fourfront_env(envname) {
            Some("fourfront")
        } else {
            None
        }
    }

    /// The name Foursight uses for the given env: its public alias when one is
    /// declared, otherwise its short name.
    pub fn foursight_env_name(&self, envname: &str) -> String {
        match self {
            NamingRegistry::Legacy(r) => r.foursight_env_name(envname),
            NamingRegistry::Orchestrated(r) => r.foursight_env_name(envname),
        }
    }

    /// Infers the Foursight environment from an env name and, in the legacy
    /// regime, the request domain (needed there to split `data` from `staging`).
    ///
    /// Known limitation, carried forward from the original conventions: the legacy
    /// branch classifies by the `cgap` substring, so a CGAP-coincidental hostname
    /// could misclassify. The intended behavior for that case was never specified.
    pub fn infer_foursight_from_env(&self, domain: Option<&str>, envname: &str) -> String {
        match self {
            NamingRegistry::Legacy(r) => r.infer_foursight_from_env(domain, envname),
            NamingRegistry::Orchestrated(r) => r.foursight_env_name(envname),
        }
    }

    /// The Foursight URL for the given env, when the regime declares a Foursight
    /// URL prefix. The legacy regime never declared one, so it yields `None`.
    pub fn infer_foursight_url_from_env(
        &self,
        domain: Option<&str>,
        envname: &str,
    ) -> Option<String> {
        match self {
            NamingRegistry::Legacy(_) => None,
            NamingRegistry::Orchestrated(r) => r
                .foursight_url_prefix()
                .map(|prefix| format!("{}{}", prefix, self.infer_foursight_from_env(domain, envname))),
        }
    }

    /// True if the string looks like a CGAP server name.
    pub fn is_cgap_server(&self, server: &str, allow_localhost: bool) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_cgap_server(server, allow_localhost),
            // An orchestrated ecosystem serves exactly one app, so every server
            // in it is (or is not) a CGAP server wholesale.
            NamingRegistry::Orchestrated(r) => r.app() == PortalApp::Cgap,
        }
    }

    /// True if the string looks like a Fourfront server name.
    pub fn is_fourfront_server(&self, server: &str, allow_localhost: bool) -> bool {
        match self {
            NamingRegistry::Legacy(r) => r.is_fourfront_server(server, allow_localhost),
            NamingRegistry::Orchestrated(r) => r.app() == PortalApp::Fourfront,
        }
    }

    /// Whether staging/production mirroring is in effect for this regime.
    pub fn mirroring_enabled(&self) -> bool {
        match self {
            NamingRegistry::Legacy(_) => true,
            NamingRegistry::Orchestrated(r) => r.mirroring_enabled(),
        }
    }

    /// Classifies a server URL against the active ecosystem.
    ///
    /// With `raise_error` true, an unrecognizable URL is an error; otherwise a
    /// sentinel "unknown" classification is returned.
    pub fn classify_server_url(
        &self,
        url: &str,
        raise_error: bool,
    ) -> Result<ServerClassification> {
        match self {
            NamingRegistry::Legacy(r) => r.classify_server_url(url, raise_error),
            NamingRegistry::Orchestrated(r) => r.classify_server_url(url, raise_error),
        }
    }
}

/// Given a blue envname, returns its green counterpart, or vice versa. This is
/// purely syntactic; for other envnames that aren't blue/green participants it
/// returns `None`. A name containing both substrings is malformed rather than
/// simply unmirrored, and errors.
pub fn blue_green_mirror_env(envname: &str) -> Result<Option<String>> {
    let has_blue = envname.contains("blue");
    let has_green = envname.contains("green");
    ensure!(
        !(has_blue && has_green),
        error::AmbiguousBlueGreen { envname }
    );
    if has_blue {
        Ok(Some(envname.replace("blue", "green")))
    } else if has_green {
        Ok(Some(envname.replace("green", "blue")))
    } else {
        Ok(None)
    }
}

/// Deployment-context settings that name the current env and its mirror, as an
/// application's ini file would declare them.
#[derive(Debug, Clone, Default)]
pub struct ContextSettings {
    /// The declared `env.name`.
    pub env_name: Option<String>,
    /// The declared `mirror.env.name`.
    pub mirror_env_name: Option<String>,
}

/// Figures out who the mirror env is, if applicable. An explicit
/// `MIRROR_ENV_NAME` environment variable wins (when `allow_environ`), then a
/// declared `mirror.env.name`, then a guess from the standard mirror table (when
/// `allow_guess`). When the regime has mirroring disabled there is no mirror,
/// whatever the declarations say.
pub fn mirror_env_from_context(
    registry: &NamingRegistry,
    settings: &ContextSettings,
    allow_environ: bool,
    allow_guess: bool,
) -> Option<String> {
    if !registry.mirroring_enabled() {
        return None;
    }
    if allow_environ {
        if let Ok(name) = std::env::var("MIRROR_ENV_NAME") {
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    if let Some(declared) = settings.mirror_env_name.as_deref() {
        if !declared.is_empty() {
            return Some(declared.to_string());
        }
    }
    if !allow_guess {
        return None;
    }
    let who_i_am = if allow_environ {
        std::env::var("ENV_NAME")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| settings.env_name.clone())
    } else {
        settings.env_name.clone()
    };
    who_i_am.and_then(|env| registry.get_standard_mirror_env(&env))
}
