//! The historical Fourfront/CGAP ElasticBeanstalk naming conventions.
//!
//! Everything here is a hard-coded table or a substring test on the well-known
//! names. The tables deliberately include retired spellings (`fourfront-webprod`,
//! the `cgap-*` renames) because stored references to them still exist.

use crate::envs::{ServerClassification, ServerKind};
use crate::error::{self, Result};
use snafu::ensure;
use std::collections::BTreeMap;
use url::Url;

pub(crate) const FF_ENV_HOTSEAT: &str = "fourfront-hotseat";
pub(crate) const FF_ENV_MASTERTEST: &str = "fourfront-mastertest";
pub(crate) const FF_ENV_PRODUCTION_BLUE: &str = "fourfront-blue";
pub(crate) const FF_ENV_PRODUCTION_GREEN: &str = "fourfront-green";
pub(crate) const FF_ENV_WEBDEV: &str = "fourfront-webdev";
pub(crate) const FF_ENV_WEBPROD: &str = "fourfront-webprod";
pub(crate) const FF_ENV_WEBPROD2: &str = "fourfront-webprod2";
pub(crate) const FF_ENV_WOLF: &str = "fourfront-wolf";
pub(crate) const FF_ENV_INDEXER: &str = "fourfront-indexer";

pub(crate) const CGAP_ENV_HOTSEAT: &str = "fourfront-cgaphotseat";
pub(crate) const CGAP_ENV_MASTERTEST: &str = "fourfront-cgaptest";
pub(crate) const CGAP_ENV_PRODUCTION_BLUE: &str = "fourfront-cgap-blue";
pub(crate) const CGAP_ENV_PRODUCTION_GREEN: &str = "fourfront-cgap-green";
pub(crate) const CGAP_ENV_WEBDEV: &str = "fourfront-cgapwebdev";
pub(crate) const CGAP_ENV_WEBPROD: &str = "fourfront-cgap";
pub(crate) const CGAP_ENV_WOLF: &str = "fourfront-cgapwolf";
pub(crate) const CGAP_ENV_INDEXER: &str = "cgap-indexer";

// Renamed spellings from the (never-completed) migration off the fourfront- prefix.
pub(crate) const CGAP_ENV_HOTSEAT_NEW: &str = "cgap-hotseat";
pub(crate) const CGAP_ENV_MASTERTEST_NEW: &str = "cgap-test";
pub(crate) const CGAP_ENV_PRODUCTION_BLUE_NEW: &str = "cgap-blue";
pub(crate) const CGAP_ENV_PRODUCTION_GREEN_NEW: &str = "cgap-green";
pub(crate) const CGAP_ENV_WEBDEV_NEW: &str = "cgap-webdev";
pub(crate) const CGAP_ENV_WOLF_NEW: &str = "cgap-wolf";

/// The env whose buckets all Fourfront production-class envs share.
pub(crate) const FF_PROD_BUCKET_ENV: &str = FF_ENV_WEBPROD;
/// The env whose buckets all CGAP production-class envs share.
pub(crate) const CGAP_PROD_BUCKET_ENV: &str = CGAP_ENV_WEBPROD;

// Any of these appearing in a Fourfront envname means stg or prd.
const FOURFRONT_STG_OR_PRD_TOKENS: &[&str] = &["webprod", "blue", "green"];
// 'stagging' is a typo that got deployed once and must stay recognized.
const FOURFRONT_STG_OR_PRD_NAMES: &[&str] = &["staging", "stagging", "data"];

// CGAP classifies by exact name only.
const CGAP_STG_OR_PRD_TOKENS: &[&str] = &[];
const CGAP_STG_OR_PRD_NAMES: &[&str] = &[
    CGAP_ENV_WEBPROD,
    CGAP_ENV_PRODUCTION_GREEN,
    CGAP_ENV_PRODUCTION_BLUE,
    CGAP_ENV_PRODUCTION_GREEN_NEW,
    CGAP_ENV_PRODUCTION_BLUE_NEW,
    "cgap",
];

const FF_PUBLIC_URL_STG: &str = "http://staging.4dnucleome.org";
const FF_PUBLIC_URL_PRD: &str = "https://data.4dnucleome.org";
const FF_PUBLIC_DOMAIN_STG: &str = "staging.4dnucleome.org";
const FF_PUBLIC_DOMAIN_PRD: &str = "data.4dnucleome.org";
const FF_PRODUCTION_IDENTIFIER: &str = "data";
const FF_STAGING_IDENTIFIER: &str = "staging";

const CGAP_PUBLIC_URL_STG: &str = "https://staging.cgap.hms.harvard.edu";
const CGAP_PUBLIC_URL_PRD: &str = "https://cgap.hms.harvard.edu";

const FF_PUBLIC_URLS: &[(&str, &str)] = &[
    ("staging", FF_PUBLIC_URL_STG),
    ("data", FF_PUBLIC_URL_PRD),
];

const CGAP_PUBLIC_URLS: &[(&str, &str)] = &[
    ("cgap", CGAP_PUBLIC_URL_PRD),
    ("data", CGAP_PUBLIC_URL_PRD),
    ("staging", CGAP_PUBLIC_URL_STG),
];

const BEANSTALK_PROD_BUCKET_ENVS: &[(&str, &str)] = &[
    ("staging", FF_PROD_BUCKET_ENV),
    ("data", FF_PROD_BUCKET_ENV),
    (FF_ENV_WEBPROD, FF_PROD_BUCKET_ENV),
    (FF_ENV_WEBPROD2, FF_PROD_BUCKET_ENV),
    (FF_ENV_PRODUCTION_BLUE, FF_PROD_BUCKET_ENV),
    (FF_ENV_PRODUCTION_GREEN, FF_PROD_BUCKET_ENV),
    ("cgap", CGAP_PROD_BUCKET_ENV),
    (CGAP_ENV_PRODUCTION_BLUE, CGAP_PROD_BUCKET_ENV),
    (CGAP_ENV_PRODUCTION_GREEN, CGAP_PROD_BUCKET_ENV),
    (CGAP_ENV_WEBPROD, CGAP_PROD_BUCKET_ENV),
    (CGAP_ENV_PRODUCTION_BLUE_NEW, CGAP_PROD_BUCKET_ENV),
    (CGAP_ENV_PRODUCTION_GREEN_NEW, CGAP_PROD_BUCKET_ENV),
];

// CGAP webprod maps to None: it has no mirror, and that is a declared fact,
// distinct from a name simply being absent from the table.
const BEANSTALK_PROD_MIRRORS: &[(&str, Option<&str>)] = &[
    (FF_ENV_PRODUCTION_BLUE, Some(FF_ENV_PRODUCTION_GREEN)),
    (FF_ENV_PRODUCTION_GREEN, Some(FF_ENV_PRODUCTION_BLUE)),
    (FF_ENV_WEBPROD, Some(FF_ENV_WEBPROD2)),
    (FF_ENV_WEBPROD2, Some(FF_ENV_WEBPROD)),
    ("staging", Some("data")),
    ("data", Some("staging")),
    (CGAP_ENV_PRODUCTION_BLUE, Some(CGAP_ENV_PRODUCTION_GREEN)),
    (CGAP_ENV_PRODUCTION_GREEN, Some(CGAP_ENV_PRODUCTION_BLUE)),
    (CGAP_ENV_WEBPROD, None),
    (CGAP_ENV_PRODUCTION_BLUE_NEW, Some(CGAP_ENV_PRODUCTION_GREEN_NEW)),
    (CGAP_ENV_PRODUCTION_GREEN_NEW, Some(CGAP_ENV_PRODUCTION_BLUE_NEW)),
    ("cgap", None),
];

const BEANSTALK_TEST_ENVS: &[&str] = &[
    FF_ENV_HOTSEAT,
    FF_ENV_MASTERTEST,
    FF_ENV_WEBDEV,
    FF_ENV_WOLF,
    CGAP_ENV_HOTSEAT,
    CGAP_ENV_MASTERTEST,
    CGAP_ENV_WEBDEV,
    CGAP_ENV_WOLF,
    CGAP_ENV_HOTSEAT_NEW,
    CGAP_ENV_MASTERTEST_NEW,
    CGAP_ENV_WEBDEV_NEW,
    CGAP_ENV_WOLF_NEW,
];

const BEANSTALK_DEV_DATA_SETS: &[(&str, &str)] = &[
    ("fourfront-hotseat", "prod"),
    ("fourfront-mastertest", "test"),
    ("fourfront-webdev", "prod"),
    ("fourfront-cgapdev", "test"),
    ("fourfront-cgaptest", "prod"),
    ("fourfront-cgapwolf", "prod"),
    ("cgap-dev", "test"),
    ("cgap-test", "prod"),
    ("cgap-wolf", "prod"),
];

// Shared domain suffix of the legacy beanstalk deployments.
const BEANSTALK_DOMAIN_SUFFIX: &str = ".9wzadzju3p.us-east-1.elasticbeanstalk.com";

const FULL_ENV_PREFIX: &str = "fourfront-";

fn lookup<'a>(table: &'a [(&str, &str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// The hard-coded legacy naming tables. Stateless; every method is a pure
/// function of its arguments.
#[derive(Debug, Clone, Default)]
pub struct LegacyRegistry;

impl LegacyRegistry {
    pub fn new() -> Self {
        LegacyRegistry
    }

    // In the legacy world "cgap" anywhere in the name means CGAP, and Fourfront
    // is everything else that mentions fourfront.
    pub(crate) fn is_cgap_env(&self, envname: &str) -> bool {
        !envname.is_empty() && envname.contains("cgap")
    }

    pub(crate) fn is_fourfront_env(&self, envname: &str) -> bool {
        !envname.is_empty() && envname.contains("fourfront") && !envname.contains("cgap")
    }

    pub(crate) fn is_stg_or_prd_env(&self, envname: &str) -> bool {
        if envname.is_empty() {
            return false;
        }
        let (tokens, names) = if self.is_cgap_env(envname) {
            (CGAP_STG_OR_PRD_TOKENS, CGAP_STG_OR_PRD_NAMES)
        } else {
            (FOURFRONT_STG_OR_PRD_TOKENS, FOURFRONT_STG_OR_PRD_NAMES)
        };
        names.contains(&envname) || tokens.iter().any(|token| envname.contains(token))
    }

    pub(crate) fn is_test_env(&self, envname: &str) -> bool {
        BEANSTALK_TEST_ENVS.contains(&envname)
    }

    pub(crate) fn is_hotseat_env(&self, envname: &str) -> bool {
        !envname.is_empty() && envname.contains("hot")
    }

    pub(crate) fn is_indexer_env(&self, envname: &str) -> bool {
        envname == FF_ENV_INDEXER || envname == CGAP_ENV_INDEXER
    }

    pub(crate) fn indexer_env_for_env(&self, envname: &str) -> Option<String> {
        if self.is_fourfront_env(envname) && envname != FF_ENV_INDEXER {
            Some(FF_ENV_INDEXER.to_string())
        } else if self.is_cgap_env(envname) && envname != CGAP_ENV_INDEXER {
            Some(CGAP_ENV_INDEXER.to_string())
        } else {
            None
        }
    }

    pub(crate) fn get_standard_mirror_env(&self, envname: &str) -> Option<String> {
        BEANSTALK_PROD_MIRRORS
            .iter()
            .find(|(k, _)| *k == envname)
            .and_then(|(_, v)| v.map(String::from))
    }

    pub(crate) fn prod_bucket_env(&self, envname: &str) -> Option<String> {
        lookup(BEANSTALK_PROD_BUCKET_ENVS, envname).map(String::from)
    }

    pub(crate) fn dev_data_set(&self, envname: &str) -> Option<String> {
        lookup(BEANSTALK_DEV_DATA_SETS, envname).map(String::from)
    }

    pub(crate) fn full_env_name(&self, envname: &str) -> Result<String> {
        ensure!(
            envname != "data" && envname != "staging",
            error::SpecialTokenNotAnEnv { envname }
        );
        if envname.starts_with(FULL_ENV_PREFIX) {
            Ok(envname.to_string())
        } else {
            Ok(format!("{}{}", FULL_ENV_PREFIX, envname))
        }
    }

    pub(crate) fn full_cgap_env_name(&self, envname: &str) -> Result<String> {
        ensure!(
            envname.contains("cgap"),
            error::WrongAppEnv {
                envname,
                app: "CGAP"
            }
        );
        self.full_env_name(envname)
    }

    pub(crate) fn full_fourfront_env_name(&self, envname: &str) -> Result<String> {
        ensure!(
            !envname.contains("cgap"),
            error::WrongAppEnv {
                envname,
                app: "Fourfront"
            }
        );
        self.full_env_name(envname)
    }

    pub(crate) fn short_env_name(&self, envname: &str) -> String {
        envname
            .strip_prefix(FULL_ENV_PREFIX)
            .unwrap_or(envname)
            .to_string()
    }

    /// The public URL table for the ecosystem the name resides in. CGAP names get
    /// the CGAP table; everything else, the Fourfront one.
    pub(crate) fn public_url_mappings(&self, envname: &str) -> BTreeMap<String, String> {
        let table = if self.is_cgap_env(envname) {
            CGAP_PUBLIC_URLS
        } else {
            FF_PUBLIC_URLS
        };
        table
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// The declared public URL when the name is a public alias; otherwise the
    /// conventional beanstalk domain for the deployment. Blue/green production
    /// names also get the beanstalk form, since which of them backs the public
    /// URL at any moment is a deployment fact, not a naming fact.
    pub(crate) fn get_env_real_url(&self, envname: &str) -> String {
        if let Some(url) = lookup(
            if self.is_cgap_env(envname) {
                CGAP_PUBLIC_URLS
            } else {
                FF_PUBLIC_URLS
            },
            envname,
        ) {
            return url.to_string();
        }
        let full = self
            .full_env_name(envname)
            .unwrap_or_else(|_| envname.to_string());
        format!("http://{}{}", full, BEANSTALK_DOMAIN_SUFFIX)
    }

    pub(crate) fn foursight_env_name(&self, envname: &str) -> String {
        self.infer_foursight_from_env(None, envname)
    }

    /// Infers the Foursight env token from an env name and the request domain.
    /// Legacy Foursight needs the domain to split `data` from `staging`, since
    /// blue and green swap behind those URLs.
    pub(crate) fn infer_foursight_from_env(&self, domain: Option<&str>, envname: &str) -> String {
        if self.is_cgap_env(envname) {
            // All the original CGAP envs were 'fourfront-'-prefixed, so Foursight
            // tokens were formed by slicing that prefix off unconditionally. The
            // renamed 'cgap-*' envs get mangled by this; the behavior is kept
            // because Foursight deployments still depend on the mangled tokens.
            envname.get(FULL_ENV_PREFIX.len()..).unwrap_or("").to_string()
        } else if self.is_stg_or_prd_env(envname) {
            match domain {
                Some(d) if d.contains(FF_PUBLIC_DOMAIN_PRD) => {
                    FF_PRODUCTION_IDENTIFIER.to_string()
                }
                _ => FF_STAGING_IDENTIFIER.to_string(),
            }
        } else {
            envname.get(FULL_ENV_PREFIX.len()..).unwrap_or("").to_string()
        }
    }

    pub(crate) fn is_cgap_server(&self, server: &str, allow_localhost: bool) -> bool {
        server.contains("cgap") || (allow_localhost && server.contains("localhost"))
    }

    pub(crate) fn is_fourfront_server(&self, server: &str, allow_localhost: bool) -> bool {
        ((server.contains("fourfront") || server.contains("4dnucleome"))
            && !self.is_cgap_server(server, false))
            || (allow_localhost && server.contains("localhost"))
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
        // The part before the first dot, which for beanstalk URLs is the env name.
        let hostname1 = hostname.split('.').next().unwrap_or("").to_string();

        let environment = self.bucket_env_for(&hostname1);
        let is_stg_or_prd = self.is_stg_or_prd_env(&hostname1);
        let public_name = self.public_alias_for_host(&hostname);

        let kind = if hostname1 == "localhost" || hostname == "127.0.0.1" {
            ServerKind::Localhost
        } else if hostname1.contains("cgap") {
            ServerKind::Cgap
        } else if is_stg_or_prd || hostname1.contains("fourfront-") {
            ServerKind::Fourfront
        } else {
            ensure!(
                !raise_error,
                error::UnknownServerUrl {
                    url,
                    app: "Fourfront or CGAP"
                }
            );
            ServerKind::Unknown
        };

        if kind == ServerKind::Localhost || kind == ServerKind::Unknown {
            return Ok(ServerClassification::unknown(kind));
        }
        Ok(ServerClassification {
            kind,
            environment: environment.clone(),
            bucket_env: environment,
            server_env: hostname1,
            is_stg_or_prd,
            public_name,
        })
    }

    fn bucket_env_for(&self, envname: &str) -> String {
        if self.is_stg_or_prd_env(envname) {
            self.prod_bucket_env(envname)
                .unwrap_or_else(|| envname.to_string())
        } else {
            envname.to_string()
        }
    }

    fn public_alias_for_host(&self, hostname: &str) -> Option<String> {
        match hostname {
            FF_PUBLIC_DOMAIN_PRD => Some("data".to_string()),
            FF_PUBLIC_DOMAIN_STG => Some("staging".to_string()),
            "cgap.hms.harvard.edu" => Some("cgap".to_string()),
            "staging.cgap.hms.harvard.edu" => Some("staging".to_string()),
            _ => None,
        }
    }
}
