//! Derivation of the S3 bucket set backing a portal environment.
//!
//! Bucket names are resolved one of three ways, tried in this order:
//!
//! 1. A global env bucket is configured: the env's config object names the
//!    portal, and the portal's health page is the authority on bucket names.
//!    Explicitly supplied names are allowed but must agree with the health page.
//! 2. No global env bucket but an env name is given: names are built from the
//!    historical `elasticbeanstalk-<env>-<suffix>` templates, after collapsing
//!    staging/production envs onto their shared bucket env.
//! 3. Explicit bucket names only: taken verbatim, no inference of any kind.
//!
//! The tibanna buckets are deployment-wide rather than per-env, so the template
//! path gives them constant names.

use crate::env_manager::EnvManager;
use crate::envs::NamingRegistry;
use crate::error::{self, Result};
use crate::{EnvBucketMediator, HealthMediator};
use log::warn;
use snafu::{ensure, OptionExt, ResultExt};

const EB_PREFIX: &str = "elasticbeanstalk-";

const SYS_BUCKET_SUFFIX: &str = "system";
const OUTFILE_BUCKET_SUFFIX: &str = "wfoutput";
const RAW_BUCKET_SUFFIX: &str = "files";
const BLOB_BUCKET_SUFFIX: &str = "blobs";
const METADATA_BUCKET_SUFFIX: &str = "metadata-bundles";

// Env-independent names.
const TIBANNA_OUTPUT_BUCKET: &str = "tibanna-output";
const TIBANNA_CWLS_BUCKET: &str = "tibanna-cwls";

/// Caller-supplied bucket names. In the health-page path these are checked
/// against the inferred names; in the explicit path they are the whole answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketOverrides {
    pub sys_bucket: Option<String>,
    pub outfile_bucket: Option<String>,
    pub raw_file_bucket: Option<String>,
    pub blob_bucket: Option<String>,
    pub metadata_bucket: Option<String>,
    pub tibanna_cwls_bucket: Option<String>,
    pub tibanna_output_bucket: Option<String>,
}

/// The resolved bucket set for one environment. Fields are optional because the
/// explicit construction path names only the buckets the caller cares about;
/// the resolving paths fill in everything they can.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalBuckets {
    pub sys_bucket: Option<String>,
    pub outfile_bucket: Option<String>,
    pub raw_file_bucket: Option<String>,
    pub blob_bucket: Option<String>,
    pub metadata_bucket: Option<String>,
    pub tibanna_cwls_bucket: Option<String>,
    pub tibanna_output_bucket: Option<String>,
    pub s3_encrypt_key_id: Option<String>,
    /// The resolved environment identity, when a resolving path was taken.
    pub env_manager: Option<EnvManager>,
}

impl PortalBuckets {
    /// Resolves a bucket set, choosing among the three construction paths the
    /// way the portals always have: an explicit `sys_bucket` short-circuits all
    /// inference, then the global env bucket is consulted, then the templates.
    /// With none of a global env bucket, an env name, or explicit buckets there
    /// is nothing to derive names from, which is an error.
    pub async fn resolve(
        s3: &impl EnvBucketMediator,
        health: &impl HealthMediator,
        registry: &NamingRegistry,
        global_bucket: Option<&str>,
        env: Option<&str>,
        overrides: &BucketOverrides,
    ) -> Result<Self> {
        if overrides.sys_bucket.is_some() {
            return Ok(Self::from_explicit(overrides));
        }
        if let Some(global_bucket) = global_bucket {
            Self::from_global_env_bucket(s3, health, registry, global_bucket, env, overrides).await
        } else if let Some(env) = env {
            Self::from_env(health, registry, env).await
        } else {
            error::MissingEnvironment.fail()
        }
    }

    /// Path 1: resolve the env through the global env bucket and take bucket
    /// names from the portal's health page. Overridden names must match.
    pub async fn from_global_env_bucket(
        s3: &impl EnvBucketMediator,
        health: &impl HealthMediator,
        registry: &NamingRegistry,
        global_bucket: &str,
        env: Option<&str>,
        overrides: &BucketOverrides,
    ) -> Result<Self> {
        let env_manager =
            EnvManager::verify_and_get_env_config(s3, registry, global_bucket, env).await?;
        let page = env_manager.fetch_health_page(health).await?;
        let buckets = PortalBuckets {
            sys_bucket: Some(page.system_bucket.clone()),
            outfile_bucket: reconcile(
                "outfile",
                overrides.outfile_bucket.as_ref(),
                Some(page.processed_file_bucket.clone()),
            )?,
            raw_file_bucket: reconcile(
                "raw file",
                overrides.raw_file_bucket.as_ref(),
                Some(page.file_upload_bucket.clone()),
            )?,
            blob_bucket: reconcile(
                "blob",
                overrides.blob_bucket.as_ref(),
                Some(page.blob_bucket.clone()),
            )?,
            metadata_bucket: reconcile(
                "metadata",
                overrides.metadata_bucket.as_ref(),
                page.metadata_bundles_bucket.clone(),
            )?,
            tibanna_cwls_bucket: reconcile(
                "tibanna cwls",
                overrides.tibanna_cwls_bucket.as_ref(),
                page.tibanna_cwls_bucket.clone(),
            )?,
            tibanna_output_bucket: reconcile(
                "tibanna output",
                overrides.tibanna_output_bucket.as_ref(),
                page.tibanna_output_bucket.clone(),
            )?,
            s3_encrypt_key_id: page.s3_encrypt_key_id,
            env_manager: Some(env_manager),
        };
        warn!("Buckets resolved successfully.");
        Ok(buckets)
    }

    /// Path 2: no global env bucket, so bucket names come from the templates.
    /// Staging and production collapse to the shared bucket env first; anything
    /// else gets its full name. The portal health page is still consulted for
    /// the Elasticsearch URL and encryption key id.
    pub async fn from_env(
        health: &impl HealthMediator,
        registry: &NamingRegistry,
        env: &str,
    ) -> Result<Self> {
        // The real URL must be looked up before stg/prd blurring, while the
        // name still identifies the concrete deployment.
        let (bucket_env, url) = if registry.is_stg_or_prd_env(env) {
            let url = registry.get_env_real_url(env);
            let bucket_env = registry
                .prod_bucket_env(env)
                .unwrap_or_else(|| env.to_string());
            (bucket_env, url)
        } else {
            let full = registry.full_env_name(env)?;
            let url = registry.get_env_real_url(&full);
            (full, url)
        };

        let page = health
            .fetch_health_page(&url)
            .await
            .context(error::HealthPageFetch {
                portal_url: url.as_str(),
            })?;
        let es_raw = page
            .elasticsearch
            .clone()
            .context(error::MissingHealthPageKey {
                key: "elasticsearch",
                portal_url: url.as_str(),
            })?;
        let es_url = normalize_es_url(&es_raw);
        let env_manager = EnvManager::compose(&url, &es_url, &bucket_env);

        Ok(PortalBuckets {
            sys_bucket: Some(template(&bucket_env, SYS_BUCKET_SUFFIX)),
            outfile_bucket: Some(template(&bucket_env, OUTFILE_BUCKET_SUFFIX)),
            raw_file_bucket: Some(template(&bucket_env, RAW_BUCKET_SUFFIX)),
            blob_bucket: Some(template(&bucket_env, BLOB_BUCKET_SUFFIX)),
            metadata_bucket: Some(template(&bucket_env, METADATA_BUCKET_SUFFIX)),
            tibanna_cwls_bucket: Some(TIBANNA_CWLS_BUCKET.to_string()),
            tibanna_output_bucket: Some(TIBANNA_OUTPUT_BUCKET.to_string()),
            s3_encrypt_key_id: page.s3_encrypt_key_id,
            env_manager: Some(env_manager),
        })
    }

    /// Path 3: the caller knows the names; no inference, no network.
    pub fn from_explicit(overrides: &BucketOverrides) -> Self {
        PortalBuckets {
            sys_bucket: overrides.sys_bucket.clone(),
            outfile_bucket: overrides.outfile_bucket.clone(),
            raw_file_bucket: overrides.raw_file_bucket.clone(),
            blob_bucket: overrides.blob_bucket.clone(),
            metadata_bucket: overrides.metadata_bucket.clone(),
            tibanna_cwls_bucket: overrides.tibanna_cwls_bucket.clone(),
            tibanna_output_bucket: overrides.tibanna_output_bucket.clone(),
            s3_encrypt_key_id: None,
            env_manager: None,
        }
    }
}

/// The conventional bucket name for an env and suffix.
pub fn template(env: &str, suffix: &str) -> String {
    format!("{}{}-{}", EB_PREFIX, env, suffix)
}

// A specified name must match the inferred one; with nothing inferred (the key
// is newer than some portals) the specified name stands.
fn reconcile(
    kind: &'static str,
    specified: Option<&String>,
    inferred: Option<String>,
) -> Result<Option<String>> {
    match (specified, inferred) {
        (Some(s), Some(i)) => {
            ensure!(
                *s == i,
                error::InferredBucketConflict {
                    kind,
                    specified: s.as_str(),
                    inferred: i.as_str(),
                }
            );
            Ok(Some(i))
        }
        (Some(s), None) => Ok(Some(s.clone())),
        (None, inferred) => Ok(inferred),
    }
}

fn normalize_es_url(es: &str) -> String {
    if es.starts_with("http") {
        es.to_string()
    } else {
        format!("https://{}", es)
    }
}
