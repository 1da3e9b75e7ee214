/*!
Environment-name resolution for the Fourfront/CGAP family of genomics portals.

A human-supplied "environment" token is ambiguous: it may be a public alias like
`data`, `staging` or `cgap`, a short name like `mastertest`, or a full deployment
name like `fourfront-cgapdev`. This library maps such a token onto a consistent set
of derived facts: the staging/production relationship, the public URL, the S3
bucket-naming convention, and the health-page-derived configuration.

Two naming regimes exist. The *legacy* regime hard-codes the historical
Fourfront/CGAP ElasticBeanstalk conventions; the *orchestrated* regime reads a
declarative ecosystem description (usually from the global env bucket) that
supports arbitrary name prefixes. Both are variants of [`NamingRegistry`], which is
passed explicitly to every predicate so that classification is a pure function of
(name, registry) with no hidden process-wide state.

We created a `lib.rs` so the resolution logic can be exercised from the `tests`
folder; the `portal-env-resolver` binary is a thin command-line veneer.
!*/

#![deny(rust_2018_idioms)]

mod aws;
pub mod buckets;
pub mod env_manager;
pub mod envs;
pub mod error;
pub mod health;

pub use crate::buckets::{BucketOverrides, PortalBuckets};
pub use crate::env_manager::EnvManager;
pub use crate::envs::{NamingRegistry, PortalApp, ServerClassification, ServerKind};
pub use crate::health::HealthPage;

use crate::aws::AwsEnvBucketMediator;
use crate::health::HttpHealthMediator;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use structopt::StructOpt;

/// An opaque error type to wrap more detailed error types. The inner type provides the message.
#[derive(Debug)]
pub struct Error(Box<dyn std::error::Error + Send + Sync + 'static>);
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new opaque error.
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(source.into())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

// implement std::error::Error to support Error type as source for snafu
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self)
    }
}

// the Args struct is defined in `lib.rs` so that we can use it in integration tests
/// Portal Environment Resolver
///
/// Resolves a Fourfront/CGAP environment token to its portal URL, Elasticsearch URL
/// and derived S3 bucket names, consulting the global env bucket and the deployed
/// instance's health page.
///
/// Arguments can be specified by environment variable. Command-line arguments will override a value
/// that is given by environment variable.
///
#[derive(StructOpt, Debug)]
pub struct Args {
    /// The environment name or alias to resolve. When the global env bucket declares
    /// exactly one environment this may be omitted and the one environment is inferred.
    #[structopt(long, env = "ENV_NAME")]
    pub env: Option<String>,
    /// The AWS Region in which the global env bucket lives
    #[structopt(long, env = "AWS_REGION")]
    pub region: String,
    /// The S3 bucket holding one JSON descriptor per environment name
    #[structopt(long, env = "GLOBAL_ENV_BUCKET")]
    pub global_env_bucket: Option<String>,
    /// The ecosystem declaration to load from the global env bucket
    #[structopt(long, default_value = "main")]
    pub ecosystem: String,
    /// Use the hard-coded legacy Fourfront/CGAP naming conventions instead of loading
    /// a declared ecosystem from the global env bucket
    #[structopt(long)]
    pub legacy: bool,
    /// How much detail to log
    #[structopt(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}

/// Creates a new concrete implementation of [`EnvBucketMediator`] using `rusoto`.
pub fn new_env_bucket_mediator(region: &str) -> Result<impl EnvBucketMediator> {
    Ok(AwsEnvBucketMediator::new(region)?)
}

/// Creates a new concrete implementation of [`HealthMediator`] using `reqwest`.
pub fn new_health_mediator() -> Result<impl HealthMediator> {
    HttpHealthMediator::new()
}

/// Introducing a trait abstraction over the S3 API allows us to mock the global env
/// bucket and write tests without going to the extremely low level of `rusoto_mock`.
/// That is, we can mock the higher level use-cases of what we might send and receive
/// to/from the API instead of mocking the API itself.
#[async_trait]
pub trait EnvBucketMediator {
    /// Lists every key in the given bucket.
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>>;

    /// Fetches one object from the bucket and JSON-decodes its body.
    async fn get_object_json(&self, bucket: &str, key: &str) -> Result<serde_json::Value>;
}

/// Trait abstraction over the portal health-page endpoint, mockable the same way as
/// [`EnvBucketMediator`].
#[async_trait]
pub trait HealthMediator {
    /// Fetches `<portal_url>/health?format=json` and decodes the body.
    async fn fetch_health_page(&self, portal_url: &str) -> Result<HealthPage>;
}
