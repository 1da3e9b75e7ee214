//! Contains the error type for this library.

#![allow(clippy::default_trait_access)]

use snafu::{Backtrace, Snafu};
/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for this library.
///
/// Every failure mode of environment resolution is a distinct variant, so callers
/// can tell a misconfiguration (two synonymous variables disagreeing, a conflicting
/// bucket name) from a malformed name (both "blue" and "green" present) without
/// string matching. Nothing here is retried internally; each error is raised
/// synchronously to the immediate caller.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    // An environment name contains both "blue" and "green", so its mirror is ambiguous
    #[snafu(display(
        "The environment name {} contains both 'blue' and 'green', so its mirror is ambiguous",
        envname
    ))]
    AmbiguousBlueGreen { envname: String },

    // A declared ecosystem description is not valid JSON for the expected shape
    #[snafu(display("Could not parse declared environment data: {}", source))]
    BadDeclaredData {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    // No env was named and the global env bucket does not hold exactly one
    #[snafu(display(
        "Too many or too few keys were found in the global env bucket, {}, for a particular env to be inferred: {:?}",
        global_bucket,
        keys
    ))]
    CannotInferEnvFromManyGlobalEnvs {
        global_bucket: String,
        keys: Vec<String>,
    },

    // A config object could not be loaded from the global env bucket
    #[snafu(display(
        "Could not load config from bucket {} key {}: {}",
        env_bucket,
        config_key,
        source
    ))]
    DeclaredDataLoad {
        env_bucket: String,
        config_key: String,
        source: crate::Error,
    },

    // The application failed to list or fetch keys in the global env bucket
    #[snafu(display("Failed to access global env bucket {}: {}", global_bucket, source))]
    EnvBucketAccess {
        global_bucket: String,
        source: crate::Error,
    },

    // The application failed to fetch or decode a portal health page
    #[snafu(display("Failed to fetch health page for {}: {}", portal_url, source))]
    HealthPageFetch {
        portal_url: String,
        source: crate::Error,
    },

    // A caller-specified bucket name conflicts with the health-page-derived value
    #[snafu(display(
        "Specified {} bucket, {}, and {} bucket inferred from health page, {}, do not match",
        kind,
        specified,
        kind,
        inferred
    ))]
    InferredBucketConflict {
        kind: &'static str,
        specified: String,
        inferred: String,
    },

    // An environment descriptor in the global env bucket lacks a required key
    #[snafu(display(
        "Missing {:?} or {:?} key in global_env {}",
        legacy_key,
        key,
        description
    ))]
    MissingDescriptionKey {
        legacy_key: &'static str,
        key: &'static str,
        description: String,
    },

    // Bucket names cannot be derived with no global env bucket, no env, and no explicit buckets
    #[snafu(display(
        "Cannot derive bucket names: no global env bucket is configured and no env or explicit bucket names were given"
    ))]
    MissingEnvironment,

    // A named env is not among the keys of the global env bucket
    #[snafu(display(
        "No matches for global env bucket: {}; keys: {:?}; desired env: {}",
        global_bucket,
        keys,
        env
    ))]
    MissingGlobalEnv {
        global_bucket: String,
        keys: Vec<String>,
        env: String,
    },

    // The portal's health page lacks a key this resolution step needs
    #[snafu(display(
        "Missing {:?} key in health page for {}",
        key,
        portal_url
    ))]
    MissingHealthPageKey {
        key: &'static str,
        portal_url: String,
    },

    // A special public alias was used where a concrete environment name is required
    #[snafu(display(
        "The special token '{}' is not a beanstalk environment name",
        envname
    ))]
    SpecialTokenNotAnEnv { envname: String },

    // Two spellings of the same configuration variable disagree
    #[snafu(display(
        "The environment variables {} and {} are synonyms but have inconsistent values: \
         If you supply values for both, they must be the same value. \
         You supplied: {}={:?} {}={:?}",
        var1,
        var2,
        var1,
        val1,
        var2,
        val2
    ))]
    SynonymousEnvironmentVariablesMismatched {
        var1: &'static str,
        val1: String,
        var2: &'static str,
        val2: String,
    },

    // A server URL could not be classified as belonging to a known ecosystem
    #[snafu(display("{} is not a {} server", url, app))]
    UnknownServerUrl { url: String, app: String },

    // A full env name was requested for a name lexically outside that ecosystem
    #[snafu(display("The envname {} is not a {} env name", envname, app))]
    WrongAppEnv { envname: String, app: String },
}
