
use mocks::{sample_health_page, MockEnvBucketMediator, MockHealthMediator};
use portal_env_resolver::buckets::{template, BucketOverrides, PortalBuckets};
use portal_env_resolver::envs::{NamingRegistry, OrchestratedRegistry};
use portal_env_resolver::error::Error;
use serde_json::json;

const GLOBAL_BUCKET: &str = "acme-foursight-envs";

#[test]
fn bucket_names_follow_the_beanstalk_template() {
    assert_eq!(
        template("fourfront-webprod", "files"),
        "elasticbeanstalk-fourfront-webprod-files"
    );
    assert_eq!(
        template("fourfront-mastertest", "system"),
        "elasticbeanstalk-fourfront-mastertest-system"
    );
}

#[tokio::test]
async fn explicit_sys_bucket_short_circuits_all_inference() {
    // The mocks would fail if anything touched the network paths.
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    let overrides = BucketOverrides {
        sys_bucket: Some("my-system".to_string()),
        outfile_bucket: Some("my-wfoutput".to_string()),
        ..BucketOverrides::default()
    };

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        Some(GLOBAL_BUCKET),
        Some("fourfront-mastertest"),
        &overrides,
    )
    .await
    .unwrap();

    assert_eq!(buckets.sys_bucket, Some("my-system".to_string()));
    assert_eq!(buckets.outfile_bucket, Some("my-wfoutput".to_string()));
    assert_eq!(buckets.raw_file_bucket, None);
    assert_eq!(buckets.env_manager, None);
}

#[tokio::test]
async fn nothing_to_derive_from_is_an_error() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();

    let err = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        None,
        None,
        &BucketOverrides::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::MissingEnvironment { .. }));
}

#[tokio::test]
async fn env_path_builds_templated_names() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    health
        .fetch_health_page
        .given("http://fourfront-mastertest.9wzadzju3p.us-east-1.elasticbeanstalk.com".to_string())
        .will_return(Ok(sample_health_page("fourfront-mastertest")));

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        None,
        Some("mastertest"),
        &BucketOverrides::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        buckets.sys_bucket,
        Some("elasticbeanstalk-fourfront-mastertest-system".to_string())
    );
    assert_eq!(
        buckets.outfile_bucket,
        Some("elasticbeanstalk-fourfront-mastertest-wfoutput".to_string())
    );
    assert_eq!(
        buckets.raw_file_bucket,
        Some("elasticbeanstalk-fourfront-mastertest-files".to_string())
    );
    assert_eq!(
        buckets.blob_bucket,
        Some("elasticbeanstalk-fourfront-mastertest-blobs".to_string())
    );
    assert_eq!(
        buckets.metadata_bucket,
        Some("elasticbeanstalk-fourfront-mastertest-metadata-bundles".to_string())
    );
    assert_eq!(buckets.tibanna_cwls_bucket, Some("tibanna-cwls".to_string()));
    assert_eq!(
        buckets.tibanna_output_bucket,
        Some("tibanna-output".to_string())
    );

    let env_manager = buckets.env_manager.unwrap();
    assert_eq!(env_manager.env_name(), "fourfront-mastertest");
    assert_eq!(
        env_manager.es_url(),
        "https://search-fourfront-mastertest.example.com:443"
    );
}

#[tokio::test]
async fn env_path_collapses_production_to_the_shared_bucket_env() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    // The public URL belongs to "data"; the buckets belong to fourfront-webprod.
    health
        .fetch_health_page
        .given("https://data.4dnucleome.org".to_string())
        .will_return(Ok(sample_health_page("fourfront-webprod")));

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        None,
        Some("data"),
        &BucketOverrides::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        buckets.sys_bucket,
        Some("elasticbeanstalk-fourfront-webprod-system".to_string())
    );
    let env_manager = buckets.env_manager.unwrap();
    assert_eq!(env_manager.env_name(), "fourfront-webprod");
    assert_eq!(env_manager.portal_url(), "https://data.4dnucleome.org");
}

#[tokio::test]
async fn env_path_requires_an_elasticsearch_entry() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    let mut page = sample_health_page("fourfront-mastertest");
    page.elasticsearch = None;
    health
        .fetch_health_page
        .given("http://fourfront-mastertest.9wzadzju3p.us-east-1.elasticbeanstalk.com".to_string())
        .will_return(Ok(page));

    let err = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        None,
        Some("mastertest"),
        &BucketOverrides::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::MissingHealthPageKey { .. }));
}

#[tokio::test]
async fn bare_elasticsearch_hosts_get_an_https_scheme() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    let mut page = sample_health_page("fourfront-mastertest");
    page.elasticsearch = Some("search-mastertest.example.com:443".to_string());
    health
        .fetch_health_page
        .given("http://fourfront-mastertest.9wzadzju3p.us-east-1.elasticbeanstalk.com".to_string())
        .will_return(Ok(page));

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &NamingRegistry::legacy(),
        None,
        Some("mastertest"),
        &BucketOverrides::default(),
    )
    .await
    .unwrap();
    assert_eq!(
        buckets.env_manager.unwrap().es_url(),
        "https://search-mastertest.example.com:443"
    );
}

fn sample_registry() -> NamingRegistry {
    NamingRegistry::Orchestrated(OrchestratedRegistry::sample_cgap())
}

fn global_bucket_fixtures(s3: &MockEnvBucketMediator, health: &MockHealthMediator) {
    s3.list_keys
        .given(GLOBAL_BUCKET.to_string())
        .will_return(Ok(vec!["acme-prd".to_string()]));
    s3.get_object_json
        .given((GLOBAL_BUCKET.to_string(), "acme-prd".to_string()))
        .will_return(Ok(json!({
            "fourfront": "https://cgap.genetics.example.com/",
            "es": "https://search-acme-prd.example.com:443",
            "ff_env": "acme-prd",
        })));
    let mut page = sample_health_page("acme-prd");
    page.s3_encrypt_key_id = Some("some-kms-key".to_string());
    health
        .fetch_health_page
        .given("https://cgap.genetics.example.com".to_string())
        .will_return(Ok(page));
}

#[tokio::test]
async fn global_env_bucket_path_takes_names_from_the_health_page() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    global_bucket_fixtures(&s3, &health);

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &sample_registry(),
        Some(GLOBAL_BUCKET),
        Some("cgap"),
        &BucketOverrides::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        buckets.sys_bucket,
        Some("elasticbeanstalk-acme-prd-system".to_string())
    );
    assert_eq!(
        buckets.outfile_bucket,
        Some("elasticbeanstalk-acme-prd-wfoutput".to_string())
    );
    assert_eq!(
        buckets.raw_file_bucket,
        Some("elasticbeanstalk-acme-prd-files".to_string())
    );
    assert_eq!(
        buckets.blob_bucket,
        Some("elasticbeanstalk-acme-prd-blobs".to_string())
    );
    assert_eq!(buckets.s3_encrypt_key_id, Some("some-kms-key".to_string()));

    let env_manager = buckets.env_manager.unwrap();
    assert_eq!(env_manager.env_name(), "acme-prd");
    assert_eq!(env_manager.portal_url(), "https://cgap.genetics.example.com");
}

#[tokio::test]
async fn specified_buckets_must_agree_with_the_health_page() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    global_bucket_fixtures(&s3, &health);
    let overrides = BucketOverrides {
        outfile_bucket: Some("some-other-bucket".to_string()),
        ..BucketOverrides::default()
    };

    let err = PortalBuckets::resolve(
        &s3,
        &health,
        &sample_registry(),
        Some(GLOBAL_BUCKET),
        Some("cgap"),
        &overrides,
    )
    .await
    .unwrap_err();
    match err {
        Error::InferredBucketConflict {
            kind,
            specified,
            inferred,
        } => {
            assert_eq!(kind, "outfile");
            assert_eq!(specified, "some-other-bucket");
            assert_eq!(inferred, "elasticbeanstalk-acme-prd-wfoutput");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn specified_buckets_stand_when_the_health_page_is_silent() {
    let s3 = MockEnvBucketMediator::new();
    let health = MockHealthMediator::new();
    s3.list_keys
        .given(GLOBAL_BUCKET.to_string())
        .will_return(Ok(vec!["acme-prd".to_string()]));
    s3.get_object_json
        .given((GLOBAL_BUCKET.to_string(), "acme-prd".to_string()))
        .will_return(Ok(json!({
            "fourfront": "https://cgap.genetics.example.com",
            "es": "https://search-acme-prd.example.com:443",
            "ff_env": "acme-prd",
        })));
    let mut page = sample_health_page("acme-prd");
    page.metadata_bundles_bucket = None;
    health
        .fetch_health_page
        .given("https://cgap.genetics.example.com".to_string())
        .will_return(Ok(page));

    let overrides = BucketOverrides {
        metadata_bucket: Some("my-metadata".to_string()),
        ..BucketOverrides::default()
    };
    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &sample_registry(),
        Some(GLOBAL_BUCKET),
        Some("cgap"),
        &overrides,
    )
    .await
    .unwrap();
    assert_eq!(buckets.metadata_bucket, Some("my-metadata".to_string()));
}
