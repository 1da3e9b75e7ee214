use portal_env_resolver::envs::{
    mirror_env_from_context, ContextSettings, NamingRegistry, OrchestratedRegistry, PortalApp,
    ServerKind,
};
use portal_env_resolver::error::Error;
use serde_json::json;

fn cgap() -> NamingRegistry {
    NamingRegistry::Orchestrated(OrchestratedRegistry::sample_cgap())
}

fn fourfront() -> NamingRegistry {
    NamingRegistry::Orchestrated(OrchestratedRegistry::sample_fourfront())
}

#[test]
fn app_membership_goes_by_prefix_and_alias() {
    let r = cgap();
    assert!(r.is_cgap_env("acme-prd"));
    assert!(r.is_cgap_env("acme-anything-at-all"));
    assert!(r.is_cgap_env("cgap"));
    assert!(!r.is_cgap_env("fourfront-mastertest"));
    assert!(!r.is_cgap_env(""));
    // A single-app orchestration has no Fourfront envs at all.
    assert!(!r.is_fourfront_env("acme-prd"));

    let r = fourfront();
    assert!(r.is_fourfront_env("acme-prd"));
    assert!(r.is_fourfront_env("data"));
    assert!(!r.is_cgap_env("acme-prd"));
}

#[test]
fn aliases_expand_to_their_environments() {
    let r = cgap();
    assert_eq!(r.full_env_name("cgap").unwrap(), "acme-prd");
    assert_eq!(r.full_env_name("prd").unwrap(), "acme-prd");
    assert_eq!(r.full_env_name("acme-prd").unwrap(), "acme-prd");
    assert_eq!(r.full_env_name("demo").unwrap(), "acme-pubdemo");
    assert_eq!(r.short_env_name("demo"), "pubdemo");
    assert_eq!(r.short_env_name("acme-pubdemo"), "pubdemo");
    assert!(r.env_equals("cgap", "acme-prd"));
    assert!(r.env_equals("prd", "cgap"));
    assert!(!r.env_equals("cgap", "acme-stg"));
}

#[test]
fn app_specific_full_names_go_by_the_orchestrated_app() {
    let r = cgap();
    assert_eq!(r.full_cgap_env_name("test").unwrap(), "acme-test");
    assert!(matches!(
        r.full_fourfront_env_name("test").unwrap_err(),
        Error::WrongAppEnv { .. }
    ));

    // In a Fourfront orchestration nothing is a CGAP env name, not even one
    // that smells like one.
    let r = fourfront();
    assert!(matches!(
        r.full_cgap_env_name("cgap-anything").unwrap_err(),
        Error::WrongAppEnv { .. }
    ));
    assert_eq!(r.full_fourfront_env_name("test").unwrap(), "acme-pubtest");
}

#[test]
fn stg_or_prd_requires_mirroring_for_the_staging_side() {
    // sample_cgap declares no staging env and mirroring is off.
    let r = cgap();
    assert!(r.is_stg_or_prd_env("acme-prd"));
    assert!(r.is_stg_or_prd_env("cgap"));
    assert!(!r.is_stg_or_prd_env("acme-stg"));
    assert!(!r.is_stg_or_prd_env("stg"));
    assert!(!r.is_stg_or_prd_env("acme-test"));

    let r = fourfront();
    assert!(r.is_stg_or_prd_env("acme-prd"));
    assert!(r.is_stg_or_prd_env("acme-stg"));
    assert!(r.is_stg_or_prd_env("data"));
    assert!(r.is_stg_or_prd_env("staging"));
    assert!(!r.is_stg_or_prd_env("acme-test"));
}

#[test]
fn mirrors_answer_alias_in_alias_out() {
    let r = fourfront();
    assert_eq!(r.get_standard_mirror_env("data"), Some("staging".to_string()));
    assert_eq!(r.get_standard_mirror_env("staging"), Some("data".to_string()));
    assert_eq!(
        r.get_standard_mirror_env("acme-prd"),
        Some("acme-stg".to_string())
    );
    assert_eq!(
        r.get_standard_mirror_env("acme-stg"),
        Some("acme-prd".to_string())
    );
    assert_eq!(r.get_standard_mirror_env("acme-test"), None);
    assert!(r.mirroring_enabled());
}

#[test]
fn disabled_mirroring_reports_no_mirrors() {
    let r = cgap();
    assert!(!r.mirroring_enabled());
    assert_eq!(r.get_standard_mirror_env("acme-prd"), None);
    assert_eq!(r.get_standard_mirror_env("cgap"), None);
}

#[test]
fn a_declared_stg_env_without_the_flag_is_ordinary() {
    let registry = NamingRegistry::from_declared_data(&json!({
        "orchestrated_app": "fourfront",
        "full_env_prefix": "acme-",
        "prd_env_name": "acme-prd",
        "stg_env_name": "acme-stg",
        "stage_mirroring_enabled": false,
    }))
    .unwrap();
    assert!(!registry.mirroring_enabled());
    assert!(!registry.is_stg_or_prd_env("acme-stg"));
    assert_eq!(registry.get_standard_mirror_env("acme-prd"), None);
}

#[test]
fn production_class_envs_share_the_pseudo_bucket_env() {
    let r = fourfront();
    assert_eq!(
        r.prod_bucket_env("acme-prd"),
        Some("production-data".to_string())
    );
    assert_eq!(
        r.prod_bucket_env("acme-stg"),
        Some("production-data".to_string())
    );
    assert_eq!(r.prod_bucket_env("acme-test"), None);
    assert_eq!(r.get_bucket_env("data"), "production-data");
    assert_eq!(r.get_bucket_env("acme-test"), "acme-test");
}

#[test]
fn prd_env_is_the_bucket_env_without_a_pseudo_env() {
    let registry = NamingRegistry::from_declared_data(&json!({
        "orchestrated_app": "cgap",
        "full_env_prefix": "acme-",
        "prd_env_name": "acme-prd",
    }))
    .unwrap();
    assert_eq!(
        registry.prod_bucket_env("acme-prd"),
        Some("acme-prd".to_string())
    );
}

#[test]
fn test_and_hotseat_membership_resolves_aliases() {
    let r = cgap();
    assert!(r.is_test_env("acme-test"));
    assert!(r.is_test_env("testing"));
    assert!(!r.is_test_env("acme-prd"));

    assert!(r.is_hotseat_env("acme-hotseat"));
    assert!(r.is_hotseat_env("demo"));
    assert!(!r.is_hotseat_env("acme-test"));
}

#[test]
fn real_urls_prefer_the_public_table() {
    let r = fourfront();
    assert_eq!(r.get_env_real_url("data"), "https://genetics.example.com");
    assert_eq!(r.get_env_real_url("acme-prd"), "https://genetics.example.com");
    assert_eq!(
        r.get_env_real_url("staging"),
        "https://stg.genetics.example.com"
    );
    assert_eq!(
        r.get_env_real_url("acme-test"),
        "http://test.dev.genetics.example.com"
    );

    let r = cgap();
    assert_eq!(r.get_env_real_url("cgap"), "https://cgap.genetics.example.com");
    assert_eq!(
        r.get_env_real_url("acme-foo"),
        "https://acme-foo.dev.genetics.example.com"
    );
}

#[test]
fn data_sets_follow_the_declared_table() {
    let r = cgap();
    assert_eq!(r.data_set_for_env("acme-prd", None), Some("prod".to_string()));
    assert_eq!(
        r.data_set_for_env("acme-hotseat", None),
        Some("prod".to_string())
    );
    assert_eq!(r.data_set_for_env("acme-test", None), Some("test".to_string()));
    assert_eq!(
        r.data_set_for_env("acme-other", Some("test")),
        Some("test".to_string())
    );
    assert_eq!(r.data_set_for_env("acme-other", None), None);
}

#[test]
fn foursight_names_and_urls_come_from_the_declaration() {
    let r = cgap();
    assert_eq!(r.foursight_env_name("acme-prd"), "cgap");
    assert_eq!(r.foursight_env_name("cgap"), "cgap");
    assert_eq!(r.foursight_env_name("acme-foo"), "foo");
    assert_eq!(
        r.infer_foursight_url_from_env(None, "acme-prd"),
        Some("https://foursight.genetics.example.com/api/view/cgap".to_string())
    );
    assert_eq!(
        r.infer_foursight_url_from_env(None, "acme-foo"),
        Some("https://foursight.genetics.example.com/api/view/foo".to_string())
    );
}

#[test]
fn server_predicates_follow_the_orchestrated_app() {
    let r = cgap();
    assert!(r.is_cgap_server("anything", false));
    assert!(!r.is_fourfront_server("anything", false));

    let r = fourfront();
    assert!(r.is_fourfront_server("anything", false));
    assert!(!r.is_cgap_server("anything", false));
}

#[test]
fn indexer_envs_do_not_exist_when_orchestrated() {
    let r = cgap();
    assert!(!r.is_indexer_env("acme-indexer"));
    assert_eq!(r.indexer_env_for_env("acme-prd"), None);
}

#[test]
fn public_url_classifies_with_its_alias() {
    let c = fourfront()
        .classify_server_url("https://genetics.example.com", true)
        .unwrap();
    assert_eq!(c.kind, ServerKind::Fourfront);
    assert_eq!(c.environment, "production-data");
    assert_eq!(c.bucket_env, "production-data");
    assert_eq!(c.server_env, "acme-prd");
    assert!(c.is_stg_or_prd);
    assert_eq!(c.public_name, Some("data".to_string()));
}

#[test]
fn dev_domain_classifies_by_its_leading_label() {
    let c = fourfront()
        .classify_server_url("http://acme-test.dev.genetics.example.com", true)
        .unwrap();
    assert_eq!(c.kind, ServerKind::Fourfront);
    assert_eq!(c.environment, "acme-test");
    assert_eq!(c.server_env, "acme-test");
    assert!(!c.is_stg_or_prd);
    assert_eq!(c.public_name, None);
}

#[test]
fn localhost_and_foreign_urls_classify_as_such() {
    let r = cgap();
    let c = r.classify_server_url("http://localhost:8000", true).unwrap();
    assert_eq!(c.kind, ServerKind::Localhost);

    let err = r
        .classify_server_url("https://google.com", true)
        .unwrap_err();
    assert_eq!(err.to_string(), "https://google.com is not a cgap server");

    let c = r.classify_server_url("https://google.com", false).unwrap();
    assert_eq!(c.kind, ServerKind::Unknown);
}

#[test]
fn declarations_deserialize_with_defaults() {
    let registry = NamingRegistry::from_declared_data(&json!({
        "orchestrated_app": "cgap",
        "full_env_prefix": "demo-",
    }))
    .unwrap();
    assert!(registry.is_cgap_env("demo-x"));
    assert_eq!(registry.full_env_name("x").unwrap(), "demo-x");
    assert!(!registry.is_stg_or_prd_env("demo-x"));
    assert!(!registry.mirroring_enabled());
}

#[test]
fn unknown_declaration_keys_are_ignored() {
    let registry = NamingRegistry::from_declared_data(&json!({
        "orchestrated_app": "fourfront",
        "full_env_prefix": "acme-",
        "ecosystem": "main",
        "some_future_key": [1, 2, 3],
    }))
    .unwrap();
    assert!(registry.is_fourfront_env("acme-x"));
}

#[test]
fn malformed_declarations_are_rejected() {
    let err = NamingRegistry::from_declared_data(&json!({
        "orchestrated_app": 17,
    }))
    .unwrap_err();
    assert!(matches!(err, Error::BadDeclaredData { .. }));
}

#[test]
fn sample_apps_are_what_they_say() {
    assert_eq!(OrchestratedRegistry::sample_cgap().app(), PortalApp::Cgap);
    assert_eq!(
        OrchestratedRegistry::sample_fourfront().app(),
        PortalApp::Fourfront
    );
}

#[test]
fn mirror_context_prefers_declarations_then_guesses() {
    let r = fourfront();
    let declared = ContextSettings {
        env_name: Some("acme-prd".to_string()),
        mirror_env_name: Some("acme-custom-mirror".to_string()),
    };
    assert_eq!(
        mirror_env_from_context(&r, &declared, false, true),
        Some("acme-custom-mirror".to_string())
    );

    let guessable = ContextSettings {
        env_name: Some("acme-prd".to_string()),
        mirror_env_name: None,
    };
    assert_eq!(
        mirror_env_from_context(&r, &guessable, false, true),
        Some("acme-stg".to_string())
    );
    assert_eq!(mirror_env_from_context(&r, &guessable, false, false), None);

    // With mirroring disabled nothing has a mirror, whatever is declared.
    assert_eq!(mirror_env_from_context(&cgap(), &declared, false, true), None);

    let unmirrored = ContextSettings {
        env_name: Some("acme-test".to_string()),
        mirror_env_name: None,
    };
    assert_eq!(mirror_env_from_context(&r, &unmirrored, false, true), None);
}
