use log::info;
use portal_env_resolver::buckets::{BucketOverrides, PortalBuckets};
use portal_env_resolver::env_manager;
use portal_env_resolver::envs::NamingRegistry;
use portal_env_resolver::Args;
use simplelog::{Config as LogConfig, SimpleLogger};
use std::process;
use structopt::StructOpt;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync + 'static>>;

// Returning a Result from main makes it print a Debug representation of the error, but with Snafu
// we have nice Display representations of the error, so we wrap "main" (run) and print any error.
// https://github.com/shepmaster/snafu/issues/110
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::from_args();
    // Log setup
    SimpleLogger::init(args.log_level, LogConfig::default())?;
    info!("portal-env-resolver started with {:?}", args);

    let global_bucket = match args.global_env_bucket.clone() {
        Some(bucket) => Some(bucket),
        None => env_manager::global_env_bucket_name()?,
    };

    let s3 = portal_env_resolver::new_env_bucket_mediator(&args.region)?;
    let health = portal_env_resolver::new_health_mediator()?;

    // Without a global env bucket there is no declared ecosystem to load, so the
    // legacy conventions are the only interpretation available.
    let registry = match global_bucket.as_deref() {
        Some(bucket) if !args.legacy => {
            env_manager::load_naming_registry(&s3, bucket, &args.ecosystem).await?
        }
        _ => NamingRegistry::legacy(),
    };

    let buckets = PortalBuckets::resolve(
        &s3,
        &health,
        &registry,
        global_bucket.as_deref(),
        args.env.as_deref(),
        &BucketOverrides::default(),
    )
    .await?;

    if let Some(env_manager) = &buckets.env_manager {
        println!("env_name: {}", env_manager.env_name());
        println!("portal_url: {}", env_manager.portal_url());
        println!("es_url: {}", env_manager.es_url());
        let classification = registry.classify_server_url(env_manager.portal_url(), false)?;
        println!("kind: {}", classification.kind);
        println!("environment: {}", classification.environment);
        println!("is_stg_or_prd: {}", classification.is_stg_or_prd);
        if let Some(mirror) = registry.get_standard_mirror_env(env_manager.env_name()) {
            println!("mirror_env: {}", mirror);
        }
    }
    print_bucket("sys_bucket", &buckets.sys_bucket);
    print_bucket("outfile_bucket", &buckets.outfile_bucket);
    print_bucket("raw_file_bucket", &buckets.raw_file_bucket);
    print_bucket("blob_bucket", &buckets.blob_bucket);
    print_bucket("metadata_bucket", &buckets.metadata_bucket);
    print_bucket("tibanna_cwls_bucket", &buckets.tibanna_cwls_bucket);
    print_bucket("tibanna_output_bucket", &buckets.tibanna_output_bucket);
    print_bucket("s3_encrypt_key_id", &buckets.s3_encrypt_key_id);
    Ok(())
}

fn print_bucket(label: &str, value: &Option<String>) {
    if let Some(value) = value {
        println!("{}: {}", label, value);
    }
}
