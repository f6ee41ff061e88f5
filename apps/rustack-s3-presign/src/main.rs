//! Rustack S3 presign tool.
//!
//! Prints presigned URLs and browser upload forms for an S3-compatible
//! endpoint, and can stat an object with a signed `HEAD` request.
//!
//! # Usage
//!
//! ```text
//! rustack-s3-presign url <bucket> <key> [expiry-seconds] [--method <METHOD>]
//! rustack-s3-presign post <bucket> <key-prefix> [expiry-seconds]
//! rustack-s3-presign stat <bucket> <key>
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3_ENDPOINT` | `localhost` | Endpoint host name |
//! | `S3_PORT` | *(unset)* | Endpoint port |
//! | `S3_USE_SSL` | `false` | Use HTTPS |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Credentials |
//! | `AWS_SESSION_TOKEN` | *(unset)* | STS session token |
//! | `AWS_REGION` | *(unset)* | Region used for signing |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use http::Method;
use rustack_s3_client::{ClientConfig, DispatchRequest, PresignRequest, S3Client, TracingSink};
use rustack_s3_signer::PostPolicy;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Tool version printed at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Expiry used when none is given on the command line (one hour).
const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// Presigned URLs and upload forms for S3-compatible endpoints.
#[derive(Debug, Parser)]
#[command(name = "rustack-s3-presign")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print a presigned URL
    Url {
        /// HTTP method the URL will be used with
        #[arg(long, default_value = "GET", value_parser = parse_method)]
        method: Method,
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
        /// Seconds until the URL expires
        #[arg(default_value_t = DEFAULT_EXPIRY_SECS)]
        expiry_secs: u64,
    },
    /// Print a signed POST form as JSON
    Post {
        /// Bucket name
        bucket: String,
        /// Required prefix of uploaded keys
        key_prefix: String,
        /// Seconds until the form expires
        #[arg(default_value_t = DEFAULT_EXPIRY_SECS)]
        expiry_secs: u64,
    },
    /// Send a signed HEAD and print the response headers
    Stat {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
}

fn parse_method(value: &str) -> Result<Method> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method: {value}"))
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn run(client: &S3Client, command: Command) -> Result<()> {
    match command {
        Command::Url {
            method,
            bucket,
            key,
            expiry_secs,
        } => {
            let request = PresignRequest::builder()
                .method(method)
                .bucket(bucket)
                .object(key)
                .expiry(Duration::from_secs(expiry_secs))
                .build();
            let url = client
                .presigned_url(request)
                .await
                .context("failed to presign URL")?;
            println!("{url}");
        }
        Command::Post {
            bucket,
            key_prefix,
            expiry_secs,
        } => {
            let expires = Utc::now()
                + chrono::Duration::seconds(
                    i64::try_from(expiry_secs).context("expiry seconds out of range")?,
                );
            let policy = PostPolicy::new(bucket, expires).key_starts_with(key_prefix);
            let form = client
                .presigned_post_policy(&policy)
                .await
                .context("failed to sign POST policy")?;
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Command::Stat { bucket, key } => {
            let request = DispatchRequest::builder()
                .method(Method::HEAD)
                .bucket(bucket)
                .object(key)
                .build();
            let response = client
                .execute(request)
                .await
                .context("HEAD request failed")?;
            println!("{} {}", response.status.as_u16(), response.reason);
            for (name, value) in &response.headers {
                println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::from_env();
    init_tracing(&config.log_level)?;

    info!(
        endpoint = %config.endpoint,
        port = ?config.port,
        use_ssl = config.use_ssl,
        version = VERSION,
        "starting Rustack S3 presign tool",
    );

    let client = S3Client::new(config)
        .context("invalid client configuration")?
        .with_trace_sink(Arc::new(TracingSink));

    run(&client, cli.command).await
}
