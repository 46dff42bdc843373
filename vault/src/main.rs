//! `hcv`: log in to Vault and read the configured secrets.
//!
//! Usage: `hcv [CONFIG_FILE]`. Without a file, configuration comes from the
//! environment (and a `.env` file, if present). Key names are printed, values
//! never are. Logging follows `HCV_LOG_LEVEL` and `HCV_LOG_FORMAT`.

use anyhow::{Context, Result};
use hcv_common::{TracingConfig, init_tracing};
use hcv_vault::{SecretBundle, SecretEngine, VaultClient, VaultConfig};
use std::process::ExitCode;
use tracing::{debug, error, info, info_span};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    if !init_tracing(&TracingConfig::from_env()) {
        debug!("tracing subscriber already installed");
    }

    match run(std::env::args().nth(1)).await {
        Ok(reports) => {
            for report in reports {
                println!("{report}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "hcv failed");
            eprintln!("hcv: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run every step and collect one line per secret. Nothing is printed unless
/// all steps succeed.
async fn run(config_file: Option<String>) -> Result<Vec<String>> {
    let config = match &config_file {
        Some(path) => VaultConfig::from_file(path).with_context(|| format!("loading {path}"))?,
        None => VaultConfig::from_env().context("loading configuration from environment")?,
    };

    let client = VaultClient::from_config(&config).context("building Vault client")?;
    let span = info_span!(
        "hcv",
        addr = %client.endpoint().addr,
        method = client.credentials().method().as_str()
    );
    let client = client.with_span(span);

    let auth = client.authenticate().await.context("authenticating")?;

    let Some(token) = auth.token else {
        info!("login issued no token; skipping token validation and secret reads");
        return Ok(Vec::new());
    };

    client
        .is_token_valid(&token)
        .await
        .context("validating token")?;

    let mut reports = Vec::new();
    for engine in config.engines.engines() {
        let bundle = client
            .read_secret(&token, &engine)
            .await
            .with_context(|| format!("reading {} secret at {}", engine.kind(), engine.path()))?;
        reports.push(describe(&engine, &bundle));
    }
    Ok(reports)
}

fn describe(engine: &SecretEngine, bundle: &SecretBundle) -> String {
    let mut keys: Vec<&str> = bundle.keys().collect();
    keys.sort_unstable();
    format!("{} {}: {}", engine.kind(), engine.path(), keys.join(", "))
}
