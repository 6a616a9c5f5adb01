//! NextGCore NSSF (Network Slice Selection Function)
//!
//! This daemon keeps the NSSF's NF instance registered with the NRF and its
//! supported slice configuration in sync with the configuration service:
//! - Registers on boot and again whenever the supported PLMN list changes
//! - Sends NRF heartbeats and falls back to re-registration when they fail
//! - Pulls (HTTP polling) or subscribes to (gRPC stream) the slice config
//! - Deregisters once on shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ogs_sbi::SbiClientConfig;
use tokio_util::sync::CancellationToken;

mod config;
mod config_store;
mod context;
mod event;
mod grpc_config;
mod nf_config;
mod nf_sm;
mod nnrf_build;
mod nnrf_client;
mod polling;
mod proto;
mod service;
mod timer;


use config::NssfConfig;
use config_store::ConfigStore;
use context::NssfContext;
use grpc_config::{client_id_from_env, GrpcSliceConfigConnector, SliceConfigWatcher};
use nf_config::{plmn_config_channel, ConfigSource, NssaiConfigApplier};
use nnrf_client::SbiNrfClient;
use polling::{NfConfigPoller, PollingBackoff};
use service::NssfServices;

/// NextGCore NSSF - Network Slice Selection Function
#[derive(Parser, Debug)]
#[command(name = "nextgcore-nssfd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Network Slice Selection Function", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, default_value = "/etc/nextgcore/nssf.yaml")]
    config: String,

    /// Log file path (logs are written to stderr)
    #[arg(short = 'l', long)]
    log_file: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides logger.level
    #[arg(short = 'e', long)]
    log_level: Option<String>,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = NssfConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    init_logging(&args, config.log_level());

    log::info!("NextGCore NSSF v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration loaded from {}", args.config);
    if let Some(path) = &args.log_file {
        log::warn!("Log file {path} ignored, logging to stderr");
    }

    let token = CancellationToken::new();
    setup_signal_handlers(token.clone())?;

    let nf_id = uuid::Uuid::new_v4().to_string();
    let context = NssfContext::from_config(nf_id, &config);
    log::info!(
        "NSSF context initialized (nf_id={}, nrf={}, sbi={}:{})",
        context.nf_id,
        context.nrf_uri,
        context.binding_ipv4,
        context.sbi_port
    );
    let context = context.into_shared();

    let store = Arc::new(ConfigStore::with_config(config.initial_nssai_config()));
    let (plmn_tx, plmn_rx) = plmn_config_channel();
    let applier = NssaiConfigApplier::new(store.clone(), plmn_tx);

    let cfg = &config.configuration;
    let source = if cfg.enable_streaming_config {
        let connector = GrpcSliceConfigConnector::new(config.streaming_config_uri());
        ConfigSource::Streaming(SliceConfigWatcher::new(
            connector,
            client_id_from_env(),
            applier,
        ))
    } else {
        let webui_uri = cfg.webui_uri.as_deref().unwrap_or_default();
        let backoff = PollingBackoff::new(cfg.polling.initial(), cfg.polling.max());
        ConfigSource::Polling(NfConfigPoller::new(webui_uri, backoff, applier))
    };

    let nrf = Arc::new(SbiNrfClient::new(SbiClientConfig::default()));
    let services = NssfServices::start(nrf, context, store, plmn_rx, source, token.clone());

    log::info!("NextGCore NSSF ready");
    token.cancelled().await;

    services.terminate().await;
    log::info!("NextGCore NSSF stopped");
    Ok(())
}

/// Initialize logging; the CLI level wins over the configured one
fn init_logging(args: &Args, configured_level: Option<&str>) {
    let mut builder = env_logger::Builder::new();

    let level = match args
        .log_level
        .as_deref()
        .or(configured_level)
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);
    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
}

/// Cancel the root token on SIGINT/SIGTERM
fn setup_signal_handlers(token: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        token.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = Args::parse_from(["nextgcore-nssfd"]);
        assert_eq!(args.config, "/etc/nextgcore/nssf.yaml");
        assert!(args.log_level.is_none());
        assert!(args.log_file.is_none());
        assert!(!args.no_color);
    }

    #[test]
    fn test_args_custom() {
        let args = Args::parse_from([
            "nextgcore-nssfd",
            "-c",
            "/custom/nssf.yaml",
            "-e",
            "debug",
            "-m",
            "-l",
            "/var/log/nssf.log",
        ]);
        assert_eq!(args.config, "/custom/nssf.yaml");
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.no_color);
        assert_eq!(args.log_file.as_deref(), Some("/var/log/nssf.log"));
    }
}
