// # terraform-provider-mastodon
//
// This binary is a THIN integration layer: all provider logic lives in
// `tfmastodon-core` and `tfmastodon-provider`.
//
// The binary is responsible for:
// 1. Refusing to run unless launched by a plugin host
// 2. Initializing logging on stderr
// 3. Initializing the runtime
// 4. Serving the `mastodon` provider over stdin/stdout
//
// ## Configuration
//
// - `TF_PLUGIN_MAGIC_COOKIE`: set by the host, must match the plugin cookie
// - `TF_LOG_PROVIDER`: log level (trace, debug, info, warn, error, json, off)
// - `TF_LOG`: fallback log level when `TF_LOG_PROVIDER` is unset
//
// Stdout carries the plugin protocol, so logs only ever go to stderr.

use anyhow::{Context, Result};
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;
use tfmastodon_core::ServeConfig;
use tfmastodon_core::config::NOT_A_PLUGIN_HOST_MESSAGE;
use tfmastodon_provider::MastodonProvider;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Not launched by a host, or invalid configuration
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum PluginExitCode {
    /// Host stopped the plugin or closed stdin
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PluginExitCode> for ExitCode {
    fn from(code: PluginExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = ServeConfig::from_env();

    if !config.launched_by_host() {
        eprintln!("{}", NOT_A_PLUGIN_HOST_MESSAGE);
        return PluginExitCode::ConfigError.into();
    }

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return PluginExitCode::ConfigError.into();
    }

    if let Some(level) = config.max_level() {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to set tracing subscriber: {}", e);
            return PluginExitCode::ConfigError.into();
        }
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return PluginExitCode::RuntimeError.into();
        }
    };

    run_to_exit(rt, run()).into()
}

/// How long blocked runtime threads get to finish once serving is over
///
/// The stdin reader sits in a blocking read that only returns when the host
/// closes the pipe, so the runtime cannot wait for it after SIGTERM.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Drive `serve` to completion, then shut the runtime down without waiting
/// on blocked threads
fn run_to_exit<F>(rt: tokio::runtime::Runtime, serve: F) -> PluginExitCode
where
    F: Future<Output = Result<()>>,
{
    let code = rt.block_on(async {
        match serve.await {
            Ok(()) => PluginExitCode::CleanShutdown,
            Err(e) => {
                error!("Plugin error: {:#}", e);
                PluginExitCode::RuntimeError
            }
        }
    });

    rt.shutdown_timeout(SHUTDOWN_TIMEOUT);
    code
}

/// Serve the provider until the host stops it or sends SIGTERM
async fn run() -> Result<()> {
    let provider = MastodonProvider::new(env!("CARGO_PKG_VERSION"));
    info!("Starting terraform-provider-mastodon {}", env!("CARGO_PKG_VERSION"));

    #[cfg(unix)]
    {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;

        tokio::select! {
            result = tfmastodon_core::serve(provider) => {
                result.context("Provider server failed")?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tfmastodon_core::serve(provider)
            .await
            .context("Provider server failed")?;
    }

    Ok(())
}
