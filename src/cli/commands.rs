use crate::context::MockContext;
use crate::identity::builtin_document;
use crate::runtime_config::{RuntimeConfig, DEFAULT_ADDR, DEFAULT_CONFIG_PATH, DEFAULT_SPECS_DIR};
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::spec::{build_routes, DirectorySpecSource, LoadedSpecs, RouteMeta};
use crate::telemetry::LogConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for mockzure
#[derive(Parser)]
#[command(name = "mockzure", version)]
#[command(about = "Local mock of resource-management, directory and identity APIs", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Load specs and data, then serve until SIGINT/SIGTERM
    Serve {
        /// Data file (YAML or JSON)
        #[arg(long, env = "MOCKZURE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Root of the arm/, graph/ and identity/ description directories
        #[arg(long, env = "MOCKZURE_SPECS_DIR", default_value = DEFAULT_SPECS_DIR)]
        specs: PathBuf,

        /// Address and port to bind the server to
        #[arg(long, env = "MOCKZURE_ADDR", default_value = DEFAULT_ADDR)]
        addr: String,
    },
    /// Print the compiled route table
    Routes {
        /// Root of the arm/, graph/ and identity/ description directories
        #[arg(long, env = "MOCKZURE_SPECS_DIR", default_value = DEFAULT_SPECS_DIR)]
        specs: PathBuf,
    },
}

/// Execute the parsed command.
///
/// # Errors
///
/// Returns an error if:
/// - A spec directory cannot be listed
/// - The data file cannot be read or decoded
/// - The server fails to bind or to install its signal handlers
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            specs,
            addr,
        } => serve(&config, &specs, &addr),
        Commands::Routes { specs } => {
            let loaded = load_specs(&specs)?;
            for line in route_lines(&routes_with_identity(loaded)) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn load_specs(specs: &Path) -> anyhow::Result<LoadedSpecs> {
    let loaded = DirectorySpecSource::new(specs)
        .load()
        .with_context(|| format!("failed to load specs from {}", specs.display()))?;
    info!(
        root = %specs.display(),
        loaded = loaded.summary.loaded,
        placeholders = loaded.summary.placeholders,
        failed = loaded.summary.failed,
        identity_documents = loaded.summary.identity_documents,
        "Spec directory loaded"
    );
    Ok(loaded)
}

fn routes_with_identity(loaded: LoadedSpecs) -> Vec<RouteMeta> {
    let mut documents = loaded.documents;
    documents.push(builtin_document());
    build_routes(&documents)
}

/// `METHOD PATTERN -> family/operationId`, one line per route.
#[must_use]
pub fn route_lines(routes: &[RouteMeta]) -> Vec<String> {
    routes
        .iter()
        .map(|r| {
            format!(
                "{} {} -> {}/{}",
                r.method, r.path_pattern, r.family, r.operation_id
            )
        })
        .collect()
}

fn serve(config_path: &Path, specs: &Path, addr: &str) -> anyhow::Result<()> {
    let runtime = RuntimeConfig::from_env();
    may::config().set_stack_size(runtime.stack_size);

    let loaded = load_specs(specs)?;
    let redaction = LogConfig::from_env().redact_level;
    let context = Arc::new(MockContext::load(
        config_path,
        loaded.documents,
        redaction,
    )?);

    let handle = HttpServer(AppService::new(Arc::clone(&context)))
        .start(addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %handle.addr(),
        routes = context.summary.routes,
        stack_size = runtime.stack_size,
        "mockzure listening"
    );

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    info!("Server stopped");
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
