use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::fs;

use caddygen::config::loader::load_document;
use caddygen::config::validation::ConfigValidator;
use caddygen::config::watcher::ConfigWatcher;
use caddygen::ports::proxy_control::{ProxyCommand, ProxyControl};
use caddygen::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
use caddygen::{AdminServer, CaddyCli, CompileOptions, Compiler, DataPaths, FileStore};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    /// Directory custom certificates are referenced from [default: ./certs, or <data-dir>/certs for serve]
    #[arg(long, global = true)]
    certs_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a configuration document into a Caddyfile
    Compile {
        #[arg(short, long)]
        config: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report lint findings for a configuration document
    Check {
        #[arg(short, long)]
        config: PathBuf,
        /// Exit non-zero when anything is reported
        #[arg(long)]
        strict: bool,
    },
    /// Recompile whenever the document changes
    Watch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run the admin HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8090")]
        listen: SocketAddr,
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
        #[arg(long, default_value = "caddy")]
        caddy_bin: PathBuf,
        /// Upper bound for each proxy command
        #[arg(long, default_value = "30s")]
        caddy_timeout: humantime::Duration,
    },
    /// Run one proxy lifecycle command
    Caddy {
        #[arg(value_parser = parse_command)]
        action: ProxyCommand,
        #[arg(long, default_value = "Caddyfile")]
        caddyfile: PathBuf,
        #[arg(long, default_value = "caddy")]
        caddy_bin: PathBuf,
        #[arg(long, default_value = "30s")]
        caddy_timeout: humantime::Duration,
    },
}

fn parse_command(raw: &str) -> Result<ProxyCommand, String> {
    raw.parse().map_err(|e: caddygen::ports::proxy_control::ControlError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "caddygen failed");
    }
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let options = cli
        .certs_dir
        .clone()
        .map(CompileOptions::with_certs_dir)
        .unwrap_or_default();

    match cli.command {
        Command::Compile { config, output } => {
            let compiler = Compiler::new(options);
            let doc = load_document(&config)
                .await
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let out = compiler.compile_detailed(&doc);
            match output {
                Some(path) => {
                    write_output(&path, &out.text).await?;
                    tracing::info!(sites = out.sites, path = %path.display(), "Caddyfile written");
                }
                None => print!("{}", out.text),
            }
            Ok(())
        }
        Command::Check { config, strict } => {
            let doc = load_document(&config)
                .await
                .with_context(|| format!("Failed to load {}", config.display()))?;
            let findings = ConfigValidator::lint(&doc);
            for finding in &findings {
                println!("{finding}");
            }
            if findings.is_empty() {
                tracing::info!("No findings");
            } else if strict {
                bail!("{} lint finding(s)", findings.len());
            }
            Ok(())
        }
        Command::Watch { config, output } => watch(&config, &output, Compiler::new(options)).await,
        Command::Serve {
            listen,
            data_dir,
            caddy_bin,
            caddy_timeout,
        } => {
            let paths = DataPaths::new(&data_dir);
            let options = match cli.certs_dir {
                Some(dir) => CompileOptions::with_certs_dir(dir),
                None => CompileOptions::with_certs_dir(paths.certs_dir.to_string_lossy()),
            };

            let handle = caddygen::metrics::install_prometheus_recorder()?;
            let store = Arc::new(FileStore::new(paths.clone()));
            let proxy = Arc::new(
                CaddyCli::new(caddy_bin, paths.caddyfile.clone())
                    .with_timeout(caddy_timeout.into()),
            );

            AdminServer::with_dependencies(store.clone(), store, proxy, Compiler::new(options))
                .with_metrics(handle)
                .run(listen)
                .await
        }
        Command::Caddy {
            action,
            caddyfile,
            caddy_bin,
            caddy_timeout,
        } => {
            let out = CaddyCli::new(caddy_bin, caddyfile)
                .with_timeout(caddy_timeout.into())
                .run(action)
                .await?;
            print!("{}", out.output);
            if !out.succeeded() {
                bail!("caddy {action} failed: {}", out.error);
            }
            Ok(())
        }
    }
}

async fn write_output(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn compile_to(config: &Path, output: &Path, compiler: &Compiler) -> Result<()> {
    let doc = load_document(config)
        .await
        .with_context(|| format!("Failed to load {}", config.display()))?;
    let out = compiler.compile_detailed(&doc);
    write_output(output, &out.text).await?;
    tracing::info!(sites = out.sites, path = %output.display(), "Caddyfile written");
    Ok(())
}

async fn watch(config: &Path, output: &Path, compiler: Compiler) -> Result<()> {
    compile_to(config, output, &compiler).await?;

    let (watcher, mut updates) = ConfigWatcher::new(config);
    let _watcher = watcher.run().context("Failed to watch config file")?;

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(doc) = update else { break };
                let out = compiler.compile_detailed(&doc);
                match write_output(output, &out.text).await {
                    Ok(()) => tracing::info!(sites = out.sites, "Recompiled after change"),
                    Err(e) => tracing::error!(error = %format!("{e:#}"), "Failed to write recompiled output"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watcher");
                break;
            }
        }
    }
    Ok(())
}
