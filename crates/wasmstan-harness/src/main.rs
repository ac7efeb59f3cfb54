//! `wasmstan-harness` command-line entry point

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use wasmstan_filter::Library;
use wasmstan_harness::{Harness, HarnessConfig, HarnessError, ShutdownSignals};
use wasmstan_seams::{defaults, SeamRegistry};

fn cli() -> Command {
    Command::new("wasmstan-harness")
        .version(wasmstan_harness::VERSION)
        .about("Run the httpstan or pystan test suite against the wasmstan backend")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("library")
                .long("library")
                .value_parser(["httpstan", "pystan"])
                .help("Library under test (default: name of the library directory)"),
        )
        .arg(
            Arg::new("library-dir")
                .long("library-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Library checkout the test runner executes in"),
        )
        .arg(
            Arg::new("backend-root")
                .long("backend-root")
                .value_parser(value_parser!(PathBuf))
                .help("wasmstan checkout containing server/main.js and cmdstan.js"),
        )
        .arg(
            Arg::new("runtime")
                .long("runtime")
                .value_parser(value_parser!(PathBuf))
                .help("Runtime executable the backend runs under"),
        )
        .arg(Arg::new("host").long("host").help("Host the backend binds"))
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .help("Port the backend binds; 0 picks a free port"),
        )
        .arg(
            Arg::new("backend-version")
                .long("backend-version")
                .help("Use this version banner instead of probing the backend"),
        )
        .arg(
            Arg::new("backend-debug")
                .long("backend-debug")
                .action(ArgAction::SetTrue)
                .help("Show the backend's stdout and stderr"),
        )
        .arg(Arg::new("runner").long("runner").help("Test runner executable"))
        .arg(
            Arg::new("runner-arg")
                .long("runner-arg")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Argument passed to the runner before the filter (repeatable)"),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .value_parser(value_parser!(PathBuf))
                .help("Write a JSON run summary to this file"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Log filter, e.g. debug or wasmstan_backend=trace (default: RUST_LOG or info)"),
        )
}

fn init_tracing(level: Option<&String>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(args: &ArgMatches) -> Result<HarnessConfig> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };
    let mut config = config.apply_env()?;

    if let Some(library) = args.get_one::<String>("library") {
        let library: Library = library.parse().map_err(HarnessError::from)?;
        config = config.with_library(library);
    }
    if let Some(dir) = args.get_one::<PathBuf>("library-dir") {
        config = config.with_library_dir(dir);
    }
    if let Some(root) = args.get_one::<PathBuf>("backend-root") {
        config.backend.root.clone_from(root);
    }
    if let Some(runtime) = args.get_one::<PathBuf>("runtime") {
        config.backend.runtime.clone_from(runtime);
    }
    if let Some(host) = args.get_one::<String>("host") {
        config.backend.host.clone_from(host);
    }
    if let Some(port) = args.get_one::<u16>("port") {
        config.backend.port = *port;
    }
    if let Some(version) = args.get_one::<String>("backend-version") {
        config.backend.version = Some(version.clone());
    }
    if args.get_flag("backend-debug") {
        config.backend.inherit_output = true;
    }
    if let Some(runner) = args.get_one::<String>("runner") {
        config.runner.program.clone_from(runner);
    }
    if let Some(runner_args) = args.get_many::<String>("runner-arg") {
        config.runner.args = runner_args.cloned().collect();
    }
    Ok(config)
}

async fn run(args: &ArgMatches) -> Result<i32> {
    let signals = ShutdownSignals::register().context("installing signal handlers")?;
    let config = load_config(args)?;

    // Collaborator defaults, unless something already published them
    let registry = SeamRegistry::global();
    if registry.names().is_empty() {
        defaults::publish_defaults(registry);
    }

    let harness = Harness::global(config);
    let span = tracing::info_span!("run", run_id = %harness.run_id());
    let summary = harness.run(signals.recv()).instrument(span).await?;

    if let Some(path) = args.get_one::<PathBuf>("summary") {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("writing summary to {}", path.display()))?;
    }
    Ok(summary.outcome.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli().get_matches();
    init_tracing(args.get_one::<String>("log-level"));

    let code = match run(&args).await {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<HarnessError>() {
            Some(harness) => {
                tracing::error!(category = %harness.category(), "{harness}");
                harness.exit_code()
            }
            None => {
                tracing::error!("{e:#}");
                wasmstan_harness::ErrorCategory::Io.exit_code()
            }
        },
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
