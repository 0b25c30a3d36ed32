//! `clusterforge`: generate a broker cluster's artifacts, then optionally hand
//! control to the orchestration CLI.
//!
//! ```bash
//! # print the generated service definition
//! CLUSTERFORGE_TOTAL_NODES=4 CLUSTERFORGE_CORE_NODES=2 clusterforge
//!
//! # generate, then run `docker compose up -d --build`
//! clusterforge up -d --build
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use clusterforge_artifacts::{Generator, OpensslAuthority};
use clusterforge_common::config::ENV_PREFIX;
use clusterforge_common::{GeneratorConfig, BROKER_ENV_PREFIX};
use std::ffi::OsString;
use std::process::{Command, ExitCode};

#[derive(Parser, Debug)]
#[command(name = "clusterforge")]
#[command(about = "Generate a broker cluster and pass arguments to the orchestration CLI")]
#[command(disable_help_flag = true)]
struct Cli {
    /// Arguments forwarded verbatim to the orchestration CLI; none prints the service definition
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

impl Cli {
    /// Parse `argv` with an escape inserted after the program name, so every
    /// user argument (`--help`, `--` included) lands in `args` untouched.
    fn parse_forwarded<I>(argv: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut argv = argv.into_iter();
        let mut escaped: Vec<OsString> = argv.next().into_iter().collect();
        escaped.push(OsString::from("--"));
        escaped.extend(argv);
        Self::parse_from(escaped)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse_forwarded(std::env::args_os());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let vars = capture_environment(std::env::vars_os())?;
    let config =
        GeneratorConfig::from_vars(vars.clone()).context("Failed to load configuration")?;

    let authority = OpensslAuthority::new(config.openssl.clone());
    let generator = Generator::new(config, vars);
    let report = generator
        .generate(&authority)
        .context("Failed to generate cluster artifacts")?;

    if cli.args.is_empty() {
        print!("{}", report.compose_yaml);
        return Ok(ExitCode::SUCCESS);
    }

    forward(generator.config(), &cli.args)
}

/// Keep the variables that are valid UTF-8.
///
/// A generator setting that is not UTF-8 is an error; a broker setting is
/// skipped with a warning and anything else is ignored.
fn capture_environment<I>(vars: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let config_prefix = format!("{}_", ENV_PREFIX);
    let mut captured = Vec::new();

    for (key, value) in vars {
        let key = match key.into_string() {
            Ok(key) => key,
            Err(key) => {
                let name = key.to_string_lossy();
                if name.starts_with(&config_prefix) || name.starts_with(BROKER_ENV_PREFIX) {
                    tracing::warn!("Skipping environment variable {}: name is not valid UTF-8", name);
                }
                continue;
            }
        };
        match value.into_string() {
            Ok(value) => captured.push((key, value)),
            Err(_) if key.starts_with(&config_prefix) => {
                bail!("Configuration variable {} is not valid UTF-8", key)
            }
            Err(_) if key.starts_with(BROKER_ENV_PREFIX) => {
                tracing::warn!("Skipping {}: value is not valid UTF-8", key);
            }
            Err(_) => {}
        }
    }

    Ok(captured)
}

/// Run the orchestration CLI in the output directory and mirror its exit status
fn forward(config: &GeneratorConfig, args: &[OsString]) -> Result<ExitCode> {
    let mut words = config.compose_command.split_whitespace();
    let program = words
        .next()
        .context("compose_command cannot be empty")?;

    let shown: Vec<_> = args.iter().map(|arg| arg.to_string_lossy()).collect();
    tracing::info!("Running {} {}", config.compose_command, shown.join(" "));
    let status = Command::new(program)
        .args(words)
        .args(args)
        .current_dir(&config.output_dir)
        .status()
        .with_context(|| format!("Failed to run {}", program))?;

    // killed by a signal
    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
