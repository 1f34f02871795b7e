mod cli;
mod serve;

use clap::Parser;
use cli::{
    CheckKeyArgs, Cli, Commands, GenerateArgs, LogFormat, OutputFormat, ProviderArgs, SourceArgs,
    StatusArgs, StylesArgs, SummarizeArgs,
};
use muse_core::config::{resolve_config, PartialConfig, ResolvedConfig};
use muse_core::git::DiffSource;
use muse_core::provider::{check_key_shape, KeyCheck, ProviderConfig};
use muse_core::style::StyleCatalog;
use muse_core::types::{ErrorDetail, ErrorResponse, RepoStatusResponse, StyleEntry, StylesResponse};
use muse_core::{FailureKind, GenerationFailure, Generated, Pipeline, SCHEMA_VERSION};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_NOTHING_TO_DO: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        cli.log_level.as_filter()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = matches!(&cli.command, Commands::Serve(args) if args.log_format == LogFormat::Json);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), ExitCode> {
    match cli.command {
        Commands::Generate(args) => generate(cli.config, args).await,
        Commands::Summarize(args) => summarize(cli.config, args).await,
        Commands::Styles(args) => styles(args),
        Commands::Status(args) => status(args),
        Commands::CheckKey(args) => check_key(cli.config, args),
        Commands::Serve(args) => {
            let overrides = PartialConfig {
                llm_timeout_secs: args.request_timeout,
                offline: args.offline.then_some(true),
                ..PartialConfig::default()
            };
            let config = load_config(cli.config, overrides)?;
            serve::run(config, &args.host, args.port).await.map_err(|err| {
                eprintln!("muse: server error: {err}");
                ExitCode::from(EXIT_FAILURE)
            })
        }
    }
}

async fn generate(config_path: Option<PathBuf>, args: GenerateArgs) -> Result<(), ExitCode> {
    let config = load_config(config_path, provider_overrides(&args.provider))?;
    let credentials = ProviderConfig::from_config(&config).map_err(|failure| report_failure(args.format, &failure))?;
    let diff = read_diff(&args.source, DiffKind::Staged)
        .map_err(|failure| report_failure(args.format, &failure))?;

    let style = args.style.unwrap_or_else(|| config.default_style.clone());
    let pipeline = Pipeline::from_config(&config);
    let generated = pipeline
        .generate(&diff, &style, &credentials)
        .await
        .map_err(|failure| report_failure(args.format, &failure))?;
    print_generated(args.format, generated)
}

async fn summarize(config_path: Option<PathBuf>, args: SummarizeArgs) -> Result<(), ExitCode> {
    let config = load_config(config_path, provider_overrides(&args.provider))?;
    let credentials = ProviderConfig::from_config(&config).map_err(|failure| report_failure(args.format, &failure))?;
    let diff = read_diff(&args.source, DiffKind::Branch)
        .map_err(|failure| report_failure(args.format, &failure))?;

    let pipeline = Pipeline::from_config(&config);
    let generated = pipeline
        .summarize(&diff, &credentials)
        .await
        .map_err(|failure| report_failure(args.format, &failure))?;
    print_generated(args.format, generated)
}

fn styles(args: StylesArgs) -> Result<(), ExitCode> {
    let catalog = StyleCatalog::builtin();
    match args.format {
        OutputFormat::Json => {
            let response = StylesResponse {
                schema_version: SCHEMA_VERSION.to_string(),
                styles: catalog.styles().iter().map(StyleEntry::from).collect(),
            };
            print_json(&response)
        }
        OutputFormat::Human => {
            for style in catalog.styles() {
                println!("{:<13} {:<24} {}", style.id, style.display_name, style.example);
            }
            println!("{:<13} {:<24} (uses custom_instruction from config)", "custom", "Custom");
            Ok(())
        }
    }
}

fn status(args: StatusArgs) -> Result<(), ExitCode> {
    let repo = repo_or_cwd(args.repo.as_ref()).map_err(|failure| report_failure(args.format, &failure))?;
    let info = DiffSource::open(repo)
        .repo_info()
        .map_err(|failure| report_failure(args.format, &failure))?;

    match args.format {
        OutputFormat::Json => print_json(&RepoStatusResponse::from(info)),
        OutputFormat::Human => {
            match &info.branch {
                Some(branch) => println!("branch: {branch}"),
                None => println!("branch: (detached HEAD)"),
            }
            let status = &info.status;
            println!("staged: {}", status.staged.len());
            println!("unstaged: {}", status.unstaged.len());
            println!("untracked: {}", status.untracked.len());
            println!("conflicted: {}", status.conflicted.len());
            if !info.has_changes() {
                println!("working tree clean");
            }
            Ok(())
        }
    }
}

fn check_key(config_path: Option<PathBuf>, args: CheckKeyArgs) -> Result<(), ExitCode> {
    let overrides = PartialConfig {
        provider: args.provider,
        ..PartialConfig::default()
    };
    let config = load_config(config_path, overrides)?;
    let credentials = ProviderConfig::from_config(&config)
        .map_err(|failure| report_failure(OutputFormat::Human, &failure))?;
    if credentials.api_key.trim().is_empty() {
        let failure = GenerationFailure::for_provider(
            FailureKind::MissingCredential,
            credentials.provider,
            "No API key configured.",
        );
        return Err(report_failure(OutputFormat::Human, &failure));
    }

    match check_key_shape(credentials.provider, &credentials.api_key) {
        KeyCheck::Plausible => println!("{}: key looks plausible", credentials.provider),
        KeyCheck::Suspicious(reason) => {
            println!("{}: {reason} (advisory only)", credentials.provider)
        }
    }
    Ok(())
}

fn load_config(
    config_path: Option<PathBuf>,
    overrides: PartialConfig,
) -> Result<ResolvedConfig, ExitCode> {
    resolve_config(config_path, overrides).map_err(|err| {
        eprintln!("muse: {err}");
        ExitCode::from(EXIT_USAGE)
    })
}

fn provider_overrides(args: &ProviderArgs) -> PartialConfig {
    PartialConfig {
        provider: args.provider.clone(),
        offline: args.offline.then_some(true),
        llm_timeout_secs: args.timeout,
        ..PartialConfig::default()
    }
}

#[derive(Debug, Clone, Copy)]
enum DiffKind {
    Staged,
    Branch,
}

fn read_diff(source: &SourceArgs, kind: DiffKind) -> Result<String, GenerationFailure> {
    if let Some(path) = &source.diff_file {
        return read_diff_file(path);
    }

    let repo = repo_or_cwd(source.repo.as_ref())?;
    let diff_source = DiffSource::open(repo);
    match kind {
        DiffKind::Staged => diff_source
            .staged_diff()?
            .ok_or_else(GenerationFailure::no_staged_changes),
        DiffKind::Branch => diff_source
            .branch_diff()?
            .ok_or_else(GenerationFailure::no_branch_changes),
    }
}

fn repo_or_cwd(repo: Option<&PathBuf>) -> Result<PathBuf, GenerationFailure> {
    match repo {
        Some(repo) => Ok(repo.clone()),
        None => std::env::current_dir().map_err(|err| {
            GenerationFailure::new(FailureKind::VcsUnavailable, format!("current dir: {err}"))
        }),
    }
}

fn read_diff_file(path: &PathBuf) -> Result<String, GenerationFailure> {
    let read = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map(|_| buffer)
    } else {
        std::fs::read_to_string(path)
    };
    read.map_err(|err| {
        GenerationFailure::new(
            FailureKind::VcsUnavailable,
            format!("failed to read diff from {}: {err}", path.display()),
        )
    })
}

fn print_generated(format: OutputFormat, generated: Generated) -> Result<(), ExitCode> {
    match format {
        OutputFormat::Human => {
            println!("{}", generated.message);
            Ok(())
        }
        OutputFormat::Json => print_json(&generated.into_response()),
    }
}

fn report_failure(format: OutputFormat, failure: &GenerationFailure) -> ExitCode {
    match format {
        OutputFormat::Human => eprintln!("muse: {}", failure.detail),
        OutputFormat::Json => {
            let response = ErrorResponse {
                schema_version: SCHEMA_VERSION.to_string(),
                request_id: failure.request_id.clone(),
                error: ErrorDetail::from(failure),
            };
            let _ = print_json(&response);
        }
    }

    if failure.kind.is_precondition() {
        ExitCode::from(EXIT_NOTHING_TO_DO)
    } else {
        ExitCode::from(EXIT_FAILURE)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    let payload = serde_json::to_string_pretty(value).map_err(|err| {
        eprintln!("muse: failed to encode output: {err}");
        ExitCode::from(EXIT_FAILURE)
    })?;
    println!("{payload}");
    Ok(())
}
