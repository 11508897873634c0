//! tldx command-line front end.
//!
//! Parses flags, layers them over environment and file configuration,
//! then streams results from the library to the selected output sink.

mod sinks;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use sinks::{make_sink, OutputFormat};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tldx_lib::{
    load_env_config, parse_duration, read_keywords_file, resolve_config, tld_store, CheckConfig,
    ComposeWarning, DomainChecker, Exec, MAX_CONCURRENCY,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit status after Ctrl-C, as a shell would report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "tldx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Brainstorm domain names and check their availability")]
#[command(
    long_about = "Combine keywords with prefixes, suffixes and TLDs, then check every candidate \
                  through RDAP with DNS and WHOIS fallback.\n\nKeywords may be full domains \
                  (google.com) or, with --regex, patterns such as 'go[a-z]{2}'."
)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Keywords or full domains to check
    #[arg(value_name = "KEYWORDS", help_heading = "Candidates")]
    pub keywords: Vec<String>,

    /// Read keywords from a file (one per line, '#' comments allowed)
    #[arg(short = 'i', long = "input-file", value_name = "FILE", help_heading = "Candidates")]
    pub input_file: Option<PathBuf>,

    /// TLDs to check (comma-separated or repeated)
    #[arg(short = 't', long = "tlds", value_name = "TLD", value_delimiter = ',', help_heading = "Candidates")]
    pub tlds: Option<Vec<String>>,

    /// Prefixes to prepend to each keyword
    #[arg(short = 'p', long = "prefixes", value_name = "PREFIX", value_delimiter = ',', help_heading = "Candidates")]
    pub prefixes: Option<Vec<String>>,

    /// Suffixes to append to each keyword
    #[arg(short = 's', long = "suffixes", value_name = "SUFFIX", value_delimiter = ',', help_heading = "Candidates")]
    pub suffixes: Option<Vec<String>>,

    /// Named TLD bundle, or 'all' (see `tldx show-tld-presets`)
    #[arg(long = "tld-preset", value_name = "NAME", help_heading = "Candidates")]
    pub tld_preset: Option<String>,

    /// Drop candidates longer than this
    #[arg(short = 'm', long = "max-domain-length", value_name = "N", help_heading = "Candidates")]
    pub max_domain_length: Option<usize>,

    /// Treat keywords containing '[', '{' or '\' as patterns
    #[arg(short = 'r', long = "regex", help_heading = "Candidates")]
    pub regex: bool,

    /// Print the composed candidates without checking them
    #[arg(long = "dry-run", help_heading = "Candidates")]
    pub dry_run: bool,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Text, help_heading = "Output")]
    pub format: OutputFormat,

    /// Only show available domains
    #[arg(short = 'a', long = "only-available", help_heading = "Output")]
    pub only_available: bool,

    /// Print a summary of the run
    #[arg(long = "show-stats", help_heading = "Output")]
    pub show_stats: bool,

    /// Disable colored output
    #[arg(long = "no-color", help_heading = "Output")]
    pub no_color: bool,

    /// Show details and errors for each result, and debug logs
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,

    /// Concurrent lookups (0 uses every CPU, max 1000)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Deadline for each domain, e.g. 15s or 500ms
    #[arg(long = "timeout", value_name = "DURATION", value_parser = duration_arg, help_heading = "Performance")]
    pub timeout: Option<Duration>,

    /// Extra attempts after a transient failure
    #[arg(long = "max-retries", value_name = "N", help_heading = "Performance")]
    pub max_retries: Option<u32>,

    #[arg(long = "initial-backoff", value_name = "DURATION", value_parser = duration_arg, help_heading = "Performance")]
    pub initial_backoff: Option<Duration>,

    #[arg(long = "max-backoff", value_name = "DURATION", value_parser = duration_arg, help_heading = "Performance")]
    pub max_backoff: Option<Duration>,

    /// Backoff multiplier between attempts (at least 1.0)
    #[arg(long = "backoff-factor", value_name = "FACTOR", help_heading = "Performance")]
    pub backoff_factor: Option<f64>,

    /// Use this config file instead of discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the TLD presets, including custom ones from config files
    ShowTldPresets,
}

fn duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| format!("invalid duration '{}' (try 500ms, 5s or 2m)", value))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(args.verbose);
    if args.no_color || std::env::var_os("NO_COLOR").is_some() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout only carries results.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "tldx=debug,tldx_lib=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env("TLDX_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Checks that only need the flags themselves.
fn validate_args(args: &Args) -> Result<(), String> {
    if args.command.is_some() {
        return Ok(());
    }

    if args.keywords.is_empty() && args.input_file.is_none() {
        return Err("Provide at least one keyword or an input file with -i/--input-file".to_string());
    }

    if args.max_domain_length == Some(0) {
        return Err("--max-domain-length must be greater than 0".to_string());
    }

    if matches!(args.concurrency, Some(c) if c > MAX_CONCURRENCY) {
        return Err(format!(
            "--concurrency must be at most {}",
            MAX_CONCURRENCY
        ));
    }

    if matches!(args.backoff_factor, Some(f) if !f.is_finite() || f < 1.0) {
        return Err("--backoff-factor must be at least 1.0".to_string());
    }

    if matches!(args.timeout, Some(t) if t.is_zero()) {
        return Err("--timeout must be greater than 0".to_string());
    }

    if let (Some(initial), Some(max)) = (args.initial_backoff, args.max_backoff) {
        if initial > max {
            return Err("--initial-backoff cannot exceed --max-backoff".to_string());
        }
    }

    Ok(())
}

/// Layer flags over the environment and file configuration.
fn build_config(args: &Args) -> Result<CheckConfig, String> {
    let env_config = load_env_config();
    let mut config =
        resolve_config(args.config.as_deref(), &env_config, args.verbose).map_err(|e| e.to_string())?;
    apply_args(&mut config, args);

    if config.initial_backoff > config.max_backoff {
        return Err(format!(
            "initial backoff ({:?}) cannot exceed max backoff ({:?})",
            config.initial_backoff, config.max_backoff
        ));
    }
    Ok(config)
}

fn apply_args(config: &mut CheckConfig, args: &Args) {
    if let Some(tlds) = &args.tlds {
        config.tlds = tlds.clone();
    }
    if let Some(prefixes) = &args.prefixes {
        config.prefixes = prefixes.clone();
    }
    if let Some(suffixes) = &args.suffixes {
        config.suffixes = suffixes.clone();
    }
    if let Some(preset) = &args.tld_preset {
        config.tld_preset = Some(preset.clone());
    }
    if let Some(max) = args.max_domain_length {
        config.max_domain_length = Some(max);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(retries) = args.max_retries {
        config.max_retries = retries;
    }
    if let Some(initial) = args.initial_backoff {
        config.initial_backoff = initial;
    }
    if let Some(max) = args.max_backoff {
        config.max_backoff = max;
    }
    if let Some(factor) = args.backoff_factor {
        config.backoff_factor = factor;
    }

    // Switches only ever turn a setting on.
    config.regex_mode |= args.regex;
    config.only_available |= args.only_available;
    config.verbose |= args.verbose;
}

/// Returns the process exit code.
async fn run(args: Args) -> Result<i32, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    if let Some(Commands::ShowTldPresets) = args.command {
        let store = tld_store(&config.custom_presets);
        println!("{}", ui::preset_table(store.kind(), &store.all()));
        return Ok(0);
    }

    let keywords = collect_keywords(&args)?;
    debug!(keywords = keywords.len(), "collected keywords");

    let shutdown = CancellationToken::new();
    let exec = Exec::new(config.clone()).with_shutdown(shutdown.clone());
    let composition = exec.compose(&keywords)?;
    print_warnings(&composition.warnings, config.verbose);

    if args.dry_run {
        print_dry_run(&composition.domains, args.format)?;
        return Ok(0);
    }

    if composition.domains.is_empty() {
        warn!("no candidate domains to check");
        return Ok(0);
    }

    spawn_interrupt_handler(shutdown.clone());

    let checker = DomainChecker::with_config(config.clone())?;
    let mut sink = make_sink(
        args.format,
        std::io::stdout(),
        config.verbose,
        &composition.keywords,
        &config.prefixes,
        &config.suffixes,
    );
    let stats = exec
        .resolve(checker, composition.domains, sink.as_mut())
        .await?;

    if args.show_stats {
        let summary = ui::stats_summary(&stats);
        if args.format.is_structured() {
            eprintln!("{}", summary);
        } else {
            println!("{}", summary);
        }
    }

    if shutdown.is_cancelled() {
        eprintln!("Interrupted after {} results", stats.total);
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(0)
}

/// Positional keywords first, then the input file's.
fn collect_keywords(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut keywords = args.keywords.clone();
    if let Some(path) = &args.input_file {
        keywords.extend(read_keywords_file(path)?);
    }
    if keywords.is_empty() {
        return Err("no keywords found".into());
    }
    Ok(keywords)
}

/// Unsafe-pattern warnings are only shown when verbose.
fn print_warnings(warnings: &[ComposeWarning], verbose: bool) {
    for warning in warnings {
        if matches!(warning, ComposeWarning::UnsafePattern { .. }) && !verbose {
            continue;
        }
        eprintln!("{}", ui::warning_line(warning));
    }
}

fn print_dry_run(domains: &[String], format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json | OutputFormat::JsonArray => {
            println!("{}", serde_json::to_string_pretty(domains)?);
        }
        OutputFormat::JsonStream => {
            for d in domains {
                println!("{}", serde_json::to_string(d)?);
            }
        }
        _ => {
            for d in domains {
                println!("{}", d);
            }
        }
    }
    eprintln!("{} domains would be checked", domains.len());
    Ok(())
}

/// First Ctrl-C stops dispatching new checks; in-flight ones wind down.
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping, waiting for in-flight checks...");
            shutdown.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tldx").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_lists_and_durations() {
        let args = parse(&[
            "rocket",
            "-t",
            "io,dev",
            "-p",
            "get",
            "--timeout",
            "500ms",
            "--initial-backoff",
            "1s",
            "-f",
            "json-stream",
        ]);
        assert_eq!(args.keywords, vec!["rocket"]);
        assert_eq!(args.tlds, Some(vec!["io".to_string(), "dev".to_string()]));
        assert_eq!(args.prefixes, Some(vec!["get".to_string()]));
        assert_eq!(args.timeout, Some(Duration::from_millis(500)));
        assert_eq!(args.initial_backoff, Some(Duration::from_secs(1)));
        assert_eq!(args.format, OutputFormat::JsonStream);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result = Args::try_parse_from(["tldx", "rocket", "--timeout", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_parses() {
        let args = parse(&["show-tld-presets"]);
        assert_eq!(args.command, Some(Commands::ShowTldPresets));
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args() {
        assert!(validate_args(&parse(&[])).is_err());
        assert!(validate_args(&parse(&["rocket"])).is_ok());
        assert!(validate_args(&parse(&["rocket", "-m", "0"])).is_err());
        assert!(validate_args(&parse(&["rocket", "-c", "1001"])).is_err());
        assert!(validate_args(&parse(&["rocket", "-c", "0"])).is_ok());
        assert!(validate_args(&parse(&["rocket", "--backoff-factor", "0.5"])).is_err());
        assert!(validate_args(&parse(&[
            "rocket",
            "--initial-backoff",
            "3s",
            "--max-backoff",
            "1s"
        ]))
        .is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = CheckConfig {
            tlds: vec!["com".to_string()],
            concurrency: 15,
            ..CheckConfig::default()
        };
        let args = parse(&["rocket", "-t", "io", "-c", "4", "-m", "12", "-a"]);
        apply_args(&mut config, &args);

        assert_eq!(config.tlds, vec!["io"]);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_domain_length, Some(12));
        assert!(config.only_available);
        assert!(!config.regex_mode);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut config = CheckConfig::default().with_prefixes(vec!["my".to_string()]);
        config.verbose = true;
        apply_args(&mut config, &parse(&["rocket"]));
        assert_eq!(config.prefixes, vec!["my"]);
        assert!(config.verbose);
    }
}
