//! # tldx library
//!
//! Domain-name brainstorming and availability checking.
//!
//! The crate has two halves:
//!
//! - **Candidate generation**: [`pattern`] expands bracket/brace patterns,
//!   [`validate`] checks syntax and splits off public suffixes,
//!   [`presets`] holds named TLD bundles, and [`Composer`] combines
//!   keywords, affixes and TLDs into a deduplicated candidate list.
//! - **Resolution**: [`DomainChecker`] walks the RDAP, DNS, WHOIS fallback
//!   chain for one domain under a deadline with jittered retries, and
//!   [`ConcurrentProcessor`] streams results from a bounded worker pool.
//!
//! [`Exec`] wires the two together and forwards results to a [`ResultSink`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tldx_lib::{CheckConfig, DomainResult, Exec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CheckConfig::default()
//!         .with_prefixes(vec!["get".into()])
//!         .with_preset("popular");
//!
//!     let mut results: Vec<DomainResult> = Vec::new();
//!     Exec::new(config).run(&["rocket"], &mut results).await?;
//!
//!     for result in results.iter().filter(|r| r.is_available()) {
//!         println!("{} is available", result.domain);
//!     }
//!     Ok(())
//! }
//! ```

pub use checker::DomainChecker;
pub use composer::{ComposeWarning, Composer, Composition};
pub use concurrent::ConcurrentProcessor;
pub use config::{
    load_env_config, parse_duration, resolve_config, ConfigManager, DefaultsConfig, EnvConfig,
    FileConfig, MAX_CONCURRENCY,
};
pub use error::{DomainCheckError, ErrorClass};
pub use exec::{is_displayed, read_keywords_file, Exec, ResultSink, RunReport, RunStats};
pub use presets::{default_tld_presets, tld_store, PresetStore};
pub use protocols::Lookup;
pub use retry::RetryPolicy;
pub use types::{
    CheckConfig, CheckMethod, CheckResult, DomainInfo, DomainResult, PatternErrorPolicy,
};

pub mod pattern;
pub mod presets;
pub mod protocols;
pub mod validate;

mod checker;
mod composer;
mod concurrent;
mod config;
mod error;
mod exec;
mod retry;
mod types;

pub type Result<T> = std::result::Result<T, DomainCheckError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
