//!  The `tracing` module provides functionalities for setting up and configuring logging.
//!
//!  The module's primary entry point is the [`EmberTracer`] struct, which writes to stdout in one
//!  of the [`LogFormat`]s.
//!
//!  # Examples
//!
//!  Basic usage:
//!
//!  ```
//!  use ember_tracing::{
//!      LayerInfo, EmberTracer, Tracer,
//!      tracing::level_filters::LevelFilter,
//!      LogFormat,
//!  };
//!
//!  fn main() -> eyre::Result<()> {
//!      let tracer = EmberTracer::new().with_stdout(LayerInfo::new(
//!          LogFormat::Json,
//!          LevelFilter::INFO.to_string(),
//!          "payload_builder=debug".to_string(),
//!          None,
//!      ));
//!
//!      tracer.init()?;
//!
//!      // Your application logic here
//!
//!      Ok(())
//!  }
//!  ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-export tracing crates
pub use tracing;
pub use tracing_subscriber;

// Re-export our types
pub use formatter::LogFormat;
pub use test_tracer::TestTracer;

mod formatter;
mod test_tracer;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

///  Tracer for application logging.
///
///  Manages the configuration and initialization of the stdout logging layer.
#[derive(Debug, Clone, Default)]
pub struct EmberTracer {
    stdout: LayerInfo,
}

impl EmberTracer {
    ///  Constructs a new `Tracer` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    ///  Sets a custom configuration for the stdout layer.
    ///
    ///  # Arguments
    ///  * `config` - The `LayerInfo` to use for the stdout layer.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }
}

///  Configuration for a logging layer.
///
///  This struct holds configuration parameters for a tracing layer, including
///  the format, filtering directives, optional coloring, and directive.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    ///  Constructs a new `LayerInfo`.
    ///
    ///  # Arguments
    ///  * `format` - Specifies the format for log messages. Possible values are:
    ///      - `LogFormat::Json` for JSON formatting.
    ///      - `LogFormat::LogFmt` for logfmt (key=value) formatting.
    ///      - `LogFormat::Terminal` for human-readable, terminal-friendly formatting.
    ///  * `default_directive` - Directive for filtering log messages.
    ///  * `filters` - Additional filtering parameters as a string.
    ///  * `color` - Optional color configuration for the log messages.
    pub const fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }
}

impl Default for LayerInfo {
    ///  Provides default values for `LayerInfo`.
    ///
    ///  By default, it uses terminal format, INFO level filter,
    ///  no additional filters, and no color configuration.
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// Trait defining a general interface for logging configuration.
///
/// The `Tracer` trait provides a standardized way to initialize logging configurations
/// in an application. Implementations of this trait can specify different logging setups,
/// such as standard output logging or custom logging configurations tailored for specific
/// environments (like testing).
pub trait Tracer {
    /// Initialize the logging configuration.
    fn init(self) -> eyre::Result<()>;
}

impl Tracer for EmberTracer {
    ///  Installs the stdout layer as the global subscriber.
    fn init(self) -> eyre::Result<()> {
        let filter =
            build_env_filter(self.stdout.default_directive.parse()?, &self.stdout.filters)?;
        let layer = self.stdout.format.apply(filter, self.stdout.color);

        // The error is returned if the global default subscriber is already set,
        // so it's safe to ignore it
        let _ = tracing_subscriber::registry().with(layer).try_init().inspect_err(|e| {
            tracing::warn!(%e, "Tracing subscriber could not be initialized.")
        });
        Ok(())
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG`, falling back to `default_directive`, with the comma
/// separated `directives` added on top.
fn build_env_filter(default_directive: Directive, directives: &str) -> eyre::Result<EnvFilter> {
    let env_filter =
        EnvFilter::builder().with_default_directive(default_directive).from_env_lossy();

    directives
        .split(',')
        .filter(|directive| !directive.is_empty())
        .try_fold(env_filter, |env_filter, directive| {
            Ok(env_filter.add_directive(directive.parse()?))
        })
}

///  Initializes a tracing subscriber for tests.
///
///  The filter is configurable via `RUST_LOG`.
///
///  # Note
///
///  The subscriber will silently fail if it could not be installed.
pub fn init_test_tracing() {
    let _ = TestTracer::default().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_directives() {
        let filter =
            build_env_filter(LevelFilter::INFO.into(), "payload_builder=debug,gc=trace").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

        assert!(build_env_filter(LevelFilter::INFO.into(), "payload_builder=loud").is_err());
    }

    #[test]
    fn test_tracer_initializes_twice() {
        init_test_tracing();
        init_test_tracing();
        assert!(TestTracer::default().init().is_ok());
    }
}
