use anyhow::Context as _;
use serde::Deserialize;
use tracing_subscriber::{registry::LookupSpan, EnvFilter, Layer};

/// Output format of the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Environment variables read by [`Logs::from_env()`].
#[derive(Debug, Deserialize)]
struct LogsEnv {
    #[serde(default)]
    log_format: LogFormat,
    #[serde(default)]
    rust_log: Option<String>,
}

/// Logs configuration: output format and `tracing` filter directives.
#[derive(Debug, Clone, Default)]
pub struct Logs {
    format: LogFormat,
    log_directives: Option<String>,
}

impl Logs {
    /// Default filter used when no directives are provided.
    const DEFAULT_DIRECTIVES: &'static str = "info";

    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            log_directives: None,
        }
    }

    /// Reads `LOG_FORMAT` and `RUST_LOG` from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> anyhow::Result<Self> {
        let env: LogsEnv = envy::from_iter(vars).context("invalid logs configuration")?;
        Ok(Self {
            format: env.log_format,
            log_directives: env.rust_log,
        })
    }

    pub fn with_log_directives(mut self, log_directives: Option<String>) -> Self {
        self.log_directives = log_directives;
        self
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub(super) fn build_filter(&self) -> anyhow::Result<EnvFilter> {
        let directives = self
            .log_directives
            .as_deref()
            .unwrap_or(Self::DEFAULT_DIRECTIVES);
        EnvFilter::builder()
            .parse(directives)
            .with_context(|| format!("invalid log directives `{directives}`"))
    }

    pub(super) fn into_layer<S>(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
    {
        match self.format {
            LogFormat::Plain => tracing_subscriber::fmt::layer()
                .with_target(true)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .boxed(),
        }
    }

    /// Routes panics through `tracing` so that they end up in the same sink as other logs.
    pub(super) fn install_panic_hook(&self) {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("{info}");
            default_hook(info);
        }));
    }
}
