//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ledger engine policy.
    pub ledger: LedgerConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Ledger engine policy knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Refuse to close a fiscal period whose trial balance is not balanced.
    pub require_balanced_close: bool,
    /// First calendar month (1-12) of a generated fiscal year.
    pub fiscal_year_start_month: u32,
    /// Value recorded as `module_source` on reversing entries.
    pub reversal_module_source: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            require_balanced_close: true,
            fiscal_year_start_month: 1,
            reversal_module_source: default_reversal_module_source(),
        }
    }
}

fn default_reversal_module_source() -> String {
    "general_ledger".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "ledgerline=info,ledgerline_core=info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `LEDGERLINE__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("LEDGERLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
