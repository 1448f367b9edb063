//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("repository.api_base_url", "https://api.github.com")?
        .set_default("repository.branch", "main")?
        .set_default("repository.connect_timeout_secs", 10)?
        .set_default("repository.request_timeout_secs", 60)?
        .set_default("build.default_variant", "debug")?
        .set_default("build.poll_interval_secs", 10)?
        .set_default("build.max_poll_attempts", 180)?
        .set_default("build.run_discovery_attempts", 10)?
        .set_default("build.run_discovery_delay_ms", 3000)
}
