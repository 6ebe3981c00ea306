use crate::config::types::{
    BrowserSettings, Config, CrawlerConfig, OutputConfig, ProbeConfig, ServerConfig,
};
use crate::{ConfigError, ConfigResult};
use std::net::SocketAddr;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_probe_config(&config.probe)?;
    validate_browser_settings(&config.browser)?;
    validate_output_config(&config.output)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.load_timeout_secs < 1 || config.load_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "load_timeout_secs must be between 1 and 300, got {}",
            config.load_timeout_secs
        )));
    }

    for (name, value) in [
        ("menu_settle_ms", config.menu_settle_ms),
        ("scroll_settle_ms", config.scroll_settle_ms),
        ("mark_settle_ms", config.mark_settle_ms),
    ] {
        if value > 10_000 {
            return Err(ConfigError::Validation(format!(
                "{} must be <= 10000ms, got {}ms",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates probe configuration
fn validate_probe_config(config: &ProbeConfig) -> ConfigResult<()> {
    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > 60 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and 60, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.request_timeout_secs < config.connect_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs ({}) must be >= connect_timeout_secs ({})",
            config.request_timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser settings
fn validate_browser_settings(config: &BrowserSettings) -> ConfigResult<()> {
    if config.window_width < 200 || config.window_height < 200 {
        return Err(ConfigError::Validation(format!(
            "window size must be at least 200x200, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    if let Some(path) = &config.chrome_executable {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "chrome_executable cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.report_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "report_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates server configuration
fn validate_server_config(config: &ServerConfig) -> ConfigResult<()> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("bind '{}' is not a socket address: {}", config.bind, e))
    })?;

    Ok(())
}
