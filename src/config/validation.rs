use crate::calendar::JalaliDate;
use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SourceConfig, UserAgentConfig,
};
use crate::taxonomy::TopicOverride;
use crate::ConfigError;
use chrono::FixedOffset;
use scraper::Selector;
use url::Url;

/// Placeholders every listing URL template must contain
const LISTING_PLACEHOLDERS: [&str; 4] = ["{page}", "{year}", "{month}", "{day}"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    validate_topic_overrides(&config.topic_overrides)?;
    Ok(())
}

/// Validates the archive source
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    for placeholder in LISTING_PLACEHOLDERS {
        if !config.listing_url.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "listing-url must contain {}, got '{}'",
                placeholder, config.listing_url
            )));
        }
    }

    let sample = config
        .listing_url
        .replace("{page}", "1")
        .replace("{year}", "1399")
        .replace("{month}", "1")
        .replace("{day}", "1");
    Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-url: {}", e)))?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_articles < 1 || config.max_concurrent_articles > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_articles must be between 1 and 64, got {}",
            config.max_concurrent_articles
        )));
    }

    if config.retry_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be at most 10, got {}",
            config.retry_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    parse_utc_offset(&config.timezone)?;

    JalaliDate::from_yyyymmdd(config.earliest_date).map_err(|_| {
        ConfigError::Validation(format!(
            "earliest_date must be a valid YYYYMMDD date, got {}",
            config.earliest_date
        ))
    })?;

    if config.max_range_days < 1 {
        return Err(ConfigError::Validation(
            "max_range_days must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Parses a UTC offset of the form `+HH:MM` or `-HH:MM`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!(
            "timezone must look like +03:30 or -05:00, got '{}'",
            value
        ))
    };

    let value = value.trim();
    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.raw_archive_dir.is_empty() {
        return Err(ConfigError::Validation(
            "raw_archive_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that every selector parses
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.listing_link,
        &config.title,
        &config.body,
        &config.summary,
        &config.author,
        &config.sub_topic,
        &config.topic_link,
        &config.published,
    ] {
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.clone(),
            message: format!("{:?}", e),
        })?;
    }
    Ok(())
}

/// Validates configured topic override rows
fn validate_topic_overrides(overrides: &[TopicOverride]) -> Result<(), ConfigError> {
    for rule in overrides {
        if rule.code.trim().is_empty() {
            return Err(ConfigError::Validation(
                "topic-override code cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
