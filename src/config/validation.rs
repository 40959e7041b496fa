use crate::config::types::{
    Config, FetchConfig, HarvestConfig, OutputConfig, RetailerEntry, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    validate_retailers(&config.retailers)?;
    Ok(())
}

/// Validates downloader pool configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.frontier_capacity < 1 {
        return Err(ConfigError::Validation(
            "frontier_capacity must be >= 1".to_string(),
        ));
    }

    if config.max_filename_len < 1 {
        return Err(ConfigError::Validation(
            "max_filename_len must be >= 1".to_string(),
        ));
    }

    if config.swatch_marker.is_empty() {
        return Err(ConfigError::Validation(
            "swatch_marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.per_domain_parallelism < 1 {
        return Err(ConfigError::Validation(format!(
            "per_domain_parallelism must be >= 1, got {}",
            config.per_domain_parallelism
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if matches!(config.cache_dir.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "cache_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.extension.is_empty() || !config.extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ConfigError::Validation(format!(
            "extension must be non-empty and alphanumeric, got '{}'",
            config.extension
        )));
    }

    Ok(())
}

/// Validates retailer entries
fn validate_retailers(retailers: &[RetailerEntry]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for entry in retailers {
        validate_retailer_name(&entry.name)?;

        if !names.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate retailer name '{}'",
                entry.name
            )));
        }

        if entry.product_path.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Retailer '{}' must set a product-path",
                entry.name
            )));
        }

        for selector in [
            &entry.root_category_selector,
            &entry.product_selector,
            &entry.next_page_selector,
            &entry.image_selector,
        ] {
            validate_selector(selector)?;
        }

        if entry.root_pages.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Retailer '{}' must have at least one root page",
                entry.name
            )));
        }

        for page in &entry.root_pages {
            let url = Url::parse(page).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid root page '{}': {}", page, e))
            })?;

            if url.scheme() != "https" && url.scheme() != "http" {
                return Err(ConfigError::Validation(format!(
                    "Root page '{}' must use HTTP or HTTPS",
                    page
                )));
            }
        }
    }

    Ok(())
}

/// Retailer names become directory names, so keep them path-safe
fn validate_retailer_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Retailer name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Retailer name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
