//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::EdiConfig;
use crate::domain::errors::EdiError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into EdiConfig
/// 4. Applies environment variable overrides (EDIFLOW_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use ediflow::config::loader::load_config;
///
/// let config = load_config("ediflow.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EdiConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EdiError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EdiError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text (substitution, overrides and validation included)
pub fn parse_config(contents: &str) -> Result<EdiConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: EdiConfig = toml::from_str(&contents)
        .map_err(|e| EdiError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        EdiError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| EdiError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(EdiError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using EDIFLOW_* prefix
///
/// Environment variables follow the pattern: EDIFLOW_<SECTION>_<KEY>
/// For example: EDIFLOW_APPLICATION_LOG_LEVEL, EDIFLOW_HTTP_BIND_ADDRESS
fn apply_env_overrides(config: &mut EdiConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("EDIFLOW_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("EDIFLOW_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Store overrides
    if let Ok(val) = std::env::var("EDIFLOW_STORE_RECORDS_PATH") {
        config.store.records_path = Some(val);
    }
    if let Ok(val) = std::env::var("EDIFLOW_STORE_STATE_PATH") {
        config.store.state_path = Some(val);
    }

    // Processing overrides
    if let Ok(val) = std::env::var("EDIFLOW_PROCESSING_SPLIT_RECORDS_PER_FILE") {
        config.processing.split_records_per_file = parse_override(
            "EDIFLOW_PROCESSING_SPLIT_RECORDS_PER_FILE",
            &val,
        )?;
    }
    if let Ok(val) = std::env::var("EDIFLOW_PROCESSING_LOG_RETENTION_DAYS") {
        config.processing.log_retention_days =
            parse_override("EDIFLOW_PROCESSING_LOG_RETENTION_DAYS", &val)?;
    }
    if let Ok(val) = std::env::var("EDIFLOW_PROCESSING_CLAIM_LEASE_SECONDS") {
        config.processing.claim_lease_seconds =
            parse_override("EDIFLOW_PROCESSING_CLAIM_LEASE_SECONDS", &val)?;
    }
    if let Ok(val) = std::env::var("EDIFLOW_PROCESSING_SCRATCH_DIR") {
        config.processing.scratch_dir = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("EDIFLOW_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("EDIFLOW_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("EDIFLOW_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    // HTTP overrides
    if let Ok(val) = std::env::var("EDIFLOW_HTTP_BIND_ADDRESS") {
        config.http.bind_address = val;
    }
    if let Ok(val) = std::env::var("EDIFLOW_HTTP_ROUTE") {
        config.http.route = val;
    }

    Ok(())
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EdiError::Configuration(format!("Invalid value for {name}: '{value}'")))
}
