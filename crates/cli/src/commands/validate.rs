//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::LinkConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    probe_count: usize,
    require_sync: bool,
    export_format: String,
    export_layout: String,
    sensor_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    probe_count: config.clock_sync.probe_count,
                    require_sync: config.clock_sync.require_sync,
                    export_format: config.export.format.extension().to_string(),
                    export_layout: format!("{:?}", config.export.layout),
                    sensor_count: config.simulation.sensors.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &LinkConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.simulation.sensors.is_empty() {
        warnings.push("No simulated sensors - simulate will record nothing".to_string());
    }

    if !config.clock_sync.require_sync {
        warnings.push(
            "clock_sync.require_sync is false - recordings may keep raw watch timestamps"
                .to_string(),
        );
    }

    if config.clock_sync.probe_count == 1 {
        warnings.push("A single probe gives no protection against a slow reply".to_string());
    }

    if config.session.persist_batch_size > config.session.inbound_queue_capacity {
        warnings.push(format!(
            "session.persist_batch_size ({}) exceeds inbound_queue_capacity ({})",
            config.session.persist_batch_size, config.session.inbound_queue_capacity
        ));
    }

    if config.simulation.corrupt_every > 0 {
        warnings.push(format!(
            "Simulation corrupts every {} data message(s)",
            config.simulation.corrupt_every
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Probes per batch: {}", summary.probe_count);
            println!("  Sync required: {}", summary.require_sync);
            println!(
                "  Export: {} ({})",
                summary.export_format, summary.export_layout
            );
            println!("  Simulated sensors: {}", summary.sensor_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn validate_file(content: &str) -> ValidationResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{content}").unwrap();
        validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        })
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let result = validate_file("[clock_sync]\nrequire_sync = false\n");
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("require_sync")));
        assert_eq!(result.summary.unwrap().export_format, "csv");
    }

    #[test]
    fn test_invalid_file_reports_field() {
        let result = validate_file("[clock_sync]\nprobe_count = 0\n");
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("clock_sync.probe_count"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/wear-sync.toml".into(),
            json: true,
        });
        assert!(!result.valid);
        assert!(result.summary.is_none());
    }
}
