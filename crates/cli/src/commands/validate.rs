//! `validate` command implementation.

use anyhow::{Context, Result};
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
    model_name: String,
    model_description: String,
    tracker_variant: String,
    detector_kind: String,
    loop_frequency_hz: f64,
    log_tap_count: usize,
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

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

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
                    version: format!("{:?}", blueprint.version),
                    model_name: blueprint.model.name.clone(),
                    model_description: blueprint.model.description_path().display().to_string(),
                    tracker_variant: format!("{:?}", blueprint.tracker.variant),
                    detector_kind: format!("{:?}", blueprint.detector.kind),
                    loop_frequency_hz: blueprint.pacing.frequency_hz,
                    log_tap_count: blueprint.channels.log_taps.len(),
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
fn collect_warnings(blueprint: &contracts::TrackerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Outputs with no consumers are skipped entirely
    if blueprint.channels.log_taps.is_empty() {
        warnings.push(
            "No log taps configured - channel payloads are only visible via metrics".to_string(),
        );
    }

    // A feed slower than the loop means iterations reprocess stale frames
    if blueprint.feed.frequency_hz < blueprint.pacing.frequency_hz {
        warnings.push(format!(
            "Feed frequency ({} Hz) is below loop frequency ({} Hz) - iterations will reprocess stale frames",
            blueprint.feed.frequency_hz, blueprint.pacing.frequency_hz
        ));
    }

    // The run command fails fatally on a missing description; surface it early
    if !blueprint.model.description_path().exists() {
        warnings.push(format!(
            "Model description not found at '{}' - the run command will fail at startup",
            blueprint.model.description_path().display()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Model: {}", summary.model_name);
            println!("  Description: {}", summary.model_description);
            println!("  Tracker: {}", summary.tracker_variant);
            println!("  Detector: {}", summary.detector_kind);
            println!("  Loop frequency: {} Hz", summary.loop_frequency_hz);
            println!("  Log taps: {}", summary.log_tap_count);
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
