//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    model: ModelInfo,
    tracker: TrackerInfo,
    pacing: LoopInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<ChannelsInfo>,
    feed: FeedInfo,
}

#[derive(Serialize)]
struct ModelInfo {
    name: String,
    path: String,
    description_path: String,
}

#[derive(Serialize)]
struct TrackerInfo {
    variant: String,
    detector: String,
    reference_frame: String,
}

#[derive(Serialize)]
struct LoopInfo {
    frequency_hz: f64,
    period_ms: f64,
    debug_display: bool,
}

#[derive(Serialize)]
struct ChannelsInfo {
    queue_capacity: usize,
    log_taps: Vec<String>,
}

#[derive(Serialize)]
struct FeedInfo {
    frequency_hz: f64,
    image_width: u32,
    image_height: u32,
    message: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::TrackerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let channels = if args.channels {
        Some(ChannelsInfo {
            queue_capacity: blueprint.channels.queue_capacity,
            log_taps: blueprint
                .channels
                .log_taps
                .iter()
                .map(|tap| tap.as_str().to_string())
                .collect(),
        })
    } else {
        None
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        model: ModelInfo {
            name: blueprint.model.name.clone(),
            path: blueprint.model.path.clone(),
            description_path: blueprint.model.description_path().display().to_string(),
        },
        tracker: TrackerInfo {
            variant: format!("{:?}", blueprint.tracker.variant),
            detector: format!("{:?}", blueprint.detector.kind),
            reference_frame: blueprint.tracker.reference_frame.clone(),
        },
        pacing: LoopInfo {
            frequency_hz: blueprint.pacing.frequency_hz,
            period_ms: blueprint.pacing.period().as_secs_f64() * 1000.0,
            debug_display: blueprint.pacing.debug_display,
        },
        channels,
        feed: FeedInfo {
            frequency_hz: blueprint.feed.frequency_hz,
            image_width: blueprint.feed.image_width,
            image_height: blueprint.feed.image_height,
            message: blueprint.feed.message.clone(),
        },
    }
}

fn print_config_info(blueprint: &contracts::TrackerBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Pattern Tracker Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Model info
    println!("🧩 Model");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.model.name);
    println!(
        "   └─ Description: {}",
        blueprint.model.description_path().display()
    );

    // Tracker
    println!("\n🎯 Tracker");
    println!("   ├─ Variant: {:?}", blueprint.tracker.variant);
    println!("   ├─ Detector: {:?}", blueprint.detector.kind);
    println!(
        "   └─ Reference frame: {}",
        blueprint.tracker.reference_frame
    );

    // Loop pacing
    println!("\n⚙️  Loop");
    println!("   ├─ Frequency: {} Hz", blueprint.pacing.frequency_hz);
    println!(
        "   ├─ Period: {:.2} ms",
        blueprint.pacing.period().as_secs_f64() * 1000.0
    );
    println!("   └─ Debug display: {}", blueprint.pacing.debug_display);

    // Channels
    if args.channels {
        println!("\n📤 Channels");
        println!(
            "   ├─ Queue capacity: {}",
            blueprint.channels.queue_capacity
        );
        if blueprint.channels.log_taps.is_empty() {
            println!("   └─ Log taps: (none)");
        } else {
            for (i, tap) in blueprint.channels.log_taps.iter().enumerate() {
                let is_last = i == blueprint.channels.log_taps.len() - 1;
                let prefix = if is_last { "└─" } else { "├─" };
                println!("   {} Log tap: {}", prefix, tap.as_str());
            }
        }
    }

    // Feed
    println!("\n📷 Feed");
    println!("   ├─ Frequency: {} Hz", blueprint.feed.frequency_hz);
    println!(
        "   ├─ Image: {}x{}",
        blueprint.feed.image_width, blueprint.feed.image_height
    );
    println!("   └─ Message: {}", blueprint.feed.message);

    println!();
}
