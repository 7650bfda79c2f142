//! Configuration validation
//!
//! Rules:
//! - model name and path non-empty
//! - loop frequency_hz > 0
//! - feed frequency_hz > 0, image dimensions non-zero and bounded
//! - channel queue_capacity > 0
//! - log_taps contain no duplicates
//! - reference_frame non-empty

use std::collections::HashSet;

use contracts::{TrackError, TrackerBlueprint};

/// Upper bound on feed image dimensions (pixels per side)
const MAX_IMAGE_DIM: u32 = 8192;

/// Validate a TrackerBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    validate_model(blueprint)?;
    validate_tracker(blueprint)?;
    validate_pacing(blueprint)?;
    validate_channels(blueprint)?;
    validate_feed(blueprint)?;
    Ok(())
}

fn validate_model(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    if blueprint.model.name.is_empty() {
        return Err(TrackError::config_validation(
            "model.name",
            "model name cannot be empty",
        ));
    }
    if blueprint.model.path.is_empty() {
        return Err(TrackError::config_validation(
            "model.path",
            "model path cannot be empty",
        ));
    }
    Ok(())
}

fn validate_tracker(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    if blueprint.tracker.reference_frame.is_empty() {
        return Err(TrackError::config_validation(
            "tracker.reference_frame",
            "reference_frame cannot be empty",
        ));
    }
    Ok(())
}

fn validate_pacing(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    let freq = blueprint.pacing.frequency_hz;
    if !freq.is_finite() || freq <= 0.0 {
        return Err(TrackError::config_validation(
            "loop.frequency_hz",
            format!("frequency_hz must be > 0, got {freq}"),
        ));
    }
    Ok(())
}

fn validate_channels(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    if blueprint.channels.queue_capacity == 0 {
        return Err(TrackError::config_validation(
            "channels.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }

    let mut seen = HashSet::new();
    for tap in &blueprint.channels.log_taps {
        if !seen.insert(tap) {
            return Err(TrackError::config_validation(
                format!("channels.log_taps[{}]", tap.as_str()),
                "duplicate log tap",
            ));
        }
    }
    Ok(())
}

fn validate_feed(blueprint: &TrackerBlueprint) -> Result<(), TrackError> {
    let feed = &blueprint.feed;
    if !feed.frequency_hz.is_finite() || feed.frequency_hz <= 0.0 {
        return Err(TrackError::config_validation(
            "feed.frequency_hz",
            format!("frequency_hz must be > 0, got {}", feed.frequency_hz),
        ));
    }
    if feed.image_width == 0 || feed.image_height == 0 {
        return Err(TrackError::config_validation(
            "feed.image_width / feed.image_height",
            "image dimensions must be non-zero",
        ));
    }
    if feed.image_width > MAX_IMAGE_DIM || feed.image_height > MAX_IMAGE_DIM {
        return Err(TrackError::config_validation(
            "feed.image_width / feed.image_height",
            format!("image dimensions must be <= {MAX_IMAGE_DIM}"),
        ));
    }
    Ok(())
}
