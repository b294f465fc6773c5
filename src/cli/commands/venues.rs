//! Venues command: metadata and configuration status.

use anyhow::Result;
use std::path::Path;
use trailguard_broker::VenueMetadata;
use trailguard_config::load_config;
use trailguard_core::types::Venue;

pub async fn run(config_path: &Path) -> Result<()> {
    let configured = match load_config(config_path) {
        Ok(config) => config.configured_venues(),
        // Metadata is static; show it even without a readable config.
        Err(_) => Vec::new(),
    };

    println!(
        "{:<22} {:>10} {:>10} {:>11} {:<30} {}",
        "VENUE", "MAX LEV", "MARGIN", "COMMISSION", "ASSETS", "CONFIGURED"
    );
    for venue in Venue::ALL {
        let meta = VenueMetadata::for_venue(venue);
        println!(
            "{:<22} {:>9}x {:>10} {:>10}% {:<30} {}",
            venue.to_string(),
            meta.max_leverage,
            meta.margin_required,
            meta.commission,
            meta.asset_types.join(", "),
            if configured.contains(&venue) { "yes" } else { "no" }
        );
    }

    Ok(())
}
