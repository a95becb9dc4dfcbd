//! Sorts images into folders by anomaly score, records per-folder statistics,
//! and renders index-annotated contact-sheet posters of each folder.

pub mod annotate;
pub mod classify;
pub mod config;
pub mod error;
pub mod organizer;
pub mod poster;
pub mod predictions;
pub mod relocate;
pub mod stats;
pub mod thresholds;

pub use error::{OrganizerError, Result};

/// Installs the fmt subscriber used by the binaries. `RUST_LOG` wins over
/// the default level.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
