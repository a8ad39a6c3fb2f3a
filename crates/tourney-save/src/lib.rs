//! Save-archive codec for tournament matches.
//!
//! Opens the zip container the game exports and extracts match entities from
//! the XML document inside. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! let bytes = std::fs::read("match_426504721_round2.zip").unwrap();
//! let extracted = tourney_save::load(&bytes).unwrap();
//! println!(
//!   "{} players, {} tiles, final turn {}",
//!   extracted.players.len(),
//!   extracted.tiles.len(),
//!   extracted.meta.final_turn,
//! );
//! ```

mod archive;
pub mod error;
mod extract;

pub use archive::{SaveDocument, read_archive};
pub use error::{Error, Result};
use tourney_core::model::ExtractedMatch;

/// Extract match entities from an uncompressed save document.
pub fn extract(xml: &[u8]) -> Result<ExtractedMatch> { extract::extract(xml) }

/// Open a save archive and extract its match entities.
pub fn load(archive_bytes: &[u8]) -> Result<ExtractedMatch> {
  let document = read_archive(archive_bytes)?;
  tracing::debug!(entry = %document.entry_name, bytes = document.xml.len(), "read save document");
  extract(&document.xml)
}
