//! Zip container access.

use std::io::{Cursor, Read as _};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// The single XML document pulled out of a save archive.
pub struct SaveDocument {
  /// Name of the entry inside the archive.
  pub entry_name: String,
  pub xml:        Vec<u8>,
}

/// Open a zip archive held in memory and return its only `.xml` entry.
pub fn read_archive(bytes: &[u8]) -> Result<SaveDocument> {
  let mut archive = ZipArchive::new(Cursor::new(bytes))?;

  let mut names: Vec<String> = archive
    .file_names()
    .filter(|name| name.to_ascii_lowercase().ends_with(".xml"))
    .map(str::to_owned)
    .collect();

  let entry_name = match names.len() {
    0 => return Err(Error::NoDocument),
    1 => names.remove(0),
    _ => {
      names.sort();
      return Err(Error::MultipleDocuments(names));
    }
  };

  let mut entry = archive.by_name(&entry_name)?;
  let mut xml = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
  entry.read_to_end(&mut xml)?;

  Ok(SaveDocument { entry_name, xml })
}
