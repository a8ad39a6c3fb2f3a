//! Error types for the save-file codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("archive error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("archive contains no .xml document")]
  NoDocument,

  #[error("archive contains more than one .xml document: {0:?}")]
  MultipleDocuments(Vec<String>),

  #[error("xml error: {0}")]
  Xml(String),

  #[error("<{element}> is missing required attribute {attribute}")]
  MissingAttribute {
    element:   &'static str,
    attribute: &'static str,
  },

  #[error("save is missing required element {0}")]
  MissingElement(&'static str),

  #[error("invalid number in {context}: {value:?}")]
  InvalidNumber { context: String, value: String },

  #[error("expected a turn element like <T12>, found <{0}>")]
  InvalidTurnTag(String),

  #[error("tile {tile} has unknown owner value {value}")]
  InvalidOwner { tile: u32, value: i64 },

  #[error("player id {0} appears more than once")]
  DuplicatePlayer(u32),

  #[error("player ids are not contiguous: expected id {expected}, found {found}")]
  PlayerGap { expected: u32, found: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
