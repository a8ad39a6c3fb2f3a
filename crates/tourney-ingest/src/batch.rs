//! Importing many archives at once.
//!
//! Archives are extracted concurrently, bounded by the worker count. A failed
//! archive is reported and the batch carries on with the rest.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use tokio::{sync::Semaphore, task::JoinSet};
use tourney_core::winner::OverrideTable;
use tourney_store_sqlite::SqliteStore;

use crate::{
  Error, Result,
  pipeline::{ImportOptions, ImportOutcome, import_archive},
};

/// Tournament match id embedded in an exported archive name, as in
/// `match_426504721_round2.zip`.
pub fn external_id_from_file_name(file_name: &str) -> Option<String> {
  let rest = file_name.strip_prefix("match_")?;
  let id: String = rest.chars().take_while(char::is_ascii_digit).collect();
  let after = &rest[id.len()..];
  let well_formed = after.starts_with('_') || after.eq_ignore_ascii_case(".zip");
  (!id.is_empty() && well_formed).then_some(id)
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
  pub force:       bool,
  /// Applied to every archive; only meaningful for a batch of one.
  pub external_id: Option<String>,
  pub workers:     usize,
  pub batch_rows:  usize,
}

#[derive(Debug)]
pub struct ArchiveReport {
  pub path:   PathBuf,
  pub result: Result<ImportOutcome>,
}

/// Per-archive results, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
  pub archives: Vec<ArchiveReport>,
}

impl BatchReport {
  pub fn imported(&self) -> usize {
    self
      .archives
      .iter()
      .filter(|a| matches!(a.result, Ok(ImportOutcome::Imported { .. })))
      .count()
  }

  pub fn skipped(&self) -> usize {
    self
      .archives
      .iter()
      .filter(|a| matches!(a.result, Ok(ImportOutcome::Skipped { .. })))
      .count()
  }

  pub fn failed(&self) -> impl Iterator<Item = (&Path, &Error)> {
    self
      .archives
      .iter()
      .filter_map(|a| a.result.as_ref().err().map(|e| (a.path.as_path(), e)))
  }
}

fn options_for(path: &Path, options: &BatchOptions) -> ImportOptions {
  let external_id = options.external_id.clone().or_else(|| {
    path
      .file_name()
      .and_then(|n| n.to_str())
      .and_then(external_id_from_file_name)
  });
  ImportOptions { force: options.force, external_id, batch_rows: options.batch_rows }
}

/// Import every archive in `paths`.
pub async fn import_batch(
  store: SqliteStore,
  paths: Vec<PathBuf>,
  overrides: Arc<OverrideTable>,
  options: BatchOptions,
) -> BatchReport {
  let limit = Arc::new(Semaphore::new(options.workers.max(1)));
  let mut tasks = JoinSet::new();

  for (position, path) in paths.iter().cloned().enumerate() {
    let store = store.clone();
    let limit = Arc::clone(&limit);
    let overrides = Arc::clone(&overrides);
    let import_options = options_for(&path, &options);

    tasks.spawn(async move {
      let _permit = limit.acquire_owned().await;
      let result = import_archive(&store, &path, overrides, import_options).await;
      if let Err(e) = &result {
        tracing::error!(path = %path.display(), error = %e, "archive import failed");
      }
      (position, ArchiveReport { path, result })
    });
  }

  let mut slots: Vec<Option<ArchiveReport>> = paths.iter().map(|_| None).collect();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((position, report)) => slots[position] = Some(report),
      Err(e) => tracing::error!(error = %e, "import task did not finish"),
    }
  }

  let archives = slots
    .into_iter()
    .zip(paths)
    .map(|(slot, path)| {
      slot.unwrap_or_else(|| ArchiveReport {
        result: Err(Error::Incomplete(path.clone())),
        path,
      })
    })
    .collect();
  BatchReport { archives }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fixture::{SaveBuilder, zip_save};

  #[test]
  fn external_id_is_read_from_archive_names() {
    assert_eq!(
      external_id_from_file_name("match_426504721_round2.zip").as_deref(),
      Some("426504721")
    );
    assert_eq!(external_id_from_file_name("match_7.zip").as_deref(), Some("7"));
    assert_eq!(external_id_from_file_name("match__x.zip"), None);
    assert_eq!(external_id_from_file_name("match_12abc.zip"), None);
    assert_eq!(external_id_from_file_name("OW-Save-Auto-42.zip"), None);
  }

  #[test]
  fn explicit_external_id_wins_over_file_name() {
    let options = BatchOptions {
      force:       false,
      external_id: Some("99".into()),
      workers:     1,
      batch_rows:  10,
    };
    let derived = options_for(Path::new("/saves/match_12_final.zip"), &options);
    assert_eq!(derived.external_id.as_deref(), Some("99"));

    let options = BatchOptions { external_id: None, ..options };
    let derived = options_for(Path::new("/saves/match_12_final.zip"), &options);
    assert_eq!(derived.external_id.as_deref(), Some("12"));
  }

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tourney-batch-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[tokio::test]
  async fn batch_continues_past_a_bad_archive() {
    let dir = scratch_dir("continues");
    let good = |name: &str| SaveBuilder::new(2, 3).game_name(name).player(0, "a").tiles(2);

    let first = dir.join("match_1_a.zip");
    let broken = dir.join("match_2_b.zip");
    let last = dir.join("match_3_c.zip");
    std::fs::write(&first, zip_save(&good("first"))).unwrap();
    std::fs::write(&broken, b"definitely not a zip").unwrap();
    std::fs::write(&last, zip_save(&good("last"))).unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let report = import_batch(
      store.clone(),
      vec![first.clone(), broken.clone(), last.clone(), dir.join("match_4_missing.zip")],
      Arc::new(OverrideTable::default()),
      BatchOptions { force: false, external_id: None, workers: 2, batch_rows: 100 },
    )
    .await;

    assert_eq!(report.imported(), 2);
    assert_eq!(report.skipped(), 0);
    let failed: Vec<&Path> = report.failed().map(|(path, _)| path).collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0], broken.as_path());
    assert_eq!(report.archives[0].path, first);
    assert_eq!(report.archives[2].path, last);
    assert_eq!(store.count_matches().await.unwrap(), 2);

    let stored = store
      .get_match(report.archives[2].result.as_ref().unwrap().match_id())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.external_id.as_deref(), Some("3"));

    std::fs::remove_dir_all(dir).ok();
  }

  #[tokio::test]
  async fn duplicate_archives_in_one_batch_import_once() {
    let dir = scratch_dir("duplicates");
    let bytes = zip_save(&SaveBuilder::new(2, 2).player(0, "a").tiles(1));
    let one = dir.join("match_5_a.zip");
    let two = dir.join("match_5_copy.zip");
    std::fs::write(&one, &bytes).unwrap();
    std::fs::write(&two, &bytes).unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let report = import_batch(
      store.clone(),
      vec![one, two],
      Arc::new(OverrideTable::default()),
      BatchOptions { force: false, external_id: None, workers: 1, batch_rows: 100 },
    )
    .await;

    assert_eq!(report.imported(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(store.count_matches().await.unwrap(), 1);

    std::fs::remove_dir_all(dir).ok();
  }
}
