use std::path::PathBuf;
use std::sync::Arc;

use crate::compiler::{FileOutcome, Pipeline};
use crate::logger::ProgressLine;

/// Build files in parallel using rayon.
///
/// With `progress` a counter replaces the per-file lines.
pub(super) async fn build_batch(
    pipeline: Arc<Pipeline>,
    paths: Vec<PathBuf>,
    progress: bool,
) -> Vec<FileOutcome> {
    use rayon::prelude::*;

    tokio::task::spawn_blocking(move || {
        let progress = progress.then(|| ProgressLine::new("files", paths.len()));
        let outcomes: Vec<_> = paths
            .par_iter()
            .map(|path| {
                let outcome = pipeline.run(path);
                if let Some(progress) = &progress {
                    progress.inc();
                }
                outcome
            })
            .collect();
        if let Some(progress) = progress {
            progress.finish();
        }
        outcomes
    })
    .await
    .unwrap_or_default()
}

/// Drop deleted sources.
pub(super) async fn remove_batch(pipeline: Arc<Pipeline>, paths: Vec<PathBuf>) -> Vec<FileOutcome> {
    tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .map(|path| {
                let outcome = pipeline.remove(path);
                pipeline.gate().mark_done(outcome.key());
                outcome
            })
            .collect()
    })
    .await
    .unwrap_or_default()
}
