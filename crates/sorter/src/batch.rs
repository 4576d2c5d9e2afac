use std::path::PathBuf;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{info, warn};

use crate::ffprobe::Prober;
use crate::metadata::{self, MediaDuration};
use crate::pipeline::{ClassificationResult, MediaClassifier};
use crate::router::{FileRouter, RouteOutcome};
use crate::scan::MediaFile;
use crate::sniff::ImageInspector;

/// Classification and routing of one file
#[derive(Debug)]
pub struct FileOutcome {
    pub result: ClassificationResult,
    pub route: RouteOutcome,
}

/// Everything that happened during one run
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn moved(&self) -> usize {
        self.count(|r| matches!(r, RouteOutcome::Moved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, RouteOutcome::Left { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, RouteOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&RouteOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.route)).count()
    }
}

/// Classify and route every file; per-file problems never stop the batch
///
/// With `jobs <= 1` each file is fully handled before the next one starts.
/// Larger values probe up to `jobs` files at once while moves into the same
/// directory stay serialized. Outcomes keep the input order either way.
pub async fn run_batch<P, I>(
    classifier: &MediaClassifier<P, I>,
    router: &FileRouter,
    files: &[MediaFile],
    jobs: usize,
) -> BatchReport
where
    P: Prober,
    I: ImageInspector,
{
    let started_at = Utc::now();
    // One at a time, in input order
    let outcomes = if jobs <= 1 {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            info!("Processing: {}", file.path.display());
            let result = classifier.classify(&file.path, file.media_type).await;
            let route = router.route(&result);
            log_outcome(&route);
            outcomes.push(FileOutcome { result, route });
        }
        outcomes
    } else {
        // Probes overlap; buffered keeps results in input order
        stream::iter(files)
            .map(|file| async move {
                info!("Processing: {}", file.path.display());
                let result = classifier.classify(&file.path, file.media_type).await;
                let route = router.route_serialized(&result).await;
                log_outcome(&route);
                FileOutcome { result, route }
            })
            .buffered(jobs)
            .collect::<Vec<_>>()
            .await
    };

    let report = BatchReport {
        outcomes,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        "Run complete in {}s: {} moved, {} skipped, {} failed",
        (report.finished_at - report.started_at).num_seconds(),
        report.moved(),
        report.skipped(),
        report.failed()
    );
    report
}

fn log_outcome(route: &RouteOutcome) {
    match route {
        RouteOutcome::Moved { to, .. } => {
            let category = to
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!("Moved to {}: {}", category, to.display());
        }
        RouteOutcome::Left { path, reason } => info!("Skipped ({}): {}", reason, path.display()),
        RouteOutcome::Failed { path, reason } => warn!("Failed to move {}: {}", path.display(), reason),
    }
}

/// Sum of the stream durations of a set of files
#[derive(Debug, Default)]
pub struct DurationTotal {
    pub total: MediaDuration,
    pub counted: usize,
    /// Files that could not contribute, with the reason
    pub missing: Vec<(PathBuf, String)>,
}

/// Probe each file and add up the durations
pub async fn sum_durations<P: Prober>(prober: &P, files: &[PathBuf]) -> DurationTotal {
    let mut totals = DurationTotal::default();

    for path in files {
        // Unreadable files are reported, not fatal
        let duration = match prober.probe(path).await {
            Ok(data) => metadata::parse(&data)
                .map_err(|e| e.to_string())
                .and_then(|facts| facts.duration().ok_or_else(|| "no stream duration".to_string())),
            Err(e) => Err(e.to_string()),
        };

        match duration {
            Ok(d) => {
                info!("{}: {}", path.display(), d);
                totals.total = totals.total + d;
                totals.counted += 1;
            }
            Err(reason) => {
                warn!("No duration for {}: {}", path.display(), reason);
                totals.missing.push((path.clone(), reason));
            }
        }
    }

    totals
}
