//! Fan-out of transcode work units and ledger-based settlement.
//!
//! Desired units are the cross product of manifest chunks and target
//! resolutions. Units already settled in the ledger are never re-enqueued,
//! which is what makes pipeline re-delivery a resume instead of a restart.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use laddr_models::{ChunkManifest, Resolution, TranscodeOutcome, UnitError, Warning};
use laddr_queue::{ProcessVideoJob, TranscodeChunkJob};

use crate::context::WorkerContext;
use crate::error::WorkerResult;

/// One desired (chunk, resolution) work unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub chunk_index: u32,
    pub resolution: Resolution,
    pub chunk_key: String,
}

/// Cross product of manifest chunks and target resolutions.
pub fn plan_units(manifest: &ChunkManifest, targets: &[Resolution]) -> Vec<WorkUnit> {
    let mut units = Vec::with_capacity(manifest.chunks.len() * targets.len());
    for &resolution in targets {
        for chunk in &manifest.chunks {
            units.push(WorkUnit {
                chunk_index: chunk.index,
                resolution,
                chunk_key: chunk.key.clone(),
            });
        }
    }
    units
}

/// Dispatch unsettled units and await settlement of all of them.
///
/// Returns the outcome of every desired unit. Units that do not settle
/// before the fan-out deadline are reported as failed with zero attempts;
/// they are not written to the ledger, so a later re-delivery can still
/// pick them up.
pub async fn run(
    ctx: &WorkerContext,
    job: &ProcessVideoJob,
    manifest: &ChunkManifest,
    targets: &[Resolution],
) -> WorkerResult<HashMap<(Resolution, u32), TranscodeOutcome>> {
    let units = plan_units(manifest, targets);
    let settled = ctx.ledger.load_all(&job.video_id).await?;

    let mut dispatched = 0usize;
    for unit in &units {
        if settled.contains_key(&(unit.resolution, unit.chunk_index)) {
            continue;
        }

        let transcode = TranscodeChunkJob::new(
            job.video_id.clone(),
            unit.chunk_index,
            unit.resolution,
            unit.chunk_key.clone(),
            job.job_id.clone(),
        )
        .with_watermark(job.options.watermark.clone())
        .with_quality_preset(job.options.quality_preset);

        match ctx.transcode_queue.enqueue_transcode(transcode).await {
            Ok(_) => dispatched += 1,
            // Another coordinator already queued this unit.
            Err(e) if e.is_duplicate() => {
                debug!(
                    video_id = %job.video_id,
                    resolution = %unit.resolution,
                    chunk = unit.chunk_index,
                    "unit already queued"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        video_id = %job.video_id,
        total = units.len(),
        already_settled = settled.len(),
        dispatched,
        "fan-out dispatched"
    );

    await_settlement(ctx, job, &units).await
}

async fn await_settlement(
    ctx: &WorkerContext,
    job: &ProcessVideoJob,
    units: &[WorkUnit],
) -> WorkerResult<HashMap<(Resolution, u32), TranscodeOutcome>> {
    let deadline = Instant::now() + ctx.config.fanout_timeout;

    loop {
        let settled = ctx.ledger.load_all(&job.video_id).await?;

        let mut outcomes = HashMap::with_capacity(units.len());
        let mut missing = 0usize;
        for unit in units {
            match settled.get(&(unit.resolution, unit.chunk_index)) {
                Some(outcome) => {
                    outcomes.insert((unit.resolution, unit.chunk_index), outcome.clone());
                }
                None => missing += 1,
            }
        }

        if missing == 0 {
            return Ok(outcomes);
        }

        if Instant::now() >= deadline {
            warn!(
                video_id = %job.video_id,
                missing,
                "fan-out deadline expired with unsettled units"
            );
            for unit in units {
                outcomes
                    .entry((unit.resolution, unit.chunk_index))
                    .or_insert_with(|| {
                        TranscodeOutcome::failed(
                            unit.chunk_index,
                            unit.resolution,
                            "unit did not settle before the fan-out deadline".to_string(),
                            0,
                        )
                    });
            }
            return Ok(outcomes);
        }

        debug!(video_id = %job.video_id, missing, "awaiting unit settlement");
        tokio::time::sleep(ctx.config.ledger_poll_interval).await;
    }
}

/// Per-resolution aggregation of settled outcomes.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    /// Resolutions where every chunk succeeded, in the targets' order
    pub complete: Vec<Resolution>,
    /// One warning per dropped resolution
    pub warnings: Vec<Warning>,
    /// Every failed unit, precise enough to retry individually
    pub failed_units: Vec<UnitError>,
}

/// Decide which resolutions are publishable.
///
/// A resolution is complete only when all `chunk_count` chunks succeeded;
/// anything less is dropped with a warning, never published partially.
pub fn aggregate(
    outcomes: &HashMap<(Resolution, u32), TranscodeOutcome>,
    targets: &[Resolution],
    chunk_count: u32,
) -> ResolutionReport {
    let mut report = ResolutionReport::default();

    for &resolution in targets {
        let mut succeeded = 0u32;
        for chunk_index in 0..chunk_count {
            match outcomes.get(&(resolution, chunk_index)) {
                Some(outcome) if outcome.success => succeeded += 1,
                Some(outcome) => report.failed_units.push(UnitError {
                    chunk_index,
                    resolution,
                    message: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown failure".to_string()),
                }),
                None => report.failed_units.push(UnitError {
                    chunk_index,
                    resolution,
                    message: "unit never settled".to_string(),
                }),
            }
        }

        if succeeded == chunk_count {
            report.complete.push(resolution);
        } else {
            report.warnings.push(Warning::new(
                resolution.name(),
                format!("rendition dropped: {succeeded}/{chunk_count} chunks transcoded"),
            ));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use laddr_models::{Chunk, VideoId};

    fn manifest(chunk_count: u32) -> ChunkManifest {
        let chunks = (0..chunk_count)
            .map(|index| Chunk {
                index,
                key: format!("v1/source/chunks/chunk_{index:04}.mp4"),
                size_bytes: 1000,
            })
            .collect();
        ChunkManifest::new(VideoId::from_string("v1"), 4.0, 1000 * chunk_count as u64, chunks)
    }

    fn outcome_map(
        entries: impl IntoIterator<Item = TranscodeOutcome>,
    ) -> HashMap<(Resolution, u32), TranscodeOutcome> {
        entries
            .into_iter()
            .map(|o| ((o.resolution, o.chunk_index), o))
            .collect()
    }

    #[test]
    fn plan_is_the_full_cross_product() {
        let units = plan_units(&manifest(3), &[Resolution::P720, Resolution::P480]);
        assert_eq!(units.len(), 6);
        assert!(units.contains(&WorkUnit {
            chunk_index: 2,
            resolution: Resolution::P480,
            chunk_key: "v1/source/chunks/chunk_0002.mp4".to_string(),
        }));
    }

    #[test]
    fn empty_targets_plan_nothing() {
        assert!(plan_units(&manifest(5), &[]).is_empty());
    }

    #[test]
    fn all_units_succeeding_completes_every_resolution() {
        let outcomes = outcome_map((0..3).flat_map(|i| {
            [
                TranscodeOutcome::succeeded(i, Resolution::P720, format!("k720-{i}"), 1),
                TranscodeOutcome::succeeded(i, Resolution::P480, format!("k480-{i}"), 1),
            ]
        }));

        let report = aggregate(&outcomes, &[Resolution::P720, Resolution::P480], 3);
        assert_eq!(report.complete, vec![Resolution::P720, Resolution::P480]);
        assert!(report.warnings.is_empty());
        assert!(report.failed_units.is_empty());
    }

    #[test]
    fn one_failed_chunk_drops_only_its_resolution() {
        let mut entries: Vec<TranscodeOutcome> = (0..3)
            .map(|i| TranscodeOutcome::succeeded(i, Resolution::P480, format!("k-{i}"), 1))
            .collect();
        entries.push(TranscodeOutcome::succeeded(0, Resolution::P720, "k0".into(), 1));
        entries.push(TranscodeOutcome::failed(1, Resolution::P720, "encode blew up".into(), 4));
        entries.push(TranscodeOutcome::succeeded(2, Resolution::P720, "k2".into(), 1));

        let report = aggregate(
            &outcome_map(entries),
            &[Resolution::P720, Resolution::P480],
            3,
        );
        assert_eq!(report.complete, vec![Resolution::P480]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].component, "720p");
        assert_eq!(report.failed_units.len(), 1);
        assert_eq!(report.failed_units[0].chunk_index, 1);
    }

    #[test]
    fn missing_outcomes_count_as_failures() {
        let outcomes = outcome_map([TranscodeOutcome::succeeded(
            0,
            Resolution::P320,
            "k0".into(),
            1,
        )]);

        let report = aggregate(&outcomes, &[Resolution::P320], 2);
        assert!(report.complete.is_empty());
        assert_eq!(report.failed_units.len(), 1);
        assert_eq!(report.failed_units[0].message, "unit never settled");
    }
}
