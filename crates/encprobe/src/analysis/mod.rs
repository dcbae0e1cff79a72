//! Offline analysis of a written timing report.
//!
//! Records are grouped by picture number into frames. Per frame and stage
//! the first start, the latest end and the summed durations are kept, from
//! which frame latency, CPU time and scheduling gaps are derived. Averages
//! leave out the last frame when there is more than one, since it is
//! usually cut short by the end of the encode.

pub mod parse;
pub mod stats;

pub use parse::{parse_report, ParseError, ParseErrorKind, TimingRecord};
pub use stats::{FrameProfile, Gap, StageSpan, StageStats};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::Stage;

#[derive(Debug, Clone, Serialize)]
pub struct StageRow {
    pub stage: Stage,
    pub latency_ms: f64,
    pub cpu_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GapRow {
    pub gap: &'static str,
    pub ms: f64,
}

/// One analyzed frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRow {
    pub work_id: u32,
    pub latency_ms: f64,
    pub cpu_ms: f64,
    pub stages: Vec<StageRow>,
    pub gaps: Vec<GapRow>,
}

impl From<&FrameProfile> for FrameRow {
    fn from(frame: &FrameProfile) -> Self {
        Self {
            work_id: frame.work_id,
            latency_ms: frame.latency_ms(),
            cpu_ms: frame.cpu_ms(),
            stages: Stage::ALL
                .into_iter()
                .filter_map(|stage| {
                    frame.span(stage).map(|span| StageRow {
                        stage,
                        latency_ms: span.latency_ms(),
                        cpu_ms: span.cpu_ms,
                    })
                })
                .collect(),
            gaps: Gap::ALL
                .into_iter()
                .map(|gap| GapRow {
                    gap: gap.label(),
                    ms: frame.gap_ms(gap),
                })
                .collect(),
        }
    }
}

/// Averages and duration distribution of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub avg_latency_ms: f64,
    pub avg_cpu_ms: f64,
    pub records: u64,
    pub avg_record_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub frames: Vec<FrameRow>,
    /// Frames the averages are taken over.
    pub averaged_frames: usize,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_cpu_ms: f64,
    pub stages: Vec<StageSummary>,
    pub gaps: Vec<GapRow>,
    /// Frame latency not covered by any stage or gap. Negative when stages
    /// overlap.
    pub avg_overhead_ms: f64,
}

/// Analyzes `records`, keeping only pictures below `frame_limit` when given.
pub fn analyze(records: &[TimingRecord], frame_limit: Option<u32>) -> Analysis {
    let in_range = |r: &&TimingRecord| frame_limit.map_or(true, |limit| r.work_id < limit);

    let mut profiles: BTreeMap<u32, FrameProfile> = BTreeMap::new();
    for record in records.iter().filter(in_range) {
        profiles
            .entry(record.work_id)
            .or_insert_with(|| FrameProfile::new(record.work_id))
            .record(record);
    }
    let profiles: Vec<FrameProfile> = profiles.into_values().collect();

    let averaged = match profiles.len() {
        0 | 1 => &profiles[..],
        n => &profiles[..n - 1],
    };
    let excluded = (profiles.len() > 1)
        .then(|| profiles.last().map(|frame| frame.work_id))
        .flatten();

    let mut stage_stats: Vec<StageStats> = Stage::ALL.into_iter().map(StageStats::new).collect();
    for record in records
        .iter()
        .filter(in_range)
        .filter(|r| Some(r.work_id) != excluded && FrameProfile::counts(r))
    {
        stage_stats[record.stage.index()].record(record.duration_ms);
    }

    let n = averaged.len().max(1) as f64;
    let avg = |f: &dyn Fn(&FrameProfile) -> f64| averaged.iter().map(f).sum::<f64>() / n;

    let stages: Vec<StageSummary> = stage_stats
        .iter()
        .map(|stats| StageSummary {
            stage: stats.stage,
            avg_latency_ms: avg(&|frame: &FrameProfile| frame.stage_latency_ms(stats.stage)),
            avg_cpu_ms: avg(&|frame: &FrameProfile| frame.stage_cpu_ms(stats.stage)),
            records: stats.count,
            avg_record_ms: stats.avg_ms(),
            p50_ms: stats.percentile_ms(50.0),
            p95_ms: stats.percentile_ms(95.0),
            p99_ms: stats.percentile_ms(99.0),
        })
        .collect();

    let gaps: Vec<GapRow> = Gap::ALL
        .into_iter()
        .map(|gap| GapRow {
            gap: gap.label(),
            ms: avg(&|frame: &FrameProfile| frame.gap_ms(gap)),
        })
        .collect();

    let avg_latency_ms = avg(&FrameProfile::latency_ms);
    let covered: f64 = stages.iter().map(|s| s.avg_latency_ms).sum::<f64>()
        + gaps.iter().map(|g| g.ms).sum::<f64>();

    Analysis {
        frames: profiles.iter().map(FrameRow::from).collect(),
        averaged_frames: averaged.len(),
        avg_latency_ms,
        max_latency_ms: profiles
            .iter()
            .map(FrameProfile::latency_ms)
            .fold(0.0, f64::max),
        avg_cpu_ms: avg(&FrameProfile::cpu_ms),
        stages,
        gaps,
        avg_overhead_ms: avg_latency_ms - covered,
    }
}
