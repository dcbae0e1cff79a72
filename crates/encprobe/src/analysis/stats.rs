use hdrhistogram::Histogram;
use serde::Serialize;

use super::parse::TimingRecord;
use crate::Stage;

/// Activity of one stage within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageSpan {
    /// Start of the first record seen.
    pub start_ms: f64,
    /// Latest end among all records.
    pub end_ms: f64,
    /// Summed durations.
    pub cpu_ms: f64,
}

impl StageSpan {
    fn new(record: &TimingRecord) -> Self {
        Self {
            start_ms: record.start_ms,
            end_ms: record.end_ms,
            cpu_ms: record.duration_ms,
        }
    }

    fn update(&mut self, record: &TimingRecord) {
        self.end_ms = self.end_ms.max(record.end_ms);
        self.cpu_ms += record.duration_ms;
    }

    pub fn latency_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Idle time between the end of one stage and the start of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gap {
    /// Entropy coding to packetization.
    Packetization,
    /// Source based operations to picture manager.
    PictureManager,
    /// Motion estimation to initial rate control.
    InitialRateControl,
}

impl Gap {
    pub const ALL: [Gap; 3] = [Gap::Packetization, Gap::PictureManager, Gap::InitialRateControl];

    pub const fn stages(self) -> (Stage, Stage) {
        match self {
            Gap::Packetization => (Stage::Entropy, Stage::Packetization),
            Gap::PictureManager => (Stage::SourceBasedOperations, Stage::PictureManager),
            Gap::InitialRateControl => (Stage::MotionEstimation, Stage::InitialRateControl),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Gap::Packetization => "pak_s",
            Gap::PictureManager => "pm_s",
            Gap::InitialRateControl => "irc_s",
        }
    }
}

/// Per-stage activity of one picture.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameProfile {
    pub work_id: u32,
    spans: [Option<StageSpan>; Stage::ALL.len()],
}

impl FrameProfile {
    pub fn new(work_id: u32) -> Self {
        Self {
            work_id,
            spans: [None; Stage::ALL.len()],
        }
    }

    /// Entropy and encode/decode records with an output kind of 0 repeat
    /// work already counted by their sibling records.
    pub fn counts(record: &TimingRecord) -> bool {
        !(matches!(record.stage, Stage::Entropy | Stage::EncDec) && record.output == 0)
    }

    /// Folds `record` into its stage span. Returns whether it was counted.
    pub fn record(&mut self, record: &TimingRecord) -> bool {
        if !Self::counts(record) {
            return false;
        }
        let slot = &mut self.spans[record.stage.index()];
        match slot {
            Some(span) => span.update(record),
            None => *slot = Some(StageSpan::new(record)),
        }
        true
    }

    pub fn span(&self, stage: Stage) -> Option<&StageSpan> {
        self.spans[stage.index()].as_ref()
    }

    /// Packetization end minus resource coordination start, 0 when either
    /// stage is missing.
    pub fn latency_ms(&self) -> f64 {
        match (
            self.span(Stage::ResourceCoordination),
            self.span(Stage::Packetization),
        ) {
            (Some(first), Some(last)) => last.end_ms - first.start_ms,
            _ => 0.0,
        }
    }

    pub fn cpu_ms(&self) -> f64 {
        self.spans.iter().flatten().map(|span| span.cpu_ms).sum()
    }

    pub fn stage_latency_ms(&self, stage: Stage) -> f64 {
        self.span(stage).map_or(0.0, StageSpan::latency_ms)
    }

    pub fn stage_cpu_ms(&self, stage: Stage) -> f64 {
        self.span(stage).map_or(0.0, |span| span.cpu_ms)
    }

    pub fn gap_ms(&self, gap: Gap) -> f64 {
        let (before, after) = gap.stages();
        match (self.span(before), self.span(after)) {
            (Some(before), Some(after)) => after.start_ms - before.end_ms,
            _ => 0.0,
        }
    }
}

/// Distribution of single-record durations for one stage.
#[derive(Debug)]
pub struct StageStats {
    pub stage: Stage,
    pub count: u64,
    pub total_ms: f64,
    hist: Option<Histogram<u64>>,
}

impl StageStats {
    const LOW_US: u64 = 1;
    const HIGH_US: u64 = 3_600_000_000; // 1h
    const SIGFIGS: u8 = 3;

    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            count: 0,
            total_ms: 0.0,
            hist: Histogram::<u64>::new_with_bounds(Self::LOW_US, Self::HIGH_US, Self::SIGFIGS)
                .ok(),
        }
    }

    pub fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        if let Some(ref mut hist) = self.hist {
            let us = (duration_ms * 1000.0).round().max(0.0) as u64;
            hist.saturating_record(us.clamp(Self::LOW_US, Self::HIGH_US));
        }
    }

    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    /// Duration in milliseconds at percentile `p` (0 to 100).
    pub fn percentile_ms(&self, p: f64) -> f64 {
        match self.hist {
            Some(ref hist) if self.count > 0 => {
                hist.value_at_percentile(p.clamp(0.0, 100.0)) as f64 / 1000.0
            }
            _ => 0.0,
        }
    }
}
