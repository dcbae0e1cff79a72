use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Kind of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    HeapBlock,
    ZeroedHeapBlock,
    AlignedBlock,
    Lock,
    Semaphore,
    Thread,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::HeapBlock,
        ResourceKind::ZeroedHeapBlock,
        ResourceKind::AlignedBlock,
        ResourceKind::Lock,
        ResourceKind::Semaphore,
        ResourceKind::Thread,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ResourceKind::HeapBlock => "heap memory",
            ResourceKind::ZeroedHeapBlock => "zeroed heap memory",
            ResourceKind::AlignedBlock => "aligned memory",
            ResourceKind::Lock => "mutex",
            ResourceKind::Semaphore => "semaphore",
            ResourceKind::Thread => "thread",
        }
    }

    /// Memory kinds carry a byte size; handle kinds carry a count of one.
    pub const fn is_memory(self) -> bool {
        matches!(
            self,
            ResourceKind::HeapBlock | ResourceKind::ZeroedHeapBlock | ResourceKind::AlignedBlock
        )
    }

    /// Whether a release claiming kind `self` may clear an entry recorded as
    /// `stored`. Zeroed heap blocks share the plain heap release path.
    #[inline]
    pub fn releases(self, stored: ResourceKind) -> bool {
        self == stored
            || (self == ResourceKind::HeapBlock && stored == ResourceKind::ZeroedHeapBlock)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoder pipeline stage that dispatched a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum Stage {
    ResourceCoordination,
    PictureAnalysis,
    PictureDecision,
    MotionEstimation,
    InitialRateControl,
    SourceBasedOperations,
    PictureManager,
    RateControl,
    ModeDecisionConfig,
    EncDec,
    Entropy,
    Packetization,
}

impl Stage {
    pub const ALL: [Stage; 12] = [
        Stage::ResourceCoordination,
        Stage::PictureAnalysis,
        Stage::PictureDecision,
        Stage::MotionEstimation,
        Stage::InitialRateControl,
        Stage::SourceBasedOperations,
        Stage::PictureManager,
        Stage::RateControl,
        Stage::ModeDecisionConfig,
        Stage::EncDec,
        Stage::Entropy,
        Stage::Packetization,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in timing reports.
    pub const fn name(self) -> &'static str {
        match self {
            Stage::ResourceCoordination => "RESOURCE",
            Stage::PictureAnalysis => "PA",
            Stage::PictureDecision => "PD",
            Stage::MotionEstimation => "ME",
            Stage::InitialRateControl => "IRC",
            Stage::SourceBasedOperations => "SRC",
            Stage::PictureManager => "PM",
            Stage::RateControl => "RC",
            Stage::ModeDecisionConfig => "MDC",
            Stage::EncDec => "ENCDEC",
            Stage::Entropy => "ENTROPY",
            Stage::Packetization => "PAK",
        }
    }
}

impl From<Stage> for &'static str {
    fn from(stage: Stage) -> Self {
        stage.name()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pipeline stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}
