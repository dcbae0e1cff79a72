use std::path::Path;
use std::sync::OnceLock;

use crate::output::warn;
use crate::resource::AsAddress;
use crate::{Origin, Probe, ProbeConfig, Reporter, ResourceKind, Stage, Timestamp};

mod guard;
pub use guard::{ComponentScope, ResourceGuard, StageGuard};

static PROBE: OnceLock<Probe> = OnceLock::new();

/// The process-wide probe, built from [`ProbeConfig::from_env`] on first use
/// unless [`configure`] ran before.
pub fn probe() -> &'static Probe {
    PROBE.get_or_init(|| Probe::new(ProbeConfig::from_env()))
}

/// Installs `config` for the process-wide probe. Returns `false`, leaving the
/// running probe untouched, if the probe was already in use.
pub fn configure(config: ProbeConfig) -> bool {
    let installed = PROBE.set(Probe::new(config)).is_ok();
    if !installed {
        warn(format_args!("probe already initialized, configuration ignored"));
    }
    installed
}

#[inline]
pub fn track_resource_created(
    address: impl AsAddress,
    kind: ResourceKind,
    size: usize,
    source_file: &'static str,
    source_line: u32,
) {
    probe().resource_created(
        address.as_address(),
        kind,
        size as u64,
        Origin::new(source_file, source_line),
    );
}

#[inline]
pub fn track_resource_destroyed(address: impl AsAddress, kind: ResourceKind) {
    probe().resource_destroyed(address.as_address(), kind);
}

/// Records one unit of work that started at `start_seconds.start_micros`
/// and finishes now.
///
/// The end time comes from [`Timestamp::now`], which advances a monotonic
/// clock from a single system clock reading. Take the start from
/// `Timestamp::now()` as well: a start read from `SystemTime` drifts from it
/// over a long run and can produce negative durations.
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn record_work_timing(
    stage: Stage,
    input_kind: i32,
    output_kind: i32,
    work_id: u32,
    segment_idx: i8,
    tile_idx: i8,
    start_seconds: u64,
    start_micros: u64,
) {
    probe().record_work(
        stage,
        input_kind,
        output_kind,
        work_id,
        segment_idx,
        tile_idx,
        Timestamp::new(start_seconds, start_micros),
    );
}

pub fn component_started() {
    probe().component_started();
}

/// Reports leaked resources when the last running component stops.
pub fn component_stopped() {
    probe().component_stopped();
}

pub fn print_resource_usage() {
    probe().print_resource_usage();
}

pub fn print_resource_usage_with(reporter: &dyn Reporter) {
    probe().print_resource_usage_with(reporter);
}

/// Writes the timing report to `output_path`. Failures are logged.
pub fn write_timing_report<P: AsRef<Path>>(output_path: P) {
    let path = output_path.as_ref();
    if let Err(e) = probe().write_timing_report(path) {
        warn(format_args!(
            "failed to write timing report to {}: {}",
            path.display(),
            e
        ));
    }
}

/// Records a resource created at the macro call site.
///
/// ```rust
/// use encprobe::ResourceKind;
///
/// let block = vec![0u8; 256].into_boxed_slice();
/// encprobe::track_created!(block.as_ptr(), ResourceKind::HeapBlock, block.len());
/// encprobe::track_destroyed!(block.as_ptr(), ResourceKind::HeapBlock);
/// ```
#[macro_export]
macro_rules! track_created {
    ($ptr:expr, $kind:expr, $size:expr) => {
        $crate::track_resource_created($ptr, $kind, $size, file!(), line!())
    };
}

#[macro_export]
macro_rules! track_destroyed {
    ($ptr:expr, $kind:expr) => {
        $crate::track_resource_destroyed($ptr, $kind)
    };
}
