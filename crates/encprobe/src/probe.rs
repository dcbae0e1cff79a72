use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::sync::OnceLock;

use crate::lifecycle::{report_leaks, ComponentCounter};
use crate::output::{reporter_for, tag, warn, Reporter};
use crate::resource::{Insert, Origin, Removal, ResourceTable, UsageReport};
use crate::timing::{TimedEvent, TimingEntry, TimingTable};
use crate::{ProbeConfig, ResourceKind, Stage, Timestamp};

/// Owns every instrumentation table of one encoder process.
///
/// Tables are allocated on first use and only when their subsystem is
/// enabled in the [`ProbeConfig`]; a disabled subsystem ignores every call.
/// The process-wide instance behind the crate's free functions is one of
/// these; tests and embedders can create their own.
pub struct Probe {
    config: ProbeConfig,
    resources: OnceLock<ResourceTable>,
    timings: OnceLock<TimingTable>,
    components: ComponentCounter,
}

impl Probe {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            resources: OnceLock::new(),
            timings: OnceLock::new(),
            components: ComponentCounter::new(),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// The resource table, created on first call. `None` when resource
    /// tracking is disabled.
    pub fn resources(&self) -> Option<&ResourceTable> {
        self.config
            .resources
            .then(|| {
                self.resources
                    .get_or_init(|| ResourceTable::new(self.config.resource_capacity))
            })
    }

    /// The timing table, created on first call. `None` when timing is
    /// disabled.
    pub fn timings(&self) -> Option<&TimingTable> {
        self.config.timing.then(|| {
            self.timings
                .get_or_init(|| TimingTable::new(self.config.timing_capacity))
        })
    }

    pub fn components(&self) -> &ComponentCounter {
        &self.components
    }

    pub fn resource_created(
        &self,
        address: usize,
        kind: ResourceKind,
        size: u64,
        origin: Origin,
    ) -> Insert {
        match self.resources() {
            Some(table) => table.add(address, kind, size, origin),
            None => Insert::Ignored,
        }
    }

    pub fn resource_destroyed(&self, address: usize, kind: ResourceKind) -> Removal {
        match self.resources() {
            Some(table) => table.remove(address, kind),
            None => Removal::Ignored,
        }
    }

    /// Records a unit of work that started at `start` and ends now.
    #[allow(clippy::too_many_arguments)]
    pub fn record_work(
        &self,
        stage: Stage,
        input: i32,
        output: i32,
        work_id: u32,
        segment: i8,
        tile: i8,
        start: Timestamp,
    ) -> Insert {
        self.record_entry(TimingEntry {
            stage,
            input,
            output,
            work_id,
            segment,
            tile,
            start,
            end: Timestamp::now(),
        })
    }

    pub fn record_entry(&self, entry: TimingEntry) -> Insert {
        match self.timings() {
            Some(table) => table.add(entry),
            None => Insert::Ignored,
        }
    }

    pub fn component_started(&self) -> usize {
        self.components.increment()
    }

    /// Stops one component. When the last one stops, the live resources are
    /// reported as leaks.
    pub fn component_stopped(&self) -> usize {
        self.components.decrement(|| {
            if !self.config.resources {
                return;
            }
            match self.resources.get() {
                Some(table) => {
                    report_leaks(table);
                }
                None => println!("{} no resource leak", tag()),
            }
        })
    }

    /// Snapshot for the usage report. `None` when resource tracking is
    /// disabled.
    pub fn usage_report(&self) -> Option<UsageReport> {
        let table = self.resources()?;
        Some(UsageReport::collect(
            table,
            self.config.site_kind,
            self.config.top_sites,
        ))
    }

    /// Prints the usage report in the configured [`Format`](crate::Format).
    pub fn print_resource_usage(&self) {
        let reporter = reporter_for(self.config.format);
        self.print_resource_usage_with(reporter.as_ref());
    }

    pub fn print_resource_usage_with(&self, reporter: &dyn Reporter) {
        let Some(usage) = self.usage_report() else {
            warn(format_args!("resource tracking is disabled"));
            return;
        };
        if let Err(e) = reporter.report(&usage) {
            warn(format_args!("failed to report resource usage: {}", e));
        }
    }

    /// Recorded work in chronological order. Empty when timing is disabled.
    pub fn timeline(&self) -> Vec<TimedEvent> {
        self.timings()
            .map(TimingTable::timeline)
            .unwrap_or_default()
    }

    /// Writes the timing report to `path`, replacing any existing file.
    /// Returns the number of events written.
    pub fn write_timing_report<P: AsRef<Path>>(&self, path: P) -> io::Result<usize> {
        let file = BufWriter::new(File::create(path)?);
        match self.timings() {
            Some(table) => table.write_report(file),
            None => Ok(0),
        }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn small() -> ProbeConfig {
        ProbeConfig::default()
            .with_resource_capacity(101)
            .with_timing_capacity(101)
    }

    const HERE: Origin = Origin::new("enc/probe_test.rs", 1);

    #[test]
    fn test_tables_are_created_lazily() {
        let probe = Probe::new(small());
        assert!(probe.resources.get().is_none());
        assert!(probe.timings.get().is_none());

        assert_eq!(probe.resources().map(ResourceTable::capacity), Some(101));
        assert!(probe.resources.get().is_some());
        assert!(probe.timings.get().is_none());
    }

    #[test]
    fn test_disabled_subsystems_ignore_calls() {
        let probe = Probe::new(small().without_resources().without_timing());

        assert_eq!(
            probe.resource_created(0x10, ResourceKind::HeapBlock, 8, HERE),
            Insert::Ignored
        );
        assert_eq!(
            probe.resource_destroyed(0x10, ResourceKind::HeapBlock),
            Removal::Ignored
        );
        assert_eq!(
            probe.record_work(Stage::Entropy, 0, 0, 1, 0, 0, Timestamp::now()),
            Insert::Ignored
        );
        assert!(probe.resources().is_none());
        assert!(probe.usage_report().is_none());
        assert!(probe.timeline().is_empty());
        assert!(probe.resources.get().is_none());
        assert!(probe.timings.get().is_none());
    }

    #[test]
    fn test_resource_round_trip() {
        let probe = Probe::new(small());
        for address in 1..=20usize {
            probe.resource_created(address * 64, ResourceKind::AlignedBlock, 64, HERE);
        }
        let usage = probe.usage_report().unwrap();
        assert_eq!(usage.aligned, 20 * 64);
        assert_eq!(usage.occupied, 20);

        for address in 1..=20usize {
            assert_eq!(
                probe.resource_destroyed(address * 64, ResourceKind::AlignedBlock),
                Removal::Removed
            );
        }
        assert_eq!(probe.usage_report().unwrap().occupied, 0);
    }

    #[test]
    fn test_record_work_ends_now() {
        let probe = Probe::new(small());
        let start = Timestamp::now();
        probe.record_work(Stage::MotionEstimation, 3, 4, 17, 1, 2, start);

        let events = probe.timeline();
        assert_eq!(events.len(), 1);
        let entry = events[0].entry;
        assert_eq!(entry.stage, Stage::MotionEstimation);
        assert_eq!((entry.input, entry.output), (3, 4));
        assert_eq!((entry.work_id, entry.segment, entry.tile), (17, 1, 2));
        assert_eq!(entry.start, start);
        assert!(entry.end >= start);
        assert!(events[0].duration_ms >= 0.0);
    }

    #[test]
    fn test_component_counter_is_shared() {
        let probe = Probe::new(small());
        assert_eq!(probe.component_started(), 1);
        assert_eq!(probe.component_started(), 2);
        assert_eq!(probe.component_stopped(), 1);
        assert_eq!(probe.component_stopped(), 0);
        assert_eq!(probe.components().active(), 0);
    }

    #[test]
    fn test_custom_reporter_receives_usage() {
        struct Capture(RefCell<Option<usize>>);

        impl Reporter for Capture {
            fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn std::error::Error>> {
                *self.0.borrow_mut() = Some(usage.occupied);
                Err("sink closed".into())
            }
        }

        let probe = Probe::new(small());
        probe.resource_created(0x40, ResourceKind::Lock, 1, HERE);

        let capture = Capture(RefCell::new(None));
        probe.print_resource_usage_with(&capture);
        assert_eq!(*capture.0.borrow(), Some(1));
    }

    #[test]
    fn test_write_timing_report_to_file() {
        let probe = Probe::new(small());
        probe.record_entry(TimingEntry {
            stage: Stage::PictureAnalysis,
            input: 0,
            output: 1,
            work_id: 0,
            segment: 0,
            tile: 0,
            start: Timestamp::new(100, 0),
            end: Timestamp::new(100, 750),
        });

        let path = std::env::temp_dir().join(format!("encprobe-probe-{}.txt", std::process::id()));
        assert_eq!(probe.write_timing_report(&path).unwrap(), 1);

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            text,
            "PA, inType=0, outType=1, picNum=0, segIdx=0, tileIdx=0, sTime=0.00, eTime=0.75, duration=0.75\n"
        );
    }

    #[test]
    fn test_write_timing_report_to_missing_directory_fails() {
        let probe = Probe::new(small());
        let path = std::env::temp_dir()
            .join("encprobe-no-such-dir")
            .join("report.txt");
        assert!(probe.write_timing_report(path).is_err());
    }
}
