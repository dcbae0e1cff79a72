use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};

use super::table::{TimingEntry, TimingTable};
use crate::table::Slot;
use crate::Timestamp;

/// A recorded event with offsets relative to the first recorded start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedEvent {
    pub entry: TimingEntry,
    pub start_ms: f64,
    pub end_ms: f64,
    pub duration_ms: f64,
}

impl fmt::Display for TimedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.entry;
        write!(
            f,
            "{}, inType={}, outType={}, picNum={}, segIdx={}, tileIdx={}, \
             sTime={:.2}, eTime={:.2}, duration={:.2}",
            e.stage,
            e.input,
            e.output,
            e.work_id,
            e.segment,
            e.tile,
            self.start_ms,
            self.end_ms,
            self.duration_ms
        )
    }
}

/// Occupied slots by start time, empty slots strictly last.
fn by_start(a: &Slot<TimingEntry>, b: &Slot<TimingEntry>) -> Ordering {
    match (a, b) {
        (Slot::Occupied(a), Slot::Occupied(b)) => a.start.cmp(&b.start),
        (Slot::Occupied(_), Slot::Empty) => Ordering::Less,
        (Slot::Empty, Slot::Occupied(_)) => Ordering::Greater,
        (Slot::Empty, Slot::Empty) => Ordering::Equal,
    }
}

/// Sorts `slots` chronologically, in place and without allocating, and
/// computes every event's offsets with `delta(from, to)`. The walk ends at
/// the first empty slot, which after the sort separates recorded events from
/// unused capacity.
pub fn timeline<D>(slots: &mut [Slot<TimingEntry>], delta: D) -> Vec<TimedEvent>
where
    D: Fn(Timestamp, Timestamp) -> f64,
{
    slots.sort_unstable_by(by_start);

    let Some(origin) = slots.first().and_then(Slot::occupied).map(|e| e.start) else {
        return Vec::new();
    };

    slots
        .iter()
        .map_while(Slot::occupied)
        .map(|entry| TimedEvent {
            entry: *entry,
            start_ms: delta(origin, entry.start),
            end_ms: delta(origin, entry.end),
            duration_ms: delta(entry.start, entry.end),
        })
        .collect()
}

pub fn write_timeline<W: Write>(mut out: W, events: &[TimedEvent]) -> io::Result<()> {
    for event in events {
        writeln!(out, "{event}")?;
    }
    out.flush()
}

impl TimingTable {
    /// Chronological events with offsets in milliseconds.
    pub fn timeline(&self) -> Vec<TimedEvent> {
        self.timeline_with(Timestamp::elapsed_ms)
    }

    /// Like [`TimingTable::timeline`] with a custom time-delta function.
    pub fn timeline_with<D>(&self, delta: D) -> Vec<TimedEvent>
    where
        D: Fn(Timestamp, Timestamp) -> f64,
    {
        self.with_locked(|slots| timeline(slots, delta))
    }

    /// Writes one line per event. Returns how many events were written.
    pub fn write_report<W: Write>(&self, out: W) -> io::Result<usize> {
        let events = self.timeline();
        write_timeline(out, &events)?;
        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stage;

    fn entry(stage: Stage, work_id: u32, start: (u64, u64), end: (u64, u64)) -> TimingEntry {
        TimingEntry {
            stage,
            input: 1,
            output: 2,
            work_id,
            segment: 3,
            tile: -1,
            start: Timestamp::new(start.0, start.1),
            end: Timestamp::new(end.0, end.1),
        }
    }

    #[test]
    fn test_timeline_is_chronological_and_relative_to_first_start() {
        let table = TimingTable::new(17);
        table.add(entry(Stage::Packetization, 2, (10, 0), (10, 2000)));
        table.add(entry(Stage::ResourceCoordination, 0, (5, 0), (5, 250)));
        table.add(entry(Stage::PictureAnalysis, 1, (5, 500), (6, 0)));

        let events = table.timeline();
        let ids: Vec<u32> = events.iter().map(|e| e.entry.work_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        assert_eq!(events[0].start_ms, 0.0);
        assert!((events[0].end_ms - 0.25).abs() < 1e-9);
        assert!((events[1].start_ms - 0.5).abs() < 1e-9);
        assert!((events[1].end_ms - 1000.0).abs() < 1e-9);
        assert!((events[1].duration_ms - 999.5).abs() < 1e-9);
        assert!((events[2].start_ms - 5000.0).abs() < 1e-9);
        assert!((events[2].duration_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_timeline_uses_supplied_delta() {
        let table = TimingTable::new(7);
        table.add(entry(Stage::EncDec, 0, (1, 0), (2, 0)));
        table.add(entry(Stage::EncDec, 1, (3, 0), (4, 0)));

        let events = table.timeline_with(|from, to| (to.secs - from.secs) as f64);
        assert_eq!(events[1].start_ms, 2.0);
        assert_eq!(events[1].end_ms, 3.0);
        assert_eq!(events[1].duration_ms, 1.0);
    }

    #[test]
    fn test_event_starting_at_zero_micros_is_reported() {
        let table = TimingTable::new(7);
        table.add(entry(Stage::MotionEstimation, 9, (3, 0), (3, 10)));
        assert_eq!(table.timeline().len(), 1);
    }

    #[test]
    fn test_empty_table_has_no_events() {
        let table = TimingTable::new(7);
        assert!(table.timeline().is_empty());

        let mut out = Vec::new();
        assert_eq!(table.write_report(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_report_line_format() {
        let table = TimingTable::new(7);
        table.add(entry(Stage::Entropy, 12, (1, 0), (1, 1500)));
        table.add(entry(Stage::Packetization, 12, (1, 2000), (1, 2250)));

        let mut out = Vec::new();
        assert_eq!(table.write_report(&mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "ENTROPY, inType=1, outType=2, picNum=12, segIdx=3, tileIdx=-1, sTime=0.00, eTime=1.50, duration=1.50",
                "PAK, inType=1, outType=2, picNum=12, segIdx=3, tileIdx=-1, sTime=2.00, eTime=2.25, duration=0.25",
            ]
        );
    }

    #[test]
    fn test_report_is_repeatable() {
        let table = TimingTable::new(11);
        for i in 0..5u64 {
            table.add(entry(Stage::RateControl, i as u32, (9 - i, 1), (10, 0)));
        }
        let first = table.timeline();
        table.add(entry(Stage::RateControl, 99, (1, 0), (1, 5)));
        let second = table.timeline();

        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 6);
        assert_eq!(second[0].entry.work_id, 99);
    }
}
