//! Work-unit timing: the append-only timing table and the chronological
//! report written from it.

pub mod report;
pub mod table;

pub use report::TimedEvent;
pub use table::{TimingEntry, TimingTable};
