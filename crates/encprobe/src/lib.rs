//! Resource-lifetime and work-timing instrumentation for multi-stage media
//! encoders.
//!
//! Every resource the encoder creates (heap blocks, aligned blocks, locks,
//! semaphores, threads) is recorded by address with the call site that
//! created it, so that a usage report or a leak scan can be produced at any
//! time. Every unit of pipeline work can be recorded with its start and end
//! times and written out as a chronological report.
//!
//! The process-wide facility is compiled in with the `encprobe` cargo
//! feature. Without it every free function and macro in this crate root is
//! a no-op. The tables themselves ([`Probe`], [`ResourceTable`],
//! [`TimingTable`]) are always available for direct use.

extern crate self as encprobe;

pub use cfg_if::cfg_if;
pub use encprobe_macros::{component, measure_stage};

pub mod analysis;
pub mod config;
pub mod kind;
pub mod lifecycle;
pub mod output;
pub mod probe;
pub mod resource;
pub mod table;
pub mod timestamp;
pub mod timing;

pub use config::{Format, ProbeConfig};
pub use kind::{ResourceKind, Stage};
pub use output::{Reporter, Scaled};
pub use probe::Probe;
pub use resource::{AsAddress, Origin, ResourceTable, UsageReport};
pub use timestamp::Timestamp;
pub use timing::TimingTable;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "encprobe", not(feature = "encprobe-off")))] {
        mod lib_on;
        pub use lib_on::*;
    } else {
        mod lib_off;
        pub use lib_off::*;
    }
}
