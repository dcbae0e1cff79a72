use colored::*;
use std::sync::{Mutex, PoisonError};

use crate::output::{tag, warn, OnceWarning};
use crate::resource::{ResourceEntry, ResourceTable};

/// Number of encoder components currently alive.
///
/// The count is only touched under its own lock, so the idle callback of a
/// decrement runs before any other component can start or stop.
#[derive(Debug, Default)]
pub struct ComponentCounter {
    active: Mutex<usize>,
    underflow: OnceWarning,
}

impl ComponentCounter {
    pub const fn new() -> Self {
        Self {
            active: Mutex::new(0),
            underflow: OnceWarning::new(),
        }
    }

    /// Returns the count after the increment.
    pub fn increment(&self) -> usize {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active += 1;
        *active
    }

    /// Returns the count after the decrement. `on_idle` runs, still under the
    /// counter lock, when the count drops to zero.
    pub fn decrement<F: FnOnce()>(&self, on_idle: F) -> usize {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == 0 {
            if self.underflow.hit() {
                warn(format_args!("component stopped without a matching start"));
            }
            return 0;
        }

        *active -= 1;
        if *active == 0 {
            on_idle();
        }
        *active
    }

    pub fn active(&self) -> usize {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn underflow_count(&self) -> u64 {
        self.underflow.hits()
    }
}

pub(crate) fn leak_line(entry: &ResourceEntry) -> String {
    format!(
        "{} leaked at {}:L{}",
        entry.kind, entry.origin.file, entry.origin.line
    )
}

/// Prints every live entry as a leak on stderr, or "no resource leak" on
/// stdout. Returns whether anything leaked.
pub fn report_leaks(table: &ResourceTable) -> bool {
    let leaked = table.leak_scan(|entry| {
        eprintln!("{} {}", tag(), leak_line(entry).red());
    });
    if !leaked {
        println!("{} no resource leak", tag());
    }
    leaked
}
