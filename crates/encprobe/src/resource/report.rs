use serde::Serialize;

use super::sites::{top_sites, SiteTotal};
use super::table::ResourceTable;
use crate::output::{warn, Scaled};
use crate::ResourceKind;

/// Occupancy below which the resource table is considered healthy.
pub const HEALTHY_OCCUPANCY: f64 = 0.3;

/// Snapshot of the resource table for the usage report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub total_memory: u64,
    pub heap: u64,
    pub zeroed_heap: u64,
    pub aligned: u64,
    pub locks: u64,
    pub semaphores: u64,
    pub threads: u64,
    pub occupied: usize,
    pub capacity: usize,
    pub occupancy: f64,
    pub healthy: bool,
    pub site_kind: ResourceKind,
    /// `None` when the ranking could not be computed.
    pub top_sites: Option<Vec<SiteTotal>>,
}

impl UsageReport {
    pub fn collect(table: &ResourceTable, site_kind: ResourceKind, top: usize) -> Self {
        let summary = table.summarize();
        let capacity = table.capacity();
        let occupancy = summary.occupied as f64 / capacity as f64;

        let top_sites = match top_sites(table, site_kind, top) {
            Ok(sites) => Some(sites),
            Err(e) => {
                warn(format_args!(
                    "not enough memory for the allocation-site ranking: {}",
                    e
                ));
                None
            }
        };

        Self {
            total_memory: summary.memory_total(),
            heap: summary.amount(ResourceKind::HeapBlock),
            zeroed_heap: summary.amount(ResourceKind::ZeroedHeapBlock),
            aligned: summary.amount(ResourceKind::AlignedBlock),
            locks: summary.amount(ResourceKind::Lock),
            semaphores: summary.amount(ResourceKind::Semaphore),
            threads: summary.amount(ResourceKind::Thread),
            occupied: summary.occupied,
            capacity,
            occupancy,
            healthy: occupancy < HEALTHY_OCCUPANCY,
            site_kind,
            top_sites,
        }
    }

    pub fn health(&self) -> &'static str {
        if self.healthy {
            "healthy"
        } else {
            "too full"
        }
    }

    /// The text block printed above the site ranking.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!(
                "    total allocated memory:       {}B",
                Scaled::of(self.total_memory)
            ),
            format!("        heap memory:              {}B", Scaled::of(self.heap)),
            format!(
                "        zeroed heap memory:       {}B",
                Scaled::of(self.zeroed_heap)
            ),
            format!(
                "        aligned memory:           {}B",
                Scaled::of(self.aligned)
            ),
            format!("    mutex count: {}", self.locks),
            format!("    semaphore count: {}", self.semaphores),
            format!("    thread count: {}", self.threads),
            format!(
                "    hash table fullness: {:.6}, hash bucket is {}",
                self.occupancy,
                self.health()
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Origin;
    use ResourceKind::*;

    fn sample_table() -> ResourceTable {
        let table = ResourceTable::new(10);
        let here = Origin::new("enc/init.rs", 5);
        table.add(0x10, HeapBlock, 1024, here);
        table.add(0x20, ZeroedHeapBlock, 512, here);
        table.add(0x30, Lock, 1, here);
        table.add(0x40, Semaphore, 1, here);
        table
    }

    #[test]
    fn test_collect_breaks_down_by_kind() {
        let report = UsageReport::collect(&sample_table(), HeapBlock, 10);

        assert_eq!(report.total_memory, 1536);
        assert_eq!(report.heap, 1024);
        assert_eq!(report.zeroed_heap, 512);
        assert_eq!(report.aligned, 0);
        assert_eq!(report.locks, 1);
        assert_eq!(report.semaphores, 1);
        assert_eq!(report.threads, 0);
        assert_eq!(report.occupied, 4);
        assert_eq!(report.capacity, 10);
        assert!((report.occupancy - 0.4).abs() < 1e-12);
        assert!(!report.healthy);
        assert_eq!(report.health(), "too full");
        assert_eq!(report.top_sites.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_summary_lines_scale_sizes() {
        let report = UsageReport::collect(&sample_table(), HeapBlock, 10);
        let lines = report.summary_lines();

        assert!(lines[0].ends_with("1.50 KB"), "{}", lines[0]);
        assert!(lines[1].ends_with("1.00 KB"), "{}", lines[1]);
        assert!(lines[3].ends_with("0.00  B"), "{}", lines[3]);
        assert!(lines[7].contains("too full"));
    }

    #[test]
    fn test_empty_table_is_healthy() {
        let report = UsageReport::collect(&ResourceTable::new(64), HeapBlock, 10);
        assert!(report.healthy);
        assert_eq!(report.top_sites, Some(Vec::new()));
    }
}
