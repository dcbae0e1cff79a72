use colored::*;
use prettytable::{color, Attr, Cell, Row, Table};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::resource::{SiteTotal, UsageReport};
use crate::Format;

/// Byte count scaled to the largest unit it reaches.
///
/// The unit is one of `' '`, `'K'`, `'M'`, `'G'`, picked by repeated division
/// by 1024. It always renders as `"{value:.2} {unit}"`, so amounts below
/// 1 KiB end with the separating space followed by the blank unit: `0`
/// becomes `"0.00  "`, two trailing spaces.
///
/// # Examples
///
/// ```rust
/// use encprobe::Scaled;
///
/// assert_eq!(Scaled::of(1536).to_string(), "1.50 K");
/// assert_eq!(Scaled::of(0).to_string(), "0.00  ");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled {
    pub value: f64,
    pub unit: char,
}

impl Scaled {
    const UNITS: [char; 4] = [' ', 'K', 'M', 'G'];

    pub fn of(amount: u64) -> Self {
        let mut i = 0;
        while i + 1 < Self::UNITS.len() && amount >= 1u64 << ((i + 1) * 10) {
            i += 1;
        }
        Self {
            value: amount as f64 / (1u64 << (i * 10)) as f64,
            unit: Self::UNITS[i],
        }
    }
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.value, self.unit)
    }
}

pub(crate) fn tag() -> ColoredString {
    "[encprobe]".blue().bold()
}

pub(crate) fn warn(args: fmt::Arguments<'_>) {
    eprintln!("{} {}", tag(), args);
}

/// Counts occurrences of a condition and tells the caller to speak up only
/// the first time.
#[derive(Debug, Default)]
pub(crate) struct OnceWarning {
    hits: AtomicU64,
}

impl OnceWarning {
    pub(crate) const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
        }
    }

    /// Records one occurrence; `true` only for the first.
    #[inline]
    pub(crate) fn hit(&self) -> bool {
        self.hits.fetch_add(1, Ordering::Relaxed) == 0
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Trait for implementing custom resource usage output.
///
/// Implement this to route the usage report to a log, a file or a CI
/// artifact instead of standard output.
///
/// # Examples
///
/// ```rust
/// use encprobe::Reporter;
/// use encprobe::resource::UsageReport;
/// use std::error::Error;
///
/// struct OneLine;
///
/// impl Reporter for OneLine {
///     fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn Error>> {
///         println!("{} live resources, {} bytes", usage.occupied, usage.total_memory);
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter {
    fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn std::error::Error>>;
}

pub(crate) fn reporter_for(format: Format) -> Box<dyn Reporter> {
    match format {
        Format::Table => Box::new(TableReporter),
        Format::Json => Box::new(JsonReporter),
        Format::JsonPretty => Box::new(JsonPrettyReporter),
    }
}

pub(crate) fn sites_table(sites: &[SiteTotal]) -> Table {
    let use_colors = std::env::var("NO_COLOR").is_err();

    let mut table = Table::new();
    let header_cells: Vec<Cell> = ["Size", "Location"]
        .into_iter()
        .map(|header| {
            if use_colors {
                Cell::new(header)
                    .with_style(Attr::Bold)
                    .with_style(Attr::ForegroundColor(color::CYAN))
            } else {
                Cell::new(header).with_style(Attr::Bold)
            }
        })
        .collect();
    table.add_row(Row::new(header_cells));

    for site in sites {
        table.add_row(Row::new(vec![
            Cell::new(&format!("{}B", Scaled::of(site.size))),
            Cell::new(&site.origin.to_string()),
        ]));
    }
    table
}

pub(crate) struct TableReporter;

impl Reporter for TableReporter {
    fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn std::error::Error>> {
        println!("{} Resource usage:", tag());
        for line in usage.summary_lines() {
            println!("{line}");
        }

        match usage.top_sites {
            Some(ref sites) if !sites.is_empty() => {
                println!(
                    "top {} {} locations:",
                    sites.len(),
                    usage.site_kind.name().yellow().bold()
                );
                sites_table(sites).printstd();
            }
            Some(_) => println!("no live {} to rank", usage.site_kind),
            None => {}
        }
        Ok(())
    }
}

pub(crate) struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string(usage)?);
        Ok(())
    }
}

pub(crate) struct JsonPrettyReporter;

impl Reporter for JsonPrettyReporter {
    fn report(&self, usage: &UsageReport) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string_pretty(usage)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Origin, ResourceTable};
    use crate::ResourceKind;

    #[test]
    fn test_scaled_units() {
        assert_eq!(Scaled::of(0).to_string(), "0.00  ");
        assert_eq!(Scaled::of(1023).to_string(), "1023.00  ");
        assert_eq!(Scaled::of(1024).to_string(), "1.00 K");
        assert_eq!(Scaled::of(1536).to_string(), "1.50 K");
        assert_eq!(Scaled::of(5 * 1024 * 1024).to_string(), "5.00 M");
        assert_eq!(Scaled::of(3 << 30).to_string(), "3.00 G");
        // Nothing above gigabytes.
        assert_eq!(Scaled::of(2048 << 30).to_string(), "2048.00 G");
    }

    #[test]
    fn test_once_warning() {
        let warning = OnceWarning::new();
        assert!(warning.hit());
        assert!(!warning.hit());
        assert!(!warning.hit());
        assert_eq!(warning.hits(), 3);
    }

    #[test]
    fn test_sites_table_rows() {
        let sites = vec![
            SiteTotal {
                origin: Origin::new("enc/a.rs", 1),
                size: 2048,
            },
            SiteTotal {
                origin: Origin::new("enc/b.rs", 2),
                size: 10,
            },
        ];
        let table = sites_table(&sites);
        assert_eq!(table.len(), 3);

        let rendered = table.to_string();
        assert!(rendered.contains("2.00 KB"));
        assert!(rendered.contains("enc/a.rs:1"));
        assert!(rendered.contains("enc/b.rs:2"));
    }

    #[test]
    fn test_json_serialization_of_usage() {
        let table = ResourceTable::new(16);
        table.add(0x10, ResourceKind::Thread, 1, Origin::new("t.rs", 9));
        let usage = UsageReport::collect(&table, ResourceKind::HeapBlock, 10);

        let json: serde_json::Value = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["threads"], 1);
        assert_eq!(json["site_kind"], "heap-block");
        assert_eq!(json["healthy"], true);
        assert!(json["top_sites"].as_array().unwrap().is_empty());
    }
}
