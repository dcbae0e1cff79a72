use std::str::FromStr;

use crate::output::warn;
use crate::table::DEFAULT_CAPACITY;
use crate::ResourceKind;

/// Output format of the resource usage report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Table,
    Json,
    JsonPretty,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "json-pretty" | "json_pretty" => Ok(Format::JsonPretty),
            other => Err(format!("unknown report format '{other}'")),
        }
    }
}

/// Controls what a [`Probe`](crate::Probe) tracks and how it reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Track resource lifetimes. A disabled subsystem allocates no table.
    pub resources: bool,
    /// Record work-unit timings.
    pub timing: bool,
    /// Slots in the resource table.
    pub resource_capacity: usize,
    /// Slots in the timing table.
    pub timing_capacity: usize,
    /// Number of allocation sites in the usage report ranking.
    pub top_sites: usize,
    /// Resource kind ranked by allocation site.
    pub site_kind: ResourceKind,
    pub format: Format,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            resources: true,
            timing: true,
            resource_capacity: DEFAULT_CAPACITY,
            timing_capacity: DEFAULT_CAPACITY,
            top_sites: 10,
            site_kind: ResourceKind::HeapBlock,
            format: Format::Table,
        }
    }
}

impl ProbeConfig {
    /// Defaults overridden by any valid `ENCPROBE_*` environment variable.
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Applies `ENCPROBE_*` settings read through `lookup`. Invalid values
    /// are reported and ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = read(&lookup, "ENCPROBE_RESOURCES", parse_flag) {
            self.resources = v;
        }
        if let Some(v) = read(&lookup, "ENCPROBE_TIMING", parse_flag) {
            self.timing = v;
        }
        if let Some(v) = read(&lookup, "ENCPROBE_RESOURCE_CAPACITY", parse_capacity) {
            self.resource_capacity = v;
        }
        if let Some(v) = read(&lookup, "ENCPROBE_TIMING_CAPACITY", parse_capacity) {
            self.timing_capacity = v;
        }
        if let Some(v) = read(&lookup, "ENCPROBE_TOP_SITES", |s| s.trim().parse().ok()) {
            self.top_sites = v;
        }
        if let Some(v) = read(&lookup, "ENCPROBE_FORMAT", |s| s.parse().ok()) {
            self.format = v;
        }
        self
    }

    #[must_use]
    pub fn without_resources(mut self) -> Self {
        self.resources = false;
        self
    }

    #[must_use]
    pub fn without_timing(mut self) -> Self {
        self.timing = false;
        self
    }

    #[must_use]
    pub fn with_resource_capacity(mut self, capacity: usize) -> Self {
        self.resource_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_timing_capacity(mut self, capacity: usize) -> Self {
        self.timing_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_top_sites(mut self, top: usize) -> Self {
        self.top_sites = top;
        self
    }

    #[must_use]
    pub fn with_site_kind(mut self, kind: ResourceKind) -> Self {
        self.site_kind = kind;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}

fn read<T, L, P>(lookup: &L, key: &str, parse: P) -> Option<T>
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn(format_args!("ignoring invalid {}={:?}", key, raw));
    }
    parsed
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_capacity(s: &str) -> Option<usize> {
    s.trim().parse().ok().filter(|&n: &usize| n > 0)
}
