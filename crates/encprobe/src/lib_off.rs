use std::path::Path;

use crate::resource::AsAddress;
use crate::{ProbeConfig, Reporter, ResourceKind, Stage};

pub fn configure(_config: ProbeConfig) -> bool {
    false
}

#[inline(always)]
pub fn track_resource_created(
    _address: impl AsAddress,
    _kind: ResourceKind,
    _size: usize,
    _source_file: &'static str,
    _source_line: u32,
) {
}

#[inline(always)]
pub fn track_resource_destroyed(_address: impl AsAddress, _kind: ResourceKind) {}

#[allow(clippy::too_many_arguments)]
#[inline(always)]
pub fn record_work_timing(
    _stage: Stage,
    _input_kind: i32,
    _output_kind: i32,
    _work_id: u32,
    _segment_idx: i8,
    _tile_idx: i8,
    _start_seconds: u64,
    _start_micros: u64,
) {
}

#[inline(always)]
pub fn component_started() {}

#[inline(always)]
pub fn component_stopped() {}

pub fn print_resource_usage() {}

pub fn print_resource_usage_with(_reporter: &dyn Reporter) {}

pub fn write_timing_report<P: AsRef<Path>>(_output_path: P) {}

#[macro_export]
macro_rules! track_created {
    ($ptr:expr, $kind:expr, $size:expr) => {{
        let _ = (&$ptr, &$kind, &$size);
    }};
}

#[macro_export]
macro_rules! track_destroyed {
    ($ptr:expr, $kind:expr) => {{
        let _ = (&$ptr, &$kind);
    }};
}

#[derive(Default)]
pub struct ComponentScope;

impl ComponentScope {
    #[inline(always)]
    pub fn new() -> Self {
        ComponentScope
    }
}

pub struct StageGuard;

impl StageGuard {
    #[inline(always)]
    pub fn new(
        _stage: Stage,
        _input: i32,
        _output: i32,
        _work_id: u32,
        _segment: i8,
        _tile: i8,
    ) -> Self {
        StageGuard
    }
}

pub struct ResourceGuard;

impl ResourceGuard {
    #[inline(always)]
    pub fn new(_address: impl AsAddress, _kind: ResourceKind, _size: usize) -> Self {
        ResourceGuard
    }
}
