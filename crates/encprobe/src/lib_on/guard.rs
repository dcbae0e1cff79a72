use crate::resource::AsAddress;
use crate::{Origin, ResourceKind, Stage, Timestamp};

/// Counts a running component for its lifetime.
#[must_use = "the component stops when the scope is dropped"]
pub struct ComponentScope {
    _private: (),
}

impl ComponentScope {
    #[inline]
    pub fn new() -> Self {
        super::component_started();
        Self { _private: () }
    }
}

impl Default for ComponentScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ComponentScope {
    #[inline]
    fn drop(&mut self) {
        super::component_stopped();
    }
}

/// Times one unit of stage work from construction to drop.
#[must_use = "the work is recorded when the guard is dropped"]
pub struct StageGuard {
    stage: Stage,
    input: i32,
    output: i32,
    work_id: u32,
    segment: i8,
    tile: i8,
    start: Timestamp,
}

impl StageGuard {
    #[inline]
    pub fn new(stage: Stage, input: i32, output: i32, work_id: u32, segment: i8, tile: i8) -> Self {
        Self {
            stage,
            input,
            output,
            work_id,
            segment,
            tile,
            start: Timestamp::now(),
        }
    }
}

impl Drop for StageGuard {
    #[inline]
    fn drop(&mut self) {
        super::probe().record_work(
            self.stage,
            self.input,
            self.output,
            self.work_id,
            self.segment,
            self.tile,
            self.start,
        );
    }
}

/// Tracks a resource for as long as the guard lives.
#[must_use = "the resource is released when the guard is dropped"]
pub struct ResourceGuard {
    address: usize,
    kind: ResourceKind,
}

impl ResourceGuard {
    #[track_caller]
    pub fn new(address: impl AsAddress, kind: ResourceKind, size: usize) -> Self {
        let address = address.as_address();
        super::probe().resource_created(address, kind, size as u64, Origin::caller());
        Self { address, kind }
    }
}

impl Drop for ResourceGuard {
    #[inline]
    fn drop(&mut self) {
        super::probe().resource_destroyed(self.address, self.kind);
    }
}
