use quanta::{Clock, Instant};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock time as whole seconds plus microseconds.
///
/// Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Timestamp {
    pub secs: u64,
    pub micros: u64,
}

struct WallClock {
    clock: Clock,
    origin: Instant,
    wall_origin: Duration,
}

static WALL_CLOCK: OnceLock<WallClock> = OnceLock::new();

impl Timestamp {
    pub const fn new(secs: u64, micros: u64) -> Self {
        Self { secs, micros }
    }

    /// Current time. The system clock is read once; later readings advance a
    /// `quanta` clock from that anchor, which is far cheaper on the hot path.
    /// Later system clock adjustments are not followed, so only compare
    /// timestamps that both came from this function.
    pub fn now() -> Self {
        let wall = WALL_CLOCK.get_or_init(|| {
            let clock = Clock::new();
            let origin = clock.now();
            let wall_origin = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            WallClock {
                clock,
                origin,
                wall_origin,
            }
        });

        let since = wall.clock.now().duration_since(wall.origin);
        Self::from_duration(wall.wall_origin + since)
    }

    pub fn from_duration(d: Duration) -> Self {
        Self {
            secs: d.as_secs(),
            micros: u64::from(d.subsec_micros()),
        }
    }

    /// Signed distance from `from` to `to` in fractional milliseconds.
    pub fn elapsed_ms(from: Timestamp, to: Timestamp) -> f64 {
        let secs = to.secs as f64 - from.secs as f64;
        let micros = to.micros as f64 - from.micros as f64;
        secs * 1000.0 + micros / 1000.0
    }
}
