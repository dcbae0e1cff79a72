//! A miniature multi-stage encoder that exercises the encprobe macros,
//! guards and free functions the way a real encoder would.

use encprobe::{ResourceGuard, ResourceKind};
use std::sync::Mutex;
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub pictures: u32,
    pub segments: i8,
    pub picture_bytes: usize,
    /// Keep the pixel buffer of this picture alive past the end of the run.
    pub leak_picture: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pictures: 4,
            segments: 3,
            picture_bytes: 4096,
            leak_picture: None,
        }
    }
}

pub struct Picture {
    pub number: u32,
    pixels: Box<[u8]>,
}

impl Picture {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub number: u32,
    pub checksum: u64,
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::ResourceCoordination,
        work_id = number,
        output = 1
    )
)]
fn acquire(number: u32, bytes: usize) -> Picture {
    let pixels: Box<[u8]> = (0..bytes).map(|i| (i as u32 ^ number) as u8).collect();
    encprobe::track_created!(pixels.as_ptr(), ResourceKind::ZeroedHeapBlock, pixels.len());
    Picture { number, pixels }
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::PictureAnalysis,
        work_id = picture.number,
        input = 1,
        output = 2
    )
)]
fn analyze(picture: &Picture) -> u64 {
    picture.pixels.iter().map(|&p| u64::from(p)).sum()
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::MotionEstimation,
        work_id = picture.number,
        segment = segment,
        input = 2,
        output = 3
    )
)]
fn estimate_motion(picture: &Picture, segment: i8, segments: i8) -> u64 {
    let len = picture.pixels.len();
    let span = len / segments.max(1) as usize;
    let from = span * segment as usize;
    let to = if segment + 1 == segments { len } else { from + span };

    picture.pixels[from..to]
        .windows(2)
        .map(|w| u64::from(w[0].abs_diff(w[1])))
        .sum()
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::EncDec,
        work_id = number,
        input = 3,
        output = -1
    )
)]
fn encode_decode(number: u32, motion: u64, energy: u64) -> u64 {
    motion.wrapping_mul(31).wrapping_add(energy) ^ u64::from(number)
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::Entropy,
        work_id = number,
        input = 4,
        output = 2
    )
)]
fn entropy_code(number: u32, coded: u64) -> Vec<u8> {
    coded
        .to_le_bytes()
        .iter()
        .chain(number.to_le_bytes().iter())
        .copied()
        .collect()
}

#[cfg_attr(
    feature = "encprobe",
    encprobe::measure_stage(
        stage = encprobe::Stage::Packetization,
        work_id = number,
        input = 5,
        output = 6
    )
)]
fn packetize(number: u32, bits: &[u8]) -> Packet {
    let checksum = bits
        .iter()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, &b| (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3));
    Packet { number, checksum }
}

pub fn release(picture: Picture) {
    // Zeroed blocks are released through the plain heap path.
    encprobe::track_destroyed!(picture.pixels.as_ptr(), ResourceKind::HeapBlock);
}

/// Encodes `config.pictures` pictures, splitting motion estimation of each
/// picture across one thread per segment.
#[cfg_attr(feature = "encprobe", encprobe::component)]
pub fn encode(config: PipelineConfig) -> (Vec<Packet>, Vec<Picture>) {
    let stats = Mutex::new(0u64);
    let _stats_lock = ResourceGuard::new(&stats, ResourceKind::Lock, 1);

    let mut packets = Vec::with_capacity(config.pictures as usize);
    let mut leaked = Vec::new();

    for number in 0..config.pictures {
        let picture = acquire(number, config.picture_bytes);
        let energy = analyze(&picture);

        let motion: u64 = thread::scope(|scope| {
            let workers: Vec<_> = (0..config.segments)
                .map(|segment| {
                    let picture = &picture;
                    let stats = &stats;
                    scope.spawn(move || {
                        let marker = 0u8;
                        let _thread = ResourceGuard::new(&marker, ResourceKind::Thread, 1);
                        let motion = estimate_motion(picture, segment, config.segments);
                        *stats.lock().unwrap_or_else(|e| e.into_inner()) += motion;
                        motion
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or_default())
                .sum()
        });

        let coded = encode_decode(number, motion, energy);
        let bits = entropy_code(number, coded);
        packets.push(packetize(number, &bits));

        if config.leak_picture == Some(number) {
            leaked.push(picture);
        } else {
            release(picture);
        }
    }

    (packets, leaked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encprobe::ProbeConfig;

    fn small_probe() {
        encprobe::configure(
            ProbeConfig::default()
                .with_resource_capacity(4099)
                .with_timing_capacity(4099),
        );
    }

    #[test]
    fn test_segments_cover_the_picture() {
        small_probe();
        let picture = Picture {
            number: 0,
            pixels: vec![0, 10, 0, 10, 0, 10, 0].into_boxed_slice(),
        };
        let whole = estimate_motion(&picture, 0, 1);
        assert_eq!(whole, 60);

        let split: u64 = (0..3).map(|s| estimate_motion(&picture, s, 3)).sum();
        // Pairs straddling a segment boundary are not compared.
        assert!(split <= whole);
        assert!(split > 0);
    }

    #[test]
    fn test_packets_are_deterministic() {
        small_probe();
        let config = PipelineConfig {
            pictures: 2,
            segments: 2,
            picture_bytes: 64,
            leak_picture: None,
        };
        let (first, leaked) = encode(config);
        let (second, _) = encode(config);
        assert_eq!(first, second);
        assert!(leaked.is_empty());
        assert_eq!(first.iter().map(|p| p.number).collect::<Vec<_>>(), vec![0, 1]);
    }
}
