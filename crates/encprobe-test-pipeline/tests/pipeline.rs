#![cfg(all(feature = "encprobe", not(feature = "encprobe-off")))]

use encprobe::analysis::{analyze, parse_report};
use encprobe::{ProbeConfig, ResourceKind, Stage};
use encprobe_test_pipeline::{encode, release, PipelineConfig};

#[test]
fn test_pipeline_is_timed_and_leaks_are_found() {
    encprobe::configure(
        ProbeConfig::default()
            .with_resource_capacity(4099)
            .with_timing_capacity(4099),
    );
    let probe = encprobe::probe();
    assert_eq!(probe.config().timing_capacity, 4099);

    let config = PipelineConfig {
        pictures: 5,
        segments: 3,
        picture_bytes: 2048,
        leak_picture: Some(2),
    };
    let (packets, leaked) = encode(config);
    assert_eq!(packets.len(), 5);
    assert_eq!(leaked.len(), 1);

    // RESOURCE, PA, 3 x ME, ENCDEC, ENTROPY and PAK for every picture.
    let events = probe.timeline();
    assert_eq!(events.len(), 5 * 8);
    assert!(events
        .windows(2)
        .all(|w| w[0].entry.start <= w[1].entry.start));
    assert_eq!(events[0].start_ms, 0.0);
    assert!(events.iter().all(|e| e.duration_ms >= 0.0));

    let me_segments: Vec<i8> = events
        .iter()
        .filter(|e| e.entry.stage == Stage::MotionEstimation && e.entry.work_id == 0)
        .map(|e| e.entry.segment)
        .collect();
    assert_eq!(me_segments.len(), 3);
    for segment in 0..3 {
        assert!(me_segments.contains(&segment));
    }

    // Only the held-back picture is still live.
    let live = probe.resources().unwrap().live_entries();
    assert_eq!(live.len(), 1, "{live:?}");
    assert_eq!(live[0].kind, ResourceKind::ZeroedHeapBlock);
    assert_eq!(live[0].size, 2048);
    assert_eq!(live[0].address, leaked[0].pixels().as_ptr() as usize);
    assert!(live[0].origin.file.ends_with("lib.rs"));

    let usage = probe.usage_report().unwrap();
    assert_eq!(usage.zeroed_heap, 2048);
    assert_eq!(usage.total_memory, 2048);
    assert_eq!(usage.locks, 0);
    assert_eq!(usage.threads, 0);

    for picture in leaked {
        release(picture);
    }
    assert!(probe.resources().unwrap().live_entries().is_empty());

    let path = std::env::temp_dir().join(format!(
        "encprobe-pipeline-{}.txt",
        std::process::id()
    ));
    encprobe::write_timing_report(&path);
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(text.lines().count(), 40);
    let first = text.lines().next().unwrap();
    assert!(first.contains("picNum=0, segIdx=0, tileIdx=0, sTime=0.00"), "{first}");
    assert!(text.contains("RESOURCE, inType=0, outType=1, picNum=0, segIdx=0, tileIdx=0, sTime=0.00"));

    let records = parse_report(&text).unwrap();
    let analysis = analyze(&records, None);
    assert_eq!(analysis.frames.len(), 5);
    assert_eq!(analysis.averaged_frames, 4);
    assert!(analysis.frames.iter().all(|f| f.latency_ms >= 0.0));
    assert_eq!(
        analysis.stages[Stage::MotionEstimation.index()].records,
        4 * 3
    );
}
