//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - Contract snapshot checks
//! - Scripted-bus e2e runs through `CaptureWorker` (no sensor required)
//! - Recovery behavior (resync, reboot, corrupt frames)

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CaptureConfig, RangeBound, SensorVariant, SinkConfig, SinkType};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::PACKET_SIZE, 164);
        assert_eq!(contracts::SEGMENT_BYTES, 9840);
    }

    #[test]
    fn test_config_round_trips_through_toml_and_json() {
        let mut config = CaptureConfig::default();
        config.sensor.variant = SensorVariant::MultiSegment;
        config.render.range_min = RangeBound::Fixed(29000);
        config.sinks.push(SinkConfig {
            name: "display".to_string(),
            sink_type: SinkType::Network,
            queue_capacity: 2,
            params: [
                ("addr".to_string(), "127.0.0.1:5005".to_string()),
                ("format".to_string(), "bincode".to_string()),
            ]
            .into_iter()
            .collect(),
        });

        let toml = ConfigLoader::to_toml(&config).unwrap();
        let from_toml = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let from_json = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        for loaded in [from_toml, from_json] {
            assert_eq!(loaded.sensor.variant, SensorVariant::MultiSegment);
            assert_eq!(loaded.render.range_min, RangeBound::Fixed(29000));
            assert_eq!(loaded.render.range_max, RangeBound::Auto);
            assert_eq!(loaded.sinks.len(), 2);
            assert_eq!(loaded.sinks[1].params["format"], "bincode");
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use capture::{CaptureWorker, CycleOutcome};
    use contracts::{
        CaptureConfig, ColormapKind, PeakSource, RangeBound, SensorVariant, SinkConfig,
        StopSignal, TimingSettings,
    };
    use dispatcher::{create_dispatcher, frame_mailbox, FramePublisher, PeakTelemetry};
    use imaging::{normalize, Colormap};
    use ingestion::{
        packet, segment_packets, segment_packets_with, PacketReader, ReaderSettings, ScriptedBus,
        ScriptedDevice, RESYNC_REBOOT_THRESHOLD,
    };

    type ScriptedWorker = CaptureWorker<ScriptedBus, ScriptedDevice>;

    fn worker(
        variant: SensorVariant,
        packets: Vec<Vec<u8>>,
        min: RangeBound,
        max: RangeBound,
    ) -> (ScriptedWorker, Arc<PeakTelemetry>) {
        let mut config = CaptureConfig::default();
        config.sensor.variant = variant;
        config.render.colormap = ColormapKind::Ironblack;
        config.render.range_min = min;
        config.render.range_max = max;
        config.timing = TimingSettings::immediate();
        config.logging.verbosity = 255;

        let settings = ReaderSettings::new(
            config.sensor.spi_bus,
            config.sensor.speed_hz(),
            variant,
            &config.timing,
        );
        let reader =
            PacketReader::new(ScriptedBus::from_packets(packets), ScriptedDevice::new(), settings);
        let peak = Arc::new(PeakTelemetry::new());
        (CaptureWorker::new(reader, &config, Arc::clone(&peak)), peak)
    }

    /// Step until the packet script runs dry, which the bus reports as a fault
    fn drain(worker: &mut ScriptedWorker, publisher: &FramePublisher) -> u64 {
        let stop = StopSignal::new();
        let mut published = 0;
        loop {
            match worker.step(&stop) {
                CycleOutcome::Frame(frame) => {
                    publisher.publish(frame);
                    published += 1;
                }
                CycleOutcome::BusFault | CycleOutcome::Stopped => return published,
                CycleOutcome::Incomplete | CycleOutcome::Discarded => {}
            }
        }
    }

    /// Scenario: single segment, all samples 100, fixed 30000..32000
    #[tokio::test]
    async fn test_e2e_uniform_cold_frame() {
        let (worker, _) = worker(
            SensorVariant::SingleSegment,
            segment_packets(0, 100),
            RangeBound::Fixed(30000),
            RangeBound::Fixed(32000),
        );
        let (publisher, subscriber) = frame_mailbox();

        let dispatcher = create_dispatcher(vec![SinkConfig::log("test_log")], subscriber.clone())
            .await
            .unwrap();
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();

        // The worker drops the publisher on return, which ends the dispatcher
        let report = tokio::task::spawn_blocking(move || {
            worker.run(&StopSignal::new(), publisher, Some(1))
        })
        .await
        .unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();

        assert_eq!(report.frames_published, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(sink_metrics[0].1.delivered(), 1);

        let frame = subscriber.latest().expect("frame published");
        assert_eq!((frame.width, frame.height), (80, 60));
        assert_eq!((frame.bounds.min, frame.bounds.max), (30000, 32000));
        let first = Colormap::builtin(ColormapKind::Ironblack).lookup(0);
        assert!(frame.data.chunks(3).all(|px| px == first));
    }

    /// Scenario: four segments stacked into a 160x120 frame
    #[test]
    fn test_e2e_multi_segment_frame() {
        let mut packets = Vec::new();
        for segment in 1..=4u8 {
            packets.extend(segment_packets(segment, 1000 * u16::from(segment)));
        }
        let (mut worker, peak) =
            worker(SensorVariant::MultiSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        assert_eq!(drain(&mut worker, &publisher), 1);
        let frame = subscriber.latest().unwrap();
        assert_eq!((frame.width, frame.height), (160, 120));
        assert_eq!((frame.bounds.min, frame.bounds.max), (1000, 4000));
        assert_eq!(peak.last_peak_sample(), 4000);

        let colormap = Colormap::builtin(ColormapKind::Ironblack);
        for k in 0..4usize {
            let expected = colormap.lookup(normalize(1000 * (k as u16 + 1), &frame.bounds));
            for row in [30 * k, 30 * k + 29] {
                assert_eq!(frame.pixel(row, 0), expected, "row {row}");
                assert_eq!(frame.pixel(row, 159), expected, "row {row}");
            }
        }
    }

    /// Terminal segment first: the cold frame over empty shelves is dropped,
    /// the next terminal segment delivers
    #[test]
    fn test_e2e_cold_start_needs_all_shelves_written() {
        let mut packets = segment_packets(4, 500);
        for segment in 1..=4u8 {
            packets.extend(segment_packets(segment, 600));
        }
        let (mut worker, _) =
            worker(SensorVariant::MultiSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        assert_eq!(drain(&mut worker, &publisher), 1);
        assert_eq!(worker.stats().frames_corrupt, 1);
        let frame = subscriber.latest().unwrap();
        assert_eq!((frame.bounds.min, frame.bounds.max), (600, 600));
    }

    /// A segment lost to a bad id keeps its previous run; the frame still ships
    #[test]
    fn test_e2e_lost_segment_reuses_previous_run() {
        let mut packets = Vec::new();
        for segment in 1..=4u8 {
            packets.extend(segment_packets(segment, 1000 * u16::from(segment)));
        }
        packets.extend(segment_packets(0, 9000));
        for segment in [1u8, 3, 4] {
            packets.extend(segment_packets(segment, 1100 * u16::from(segment)));
        }
        let (mut worker, _) =
            worker(SensorVariant::MultiSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        assert_eq!(drain(&mut worker, &publisher), 2);
        assert_eq!(worker.stats().invalid_segments, 1);

        let frame = subscriber.latest().unwrap();
        assert_eq!(frame.frame_id, 2);
        assert_eq!((frame.bounds.min, frame.bounds.max), (1100, 4400));
        let colormap = Colormap::builtin(ColormapKind::Ironblack);
        assert_eq!(frame.pixel(45, 10), colormap.lookup(normalize(2000, &frame.bounds)));
    }

    /// Scenario: a desynchronized bus triggers exactly one reboot and no frame
    #[test]
    fn test_e2e_desync_reboots_once() {
        let packets = vec![packet(0, 59, 100); RESYNC_REBOOT_THRESHOLD as usize + 1];
        let (mut worker, _) =
            worker(SensorVariant::SingleSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        assert_eq!(drain(&mut worker, &publisher), 0);
        assert!(subscriber.latest().is_none());
        assert_eq!(worker.stats().bus_faults, 1);
        assert_eq!(worker.reader().stats().reboots, 1);
        assert_eq!(worker.reader().device().reboots(), 1);
        assert_eq!(
            worker.reader().stats().resyncs,
            u64::from(RESYNC_REBOOT_THRESHOLD) + 1
        );
    }

    /// Frames containing a zero sample never reach a sink
    #[tokio::test]
    async fn test_e2e_zero_sample_frames_never_delivered() {
        let mut packets = segment_packets_with(0, |number, idx| {
            if number == 42 && idx == 17 {
                0
            } else {
                30500
            }
        });
        packets.extend(segment_packets(0, 30700));
        let (worker, _) =
            worker(SensorVariant::SingleSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        let dispatcher = create_dispatcher(vec![SinkConfig::log("test_log")], subscriber.clone())
            .await
            .unwrap();
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();

        let report = tokio::task::spawn_blocking(move || {
            worker.run(&StopSignal::new(), publisher, Some(1))
        })
        .await
        .unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

        assert_eq!(report.frames_published, 1);
        assert_eq!(report.capture.frames_corrupt, 1);
        let frame = subscriber.latest().unwrap();
        assert_eq!(frame.frame_id, 1);
        assert_eq!(frame.bounds.min, 30700);
        assert_eq!(sink_metrics[0].1.snapshot().last_frame_id, 1);
    }

    /// Publishing never waits on a slow or absent consumer
    #[test]
    fn test_mailbox_publish_is_non_blocking() {
        let mut packets = Vec::new();
        for _ in 0..50 {
            packets.extend(segment_packets(0, 31000));
        }
        let (worker, _) =
            worker(SensorVariant::SingleSegment, packets, RangeBound::Auto, RangeBound::Auto);
        let (publisher, subscriber) = frame_mailbox();

        let started = Instant::now();
        let report = worker.run(&StopSignal::new(), publisher, Some(50));
        assert_eq!(report.frames_published, 50);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(subscriber.latest().unwrap().frame_id, 50);
    }
}
