//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 回环 e2e 测试（手表节点 + 手机节点，无需真实设备）

#[cfg(test)]
mod contract_tests {
    use std::str::FromStr;

    use contracts::{ClockOffsetEstimate, MessagePath, SensorKind};

    #[test]
    fn test_paths_are_stable() {
        let wire: Vec<&str> = SensorKind::ALL.iter().map(|k| k.path().as_str()).collect();
        assert_eq!(
            wire,
            vec![
                "accelerometer-data",
                "linear-acceleration-data",
                "gyroscope-data",
                "gravity-data",
                "ambient-temperature-data",
                "heart-rate-data",
            ]
        );
        for path in ["init-transfer", "stop-transfer", "ping", "pong"] {
            assert_eq!(MessagePath::from_str(path).unwrap().as_str(), path);
        }
    }

    #[test]
    fn test_clock_correction_example() {
        let estimate = ClockOffsetEstimate {
            offset_nanos: 1_000_000,
            round_trip_delay_nanos: 0,
        };
        assert_eq!(estimate.correct(5_000_000_000), 4_999_000_000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{
        CloseReason, ContractError, Dataset, DatasetSink, ExportLayout, LinkConfig, ManualClock,
        PeerId, RecordStore, RecordingStatus, SampleValues, SensorKind, SensorSample,
    };
    use dataset::{reconstruct, CsvSink, JsonLinesSink};
    use link::{LinkFaults, LoopbackTransport, MemoryRecordStore, PhoneNode, WatchNode};
    use stream::ScriptedSensorSource;

    /// Watch clock runs 5 ms ahead of the phone
    const WATCH_START: i64 = 6_000_000;
    const PHONE_START: i64 = 1_000_000;
    const OFFSET: i64 = WATCH_START - PHONE_START;

    /// Watch and phone joined by a loopback link
    struct Link {
        phone: PhoneNode<MemoryRecordStore>,
        watch: Option<WatchNode>,
        watch_id: PeerId,
        watch_link: Arc<LoopbackTransport>,
        accel: ScriptedSensorSource,
        hr: ScriptedSensorSource,
    }

    fn test_config() -> LinkConfig {
        let mut config = LinkConfig::default();
        config.clock_sync.probe_count = 3;
        config.clock_sync.probe_interval_ms = 0;
        config.clock_sync.probe_timeout_ms = 50;
        config
    }

    fn connect(config: &LinkConfig, faults: LinkFaults, with_watch: bool) -> Link {
        let watch_id = PeerId::parse("watch-7f3a").unwrap();
        let phone_id = PeerId::parse("phone-01").unwrap();
        let (watch_link, phone_link) =
            LoopbackTransport::pair_with_faults(watch_id.clone(), phone_id, faults);

        let accel = ScriptedSensorSource::new(SensorKind::Accelerometer);
        let hr = ScriptedSensorSource::new(SensorKind::HeartRate);
        let watch = with_watch.then(|| {
            WatchNode::start(
                watch_link.clone(),
                Arc::new(ManualClock::new(WATCH_START)),
                vec![Box::new(accel.clone()), Box::new(hr.clone())],
            )
        });
        let phone = PhoneNode::spawn(
            phone_link,
            Arc::new(ManualClock::new(PHONE_START)),
            Arc::new(MemoryRecordStore::new()),
            config,
        );

        Link {
            phone,
            watch,
            watch_id,
            watch_link,
            accel,
            hr,
        }
    }

    /// End-to-end test: watch sensors -> loopback -> phone -> store -> reconstructor
    ///
    /// 验证完整的数据流：
    /// 1. 手机探测手机/手表时钟偏移并启动录制
    /// 2. 手表交错发送 5 个加速度样本和 2 个心率样本
    /// 3. 停止后重建数据集：7 行，按校正时间升序
    #[tokio::test]
    async fn test_e2e_interleaved_session() {
        let link = connect(&test_config(), LinkFaults::default(), true);
        let recording = link
            .phone
            .start_recording(&link.watch_id, "morning run")
            .await
            .unwrap();
        assert_eq!(recording.clock_offset_nanos, Some(OFFSET));

        // arrival order differs from timestamp order
        let ts = |ms: i64| WATCH_START + ms * 1_000_000;
        assert!(link.accel.emit(SensorSample::three_axis(0.1, 0.2, 9.8, ts(3))));
        assert!(link.hr.emit(SensorSample::heart_rate(72, ts(5))));
        assert!(link.accel.emit(SensorSample::three_axis(0.0, 0.1, 9.7, ts(1))));
        assert!(link.accel.emit(SensorSample::three_axis(0.3, 0.0, 9.9, ts(4))));
        assert!(link.hr.emit(SensorSample::heart_rate(73, ts(2))));
        assert!(link.accel.emit(SensorSample::three_axis(-0.1, 0.2, 9.8, ts(7))));
        assert!(link.accel.emit(SensorSample::three_axis(0.2, 0.2, 9.6, ts(6))));

        let closed = link.phone.stop_recording().await.unwrap().unwrap();
        assert_eq!(closed.close_reason, Some(CloseReason::Stopped));
        assert_eq!(closed.sample_count, 7);
        assert!(!link.watch.as_ref().unwrap().is_streaming());

        let samples = link.phone.store().samples(closed.id).await.unwrap();
        let Dataset::Long(rows) = reconstruct(&samples, ExportLayout::Long, 0) else {
            panic!("expected long dataset");
        };
        assert_eq!(rows.len(), 7);

        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp_nanos).collect();
        let expected: Vec<i64> = (1..=7).map(|ms| PHONE_START + ms * 1_000_000).collect();
        assert_eq!(timestamps, expected);

        let kinds: Vec<SensorKind> = rows.iter().map(|r| r.kind).collect();
        use SensorKind::{Accelerometer as A, HeartRate as H};
        assert_eq!(kinds, vec![A, H, A, A, H, A, A]);

        assert_eq!(rows[1].values, SampleValues::HeartRate { bpm: 73 });
        assert_eq!(
            rows[0].values,
            SampleValues::ThreeAxis {
                x: 0.0,
                y: 0.1,
                z: 9.7
            }
        );
        assert_eq!(rows[0].source_timestamp_nanos, ts(1));
        assert!(rows.iter().all(|r| r.synchronized));
    }

    /// One corrupted message among ten: nine stored in arrival order, one rejected
    #[tokio::test]
    async fn test_e2e_corrupted_message_skipped() {
        let faults = LinkFaults {
            corrupt_every: 7,
            drop_every: 0,
        };
        let link = connect(&test_config(), faults, true);
        link.phone
            .start_recording(&link.watch_id, "noisy")
            .await
            .unwrap();

        // data message #7 arrives one byte short
        for bpm in 60..70 {
            assert!(link
                .hr
                .emit(SensorSample::heart_rate(bpm, WATCH_START + bpm as i64)));
        }
        let closed = link.phone.stop_recording().await.unwrap().unwrap();

        let stats = link.phone.demux_stats().await;
        assert_eq!(stats.appended, 9);
        assert_eq!(stats.rejected, 1);
        assert_eq!(link.watch_link.stats().corrupted, 1);

        let bpms: Vec<i32> = link
            .phone
            .store()
            .samples(closed.id)
            .await
            .unwrap()
            .iter()
            .map(|s| match s.sample {
                SensorSample::HeartRate { bpm, .. } => bpm,
                other => panic!("unexpected sample {other:?}"),
            })
            .collect();
        assert_eq!(bpms, vec![60, 61, 62, 63, 64, 65, 67, 68, 69]);
    }

    /// Watch disappears mid-session: recording closed as Disconnected and still exportable
    #[tokio::test]
    async fn test_e2e_disconnect_then_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.export.directory = dir.path().to_path_buf();
        let link = connect(&config, LinkFaults::default(), true);

        let recording = link
            .phone
            .start_recording(&link.watch_id, "commute")
            .await
            .unwrap();
        link.hr.emit(SensorSample::heart_rate(90, WATCH_START + 1_000));
        link.accel
            .emit(SensorSample::three_axis(1.0, 2.0, 3.0, WATCH_START + 2_000));

        link.watch_link.set_link_up(false);
        link.phone.settle().await;

        assert!(!link.watch.as_ref().unwrap().is_streaming());
        assert!(!link.hr.emit(SensorSample::heart_rate(91, WATCH_START + 3_000)));

        let closed = link
            .phone
            .store()
            .get_by_id(recording.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, RecordingStatus::Closed);
        assert_eq!(closed.close_reason, Some(CloseReason::Disconnected));
        assert_eq!(closed.sample_count, 2);

        let mut sink = CsvSink::new("csv").with_export_millis(1_700_000_000_000);
        let path = link
            .phone
            .export(recording.id, &mut sink)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("commute_1700000000000.csv"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&format!("{},", PHONE_START + 1_000)));
        assert!(lines[1].contains(",heart_rate,"));

        let exported = link.phone.store().get_by_id(recording.id).await.unwrap().unwrap();
        assert_eq!(exported.status, RecordingStatus::Exported);
    }

    #[tokio::test]
    async fn test_e2e_wide_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.export.directory = dir.path().to_path_buf();
        config.export.layout = ExportLayout::Wide;
        config.export.bucket_ms = 10;
        let link = connect(&config, LinkFaults::default(), true);

        link.phone
            .start_recording(&link.watch_id, "buckets")
            .await
            .unwrap();
        // two samples in the first 10 ms bucket, one in the second
        link.accel
            .emit(SensorSample::three_axis(1.0, 1.0, 1.0, WATCH_START + 1_000_000));
        link.hr.emit(SensorSample::heart_rate(88, WATCH_START + 2_000_000));
        link.hr.emit(SensorSample::heart_rate(89, WATCH_START + 12_000_000));
        let closed = link.phone.stop_recording().await.unwrap().unwrap();

        let mut sink = JsonLinesSink::new("jsonl").with_export_millis(42);
        let path = link
            .phone
            .export(closed.id, &mut sink)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sink.name(), "jsonl");
        assert_eq!(path.file_name().unwrap(), "buckets_42.jsonl");

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["bucket_start_nanos"], 0);
        assert_eq!(rows[0]["values"]["heart_rate"]["bpm"], 88);
        assert_eq!(rows[1]["bucket_start_nanos"], 10_000_000);
    }

    #[tokio::test]
    async fn test_e2e_export_refuses_open_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.export.directory = dir.path().to_path_buf();
        let link = connect(&config, LinkFaults::default(), true);

        let recording = link
            .phone
            .start_recording(&link.watch_id, "open")
            .await
            .unwrap();
        let err = link
            .phone
            .export(recording.id, &mut CsvSink::new("csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::RecordingStillOpen(id) if id == recording.id));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_busy_with_other_peer() {
        let link = connect(&test_config(), LinkFaults::default(), true);
        link.phone
            .start_recording(&link.watch_id, "first")
            .await
            .unwrap();

        let intruder = PeerId::parse("watch-other").unwrap();
        let err = link
            .phone
            .start_recording(&intruder, "second")
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::SessionBusy { .. }));
        assert_eq!(link.phone.recordings().borrow().len(), 1);

        // the original session keeps recording
        assert!(link.hr.emit(SensorSample::heart_rate(70, WATCH_START + 10)));
        let closed = link.phone.stop_recording().await.unwrap().unwrap();
        assert_eq!(closed.sample_count, 1);
    }

    #[tokio::test]
    async fn test_e2e_unresponsive_watch() {
        let link = connect(&test_config(), LinkFaults::default(), false);
        let err = link
            .phone
            .start_recording(&link.watch_id, "silent")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::ClockSyncUnavailable { attempted: 3, .. }
        ));
        assert!(link.phone.recordings().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_consecutive_sessions() {
        let link = connect(&test_config(), LinkFaults::default(), true);

        for (round, title) in ["one", "two"].into_iter().enumerate() {
            link.phone
                .start_recording(&link.watch_id, title)
                .await
                .unwrap();
            link.hr
                .emit(SensorSample::heart_rate(60 + round as i32, WATCH_START + 5));
            let closed = link.phone.stop_recording().await.unwrap().unwrap();
            assert_eq!(closed.sample_count, 1);
        }

        let all = link.phone.recordings().borrow().clone();
        let titles: Vec<&str> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);
        assert!(all.iter().all(|r| r.status == RecordingStatus::Closed));
    }

    #[test]
    fn test_config_from_toml_drives_nodes() {
        let config = config_loader::ConfigLoader::load_from_str(
            "[clock_sync]\nprobe_count = 2\nrequire_sync = false\n\n[export]\nformat = \"jsonl\"\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.clock_sync.probe_count, 2);
        assert!(!config.clock_sync.require_sync);
        assert_eq!(config.export.format.extension(), "jsonl");
    }

    #[test]
    fn test_codec_widths_match_demux() {
        let payload = codec::encode(&SensorSample::three_axis(1.0, 2.0, 3.0, 4));
        assert_eq!(payload.len(), SensorKind::Accelerometer.shape().width());
        assert!(codec::decode_kind(SensorKind::Gravity, &payload[..19]).is_err());
    }
}
