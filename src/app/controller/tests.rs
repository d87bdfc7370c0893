// Unit tests for the sticker controller

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::{watch, Notify};

    use crate::adapters::{FixedCropWidget, TracingLogAdapter};
    use crate::app::controller::*;
    use crate::domain::rules::ContainerSniffer;
    use crate::domain::store::AppState;

    fn mp4_bytes() -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0x18];
        data.extend_from_slice(b"ftypisom");
        data.extend_from_slice(&[0; 12]);
        data
    }

    fn mkv_bytes() -> Vec<u8> {
        vec![0x1a, 0x45, 0xdf, 0xa3, 0x9f, 0x42, 0x86, 0x81, 0x01, 0x42, 0xf7, 0x81]
    }

    /// In-memory engine: every run writes its last argument as output
    #[derive(Default)]
    struct FakeEngine {
        unavailable: AtomicBool,
        logging: AtomicBool,
        files: Mutex<HashMap<String, Vec<u8>>>,
        runs: Mutex<Vec<Vec<String>>>,
        unlinked: Mutex<Vec<String>>,
        progress: Mutex<Option<ProgressFn>>,
        /// Runs writing this file fail after leaving partial output behind
        fail_output: Mutex<Option<String>>,
        gate: Mutex<Option<Arc<Notify>>>,
        observer: Mutex<Option<watch::Receiver<AppState>>>,
        observed: Mutex<Vec<(ConversionStatus, f64)>>,
    }

    impl FakeEngine {
        fn runs(&self) -> Vec<Vec<String>> {
            self.runs.lock().unwrap().clone()
        }

        fn has_file(&self, name: &str) -> bool {
            self.files.lock().unwrap().contains_key(name)
        }

        fn file(&self, name: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(name).cloned()
        }

        fn fail_on(&self, output: Option<&str>) {
            *self.fail_output.lock().unwrap() = output.map(str::to_string);
        }

        fn observe(&self) {
            if let Some(rx) = self.observer.lock().unwrap().as_ref() {
                let state = rx.borrow();
                self.observed
                    .lock()
                    .unwrap()
                    .push((state.convertor.convert_status, state.convertor.progress));
            }
        }
    }

    #[async_trait]
    impl EnginePort for FakeEngine {
        async fn load(&self) -> Result<(), DomainError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(DomainError::EngineUnavailable("ffmpeg: not found".to_string()));
            }
            Ok(())
        }

        fn set_logging(&self, enabled: bool) {
            self.logging.store(enabled, Ordering::SeqCst);
        }

        fn set_progress(&self, callback: Option<ProgressFn>) {
            *self.progress.lock().unwrap() = callback;
        }

        async fn run(&self, args: &[String]) -> Result<(), DomainError> {
            self.runs.lock().unwrap().push(args.to_vec());

            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let output = args.last().cloned().unwrap_or_default();
            if self.fail_output.lock().unwrap().as_deref() == Some(output.as_str()) {
                self.files
                    .lock()
                    .unwrap()
                    .insert(output.clone(), b"partial".to_vec());
                return Err(DomainError::EngineFailed(format!("cannot write {}", output)));
            }

            let callback = self.progress.lock().unwrap().clone();
            for ratio in [0.0, 0.5, 1.0] {
                if let Some(callback) = &callback {
                    callback(ratio);
                }
                self.observe();
            }

            let data = if output == STAGED_FILE {
                mp4_bytes()
            } else {
                format!("{} bytes", output).into_bytes()
            };
            self.files.lock().unwrap().insert(output, data);
            Ok(())
        }

        async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError> {
            self.files
                .lock()
                .unwrap()
                .insert(name.to_string(), data.to_vec());
            Ok(())
        }

        async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError> {
            self.files
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| DomainError::FsFail(format!("{}: no such file", name)))
        }

        async fn unlink(&self, name: &str) -> Result<(), DomainError> {
            self.unlinked.lock().unwrap().push(name.to_string());
            self.files
                .lock()
                .unwrap()
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| DomainError::FsFail(format!("{}: no such file", name)))
        }
    }

    #[derive(Default)]
    struct FakeProbe {
        fail: AtomicBool,
        /// (file name, bytes were MP4)
        requests: Mutex<Vec<(String, bool)>>,
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl ProbePort for FakeProbe {
        async fn get_file_info(&self, file: ProbeFile) -> Result<FileInfo, DomainError> {
            self.requests
                .lock()
                .unwrap()
                .push((file.name.clone(), ContainerSniffer::is_mp4(&file.data)));
            if self.fail.load(Ordering::SeqCst) {
                return Err(DomainError::ProbeFailed("moov atom not found".to_string()));
            }
            Ok(FileInfo {
                name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration: 5_000_000,
                streams: vec![StreamInfo {
                    width: 640,
                    height: 480,
                }],
            })
        }

        async fn get_frames(&self, _file: ProbeFile, frame: u64) -> Result<FrameInfo, DomainError> {
            Ok(FrameInfo {
                index: frame,
                timestamp: 0,
                width: 640,
                height: 480,
                key_frame: true,
            })
        }

        async fn clean_up(&self) -> Result<(), DomainError> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(engine: &Arc<FakeEngine>, probe: &Arc<FakeProbe>) -> StickerController {
        StickerController::new(
            engine.clone(),
            probe.clone(),
            Arc::new(TracingLogAdapter::default()),
            ControllerOptions::default(),
        )
    }

    async fn loaded(engine: &Arc<FakeEngine>, probe: &Arc<FakeProbe>) -> StickerController {
        let controller = controller(engine, probe);
        controller.init_engine().await.unwrap();
        controller
            .load_input(UploadPayload::file("clip.mp4", mp4_bytes()))
            .await
            .unwrap();
        controller
    }

    #[tokio::test]
    async fn test_five_second_mp4_converts_in_two_runs() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;

        controller
            .merge_settings(
                ConvertSettingPatch::new()
                    .time(0, 3_000_000)
                    .speed(1.0)
                    .fps(30)
                    .bitrate(1200),
            )
            .unwrap();
        let output = controller.convert().await.unwrap();

        let setting = ConvertSetting {
            bitrate: 1200,
            fps: 30,
            speed: 1.0,
            time: (0, 3_000_000),
        };
        let full_frame = CropInfo::new(640.0, 480.0, 0.0, 0.0);
        assert_eq!(
            engine.runs(),
            vec![
                CommandBuilder::trim_crop(INPUT_FILE, TRIM_FILE, &setting, &full_frame),
                CommandBuilder::encode(TRIM_FILE, OUTPUT_FILE, &setting),
            ]
        );

        let state = controller.state();
        assert_eq!(state.convertor.convert_status, ConversionStatus::Converted);
        assert_eq!(state.convertor.progress, 1.0);
        assert_eq!(state.output_file.as_ref(), Some(&output));
        assert!(!output.video_src.is_empty());
        assert_eq!(output.file_size, b"output.webm bytes".len() as u64);

        // stale files were cleared first, the intermediate file afterwards
        let unlinked = engine.unlinked.lock().unwrap().clone();
        assert_eq!(unlinked, vec![TRIM_FILE, OUTPUT_FILE, TRIM_FILE]);
        assert!(!engine.has_file(TRIM_FILE));
        assert!(engine.has_file(OUTPUT_FILE));
    }

    #[tokio::test]
    async fn test_init_engine() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        assert!(!controller.state().engine.init);

        controller.init_engine().await.unwrap();
        assert!(controller.state().engine.init);
        assert!(engine.logging.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unavailable_engine() {
        let engine = Arc::new(FakeEngine::default());
        engine.unavailable.store(true, Ordering::SeqCst);
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);

        assert!(matches!(
            controller.init_engine().await,
            Err(DomainError::EngineUnavailable(_))
        ));
        assert!(!controller.state().engine.init);
        assert!(matches!(
            controller
                .load_input(UploadPayload::file("clip.mp4", mp4_bytes()))
                .await,
            Err(DomainError::EngineUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_mp4_upload_is_probed_directly() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;

        assert!(engine.runs().is_empty());
        assert_eq!(
            *probe.requests.lock().unwrap(),
            vec![(INPUT_FILE.to_string(), true)]
        );

        let state = controller.state();
        assert!(state.input_file.file_loaded);
        assert_eq!(
            state.input_file.video_info,
            VideoInfo::new(5_000_000, 640, 480).unwrap()
        );
        assert_eq!(state.video_editor_config.time, (0, 5_000_000));
        assert!(state.input_file.video_src().unwrap().starts_with("blob:"));
    }

    #[tokio::test]
    async fn test_other_container_is_normalized_before_probe() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        controller.init_engine().await.unwrap();

        controller
            .load_input(UploadPayload::file("Holiday.MKV", mkv_bytes()))
            .await
            .unwrap();

        assert_eq!(
            engine.runs(),
            vec![CommandBuilder::normalize("source.mkv", STAGED_FILE)]
        );
        // the probe only ever saw the normalized MP4
        assert_eq!(
            *probe.requests.lock().unwrap(),
            vec![(INPUT_FILE.to_string(), true)]
        );
        assert!(!engine.has_file("source.mkv"));
        assert!(!engine.has_file(STAGED_FILE));
        assert_eq!(engine.file(INPUT_FILE), Some(mp4_bytes()));
        assert!(controller.state().input_file.file_loaded);
    }

    #[tokio::test]
    async fn test_normalize_failure() {
        let engine = Arc::new(FakeEngine::default());
        engine.fail_on(Some(STAGED_FILE));
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        controller.init_engine().await.unwrap();

        let err = controller
            .load_input(UploadPayload::file("clip.avi", mkv_bytes()))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::NormalizeFailed("failed to convert file".to_string()));
        assert!(probe.requests.lock().unwrap().is_empty());
        assert!(!engine.has_file("source.avi"));
        assert!(!engine.has_file(STAGED_FILE));
        assert!(!engine.has_file(INPUT_FILE));
        assert!(!controller.state().input_file.file_loaded);
    }

    fn workspace_matches_store(engine: &FakeEngine, controller: &StickerController) -> bool {
        let state = controller.state();
        match (engine.file(INPUT_FILE), state.input_file.blob) {
            (Some(working), Some(blob)) => working.as_slice() == &*blob.data,
            _ => false,
        }
    }

    #[tokio::test]
    async fn test_failed_normalize_on_reload_keeps_previous_input() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        let before = controller.state();

        engine.fail_on(Some(STAGED_FILE));
        let err = controller
            .load_input(UploadPayload::file("b.mkv", mkv_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NormalizeFailed(_)));

        let after = controller.state();
        assert!(after.input_file.file_loaded);
        assert_eq!(after.input_file, before.input_file);
        assert!(workspace_matches_store(&engine, &controller));
        assert!(!engine.has_file(STAGED_FILE));
        assert!(!engine.has_file("source.mkv"));

        // the previous input still converts
        engine.fail_on(None);
        controller.convert().await.unwrap();
        assert_eq!(engine.file(INPUT_FILE), Some(mp4_bytes()));
    }

    #[tokio::test]
    async fn test_failed_probe_on_reload_keeps_previous_input() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        let before = controller.state();

        let mut rejected = mp4_bytes();
        rejected.extend_from_slice(b"truncated");
        probe.fail.store(true, Ordering::SeqCst);
        let err = controller
            .load_input(UploadPayload::file("b.mp4", rejected.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProbeFailed(_)));

        assert_eq!(controller.state().input_file, before.input_file);
        assert_ne!(engine.file(INPUT_FILE), Some(rejected));
        assert!(workspace_matches_store(&engine, &controller));
    }

    #[tokio::test]
    async fn test_probe_failure() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        probe.fail.store(true, Ordering::SeqCst);
        let controller = controller(&engine, &probe);
        controller.init_engine().await.unwrap();

        let err = controller
            .load_input(UploadPayload::file("clip.mp4", mp4_bytes()))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::ProbeFailed("failed to read info".to_string()));
        assert_eq!(probe.cleanups.load(Ordering::SeqCst), 1);
        assert!(!controller.state().input_file.file_loaded);
    }

    #[tokio::test]
    async fn test_text_upload_is_rejected() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        controller.init_engine().await.unwrap();

        let err = controller
            .load_input(UploadPayload::Text("https://example.com/clip.mp4".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::InvalidUpload("Invalid file".to_string()));
        assert!(engine.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_is_split_across_phases() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        *engine.observer.lock().unwrap() = Some(controller.subscribe());

        controller.convert().await.unwrap();

        use ConversionStatus::*;
        assert_eq!(
            *engine.observed.lock().unwrap(),
            vec![
                (ConvertingTrim, 0.0),
                (ConvertingTrim, 0.25),
                (ConvertingTrim, 0.5),
                (ConvertingEncode, 0.5),
                (ConvertingEncode, 0.75),
                (ConvertingEncode, 1.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_convert_is_rejected_while_busy() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let gate = Arc::new(Notify::new());
        *engine.gate.lock().unwrap() = Some(gate.clone());
        let controller = Arc::new(loaded(&engine, &probe).await);

        let mut rx = controller.subscribe();
        let task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.convert().await })
        };
        rx.wait_for(|s| s.convertor.convert_status == ConversionStatus::ConvertingTrim)
            .await
            .unwrap();

        assert!(matches!(controller.convert().await, Err(DomainError::Busy(_))));
        assert!(matches!(controller.reset(), Err(DomainError::Busy(_))));
        assert!(matches!(
            controller
                .load_input(UploadPayload::file("other.mp4", mp4_bytes()))
                .await,
            Err(DomainError::Busy(_))
        ));

        *engine.gate.lock().unwrap() = None;
        gate.notify_one();
        task.await.unwrap().unwrap();
        assert_eq!(engine.runs().len(), 2);

        // converted is not idle either
        assert!(matches!(controller.convert().await, Err(DomainError::Busy(_))));
        controller.reset().unwrap();
        controller.convert().await.unwrap();
        assert_eq!(engine.runs().len(), 4);
    }

    #[tokio::test]
    async fn test_trim_failure_then_retry() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        engine.fail_on(Some(TRIM_FILE));

        let err = controller.convert().await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::ConversionFailed {
                phase: Phase::Trim,
                ..
            }
        ));
        assert_eq!(engine.runs().len(), 1);
        assert!(!engine.has_file(TRIM_FILE));

        let state = controller.state();
        assert_eq!(state.convertor.convert_status, ConversionStatus::Failed);
        assert!(state.convertor.error.unwrap().contains("cannot write trim.mp4"));
        assert!(state.output_file.is_none());

        engine.fail_on(None);
        controller.retry().await.unwrap();
        let state = controller.state();
        assert_eq!(state.convertor.convert_status, ConversionStatus::Converted);
        assert!(state.convertor.error.is_none());
        assert_eq!(engine.runs().len(), 3);
    }

    #[tokio::test]
    async fn test_encode_failure_then_reset() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        engine.fail_on(Some(OUTPUT_FILE));

        let err = controller.convert().await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::ConversionFailed {
                phase: Phase::Encode,
                ..
            }
        ));
        assert!(!engine.has_file(OUTPUT_FILE));
        assert_eq!(controller.state().convertor.convert_status, ConversionStatus::Failed);

        controller.reset().unwrap();
        let state = controller.state();
        assert_eq!(state.convertor.convert_status, ConversionStatus::Idle);
        assert_eq!(state.convertor.progress, 0.0);
        assert!(state.convertor.error.is_none());
    }

    #[tokio::test]
    async fn test_retry_requires_failure() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        assert!(matches!(controller.retry().await, Err(DomainError::BadArgs(_))));
        assert!(engine.runs().is_empty());
    }

    #[tokio::test]
    async fn test_convert_requires_input() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        controller.init_engine().await.unwrap();
        assert_eq!(controller.convert().await.unwrap_err(), DomainError::NotLoaded);
    }

    #[tokio::test]
    async fn test_crop_rectangle_reaches_trim_command() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        let info = controller.state().input_file.video_info;

        controller
            .enable_crop(Arc::new(FixedCropWidget::new(info)))
            .unwrap();
        controller.set_aspect_ratio(AspectRatio::Square).unwrap();
        controller.convert().await.unwrap();

        assert_eq!(engine.runs()[0][10], "crop=480:480:80:0");
    }

    #[tokio::test]
    async fn test_crop_widget_lifecycle() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        let info = controller.state().input_file.video_info;

        let first = Arc::new(FixedCropWidget::new(info));
        let second = Arc::new(FixedCropWidget::new(info));
        controller.enable_crop(first.clone()).unwrap();
        assert!(controller.state().cropper.enabled);

        // replacing destroys the previous widget
        let handle = controller.enable_crop(second.clone()).unwrap();
        assert!(first.is_destroyed());
        assert_eq!(controller.state().cropper.cropper, Some(handle));

        controller.disable_crop();
        assert!(second.is_destroyed());
        assert!(!controller.state().cropper.enabled);
        assert!(matches!(
            controller.set_aspect_ratio(AspectRatio::Square),
            Err(DomainError::BadArgs(_))
        ));

        // teardown destroys whatever is still attached
        let third = Arc::new(FixedCropWidget::new(info));
        controller.enable_crop(third.clone()).unwrap();
        drop(controller);
        assert!(third.is_destroyed());
    }

    #[tokio::test]
    async fn test_enable_crop_requires_input() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = controller(&engine, &probe);
        let widget = Arc::new(FixedCropWidget::new(VideoInfo::new(1, 2, 2).unwrap()));
        assert_eq!(controller.enable_crop(widget).unwrap_err(), DomainError::NotLoaded);
    }

    #[tokio::test]
    async fn test_trim_time_validation() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;

        controller.set_trim_time(1_000_000, 2_500_000).unwrap();
        assert_eq!(controller.state().video_editor_config.time, (1_000_000, 2_500_000));

        assert!(controller.set_trim_time(3_000_000, 1_000_000).is_err());
        assert!(controller.set_trim_time(0, 6_000_000).is_err());
        assert!(controller
            .merge_settings(ConvertSettingPatch::new().time(0, 9_000_000))
            .is_err());
        assert_eq!(controller.state().video_editor_config.time, (1_000_000, 2_500_000));

        // a new input resets the range to its full duration
        controller
            .load_input(UploadPayload::file("again.mp4", mp4_bytes()))
            .await
            .unwrap();
        assert_eq!(controller.state().video_editor_config.time, (0, 5_000_000));
    }

    #[tokio::test]
    async fn test_merge_settings_validation() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;

        controller
            .merge_settings(ConvertSettingPatch::new().speed(2.0).fps(15))
            .unwrap();
        let setting = controller.state().video_editor_config;
        assert_eq!(setting.speed, 2.0);
        assert_eq!(setting.fps, 15);
        assert_eq!(setting.bitrate, DEFAULT_BITRATE_KBPS);

        assert!(controller.merge_settings(ConvertSettingPatch::new().fps(60)).is_err());
        assert!(controller.merge_settings(ConvertSettingPatch::new().speed(32.0)).is_err());
        assert_eq!(controller.state().video_editor_config, setting);
    }

    #[tokio::test]
    async fn test_save_output() {
        let engine = Arc::new(FakeEngine::default());
        let probe = Arc::new(FakeProbe::default());
        let controller = loaded(&engine, &probe).await;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sticker.webm");

        assert!(controller.save_output(&path).await.is_err());
        controller.convert().await.unwrap();
        let size = controller.save_output(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len() as u64, size);
    }
}
