// Unit tests for the state store

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::adapters::FixedCropWidget;
    use crate::domain::store::*;
    use crate::ports::CropperHandle;

    fn loaded_state() -> AppState {
        let info = VideoInfo::new(5_000_000, 640, 480).unwrap();
        let state = reduce(&AppState::new(), Action::InputMetadataSet(info));
        reduce(&state, Action::input_loaded(vec![0; 16]))
    }

    #[test]
    fn test_engine_ready() {
        let state = reduce(&AppState::new(), Action::EngineReady);
        assert!(state.engine.init);
    }

    #[test]
    fn test_metadata_resets_trim_range() {
        let state = reduce(&AppState::new(), Action::TrimTimeSet((100, 200)));
        let info = VideoInfo::new(7_000_000, 320, 240).unwrap();
        let state = reduce(&state, Action::InputMetadataSet(info));

        assert_eq!(state.input_file.video_info, info);
        assert_eq!(state.video_editor_config.time, (0, 7_000_000));
        assert!(!state.input_file.file_loaded);
    }

    #[test]
    fn test_input_loaded_marks_file() {
        let state = loaded_state();
        assert!(state.input_file.file_loaded);
        assert!(state.input_file.video_src().unwrap().starts_with("blob:"));
    }

    #[test]
    fn test_progress_during_trim_is_raw() {
        let state = reduce(&loaded_state(), Action::TrimPhaseStart);
        assert_eq!(state.convertor.progress, 0.0);

        for f in [0.0, 0.1, 0.25, 0.5] {
            let next = reduce(&state, Action::Progress(f));
            assert_eq!(next.convertor.progress, f);
        }
    }

    #[test]
    fn test_progress_during_encode_is_offset() {
        let state = reduce(&loaded_state(), Action::TrimPhaseStart);
        let state = reduce(&state, Action::EncodePhaseStart);
        assert_eq!(state.convertor.convert_status, ConversionStatus::ConvertingEncode);
        assert_eq!(state.convertor.progress, 0.5);

        for f in [0.0, 0.2, 0.5] {
            let next = reduce(&state, Action::Progress(f));
            assert_eq!(next.convertor.progress, f + 0.5);
        }
    }

    #[test]
    fn test_progress_outside_conversion_is_ignored() {
        let state = loaded_state();
        let next = reduce(&state, Action::Progress(0.7));
        assert_eq!(next, state);
    }

    #[test]
    fn test_full_conversion_lifecycle() {
        let mut state = loaded_state();
        for action in [
            Action::TrimPhaseStart,
            Action::Progress(0.5),
            Action::EncodePhaseStart,
            Action::Progress(0.5),
            Action::ConversionFinished,
            Action::output_loaded(vec![1; 2048]),
        ] {
            state = reduce(&state, action);
        }

        assert_eq!(state.convertor.convert_status, ConversionStatus::Converted);
        assert_eq!(state.convertor.progress, 1.0);
        let output = state.output_file.as_ref().unwrap();
        assert_eq!(output.file_size, 2048);
        assert_eq!(output.blob.mime.as_deref(), Some("video/webm"));

        let state = reduce(&state, Action::Reset);
        assert_eq!(state.convertor.convert_status, ConversionStatus::Idle);
        assert_eq!(state.convertor.progress, 0.0);
        // Output survives a reset until the next conversion replaces it
        assert!(state.output_file.is_some());
    }

    #[test]
    fn test_failure_records_message_and_resets() {
        let state = reduce(&loaded_state(), Action::TrimPhaseStart);
        let failed = reduce(&state, Action::ConversionFailed("exit 1".to_string()));
        assert_eq!(failed.convertor.convert_status, ConversionStatus::Failed);
        assert_eq!(failed.convertor.error.as_deref(), Some("exit 1"));

        let reset = reduce(&failed, Action::Reset);
        assert_eq!(reset.convertor.convert_status, ConversionStatus::Idle);
        assert_eq!(reset.convertor.error, None);
    }

    #[test]
    fn test_settings_merge() {
        let state = reduce(
            &loaded_state(),
            Action::SettingsMerge(ConvertSettingPatch::new().bitrate(600).speed(2.0)),
        );
        assert_eq!(state.video_editor_config.bitrate, 600);
        assert_eq!(state.video_editor_config.speed, 2.0);
        assert_eq!(state.video_editor_config.fps, 30);
        assert_eq!(state.video_editor_config.time, (0, 5_000_000));
    }

    #[test]
    fn test_crop_enable_and_disable() {
        let widget = Arc::new(FixedCropWidget::new(VideoInfo::new(1, 100, 100).unwrap()));
        let handle = CropperHandle::new(widget);

        let state = reduce(&AppState::new(), Action::CropEnable(handle.clone()));
        assert!(state.cropper.enabled);
        assert_eq!(state.cropper.cropper.as_ref(), Some(&handle));

        let state = reduce(&state, Action::CropDisable);
        assert!(!state.cropper.enabled);
        assert!(state.cropper.cropper.is_none());
    }

    #[test]
    fn test_reduce_is_pure() {
        let before = loaded_state();
        let snapshot = before.clone();
        let actions = vec![
            Action::EngineReady,
            Action::TrimPhaseStart,
            Action::Progress(0.3),
            Action::TrimTimeSet((1, 2)),
            Action::SettingsMerge(ConvertSettingPatch::new().fps(10)),
            Action::ConversionFailed("x".to_string()),
            Action::Reset,
        ];

        for action in actions {
            let a = reduce(&before, action.clone());
            let b = reduce(&before, action);
            assert_eq!(a, b);
            assert_eq!(before, snapshot);
        }
    }

    #[test]
    fn test_progress_percent() {
        let mut state = AppState::new();
        state.convertor.progress = 0.756;
        assert_eq!(state.progress_percent(), 76);
        state.convertor.progress = 1.2;
        assert_eq!(state.progress_percent(), 100);
    }
}
