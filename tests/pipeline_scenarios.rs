mod common;

use std::time::Duration;

use caption_pipeline::{
    AspectRatio, BurnRequest, ConfigBuilder, PipelineOutcome, PipelineRequest, PipelineResponse, Quality,
    StyleSpec, SubtitleFormat, SubtitleSegment, SubtitleSource, UploadedVideo,
};
use common::{FakeStore, FakeTranscoder, Harness, ScriptedWorker};

fn burn_request(subtitles: SubtitleSource) -> BurnRequest {
    BurnRequest {
        video_url: "https://storage.test/sign/videos/u1/videos/1-clip.mp4".to_string(),
        subtitles,
        style: None,
        format: None,
        quality: Quality::Balanced,
        aspect_ratio: AspectRatio::Portrait,
        user_id: Some("u1".to_string()),
    }
}

fn three_segments() -> SubtitleSource {
    SubtitleSource::Segments(vec![
        SubtitleSegment::new(0.0, 2.0, "hi"),
        SubtitleSegment::new(2.0, 5.0, "there"),
        SubtitleSegment::new(5.0, 5.2, "x"),
    ])
}

async fn uploaded_video(harness: &Harness) -> (caption_pipeline::TempWorkspace, UploadedVideo) {
    let mut workspace = harness.pipeline.workspace().unwrap();
    let path = workspace.artifact_path("upload-clip.mp4");
    tokio::fs::write(&path, vec![7u8; 5000]).await.unwrap();
    let video = UploadedVideo {
        path,
        original_name: "clip.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        size: 5000,
    };
    (workspace, video)
}

#[tokio::test]
async fn test_burn_segments_publishes_one_export() {
    let harness = Harness::default_collaborators();

    let outcome = harness
        .pipeline
        .execute(PipelineRequest::BurnSubtitles(burn_request(three_segments())))
        .await
        .unwrap();

    let PipelineOutcome::Burn(burn) = outcome else {
        panic!("expected a burn outcome");
    };
    assert_eq!(burn.bitrate, "4M");
    assert_eq!(burn.format, SubtitleFormat::Srt);
    assert!(!burn.download_url.is_empty());
    assert_eq!(burn.expires_in, 86400);
    assert!(burn.storage_path.starts_with("u1/exports/"));

    let exports = harness.store.uploads_in("exports");
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].content_type, "video/mp4");
    assert_eq!(harness.store.uploads().len(), 1);

    assert_eq!(*harness.transcoder.bitrates.lock().unwrap(), vec!["4M".to_string()]);
    let burned = harness.transcoder.burned_subtitles.lock().unwrap();
    assert!(burned[0].starts_with("1\n00:00:00,000 --> 00:00:02,000\nhi\n"));
    assert!(burned[0].contains("00:00:05,000 --> 00:00:05,200\nx"));
}

#[tokio::test]
async fn test_successful_request_cleans_up_after_grace() {
    let harness = Harness::default_collaborators();

    harness
        .pipeline
        .execute(PipelineRequest::BurnSubtitles(burn_request(three_segments())))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.live_workspaces(), 0);
}

#[tokio::test]
async fn test_burn_failure_removes_workspace_immediately() {
    let harness = Harness::new(
        FakeStore::default(),
        FakeTranscoder::failing_burn(),
        ScriptedWorker::completing(),
    );

    let result = harness
        .pipeline
        .execute(PipelineRequest::BurnSubtitles(burn_request(three_segments())))
        .await;

    let err = result.as_ref().unwrap_err();
    assert_eq!(err.kind(), "transcoder");
    assert_eq!(harness.live_workspaces(), 0);
    assert!(harness.store.uploads_in("exports").is_empty());

    let response = serde_json::to_value(PipelineResponse::from_result(&result)).unwrap();
    assert_eq!(response["success"], false);
    assert_eq!(response["errorKind"], "transcoder");
}

#[tokio::test]
async fn test_styled_burn_renders_ass_for_canvas() {
    let harness = Harness::default_collaborators();
    let mut request = burn_request(three_segments());
    request.style = Some(StyleSpec {
        text_color: Some("#FACC15".to_string()),
        all_caps: Some(true),
        ..Default::default()
    });
    request.aspect_ratio = AspectRatio::Landscape;
    request.quality = Quality::High;

    let outcome = harness
        .pipeline
        .execute(PipelineRequest::BurnSubtitles(request))
        .await
        .unwrap();

    let PipelineOutcome::Burn(burn) = outcome else {
        panic!("expected a burn outcome");
    };
    assert_eq!(burn.format, SubtitleFormat::Ass);
    assert_eq!(burn.bitrate, "8M");

    let burned = harness.transcoder.burned_subtitles.lock().unwrap();
    assert!(burned[0].contains("PlayResX: 1920\r\nPlayResY: 1080"));
    assert!(burned[0].contains("&H0015CCFA"));
    assert!(burned[0].contains(",,THERE\r\n"));
}

#[tokio::test]
async fn test_burn_from_srt_url_uses_file_as_is() {
    let harness = Harness::default_collaborators();
    let request = burn_request(SubtitleSource::Url(
        "https://storage.test/sign/subtitles/u1/subtitles/1.srt".to_string(),
    ));

    harness
        .pipeline
        .execute(PipelineRequest::BurnSubtitles(request))
        .await
        .unwrap();

    let burned = harness.transcoder.burned_subtitles.lock().unwrap();
    assert_eq!(burned[0], common::SAMPLE_SRT);
    assert_eq!(harness.store.downloads.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_full_pipeline_survives_video_copy_failure() {
    let harness = Harness::new(
        FakeStore::failing("videos"),
        FakeTranscoder::default(),
        ScriptedWorker::completing(),
    );
    let (workspace, video) = uploaded_video(&harness).await;

    let outcome = harness
        .pipeline
        .run(
            workspace,
            PipelineRequest::FullPipeline {
                video,
                user_id: Some("u1".to_string()),
                language: Some("hinglish".to_string()),
            },
        )
        .await
        .unwrap();

    let PipelineOutcome::Process(process) = outcome else {
        panic!("expected a process outcome");
    };
    assert!(process.video_url.is_none());
    assert!(process.storage_paths.video.is_none());
    assert!(process.audio_url.contains("/audio/"));
    assert!(process.subtitles.srt.ends_with(".srt?ttl=3600"));
    assert!(process.subtitles.vtt.ends_with(".vtt?ttl=3600"));
    assert!(process.subtitles.words_url.is_some());
    assert_eq!(process.metadata.segment_count, 2);
    assert_eq!(process.metadata.word_count, 2);
    assert_eq!(process.metadata.original_filename, "clip.mp4");
    assert_eq!(harness.worker.calls(), 3);

    // audio, srt, vtt, words
    assert_eq!(harness.store.uploads().len(), 4);
    assert_eq!(harness.store.uploads_in("audio").len(), 1);
    assert_eq!(harness.store.uploads_in("subtitles").len(), 3);
}

#[tokio::test]
async fn test_full_pipeline_fails_when_audio_publish_fails() {
    let harness = Harness::new(
        FakeStore::failing("audio"),
        FakeTranscoder::default(),
        ScriptedWorker::completing(),
    );
    let (workspace, video) = uploaded_video(&harness).await;

    let err = harness
        .pipeline
        .run(
            workspace,
            PipelineRequest::FullPipeline {
                video,
                user_id: None,
                language: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "storage");
    assert_eq!(harness.worker.calls(), 0);
    assert_eq!(harness.live_workspaces(), 0);
}

#[tokio::test]
async fn test_transcribe_only_reports_worker_failure() {
    let harness = Harness::new(
        FakeStore::default(),
        FakeTranscoder::default(),
        ScriptedWorker::failing("CUDA out of memory"),
    );

    let err = harness
        .pipeline
        .execute(PipelineRequest::TranscribeOnly {
            video_url: "https://storage.test/sign/videos/u1/videos/1-clip.mp4".to_string(),
            user_id: Some("u1".to_string()),
            language: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "upstream_failure");
    assert!(err.to_string().contains("CUDA out of memory"));
    assert!(harness.store.uploads_in("subtitles").is_empty());
    assert_eq!(harness.live_workspaces(), 0);
}

#[tokio::test]
async fn test_transcribe_only_returns_segments_and_paths() {
    let harness = Harness::default_collaborators();

    let outcome = harness
        .pipeline
        .execute(PipelineRequest::TranscribeOnly {
            video_url: "https://storage.test/sign/videos/u1/videos/1-clip.mp4".to_string(),
            user_id: Some("u1".to_string()),
            language: Some("english".to_string()),
        })
        .await
        .unwrap();

    let PipelineOutcome::Transcribe(transcribe) = outcome else {
        panic!("expected a transcribe outcome");
    };
    assert_eq!(transcribe.segments.len(), 2);
    assert_eq!(transcribe.subtitles.text, "namaste dosto");
    assert!(transcribe
        .storage_paths
        .srt
        .as_deref()
        .is_some_and(|p| p.starts_with("u1/subtitles/")));
    assert!(transcribe.storage_paths.video.is_none());
}

#[tokio::test]
async fn test_invalid_request_never_allocates_workspace() {
    let harness = Harness::default_collaborators();

    let err = harness
        .pipeline
        .execute(PipelineRequest::TranscribeOnly {
            video_url: "https://storage.test/v.mp4".to_string(),
            user_id: None,
            language: Some("klingon".to_string()),
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(!harness.temp_dir.exists());
    assert!(harness.store.downloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_only_signs_video() {
    let harness = Harness::default_collaborators();
    let (workspace, video) = uploaded_video(&harness).await;

    let outcome = harness
        .pipeline
        .run(
            workspace,
            PipelineRequest::UploadOnly {
                video,
                user_id: Some("u1".to_string()),
            },
        )
        .await
        .unwrap();

    let PipelineOutcome::Upload(upload) = outcome else {
        panic!("expected an upload outcome");
    };
    assert!(upload.storage_path.starts_with("u1/videos/"));
    assert!(upload.storage_path.ends_with("-clip.mp4"));
    assert_eq!(upload.expires_in, 3600);
    assert_eq!(harness.store.uploads_in("videos")[0].size, 5000);
}

#[tokio::test]
async fn test_request_timeout_stops_polling_and_cleans_up() {
    let harness = Harness::with_config(
        |temp_dir| {
            ConfigBuilder::new()
                .with_temp_dir(temp_dir.to_path_buf())
                .with_poll(Duration::from_millis(20), 10_000)
                .with_request_timeout(Duration::from_secs(1))
                .with_cleanup_grace(Duration::from_millis(10))
                .build()
        },
        FakeStore::default(),
        FakeTranscoder::default(),
        ScriptedWorker::stuck(),
    );

    let result = harness
        .pipeline
        .execute(PipelineRequest::TranscribeOnly {
            video_url: "https://storage.test/sign/videos/u1/videos/1-clip.mp4".to_string(),
            user_id: Some("u1".to_string()),
            language: None,
        })
        .await;

    let err = result.as_ref().unwrap_err();
    assert_eq!(err.kind(), "request_timeout");
    assert!(err.is_retryable());
    assert_eq!(harness.live_workspaces(), 0);
    assert!(harness.store.uploads_in("subtitles").is_empty());

    let response = serde_json::to_value(PipelineResponse::from_result(&result)).unwrap();
    assert_eq!(response["errorKind"], "request_timeout");

    // Polling stopped with the request
    let calls = harness.worker.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.worker.calls(), calls);
}
