use httpmock::prelude::*;
use mood::Mood;
use serde_json::json;
use speech::{ReplicateSynthesizer, SpeechError, Synthesizer};

#[tokio::test]
async fn downloads_the_prediction_output() {
    let server = MockServer::start();
    let audio_url = server.url("/files/audio.mp3");
    let predict = server.mock(|when, then| {
        when.method(POST)
            .path("/models/minimax/speech-02-turbo/predictions")
            .header("authorization", "Bearer test-token")
            .header("prefer", "wait")
            .body_contains("\"voice_id\":\"Deep_Voice_Woman\"");
        then.status(201)
            .json_body(json!({ "status": "succeeded", "output": audio_url }));
    });
    let download = server.mock(|when, then| {
        when.method(GET).path("/files/audio.mp3");
        then.status(200).body(b"ID3 fake mp3");
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("audio").join("audio.mp3");
    let synth = ReplicateSynthesizer::new("test-token").with_base_url(server.base_url());
    synth
        .synthesize("Wow.", &Mood::Flirty.voice(), &out)
        .await
        .unwrap();

    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"ID3 fake mp3");
    predict.assert();
    download.assert();
}

#[tokio::test]
async fn array_output_is_accepted() {
    let server = MockServer::start();
    let audio_url = server.url("/files/clip.mp3");
    server.mock(|when, then| {
        when.method(POST)
            .path("/models/minimax/speech-02-turbo/predictions");
        then.status(201)
            .json_body(json!({ "status": "succeeded", "output": [audio_url] }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/files/clip.mp3");
        then.status(200).body(b"bytes");
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("audio.mp3");
    let synth = ReplicateSynthesizer::new("t").with_base_url(server.base_url());
    synth
        .synthesize("Meh.", &Mood::Bored.voice(), &out)
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&out).await.unwrap(), b"bytes");
}

#[tokio::test]
async fn prediction_error_is_a_typed_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/models/minimax/speech-02-turbo/predictions");
        then.status(201)
            .json_body(json!({ "status": "failed", "error": "model overloaded" }));
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("audio.mp3");
    let synth = ReplicateSynthesizer::new("t").with_base_url(server.base_url());
    let err = synth
        .synthesize("Hallo.", &Mood::Happy.voice(), &out)
        .await
        .unwrap_err();
    assert!(matches!(err, SpeechError::Api(_)));
    assert!(!out.exists());
}
