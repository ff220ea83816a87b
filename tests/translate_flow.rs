use assert_fs::prelude::*;
use mockito::Matcher;

use subtrans::config::Config;
use subtrans::controller::RequestState;
use subtrans::error::{IntakeError, SubtransError, TRANSPORT_FAILURE_MESSAGE};
use subtrans::workflow::Workflow;

const SOURCE: &str = "1\n00:00:01,000 --> 00:00:02,500\nGood morning\n";
const TRANSLATED: &str = "1\n00:00:01,000 --> 00:00:02,500\nBuenos días\n";

fn workflow_for(server: &mockito::Server) -> Workflow {
    let mut config = Config::default();
    config.service.base_url = server.url();
    config.service.timeout_secs = 5;
    Workflow::new(config).unwrap()
}

#[tokio::test]
async fn translate_file_saves_translated_copy() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/translate")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="api_key"\s+secret"#.to_string()),
            Matcher::Regex(r#"filename="movie.srt""#.to_string()),
            Matcher::Regex("Good morning".to_string()),
        ]))
        .with_status(200)
        .with_body(TRANSLATED)
        .expect(1)
        .create_async()
        .await;

    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("movie.srt");
    input.write_str(SOURCE).unwrap();
    let out = temp.child("out");

    let workflow = workflow_for(&server);
    let saved = workflow
        .translate_file(input.path(), "secret", Some(out.path()))
        .await
        .unwrap();

    assert_eq!(saved, out.path().join("movie_translated.srt"));
    out.child("movie_translated.srt").assert(TRANSLATED);
    assert_eq!(workflow.session().state(), RequestState::Succeeded);
    mock.assert_async().await;
}

#[tokio::test]
async fn translate_file_defaults_to_input_directory() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/translate")
        .with_status(200)
        .with_body(TRANSLATED)
        .create_async()
        .await;

    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("episode.en.vtt");
    input.write_str("WEBVTT\n\n00:01.000 --> 00:02.000\nHello\n").unwrap();

    let saved = workflow_for(&server)
        .translate_file(input.path(), "secret", None::<&std::path::Path>)
        .await
        .unwrap();

    assert_eq!(saved, temp.path().join("episode.en_translated.vtt"));
    temp.child("episode.en_translated.vtt").assert(TRANSLATED);
}

#[tokio::test]
async fn service_detail_becomes_the_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/translate")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "invalid key"}"#)
        .create_async()
        .await;

    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("movie.srt");
    input.write_str(SOURCE).unwrap();

    let workflow = workflow_for(&server);
    let err = workflow
        .translate_file(input.path(), "wrong", Some(temp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SubtransError::Translation(ref message) if message == "invalid key"));
    assert_eq!(workflow.session().state(), RequestState::Failed);
    assert!(!temp.child("movie_translated.srt").path().exists());
}

#[tokio::test]
async fn unsupported_file_never_reaches_service() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/translate").expect(0).create_async().await;

    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("notes.txt");
    input.write_str("not subtitles").unwrap();

    let err = workflow_for(&server)
        .translate_file(input.path(), "secret", Some(temp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SubtransError::Intake(IntakeError::UnsupportedFormat(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn interactive_session_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let rejected = server
        .mock("POST", "/translate")
        .match_body(Matcher::Regex(r#"name="api_key"\s+wrong"#.to_string()))
        .with_status(502)
        .with_body("Bad Gateway")
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/translate")
        .match_body(Matcher::Regex(r#"name="api_key"\s+secret"#.to_string()))
        .with_status(200)
        .with_body(TRANSLATED)
        .expect(1)
        .create_async()
        .await;

    let temp = assert_fs::TempDir::new().unwrap();
    let input = temp.child("movie.srt");
    input.write_str(SOURCE).unwrap();
    let out = temp.child("downloads");

    let workflow = workflow_for(&server);

    let script = format!(
        "submit\nkey wrong\nfile {}\nsubmit\nwait\nstatus\n",
        input.path().display()
    );
    let mut output = Vec::new();
    workflow.run_interactive(script.as_bytes(), &mut output).await.unwrap();
    let transcript = String::from_utf8(output).unwrap();

    assert!(transcript.contains("Error: Please enter your translation API key."), "{}", transcript);
    assert!(transcript.contains("Selected movie.srt"), "{}", transcript);
    assert!(transcript.contains(&format!("Error: {}", TRANSPORT_FAILURE_MESSAGE)), "{}", transcript);
    assert!(transcript.contains("State: Failed"), "{}", transcript);
    rejected.assert_async().await;

    let script = format!(
        "key secret\nsubmit\nwait\ndownload {dir}\ndownload {dir}\nreset\nstatus\nquit\n",
        dir = out.path().display()
    );
    let mut output = Vec::new();
    workflow.run_interactive(script.as_bytes(), &mut output).await.unwrap();
    let transcript = String::from_utf8(output).unwrap();

    assert!(transcript.contains("Translation complete: movie_translated.srt"), "{}", transcript);
    assert_eq!(transcript.matches("Saved ").count(), 2, "{}", transcript);
    assert!(transcript.contains("File: (none)"), "{}", transcript);
    assert!(transcript.contains("API key: **cret"), "{}", transcript);
    out.child("movie_translated.srt").assert(TRANSLATED);
    assert_eq!(workflow.session().state(), RequestState::Idle);
    accepted.assert_async().await;
}
