//! Non-JSON output on the merged stream and exiftool dying mid-session.

use exiftool_session::ExifError;

use super::test_helpers::Fixture;

/// A warning printed ahead of the JSON does not break extraction.
#[tokio::test]
async fn diagnostic_line_before_json_is_tolerated() {
    let fx = Fixture::new();
    let noisy = fx.file("noisy.diag", r#"{"Title":"still here"}"#);
    let after = fx.file("after.jpg", r#"{"Title":"next"}"#);
    let session = fx.start();

    let items = session.extract_metadata(&[&noisy, &after]).await;

    assert!(items[0].is_ok(), "{:?}", items[0].err);
    assert_eq!(items[0].get_string("Title").expect("title"), "still here");
    assert!(items[1].is_ok(), "{:?}", items[1].err);
    assert_eq!(items[1].get_string("Title").expect("title"), "next");

    session.close().await.expect("clean close");
}

/// exiftool crashing on a file reports what it printed, fails the rest of
/// the batch, and makes close report the abnormal exit.
#[tokio::test]
async fn crash_reports_output_and_fails_remaining_items() {
    let fx = Fixture::new();
    let first = fx.file("first.jpg", "");
    let broken = fx.file("broken.crash", "");
    let after = fx.file("after.jpg", "");
    let session = fx.start();

    let items = session.extract_metadata(&[&first, &broken, &after]).await;

    assert!(items[0].is_ok(), "{:?}", items[0].err);
    match &items[1].err {
        Some(ExifError::Read(msg)) => {
            assert!(msg.contains("fatal error while parsing"), "{msg}");
            assert!(msg.ends_with("EOF"), "{msg}");
        }
        other => panic!("expected Read, got {other:?}"),
    }
    assert!(
        matches!(
            items[2].err,
            Some(ExifError::Read(_) | ExifError::Write(_))
        ),
        "{:?}",
        items[2].err
    );

    match session.close().await {
        Err(ExifError::Shutdown(errors)) => {
            assert!(
                errors.iter().any(|e| e.starts_with("exiftool exited with")),
                "{errors:?}"
            );
        }
        other => panic!("expected Shutdown, got {other:?}"),
    }
    assert!(session.is_closed().await);
}

/// Diagnostics printed instead of JSON are kept in the parse error.
#[tokio::test]
async fn missing_json_reports_parse_error_with_diagnostics() {
    let fx = Fixture::new();
    let odd = fx.file("odd.nojson", "");
    let after = fx.file("after.jpg", r#"{"Title":"next"}"#);
    let session = fx.start();

    let items = session.extract_metadata(&[&odd, &after]).await;

    match &items[0].err {
        Some(ExifError::Parse { raw, .. }) => {
            assert!(raw.starts_with("Error: Unknown file type"), "{raw}");
        }
        other => panic!("expected Parse, got {other:?}"),
    }
    assert!(items[1].is_ok(), "{:?}", items[1].err);
    assert_eq!(items[1].get_string("Title").expect("title"), "next");

    session.close().await.expect("clean close");
}
