//! Calls dropped after their command reached exiftool.
//!
//! The response of an abandoned command must never be handed to the next
//! caller.

use std::future::Future;
use std::time::{Duration, Instant};

use exiftool_session::FileMetadata;

use super::test_helpers::Fixture;

/// Poll `call` until exiftool has logged a command, then drop it unfinished.
async fn abandon_after_send<F: Future>(fx: &Fixture, call: F) {
    let mut call = std::pin::pin!(call);
    let deadline = Instant::now() + Duration::from_secs(5);
    while fx.commands().is_empty() {
        assert!(Instant::now() < deadline, "command never reached exiftool");
        tokio::select! {
            _ = &mut call => panic!("call finished before it could be abandoned"),
            () = tokio::time::sleep(Duration::from_millis(5)) => {}
        }
    }
}

/// An extraction after an abandoned one gets its own file's fields.
#[tokio::test]
async fn abandoned_extract_does_not_leak_into_next_batch() {
    let fx = Fixture::new();
    let slow = fx.file("first.slow", r#"{"Title":"from a"}"#);
    let next = fx.file("second.jpg", r#"{"Title":"from b"}"#);
    let session = fx.start();

    abandon_after_send(&fx, session.extract_metadata(&[&slow])).await;
    let items = session.extract_metadata(&[&next]).await;

    assert!(items[0].is_ok(), "{:?}", items[0].err);
    assert_eq!(
        items[0].get_string("SourceFile").expect("source"),
        next.display().to_string()
    );
    assert_eq!(items[0].get_string("Title").expect("title"), "from b");

    session.close().await.expect("clean close");
}

/// A write after an abandoned extraction reads its own write response.
#[tokio::test]
async fn abandoned_extract_does_not_leak_into_write() {
    let fx = Fixture::new();
    let slow = fx.file("first.slow", r#"{"Title":"from a"}"#);
    let target = fx.file("target.jpg", "");
    let session = fx.start();

    abandon_after_send(&fx, session.extract_metadata(&[&slow])).await;

    let mut item = FileMetadata::new(&target);
    item.set_string("Title", "written");
    session.write_metadata(std::slice::from_mut(&mut item)).await;
    assert!(item.is_ok(), "{:?}", item.err);

    let items = session.extract_metadata(&[&target]).await;
    assert_eq!(items[0].get_string("Title").expect("title"), "written");

    session.close().await.expect("clean close");
}

/// A call cut short by `tokio::time::timeout` leaves the session usable.
#[tokio::test]
async fn timed_out_call_leaves_session_in_sync() {
    let fx = Fixture::new();
    let slow = fx.file("first.slow", r#"{"Title":"from a"}"#);
    let next = fx.file("second.jpg", r#"{"Title":"from b"}"#);
    let session = fx.start();

    let timed_out = tokio::time::timeout(
        Duration::from_millis(100),
        session.extract_metadata(&[&slow]),
    )
    .await;
    assert!(timed_out.is_err(), "slow extraction should time out");

    let items = session.extract_metadata(&[&next, &slow]).await;

    assert_eq!(items[0].get_string("Title").expect("title"), "from b");
    assert_eq!(items[1].get_string("Title").expect("title"), "from a");
    assert_eq!(
        items[1].get_string("SourceFile").expect("source"),
        slow.display().to_string()
    );

    session.close().await.expect("clean close");
}
