//! Unit tests for response frame interpretation.

use exiftool_session::protocol::response::{handle_write_response, parse_extract_frame};
use exiftool_session::{ExifError, FieldValue};

// ── Extraction frames ───────────────────────────────────────────────────────

#[test]
fn parses_first_object_of_array() {
    let fields = parse_extract_frame(br#"[{"SourceFile":"a.jpg","ISO":100}]"#).expect("valid");

    assert_eq!(fields["SourceFile"], FieldValue::Text("a.jpg".into()));
    assert_eq!(fields["ISO"], FieldValue::from(100_i64));
}

#[test]
fn tolerates_surrounding_whitespace() {
    let fields = parse_extract_frame(b"\n[{\"A\":\"b\"}]\r\n").expect("valid");
    assert_eq!(fields.len(), 1);
}

#[test]
fn uses_first_element_only() {
    let fields = parse_extract_frame(br#"[{"A":"first"},{"A":"second"}]"#).expect("valid");
    assert_eq!(fields["A"], FieldValue::Text("first".into()));
}

#[test]
fn empty_array_is_parse_error() {
    match parse_extract_frame(b"[]") {
        Err(ExifError::Parse { raw, reason }) => {
            assert_eq!(raw, "[]");
            assert_eq!(reason, "empty response array");
        }
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn non_json_frame_keeps_raw_text() {
    match parse_extract_frame(b"Error: File not found - a.jpg\n") {
        Err(ExifError::Parse { raw, .. }) => {
            assert_eq!(raw, "Error: File not found - a.jpg\n");
        }
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn empty_frame_is_parse_error() {
    match parse_extract_frame(b"") {
        Err(ExifError::Parse { raw, .. }) => assert!(raw.is_empty()),
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn object_instead_of_array_is_parse_error() {
    assert!(matches!(
        parse_extract_frame(br#"{"A":"b"}"#),
        Err(ExifError::Parse { .. })
    ));
}

// ── Write responses ─────────────────────────────────────────────────────────

#[test]
fn exact_success_token_succeeds() {
    handle_write_response("1 image files updated").expect("success");
}

#[test]
fn padded_success_line_succeeds() {
    handle_write_response("    1 image files updated\n").expect("success");
}

#[test]
fn warnings_before_success_token_succeed() {
    handle_write_response("Warning: [minor] odd maker notes\n    1 image files updated\n")
        .expect("success");
}

#[test]
fn token_in_middle_fails() {
    let err = handle_write_response("1 image files updated\nError: later failure")
        .expect_err("token is not at the end");
    assert!(matches!(err, ExifError::WriteFailed(ref msg) if msg.ends_with("later failure")));
}

#[test]
fn zero_files_updated_fails() {
    let err = handle_write_response("    0 image files updated\n").expect_err("nothing written");
    match err {
        ExifError::WriteFailed(msg) => assert_eq!(msg, "0 image files updated"),
        other => panic!("expected WriteFailed, got {other:?}"),
    }
}

#[test]
fn unrelated_output_fails() {
    assert!(matches!(
        handle_write_response("Nothing to do."),
        Err(ExifError::WriteFailed(_))
    ));
    assert!(matches!(
        handle_write_response(""),
        Err(ExifError::WriteFailed(_))
    ));
}

#[test]
fn unchanged_count_is_not_success() {
    assert!(handle_write_response("    1 image files unchanged\n").is_err());
}
