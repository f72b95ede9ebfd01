/*!
 * Tests for error types
 */

use pagetran::errors::{AppError, BatchError, DispatchError, NetworkError, ParseError};

#[test]
fn test_network_error_display_shouldDescribeCause() {
    assert_eq!(NetworkError::Timeout(180).to_string(), "Request timed out after 180 seconds");

    let status = NetworkError::Status {
        status_code: 429,
        message: "rate limited".to_string(),
    };
    assert!(status.to_string().contains("429"));
    assert!(status.to_string().contains("rate limited"));
}

#[test]
fn test_batch_error_from_shouldWrapBothKinds() {
    let network: BatchError = NetworkError::Connection("refused".to_string()).into();
    assert!(matches!(network, BatchError::Network(NetworkError::Connection(_))));

    let parse: BatchError = ParseError::from_reply("nothing here").into();
    assert!(parse.to_string().starts_with("Parse error"));
}

#[test]
fn test_parse_error_fromReply_shouldTruncateExcerpt() {
    let reply = "x".repeat(1_000);
    let err = ParseError::from_reply(&reply);
    assert_eq!(err.reply_chars, 1_000);
    assert_eq!(err.excerpt.chars().count(), 200);
}

#[test]
fn test_dispatch_error_display_shouldUseOneBasedBatchNumber() {
    let err = DispatchError::Aborted {
        batch_index: 2,
        page_numbers: vec![5, 6],
    };
    assert_eq!(err.to_string(), "Run aborted by operator at batch 3 (pages [5, 6])");
}

#[test]
fn test_app_error_conversions_shouldPickVariant() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(AppError::from(io), AppError::File(_)));

    let dispatch = DispatchError::Aborted {
        batch_index: 0,
        page_numbers: vec![1],
    };
    assert!(matches!(AppError::from(dispatch), AppError::Dispatch(_)));

    assert!(matches!(AppError::from(anyhow::anyhow!("boom")), AppError::Unknown(_)));
}
