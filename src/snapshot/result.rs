//! Snapshot outcome types

use crate::utils::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a captured image, usually a URI
///
/// The format belongs to the native binding. This layer never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotPayload(String);

impl SnapshotPayload {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one snapshot call, delivered through its completion handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SnapshotResult {
    Success { payload: SnapshotPayload },
    Failure { reason: SnapshotError },
}

impl SnapshotResult {
    pub fn success(payload: impl Into<String>) -> Self {
        SnapshotResult::Success {
            payload: SnapshotPayload::new(payload),
        }
    }

    pub fn failure(reason: SnapshotError) -> Self {
        SnapshotResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SnapshotResult::Success { .. })
    }

    pub fn payload(&self) -> Option<&SnapshotPayload> {
        match self {
            SnapshotResult::Success { payload } => Some(payload),
            SnapshotResult::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&SnapshotError> {
        match self {
            SnapshotResult::Success { .. } => None,
            SnapshotResult::Failure { reason } => Some(reason),
        }
    }

    /// Convert into a plain `Result` for `?`-style callers
    pub fn into_result(self) -> Result<SnapshotPayload, SnapshotError> {
        match self {
            SnapshotResult::Success { payload } => Ok(payload),
            SnapshotResult::Failure { reason } => Err(reason),
        }
    }
}

impl From<Result<SnapshotPayload, SnapshotError>> for SnapshotResult {
    fn from(result: Result<SnapshotPayload, SnapshotError>) -> Self {
        match result {
            Ok(payload) => SnapshotResult::Success { payload },
            Err(reason) => SnapshotResult::Failure { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_shape() {
        let result = SnapshotResult::success("img://123");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "kind": "Success", "payload": "img://123" })
        );
    }

    #[test]
    fn test_unimplemented_wire_shape() {
        let result = SnapshotResult::failure(SnapshotError::Unimplemented);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "kind": "Failure", "reason": "Unimplemented" })
        );
    }

    #[test]
    fn test_native_failure_wire_shape() {
        let result = SnapshotResult::failure(SnapshotError::NativeFailure("no frame".into()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "kind": "Failure", "reason": { "NativeFailure": "no frame" } })
        );
    }

    #[test]
    fn test_parse_failure_from_bridge() {
        let result: SnapshotResult =
            serde_json::from_str(r#"{"kind":"Failure","reason":"Unimplemented"}"#).unwrap();
        assert_eq!(result.reason(), Some(&SnapshotError::Unimplemented));
    }

    #[test]
    fn test_into_result() {
        let payload = SnapshotResult::success("file:///tmp/a.jpg").into_result().unwrap();
        assert_eq!(payload.as_str(), "file:///tmp/a.jpg");

        let err = SnapshotResult::failure(SnapshotError::Unimplemented)
            .into_result()
            .unwrap_err();
        assert_eq!(err, SnapshotError::Unimplemented);
    }
}
