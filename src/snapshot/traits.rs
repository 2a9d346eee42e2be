//! Snapshot trait definitions
//!
//! Platform-agnostic types and the two seams every platform plugs into:
//! [`SnapshotBackend`] for the public operation and [`NativeBinding`] for
//! the native capture code behind it.

use super::native::NativeCompletion;
use super::result::SnapshotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How to capture a snapshot
///
/// A pass-through record. Its keys are defined by the native binding; this
/// layer only reads them and hands the value on unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotOptions(Map<String, Value>);

impl SnapshotOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from a JSON value. Anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Add an entry, consuming and returning the options
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }
}

impl From<Map<String, Value>> for SnapshotOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Whether a platform can take snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Backed by a native binding
    Implemented,
    /// Stub that fails every call with `Unimplemented`
    Unimplemented,
}

/// Per-platform capability record
///
/// Fixed at build time for a target. Never changes while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    /// Target the descriptor was built for
    pub platform: &'static str,

    /// Capture support on that target
    pub capability: Capability,
}

impl CapabilityDescriptor {
    pub const fn implemented(platform: &'static str) -> Self {
        Self {
            platform,
            capability: Capability::Implemented,
        }
    }

    pub const fn unimplemented(platform: &'static str) -> Self {
        Self {
            platform,
            capability: Capability::Unimplemented,
        }
    }

    pub fn is_implemented(&self) -> bool {
        self.capability == Capability::Implemented
    }
}

/// One platform's implementation of the snapshot operation
///
/// `capture` must not panic for ordinary failures; it reports them as a
/// `Failure` result. Panics are caught by the dispatcher regardless.
#[async_trait]
pub trait SnapshotBackend: Send + Sync + 'static {
    /// Capability record of this implementation
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Capture one snapshot
    async fn capture(&self, options: SnapshotOptions) -> SnapshotResult;
}

/// Native capture code, called with a fixed shape
///
/// Implementations take the options and a single-shot completion, perform
/// the capture on whatever thread or queue they like, and report through
/// the completion exactly once.
pub trait NativeBinding: Send + Sync + 'static {
    fn capture(&self, options: SnapshotOptions, completion: NativeCompletion);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_from_non_object() {
        assert!(SnapshotOptions::from_value(json!([1, 2])).is_none());
        assert!(SnapshotOptions::from_value(json!({ "quality": 0.8 })).is_some());
    }

    #[test]
    fn test_options_accessors() {
        let options = SnapshotOptions::new()
            .with("quality", 0.8)
            .with("source", "/videos/clip.mov")
            .with("width", 640)
            .with("timestamp", true);

        assert_eq!(options.get_f64("quality"), Some(0.8));
        assert_eq!(options.get_str("source"), Some("/videos/clip.mov"));
        assert_eq!(options.get_u64("width"), Some(640));
        assert_eq!(options.get_bool("timestamp"), Some(true));
        assert_eq!(options.get_str("quality"), None);
    }

    #[test]
    fn test_options_serialize_as_plain_object() {
        let options = SnapshotOptions::new().with("quality", 0.8);
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({ "quality": 0.8 }));
    }

    #[test]
    fn test_descriptor_constructors() {
        assert!(CapabilityDescriptor::implemented("linux").is_implemented());
        assert!(!CapabilityDescriptor::unimplemented("android").is_implemented());
    }
}
