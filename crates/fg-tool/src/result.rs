// result.rs: The standard success/failure envelope every tool returns.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Execution metadata attached to a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultMetadata {
    /// Wall-clock execution time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of items in `data` when it is a collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    /// True when `data` was cut short (e.g. a query hit its row limit).
    #[serde(default)]
    pub truncated: bool,
    /// Which collaborator produced the data (e.g. "fleet_store", "planner").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub cache_hit: bool,
}

impl ResultMetadata {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = Some(count);
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

/// Outcome of a tool invocation.
///
/// Fields are private: the constructors below are the only way to build a
/// result, which keeps `success == error.is_none()` true for every value.
/// Deserialization goes through [`RawToolResult`] and re-checks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawToolResult")]
pub struct ToolResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ToolError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<ResultMetadata>,
}

/// Wire form of a ToolResult before the invariant is checked.
#[derive(Deserialize)]
struct RawToolResult {
    success: bool,
    #[serde(default, deserialize_with = "present")]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ToolError>,
    #[serde(default)]
    metadata: Option<ResultMetadata>,
}

/// A present `data` field is `Some`, even when it holds `null`; only a
/// missing field is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawToolResult> for ToolResult {
    type Error = String;

    fn try_from(raw: RawToolResult) -> Result<Self, Self::Error> {
        match (raw.success, raw.error.is_some()) {
            (true, true) => Err("successful result must not carry an error".to_string()),
            (false, false) => Err("failed result must carry an error".to_string()),
            _ => Ok(ToolResult {
                success: raw.success,
                data: raw.data,
                error: raw.error,
                metadata: raw.metadata,
            }),
        }
    }
}

impl ToolResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    pub fn success_with_metadata(data: serde_json::Value, metadata: ResultMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Some(metadata),
        }
    }

    pub fn error(err: ToolError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err),
            metadata: None,
        }
    }

    /// Bridge from an optional error: `None` is a success without data.
    pub fn from_error<E>(err: Option<E>) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        match err {
            None => Self {
                success: true,
                data: None,
                error: None,
                metadata: None,
            },
            Some(e) => Self::error(ToolError::wrap(e)),
        }
    }

    /// Bridge from a conventional `Result`.
    pub fn from_result<T, E>(result: Result<T, E>) -> Self
    where
        T: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(data) => Self::success(data),
                Err(e) => Self::error(ToolError::wrap(e)),
            },
            Err(e) => Self::error(ToolError::wrap(e)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn error_ref(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn metadata(&self) -> Option<&ResultMetadata> {
        self.metadata.as_ref()
    }

    /// Consume the result, yielding the payload or the tool error.
    pub fn into_result(self) -> Result<serde_json::Value, ToolError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data.unwrap_or(serde_json::Value::Null)),
        }
    }

    /// Record execution time unless the tool already did.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        let metadata = self.metadata.get_or_insert_with(ResultMetadata::default);
        if metadata.duration_ms.is_none() {
            metadata.duration_ms = Some(duration_ms);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn success_has_no_error() {
        let result = ToolResult::success(json!({"count": 3}));
        assert!(result.is_success());
        assert!(result.error_ref().is_none());
        assert_eq!(result.data().unwrap()["count"], 3);
    }

    #[test]
    fn error_has_no_data() {
        let result = ToolResult::error(ToolError::invalid_input("missing family"));
        assert!(!result.is_success());
        assert!(result.data().is_none());
        assert_eq!(result.error_ref().unwrap().code, ErrorCode::InvalidInput);
    }

    #[test]
    fn from_error_bridges_both_arms() {
        let ok = ToolResult::from_error::<ToolError>(None);
        assert!(ok.is_success());
        assert!(ok.data().is_none());
        assert_eq!(ok.into_result().unwrap(), serde_json::Value::Null);

        let failed = ToolResult::from_error(Some(ToolError::timeout("slow store")));
        assert!(!failed.is_success());
        assert_eq!(failed.error_ref().unwrap().code, ErrorCode::Timeout);
    }

    #[test]
    fn from_result_serializes_ok_values() {
        let result = ToolResult::from_result::<_, ToolError>(Ok(vec![1, 2, 3]));
        assert_eq!(result.data().unwrap(), &json!([1, 2, 3]));

        let result = ToolResult::from_result::<u8, _>(Err("boom"));
        assert_eq!(result.error_ref().unwrap().code, ErrorCode::Internal);
    }

    #[test]
    fn round_trip_preserves_success_data_and_code() {
        let results = vec![
            ToolResult::success(json!({"assets": ["a", "b"]})),
            ToolResult::success_with_metadata(
                json!([]),
                ResultMetadata::from_source("fleet_store").with_item_count(0),
            ),
            ToolResult::error(
                ToolError::precondition_failed("replication broken")
                    .with_details(json!({"issues": 1})),
            ),
            ToolResult::from_error::<ToolError>(None),
            ToolResult::success(json!(null)),
            ToolResult::success(json!(null)).with_duration_ms(3),
        ];
        for result in results {
            let json = serde_json::to_string(&result).unwrap();
            let restored: ToolResult = serde_json::from_str(&json).unwrap();
            assert_eq!(restored.is_success(), result.is_success());
            assert_eq!(restored.data(), result.data());
            assert_eq!(
                restored.error_ref().map(|e| e.code),
                result.error_ref().map(|e| e.code)
            );
            assert_eq!(restored, result);
        }
    }

    #[test]
    fn explicit_null_data_differs_from_missing_data() {
        let null: ToolResult =
            serde_json::from_value(json!({"success": true, "data": null})).unwrap();
        assert_eq!(null.data(), Some(&serde_json::Value::Null));

        let missing: ToolResult = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(missing.data().is_none());
    }

    #[test]
    fn inconsistent_wire_results_are_rejected() {
        let both = json!({
            "success": true,
            "data": 1,
            "error": {"code": "internal", "message": "x", "retryable": true}
        });
        assert!(serde_json::from_value::<ToolResult>(both).is_err());

        let neither = json!({"success": false});
        assert!(serde_json::from_value::<ToolResult>(neither).is_err());
    }

    #[test]
    fn duration_is_filled_once() {
        let result = ToolResult::success(json!(null))
            .with_duration_ms(12)
            .with_duration_ms(99);
        assert_eq!(result.metadata().unwrap().duration_ms, Some(12));
    }
}
