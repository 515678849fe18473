//! Probe payloads: liveness, readiness, and build version.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LivenessRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionRequest {}

/// Build metadata. Field names are `PascalCase` on the wire
/// (`BuildTime`, `Version`, `Commit`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionResponse {
    pub build_time: String,
    pub version: String,
    pub commit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_uses_pascal_case_keys() {
        let resp = VersionResponse {
            build_time: "2026-01-01T00:00:00Z".to_string(),
            version: "0.1.0".to_string(),
            commit: "abc123".to_string(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["BuildTime"], "2026-01-01T00:00:00Z");
        assert_eq!(value["Version"], "0.1.0");
        assert_eq!(value["Commit"], "abc123");
    }

    #[test]
    fn empty_request_accepts_empty_object() {
        let req: LivenessRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, LivenessRequest {});
    }
}
