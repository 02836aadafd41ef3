use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use crop_mission_channel::decode_state;
use crop_mission_core::MissionState;
use serde_json::Value;
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "mission";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "mission:v1";
/// Delimiter used to separate the prefix and payload.
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while transferring mission snapshots.
#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    /// The provided string was empty or contained only whitespace.
    #[error("snapshot string was empty")]
    EmptyPayload,
    /// The encoded snapshot did not contain a version segment.
    #[error("snapshot string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include the payload segment.
    #[error("snapshot string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("snapshot prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("snapshot version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode snapshot payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload is not JSON, or the state could not be serialised.
    #[error("could not process snapshot JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The payload is JSON but not a mission object.
    #[error("snapshot payload is not a mission state")]
    NotAMission,
}

/// Encodes a mission state into a single-line string.
pub(crate) fn encode(state: &MissionState) -> Result<String, SnapshotError> {
    let json = serde_json::to_vec(state)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{SNAPSHOT_HEADER}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a mission state from its single-line representation.
///
/// The JSON payload is decoded as leniently as channel payloads are:
/// malformed fields fall back to their defaults.
pub(crate) fn decode(value: &str) -> Result<MissionState, SnapshotError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SnapshotError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(SnapshotError::MissingVersion)?;
    let payload = parts.next().ok_or(SnapshotError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(SnapshotError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let json: Value = serde_json::from_slice(&bytes)?;
    decode_state(&json).ok_or(SnapshotError::NotAMission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crop_mission_core::{Drone, StreamPoint};

    #[test]
    fn encoded_state_decodes_back() {
        let state = MissionState::simulated(
            Drone::Spray,
            vec![StreamPoint::new(1_000, 12.35, 78.91, 0.8, "img")],
            "Spraying point 1/1",
        );

        let encoded = encode(&state).expect("state encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:")));
        assert!(!encoded.contains('\n'));

        assert_eq!(decode(&encoded).expect("snapshot decodes"), state);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let encoded = encode(&MissionState::default()).expect("state encodes");

        let decoded = decode(&format!("  {encoded}\n")).expect("snapshot decodes");

        assert_eq!(decoded, MissionState::default());
    }

    #[test]
    fn malformed_headers_are_reported() {
        assert!(matches!(decode("   "), Err(SnapshotError::EmptyPayload)));
        assert!(matches!(decode("mission"), Err(SnapshotError::MissingVersion)));
        assert!(matches!(decode("mission:v1"), Err(SnapshotError::MissingPayload)));
        assert!(matches!(
            decode("farm:v1:e30"),
            Err(SnapshotError::InvalidPrefix(prefix)) if prefix == "farm"
        ));
        assert!(matches!(
            decode("mission:v2:e30"),
            Err(SnapshotError::UnsupportedVersion(version)) if version == "v2"
        ));
    }

    #[test]
    fn payload_errors_are_reported() {
        assert!(matches!(
            decode("mission:v1:***"),
            Err(SnapshotError::InvalidEncoding(_))
        ));

        let not_json = STANDARD_NO_PAD.encode("not json");
        assert!(matches!(
            decode(&format!("mission:v1:{not_json}")),
            Err(SnapshotError::InvalidJson(_))
        ));

        let array = STANDARD_NO_PAD.encode("[1, 2]");
        assert!(matches!(
            decode(&format!("mission:v1:{array}")),
            Err(SnapshotError::NotAMission)
        ));
    }

    #[test]
    fn partial_payloads_fall_back_to_defaults() {
        let partial = STANDARD_NO_PAD.encode(r#"{"drone":"spray"}"#);

        let state = decode(&format!("mission:v1:{partial}")).expect("partial decodes");

        assert_eq!(state.drone, Drone::Spray);
        assert!(state.stream.is_empty());
        assert!(state.status.is_empty());
    }
}
