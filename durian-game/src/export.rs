//! Player-facing save export and validated import.
use thiserror::Error;

use crate::realm::{Realm, UnknownRealm};
use crate::save_codec::{CodecError, SaveEnvelope, encode_snapshot};
use crate::snapshot::PlayerSnapshot;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("save does not contain a character")]
    MissingCharacter,
    #[error("character name must not be empty")]
    EmptyName,
    #[error("character realm is missing")]
    MissingRealm,
    #[error(transparent)]
    UnknownRealm(#[from] UnknownRealm),
    #[error("save payload is malformed: {0}")]
    Payload(#[source] serde_json::Error),
}

/// Produce a portable save blob for the player to keep.
///
/// # Errors
///
/// Returns `CodecError` if the snapshot cannot be serialized.
pub fn export_save(snapshot: &PlayerSnapshot, now_ms: i64) -> Result<String, CodecError> {
    encode_snapshot(snapshot, now_ms)
}

/// Parse and validate a save blob produced by [`export_save`].
///
/// The caller's current state is never touched; on success the returned
/// snapshot replaces it wholesale.
///
/// # Errors
///
/// Returns `ImportError` describing the first problem found.
pub fn import_save(blob: &str) -> Result<PlayerSnapshot, ImportError> {
    let envelope: SaveEnvelope = serde_json::from_str(blob.trim()).map_err(CodecError::from)?;
    let payload = envelope.verified_payload()?;
    let mut document: serde_json::Value =
        serde_json::from_str(payload).map_err(CodecError::from)?;

    let character = document
        .get("character")
        .filter(|value| value.is_object())
        .ok_or(ImportError::MissingCharacter)?;
    let name = character
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ImportError::EmptyName);
    }
    let realm: Realm = character
        .get("realm")
        .and_then(serde_json::Value::as_str)
        .ok_or(ImportError::MissingRealm)?
        .parse()?;
    // Display labels are accepted; store the canonical key.
    document["character"]["realm"] = serde_json::Value::from(realm.key());

    let snapshot: PlayerSnapshot =
        serde_json::from_value(document).map_err(ImportError::Payload)?;
    Ok(snapshot.normalized())
}
