//! Checksummed JSON envelope used for stored and exported saves.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use thiserror::Error;

use crate::constants::{SAVE_FORMAT_ID, SAVE_FORMAT_VERSION};
use crate::snapshot::PlayerSnapshot;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("save is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized save format {found:?}")]
    Format { found: String },
    #[error("save version {found} is newer than supported version {supported}")]
    Version { found: u32, supported: u32 },
    #[error("save checksum mismatch")]
    Checksum,
}

/// Outer save document. `payload` is the serialized snapshot text so the
/// checksum covers exactly the bytes that were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub format: String,
    pub version: u32,
    /// Epoch milliseconds at which the envelope was written.
    pub saved_at: i64,
    pub checksum: String,
    pub payload: String,
}

impl SaveEnvelope {
    /// Wrap a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Json` if the snapshot cannot be serialized.
    pub fn seal(snapshot: &PlayerSnapshot, saved_at: i64) -> Result<Self, CodecError> {
        let payload = serde_json::to_string(snapshot)?;
        Ok(Self::seal_raw(payload, saved_at))
    }

    pub(crate) fn seal_raw(payload: String, saved_at: i64) -> Self {
        Self {
            format: SAVE_FORMAT_ID.to_string(),
            version: SAVE_FORMAT_VERSION,
            saved_at,
            checksum: checksum_hex(payload.as_bytes()),
            payload,
        }
    }

    /// Check format, version, and checksum, returning the raw payload text.
    ///
    /// # Errors
    ///
    /// Returns the first envelope check that fails.
    pub fn verified_payload(&self) -> Result<&str, CodecError> {
        if self.format != SAVE_FORMAT_ID {
            return Err(CodecError::Format {
                found: self.format.clone(),
            });
        }
        if self.version == 0 || self.version > SAVE_FORMAT_VERSION {
            return Err(CodecError::Version {
                found: self.version,
                supported: SAVE_FORMAT_VERSION,
            });
        }
        if checksum_hex(self.payload.as_bytes()) != self.checksum {
            return Err(CodecError::Checksum);
        }
        Ok(&self.payload)
    }
}

/// Serialize a snapshot into a sealed save document.
///
/// # Errors
///
/// Returns `CodecError::Json` if serialization fails.
pub fn encode_snapshot(snapshot: &PlayerSnapshot, saved_at: i64) -> Result<String, CodecError> {
    let envelope = SaveEnvelope::seal(snapshot, saved_at)?;
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse and verify a sealed save document.
///
/// # Errors
///
/// Returns `CodecError` for malformed JSON or a failed envelope check.
pub fn decode_snapshot(raw: &str) -> Result<PlayerSnapshot, CodecError> {
    let envelope: SaveEnvelope = serde_json::from_str(raw)?;
    let payload = envelope.verified_payload()?;
    let snapshot: PlayerSnapshot = serde_json::from_str(payload)?;
    Ok(snapshot.normalized())
}

fn checksum_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
