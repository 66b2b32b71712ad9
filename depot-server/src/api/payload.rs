//! Parsing of `cargo publish` payloads.
//!
//! The body is framed as: `u32` LE metadata length, JSON metadata, `u32` LE
//! crate length, `.crate` archive.

use depot_core::validation::{self, ValidationError};
use depot_core::RegistryError;
use tracing::{debug, warn};

use super::models::PublishMetadata;
use crate::error::{AppError, AppResult};

fn invalid(reason: impl Into<String>) -> AppError {
    RegistryError::InvalidPayload {
        reason: reason.into(),
    }
    .into()
}

fn read_length(data: &[u8], offset: usize) -> Option<usize> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

/// Split a publish payload into its metadata and crate archive.
pub fn parse_publish_payload(
    data: &[u8],
    max_crate_size: u64,
) -> AppResult<(PublishMetadata, Vec<u8>)> {
    let payload_size = data.len();

    let metadata_len = read_length(data, 0).ok_or_else(|| {
        warn!(payload_size, "Publish payload too small");
        invalid("payload too small to hold the metadata length")
    })?;

    if metadata_len > validation::MAX_METADATA_SIZE {
        warn!(metadata_len, "Publish metadata section too large");
        return Err(AppError::UploadError(format!(
            "metadata section too large: {metadata_len} bytes (max: {} bytes)",
            validation::MAX_METADATA_SIZE
        )));
    }

    let metadata_bytes = data
        .get(4..4 + metadata_len)
        .ok_or_else(|| invalid("payload too small for the declared metadata length"))?;

    let crate_len_offset = 4 + metadata_len;
    let crate_len = read_length(data, crate_len_offset)
        .ok_or_else(|| invalid("payload is missing the crate length"))?;

    validation::validate_publish_structure(payload_size, metadata_len, crate_len, max_crate_size)
        .map_err(|e| match e {
            ValidationError::FileTooLarge { .. } => {
                warn!(crate_len, max_crate_size, "Crate archive too large");
                AppError::UploadError(format!("crate archive too large: {e}"))
            }
            other => invalid(other.to_string()),
        })?;

    let crate_data_offset = crate_len_offset + 4;
    let crate_data = data
        .get(crate_data_offset..crate_data_offset + crate_len)
        .ok_or_else(|| invalid("payload too small for the declared crate length"))?;

    let metadata: PublishMetadata = serde_json::from_slice(metadata_bytes)
        .map_err(|e| invalid(format!("invalid metadata JSON: {e}")))?;

    debug!(
        name = %metadata.name,
        vers = %metadata.vers,
        crate_size = crate_data.len(),
        "Parsed publish payload"
    );
    Ok((metadata, crate_data.to_vec()))
}

/// Build a publish payload. Used by tests and tooling.
pub fn encode_publish_payload(metadata: &[u8], crate_data: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + metadata.len() + crate_data.len());
    payload.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    payload.extend_from_slice(metadata);
    payload.extend_from_slice(&(crate_data.len() as u32).to_le_bytes());
    payload.extend_from_slice(crate_data);
    payload
}
