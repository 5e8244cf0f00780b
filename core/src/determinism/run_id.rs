use crate::determinism::json_canonical::to_canonical_bytes;
use crate::error::{CoreError, CoreResult};
use crate::record::raw::RawRequirement;
use sha2::{Digest, Sha256};

pub fn run_id_from_fingerprint_hex32(fingerprint_hex: &str) -> CoreResult<String> {
    let hex = fingerprint_hex.trim();
    if hex.len() < 32 || !hex.chars().take(32).all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidInput(
            "fingerprint must be hex with length >= 32".to_string(),
        ));
    }
    Ok(format!("r_{}", hex[..32].to_ascii_lowercase()))
}

/// Same records, same run id.
pub fn run_id_for_records(records: &[RawRequirement]) -> CoreResult<String> {
    let bytes = to_canonical_bytes(&records)?;
    run_id_from_fingerprint_hex32(&sha256_hex(&bytes))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}
