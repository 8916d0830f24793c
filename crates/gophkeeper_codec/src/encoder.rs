//! Secret encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};
use crate::secret::Secret;

/// Encodes a secret as its tag byte followed by the payload.
///
/// The secret is validated first, so an invalid secret never reaches
/// storage. The payload is never empty.
pub fn encode_secret(secret: &Secret) -> CodecResult<Vec<u8>> {
    secret.validate()?;

    let mut out = vec![secret.kind().tag()];
    match secret {
        Secret::LoginPassword(v) => write_json(&mut out, v)?,
        Secret::FreeText(v) => write_json(&mut out, v)?,
        Secret::BinaryBlob(v) => out.extend_from_slice(STANDARD.encode(&v.bytes).as_bytes()),
        Secret::PaymentCard(v) => write_json(&mut out, v)?,
    }
    Ok(out)
}

fn write_json<T: Serialize>(out: &mut Vec<u8>, value: &T) -> CodecResult<()> {
    serde_json::to_writer(out, value).map_err(|e| CodecError::encoding_failed(e.to_string()))
}
