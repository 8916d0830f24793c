//! Secret decoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;

use crate::error::{CodecError, CodecResult};
use crate::secret::{BinaryBlob, Secret, SecretKind};

/// Smallest valid encoding: one tag byte and at least one payload byte.
pub const MIN_ENCODED_LEN: usize = 2;

/// Decodes bytes produced by [`encode_secret`](crate::encode_secret).
///
/// Fails with [`CodecError::MalformedValue`] when the input is too short,
/// the tag is unknown, or the payload does not parse for its tag.
pub fn decode_secret(bytes: &[u8]) -> CodecResult<Secret> {
    if bytes.len() < MIN_ENCODED_LEN {
        return Err(CodecError::malformed(format!(
            "expected at least {MIN_ENCODED_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let (tag, payload) = (bytes[0], &bytes[1..]);
    let kind = SecretKind::from_tag(tag)
        .ok_or_else(|| CodecError::malformed(format!("unknown tag {tag}")))?;

    match kind {
        SecretKind::LoginPassword => read_json(kind, payload).map(Secret::LoginPassword),
        SecretKind::FreeText => read_json(kind, payload).map(Secret::FreeText),
        SecretKind::BinaryBlob => STANDARD
            .decode(payload)
            .map(|bytes| Secret::BinaryBlob(BinaryBlob { bytes }))
            .map_err(|e| CodecError::malformed(format!("{kind} payload: {e}"))),
        SecretKind::PaymentCard => read_json(kind, payload).map(Secret::PaymentCard),
    }
}

fn read_json<T: DeserializeOwned>(kind: SecretKind, payload: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(payload)
        .map_err(|e| CodecError::malformed(format!("{kind} payload: {e}")))
}
