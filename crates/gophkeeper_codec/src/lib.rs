//! # gophkeeper Codec
//!
//! Tagged encoding of vault secrets.
//!
//! Every secret is stored as a single byte sequence: one tag byte naming
//! the variant, followed by its payload.
//!
//! | tag | variant          | payload                         |
//! |-----|------------------|---------------------------------|
//! | 1   | `LoginPassword`  | JSON `{"login","password"}`     |
//! | 2   | `FreeText`       | JSON `{"text"}`                 |
//! | 3   | `BinaryBlob`     | standard base64 of the bytes    |
//! | 4   | `PaymentCard`    | JSON card fields                |
//!
//! The encoded bytes are what gets sealed and replicated; the
//! replication layer never looks inside them.
//!
//! ## Usage
//!
//! ```
//! use gophkeeper_codec::{decode_secret, encode_secret, Secret};
//!
//! let secret = Secret::login_password("alice", "hunter2");
//! let bytes = encode_secret(&secret).unwrap();
//! assert_eq!(decode_secret(&bytes).unwrap(), secret);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod input;
mod secret;

pub use decoder::{decode_secret, MIN_ENCODED_LEN};
pub use encoder::encode_secret;
pub use error::{CodecError, CodecResult};
pub use input::from_user_input;
pub use secret::{
    BinaryBlob, FreeText, LoginPassword, PaymentCard, Secret, SecretKind, CARD_NUMBER_LEN,
    CARD_YEAR_RANGE, CVC_LEN,
};

/// Trait for types that can be encoded to tagged bytes.
pub trait Encode {
    /// Encode this value.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from tagged bytes.
pub trait Decode: Sized {
    /// Decode a value.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Secret {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_secret(self)
    }
}

impl Decode for Secret {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_secret(bytes)
    }
}
