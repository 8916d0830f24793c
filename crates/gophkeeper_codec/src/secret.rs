//! Secret variants, their tags and validation rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Kind of a secret, identified on the wire by a single tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SecretKind {
    /// Login and password pair.
    LoginPassword = 1,
    /// Free-form text note.
    FreeText = 2,
    /// Arbitrary binary blob.
    BinaryBlob = 3,
    /// Payment card details.
    PaymentCard = 4,
}

impl SecretKind {
    /// All kinds in tag order.
    pub const ALL: [SecretKind; 4] = [
        SecretKind::LoginPassword,
        SecretKind::FreeText,
        SecretKind::BinaryBlob,
        SecretKind::PaymentCard,
    ];

    /// Returns the tag byte written in front of the payload.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Returns the name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            SecretKind::LoginPassword => "login_password",
            SecretKind::FreeText => "text",
            SecretKind::BinaryBlob => "binary",
            SecretKind::PaymentCard => "card",
        }
    }

    /// Looks up a kind by its command line name.
    pub fn from_name(name: &str) -> CodecResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| CodecError::UnknownKind {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A login and password pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPassword {
    /// Account login.
    pub login: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for LoginPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginPassword")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A free-form text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeText {
    /// Note contents.
    pub text: String,
}

/// Raw bytes, typically the contents of a file.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryBlob {
    /// Blob contents.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for BinaryBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryBlob")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Payment card details.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCard {
    /// Card number.
    pub number: String,
    /// Card holder name.
    pub holder: String,
    /// Expiry month, 1 to 12.
    pub expire_month: u8,
    /// Expiry year, four digits.
    pub expire_year: u16,
    /// Card verification code.
    pub cvc: String,
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("number", &"[REDACTED]")
            .field("holder", &self.holder)
            .field("expire_month", &self.expire_month)
            .field("expire_year", &self.expire_year)
            .field("cvc", &"[REDACTED]")
            .finish()
    }
}

/// Card number length bounds, inclusive.
pub const CARD_NUMBER_LEN: (usize, usize) = (13, 19);
/// Card expiry year bounds, inclusive.
pub const CARD_YEAR_RANGE: (u16, u16) = (2000, 2100);
/// CVC length bounds, inclusive.
pub const CVC_LEN: (usize, usize) = (3, 4);

/// A secret stored in the vault.
///
/// The set of variants is closed. Each variant is encoded behind its
/// [`SecretKind`] tag byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secret {
    /// Login and password pair.
    LoginPassword(LoginPassword),
    /// Free-form text.
    FreeText(FreeText),
    /// Binary blob.
    BinaryBlob(BinaryBlob),
    /// Payment card.
    PaymentCard(PaymentCard),
}

impl Secret {
    /// Creates a login/password secret.
    pub fn login_password(login: impl Into<String>, password: impl Into<String>) -> Self {
        Secret::LoginPassword(LoginPassword {
            login: login.into(),
            password: password.into(),
        })
    }

    /// Creates a text secret.
    pub fn text(text: impl Into<String>) -> Self {
        Secret::FreeText(FreeText { text: text.into() })
    }

    /// Creates a binary secret.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Secret::BinaryBlob(BinaryBlob {
            bytes: bytes.into(),
        })
    }

    /// Creates a payment card secret.
    pub fn card(
        number: impl Into<String>,
        holder: impl Into<String>,
        expire_month: u8,
        expire_year: u16,
        cvc: impl Into<String>,
    ) -> Self {
        Secret::PaymentCard(PaymentCard {
            number: number.into(),
            holder: holder.into(),
            expire_month,
            expire_year,
            cvc: cvc.into(),
        })
    }

    /// Returns the kind of this secret.
    pub fn kind(&self) -> SecretKind {
        match self {
            Secret::LoginPassword(_) => SecretKind::LoginPassword,
            Secret::FreeText(_) => SecretKind::FreeText,
            Secret::BinaryBlob(_) => SecretKind::BinaryBlob,
            Secret::PaymentCard(_) => SecretKind::PaymentCard,
        }
    }

    /// Checks the variant specific constraints.
    pub fn validate(&self) -> CodecResult<()> {
        match self {
            Secret::LoginPassword(v) => {
                require_non_empty("login", &v.login)?;
                require_non_empty("password", &v.password)
            }
            Secret::FreeText(v) => require_non_empty("text", &v.text),
            Secret::BinaryBlob(v) => {
                if v.bytes.is_empty() {
                    return Err(CodecError::validation("bytes", "must not be empty"));
                }
                Ok(())
            }
            Secret::PaymentCard(v) => validate_card(v),
        }
    }

    /// Returns the blob contents for binary secrets.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Secret::BinaryBlob(v) => Some(&v.bytes),
            _ => None,
        }
    }
}

fn require_non_empty(field: &'static str, value: &str) -> CodecResult<()> {
    if value.is_empty() {
        return Err(CodecError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_card(card: &PaymentCard) -> CodecResult<()> {
    let (min, max) = CARD_NUMBER_LEN;
    let len = card.number.chars().count();
    if !(min..=max).contains(&len) {
        return Err(CodecError::validation(
            "number",
            format!("length must be between {min} and {max}, got {len}"),
        ));
    }

    require_non_empty("holder", &card.holder)?;

    if !(1..=12).contains(&card.expire_month) {
        return Err(CodecError::validation(
            "expire_month",
            format!("must be between 1 and 12, got {}", card.expire_month),
        ));
    }

    let (min, max) = CARD_YEAR_RANGE;
    if !(min..=max).contains(&card.expire_year) {
        return Err(CodecError::validation(
            "expire_year",
            format!("must be between {min} and {max}, got {}", card.expire_year),
        ));
    }

    let (min, max) = CVC_LEN;
    let len = card.cvc.chars().count();
    if !(min..=max).contains(&len) {
        return Err(CodecError::validation(
            "cvc",
            format!("length must be between {min} and {max}, got {len}"),
        ));
    }

    Ok(())
}

/// Display-only rendering. Never parsed back.
impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::LoginPassword(v) => write!(f, "Login: {}, Password: {}", v.login, v.password),
            Secret::FreeText(v) => f.write_str(&v.text),
            Secret::BinaryBlob(v) => write!(f, "Binary: {} bytes", v.bytes.len()),
            Secret::PaymentCard(v) => write!(
                f,
                "Card: {}, {}, {:02}/{}, {}",
                v.number, v.holder, v.expire_month, v.expire_year, v.cvc
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_card() -> Secret {
        Secret::card("4111111111111111", "J DOE", 7, 2030, "123")
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(SecretKind::LoginPassword.tag(), 1);
        assert_eq!(SecretKind::FreeText.tag(), 2);
        assert_eq!(SecretKind::BinaryBlob.tag(), 3);
        assert_eq!(SecretKind::PaymentCard.tag(), 4);
        assert_eq!(SecretKind::from_tag(0), None);
        assert_eq!(SecretKind::from_tag(5), None);
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in SecretKind::ALL {
            assert_eq!(SecretKind::from_name(kind.name()).unwrap(), kind);
        }
        assert!(matches!(
            SecretKind::from_name("passport"),
            Err(CodecError::UnknownKind { .. })
        ));
    }

    #[test]
    fn empty_fields_rejected() {
        assert!(Secret::login_password("", "pw").validate().is_err());
        assert!(Secret::login_password("me", "").validate().is_err());
        assert!(Secret::text("").validate().is_err());
        assert!(Secret::binary(Vec::new()).validate().is_err());
        assert!(Secret::login_password("me", "pw").validate().is_ok());
        assert!(Secret::text("note").validate().is_ok());
        assert!(Secret::binary(vec![0u8]).validate().is_ok());
    }

    #[test]
    fn card_constraints() {
        assert!(valid_card().validate().is_ok());

        let short = Secret::card("411111111111", "J DOE", 7, 2030, "123");
        assert!(matches!(
            short.validate(),
            Err(CodecError::Validation { field: "number", .. })
        ));

        let long = Secret::card("41111111111111111111", "J DOE", 7, 2030, "123");
        assert!(long.validate().is_err());

        let no_holder = Secret::card("4111111111111", "", 7, 2030, "123");
        assert!(no_holder.validate().is_err());

        for month in [0, 13] {
            let card = Secret::card("4111111111111", "J DOE", month, 2030, "123");
            assert!(matches!(
                card.validate(),
                Err(CodecError::Validation {
                    field: "expire_month",
                    ..
                })
            ));
        }

        for year in [1999, 2101] {
            let card = Secret::card("4111111111111", "J DOE", 1, year, "123");
            assert!(card.validate().is_err());
        }

        for cvc in ["12", "12345"] {
            let card = Secret::card("4111111111111", "J DOE", 1, 2030, cvc);
            assert!(card.validate().is_err());
        }

        let bounds = Secret::card("4111111111111111111", "J", 12, 2100, "1234");
        assert!(bounds.validate().is_ok());
    }

    #[test]
    fn render_formats() {
        assert_eq!(
            Secret::login_password("me", "pw").to_string(),
            "Login: me, Password: pw"
        );
        assert_eq!(Secret::text("hello world").to_string(), "hello world");
        assert_eq!(Secret::binary(vec![1, 2, 3]).to_string(), "Binary: 3 bytes");
        assert_eq!(
            valid_card().to_string(),
            "Card: 4111111111111111, J DOE, 07/2030, 123"
        );
    }

    #[test]
    fn debug_redacts_sensitive_fields() {
        let debug = format!("{:?}", Secret::login_password("me", "hunter2"));
        assert!(debug.contains("me"));
        assert!(!debug.contains("hunter2"));

        let debug = format!("{:?}", valid_card());
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123\""));
    }
}
