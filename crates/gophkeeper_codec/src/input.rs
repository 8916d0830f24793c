//! Building secrets from command line arguments.

use std::fs;
use std::str::FromStr;

use crate::error::{CodecError, CodecResult};
use crate::secret::{Secret, SecretKind};

/// Builds a validated secret from a type name and positional arguments.
///
/// | type             | arguments                                   |
/// |------------------|---------------------------------------------|
/// | `login_password` | `<login> <password>`                        |
/// | `text`           | `<text...>` (joined with single spaces)     |
/// | `binary`         | `<path>` of a file to read                  |
/// | `card`           | `<number> <holder> <month> <year> <cvc>`    |
///
/// All checks run before the secret is returned, so a failure here means
/// nothing was encrypted or stored.
pub fn from_user_input(type_name: &str, args: &[&str]) -> CodecResult<Secret> {
    let kind = SecretKind::from_name(type_name)?;

    let secret = match kind {
        SecretKind::LoginPassword => {
            expect_args(kind, args, 2)?;
            Secret::login_password(args[0], args[1])
        }
        SecretKind::FreeText => {
            if args.is_empty() {
                return Err(CodecError::invalid_input("text requires at least 1 argument"));
            }
            Secret::text(args.join(" "))
        }
        SecretKind::BinaryBlob => {
            expect_args(kind, args, 1)?;
            let path = args[0];
            let bytes = fs::read(path)
                .map_err(|e| CodecError::invalid_input(format!("cannot read {path}: {e}")))?;
            Secret::binary(bytes)
        }
        SecretKind::PaymentCard => {
            expect_args(kind, args, 5)?;
            let month = parse_number::<u8>("expire_month", args[2])?;
            let year = parse_number::<u16>("expire_year", args[3])?;
            Secret::card(args[0], args[1], month, year, args[4])
        }
    };

    secret.validate()?;
    Ok(secret)
}

fn expect_args(kind: SecretKind, args: &[&str], count: usize) -> CodecResult<()> {
    if args.len() != count {
        return Err(CodecError::invalid_input(format!(
            "{kind} requires {count} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn parse_number<T: FromStr>(field: &str, raw: &str) -> CodecResult<T> {
    raw.parse()
        .map_err(|_| CodecError::invalid_input(format!("{field} must be a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn login_password_args() {
        let secret = from_user_input("login_password", &["me", "pw"]).unwrap();
        assert_eq!(secret, Secret::login_password("me", "pw"));

        assert!(matches!(
            from_user_input("login_password", &["me"]),
            Err(CodecError::InvalidInput { .. })
        ));
    }

    #[test]
    fn text_joins_words() {
        let secret = from_user_input("text", &["buy", "milk"]).unwrap();
        assert_eq!(secret, Secret::text("buy milk"));
        assert!(from_user_input("text", &[]).is_err());
    }

    #[test]
    fn binary_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0, 1, 2, 3]).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let secret = from_user_input("binary", &[&path]).unwrap();
        assert_eq!(secret, Secret::binary(vec![0, 1, 2, 3]));
    }

    #[test]
    fn binary_missing_or_empty_file() {
        assert!(matches!(
            from_user_input("binary", &["/definitely/not/here.bin"]),
            Err(CodecError::InvalidInput { .. })
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert!(matches!(
            from_user_input("binary", &[&path]),
            Err(CodecError::Validation { field: "bytes", .. })
        ));
    }

    #[test]
    fn card_args() {
        let secret =
            from_user_input("card", &["4111111111111111", "J DOE", "7", "2030", "123"]).unwrap();
        assert_eq!(
            secret,
            Secret::card("4111111111111111", "J DOE", 7, 2030, "123")
        );
    }

    #[test]
    fn card_month_out_of_range_fails() {
        let err = from_user_input("card", &["41111", "H", "13", "2030", "123"]).unwrap_err();
        assert!(matches!(err, CodecError::Validation { .. }));
    }

    #[test]
    fn card_non_numeric_month() {
        let err =
            from_user_input("card", &["4111111111111111", "H", "July", "2030", "123"]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidInput { .. }));
    }

    #[test]
    fn unknown_type() {
        assert!(matches!(
            from_user_input("passport", &["x"]),
            Err(CodecError::UnknownKind { .. })
        ));
    }
}
