use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, AppResult};

static PK_LOCAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^03[0-9]{9}$").unwrap());
static PK_NO_PLUS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^92[0-9]{10}$").unwrap());
static INTERNATIONAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[0-9]{8,15}$").unwrap());

/// Normalizes a phone number towards `+<countrycode><digits>`.
///
/// Only Pakistani local formats are rewritten (`03XXXXXXXXX` and
/// `92XXXXXXXXXX`); anything else is returned after cleanup, so numbers already
/// in `+` form pass through unchanged. Adjust the rules here for other
/// countries.
pub fn normalize_phone_number(phone: &str) -> String {
    let mut cleaned = String::with_capacity(phone.len());
    for c in phone.chars() {
        if c.is_ascii_digit() || (c == '+' && cleaned.is_empty()) {
            cleaned.push(c);
        }
    }

    if PK_LOCAL.is_match(&cleaned) {
        format!("+92{}", &cleaned[1..])
    } else if PK_NO_PLUS.is_match(&cleaned) {
        format!("+{cleaned}")
    } else {
        cleaned
    }
}

/// Checks a normalized number is `+` followed by 8 to 15 digits.
pub fn validate_phone_number(phone: &str) -> AppResult<()> {
    if !INTERNATIONAL.is_match(phone) {
        return Err(AppError::ValidationError(
            "Invalid phone number, expected international format (+<countrycode><digits>)"
                .to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pakistani_formats() {
        assert_eq!(normalize_phone_number("0304-2783912"), "+923042783912");
        assert_eq!(normalize_phone_number("03042783912"), "+923042783912");
        assert_eq!(normalize_phone_number("0304 278 3912"), "+923042783912");
        assert_eq!(normalize_phone_number("923042783912"), "+923042783912");
        assert_eq!(normalize_phone_number("92 304 2783912"), "+923042783912");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_phone_number("0304-2783912");
        assert_eq!(normalize_phone_number(&once), once);
        assert_eq!(normalize_phone_number("+923042783912"), "+923042783912");
    }

    #[test]
    fn test_normalize_other_countries_pass_through() {
        assert_eq!(normalize_phone_number("+1 (234) 567-8901"), "+12345678901");
        assert_eq!(normalize_phone_number("+447911123456"), "+447911123456");
        // no country-code inference outside the two local rules
        assert_eq!(normalize_phone_number("2345678901"), "2345678901");
        // wrong length for the local rules
        assert_eq!(normalize_phone_number("0304278391"), "0304278391");
    }

    #[test]
    fn test_normalize_strips_junk() {
        assert_eq!(normalize_phone_number("tel:+92-304-2783912"), "+923042783912");
        assert_eq!(normalize_phone_number("+92+3042783912"), "+923042783912");
        assert_eq!(normalize_phone_number(""), "");
        assert_eq!(normalize_phone_number("n/a"), "");
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+923042783912").is_ok());
        assert!(validate_phone_number("+12345678901").is_ok());
        assert!(validate_phone_number("923042783912").is_err());
        assert!(validate_phone_number("+123").is_err());
        assert!(validate_phone_number("").is_err());
    }
}
