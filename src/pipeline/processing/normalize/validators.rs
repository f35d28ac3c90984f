//! Per-field cell validators.
//!
//! Every validator is total: it accepts any cell value and returns either the
//! normalized text or an empty string when the value is rejected. Non-string
//! cells (including missing ones) are always rejected.

use serde_json::Value;

/// Australian state and territory codes accepted in the State column
pub const VALID_STATES: [&str; 8] = ["NSW", "VIC", "QLD", "SA", "WA", "ACT", "TAS", "NT"];

pub const POSTCODE_LENGTH: usize = 4;
pub const MAX_PHONE_LENGTH: usize = 15;
pub const MAX_EMAIL_LENGTH: usize = 130;

/// Signature shared by all field validators
pub type Validator = fn(&Value) -> String;

pub fn validate_state(value: &Value) -> String {
    let Some(state) = value.as_str() else {
        return String::new();
    };

    let state = state.trim().to_uppercase();
    if VALID_STATES.contains(&state.as_str()) {
        state
    } else {
        String::new()
    }
}

pub fn validate_postcode(value: &Value) -> String {
    let Some(pcode) = value.as_str() else {
        return String::new();
    };

    let pcode = pcode.trim();
    if pcode.len() == POSTCODE_LENGTH && pcode.bytes().all(|b| b.is_ascii_digit()) {
        pcode.to_string()
    } else {
        String::new()
    }
}

/// Shared by the Phone, Mobile and Fax columns.
pub fn validate_phone(value: &Value) -> String {
    let Some(phone) = value.as_str() else {
        return String::new();
    };

    let phone = phone.trim();
    let mut compact = phone.chars().filter(|c| *c != ' ').peekable();
    let is_alphanumeric = compact.peek().is_some() && compact.all(char::is_alphanumeric);

    if phone.chars().count() <= MAX_PHONE_LENGTH && is_alphanumeric {
        phone.to_string()
    } else {
        String::new()
    }
}

/// Keeps only the first address of a comma-separated list.
pub fn validate_email(value: &Value) -> String {
    let Some(email) = value.as_str() else {
        return String::new();
    };

    let first = email.split(',').next().unwrap_or_default().trim();
    let looks_valid = first.chars().count() <= MAX_EMAIL_LENGTH
        && first.contains('@')
        && first.contains('.')
        && !first.contains(' ');

    if looks_valid {
        first.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn odd_values() -> Vec<Value> {
        vec![
            Value::Null,
            json!(2000),
            json!(3.5),
            json!(true),
            json!(["NSW"]),
            json!({"state": "NSW"}),
            s(""),
            s("   "),
            s("\u{0}\u{feff}"),
            s(&"x".repeat(10_000)),
        ]
    }

    #[test]
    fn test_state_accepts_every_code_in_any_case() {
        for code in VALID_STATES {
            assert_eq!(validate_state(&s(code)), code);
            assert_eq!(validate_state(&s(&code.to_lowercase())), code);
            assert_eq!(validate_state(&s(&format!("  {}\t", code.to_lowercase()))), code);
        }
    }

    #[test]
    fn test_state_rejects_other_values() {
        for bad in ["N.S.W", "New South Wales", "NZ", "NSWW", "", "S A"] {
            assert_eq!(validate_state(&s(bad)), "", "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn test_postcode() {
        assert_eq!(validate_postcode(&s("2000")), "2000");
        assert_eq!(validate_postcode(&s(" 0800 ")), "0800");
        assert_eq!(validate_postcode(&s("201")), "");
        assert_eq!(validate_postcode(&s("20000")), "");
        assert_eq!(validate_postcode(&s("20a0")), "");
        assert_eq!(validate_postcode(&s("20 0")), "");
        assert_eq!(validate_postcode(&s("-200")), "");
        assert_eq!(validate_postcode(&s("²000")), "");
    }

    #[test]
    fn test_phone() {
        assert_eq!(validate_phone(&s("02 9876 5432")), "02 9876 5432");
        assert_eq!(validate_phone(&s("  0412345678 ")), "0412345678");
        assert_eq!(validate_phone(&s("1300CALLME")), "1300CALLME");
        assert_eq!(validate_phone(&s("(02) 9876 5432")), "");
        assert_eq!(validate_phone(&s("+61412345678")), "");
        assert_eq!(validate_phone(&s("02-9876-5432")), "");
        assert_eq!(validate_phone(&s("")), "");
        assert_eq!(validate_phone(&s("   ")), "");
    }

    #[test]
    fn test_phone_length_limit_counts_interior_spaces() {
        // 15 characters including spaces is the limit
        assert_eq!(validate_phone(&s("0412 345 678 99")), "0412 345 678 99");
        assert_eq!(validate_phone(&s("0412 345 678 999")), "");
        assert_eq!(validate_phone(&s("1234567890123456")), "");
    }

    #[test]
    fn test_email() {
        assert_eq!(validate_email(&s("jo@example.com")), "jo@example.com");
        assert_eq!(
            validate_email(&s(" jo@example.com , other@example.com")),
            "jo@example.com"
        );
        assert_eq!(validate_email(&s("jo@example")), "");
        assert_eq!(validate_email(&s("jo.example.com")), "");
        assert_eq!(validate_email(&s("jo smith@example.com")), "");
        assert_eq!(validate_email(&s(",jo@example.com")), "");
        assert_eq!(validate_email(&s("")), "");
    }

    #[test]
    fn test_email_length_limit() {
        let local = "a".repeat(MAX_EMAIL_LENGTH - "@example.com".len());
        let at_limit = format!("{local}@example.com");
        let over_limit = format!("a{at_limit}");

        assert_eq!(validate_email(&s(&at_limit)), at_limit);
        assert_eq!(validate_email(&s(&over_limit)), "");
    }

    #[test]
    fn test_validators_reject_odd_input_without_panicking() {
        let validators: [Validator; 4] =
            [validate_state, validate_postcode, validate_phone, validate_email];

        for validator in validators {
            for value in odd_values() {
                assert_eq!(validator(&value), "", "expected {value:?} to be rejected");
            }
        }
    }

    #[test]
    fn test_validators_are_idempotent() {
        let validators: [Validator; 4] =
            [validate_state, validate_postcode, validate_phone, validate_email];
        let samples = [
            " vic ", "3000", "03 9999 0000", "a@b.co, c@d.co", "junk!", "", "2 0 0 0",
        ];

        for validator in validators {
            for sample in samples {
                let once = validator(&s(sample));
                let twice = validator(&s(&once));
                assert_eq!(once, twice, "not idempotent for {sample:?}");
            }
        }
    }
}
