//! Phone number validation for outbound dialing.
//!
//! Permissive by design: accepts digits with an optional leading `+`, with
//! no length enforcement, so international numbers, national numbers, and
//! short test extensions all pass. Campaign CSVs come from end users, so
//! the error messages name the offending character and position.

/// Validates and normalizes a phone number for an outbound dial string.
///
/// Returns the trimmed number on success, or a human-readable reason
/// suitable for a per-row ingestion warning.
pub fn validate_dial_number(phone: &str) -> Result<String, String> {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err("phone number is empty".to_string());
    }

    let (has_plus, digits_part) = if let Some(rest) = trimmed.strip_prefix('+') {
        (true, rest)
    } else {
        (false, trimmed)
    };

    if has_plus && digits_part.is_empty() {
        return Err("phone number must contain at least one digit".to_string());
    }

    for (i, ch) in digits_part.chars().enumerate() {
        let position = i + if has_plus { 1 } else { 0 };
        if ch == '+' {
            return Err(format!(
                "'+' at position {position} - a plus sign is only allowed at the beginning"
            ));
        }
        if !ch.is_ascii_digit() {
            return Err(format!(
                "invalid character '{ch}' at position {position} - only digits and an optional leading '+' are allowed"
            ));
        }
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_international_number() {
        assert_eq!(
            validate_dial_number("+14155550100").unwrap(),
            "+14155550100"
        );
    }

    #[test]
    fn valid_national_number() {
        assert_eq!(validate_dial_number("04155550100").unwrap(), "04155550100");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_dial_number("  +911234 ").unwrap(), "+911234");
        assert_eq!(validate_dial_number(" 123 ").unwrap(), "123");
    }

    #[test]
    fn rejects_empty_and_bare_plus() {
        assert!(validate_dial_number("").is_err());
        assert!(validate_dial_number("   ").is_err());
        assert!(validate_dial_number("+").is_err());
    }

    #[test]
    fn rejects_letters_and_misplaced_plus() {
        assert!(validate_dial_number("123abc").is_err());
        assert!(validate_dial_number("12+34").is_err());
        assert!(validate_dial_number("++123").is_err());
    }
}
