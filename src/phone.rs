//! Phone number helpers for the WhatsApp transport.
//!
//! Recipient identifiers are normalized to digits before they reach the
//! transport; anything else is stripped, not validated. Malformed numbers
//! surface later as per-recipient delivery failures, never up front.

/// Strip everything but ASCII digits from a phone number.
pub fn normalize_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Mask a phone number for logs and failure records.
///
/// The last four digits are replaced with `****`. Numbers with eight digits
/// or fewer are returned untouched (masking them would hide the whole thing).
pub fn mask_phone(phone: &str) -> String {
    let digits = normalize_digits(phone);
    if digits.len() <= 8 {
        return phone.to_string();
    }
    format!("{}****", &digits[..digits.len() - 4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize_digits("+55 (11) 99999-1234"), "5511999991234");
        assert_eq!(normalize_digits("5511999991234"), "5511999991234");
        assert_eq!(normalize_digits("abc"), "");
    }

    #[test]
    fn test_mask_phone_hides_last_four_digits() {
        assert_eq!(mask_phone("5511999991234"), "551199999****");
        assert_eq!(mask_phone("+55 11 99999-1234"), "551199999****");
    }

    #[test]
    fn test_mask_phone_leaves_short_numbers_alone() {
        assert_eq!(mask_phone("12345678"), "12345678");
        assert_eq!(mask_phone(""), "");
    }

    proptest! {
        /// Normalization output contains only ASCII digits.
        #[test]
        fn normalize_output_is_digits_only(phone in ".{0,40}") {
            let digits = normalize_digits(&phone);
            prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }

        /// Masking a long number always ends with the mask and never
        /// exposes the last four digits.
        #[test]
        fn mask_hides_suffix_of_long_numbers(digits in "[0-9]{9,20}") {
            let masked = mask_phone(&digits);
            prop_assert!(masked.ends_with("****"));
            prop_assert_eq!(&masked[..masked.len() - 4], &digits[..digits.len() - 4]);
        }
    }
}
