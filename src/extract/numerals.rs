//! Locale numeral normalization
//!
//! Listing pages render counts in Persian or Arabic-Indic digits. Each digit
//! is mapped to ASCII through an explicit table before parsing.

/// Persian (Extended Arabic-Indic) digits, U+06F0..U+06F9
const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Arabic-Indic digits, U+0660..U+0669
const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Thousands separators dropped before parsing (ASCII comma, Arabic comma)
const GROUP_SEPARATORS: [char; 2] = [',', '٬'];

/// Maps a locale digit to its ASCII counterpart
fn ascii_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        return Some(c);
    }

    PERSIAN_DIGITS
        .iter()
        .position(|&d| d == c)
        .or_else(|| ARABIC_INDIC_DIGITS.iter().position(|&d| d == c))
        .and_then(|i| char::from_digit(i as u32, 10))
}

/// Replaces every locale digit with ASCII, leaving other characters alone
///
/// ```
/// use netsieve::extract::numerals::normalize_digits;
///
/// assert_eq!(normalize_digits("۱۲۳ کالا"), "123 کالا");
/// ```
pub fn normalize_digits(text: &str) -> String {
    text.chars().map(|c| ascii_digit(c).unwrap_or(c)).collect()
}

/// Parses the count at the start of a summary text
///
/// Takes the first whitespace-separated token, normalizes its digits, drops
/// thousands separators and parses the leading run of digits. Anything
/// unparseable yields 0.
///
/// ```
/// use netsieve::extract::numerals::parse_count;
///
/// assert_eq!(parse_count("۱۲۳ کالا"), 123);
/// assert_eq!(parse_count("no count"), 0);
/// ```
pub fn parse_count(text: &str) -> u64 {
    let Some(token) = text.split_whitespace().next() else {
        return 0;
    };

    let digits: String = normalize_digits(token)
        .chars()
        .filter(|c| !GROUP_SEPARATORS.contains(c))
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persian_count() {
        assert_eq!(parse_count("۱۲۳ کالا"), 123);
        assert_eq!(parse_count("  ۲۰ کالا  "), 20);
    }

    #[test]
    fn test_arabic_indic_count() {
        assert_eq!(parse_count("٤٥٦ منتج"), 456);
    }

    #[test]
    fn test_ascii_count() {
        assert_eq!(parse_count("42 items"), 42);
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_count("۱٬۲۳۴ کالا"), 1234);
        assert_eq!(parse_count("1,234 items"), 1234);
    }

    #[test]
    fn test_trailing_garbage_is_ignored() {
        assert_eq!(parse_count("۱۲+ کالا"), 12);
    }

    #[test]
    fn test_unparseable_is_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("   "), 0);
        assert_eq!(parse_count("کالا ۱۲۳"), 0);
        assert_eq!(parse_count("many"), 0);
    }

    #[test]
    fn test_normalize_leaves_letters() {
        assert_eq!(normalize_digits("a۱b٢c3"), "a1b2c3");
    }
}
