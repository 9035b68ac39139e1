/// Country prefix for Chilean phone numbers
const COUNTRY_CODE: &str = "56";

/// Digits kept after normalization: 56 + 9 + 8 digits
const MAX_PHONE_DIGITS: usize = 11;

/// Format a phone number for display.
/// Normalizes Chilean mobile numbers to +56 9 XXXX XXXX
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if phone.is_empty() {
        return String::new();
    }

    let normalized = if digits.starts_with(COUNTRY_CODE) {
        digits
    } else if digits.starts_with('9') && digits.len() == 9 {
        format!("{}{}", COUNTRY_CODE, digits)
    } else if digits.len() == 8 {
        format!("{}9{}", COUNTRY_CODE, digits)
    } else if !digits.is_empty() {
        format!("{}{}", COUNTRY_CODE, digits)
    } else {
        digits
    };

    let limited: String = normalized.chars().take(MAX_PHONE_DIGITS).collect();
    if limited.is_empty() {
        return String::new();
    }

    let mut formatted = String::from("+56");
    let rest = limited.get(2..).unwrap_or_default();
    if !rest.is_empty() {
        formatted.push(' ');
        formatted.push_str(&rest[..1]);
    }
    if rest.len() > 1 {
        formatted.push(' ');
        formatted.push_str(&rest[1..rest.len().min(5)]);
    }
    if rest.len() > 5 {
        formatted.push(' ');
        formatted.push_str(&rest[5..rest.len().min(9)]);
    }
    formatted
}

/// Whether a phone number is already in +56 9 XXXX XXXX form
pub fn is_valid_phone(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 15
        && phone.starts_with("+56 9 ")
        && bytes[10] == b' '
        && bytes[6..10].iter().all(u8::is_ascii_digit)
        && bytes[11..].iter().all(u8::is_ascii_digit)
}

/// Capitalize the first letter of each space-separated word
pub fn capitalize_words(s: &str) -> String {
    s.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Names may only hold letters (accented Spanish letters included) and spaces
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || "áéíóúÁÉÍÓÚñÑ".contains(c))
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string as DD/MM/YYYY
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%d/%m/%Y").to_string()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f") {
        dt.format("%d/%m/%Y").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}

/// Format an amount in pesos: $12.345 (no decimals)
pub fn format_money(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("912345678"), "+56 9 1234 5678");
        assert_eq!(format_phone("12345678"), "+56 9 1234 5678");
        assert_eq!(format_phone("+56 9 1234 5678"), "+56 9 1234 5678");
        assert_eq!(format_phone("(56) 9-1234-5678 ext"), "+56 9 1234 5678");
        assert_eq!(format_phone("5691234567899"), "+56 9 1234 5678");
        assert_eq!(format_phone("22"), "+56 2 2");
        assert_eq!(format_phone(""), "");
        assert_eq!(format_phone("abc"), "");
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("+56 9 1234 5678"));
        assert!(!is_valid_phone("+56 9 1234 567"));
        assert!(!is_valid_phone("+56 8 1234 5678"));
        assert!(!is_valid_phone("912345678"));
    }

    #[test]
    fn test_names() {
        assert_eq!(capitalize_words("juan PÉREZ soto"), "Juan Pérez Soto");
        assert_eq!(capitalize_words(""), "");
        assert!(is_valid_name("María José Ñúñez"));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_date_and_money() {
        assert_eq!(format_date("2026-03-05T10:00:00Z"), "05/03/2026");
        assert_eq!(format_date("2026-03-05T10:00:00.123"), "05/03/2026");
        assert_eq!(format_date("2026-03-05"), "2026-03-05");
        assert_eq!(format_money(1234567.4), "$1.234.567");
        assert_eq!(format_money(990.0), "$990");
        assert_eq!(format_money(-1500.0), "-$1.500");
    }
}
