use crate::error::RequestError;

/// Formats bytes as upper-case hex pairs separated by spaces.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<String>>().join(" ")
}

/// Parses hex bytes. Whitespace, `:` and `-` between bytes are ignored, as is
/// a `0x` prefix on each group.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, RequestError> {
    let digits = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == '-' || c == ',')
        .filter(|group| !group.is_empty())
        .map(|group| group.strip_prefix("0x").or_else(|| group.strip_prefix("0X")).unwrap_or(group))
        .collect::<String>();

    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(RequestError::InvalidValue(input.to_string()));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| RequestError::InvalidValue(input.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse() {
        assert_eq!(to_hex(&[0x01, 0x0A, 0xFF]), "01 0A FF");
        assert_eq!(to_hex(&[]), "");
        assert_eq!(parse_hex("01 0a ff"), Ok(vec![0x01, 0x0A, 0xFF]));
        assert_eq!(parse_hex("010AFF"), Ok(vec![0x01, 0x0A, 0xFF]));
        assert_eq!(parse_hex("0x01 0x0A"), Ok(vec![0x01, 0x0A]));
        assert!(parse_hex("01 0").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
