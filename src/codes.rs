//! Base62 display codes.
//!
//! The short, reversible string encoding of a numeric id shown to end users.
//! A stateless bijection: `decode_base62(encode_base62(id)) == id`.

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encodes an id into its base62 display code.
pub fn encode_base62(mut id: u64) -> String {
    if id == 0 {
        return "0".to_string();
    }

    let mut code = String::new();
    while id > 0 {
        code.insert(0, ALPHABET[(id % 62) as usize] as char);
        id /= 62;
    }
    code
}

/// Decodes a base62 display code back to the numeric id.
///
/// # Arguments
/// * `code` - The display code to decode
///
/// # Returns
/// The id, or an invalid-input error for empty, malformed or overlong codes
pub fn decode_base62(code: &str) -> crate::Result<u64> {
    if code.is_empty() {
        return Err(crate::Error::InvalidInput("empty display code".to_string()));
    }

    let mut id: u64 = 0;
    for byte in code.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'Z' => byte - b'A' + 10,
            b'a'..=b'z' => byte - b'a' + 36,
            _ => {
                return Err(crate::Error::InvalidInput(format!(
                    "invalid character {:?} in display code",
                    byte as char
                )))
            }
        };

        id = id
            .checked_mul(62)
            .and_then(|v| v.checked_add(digit as u64))
            .ok_or_else(|| {
                crate::Error::InvalidInput(format!("display code {:?} overflows id space", code))
            })?;
    }

    Ok(id)
}
