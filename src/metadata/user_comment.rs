/// EXIF UserComment payload encoding
///
/// The field is UNDEFINED bytes: an 8-byte character code followed by the text.

const ASCII_PREFIX: &[u8; 8] = b"ASCII\0\0\0";
const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";
const UNDEFINED_PREFIX: &[u8; 8] = &[0; 8];

/// Encode text with the ASCII character code
///
/// JSON produced by serde_json is plain ASCII unless a key or value holds
/// non-ASCII characters; ours never do.
pub fn encode(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + text.len());
    bytes.extend_from_slice(ASCII_PREFIX);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// Decode a UserComment payload, `None` for unknown encodings or garbage
pub fn decode(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 8 {
        return None;
    }
    let (prefix, body) = bytes.split_at(8);

    let text = if prefix == ASCII_PREFIX || prefix == UNDEFINED_PREFIX {
        String::from_utf8(body.to_vec()).ok()?
    } else if prefix == UNICODE_PREFIX {
        decode_utf16(body)?
    } else {
        // JIS and vendor encodings
        return None;
    };

    let trimmed = text.trim_end_matches(&['\0', ' ', '\n', '\r'][..]);
    Some(trimmed.to_string())
}

/// UTF-16, big-endian unless a little-endian BOM says otherwise
fn decode_utf16(body: &[u8]) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    let little_endian = body.starts_with(&[0xFF, 0xFE]);
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    let decoded = String::from_utf16(&units).ok()?;
    Some(decoded.trim_start_matches('\u{FEFF}').to_string())
}
