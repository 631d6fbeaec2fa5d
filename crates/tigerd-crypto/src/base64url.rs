use base64ct::{Base64UrlUnpadded, Encoding};

/// Base64url encode bytes without padding.
pub fn base64url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Base64url decode a string to bytes.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, base64ct::Error> {
    Base64UrlUnpadded::decode_vec(s)
}

/// Decode a big-endian integer field and left-pad it to `len` bytes.
///
/// JWK EC coordinates may omit leading zero bytes. Values longer than `len`
/// are rejected.
pub fn base64url_decode_left_padded(s: &str, len: usize) -> Result<Vec<u8>, base64ct::Error> {
    let raw = base64url_decode(s)?;
    if raw.len() > len {
        return Err(base64ct::Error::InvalidLength);
    }
    let mut padded = vec![0u8; len - raw.len()];
    padded.extend_from_slice(&raw);
    Ok(padded)
}
