//! Conversions between NIST curve public keys and fixed-width affine coordinates.

use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};

use crate::error::CryptoError;

/// Byte width of a P-256 coordinate or scalar.
pub const P256_FIELD_LENGTH: usize = 32;
/// Byte width of a P-384 coordinate or scalar.
pub const P384_FIELD_LENGTH: usize = 48;

/// Import a P-256 public key from big-endian `x` and `y` coordinates.
pub fn p256_public_from_coordinates(x: &[u8], y: &[u8]) -> Result<p256::PublicKey, CryptoError> {
    check_coordinates(x, y, P256_FIELD_LENGTH)?;
    let point = p256::EncodedPoint::from_affine_coordinates(
        p256::FieldBytes::from_slice(x),
        p256::FieldBytes::from_slice(y),
        false,
    );
    p256::PublicKey::from_encoded_point(&point)
        .into_option()
        .ok_or_else(|| CryptoError::InvalidPoint("point not on P-256 curve".to_string()))
}

/// Export the affine coordinates of a P-256 public key.
pub fn p256_coordinates(key: &p256::PublicKey) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let point = key.to_encoded_point(false);
    match (point.x(), point.y()) {
        (Some(x), Some(y)) => Ok((x.to_vec(), y.to_vec())),
        _ => Err(CryptoError::InvalidPoint("P-256 identity point".to_string())),
    }
}

/// Import a P-384 public key from big-endian `x` and `y` coordinates.
pub fn p384_public_from_coordinates(x: &[u8], y: &[u8]) -> Result<p384::PublicKey, CryptoError> {
    check_coordinates(x, y, P384_FIELD_LENGTH)?;
    let point = p384::EncodedPoint::from_affine_coordinates(
        p384::FieldBytes::from_slice(x),
        p384::FieldBytes::from_slice(y),
        false,
    );
    p384::PublicKey::from_encoded_point(&point)
        .into_option()
        .ok_or_else(|| CryptoError::InvalidPoint("point not on P-384 curve".to_string()))
}

/// Export the affine coordinates of a P-384 public key.
pub fn p384_coordinates(key: &p384::PublicKey) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let point = key.to_encoded_point(false);
    match (point.x(), point.y()) {
        (Some(x), Some(y)) => Ok((x.to_vec(), y.to_vec())),
        _ => Err(CryptoError::InvalidPoint("P-384 identity point".to_string())),
    }
}

fn check_coordinates(x: &[u8], y: &[u8], len: usize) -> Result<(), CryptoError> {
    if x.len() != len || y.len() != len {
        return Err(CryptoError::InvalidPoint(format!(
            "expected {len}-byte coordinates, got x={} y={}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}
