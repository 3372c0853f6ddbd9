//! RFC 6238 time-based one-time codes
//!
//! Codes are HMAC-SHA1 over 30-second steps, 6 digits. Verification accepts
//! the current step plus a configurable number of adjacent steps on each side.

use data_encoding::BASE32;
use error_common::{AuthError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::{Choice, ConstantTimeEq};
use totp_lite::{totp_custom, Sha1};
use totp_rs::{Algorithm, TOTP};
use zeroize::Zeroizing;

/// Step length in seconds
pub const TOTP_STEP: u64 = 30;
/// Digits per code
pub const TOTP_DIGITS: u32 = 6;
/// Secret length in bytes (160 bits)
pub const SECRET_BYTES: usize = 20;

/// Generate a fresh base32 (RFC 4648, padded) secret
pub fn generate_secret() -> String {
    let mut secret = Zeroizing::new([0u8; SECRET_BYTES]);
    OsRng.fill_bytes(&mut secret[..]);
    BASE32.encode(&secret[..])
}

pub fn decode_secret(secret: &str) -> Result<Zeroizing<Vec<u8>>> {
    BASE32
        .decode(secret.as_bytes())
        .map(Zeroizing::new)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to decode TOTP secret: {}", e)))
}

/// Code for the step containing `unix_secs`
pub fn code_at(secret: &[u8], unix_secs: u64) -> String {
    totp_custom::<Sha1>(TOTP_STEP, TOTP_DIGITS, secret, unix_secs)
}

/// Check `code` against every step within `drift_steps` of `unix_secs`.
///
/// All candidate steps are always computed and compared in constant time, so
/// the position of a match is not observable.
pub fn verify_code(secret: &str, code: &str, unix_secs: u64, drift_steps: u8) -> Result<bool> {
    let code = code.trim();
    if code.len() != TOTP_DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let secret_bytes = decode_secret(secret)?;
    let drift = i64::from(drift_steps);
    let mut matched = Choice::from(0u8);

    for offset in -drift..=drift {
        let Some(at) = (unix_secs as i64).checked_add(offset * TOTP_STEP as i64) else {
            continue;
        };
        if at < 0 {
            continue;
        }
        let expected = code_at(&secret_bytes, at as u64);
        matched |= code.as_bytes().ct_eq(expected.as_bytes());
    }

    Ok(matched.into())
}

/// Build the `otpauth://` key URI and a PNG QR code of it as a data URL
pub fn provisioning(secret: &str, issuer: &str, account: &str) -> Result<(String, String)> {
    let secret_bytes = decode_secret(secret)?;

    // The key URI uses ':' to separate issuer and account
    let totp = TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS as usize,
        1,
        TOTP_STEP,
        secret_bytes.to_vec(),
        Some(issuer.replace(':', " ")),
        account.replace(':', " "),
    )
    .map_err(|e| AuthError::Internal(anyhow::anyhow!("TOTP init error: {}", e)))?;

    let uri = totp.get_url();
    let qr = totp
        .get_qr_base64()
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("QR generation error: {}", e)))?;

    Ok((uri, format!("data:image/png;base64,{qr}")))
}
