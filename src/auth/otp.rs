use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

pub const OTP_CODE_LEN: usize = 6;

/// One-time codes are never stored in the clear; only this digest is kept and
/// compared on verification.
pub fn hash_otp_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn generate_otp_code() -> String {
    let mut rng = OsRng;
    (0..OTP_CODE_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Phone numbers are compared in a canonical form: digits with an optional
/// leading plus, separators stripped.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (idx, ch) in trimmed.chars().enumerate() {
        if ch == '+' && idx == 0 {
            out.push(ch);
        } else if ch.is_ascii_digit() {
            out.push(ch);
        }
    }
    out
}
