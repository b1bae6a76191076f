// chatbud_backend/src/signature.rs
// Razorpay webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header Razorpay puts the body signature in.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Lowercase hex HMAC-SHA256 of `payload` keyed with `secret`.
pub fn compute_signature(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a webhook body against the claimed signature.
///
/// `payload` must be the bytes exactly as received on the wire. Parsing the
/// JSON and serialising it again changes whitespace and key order, and the
/// digest will no longer match.
///
/// The comparison is equivalent to exact string equality on the hex digest,
/// done in constant time.
pub fn verify_signature(payload: &[u8], claimed: &str, secret: &str) -> bool {
    let expected = compute_signature(payload, secret);
    expected.as_bytes().ct_eq(claimed.as_bytes()).into()
}
