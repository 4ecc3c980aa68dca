use hmac::{Hmac, Mac};
use sha2::Sha256;

/// The lowercase hex HMAC-SHA256 digest of `data` under `secret`. This is the signature format the scheduling
/// provider places in its `x-cal-signature-256` header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod test {
    use super::calculate_hmac;

    #[test]
    fn known_digest() {
        assert_eq!(calculate_hmac("abc", b"xyz"), "c03d0898b76731130f3e2134b39b824c53c4e62a55b3c020a4be6d5ada606102");
    }

    #[test]
    fn single_bit_flip_changes_digest() {
        let good = calculate_hmac("abc", b"xyz");
        let flipped = calculate_hmac("abc", b"xy\x7a"); // same bytes, sanity check first
        assert_eq!(good, flipped);
        let tampered = calculate_hmac("abc", b"xy{"); // 'z' ^ 0x01
        assert_ne!(good, tampered);
    }
}
