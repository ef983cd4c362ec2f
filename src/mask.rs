use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// XORs `buf` in place with the 4-byte `key`, cycling the key every 4
/// bytes. Self-inverse: calling this twice with the same key restores the
/// original bytes, so the same function masks and unmasks.
pub(crate) fn apply_mask(key: [u8; 4], buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Draws a fresh 32-bit masking key for one outbound client frame. Uses a
/// thread-local PRNG reseeded from the process RNG, which is unpredictable
/// enough to defeat cache-poisoning attackers on the same origin without
/// needing a cryptographic source.
pub(crate) fn generate_mask_key() -> [u8; 4] {
    let mut rng = StdRng::from_rng(rand::thread_rng());
    rng.random::<[u8; 4]>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_involutive() {
        let key = [0x12, 0x34, 0x56, 0x78];
        let original = b"arbitrary payload bytes, longer than one key cycle".to_vec();

        let mut masked = original.clone();
        apply_mask(key, &mut masked);
        assert_ne!(masked, original);

        let mut unmasked = masked.clone();
        apply_mask(key, &mut unmasked);
        assert_eq!(unmasked, original);
    }

    #[test]
    fn mask_on_empty_payload_is_noop() {
        let mut buf: Vec<u8> = Vec::new();
        apply_mask([1, 2, 3, 4], &mut buf);
        assert!(buf.is_empty());
    }
}
