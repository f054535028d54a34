//! Salted one-way client fingerprints.
//!
//! The salt is drawn once per process, so fingerprints are stable for the
//! process lifetime but cannot be correlated across restarts or deployments.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_SIZE: usize = 32;

/// SHA-256 state pre-seeded with the process salt. Fingerprinting clones the
/// state, so concurrent callers never mutate it.
pub struct IpFingerprinter {
    salted: Sha256,
}

impl IpFingerprinter {
    /// Draws the salt from the OS RNG. Aborts the process if no entropy is
    /// available, since running without a salt would leak raw IP hashes.
    pub fn new() -> Self {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut salted = Sha256::new();
        salted.update(salt);
        Self { salted }
    }

    /// `hex(SHA-256(salt || ip))`.
    pub fn fingerprint(&self, ip: &str) -> String {
        let mut hasher = self.salted.clone();
        hasher.update(ip.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for IpFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_one_instance() {
        let fp = IpFingerprinter::new();
        assert_eq!(fp.fingerprint("192.0.2.7"), fp.fingerprint("192.0.2.7"));
    }

    #[test]
    fn distinct_ips_do_not_collide() {
        let fp = IpFingerprinter::new();
        assert_ne!(fp.fingerprint("192.0.2.7"), fp.fingerprint("192.0.2.8"));
    }

    #[test]
    fn instances_use_distinct_salts() {
        let a = IpFingerprinter::new();
        let b = IpFingerprinter::new();
        assert_ne!(a.fingerprint("192.0.2.7"), b.fingerprint("192.0.2.7"));
    }

    #[test]
    fn output_is_hex_sha256() {
        let fp = IpFingerprinter::new();
        let digest = fp.fingerprint("2001:db8::1");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
