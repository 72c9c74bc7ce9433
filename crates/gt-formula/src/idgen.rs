//! Short random identifiers for convoy records and run directories.

use rand::RngCore;

/// RFC 4648 base-32 alphabet.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of a short identifier.
pub const SHORT_ID_LEN: usize = 5;

/// Encode bytes as unpadded base-32, most significant bits first.
pub fn encode_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            let idx = ((buffer >> bits) & 0x1f) as usize;
            out.push(BASE32_ALPHABET[idx] as char);
        }
    }
    if bits > 0 {
        let idx = ((buffer << (5 - bits)) & 0x1f) as usize;
        out.push(BASE32_ALPHABET[idx] as char);
    }
    out
}

/// Five lowercase base-32 characters drawn from three random bytes.
pub fn short_id() -> String {
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    short_id_from(&bytes)
}

fn short_id_from(bytes: &[u8]) -> String {
    let mut id = encode_base32(bytes);
    id.truncate(SHORT_ID_LEN);
    id.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_base32_known_vectors() {
        assert_eq!(encode_base32(b""), "");
        assert_eq!(encode_base32(b"f"), "MY");
        assert_eq!(encode_base32(b"foo"), "MZXW6");
        assert_eq!(encode_base32(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn short_id_from_bytes() {
        assert_eq!(short_id_from(b"foo"), "mzxw6");
        assert_eq!(short_id_from(&[0, 0, 0]), "aaaaa");
        assert_eq!(short_id_from(&[0xff, 0xff, 0xff]), "77776");
    }

    #[test]
    fn short_id_shape() {
        for _ in 0..50 {
            let id = short_id();
            assert_eq!(id.len(), SHORT_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
        }
    }
}
