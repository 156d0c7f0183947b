//! `queue-core`'s stable identifiers are 128-bit, and Postgres has no
//! native 128-bit integer; they're stored as the 16 big-endian bytes
//! of the `u128` instead.

pub fn encode(id: u128) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub fn decode(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    let len = bytes.len().min(16);
    buf[16 - len..].copy_from_slice(&bytes[..len]);
    u128::from_be_bytes(buf)
}
