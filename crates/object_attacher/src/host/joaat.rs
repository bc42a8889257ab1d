//! Jenkins one-at-a-time hash - default resolver имени модели → ModelHash
//!
//! Case-insensitive: имя приводится к lowercase перед хешированием.

pub fn joaat(name: &str) -> u32 {
    let mut hash: u32 = 0;

    for byte in name.bytes().map(|b| b.to_ascii_lowercase()) {
        hash = hash.wrapping_add(byte as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }

    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}
