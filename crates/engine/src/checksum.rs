/// CRC-32 of `bytes`, continuing from `seed`.
///
/// Pass `0` to start a new checksum, or a previous result to extend it:
/// `crc32(b, crc32(a, 0)) == crc32(a ++ b, 0)`.
#[must_use]
pub fn crc32(bytes: &[u8], seed: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(bytes);
    hasher.finalize()
}
