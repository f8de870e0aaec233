/// The first six bytes of every `.xz` stream.
pub const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];

/// Whether `bytes` starts with the `.xz` magic. Shorter input is never `.xz`.
#[must_use]
pub fn is_xz(bytes: &[u8]) -> bool {
    bytes.starts_with(&XZ_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], false)]
    #[case(&[0xFD], false)]
    #[case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A], false)]
    #[case(&[0x00; 6], false)]
    #[case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x01], false)]
    #[case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00], true)]
    #[case(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x04], true)]
    #[case(&[0x5D, 0x00, 0x00, 0x80, 0x00], false)]
    fn test_is_xz(#[case] bytes: &[u8], #[case] expected: bool) {
        assert_eq!(is_xz(bytes), expected);
    }
}
