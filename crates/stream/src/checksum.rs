use crate::input::Input;

/// CRC-32 of `input`, continuing from `seed` when chaining.
///
/// ```
/// use lzstream::crc32;
///
/// let whole = crc32("hello world", None);
/// assert_eq!(crc32(" world", Some(crc32("hello", None))), whole);
/// ```
pub fn crc32(input: impl Into<Input>, seed: Option<u32>) -> u32 {
    lzstream_engine::crc32(&input.into().into_bytes(), seed.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Encoding;
    use rstest::rstest;

    #[rstest]
    #[case(&b""[..], &b""[..])]
    #[case(&b"a"[..], &b""[..])]
    #[case(&b"The quick brown fox "[..], &b"jumps over the lazy dog"[..])]
    #[case(&[0u8, 255, 1][..], &[7u8; 300][..])]
    fn test_chaining(#[case] first: &[u8], #[case] second: &[u8]) {
        let whole = [first, second].concat();
        assert_eq!(crc32(second, Some(crc32(first, None))), crc32(whole, None));
    }

    #[test]
    fn test_known_value() {
        assert_eq!(crc32("123456789", None), 0xCBF4_3926);
    }

    #[test]
    fn test_text_uses_encoding() {
        assert_eq!(crc32(("hé", Encoding::Latin1), None), crc32(&[0x68u8, 0xE9], None));
        assert_ne!(crc32(("hé", Encoding::Latin1), None), crc32("hé", None));
    }
}
