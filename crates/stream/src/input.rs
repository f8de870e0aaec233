use derive_more::Display;
use serde::{Deserialize, Serialize};

/// How text input is turned into bytes.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    #[display("utf8")]
    Utf8,
    /// Low eight bits of each character, the same bytes as `Latin1`.
    #[display("ascii")]
    Ascii,
    /// Low eight bits of each character.
    #[display("latin1")]
    Latin1,
    #[display("utf16le")]
    Utf16Le,
}

impl Encoding {
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Ascii | Encoding::Latin1 => text.chars().map(|c| (u32::from(c) & 0xFF) as u8).collect(),
            Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }
}

/// Data accepted by the one-shot helpers and [`crc32`](crate::crc32).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Bytes(Vec<u8>),
    Text(String, Encoding),
}

impl Input {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Input::Bytes(bytes) => bytes,
            Input::Text(text, encoding) => encoding.encode(&text),
        }
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Input::Bytes(bytes)
    }
}

impl From<&[u8]> for Input {
    fn from(bytes: &[u8]) -> Self {
        Input::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Input {
    fn from(bytes: [u8; N]) -> Self {
        Input::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Input {
    fn from(bytes: &[u8; N]) -> Self {
        Input::Bytes(bytes.to_vec())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Input::Text(text, Encoding::default())
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Input::Text(text.to_string(), Encoding::default())
    }
}

impl<S: Into<String>> From<(S, Encoding)> for Input {
    fn from((text, encoding): (S, Encoding)) -> Self {
        Input::Text(text.into(), encoding)
    }
}

impl FromIterator<u8> for Input {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Input::Bytes(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Encoding::Utf8, "héllo", vec![0x68, 0xC3, 0xA9, 0x6C, 0x6C, 0x6F])]
    #[case(Encoding::Latin1, "héllo", vec![0x68, 0xE9, 0x6C, 0x6C, 0x6F])]
    #[case(Encoding::Ascii, "héllo", vec![0x68, 0xE9, 0x6C, 0x6C, 0x6F])]
    #[case(Encoding::Ascii, "\u{0100}A", vec![0x00, 0x41])]
    #[case(Encoding::Utf16Le, "hé", vec![0x68, 0x00, 0xE9, 0x00])]
    fn test_encode(#[case] encoding: Encoding, #[case] text: &str, #[case] expected: Vec<u8>) {
        assert_eq!(Input::from((text, encoding)).into_bytes(), expected);
    }

    #[test]
    fn test_default_encoding_is_utf8() {
        assert_eq!(Input::from("abc"), Input::Text("abc".to_string(), Encoding::Utf8));
    }

    #[test]
    fn test_byte_forms() {
        let expected = Input::Bytes(vec![1, 2, 3]);
        assert_eq!(Input::from([1u8, 2, 3]), expected);
        assert_eq!(Input::from(&[1u8, 2, 3]), expected);
        assert_eq!(Input::from(&[1u8, 2, 3][..]), expected);
        assert_eq!([1u8, 2, 3].into_iter().collect::<Input>(), expected);
    }
}
