use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Which codec constructor a session is built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Coder {
    /// Raw LZMA data with a caller-supplied filter chain, no container.
    RawEncoder,
    RawDecoder,
    /// `.xz` encoder configured from a preset.
    EasyEncoder,
    /// `.xz` encoder with a custom filter chain.
    StreamEncoder,
    /// `.xz` decoder.
    StreamDecoder,
    /// Decoder that accepts `.xz` or legacy `.lzma` input.
    AutoDecoder,
    /// Legacy `.lzma` decoder.
    AloneDecoder,
    /// Legacy `.lzma` encoder.
    AloneEncoder,
}

impl Coder {
    pub const ALL: [Coder; 8] = [
        Coder::RawEncoder,
        Coder::RawDecoder,
        Coder::EasyEncoder,
        Coder::StreamEncoder,
        Coder::StreamDecoder,
        Coder::AutoDecoder,
        Coder::AloneDecoder,
        Coder::AloneEncoder,
    ];

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Coder::RawEncoder => "rawEncoder",
            Coder::RawDecoder => "rawDecoder",
            Coder::EasyEncoder => "easyEncoder",
            Coder::StreamEncoder => "streamEncoder",
            Coder::StreamDecoder => "streamDecoder",
            Coder::AutoDecoder => "autoDecoder",
            Coder::AloneDecoder => "aloneDecoder",
            Coder::AloneEncoder => "aloneEncoder",
        }
    }

    /// Whether sessions of this coder honour a memory limit. Encoders and
    /// raw decoders have no limit to set.
    #[must_use]
    pub fn accepts_memlimit(&self) -> bool {
        matches!(self, Coder::StreamDecoder | Coder::AutoDecoder | Coder::AloneDecoder)
    }
}

impl Display for Coder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Coder {
    type Err = Error;
    /// Accepts `easyEncoder`, `easy_encoder`, `easy-encoder` and so on,
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !matches!(c, '_' | '-')).collect();
        let normalized = normalized.to_lowercase();
        Coder::ALL
            .into_iter()
            .find(|coder| coder.as_str().to_lowercase() == normalized)
            .ok_or_else(|| exn::Exn::from(ErrorKind::UnknownCoder(s.to_string())))
    }
}
