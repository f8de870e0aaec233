//! Coder option types: presets, integrity checks, decoder flags and filter
//! chains.

use crate::error::{ErrorKind, Result, raise_construction};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::BitOr;
use std::str::FromStr;
use xz2::stream::{Check as CodecCheck, Filters, LzmaOptions};

/// Preset level used when none is given.
pub const PRESET_DEFAULT: u32 = 6;
/// Flag bit requesting the slower "extreme" variant of a preset.
pub const PRESET_EXTREME: u32 = 0x8000_0000;
/// Highest preset level.
pub const PRESET_LEVEL_MAX: u32 = 9;
/// Longest filter chain the codec accepts.
pub const FILTERS_MAX: usize = 4;

/// Compression effort/ratio level, `0..=9`, optionally "extreme".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Preset {
    level: u32,
    extreme: bool,
}

impl Preset {
    pub const DEFAULT: Preset = Preset {
        level: PRESET_DEFAULT,
        extreme: false,
    };

    pub fn new(level: u32) -> Result<Self> {
        if level > PRESET_LEVEL_MAX {
            exn::bail!(ErrorKind::InvalidPreset(level));
        }
        Ok(Self { level, extreme: false })
    }

    #[must_use]
    pub fn extreme(self) -> Self {
        Self { extreme: true, ..self }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_extreme(&self) -> bool {
        self.extreme
    }

    /// The raw preset value understood by the codec.
    pub fn as_raw(&self) -> u32 {
        if self.extreme { self.level | PRESET_EXTREME } else { self.level }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Preset {
    type Error = crate::error::Error;
    fn try_from(raw: u32) -> Result<Self> {
        let preset = Preset::new(raw & !PRESET_EXTREME)?;
        Ok(if raw & PRESET_EXTREME != 0 { preset.extreme() } else { preset })
    }
}

impl From<Preset> for u32 {
    fn from(preset: Preset) -> Self {
        preset.as_raw()
    }
}

impl Serialize for Preset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for Preset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Preset::try_from(raw).map_err(|err| D::Error::custom(&*err))
    }
}

/// Integrity check appended to `.xz` containers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    None,
    #[default]
    Crc32,
    Crc64,
    Sha256,
}

impl FromStr for Check {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Check::None),
            "crc32" => Ok(Check::Crc32),
            "crc64" => Ok(Check::Crc64),
            "sha256" | "sha-256" => Ok(Check::Sha256),
            _ => exn::bail!(ErrorKind::InvalidOption(format!("check: {s}"))),
        }
    }
}

impl From<Check> for CodecCheck {
    fn from(check: Check) -> Self {
        match check {
            Check::None => CodecCheck::None,
            Check::Crc32 => CodecCheck::Crc32,
            Check::Crc64 => CodecCheck::Crc64,
            Check::Sha256 => CodecCheck::Sha256,
        }
    }
}

/// Decoder behaviour bitmask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecoderFlags(u32);

impl DecoderFlags {
    pub const NONE: DecoderFlags = DecoderFlags(0);
    /// Fail when the input has no integrity check.
    pub const TELL_NO_CHECK: DecoderFlags = DecoderFlags(0x01);
    /// Fail when the input's integrity check is not supported.
    pub const TELL_UNSUPPORTED_CHECK: DecoderFlags = DecoderFlags(0x02);
    /// Report the integrity check type as soon as it is known.
    pub const TELL_ANY_CHECK: DecoderFlags = DecoderFlags(0x04);
    /// Decode concatenated streams until the end of input.
    pub const CONCATENATED: DecoderFlags = DecoderFlags(0x08);
    /// Skip verification of the integrity check.
    pub const IGNORE_CHECK: DecoderFlags = DecoderFlags(0x10);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: DecoderFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DecoderFlags {
    type Output = DecoderFlags;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Filter identifiers understood by the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterId {
    Lzma1,
    Lzma2,
    X86,
    PowerPc,
    Ia64,
    Arm,
    ArmThumb,
    Sparc,
}

impl FilterId {
    pub fn is_lzma(&self) -> bool {
        matches!(self, FilterId::Lzma1 | FilterId::Lzma2)
    }
}

/// Per-filter options. Only the LZMA filters take any.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub preset: Option<Preset>,
}

/// One entry of a filter chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    #[serde(default)]
    pub options: FilterOptions,
}

impl Filter {
    pub fn new(id: FilterId) -> Self {
        Self {
            id,
            options: FilterOptions::default(),
        }
    }

    pub fn lzma1(preset: Preset) -> Self {
        Self {
            id: FilterId::Lzma1,
            options: FilterOptions { preset: Some(preset) },
        }
    }

    pub fn lzma2(preset: Preset) -> Self {
        Self {
            id: FilterId::Lzma2,
            options: FilterOptions { preset: Some(preset) },
        }
    }
}

/// A chain holds between one and [`FILTERS_MAX`] filters, and exactly its
/// last filter is LZMA1 or LZMA2.
pub(crate) fn validate_chain(chain: &[Filter]) -> Result<()> {
    let Some((last, rest)) = chain.split_last() else {
        exn::bail!(ErrorKind::InvalidFilterChain("empty filter chain".to_string()));
    };
    if chain.len() > FILTERS_MAX {
        exn::bail!(ErrorKind::InvalidFilterChain(format!("more than {FILTERS_MAX} filters")));
    }
    if !last.id.is_lzma() {
        exn::bail!(ErrorKind::InvalidFilterChain("last filter must be lzma1 or lzma2".to_string()));
    }
    if rest.iter().any(|filter| filter.id.is_lzma()) {
        exn::bail!(ErrorKind::InvalidFilterChain("lzma filters must come last".to_string()));
    }
    Ok(())
}

/// Validate a filter chain and translate it for the `.xz` stream encoder.
pub(crate) fn build_filters(chain: &[Filter]) -> Result<Filters> {
    validate_chain(chain)?;
    let mut filters = Filters::new();
    for filter in chain {
        match filter.id {
            FilterId::Lzma1 => {
                filters.lzma1(&lzma_options(filter)?);
            },
            FilterId::Lzma2 => {
                filters.lzma2(&lzma_options(filter)?);
            },
            FilterId::X86 => {
                filters.x86();
            },
            FilterId::PowerPc => {
                filters.powerpc();
            },
            FilterId::Ia64 => {
                filters.ia64();
            },
            FilterId::Arm => {
                filters.arm();
            },
            FilterId::ArmThumb => {
                filters.arm_thumb();
            },
            FilterId::Sparc => {
                filters.sparc();
            },
        }
    }
    Ok(filters)
}

pub(crate) fn lzma_options(filter: &Filter) -> Result<LzmaOptions> {
    let preset = filter.options.preset.unwrap_or_default();
    LzmaOptions::new_preset(preset.as_raw()).map_err(raise_construction)
}
