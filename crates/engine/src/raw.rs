//! Raw (container-less) coders, built directly on liblzma.

use crate::codec::LzmaStream;
use crate::error::{ErrorKind, Result, raise_construction};
use crate::options::{Filter, FilterId, validate_chain};
use lzma_sys::{lzma_filter, lzma_options_lzma, lzma_stream};
use std::{mem, ptr};
use xz2::stream::{Action, Error as CodecError, Status};

/// A raw encoder or decoder over a validated filter chain.
pub(crate) struct RawStream {
    raw: lzma_stream,
    // LZMA option blocks the filter chain pointed at during initialisation.
    _options: Vec<Box<lzma_options_lzma>>,
}

// SAFETY: the stream exclusively owns its coder state, and liblzma keeps no
// thread-local state for it.
unsafe impl Send for RawStream {}

impl RawStream {
    pub(crate) fn encoder(chain: &[Filter]) -> Result<Self> {
        Self::new(chain, true)
    }

    pub(crate) fn decoder(chain: &[Filter]) -> Result<Self> {
        Self::new(chain, false)
    }

    fn new(chain: &[Filter], encode: bool) -> Result<Self> {
        validate_chain(chain)?;
        let mut options = Vec::new();
        let mut filters = Vec::with_capacity(chain.len() + 1);
        for filter in chain {
            let mut filter_options = ptr::null_mut();
            if filter.id.is_lzma() {
                let preset = filter.options.preset.unwrap_or_default();
                // SAFETY: an all-zero option block is valid input for the preset call.
                let mut lzma: Box<lzma_options_lzma> = Box::new(unsafe { mem::zeroed() });
                // SAFETY: `lzma` is a live, exclusively borrowed option block.
                if unsafe { lzma_sys::lzma_lzma_preset(&mut *lzma, preset.as_raw()) } != 0 {
                    exn::bail!(ErrorKind::InvalidOption(format!("unsupported preset {}", preset.as_raw())));
                }
                filter_options = ptr::from_mut(&mut *lzma).cast();
                options.push(lzma);
            }
            filters.push(lzma_filter {
                id: filter_id(filter.id),
                options: filter_options,
            });
        }
        filters.push(lzma_filter {
            id: lzma_sys::LZMA_VLI_UNKNOWN,
            options: ptr::null_mut(),
        });

        let mut stream = Self {
            // SAFETY: a zeroed `lzma_stream` is liblzma's documented initial state.
            raw: unsafe { mem::zeroed() },
            _options: options,
        };
        // SAFETY: `filters` is terminated and every options pointer refers to
        // a block owned by `stream`.
        let ret = unsafe {
            if encode {
                lzma_sys::lzma_raw_encoder(&mut stream.raw, filters.as_ptr())
            } else {
                lzma_sys::lzma_raw_decoder(&mut stream.raw, filters.as_ptr())
            }
        };
        status(ret).map_err(raise_construction)?;
        Ok(stream)
    }
}

impl LzmaStream for RawStream {
    fn process_vec(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        action: Action,
    ) -> std::result::Result<Status, CodecError> {
        let len = output.len();
        let spare = output.spare_capacity_mut();
        let available = spare.len();
        self.raw.next_in = input.as_ptr();
        self.raw.avail_in = input.len();
        self.raw.next_out = spare.as_mut_ptr().cast();
        self.raw.avail_out = available;
        // SAFETY: the in and out pointers cover live buffers of the given lengths.
        let ret = unsafe { lzma_sys::lzma_code(&mut self.raw, action as lzma_sys::lzma_action) };
        let written = available - self.raw.avail_out;
        // SAFETY: liblzma initialised the first `written` bytes of the spare capacity.
        unsafe { output.set_len(len + written) };
        self.raw.next_in = ptr::null();
        self.raw.avail_in = 0;
        self.raw.next_out = ptr::null_mut();
        self.raw.avail_out = 0;
        status(ret)
    }

    fn total_in(&self) -> u64 {
        self.raw.total_in
    }

    fn total_out(&self) -> u64 {
        self.raw.total_out
    }

    fn memlimit(&self) -> u64 {
        // SAFETY: the stream was initialised by a raw coder constructor.
        unsafe { lzma_sys::lzma_memlimit_get(&self.raw) }
    }

    fn set_memlimit(&mut self, limit: u64) -> std::result::Result<(), CodecError> {
        // SAFETY: as above.
        status(unsafe { lzma_sys::lzma_memlimit_set(&mut self.raw, limit) }).map(|_| ())
    }
}

impl Drop for RawStream {
    fn drop(&mut self) {
        // SAFETY: ending a zeroed or initialised stream is always allowed.
        unsafe { lzma_sys::lzma_end(&mut self.raw) }
    }
}

fn filter_id(id: FilterId) -> lzma_sys::lzma_vli {
    match id {
        FilterId::Lzma1 => lzma_sys::LZMA_FILTER_LZMA1,
        FilterId::Lzma2 => lzma_sys::LZMA_FILTER_LZMA2,
        FilterId::X86 => lzma_sys::LZMA_FILTER_X86,
        FilterId::PowerPc => lzma_sys::LZMA_FILTER_POWERPC,
        FilterId::Ia64 => lzma_sys::LZMA_FILTER_IA64,
        FilterId::Arm => lzma_sys::LZMA_FILTER_ARM,
        FilterId::ArmThumb => lzma_sys::LZMA_FILTER_ARMTHUMB,
        FilterId::Sparc => lzma_sys::LZMA_FILTER_SPARC,
    }
}

/// Translate a liblzma return code into xz2's vocabulary.
fn status(ret: lzma_sys::lzma_ret) -> std::result::Result<Status, CodecError> {
    match ret {
        lzma_sys::LZMA_OK => Ok(Status::Ok),
        lzma_sys::LZMA_STREAM_END => Ok(Status::StreamEnd),
        lzma_sys::LZMA_GET_CHECK => Ok(Status::GetCheck),
        lzma_sys::LZMA_BUF_ERROR => Ok(Status::MemNeeded),
        lzma_sys::LZMA_NO_CHECK => Err(CodecError::NoCheck),
        lzma_sys::LZMA_UNSUPPORTED_CHECK => Err(CodecError::UnsupportedCheck),
        lzma_sys::LZMA_MEM_ERROR => Err(CodecError::Mem),
        lzma_sys::LZMA_MEMLIMIT_ERROR => Err(CodecError::MemLimit),
        lzma_sys::LZMA_FORMAT_ERROR => Err(CodecError::Format),
        lzma_sys::LZMA_OPTIONS_ERROR => Err(CodecError::Options),
        lzma_sys::LZMA_DATA_ERROR => Err(CodecError::Data),
        _ => Err(CodecError::Program),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Preset;
    use rstest::rstest;

    fn run(stream: &mut RawStream, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        let mut offset = 0;
        loop {
            output.reserve(4096);
            let before = stream.total_in();
            let status = stream.process_vec(&input[offset..], &mut output, Action::Finish).unwrap();
            offset += (stream.total_in() - before) as usize;
            if status == Status::StreamEnd {
                return output;
            }
        }
    }

    #[rstest]
    #[case(vec![Filter::lzma2(Preset::new(1).unwrap())])]
    #[case(vec![Filter::lzma1(Preset::new(0).unwrap())])]
    #[case(vec![Filter::new(FilterId::X86), Filter::lzma2(Preset::DEFAULT)])]
    fn test_raw_chain_roundtrip(#[case] chain: Vec<Filter>) {
        let original = b"raw payload, no container around it. ".repeat(200);
        let compressed = run(&mut RawStream::encoder(&chain).unwrap(), &original);
        assert!(!compressed.is_empty());
        assert_ne!(&compressed[..6], &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]);
        let mut decoder = RawStream::decoder(&chain).unwrap();
        assert_eq!(run(&mut decoder, &compressed), original);
        assert_eq!(decoder.total_in(), compressed.len() as u64);
        assert_eq!(decoder.total_out(), original.len() as u64);
    }

    #[test]
    fn test_invalid_chain_rejected_before_liblzma() {
        let err = RawStream::decoder(&[Filter::new(FilterId::Arm)]).err().expect("invalid chain");
        assert!(matches!(*err, ErrorKind::InvalidFilterChain(_)));
    }

    #[test]
    fn test_garbage_is_a_data_error() {
        let mut decoder = RawStream::decoder(&[Filter::lzma2(Preset::DEFAULT)]).unwrap();
        let mut output = Vec::with_capacity(4096);
        let err = decoder
            .process_vec(&[0xFF; 64], &mut output, Action::Run)
            .err()
            .expect("corrupt raw data");
        assert!(matches!(err, CodecError::Data | CodecError::Options));
    }

    #[rstest]
    #[case(lzma_sys::LZMA_OK, Ok(Status::Ok))]
    #[case(lzma_sys::LZMA_STREAM_END, Ok(Status::StreamEnd))]
    #[case(lzma_sys::LZMA_DATA_ERROR, Err(CodecError::Data))]
    #[case(lzma_sys::LZMA_MEMLIMIT_ERROR, Err(CodecError::MemLimit))]
    #[case(1234, Err(CodecError::Program))]
    fn test_status_mapping(
        #[case] ret: lzma_sys::lzma_ret,
        #[case] expected: std::result::Result<Status, CodecError>,
    ) {
        assert_eq!(status(ret), expected);
    }
}
