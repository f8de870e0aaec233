use futures::StreamExt;
use lzstream::error::{Category, ErrorKind, Result};
use lzstream::{
    Check, Coder, ConcurrencyThrottle, DecoderFlags, MAX_ASYNC_STREAM_COUNT, Mode, Options, Preset, StreamAdapter,
    StreamFactory, is_xz,
};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loosely text-like data that compresses, but not trivially.
fn sample(len: usize) -> Vec<u8> {
    const WORDS: [&[u8]; 8] = [b"lorem ", b"ipsum ", b"dolor ", b"sit ", b"amet, ", b"consectetur ", b"\n", b"0x7F "];
    let mut state = 0x2545_F491u32;
    let mut data = Vec::with_capacity(len + 16);
    while data.len() < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        data.extend_from_slice(WORDS[(state % 8) as usize]);
        if state % 5 == 0 {
            data.push((state >> 24) as u8);
        }
    }
    data.truncate(len);
    data
}

fn light() -> Options {
    Options::new().with_preset(Preset::new(0).unwrap())
}

async fn code_in_chunks(mut adapter: StreamAdapter, input: &[u8], chunk: usize) -> Result<Vec<u8>> {
    for part in input.chunks(chunk) {
        adapter.write(part).await?;
    }
    adapter.finish().await
}

#[rstest]
#[tokio::test]
async fn test_roundtrip_small(
    #[values(0, 1, 2, 3, 4, 5, 6, 7, 8, 9)] level: u32,
    #[values(false, true)] extreme: bool,
    #[values(Check::None, Check::Crc32, Check::Crc64, Check::Sha256)] check: Check,
    #[values(0, 1)] len: usize,
) {
    let factory = StreamFactory::default();
    let original = sample(len);
    let preset = Preset::new(level).unwrap();
    let preset = if extreme { preset.extreme() } else { preset };
    let options = Options::new().with_preset(preset).with_check(check);
    let compressed = factory.compress(original.clone(), options).unwrap().await.unwrap();
    assert!(is_xz(&compressed));
    let decompressed = factory.decompress(compressed, None).unwrap().await.unwrap();
    assert_eq!(decompressed, original);
}

#[rstest]
#[case(0, Check::Crc64)]
#[case(6, Check::Sha256)]
#[tokio::test]
async fn test_roundtrip_large(#[case] level: u32, #[case] check: Check) {
    let factory = StreamFactory::default();
    let original = sample(1_300_000);
    let options = Options::new().with_preset(Preset::new(level).unwrap()).with_check(check);
    let compressed = factory.compress(original.clone(), options).unwrap().await.unwrap();
    assert!(compressed.len() < original.len());
    let decompressed = factory.decompress(compressed, None).unwrap().await.unwrap();
    assert_eq!(decompressed.len(), original.len());
    assert_eq!(decompressed, original);
}

#[tokio::test]
async fn test_chunk_size_independence() {
    let factory = StreamFactory::default();
    let original = sample(100_000);
    let whole = factory.compress(original.clone(), light()).unwrap().await.unwrap();

    for chunk in [1_000, 4_096, 33_333] {
        let adapter = factory.create_compressor(light()).unwrap();
        let compressed = code_in_chunks(adapter, &original, chunk).await.unwrap();
        assert_eq!(compressed, whole, "compressing in chunks of {chunk}");

        let adapter = factory.create_decompressor(None).unwrap();
        let decompressed = code_in_chunks(adapter, &whole, chunk).await.unwrap();
        assert_eq!(decompressed, original, "decompressing in chunks of {chunk}");
    }
}

#[rstest]
#[case(Options::new().synchronous())]
#[case(Options::new().force_asynchronous())]
#[tokio::test]
async fn test_modes_produce_identical_output(#[case] mode: Options) {
    let factory = StreamFactory::default();
    let original = sample(50_000);
    let expected = factory.compress(original.clone(), light().synchronous()).unwrap().await.unwrap();
    let options = Options {
        preset: Preset::new(0).unwrap(),
        ..mode
    };
    let adapter = factory.create_compressor(options).unwrap();
    assert_eq!(code_in_chunks(adapter, &original, 7_000).await.unwrap(), expected);
}

#[tokio::test]
async fn test_preset_one_and_nine_differ() {
    let factory = StreamFactory::default();
    let original = sample(300_000);
    let fast = factory.compress(original.clone(), Options::from(Preset::new(1).unwrap())).unwrap().await.unwrap();
    let best = factory.compress(original.clone(), Options::from(Preset::new(9).unwrap())).unwrap().await.unwrap();
    assert_ne!(fast, best);
    assert_eq!(factory.decompress(fast, None).unwrap().await.unwrap(), original);
    assert_eq!(factory.decompress(best, None).unwrap().await.unwrap(), original);
}

#[test]
fn test_throttle_downgrades_excess_streams() {
    let factory = StreamFactory::new(ConcurrencyThrottle::default());
    let adapters: Vec<_> = (0..MAX_ASYNC_STREAM_COUNT)
        .map(|_| factory.create_compressor(light()).unwrap())
        .collect();
    assert!(adapters.iter().all(|adapter| adapter.mode() == Mode::Asynchronous));
    assert_eq!(factory.throttle().active(), MAX_ASYNC_STREAM_COUNT);

    let excess = factory.create_compressor(light()).unwrap();
    assert_eq!(excess.mode(), Mode::Synchronous);
    let forced = factory.create_compressor(light().force_asynchronous()).unwrap();
    assert_eq!(forced.mode(), Mode::Asynchronous);
    assert_eq!(factory.throttle().active(), MAX_ASYNC_STREAM_COUNT + 1);

    drop(adapters);
    drop(forced);
    assert_eq!(factory.throttle().active(), 0);
    assert_eq!(factory.create_compressor(light()).unwrap().mode(), Mode::Asynchronous);
}

#[tokio::test]
async fn test_finished_stream_frees_its_slot() {
    let factory = StreamFactory::new(ConcurrencyThrottle::new(1));
    let mut first = factory.create_compressor(light()).unwrap();
    assert_eq!(factory.create_compressor(light()).unwrap().mode(), Mode::Synchronous);
    first.write(b"some data".to_vec()).await.unwrap();
    first.finish().await.unwrap();
    assert_eq!(factory.throttle().active(), 0);
    assert_eq!(factory.create_compressor(light()).unwrap().mode(), Mode::Asynchronous);
}

#[rstest]
#[tokio::test]
async fn test_truncated_input_yields_one_error(#[values(true, false)] synchronous: bool) {
    let factory = StreamFactory::default();
    let compressed = factory.compress(sample(200_000), light()).unwrap().await.unwrap();
    let options = if synchronous { Options::new().synchronous() } else { Options::new() };
    let mut adapter = factory.create_decompressor(options).unwrap();

    let acknowledged = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&acknowledged);
    adapter.submit(compressed[..compressed.len() / 2].to_vec(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    // The error only shows up once the input ends.
    adapter.acknowledged().await.unwrap();
    assert_eq!(acknowledged.load(Ordering::SeqCst), 1);
    adapter.end(|| panic!("end of a failed stream is never acknowledged"));

    let items: Vec<_> = (&mut adapter).collect().await;
    let errors: Vec<_> = items.iter().filter_map(|item| item.as_ref().err()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(**errors[0], ErrorKind::Truncated);
    assert!(items.last().unwrap().is_err(), "no data after the error");
    assert!(items[..items.len() - 1].iter().all(|item| item.is_ok()));
    assert!(adapter.is_released());
    assert!(adapter.next().await.is_none());
}

#[tokio::test]
async fn test_corrupted_input_is_an_engine_fault() {
    let factory = StreamFactory::default();
    let mut compressed = factory.compress(sample(50_000), light()).unwrap().await.unwrap();
    let middle = compressed.len() / 2;
    for byte in &mut compressed[middle..middle + 64] {
        *byte = !*byte;
    }
    let err = factory.decompress(compressed, None).unwrap().await.unwrap_err();
    assert_eq!(err.category(), Category::EngineFault);
}

#[tokio::test]
async fn test_garbage_is_unsupported_format() {
    let err = StreamFactory::default()
        .decompress("definitely not compressed", None)
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(*err, ErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn test_memory_limit_is_resource_exhaustion() {
    let factory = StreamFactory::default();
    let compressed = factory.compress(sample(10_000), None).unwrap().await.unwrap();
    let err = factory
        .decompress(compressed, Options::new().with_memlimit(64 * 1024))
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(*err, ErrorKind::MemoryLimit);
    assert_eq!(err.category(), Category::ResourceExhaustion);
}

#[tokio::test]
async fn test_concatenated_streams() {
    let factory = StreamFactory::default();
    let mut joined = factory.compress("first half, ", light()).unwrap().await.unwrap();
    joined.extend(factory.compress("second half", light()).unwrap().await.unwrap());

    let single = factory.decompress(joined.clone(), None).unwrap().await.unwrap();
    assert_eq!(single, b"first half, ");
    let options = Options::new().with_flags(DecoderFlags::CONCATENATED);
    let both = factory.decompress(joined, options).unwrap().await.unwrap();
    assert_eq!(both, b"first half, second half");
}

#[tokio::test]
async fn test_legacy_lzma_roundtrip() {
    let factory = StreamFactory::default();
    let original = sample(20_000);
    let compressed = factory.code_all(Coder::AloneEncoder, original.clone(), light()).unwrap().await.unwrap();
    assert!(!is_xz(&compressed));
    let via_auto = factory.decompress(compressed.clone(), None).unwrap().await.unwrap();
    assert_eq!(via_auto, original);
    let via_alone = factory.code_all(Coder::AloneDecoder, compressed, None).unwrap().await.unwrap();
    assert_eq!(via_alone, original);
}

#[tokio::test]
async fn test_raw_roundtrip() {
    let factory = StreamFactory::default();
    let options = light().with_filters([lzstream::Filter::lzma2(Preset::new(2).unwrap())]);
    let original = sample(30_000);
    let compressed = factory.code_all(Coder::RawEncoder, original.clone(), options.clone()).unwrap().await.unwrap();
    let decompressed = factory.code_all(Coder::RawDecoder, compressed, options).unwrap().await.unwrap();
    assert_eq!(decompressed, original);
}

#[test]
fn test_blocking_wait_and_callback() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let compressed = lzstream::compress("blocking", light())
        .unwrap()
        .on_finish(move |result| {
            counter.store(result.map_or(0, <[u8]>::len), Ordering::SeqCst);
        })
        .wait()
        .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), compressed.len());
    assert_eq!(lzstream::decompress(compressed, None).unwrap().wait().unwrap(), b"blocking");
}

#[tokio::test]
async fn test_legacy_lzma_one_shot_with_progress() {
    let progress = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    let original = sample(12_000);
    let compressed = lzstream::compress_lzma(original.clone(), 3)
        .unwrap()
        .on_progress(move |fraction| sink.lock().unwrap().push(fraction))
        .await
        .unwrap();
    assert_eq!(*progress.lock().unwrap(), vec![0.0, 1.0]);
    assert_eq!(compressed[0], 0x5D);
    assert!(!is_xz(&compressed));
    assert_eq!(lzstream::decompress(compressed, None).unwrap().await.unwrap(), original);
}

#[rstest]
#[case(0)]
#[case(10)]
#[tokio::test]
async fn test_legacy_lzma_out_of_range_level_uses_default(#[case] level: u32) {
    let factory = StreamFactory::default();
    let original = sample(5_000);
    let expected = factory.compress_lzma(original.clone(), 6).unwrap().await.unwrap();
    assert_eq!(factory.compress_lzma(original, level).unwrap().await.unwrap(), expected);
}

#[tokio::test]
async fn test_totals_after_finish() {
    let factory = StreamFactory::default();
    let original = sample(40_000);
    let mut adapter = factory.create_compressor(light()).unwrap();
    adapter.write(original.clone()).await.unwrap();
    let compressed = adapter.finish().await.unwrap();
    assert_eq!(adapter.total_in(), original.len() as u64);
    assert_eq!(adapter.total_out(), compressed.len() as u64);
}
