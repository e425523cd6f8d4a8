/// End-to-end tests over real finishers.
///
/// Covers the properties the codec promises to callers:
///  1. Every value type round-trips bit-exactly at lengths 0, 1 and large N
///  2. Decoded output does not depend on the block count
///  3. Frames from another codec, or with the wrong arity, are rejected
///  4. Struples round-trip field by field with per-field options
///  5. A failure in any block fails the whole call
use std::sync::Arc;

use tsdelta_core::{
    BlockState, CodecConfig, ColumnOptions, CompressionLevel, DataType, Decimal, DeltaCodec,
    DeltaError, DeltaValue, Duration, Finisher, FrameReader, Instant, Monotonicity, OffsetInstant,
    Struple, FRAME_HEADER_SIZE,
};
use tsdelta_finishers::{default_codec, DeflateFinisher, Lz4Finisher, PassThroughFinisher};

const LARGE: usize = 50_000;

/// Deterministic pseudo-random stream using a simple LCG.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        (self.next() >> 33) % n
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── helpers ───────────────────────────────────────────────────────────────

fn assert_roundtrip<T: DeltaValue>(codec: &DeltaCodec, values: &[T], opts: &ColumnOptions<T>) {
    for num_blocks in [1, 8] {
        let frame = codec.encode(values, num_blocks, opts).unwrap();
        let back: Vec<T> = codec.decode(&frame).unwrap();
        assert_eq!(
            back.len(),
            values.len(),
            "{:?} with {} blocks",
            T::DATA_TYPE,
            num_blocks
        );
        assert!(
            back == values,
            "{:?} with {} blocks did not round-trip",
            T::DATA_TYPE,
            num_blocks
        );
    }
}

/// Round-trip at lengths 0, 1 and `values.len()` under every level and hint.
fn assert_all_shapes<T: DeltaValue>(values: &[T], granularity: Option<T>) {
    let codec = default_codec();
    for level in [
        CompressionLevel::NoCompression,
        CompressionLevel::Fastest,
        CompressionLevel::Optimal,
    ] {
        for monotonicity in [
            Monotonicity::None,
            Monotonicity::NonDecreasing,
            Monotonicity::NonIncreasing,
        ] {
            let opts = ColumnOptions {
                level,
                granularity,
                monotonicity,
            };
            assert_roundtrip(&codec, &[], &opts);
            assert_roundtrip(&codec, &values[..1], &opts);
            assert_roundtrip(&codec, values, &opts);
        }
    }
}

/// Random walk with steps that are multiples of `step`.
fn walk(rng: &mut Lcg, len: usize, start: i64, step: i64, spread: u64) -> Vec<i64> {
    let mut v = start;
    (0..len)
        .map(|_| {
            let out = v;
            v += (rng.below(spread) as i64 - spread as i64 / 2) * step;
            out
        })
        .collect()
}

// ── value types ───────────────────────────────────────────────────────────

#[test]
fn test_integers_roundtrip() {
    init_logging();
    let mut rng = Lcg(1);
    let bytes: Vec<u8> = (0..LARGE).map(|_| rng.next() as u8).collect();
    assert_all_shapes(&bytes, None);
    let sbytes: Vec<i8> = (0..LARGE).map(|_| rng.next() as i8).collect();
    assert_all_shapes(&sbytes, Some(1));
    let shorts: Vec<i16> = (0..LARGE).map(|_| (rng.below(64) as i16 - 32) * 4).collect();
    assert_all_shapes(&shorts, Some(4));
    let ushorts: Vec<u16> = (0..LARGE).map(|i| (i % 65_536) as u16).collect();
    assert_all_shapes(&ushorts, None);
    let ints: Vec<i32> = walk(&mut rng, LARGE, 0, 3, 100).into_iter().map(|v| v as i32).collect();
    assert_all_shapes(&ints, Some(3));
    let uints: Vec<u32> = (0..LARGE).map(|_| rng.next() as u32).collect();
    assert_all_shapes(&uints, None);
    let longs = walk(&mut rng, LARGE, 1_700_000_000_000, 1000, 50);
    assert_all_shapes(&longs, Some(1000));
    let ulongs: Vec<u64> = (0..LARGE).map(|_| rng.next()).collect();
    assert_all_shapes(&ulongs, None);
}

#[test]
fn test_integer_extremes_roundtrip() {
    let codec = default_codec();
    assert_roundtrip(&codec, &[i64::MIN, i64::MAX, 0, i64::MIN, -1], &ColumnOptions::new());
    assert_roundtrip(&codec, &[u64::MAX, 0, u64::MAX, 1], &ColumnOptions::new());
    assert_roundtrip(&codec, &[i8::MIN, i8::MAX, i8::MIN], &ColumnOptions::new());
    assert_roundtrip(&codec, &[true, false, false, true, true], &ColumnOptions::new());
}

#[test]
fn test_bools_roundtrip() {
    let mut rng = Lcg(2);
    let flags: Vec<bool> = (0..LARGE).map(|_| rng.below(10) == 0).collect();
    assert_all_shapes(&flags, None);
}

#[test]
fn test_floats_roundtrip() {
    let mut rng = Lcg(3);
    // exact multiples of 0.25 take the aliased path
    let prices: Vec<f64> = walk(&mut rng, LARGE, 400, 1, 9)
        .into_iter()
        .map(|k| k as f64 * 0.25)
        .collect();
    assert_all_shapes(&prices, Some(0.25));
    // arbitrary values take the bit-pattern path
    let noise: Vec<f64> = (0..LARGE).map(|_| f64::from_bits(rng.next() >> 2)).collect();
    assert_all_shapes(&noise, Some(0.1));
    let singles: Vec<f32> = (0..LARGE).map(|i| (i as f32).sin() * 100.0).collect();
    assert_all_shapes(&singles, None);
    let halves: Vec<f32> = (0..LARGE).map(|i| (i % 1000) as f32 * 0.5).collect();
    assert_all_shapes(&halves, Some(0.5));
}

#[test]
fn test_float_specials_keep_their_bits() {
    let codec = default_codec();
    let values = [0.0f64, -0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE, 1.5];
    for granularity in [None, Some(0.5)] {
        let opts = ColumnOptions {
            granularity,
            ..ColumnOptions::new()
        };
        let frame = codec.encode(&values, 2, &opts).unwrap();
        let back: Vec<f64> = codec.decode(&frame).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back), bits(&values));
    }
}

#[test]
fn test_decimals_roundtrip() {
    let mut rng = Lcg(4);
    let uniform: Vec<Decimal> = walk(&mut rng, LARGE, 1_000_000, 5, 40)
        .into_iter()
        .map(|m| Decimal::new(m as i128, 4).unwrap())
        .collect();
    assert_all_shapes(&uniform, None);

    let mixed: Vec<Decimal> = (0..10_000)
        .map(|i| Decimal::new(i as i128 * 7, (i % 5) as u8).unwrap())
        .collect();
    assert_all_shapes(&mixed, None);

    let huge: Vec<Decimal> = vec![
        "79228162514264337593543950335".parse().unwrap(),
        "0.0000000000000000000000000001".parse().unwrap(),
        "-79228162514264337593543950335".parse().unwrap(),
    ];
    assert_roundtrip(&default_codec(), &huge, &ColumnOptions::new());
}

#[test]
fn test_time_types_roundtrip() {
    let mut rng = Lcg(5);
    let start = 638_000_000_000_000_000i64;
    let instants: Vec<Instant> = (0..LARGE as i64)
        .map(|i| Instant(start + i * 10_000_000))
        .collect();
    assert_all_shapes(&instants, Some(Instant(10_000_000)));

    let durations: Vec<Duration> = walk(&mut rng, LARGE, 0, 10_000, 30)
        .into_iter()
        .map(Duration)
        .collect();
    assert_all_shapes(&durations, Some(Duration(10_000)));

    let zoned: Vec<OffsetInstant> = (0..LARGE as i64)
        .map(|i| OffsetInstant::new(start + i * 600_000_000, if i % 1000 < 500 { 60 } else { 120 }))
        .collect();
    assert_all_shapes(&zoned, None);
}

#[test]
fn test_one_million_values() {
    let codec = default_codec();
    let values: Vec<i64> = (0..1_000_000i64).map(|i| 230_000 + i * 25).collect();
    let opts = ColumnOptions::new()
        .granularity(25)
        .monotonicity(Monotonicity::NonDecreasing);
    let frame = codec.encode(&values, 8, &opts).unwrap();
    assert!(frame.len() < values.len() / 10, "frame is {} bytes", frame.len());
    assert_eq!(codec.decode::<i64>(&frame).unwrap(), values);
}

// ── frame behaviour ───────────────────────────────────────────────────────

#[test]
fn test_spaced_int64_scenario() {
    init_logging();
    let codec = default_codec();
    let values = [230000i64, 230025, 230050, 230075];
    let opts = ColumnOptions::new()
        .granularity(25)
        .monotonicity(Monotonicity::NonDecreasing);
    let frame = codec.encode(&values, 1, &opts).unwrap();

    let reader = FrameReader::parse(&frame, codec.magic_number()).unwrap();
    assert_eq!(reader.num_blocks(), 1);
    assert_eq!(reader.num_vectors(), 1);
    let block = BlockState::<i64>::deserialize(reader.cell(0, 0).unwrap()).unwrap();
    assert_eq!(block.anchor, 230000);
    assert_eq!(block.factor, 25);
    assert_eq!(block.list_count, 4);
    assert_eq!(block.flags.monotonicity, Monotonicity::NonDecreasing);

    assert_eq!(codec.decode::<i64>(&frame).unwrap(), values);
}

#[test]
fn test_block_count_does_not_change_output() {
    let codec = default_codec();
    let mut rng = Lcg(6);
    let values = walk(&mut rng, 100_003, -5_000, 7, 21);
    let opts = ColumnOptions::new().granularity(7);
    let one = codec.encode(&values, 1, &opts).unwrap();
    let eight = codec.encode(&values, 8, &opts).unwrap();
    assert_eq!(codec.inspect(&one).unwrap().num_blocks, 1);
    assert_eq!(codec.inspect(&eight).unwrap().num_blocks, 8.min(codec.max_parallel()));
    assert_eq!(
        codec.decode::<i64>(&one).unwrap(),
        codec.decode::<i64>(&eight).unwrap()
    );
}

#[test]
fn test_foreign_or_corrupt_magic_is_rejected() {
    let deflate = DeltaCodec::new(Arc::new(DeflateFinisher));
    let lz4 = DeltaCodec::new(Arc::new(Lz4Finisher));
    let frame = deflate.encode(&[1u32, 2, 3], 1, &ColumnOptions::new()).unwrap();
    assert!(matches!(
        lz4.decode::<u32>(&frame),
        Err(DeltaError::MagicMismatch { .. })
    ));

    let mut corrupt = frame.clone();
    corrupt[0] ^= 0xFF;
    let err = deflate.decode::<u32>(&corrupt).unwrap_err();
    assert!(matches!(err, DeltaError::MagicMismatch { .. }), "{}", err);
}

#[test]
fn test_vector_count_mismatch() {
    let codec = default_codec();
    let rows: Vec<(i32, i32, i32)> = (0..100).map(|i| (i, -i, i * i)).collect();
    let frame = codec
        .encode_struples(&rows, 4, &<(i32, i32, i32)>::default_options())
        .unwrap();
    match codec.decode_struples::<(i32, i32)>(&frame) {
        Err(DeltaError::VectorCountMismatch { expected, found }) => {
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("expected a vector count mismatch, got {:?}", other),
    }
    assert!(matches!(
        codec.decode::<i32>(&frame),
        Err(DeltaError::VectorCountMismatch { expected: 1, found: 3 })
    ));
}

#[test]
fn test_truncated_frames_fail_whole_call() {
    let codec = DeltaCodec::new(Arc::new(PassThroughFinisher));
    let values: Vec<u16> = (0..1000).map(|i| (i * 3) as u16).collect();
    let frame = codec.encode(&values, 4, &ColumnOptions::new()).unwrap();
    for cut in [0, 3, 8, 12, frame.len() / 2, frame.len() - 1] {
        assert!(codec.decode::<u16>(&frame[..cut]).is_err(), "cut at {}", cut);
    }
}

#[test]
fn test_corrupt_block_fails_whole_call() {
    let codec = DeltaCodec::new(Arc::new(PassThroughFinisher));
    let values: Vec<i64> = (0..10_000).collect();
    let frame = codec.encode(&values, 4, &ColumnOptions::new()).unwrap();
    assert_eq!(codec.inspect(&frame).unwrap().cells.len(), 4);

    // header, cell length, then flags + count + anchor + factor + byte count
    let width_byte = FRAME_HEADER_SIZE + 4 + 2 + 4 + 8 + 8 + 4;
    assert_eq!(frame[width_byte], 1);
    let mut corrupt = frame.clone();
    corrupt[width_byte] = 17;
    assert!(matches!(
        codec.decode::<i64>(&corrupt),
        Err(DeltaError::InvalidFormat(_))
    ));

    // the remaining blocks are intact, but no partial result comes back
    let mut short_payload = frame.clone();
    short_payload[width_byte] = 2;
    assert!(codec.decode::<i64>(&short_payload).is_err());
}

// ── struples ──────────────────────────────────────────────────────────────

type Tick = (Instant, Duration, i64, u64, i32);

fn ticks(len: usize) -> Vec<Tick> {
    let mut rng = Lcg(7);
    let start = 638_400_000_000_000_000i64;
    (0..len)
        .map(|i| {
            let i = i as i64;
            (
                Instant(start + i * 2_500_000),
                Duration(rng.below(50) as i64 * 10_000),
                1_000_000 - i * 3,
                rng.next() >> 20,
                rng.below(1000) as i32 - 500,
            )
        })
        .collect()
}

#[test]
fn test_five_field_struples_with_per_field_options() {
    init_logging();
    let codec = default_codec();
    let rows = ticks(50_000);
    let opts = (
        ColumnOptions::new()
            .granularity(Instant(2_500_000))
            .monotonicity(Monotonicity::NonDecreasing),
        ColumnOptions::new()
            .granularity(Duration(10_000))
            .level(CompressionLevel::Optimal),
        ColumnOptions::new()
            .granularity(3)
            .monotonicity(Monotonicity::NonIncreasing),
        ColumnOptions::new().level(CompressionLevel::NoCompression),
        ColumnOptions::new(),
    );
    for num_blocks in [1, 3, 8] {
        let frame = codec.encode_struples(&rows, num_blocks, &opts).unwrap();
        let info = codec.inspect(&frame).unwrap();
        assert_eq!(info.num_vectors, 5);
        for vector in 0..5 {
            assert_eq!(info.value_count(vector), rows.len());
        }
        let back: Vec<Tick> = codec.decode_struples(&frame).unwrap();
        assert_eq!(back, rows);
    }
}

#[test]
fn test_columns_api_matches_rows_api() {
    let codec = default_codec();
    let rows = ticks(1234);
    let opts = <Tick>::default_options();
    let from_rows = codec.encode_struples(&rows, 4, &opts).unwrap();
    let columns = <Tick>::split(&rows);
    let from_columns = codec.encode_columns::<Tick>(&columns, 4, &opts).unwrap();
    assert_eq!(from_rows, from_columns);

    let decoded = codec.decode_columns::<Tick>(&from_columns).unwrap();
    assert_eq!(decoded.0, columns.0);
    assert_eq!(decoded.4, columns.4);

    let ragged = (vec![Instant(0)], vec![Duration(0), Duration(1)], vec![1i64], vec![2u64], vec![3i32]);
    assert!(matches!(
        codec.encode_columns::<Tick>(&ragged, 1, &opts),
        Err(DeltaError::InvalidArgument(_))
    ));
}

#[test]
fn test_seventeen_field_struples() {
    type Wide = (
        bool, u8, i8, i16, u16, i32, u32, i64, u64, f32, f64, Decimal, Instant, Duration,
        OffsetInstant, i64, u8,
    );
    let rows: Vec<Wide> = (0..3000i64)
        .map(|i| {
            (
                i % 2 == 0,
                i as u8,
                (i as i8).wrapping_neg(),
                (i * 2) as i16,
                (i * 3) as u16,
                (i * 5) as i32,
                (i * 7) as u32,
                i * 11,
                (i * 13) as u64,
                i as f32 * 0.5,
                i as f64 * 0.125,
                Decimal::new(i as i128 * 25, 2).unwrap(),
                Instant(i * 10_000_000),
                Duration(-i),
                OffsetInstant::new(i * 600_000_000, -300),
                i64::MAX - i,
                7,
            )
        })
        .collect();
    let codec = default_codec();
    let frame = codec
        .encode_struples(&rows, 6, &<Wide>::default_options())
        .unwrap();
    assert_eq!(codec.inspect(&frame).unwrap().num_vectors, 17);

    let columns = codec.decode_columns::<Wide>(&frame).unwrap();
    let expected = <Wide>::split(&rows);
    assert_eq!(columns.0, expected.0);
    assert_eq!(columns.1, expected.1);
    assert_eq!(columns.2, expected.2);
    assert_eq!(columns.3, expected.3);
    assert_eq!(columns.4, expected.4);
    assert_eq!(columns.5, expected.5);
    assert_eq!(columns.6, expected.6);
    assert_eq!(columns.7, expected.7);
    assert_eq!(columns.8, expected.8);
    assert_eq!(columns.9, expected.9);
    assert_eq!(columns.10, expected.10);
    assert_eq!(columns.11, expected.11);
    assert_eq!(columns.12, expected.12);
    assert_eq!(columns.13, expected.13);
    assert_eq!(columns.14, expected.14);
    assert_eq!(columns.15, expected.15);
    assert_eq!(columns.16, expected.16);

    let back = codec.decode_struples::<Wide>(&frame).unwrap();
    assert_eq!(back.len(), rows.len());
    assert_eq!(back[2999].14, rows[2999].14);
    assert_eq!(back[1234].11, rows[1234].11);
}

/// Finisher that fails on one side of the round trip.
struct Failing {
    on_encode: bool,
}

impl Finisher for Failing {
    fn id(&self) -> u16 {
        0xFFFD
    }

    fn name(&self) -> &'static str {
        "failing"
    }

    fn encode(&self, raw: &[u8], _level: CompressionLevel) -> anyhow::Result<Vec<u8>> {
        if self.on_encode {
            anyhow::bail!("encode failed");
        }
        Ok(raw.to_vec())
    }

    fn decode(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>> {
        if !self.on_encode {
            anyhow::bail!("decode failed");
        }
        Ok(compressed.to_vec())
    }
}

fn pairs(len: i64) -> Vec<(i64, u8)> {
    (0..len).map(|i| (i * 3, (i % 7) as u8)).collect()
}

#[test]
fn test_corrupt_struple_cell_fails_whole_call() {
    init_logging();
    let codec = DeltaCodec::new(Arc::new(PassThroughFinisher));
    let rows = pairs(1000);
    let frame = codec
        .encode_struples(&rows, 2, &<(i64, u8)>::default_options())
        .unwrap();
    assert_eq!(codec.decode_struples::<(i64, u8)>(&frame).unwrap(), rows);

    // second block of the u8 vector: flags + count + anchor + factor + byte count
    let reader = FrameReader::parse(&frame, codec.magic_number()).unwrap();
    let cell = reader.cell(1, 1).unwrap();
    let width_byte = cell.as_ptr() as usize - frame.as_ptr() as usize + 2 + 4 + 1 + 1 + 4;
    assert_eq!(frame[width_byte], 1);

    let mut corrupt = frame.clone();
    corrupt[width_byte] = 17;
    assert!(matches!(
        codec.decode_struples::<(i64, u8)>(&corrupt),
        Err(DeltaError::InvalidFormat(_))
    ));
    assert!(matches!(
        codec.decode_columns::<(i64, u8)>(&corrupt),
        Err(DeltaError::InvalidFormat(_))
    ));
}

#[test]
fn test_struple_finisher_failures_surface() {
    init_logging();
    let rows = pairs(500);
    let opts = <(i64, u8)>::default_options();

    let encode_fails = DeltaCodec::new(Arc::new(Failing { on_encode: true }));
    assert!(matches!(
        encode_fails.encode_struples(&rows, 4, &opts),
        Err(DeltaError::Finisher(_))
    ));

    let decode_fails = DeltaCodec::new(Arc::new(Failing { on_encode: false }));
    let frame = decode_fails.encode_struples(&rows, 4, &opts).unwrap();
    assert!(matches!(
        decode_fails.decode_struples::<(i64, u8)>(&frame),
        Err(DeltaError::Finisher(_))
    ));

    // only the u8 field goes through the finisher; it still fails the call
    let partly_raw = (
        ColumnOptions::new().level(CompressionLevel::NoCompression),
        ColumnOptions::new(),
    );
    let frame = decode_fails.encode_struples(&rows, 4, &partly_raw).unwrap();
    assert!(matches!(
        decode_fails.decode_struples::<(i64, u8)>(&frame),
        Err(DeltaError::Finisher(_))
    ));

    let all_raw = (
        ColumnOptions::new().level(CompressionLevel::NoCompression),
        ColumnOptions::new().level(CompressionLevel::NoCompression),
    );
    let frame = decode_fails.encode_struples(&rows, 4, &all_raw).unwrap();
    assert_eq!(decode_fails.decode_struples::<(i64, u8)>(&frame).unwrap(), rows);
}

#[test]
fn test_inspection_serializes_to_json() {
    let codec = DeltaCodec::new(Arc::new(PassThroughFinisher));
    let frame = codec
        .encode_struples(&pairs(100), 2, &<(i64, u8)>::default_options())
        .unwrap();
    let info = codec.inspect(&frame).unwrap();
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["num_blocks"], 2);
    assert_eq!(json["num_vectors"], 2);
    assert_eq!(json["encoded_size"], frame.len());
    assert_eq!(json["cells"].as_array().unwrap().len(), 4);
    assert_eq!(json["cells"][0]["data_type"], "int64");
    assert_eq!(json["cells"][1]["data_type"], "byte");
    assert_eq!(json["cells"][3]["list_count"], 50);
    assert!(json["cells"][0].get("flags").is_none());
}

// ── configuration ─────────────────────────────────────────────────────────

#[test]
fn test_config_from_json() {
    let config: CodecConfig = serde_json::from_str(r#"{ "max_parallel": 3, "num_threads": 2 }"#).unwrap();
    assert_eq!(config.max_parallel, Some(3));
    assert_eq!(config.num_threads, Some(2));
    let empty: CodecConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, CodecConfig::default());

    let codec = DeltaCodec::with_config(Arc::new(DeflateFinisher), config).unwrap();
    let values: Vec<u64> = (0..999).collect();
    let frame = codec.encode(&values, 100, &ColumnOptions::new()).unwrap();
    let info = codec.inspect(&frame).unwrap();
    assert_eq!(info.num_blocks, 3);
    assert_eq!(info.cells.iter().map(|c| c.list_count).sum::<usize>(), 999);
    assert_eq!(info.cells[0].flags.data_type, DataType::UInt64);
    assert_eq!(codec.decode::<u64>(&frame).unwrap(), values);

    // same finisher, same identity: a frame from one decodes with the other
    assert_eq!(codec.magic_number(), default_codec().magic_number());
    assert_eq!(default_codec().decode::<u64>(&frame).unwrap(), values);
}

#[test]
fn test_options_from_json() {
    let level: CompressionLevel = serde_json::from_str(r#""optimal""#).unwrap();
    let mono: Monotonicity = serde_json::from_str(r#""non_decreasing""#).unwrap();
    assert_eq!(level, CompressionLevel::Optimal);
    assert_eq!(mono, Monotonicity::NonDecreasing);
}
