//! Stripe-level round-trips for the three strategies, driven straight
//! through the StripeCodec without any file I/O.

use srac_codecs::{CoverParams, Lz4Codec, RollingKmerTrainer, SuffixArrayTrainer};
use srac_core::{Algorithm, CompressionParams, Error, Stats, StripeCodec};

fn params(block_size: u32, n: u32, max_dict: u32, k: u32, d: u32) -> CompressionParams {
    CompressionParams {
        block_size,
        number_of_blocks: n,
        max_dict,
        segment_size: k,
        kmer_size: d,
    }
}

fn sbc() -> StripeCodec {
    StripeCodec::new(
        Algorithm::Sbc,
        params(4096, 1, 0, 0, 0),
        Box::new(Lz4Codec),
        None,
    )
    .unwrap()
}

fn mbc(n: u32) -> StripeCodec {
    StripeCodec::new(
        Algorithm::Mbc,
        params(4096, n, 0, 0, 0),
        Box::new(Lz4Codec),
        None,
    )
    .unwrap()
}

fn rac(n: u32) -> StripeCodec {
    StripeCodec::new(
        Algorithm::Rac,
        params(4096, n, 4096, 64, 8),
        Box::new(Lz4Codec),
        Some(Box::new(RollingKmerTrainer::new(CoverParams {
            segment_size: 64,
            kmer_size: 8,
            ..CoverParams::default()
        }))),
    )
    .unwrap()
}

fn lcg(rng: &mut u64) -> u64 {
    *rng = rng
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *rng >> 33
}

/// Quarters drawn from alphabets of 1, 4, 13 and 26 letters: entropy ramps
/// up along the stripe.
fn mixed_entropy(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|i| {
            let span = match i * 4 / len {
                0 => 1,
                1 => 4,
                2 => 13,
                _ => 26,
            };
            b'A' + (lcg(&mut rng) % span) as u8
        })
        .collect()
}

fn random_alphabet(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len).map(|_| b'A' + (lcg(&mut rng) % 26) as u8).collect()
}

// ── SBC ────────────────────────────────────────────────────────────────────

#[test]
fn sbc_regular_block() {
    let codec = sbc();
    let raw = vec![b'A'; 4096];
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    assert!(encoded.len() < raw.len(), "all-'A' block must compress");

    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded, raw);

    let block = codec.decode_block(&encoded, raw.len(), 0, &mut stats).unwrap();
    assert_eq!(block, raw);
}

#[test]
fn sbc_unaligned_block() {
    let codec = sbc();
    let raw = vec![b'A'; 4096 - 100];
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded.len(), 3996);
    assert_eq!(decoded, raw);
}

#[test]
fn sbc_rejects_nonzero_block_index() {
    let codec = sbc();
    let raw = vec![b'A'; 4096];
    let mut stats = Stats::default();
    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();

    let err = codec
        .decode_block(&encoded, raw.len(), 1, &mut stats)
        .unwrap_err();
    assert!(matches!(err, Error::BlockOutOfRange { index: 1, total: 1 }));
}

// ── MBC ────────────────────────────────────────────────────────────────────

#[test]
fn mbc_four_block_stripe() {
    let codec = mbc(4);
    let mut raw = Vec::new();
    for letter in [b'A', b'B', b'C', b'D'] {
        raw.extend(std::iter::repeat(letter).take(4096));
    }
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    assert!(encoded.len() < raw.len());

    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded, raw);

    for idx in 0..4u32 {
        let block = codec.decode_block(&encoded, raw.len(), idx, &mut stats).unwrap();
        assert_eq!(block, &raw[idx as usize * 4096..(idx as usize + 1) * 4096]);
    }
    let err = codec.decode_block(&encoded, raw.len(), 4, &mut stats).unwrap_err();
    assert!(matches!(err, Error::BlockOutOfRange { .. }));
}

#[test]
fn mbc_short_last_block() {
    let codec = mbc(4);
    // Two and a half blocks: the stripe ends mid-block.
    let raw = mixed_entropy(4096 * 2 + 2048, 5);
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded, raw);

    let tail = codec.decode_block(&encoded, raw.len(), 2, &mut stats).unwrap();
    assert_eq!(tail, &raw[2 * 4096..]);
    assert_eq!(tail.len(), 2048);

    // Block 3 would start past the stripe's actual end.
    let err = codec.decode_block(&encoded, raw.len(), 3, &mut stats).unwrap_err();
    assert!(matches!(err, Error::BlockOutOfRange { .. }));
}

// ── RAC ────────────────────────────────────────────────────────────────────

#[test]
fn rac_mixed_entropy_roundtrip_and_random_blocks() {
    let codec = rac(256);
    let raw = mixed_entropy(256 * 4096, 0xDEAD_BEEF);
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    assert!(
        encoded.len() < raw.len(),
        "mixed-entropy stripe must shrink: {} vs {}",
        encoded.len(),
        raw.len()
    );
    assert!(stats.dict_total > 0, "training must have produced a dictionary");

    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded, raw);

    let mut rng = 77u64;
    for _ in 0..10 {
        let idx = (lcg(&mut rng) % 256) as u32;
        let block = codec.decode_block(&encoded, raw.len(), idx, &mut stats).unwrap();
        assert_eq!(
            block,
            &raw[idx as usize * 4096..(idx as usize + 1) * 4096],
            "random access to block {idx} must match the source slice"
        );
    }
}

#[test]
fn rac_incompressible_stripe_falls_back_verbatim() {
    let codec = rac(256);
    let raw = random_alphabet(256 * 4096, 0x1234_5678);
    let mut stats = Stats::default();

    // Per-block fallback keeps every payload at raw size, so the stripe with
    // its dictionary and index can only be larger than the input and the
    // outer fallback must return the input unchanged.
    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    assert_eq!(encoded, raw);
}

#[test]
fn rac_short_last_block_roundtrip() {
    let codec = rac(4);
    let raw = mixed_entropy(4096 * 3 + 1000, 21);
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    if encoded.len() < raw.len() {
        let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
        assert_eq!(decoded, raw);
        let tail = codec.decode_block(&encoded, raw.len(), 3, &mut stats).unwrap();
        assert_eq!(tail, &raw[3 * 4096..]);
    } else {
        assert_eq!(encoded, raw, "fallback must be byte-identical");
    }
}

#[test]
fn rac_encoding_is_deterministic() {
    let raw = mixed_entropy(64 * 4096, 42);
    let mut stats = Stats::default();

    let a = rac(64).encode_stripe(&raw, &mut stats).unwrap();
    let b = rac(64).encode_stripe(&raw, &mut stats).unwrap();
    assert_eq!(a, b, "same input and parameters must emit identical bytes");
}

#[test]
fn rac_with_suffix_array_trainer_roundtrips() {
    let codec = StripeCodec::new(
        Algorithm::Rac,
        params(4096, 64, 4096, 64, 8),
        Box::new(Lz4Codec),
        Some(Box::new(SuffixArrayTrainer)),
    )
    .unwrap();
    let raw = mixed_entropy(64 * 4096, 9);
    let mut stats = Stats::default();

    let encoded = codec.encode_stripe(&raw, &mut stats).unwrap();
    let decoded = codec.decode_stripe(&encoded, raw.len(), &mut stats).unwrap();
    assert_eq!(decoded, raw);

    let block = codec.decode_block(&encoded, raw.len(), 63, &mut stats).unwrap();
    assert_eq!(block, &raw[63 * 4096..]);
}

#[test]
fn oversized_stripe_rejected() {
    let codec = mbc(4);
    let raw = vec![0u8; 4 * 4096 + 1];
    let mut stats = Stats::default();
    let err = codec.encode_stripe(&raw, &mut stats).unwrap_err();
    assert!(matches!(err, Error::InvalidParams(_)));

    let err = codec.encode_stripe(&[], &mut stats).unwrap_err();
    assert!(matches!(err, Error::InvalidParams(_)));
}
