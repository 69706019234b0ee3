use std::time::Instant;

use crate::codec::{BlockCodec, DictTrainer};
use crate::error::{Error, Result};
use crate::format::{le_i32, Algorithm, BlockEntry, CompressionParams, BLOCK_ENTRY_SIZE};
use crate::stats::Stats;

/// Encodes and decodes one stripe under the configured strategy.
///
/// A stripe is always self-contained. SBC and MBC stripes are a single codec
/// unit; RAC stripes carry an inline dictionary and a block index so that any
/// one block can be decoded from the stripe bytes alone:
///
/// ```text
/// [dict_size: i32][dict][n_blocks: i32][BlockEntry x n_blocks][payloads]
/// ```
///
/// The inflation fallback applies at stripe granularity for every strategy:
/// when the compressed candidate would be at least as large as the raw
/// stripe, [`encode_stripe`](StripeCodec::encode_stripe) returns the raw
/// bytes unchanged and the caller records `compressed == raw`, the marker
/// decoders use to copy instead of decode. RAC additionally falls back per
/// block inside the stripe.
pub struct StripeCodec {
    algorithm: Algorithm,
    params: CompressionParams,
    codec: Box<dyn BlockCodec>,
    trainer: Option<Box<dyn DictTrainer>>,
}

/// Borrowed view of a RAC stripe's four regions.
struct RacLayout<'a> {
    dict: &'a [u8],
    n_blocks: usize,
    index: &'a [u8],
    payload: &'a [u8],
}

impl<'a> RacLayout<'a> {
    fn parse(stripe: &'a [u8]) -> Result<Self> {
        if stripe.len() < 4 {
            return Err(Error::Format("stripe truncated before dictionary size".into()));
        }
        let dict_size = le_i32(stripe, 0);
        if dict_size < 0 {
            return Err(Error::Format(format!("negative dictionary size {dict_size}")));
        }
        let dict_end = 4 + dict_size as usize;
        if stripe.len() < dict_end + 4 {
            return Err(Error::Format("stripe truncated inside dictionary".into()));
        }
        let n_blocks = le_i32(stripe, dict_end);
        if n_blocks <= 0 {
            return Err(Error::Format(format!("implausible block count {n_blocks}")));
        }
        let n_blocks = n_blocks as usize;
        let index_start = dict_end + 4;
        let payload_start = index_start + n_blocks * BLOCK_ENTRY_SIZE;
        if stripe.len() < payload_start {
            return Err(Error::Format("stripe truncated inside block index".into()));
        }
        Ok(Self {
            dict: &stripe[4..dict_end],
            n_blocks,
            index: &stripe[index_start..payload_start],
            payload: &stripe[payload_start..],
        })
    }

    /// Read entry `i` and check that its payload lies inside the stripe.
    fn entry(&self, i: usize) -> Result<BlockEntry> {
        let at = i * BLOCK_ENTRY_SIZE;
        let mut buf = [0u8; BLOCK_ENTRY_SIZE];
        buf.copy_from_slice(&self.index[at..at + BLOCK_ENTRY_SIZE]);
        let entry = BlockEntry::from_bytes(&buf)?;
        let end = entry.offset as u64 + entry.compressed_size as u64;
        if end > self.payload.len() as u64 {
            return Err(Error::Format(format!(
                "block {i} payload [{}, {end}) outside stripe body of {} bytes",
                entry.offset,
                self.payload.len()
            )));
        }
        Ok(entry)
    }

    fn dict_arg(&self) -> Option<&'a [u8]> {
        (!self.dict.is_empty()).then_some(self.dict)
    }
}

impl StripeCodec {
    /// A RAC codec needs a trainer; SBC/MBC ignore it.
    pub fn new(
        algorithm: Algorithm,
        params: CompressionParams,
        codec: Box<dyn BlockCodec>,
        trainer: Option<Box<dyn DictTrainer>>,
    ) -> Result<Self> {
        params.validate_for(algorithm)?;
        if algorithm == Algorithm::Rac && trainer.is_none() {
            return Err(Error::InvalidParams(
                "rac requires a dictionary trainer".into(),
            ));
        }
        Ok(Self {
            algorithm,
            params,
            codec,
            trainer,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn params(&self) -> &CompressionParams {
        &self.params
    }

    /// Adopt the strategy and parameters read back from an existing
    /// container, as the decode paths do.
    pub fn reconfigure(&mut self, algorithm: Algorithm, params: CompressionParams) -> Result<()> {
        params.validate_for(algorithm)?;
        self.algorithm = algorithm;
        self.params = params;
        Ok(())
    }

    // ── Encode ─────────────────────────────────────────────────────────────

    /// Compress one raw stripe (at most `stripe_size` bytes; the last stripe
    /// of a file may be shorter). Returns the raw bytes unchanged when
    /// compression would not shrink the stripe.
    pub fn encode_stripe(&self, raw: &[u8], stats: &mut Stats) -> Result<Vec<u8>> {
        if raw.is_empty() || raw.len() > self.params.stripe_size() {
            return Err(Error::InvalidParams(format!(
                "stripe of {} bytes outside (0, {}]",
                raw.len(),
                self.params.stripe_size()
            )));
        }
        let candidate = match self.algorithm {
            Algorithm::Sbc | Algorithm::Mbc => {
                let start = Instant::now();
                let out = self.codec.compress(raw, None)?;
                stats.compress_time += start.elapsed();
                out
            }
            Algorithm::Rac => self.encode_rac(raw, stats)?,
        };
        if candidate.len() >= raw.len() {
            Ok(raw.to_vec())
        } else {
            Ok(candidate)
        }
    }

    fn encode_rac(&self, raw: &[u8], stats: &mut Stats) -> Result<Vec<u8>> {
        let block_size = self.params.block_size as usize;
        let sizes: Vec<usize> = raw.chunks(block_size).map(<[u8]>::len).collect();
        let n_blocks = sizes.len();

        let trainer = self.trainer.as_ref().ok_or_else(|| {
            Error::InvalidParams("rac encode requires a dictionary trainer".into())
        })?;
        let start = Instant::now();
        let dict = match trainer.train(raw, &sizes, self.params.max_dict as usize) {
            Ok(dict) => dict,
            Err(err) => {
                // A degenerate stripe can defeat the trainer; the stripe is
                // still valid with an empty dictionary.
                eprintln!(
                    "warning: {} training failed ({err}); encoding stripe without dictionary",
                    trainer.name()
                );
                Vec::new()
            }
        };
        stats.dict_time += start.elapsed();
        stats.dict_total += dict.len() as u64;

        let index_at = 4 + dict.len() + 4;
        let mut out = Vec::with_capacity(index_at + n_blocks * BLOCK_ENTRY_SIZE + raw.len());
        out.extend_from_slice(&(dict.len() as i32).to_le_bytes());
        out.extend_from_slice(&dict);
        out.extend_from_slice(&(n_blocks as i32).to_le_bytes());
        out.resize(index_at + n_blocks * BLOCK_ENTRY_SIZE, 0);

        let dict_arg = (!dict.is_empty()).then_some(dict.as_slice());
        let mut offset = 0u32;
        for (i, block) in raw.chunks(block_size).enumerate() {
            let start = Instant::now();
            let compressed = self.codec.compress(block, dict_arg)?;
            stats.compress_time += start.elapsed();
            // Per-block inflation fallback: store the block verbatim.
            let payload: &[u8] = if compressed.len() >= block.len() {
                block
            } else {
                &compressed
            };
            let entry = BlockEntry {
                offset,
                raw_size: block.len() as u32,
                compressed_size: payload.len() as u32,
            };
            let at = index_at + i * BLOCK_ENTRY_SIZE;
            out[at..at + BLOCK_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
            out.extend_from_slice(payload);
            offset += payload.len() as u32;
        }
        Ok(out)
    }

    // ── Decode ─────────────────────────────────────────────────────────────

    /// Decompress one non-verbatim stripe into exactly `raw_len` bytes.
    ///
    /// Verbatim stripes (`compressed == raw`) never reach this function; the
    /// container copies them directly.
    pub fn decode_stripe(
        &self,
        compressed: &[u8],
        raw_len: usize,
        stats: &mut Stats,
    ) -> Result<Vec<u8>> {
        let out = match self.algorithm {
            Algorithm::Sbc | Algorithm::Mbc => {
                let start = Instant::now();
                let out = self.codec.decompress(compressed, raw_len, None)?;
                stats.decompress_time += start.elapsed();
                out
            }
            Algorithm::Rac => self.decode_rac_stripe(compressed, raw_len, stats)?,
        };
        if out.len() != raw_len {
            return Err(Error::Codec(format!(
                "stripe decoded to {} bytes, index declares {raw_len}",
                out.len()
            )));
        }
        Ok(out)
    }

    fn decode_rac_stripe(
        &self,
        compressed: &[u8],
        raw_len: usize,
        stats: &mut Stats,
    ) -> Result<Vec<u8>> {
        let layout = RacLayout::parse(compressed)?;
        let mut out = Vec::with_capacity(raw_len);
        let mut payload_used = 0u64;
        for i in 0..layout.n_blocks {
            let entry = layout.entry(i)?;
            if entry.offset as u64 != payload_used {
                return Err(Error::Format(format!(
                    "block {i} offset {} disagrees with running total {payload_used}",
                    entry.offset
                )));
            }
            payload_used += entry.compressed_size as u64;
            let payload = &layout.payload
                [entry.offset as usize..entry.offset as usize + entry.compressed_size as usize];
            if entry.is_verbatim() {
                out.extend_from_slice(payload);
            } else {
                let start = Instant::now();
                let block =
                    self.codec
                        .decompress(payload, entry.raw_size as usize, layout.dict_arg())?;
                stats.decompress_time += start.elapsed();
                if block.len() != entry.raw_size as usize {
                    return Err(Error::Codec(format!(
                        "block {i} decoded to {} bytes, index declares {}",
                        block.len(),
                        entry.raw_size
                    )));
                }
                out.extend_from_slice(&block);
            }
        }
        if payload_used != layout.payload.len() as u64 {
            return Err(Error::Format(format!(
                "block sizes cover {payload_used} of {} stripe body bytes",
                layout.payload.len()
            )));
        }
        Ok(out)
    }

    /// Decompress a single block of a non-verbatim stripe.
    ///
    /// `raw_len` is the stripe's declared raw size; it bounds the last,
    /// possibly short, block for SBC/MBC. For RAC only the dictionary, the
    /// requested index entry, and that block's payload are touched, so the
    /// cost is independent of the stripe's block count.
    pub fn decode_block(
        &self,
        compressed: &[u8],
        raw_len: usize,
        idx: u32,
        stats: &mut Stats,
    ) -> Result<Vec<u8>> {
        match self.algorithm {
            Algorithm::Sbc => {
                if idx != 0 {
                    return Err(Error::BlockOutOfRange {
                        index: idx as u64,
                        total: 1,
                    });
                }
                self.decode_stripe(compressed, raw_len, stats)
            }
            Algorithm::Mbc => {
                let n_blocks = self.params.number_of_blocks;
                if idx >= n_blocks {
                    return Err(Error::BlockOutOfRange {
                        index: idx as u64,
                        total: n_blocks as u64,
                    });
                }
                let block_size = self.params.block_size as usize;
                // MBC has no intra-stripe index: random access decodes the
                // whole stripe and slices.
                let stripe = self.decode_stripe(compressed, raw_len, stats)?;
                let start = idx as usize * block_size;
                if start >= stripe.len() {
                    return Err(Error::BlockOutOfRange {
                        index: idx as u64,
                        total: stripe.len().div_ceil(block_size) as u64,
                    });
                }
                let end = (start + block_size).min(stripe.len());
                Ok(stripe[start..end].to_vec())
            }
            Algorithm::Rac => self.decode_rac_block(compressed, idx, stats),
        }
    }

    fn decode_rac_block(&self, compressed: &[u8], idx: u32, stats: &mut Stats) -> Result<Vec<u8>> {
        let layout = RacLayout::parse(compressed)?;
        if idx as usize >= layout.n_blocks {
            return Err(Error::BlockOutOfRange {
                index: idx as u64,
                total: layout.n_blocks as u64,
            });
        }
        let entry = layout.entry(idx as usize)?;
        let payload = &layout.payload
            [entry.offset as usize..entry.offset as usize + entry.compressed_size as usize];
        if entry.is_verbatim() {
            return Ok(payload.to_vec());
        }
        let start = Instant::now();
        let block = self
            .codec
            .decompress(payload, entry.raw_size as usize, layout.dict_arg())?;
        stats.decompress_time += start.elapsed();
        if block.len() != entry.raw_size as usize {
            return Err(Error::Codec(format!(
                "block {idx} decoded to {} bytes, index declares {}",
                block.len(),
                entry.raw_size
            )));
        }
        Ok(block)
    }
}
