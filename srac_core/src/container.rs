use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec::{BlockCodec, DictTrainer};
use crate::error::{Error, Result};
use crate::format::{Algorithm, CompressionParams, FileHeader, StripeHeader, BUFFER_SIZE};
use crate::stats::Stats;
use crate::stripe::StripeCodec;

/// Read and validate the file-level header and stripe index of an existing
/// container, without touching the body.
///
/// Beyond the header's own invariants this checks that the declared body
/// exactly fills the rest of the file.
pub fn read_toc(path: impl AsRef<Path>) -> Result<FileHeader> {
    let mut file = File::open(path)?;
    let header = FileHeader::read_from(&mut file)?;
    let expected = FileHeader::body_base(header.stripes.len()) + header.body_len();
    let actual = file.metadata()?.len();
    if expected != actual {
        return Err(Error::Format(format!(
            "stripe index declares {expected} file bytes but the file has {actual}"
        )));
    }
    Ok(header)
}

/// Drives a [`StripeCodec`] over whole files.
///
/// One container instance performs one operation at a time; buffers and file
/// handles live for the duration of a call and are dropped on return. The
/// decode operations adopt the strategy and parameters stored in the file
/// being read.
pub struct Container {
    stripe: StripeCodec,
}

impl Container {
    pub fn new(
        algorithm: Algorithm,
        params: CompressionParams,
        codec: Box<dyn BlockCodec>,
        trainer: Option<Box<dyn DictTrainer>>,
    ) -> Result<Self> {
        Ok(Self {
            stripe: StripeCodec::new(algorithm, params, codec, trainer)?,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.stripe.algorithm()
    }

    pub fn params(&self) -> &CompressionParams {
        self.stripe.params()
    }

    // ── Encode ─────────────────────────────────────────────────────────────

    /// Compress `input` into a new container at `output`.
    ///
    /// The header is written twice: a placeholder with a zeroed stripe index
    /// first, so the body can stream out sequentially, then the real header
    /// once every stripe has been sized.
    ///
    /// Returns the container size in bytes.
    pub fn compress_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        stats: &mut Stats,
    ) -> Result<u64> {
        let params = *self.stripe.params();
        let stripe_size = params.stripe_size();

        let mut src = File::open(input)?;
        let file_size = src.metadata()?.len();
        stats.raw_total = file_size;
        let n_stripes = usize::try_from(file_size.div_ceil(stripe_size as u64))
            .map_err(|_| Error::InvalidParams("input needs more stripes than addressable".into()))?;

        let mut header = FileHeader {
            algorithm: self.stripe.algorithm(),
            params,
            stripes: vec![StripeHeader::default(); n_stripes],
        };

        let mut dst = File::create(output)?;
        header.write_to(&mut dst)?;

        let in_capacity = BUFFER_SIZE.div_ceil(stripe_size) * stripe_size;
        let mut buf_in = vec![0u8; in_capacity];
        let mut buf_out: Vec<u8> = Vec::with_capacity(in_capacity);

        let mut offset = 0u64;
        let mut stripe_idx = 0usize;
        loop {
            let filled = read_fill(&mut src, &mut buf_in)?;
            if filled == 0 {
                break;
            }
            buf_out.clear();
            for raw in buf_in[..filled].chunks(stripe_size) {
                let encoded = self.stripe.encode_stripe(raw, stats)?;
                let end = offset
                    .checked_add(encoded.len() as u64)
                    .filter(|end| *end <= i64::MAX as u64)
                    .ok_or_else(|| {
                        Error::Format("stripe offsets overflow the on-disk index".into())
                    })?;
                if stripe_idx >= n_stripes {
                    return Err(Error::Format(
                        "input file grew while it was being compressed".into(),
                    ));
                }
                header.stripes[stripe_idx] = StripeHeader {
                    offset,
                    raw_size: raw.len() as u32,
                    compressed_size: encoded.len() as u32,
                };
                buf_out.extend_from_slice(&encoded);
                offset = end;
                stripe_idx += 1;
            }
            dst.write_all(&buf_out)?;
        }
        if stripe_idx != n_stripes {
            return Err(Error::Format(
                "input file shrank while it was being compressed".into(),
            ));
        }

        // Second phase of the header write: overwrite the placeholder with
        // the filled-in stripe index before the handle closes.
        dst.seek(SeekFrom::Start(0))?;
        header.write_to(&mut dst)?;
        dst.flush()?;

        let total = FileHeader::body_base(n_stripes) + offset;
        stats.compressed_total = total;
        Ok(total)
    }

    // ── Decode, whole file ─────────────────────────────────────────────────

    /// Decompress a whole container back to its original bytes.
    ///
    /// Returns the number of raw bytes written.
    pub fn decompress_file(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        stats: &mut Stats,
    ) -> Result<u64> {
        let input = input.as_ref();
        let toc = read_toc(input)?;
        self.stripe.reconfigure(toc.algorithm, toc.params)?;
        let stripe_size = toc.params.stripe_size();

        let mut src = File::open(input)?;
        stats.compressed_total = src.metadata()?.len();
        src.seek(SeekFrom::Start(FileHeader::body_base(toc.stripes.len())))?;
        let mut dst = File::create(output)?;

        let out_capacity = BUFFER_SIZE.div_ceil(stripe_size) * stripe_size;
        let mut buf_in: Vec<u8> = Vec::new();
        let mut buf_out: Vec<u8> = Vec::with_capacity(out_capacity);

        // Batch stripes until their cumulative raw size fills the output
        // buffer, then read and decode the matching compressed range.
        let mut written = 0u64;
        let mut batch_start = 0usize;
        while batch_start < toc.stripes.len() {
            let mut batch_end = batch_start;
            let mut in_len = 0usize;
            let mut out_len = 0usize;
            while batch_end < toc.stripes.len() {
                let stripe = &toc.stripes[batch_end];
                if out_len > 0 && out_len + stripe.raw_size as usize > out_capacity {
                    break;
                }
                in_len += stripe.compressed_size as usize;
                out_len += stripe.raw_size as usize;
                batch_end += 1;
            }

            buf_in.resize(in_len, 0);
            src.read_exact(&mut buf_in)?;
            buf_out.clear();
            let mut at = 0usize;
            for stripe in &toc.stripes[batch_start..batch_end] {
                let compressed = &buf_in[at..at + stripe.compressed_size as usize];
                at += stripe.compressed_size as usize;
                if stripe.is_verbatim() {
                    buf_out.extend_from_slice(compressed);
                } else {
                    let raw =
                        self.stripe
                            .decode_stripe(compressed, stripe.raw_size as usize, stats)?;
                    buf_out.extend_from_slice(&raw);
                }
            }
            dst.write_all(&buf_out)?;
            written += buf_out.len() as u64;
            batch_start = batch_end;
        }

        stats.decompressed_total = written;
        Ok(written)
    }

    // ── Decode, random blocks ──────────────────────────────────────────────

    /// Random-read workload: draw `total_blocks` pseudo-random block numbers
    /// from a seeded generator, decode each one touching only its stripe, and
    /// append the decoded blocks to `output` in draw order.
    ///
    /// Returns the drawn block numbers.
    pub fn decompress_blocks(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        seed: u64,
        stats: &mut Stats,
    ) -> Result<Vec<u64>> {
        let input = input.as_ref();
        let toc = read_toc(input)?;
        self.stripe.reconfigure(toc.algorithm, toc.params)?;

        let mut src = File::open(input)?;
        stats.compressed_total = src.metadata()?.len();
        let mut dst = File::create(output)?;

        let total_blocks = total_blocks(&toc, &mut src)?;
        if total_blocks == 0 {
            return Ok(Vec::new());
        }
        let body_base = FileHeader::body_base(toc.stripes.len());
        let per_stripe = toc.params.number_of_blocks as u64;
        let block_size = toc.params.block_size as usize;

        let mut rng = Lcg::new(seed);
        let mut drawn = Vec::with_capacity(total_blocks as usize);
        let mut stripe_buf: Vec<u8> = Vec::new();
        let mut written = 0u64;
        for _ in 0..total_blocks {
            let block_number = rng.next_below(total_blocks);
            drawn.push(block_number);

            let stripe = &toc.stripes[(block_number / per_stripe) as usize];
            let intra_idx = (block_number % per_stripe) as u32;
            src.seek(SeekFrom::Start(body_base + stripe.offset))?;
            stripe_buf.resize(stripe.compressed_size as usize, 0);
            src.read_exact(&mut stripe_buf)?;

            let block = if stripe.is_verbatim() {
                // The stripe is stored raw: slice the block directly. The
                // last block of the stripe may be short.
                let start = intra_idx as usize * block_size;
                if start >= stripe_buf.len() {
                    return Err(Error::BlockOutOfRange {
                        index: block_number,
                        total: total_blocks,
                    });
                }
                let end = (start + block_size).min(stripe_buf.len());
                stripe_buf[start..end].to_vec()
            } else {
                self.stripe
                    .decode_block(&stripe_buf, stripe.raw_size as usize, intra_idx, stats)?
            };
            dst.write_all(&block)?;
            written += block.len() as u64;
        }

        stats.decompressed_total = written;
        Ok(drawn)
    }
}

/// Count the logical blocks of a container. Full stripes hold exactly
/// `number_of_blocks`; the last stripe's count depends on the strategy.
fn total_blocks(toc: &FileHeader, src: &mut File) -> Result<u64> {
    let Some(last) = toc.stripes.last() else {
        return Ok(0);
    };
    let block_size = toc.params.block_size as u64;
    let full = (toc.stripes.len() as u64 - 1) * toc.params.number_of_blocks as u64;
    let last_blocks = match toc.algorithm {
        Algorithm::Sbc => 1,
        Algorithm::Mbc => (last.raw_size as u64).div_ceil(block_size),
        Algorithm::Rac => {
            if last.is_verbatim() {
                (last.raw_size as u64).div_ceil(block_size)
            } else {
                // The authoritative count lives in the stripe's intra-header,
                // right after the inline dictionary.
                let stripe_at = FileHeader::body_base(toc.stripes.len()) + last.offset;
                src.seek(SeekFrom::Start(stripe_at))?;
                let mut word = [0u8; 4];
                src.read_exact(&mut word)?;
                let dict_size = i32::from_le_bytes(word);
                if dict_size < 0 || dict_size as u64 + 8 > last.compressed_size as u64 {
                    return Err(Error::Format(format!(
                        "implausible dictionary size {dict_size} in last stripe"
                    )));
                }
                src.seek(SeekFrom::Current(dict_size as i64))?;
                src.read_exact(&mut word)?;
                let n_blocks = i32::from_le_bytes(word);
                if n_blocks <= 0 || n_blocks as u64 > toc.params.number_of_blocks as u64 {
                    return Err(Error::Format(format!(
                        "implausible block count {n_blocks} in last stripe"
                    )));
                }
                n_blocks as u64
            }
        }
    };
    Ok(full + last_blocks)
}

/// Fill `buf` from `r`, stopping early only at EOF.
fn read_fill(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = r.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Seedable constant-parameter LCG, enough to scatter block draws
/// reproducibly across runs.
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_below(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}
