use crate::error::{Error, Result};
use std::io::{Read, Write};

/// Magic region at the start of the header: 3 strategy bytes ('SBC', 'MBC'
/// or 'RAC') followed by 5 zeroed padding bytes.
pub const MAGIC_REGION_SIZE: usize = 8;

/// Serialized [`CompressionParams`]: five i32 fields.
pub const PARAMS_SIZE: usize = 20;

/// Serialized [`StripeHeader`]: offset i64 + raw i32 + compressed i32.
pub const STRIPE_HEADER_SIZE: usize = 16;

/// Serialized intra-stripe [`BlockEntry`] (RAC stripes only): three i32.
pub const BLOCK_ENTRY_SIZE: usize = 12;

/// Default logical block size in bytes, the unit of random access.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Default blocks per stripe for MBC.
pub const MBC_NUMBER_OF_BLOCKS: u32 = 4;

/// Default blocks per stripe for RAC.
pub const RAC_NUMBER_OF_BLOCKS: u32 = 256;

/// Default dictionary size cap in bytes for RAC stripes.
pub const RAC_MAX_DICT: u32 = 4096;

/// Default cover trainer segment length `k` for RAC.
pub const RAC_SEGMENT_SIZE: u32 = 64;

/// Default cover trainer k-mer length `d` for RAC.
pub const RAC_KMER_SIZE: u32 = 8;

/// Floor for the streaming I/O buffers; rounded up to a whole number of
/// stripes at run time.
pub const BUFFER_SIZE: usize = 1 << 20;

/// Upper bound accepted for the leading `header_size` field before the
/// stripe count has been cross-checked.
const MAX_HEADER_SIZE: usize = 1 << 30;

pub(crate) fn le_i32(buf: &[u8], at: usize) -> i32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    i32::from_le_bytes(b)
}

pub(crate) fn le_i64(buf: &[u8], at: usize) -> i64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    i64::from_le_bytes(b)
}

// ── Strategy ───────────────────────────────────────────────────────────────

/// The three container strategies. Closed set, dispatched by `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Single-block compression: every block is its own stripe.
    Sbc,
    /// Multi-block compression: a stripe of N blocks is one codec unit.
    Mbc,
    /// Random-access compression: N blocks sharing a trained dictionary,
    /// each block independently decodable.
    Rac,
}

impl Algorithm {
    pub fn magic(self) -> &'static [u8; 3] {
        match self {
            Algorithm::Sbc => b"SBC",
            Algorithm::Mbc => b"MBC",
            Algorithm::Rac => b"RAC",
        }
    }

    pub fn from_magic(magic: &[u8]) -> Result<Self> {
        match magic {
            b"SBC" => Ok(Algorithm::Sbc),
            b"MBC" => Ok(Algorithm::Mbc),
            b"RAC" => Ok(Algorithm::Rac),
            other => Err(Error::Format(format!(
                "unknown magic {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sbc => "sbc",
            Algorithm::Mbc => "mbc",
            Algorithm::Rac => "rac",
        }
    }
}

// ── Compression parameters ─────────────────────────────────────────────────

/// Per-file configuration, frozen at container creation and stored in the
/// header. All fields are serialized as i32, so values must fit in 31 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    /// Raw bytes per block (the last block of the last stripe may be short).
    pub block_size: u32,
    /// Blocks per stripe. 1 for SBC, >1 for MBC and RAC.
    pub number_of_blocks: u32,
    /// Dictionary size cap for RAC stripes; 0 for SBC/MBC.
    pub max_dict: u32,
    /// Cover trainer segment length `k`; 0 for SBC/MBC.
    pub segment_size: u32,
    /// Cover trainer k-mer length `d`; 0 for SBC/MBC.
    pub kmer_size: u32,
}

impl CompressionParams {
    /// Raw bytes per full stripe.
    pub fn stripe_size(&self) -> usize {
        self.block_size as usize * self.number_of_blocks as usize
    }

    /// Check this combination against the chosen strategy.
    pub fn validate_for(&self, algorithm: Algorithm) -> Result<()> {
        let fields = [
            ("block-size", self.block_size),
            ("number-of-blocks", self.number_of_blocks),
            ("max-dict", self.max_dict),
            ("segment-size", self.segment_size),
            ("kmer-size", self.kmer_size),
        ];
        for (name, value) in fields {
            if value > i32::MAX as u32 {
                return Err(Error::InvalidParams(format!(
                    "{name} {value} does not fit the on-disk i32 field"
                )));
            }
        }
        if self.block_size == 0 {
            return Err(Error::InvalidParams("block size must be positive".into()));
        }
        if self.block_size as u64 * self.number_of_blocks as u64 > i32::MAX as u64 {
            return Err(Error::InvalidParams(format!(
                "stripe size {} x {} exceeds the i32 stripe bound",
                self.block_size, self.number_of_blocks
            )));
        }
        let dict_params = self.max_dict > 0 || self.segment_size > 0 || self.kmer_size > 0;
        match algorithm {
            Algorithm::Sbc => {
                if self.number_of_blocks != 1 {
                    return Err(Error::InvalidParams(
                        "sbc requires exactly one block per stripe".into(),
                    ));
                }
                if dict_params {
                    return Err(Error::InvalidParams(
                        "sbc takes no dictionary parameters (max-dict, segment-size, kmer-size must be 0)".into(),
                    ));
                }
            }
            Algorithm::Mbc => {
                if self.number_of_blocks <= 1 {
                    return Err(Error::InvalidParams(
                        "mbc requires more than one block per stripe".into(),
                    ));
                }
                if dict_params {
                    return Err(Error::InvalidParams(
                        "mbc takes no dictionary parameters (max-dict, segment-size, kmer-size must be 0)".into(),
                    ));
                }
            }
            Algorithm::Rac => {
                if self.number_of_blocks <= 1 {
                    return Err(Error::InvalidParams(
                        "rac requires more than one block per stripe".into(),
                    ));
                }
                if self.max_dict == 0 || self.segment_size == 0 || self.kmer_size == 0 {
                    return Err(Error::InvalidParams(
                        "rac requires max-dict, segment-size and kmer-size to be positive".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Serialize to exactly [`PARAMS_SIZE`] bytes.
    pub fn to_bytes(&self) -> [u8; PARAMS_SIZE] {
        let mut buf = [0u8; PARAMS_SIZE];
        buf[0..4].copy_from_slice(&(self.block_size as i32).to_le_bytes());
        buf[4..8].copy_from_slice(&(self.number_of_blocks as i32).to_le_bytes());
        buf[8..12].copy_from_slice(&(self.max_dict as i32).to_le_bytes());
        buf[12..16].copy_from_slice(&(self.segment_size as i32).to_le_bytes());
        buf[16..20].copy_from_slice(&(self.kmer_size as i32).to_le_bytes());
        buf
    }

    /// Deserialize from [`PARAMS_SIZE`] bytes, rejecting negative fields.
    pub fn from_bytes(buf: &[u8; PARAMS_SIZE]) -> Result<Self> {
        let field = |at: usize, name: &str| -> Result<u32> {
            let v = le_i32(buf, at);
            if v < 0 {
                return Err(Error::Format(format!("negative {name} {v} in header")));
            }
            Ok(v as u32)
        };
        Ok(Self {
            block_size: field(0, "block size")?,
            number_of_blocks: field(4, "block count")?,
            max_dict: field(8, "dictionary cap")?,
            segment_size: field(12, "segment size")?,
            kmer_size: field(16, "k-mer size")?,
        })
    }
}

// ── Stripe index entry ─────────────────────────────────────────────────────

/// One entry of the file-level stripe index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripeHeader {
    /// Offset of this stripe's compressed bytes, relative to the body start
    /// (the first byte after the file header).
    pub offset: u64,
    /// Raw stripe length in bytes.
    pub raw_size: u32,
    /// Compressed stripe length in bytes. Equal to `raw_size` when the
    /// stripe is stored verbatim.
    pub compressed_size: u32,
}

impl StripeHeader {
    /// An incompressible stripe stored as-is.
    pub fn is_verbatim(&self) -> bool {
        self.compressed_size == self.raw_size
    }

    /// Serialize to exactly [`STRIPE_HEADER_SIZE`] bytes.
    pub fn to_bytes(&self) -> [u8; STRIPE_HEADER_SIZE] {
        let mut buf = [0u8; STRIPE_HEADER_SIZE];
        buf[0..8].copy_from_slice(&(self.offset as i64).to_le_bytes());
        buf[8..12].copy_from_slice(&(self.raw_size as i32).to_le_bytes());
        buf[12..16].copy_from_slice(&(self.compressed_size as i32).to_le_bytes());
        buf
    }

    /// Deserialize from [`STRIPE_HEADER_SIZE`] bytes.
    pub fn from_bytes(buf: &[u8; STRIPE_HEADER_SIZE]) -> Result<Self> {
        let offset = le_i64(buf, 0);
        let raw_size = le_i32(buf, 8);
        let compressed_size = le_i32(buf, 12);
        if offset < 0 || raw_size < 0 || compressed_size < 0 {
            return Err(Error::Format(format!(
                "negative field in stripe header (offset {offset}, raw {raw_size}, compressed {compressed_size})"
            )));
        }
        Ok(Self {
            offset: offset as u64,
            raw_size: raw_size as u32,
            compressed_size: compressed_size as u32,
        })
    }
}

// ── Intra-stripe block entry (RAC) ─────────────────────────────────────────

/// Locates one compressed block inside a RAC stripe. Offsets are relative to
/// the stripe's payload area, after the inline dictionary and this index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockEntry {
    pub offset: u32,
    pub raw_size: u32,
    /// Equal to `raw_size` when the block is stored verbatim.
    pub compressed_size: u32,
}

impl BlockEntry {
    pub fn is_verbatim(&self) -> bool {
        self.compressed_size == self.raw_size
    }

    /// Serialize to exactly [`BLOCK_ENTRY_SIZE`] bytes.
    pub fn to_bytes(&self) -> [u8; BLOCK_ENTRY_SIZE] {
        let mut buf = [0u8; BLOCK_ENTRY_SIZE];
        buf[0..4].copy_from_slice(&(self.offset as i32).to_le_bytes());
        buf[4..8].copy_from_slice(&(self.raw_size as i32).to_le_bytes());
        buf[8..12].copy_from_slice(&(self.compressed_size as i32).to_le_bytes());
        buf
    }

    /// Deserialize from [`BLOCK_ENTRY_SIZE`] bytes.
    pub fn from_bytes(buf: &[u8; BLOCK_ENTRY_SIZE]) -> Result<Self> {
        let offset = le_i32(buf, 0);
        let raw_size = le_i32(buf, 4);
        let compressed_size = le_i32(buf, 8);
        if offset < 0 || raw_size < 0 || compressed_size < 0 {
            return Err(Error::Format(format!(
                "negative field in block entry (offset {offset}, raw {raw_size}, compressed {compressed_size})"
            )));
        }
        Ok(Self {
            offset: offset as u32,
            raw_size: raw_size as u32,
            compressed_size: compressed_size as u32,
        })
    }
}

// ── File header ────────────────────────────────────────────────────────────

/// Decoded file-level header: strategy, parameters, and the stripe index.
///
/// On disk the header is preceded by a 4-byte `header_size` field counting
/// every byte after itself up to the start of the body:
///
/// ```text
/// [header_size: i32]
/// [magic: 3 bytes + 5 zero bytes]
/// [CompressionParams: 20 bytes]
/// [n_stripes: i32]
/// [StripeHeader x n_stripes]
/// [body: concatenated compressed stripes]
/// ```
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub algorithm: Algorithm,
    pub params: CompressionParams,
    pub stripes: Vec<StripeHeader>,
}

impl FileHeader {
    /// Byte count covered by the leading `header_size` field.
    pub fn encoded_len(n_stripes: usize) -> usize {
        MAGIC_REGION_SIZE + PARAMS_SIZE + 4 + n_stripes * STRIPE_HEADER_SIZE
    }

    /// Absolute file offset of the body for a container of `n_stripes`.
    pub fn body_base(n_stripes: usize) -> u64 {
        4 + Self::encoded_len(n_stripes) as u64
    }

    /// Write the full header, `header_size` field included.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let encoded = Self::encoded_len(self.stripes.len());
        w.write_all(&(encoded as i32).to_le_bytes())?;
        let mut magic = [0u8; MAGIC_REGION_SIZE];
        magic[..3].copy_from_slice(self.algorithm.magic());
        w.write_all(&magic)?;
        w.write_all(&self.params.to_bytes())?;
        w.write_all(&(self.stripes.len() as i32).to_le_bytes())?;
        for stripe in &self.stripes {
            w.write_all(&stripe.to_bytes())?;
        }
        Ok(())
    }

    /// Read and validate the full header, leaving `r` positioned at the body.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut len_buf = [0u8; 4];
        r.read_exact(&mut len_buf)?;
        let header_size = i32::from_le_bytes(len_buf);
        let min = Self::encoded_len(0);
        if header_size < min as i32 || header_size as usize > MAX_HEADER_SIZE {
            return Err(Error::Format(format!(
                "implausible header size {header_size}"
            )));
        }
        let mut hdr = vec![0u8; header_size as usize];
        r.read_exact(&mut hdr)?;

        let algorithm = Algorithm::from_magic(&hdr[..3])?;
        let mut params_buf = [0u8; PARAMS_SIZE];
        params_buf.copy_from_slice(&hdr[MAGIC_REGION_SIZE..MAGIC_REGION_SIZE + PARAMS_SIZE]);
        let params = CompressionParams::from_bytes(&params_buf)?;
        params
            .validate_for(algorithm)
            .map_err(|e| Error::Format(format!("header parameters invalid: {e}")))?;

        let n_stripes = le_i32(&hdr, MAGIC_REGION_SIZE + PARAMS_SIZE);
        if n_stripes < 0 {
            return Err(Error::Format(format!("negative stripe count {n_stripes}")));
        }
        let n_stripes = n_stripes as usize;
        if Self::encoded_len(n_stripes) != header_size as usize {
            return Err(Error::Format(format!(
                "header size {header_size} disagrees with stripe count {n_stripes}"
            )));
        }

        let mut stripes = Vec::with_capacity(n_stripes);
        let mut entry = [0u8; STRIPE_HEADER_SIZE];
        let mut at = MAGIC_REGION_SIZE + PARAMS_SIZE + 4;
        for _ in 0..n_stripes {
            entry.copy_from_slice(&hdr[at..at + STRIPE_HEADER_SIZE]);
            stripes.push(StripeHeader::from_bytes(&entry)?);
            at += STRIPE_HEADER_SIZE;
        }

        // Offsets must be the running sum of compressed sizes, and stripes
        // must never claim more than the stripe size worth of raw bytes.
        let stripe_size = params.stripe_size() as u64;
        let mut expected = 0u64;
        for (i, stripe) in stripes.iter().enumerate() {
            if stripe.offset != expected {
                return Err(Error::Format(format!(
                    "stripe {i} offset {} disagrees with running total {expected}",
                    stripe.offset
                )));
            }
            if stripe.raw_size == 0 || stripe.raw_size as u64 > stripe_size {
                return Err(Error::Format(format!(
                    "stripe {i} raw size {} outside (0, {stripe_size}]",
                    stripe.raw_size
                )));
            }
            expected = expected
                .checked_add(stripe.compressed_size as u64)
                .filter(|total| *total <= i64::MAX as u64)
                .ok_or_else(|| {
                    Error::Format("stripe offsets overflow the on-disk index".into())
                })?;
        }

        Ok(Self {
            algorithm,
            params,
            stripes,
        })
    }

    /// Total compressed body length declared by the stripe index.
    pub fn body_len(&self) -> u64 {
        self.stripes
            .iter()
            .map(|s| s.compressed_size as u64)
            .sum()
    }

    /// Total raw length declared by the stripe index.
    pub fn raw_len(&self) -> u64 {
        self.stripes.iter().map(|s| s.raw_size as u64).sum()
    }
}
