use crate::error::Result;

/// Stateless bytes-to-bytes block compressor.
///
/// Implementations must not carry state across calls: every stripe (and, for
/// RAC, every block) is an independent unit, which is the invariant that
/// makes random access and parallel stripe decode possible.
pub trait BlockCodec {
    /// Codec name for diagnostics.
    fn name(&self) -> &'static str;

    /// Compress one unit. `dict`, when present, is the prefix dictionary
    /// shared by all blocks of the current stripe.
    fn compress(&self, raw: &[u8], dict: Option<&[u8]>) -> Result<Vec<u8>>;

    /// Decompress one unit whose original length was exactly `raw_len`.
    fn decompress(&self, compressed: &[u8], raw_len: usize, dict: Option<&[u8]>)
        -> Result<Vec<u8>>;
}

/// Produces a shared dictionary from the blocks of one stripe.
///
/// `samples` is the raw stripe; `sample_sizes` partitions it into blocks in
/// stripe order. The returned dictionary must be at most `max_dict` bytes.
pub trait DictTrainer {
    /// Trainer name for diagnostics.
    fn name(&self) -> &'static str;

    fn train(&self, samples: &[u8], sample_sizes: &[usize], max_dict: usize) -> Result<Vec<u8>>;
}
