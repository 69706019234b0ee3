use std::time::Duration;

/// Aggregate timings and byte totals for one driver run, accumulated by the
/// container and stripe codec and printed as a CSV row by the CLI.
///
/// Totals for an operation that returned an error are undefined.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Time spent training dictionaries (RAC encode only).
    pub dict_time: Duration,
    /// Time spent inside the block codec compressing.
    pub compress_time: Duration,
    /// Time spent inside the block codec decompressing.
    pub decompress_time: Duration,
    /// Sum of trained dictionary sizes across stripes.
    pub dict_total: u64,
    /// Input size of the compression workload.
    pub raw_total: u64,
    /// On-disk container size (output of encode, input of decode).
    pub compressed_total: u64,
    /// Bytes produced by the decompression workloads.
    pub decompressed_total: u64,
}
