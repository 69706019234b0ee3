mod lz4;
mod rolling_kmer;
mod suffix_array;

pub use lz4::Lz4Codec;
pub use rolling_kmer::{CoverParams, RollingKmerTrainer};
pub use suffix_array::SuffixArrayTrainer;
