use srac_core::codec::DictTrainer;
use srac_core::error::{Error, Result};

/// Legacy trainer, delegating to zstd's ZDICT builder
/// (`zstd::dict::from_continuous`), the suffix-array lineage of dictionary
/// construction.
///
/// The produced blob is handed to the LZ4 codec as a plain prefix
/// dictionary. ZDICT places the highest-value content at the tail of the
/// blob, which is exactly where an LZ4 prefix dictionary wants it; the
/// entropy tables at the front merely act as low-value prefix bytes.
pub struct SuffixArrayTrainer;

impl DictTrainer for SuffixArrayTrainer {
    fn name(&self) -> &'static str {
        "suffix-array"
    }

    fn train(&self, samples: &[u8], sample_sizes: &[usize], max_dict: usize) -> Result<Vec<u8>> {
        if sample_sizes.iter().sum::<usize>() != samples.len() {
            return Err(Error::InvalidParams(
                "sample sizes do not sum to the sample buffer".into(),
            ));
        }
        let dict = zstd::dict::from_continuous(samples, sample_sizes, max_dict)
            .map_err(|e| Error::Codec(format!("zdict: {e}")))?;
        if dict.len() > max_dict {
            return Err(Error::Codec(format!(
                "zdict produced {} bytes, cap was {max_dict}",
                dict.len()
            )));
        }
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = seed;
        (0..len)
            .map(|_| {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                b'a' + ((rng >> 56) % 26) as u8
            })
            .collect()
    }

    #[test]
    fn trains_on_templated_blocks() {
        let template = b"level=INFO msg=\"request served\" route=/v1/objects status=200 ";
        let block = 4096usize;
        let n_blocks = 128usize;
        let mut samples = Vec::with_capacity(block * n_blocks);
        for i in 0..n_blocks {
            let noise = lcg_bytes(32, i as u64 + 1);
            let mut cur = noise;
            while cur.len() < block {
                let take = template.len().min(block - cur.len());
                cur.extend_from_slice(&template[..take]);
            }
            samples.extend_from_slice(&cur);
        }
        let sizes = vec![block; n_blocks];

        let dict = SuffixArrayTrainer.train(&samples, &sizes, 4096).unwrap();
        assert!(!dict.is_empty());
        assert!(dict.len() <= 4096);
    }

    #[test]
    fn mismatched_sizes_rejected() {
        let err = SuffixArrayTrainer.train(b"abcdef", &[2, 2], 64);
        assert!(matches!(err, Err(Error::InvalidParams(_))));
    }
}
