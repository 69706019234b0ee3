use std::collections::{HashMap, HashSet};

use srac_core::codec::DictTrainer;
use srac_core::error::{Error, Result};
use srac_core::format::{RAC_KMER_SIZE, RAC_SEGMENT_SIZE};

/// Tuning knobs for the cover-style trainer, mirroring the classic COVER
/// parameter block.
#[derive(Debug, Clone, Copy)]
pub struct CoverParams {
    /// Segment length `k`: candidate dictionary fragments are this long.
    pub segment_size: u32,
    /// K-mer length `d`: the unit of coverage scoring. Must not exceed `k`.
    pub kmer_size: u32,
    /// Cap on the number of candidate segments considered during selection.
    pub steps: u32,
    /// Accepted for interface parity; training is single-threaded.
    pub threads: u32,
}

impl Default for CoverParams {
    fn default() -> Self {
        Self {
            segment_size: RAC_SEGMENT_SIZE,
            kmer_size: RAC_KMER_SIZE,
            steps: 1000,
            threads: 1,
        }
    }
}

/// Cover-style dictionary trainer.
///
/// Every sample is cut into aligned `k`-byte candidate segments, each scored
/// by the total frequency of the distinct `d`-byte k-mers it contains. The
/// dictionary is filled with the highest-scoring segments; k-mers already
/// covered by an earlier pick stop counting, so near-duplicate segments are
/// passed over in favor of fresh material. Selection is fully deterministic,
/// with ties broken toward the earliest position in the stripe.
pub struct RollingKmerTrainer {
    params: CoverParams,
}

struct Candidate {
    start: usize,
    score: u64,
    kmers: Vec<u64>,
}

/// FNV-1a over one k-mer window. A collision merely blurs two k-mers'
/// counts; it cannot affect correctness of the trained dictionary.
fn kmer_key(window: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &byte in window {
        hash = (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

impl RollingKmerTrainer {
    pub fn new(params: CoverParams) -> Self {
        Self { params }
    }
}

impl DictTrainer for RollingKmerTrainer {
    fn name(&self) -> &'static str {
        "rolling-kmer"
    }

    fn train(&self, samples: &[u8], sample_sizes: &[usize], max_dict: usize) -> Result<Vec<u8>> {
        let k = self.params.segment_size as usize;
        let d = self.params.kmer_size as usize;
        if k == 0 || d == 0 || d > k {
            return Err(Error::InvalidParams(format!(
                "cover trainer requires 0 < d <= k, got k={k} d={d}"
            )));
        }
        if sample_sizes.iter().sum::<usize>() != samples.len() {
            return Err(Error::InvalidParams(
                "sample sizes do not sum to the sample buffer".into(),
            ));
        }
        if max_dict == 0 || samples.len() < k {
            return Ok(Vec::new());
        }

        let mut bounds = Vec::with_capacity(sample_sizes.len());
        let mut at = 0usize;
        for &len in sample_sizes {
            bounds.push((at, at + len));
            at += len;
        }

        // K-mer frequencies across all samples. A k-mer never spans two
        // samples: matches the codec, which also sees blocks in isolation.
        let mut freq: HashMap<u64, u32> = HashMap::new();
        for &(lo, hi) in &bounds {
            for window in samples[lo..hi].windows(d) {
                *freq.entry(kmer_key(window)).or_insert(0) += 1;
            }
        }

        // Score aligned candidate segments.
        let mut candidates: Vec<Candidate> = Vec::new();
        for &(lo, hi) in &bounds {
            let sample = &samples[lo..hi];
            let mut pos = 0usize;
            while pos + k <= sample.len() {
                let mut kmers: Vec<u64> =
                    sample[pos..pos + k].windows(d).map(kmer_key).collect();
                kmers.sort_unstable();
                kmers.dedup();
                let score = kmers.iter().map(|key| freq[key] as u64).sum();
                candidates.push(Candidate {
                    start: lo + pos,
                    score,
                    kmers,
                });
                pos += k;
            }
        }
        candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.start.cmp(&b.start)));

        let mut dict = Vec::with_capacity(max_dict);
        let mut covered: HashSet<u64> = HashSet::new();
        for candidate in candidates.iter().take(self.params.steps.max(1) as usize) {
            if dict.len() >= max_dict {
                break;
            }
            let fresh: u64 = candidate
                .kmers
                .iter()
                .filter(|key| !covered.contains(*key))
                .map(|key| freq[key] as u64)
                .sum();
            if fresh == 0 && !dict.is_empty() {
                continue;
            }
            let take = k.min(max_dict - dict.len());
            dict.extend_from_slice(&samples[candidate.start..candidate.start + take]);
            covered.extend(candidate.kmers.iter().copied());
        }
        Ok(dict)
    }
}
