use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

use srac_codecs::{CoverParams, Lz4Codec, RollingKmerTrainer, SuffixArrayTrainer};
use srac_core::codec::DictTrainer;
use srac_core::format::{
    DEFAULT_BLOCK_SIZE, MBC_NUMBER_OF_BLOCKS, RAC_KMER_SIZE, RAC_MAX_DICT, RAC_NUMBER_OF_BLOCKS,
    RAC_SEGMENT_SIZE,
};
use srac_core::{Algorithm, CompressionParams, Container, Stats};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "srac",
    about = "Striped random-access compression: sequential and random-read benchmark driver",
    version
)]
struct Cli {
    /// Compression strategy under test
    #[arg(short = 't', long = "test", value_enum)]
    test: Strategy,

    /// Logical block size in bytes, the unit of random access
    #[arg(short = 'b', long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Blocks per stripe; defaults to the strategy's standard count
    /// (1 for sbc, 4 for mbc, 256 for rac)
    #[arg(short = 'n', long)]
    number_of_blocks: Option<u32>,

    /// Dictionary size cap in bytes; defaults to 4096 for rac, 0 otherwise
    #[arg(short = 'd', long)]
    max_dict: Option<u32>,

    /// K-mer length `d` for the rolling-kmer trainer; defaults to 8 for
    /// rac, 0 otherwise
    #[arg(short = 'k', long)]
    kmer_size: Option<u32>,

    /// Segment length `k` for the rolling-kmer trainer; defaults to 64 for
    /// rac, 0 otherwise
    #[arg(short = 's', long)]
    segment_size: Option<u32>,

    /// Operation to run against the input file
    #[arg(short = 'w', long, value_enum)]
    workload: Workload,

    #[arg(short = 'i', long)]
    input_file: PathBuf,

    #[arg(short = 'o', long)]
    output_file: PathBuf,

    /// Dictionary training algorithm (rac only)
    #[arg(short = 'a', long, value_enum, default_value = "rolling-kmer")]
    dictionary_algorithm: DictAlgorithm,

    /// RNG seed for the random-read workload, for reproducible draws
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Sbc,
    Mbc,
    Rac,
}

impl From<Strategy> for Algorithm {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Sbc => Algorithm::Sbc,
            Strategy::Mbc => Algorithm::Mbc,
            Strategy::Rac => Algorithm::Rac,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Workload {
    RandomRead,
    SequentialRead,
    SequentialWrite,
}

impl Workload {
    fn name(self) -> &'static str {
        match self {
            Workload::RandomRead => "random-read",
            Workload::SequentialRead => "sequential-read",
            Workload::SequentialWrite => "sequential-write",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DictAlgorithm {
    RollingKmer,
    SuffixArray,
}

impl DictAlgorithm {
    fn name(self) -> &'static str {
        match self {
            DictAlgorithm::RollingKmer => "rolling-kmer",
            DictAlgorithm::SuffixArray => "suffix-array",
        }
    }
}

impl Cli {
    /// Resolve the parameter block, filling any knob left unset with the
    /// chosen strategy's standard value so a bare `-t mbc` or `-t rac` is a
    /// valid run. Explicit flags always win.
    fn resolved_params(&self) -> CompressionParams {
        let algorithm = Algorithm::from(self.test);
        let number_of_blocks = self.number_of_blocks.unwrap_or(match algorithm {
            Algorithm::Sbc => 1,
            Algorithm::Mbc => MBC_NUMBER_OF_BLOCKS,
            Algorithm::Rac => RAC_NUMBER_OF_BLOCKS,
        });
        let rac = algorithm == Algorithm::Rac;
        CompressionParams {
            block_size: self.block_size,
            number_of_blocks,
            max_dict: self.max_dict.unwrap_or(if rac { RAC_MAX_DICT } else { 0 }),
            segment_size: self
                .segment_size
                .unwrap_or(if rac { RAC_SEGMENT_SIZE } else { 0 }),
            kmer_size: self.kmer_size.unwrap_or(if rac { RAC_KMER_SIZE } else { 0 }),
        }
    }
}

// ── Driver ─────────────────────────────────────────────────────────────────

fn trainer_for(cli: &Cli, params: &CompressionParams) -> Box<dyn DictTrainer> {
    match cli.dictionary_algorithm {
        DictAlgorithm::RollingKmer => Box::new(RollingKmerTrainer::new(CoverParams {
            segment_size: params.segment_size,
            kmer_size: params.kmer_size,
            ..CoverParams::default()
        })),
        DictAlgorithm::SuffixArray => Box::new(SuffixArrayTrainer),
    }
}

fn run(cli: &Cli, params: CompressionParams) -> anyhow::Result<Stats> {
    let algorithm = Algorithm::from(cli.test);
    params.validate_for(algorithm)?;

    let trainer = match algorithm {
        Algorithm::Rac => Some(trainer_for(cli, &params)),
        Algorithm::Sbc | Algorithm::Mbc => None,
    };
    let mut container = Container::new(algorithm, params, Box::new(Lz4Codec), trainer)?;
    let mut stats = Stats::default();

    match cli.workload {
        Workload::SequentialWrite => {
            container.compress_file(&cli.input_file, &cli.output_file, &mut stats)?;
            eprintln!(
                "compressed {} bytes into {} bytes",
                stats.raw_total, stats.compressed_total
            );
        }
        Workload::SequentialRead => {
            container.decompress_file(&cli.input_file, &cli.output_file, &mut stats)?;
            eprintln!(
                "decompressed {} bytes into {} bytes",
                stats.compressed_total, stats.decompressed_total
            );
        }
        Workload::RandomRead => {
            let drawn =
                container.decompress_blocks(&cli.input_file, &cli.output_file, cli.seed, &mut stats)?;
            eprintln!(
                "decoded {} random blocks ({} bytes, seed {})",
                drawn.len(),
                stats.decompressed_total,
                cli.seed
            );
        }
    }
    Ok(stats)
}

/// One CSV row per successful run, on stdout. Everything human-readable goes
/// to stderr instead.
fn print_csv(cli: &Cli, params: CompressionParams, stats: &Stats) {
    println!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        Algorithm::from(cli.test).name(),
        params.block_size,
        params.number_of_blocks,
        params.max_dict,
        params.kmer_size,
        params.segment_size,
        cli.workload.name(),
        cli.input_file.display(),
        cli.output_file.display(),
        stats.dict_time.as_secs_f64(),
        stats.compress_time.as_secs_f64(),
        stats.decompress_time.as_secs_f64(),
        stats.dict_total,
        stats.raw_total,
        stats.compressed_total,
        stats.decompressed_total,
        cli.dictionary_algorithm.name(),
    );
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage and help both go to stderr; only genuine parse failures
            // count as usage errors.
            eprint!("{err}");
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };
    let params = cli.resolved_params();
    match run(&cli, params) {
        Ok(stats) => {
            print_csv(&cli, params, &stats);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("srac: {err:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("srac").chain(args.iter().copied()))
    }

    #[test]
    fn full_rac_invocation_parses() {
        let cli = parse(&[
            "-t", "rac", "-b", "4096", "-n", "256", "-d", "4096", "-k", "8", "-s", "64", "-w",
            "sequential-write", "-i", "in.dat", "-o", "out.srac", "-a", "rolling-kmer",
        ])
        .unwrap();
        assert!(matches!(cli.test, Strategy::Rac));
        assert_eq!(cli.number_of_blocks, Some(256));
        assert_eq!(cli.workload, Workload::SequentialWrite);
        assert_eq!(cli.dictionary_algorithm, DictAlgorithm::RollingKmer);
        assert_eq!(cli.seed, 42);
    }

    #[test]
    fn minimal_sbc_invocation_is_valid() {
        let cli = parse(&["-t", "sbc", "-w", "sequential-write", "-i", "a", "-o", "b"]).unwrap();
        let params = cli.resolved_params();
        assert_eq!(params.number_of_blocks, 1);
        assert_eq!(params.max_dict, 0);
        assert!(params.validate_for(Algorithm::Sbc).is_ok());
    }

    #[test]
    fn minimal_mbc_invocation_uses_strategy_defaults() {
        let cli = parse(&["-t", "mbc", "-w", "sequential-write", "-i", "a", "-o", "b"]).unwrap();
        let params = cli.resolved_params();
        assert_eq!(params.number_of_blocks, MBC_NUMBER_OF_BLOCKS);
        assert_eq!(params.max_dict, 0);
        assert!(params.validate_for(Algorithm::Mbc).is_ok());
    }

    #[test]
    fn minimal_rac_invocation_uses_strategy_defaults() {
        let cli = parse(&["-t", "rac", "-w", "sequential-write", "-i", "a", "-o", "b"]).unwrap();
        let params = cli.resolved_params();
        assert_eq!(params.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(params.number_of_blocks, RAC_NUMBER_OF_BLOCKS);
        assert_eq!(params.max_dict, RAC_MAX_DICT);
        assert_eq!(params.segment_size, RAC_SEGMENT_SIZE);
        assert_eq!(params.kmer_size, RAC_KMER_SIZE);
        assert!(params.validate_for(Algorithm::Rac).is_ok());
    }

    #[test]
    fn explicit_flags_override_strategy_defaults() {
        let cli = parse(&[
            "-t", "rac", "-n", "64", "-d", "2048", "-w", "random-read", "-i", "a", "-o", "b",
        ])
        .unwrap();
        let params = cli.resolved_params();
        assert_eq!(params.number_of_blocks, 64);
        assert_eq!(params.max_dict, 2048);
        assert_eq!(params.segment_size, RAC_SEGMENT_SIZE);
        assert_eq!(params.kmer_size, RAC_KMER_SIZE);
    }

    #[test]
    fn workload_is_required() {
        let err = parse(&["-t", "sbc", "-i", "a", "-o", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn long_flags_parse() {
        let cli = parse(&[
            "--test",
            "mbc",
            "--block-size",
            "4096",
            "--number-of-blocks",
            "4",
            "--workload",
            "random-read",
            "--input-file",
            "a.srac",
            "--output-file",
            "b.raw",
            "--seed",
            "7",
        ])
        .unwrap();
        assert!(matches!(cli.test, Strategy::Mbc));
        assert_eq!(cli.seed, 7);
    }

    #[test]
    fn sbc_with_dict_params_fails_validation() {
        let params = CompressionParams {
            block_size: 4096,
            number_of_blocks: 1,
            max_dict: 4096,
            segment_size: 64,
            kmer_size: 8,
        };
        assert!(params.validate_for(Algorithm::Sbc).is_err());
    }
}
