use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sfxidx::config::{BuildOptions, MapConfig};
use sfxidx::index::{self, IndexReader, ReadMode, TableKind, TableSet, Trials};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sfxidx")]
#[command(about = "Build and verify suffix array indexes of sequence collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise the log level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from sequence files or an existing index
    Build(BuildArgs),
    /// Map the tables of an index and check their consistency
    Map(MapArgs),
    /// Show the project metadata of an index
    Stats {
        /// Index name
        index_name: PathBuf,
    },
}

/// Table selection shared by build and map
#[derive(Args, Default)]
struct TableFlags {
    /// Encoded sequence
    #[arg(long)]
    tis: bool,
    /// Suffix table
    #[arg(long)]
    suf: bool,
    /// Longest common prefix table
    #[arg(long)]
    lcp: bool,
    /// Burrows-Wheeler transform
    #[arg(long)]
    bwt: bool,
    /// Bucket-boundary table
    #[arg(long)]
    bck: bool,
    /// Sequence descriptions
    #[arg(long)]
    des: bool,
    /// Description end offsets
    #[arg(long)]
    sds: bool,
    /// Separator positions
    #[arg(long)]
    ssp: bool,
}

impl TableFlags {
    fn selected(&self) -> TableSet {
        [
            (self.tis, TableKind::Tis),
            (self.suf, TableKind::Suf),
            (self.lcp, TableKind::Lcp),
            (self.bwt, TableKind::Bwt),
            (self.bck, TableKind::Bck),
            (self.des, TableKind::Des),
            (self.sds, TableKind::Sds),
            (self.ssp, TableKind::Ssp),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect()
    }
}

#[derive(Args)]
struct BuildArgs {
    /// Sequence files (FASTA, FASTQ, EMBL or GenBank), concatenated in order
    inputs: Vec<PathBuf>,

    /// Index name (default: file name of the single input)
    #[arg(long = "indexname")]
    index_name: Option<PathBuf>,

    /// Build from the encoded sequence of an existing index
    #[arg(long = "input-index", value_name = "NAME")]
    input_index: Option<PathBuf>,

    /// Input is DNA
    #[arg(long)]
    dna: bool,

    /// Input is protein
    #[arg(long)]
    protein: bool,

    /// Translation table (TransDNA, TransProt11 or an smap file)
    #[arg(long, value_name = "NAME")]
    smap: Option<String>,

    /// Satellite: direct, bytecompress, eqlen, bit, uchar, ushort or uint32
    #[arg(long)]
    sat: Option<String>,

    /// Number of partitions of the prefix-code space
    #[arg(long)]
    parts: Option<usize>,

    /// Scan direction: fwd, rev, cpl or rcl
    #[arg(long)]
    dir: Option<String>,

    /// Prefix length (automatic without a value)
    #[arg(long = "pl", num_args = 0..=1, value_name = "K")]
    prefix_length: Option<Option<u32>>,

    /// Bucket bounds: insertion sort, comparison sort and radix depth limits
    #[arg(long, num_args = 3, value_names = ["LOW", "HIGH", "MAX"])]
    algbds: Option<Vec<u64>>,

    /// Difference-cover modulus (power of two)
    #[arg(long, value_name = "V")]
    dc: Option<u32>,

    /// Sort by prefix doubling
    #[arg(long)]
    maxdepth: bool,

    /// Compare one symbol at a time
    #[arg(long)]
    cmpcharbychar: bool,

    /// Keep prefixes containing special symbols in the counting sort
    #[arg(long)]
    storespecialcodes: bool,

    /// Worker threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Show progress bars
    #[arg(long)]
    progress: bool,

    /// JSON file with base options; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    tables: TableFlags,
}

impl BuildArgs {
    fn options(&self) -> BuildOptions {
        let flag = |on: bool| on.then_some(true);
        let tables = self.tables.selected();
        BuildOptions {
            inputs: self.inputs.clone(),
            index_name: self.index_name.clone(),
            input_index: self.input_index.clone(),
            dna: flag(self.dna),
            protein: flag(self.protein),
            smap: self.smap.clone(),
            sat: self.sat.clone(),
            parts: self.parts,
            dir: self.dir.clone(),
            prefix_length: self.prefix_length.flatten(),
            algbds: self.algbds.clone(),
            dc: self.dc,
            maxdepth: flag(self.maxdepth),
            cmpcharbychar: flag(self.cmpcharbychar),
            storespecialcodes: flag(self.storespecialcodes),
            threads: self.threads,
            tables: (!tables.is_empty()).then_some(tables),
            progress: flag(self.progress),
        }
    }
}

#[derive(Args)]
struct MapArgs {
    /// Index name
    index_name: PathBuf,

    /// Read tables sequentially instead of memory-mapping them
    #[arg(long)]
    stream: bool,

    /// Random positions checked against a sequential scan
    #[arg(long, default_value_t = 0, value_name = "N")]
    scantrials: u64,

    /// Random suffix pairs compared block-wise and char by char
    #[arg(long, default_value_t = 0, value_name = "N")]
    multicharcmptrials: u64,

    #[command(flatten)]
    tables: TableFlags,
}

impl MapArgs {
    fn config(&self) -> MapConfig {
        MapConfig {
            index_name: self.index_name.clone(),
            tables: self.tables.selected(),
            mode: if self.stream { ReadMode::Stream } else { ReadMode::Mapped },
            scan_trials: self.scantrials,
            multichar_cmp_trials: self.multicharcmptrials,
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build(args) => {
            let options = match &args.config {
                Some(path) => BuildOptions::load(path)?.merge(args.options()),
                None => args.options(),
            };
            let config = options.validate()?;
            let summary = index::build_index(&config)?;
            println!(
                "{}: {} sequences, {} symbols, {} satellite, prefix length {}, tables [{}] in {:.2?}",
                summary.index_name.display(),
                summary.num_sequences,
                summary.total_length,
                summary.satellite,
                summary.prefix_length,
                summary.tables,
                summary.elapsed
            );
        }
        Commands::Map(args) => {
            let config = args.config();
            let reader = IndexReader::open(&config.index_name, config.tables, config.mode)?;
            let report = reader.verify(Trials {
                scan: config.scan_trials,
                multichar_cmp: config.multichar_cmp_trials,
            })?;
            for line in report {
                println!("{}", line);
            }
        }
        Commands::Stats { index_name } => {
            index::stats::show_stats(&index_name)?;
        }
    }

    Ok(())
}
