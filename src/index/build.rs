//! Index construction pipeline.
//!
//! Reads the input (sequence files or the encoded sequence of an existing
//! index), chooses and builds the satellite, sorts the suffixes when a table
//! needs them and hands every selected table to the [`IndexWriter`]. All of
//! it runs inside a rayon pool sized by `threads`.

use crate::alphabet::Alphabet;
use crate::config::{resolve_prefix_length, BuildConfig, BuildInput};
use crate::encseq::{encode_text, Direction, EncodedSequence, SatelliteKind, TextStats};
use crate::error::{Error, Result, Violations};
use crate::index::reader::{IndexReader, ReadMode};
use crate::index::suffix_array::{DerivedTables, SortConfig, SuffixArrayBuilder};
use crate::index::types::*;
use crate::index::writer::IndexWriter;
use crate::sequence::{FileInfo, SequenceCollection};
use crate::utils::progress::phase_spinner;
use crate::utils::{entry_width_for, format_size};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// What a finished build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub index_name: PathBuf,
    pub total_length: u64,
    pub num_sequences: u64,
    pub satellite: SatelliteKind,
    pub prefix_length: u32,
    pub tables: TableSet,
    pub elapsed: Duration,
}

/// Text of a build before satellite encoding
struct Source {
    codes: Vec<u8>,
    alphabet: Alphabet,
    descriptions: Vec<String>,
    files: Vec<FileInfo>,
    /// Satellite of the input index, kept unless another one is requested
    satellite: Option<SatelliteKind>,
}

impl Source {
    fn from_files(paths: &[PathBuf], config: &BuildConfig) -> Result<Self> {
        let spinner = phase_spinner("reading sequences", config.sort.show_progress);
        let collection = SequenceCollection::read(paths)?;
        collection.ensure_not_empty()?;
        let alphabet = config.alphabet.resolve(&collection)?;
        let codes = encode_text(&collection, &alphabet)?;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        log::info!(
            "read {} sequences ({} residues) from {} files",
            collection.num_sequences(),
            collection.num_residues(),
            collection.files().len()
        );
        Ok(Self {
            codes,
            alphabet,
            descriptions: collection.descriptions().to_vec(),
            files: collection.files().to_vec(),
            satellite: None,
        })
    }

    fn from_index(index_name: &Path, config: &BuildConfig) -> Result<Self> {
        let mut tables = TableSet::new();
        tables.insert(TableKind::Tis);
        if config.tables.contains(TableKind::Des) || config.tables.contains(TableKind::Sds) {
            tables.insert(TableKind::Des);
        }
        let reader = IndexReader::open(index_name, tables, ReadMode::Stream)?;
        let project = reader.project();
        let alphabet = Alphabet::from_spec(project.alphabet.clone())?;
        let encoded = reader
            .encoded()
            .ok_or_else(|| Error::corrupt(index_name, "encoded sequence was not loaded"))?;
        log::info!(
            "read encoded sequence of {} ({} symbols, {} satellite)",
            index_name.display(),
            encoded.total_length(),
            encoded.kind()
        );
        Ok(Self {
            codes: encoded.decode(0..encoded.total_length()),
            alphabet,
            descriptions: reader.descriptions().unwrap_or_default(),
            files: project.files.clone(),
            satellite: Some(project.satellite),
        })
    }
}

/// Build the index described by `config`
pub fn build_index(config: &BuildConfig) -> Result<BuildSummary> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| Error::configuration(format!("cannot start {} worker threads: {}", config.threads, e)))?;
    log::debug!("using {} worker threads", pool.current_num_threads());
    pool.install(|| build_in_pool(config))
}

fn build_in_pool(config: &BuildConfig) -> Result<BuildSummary> {
    let start = Instant::now();
    let mut writer = IndexWriter::create(&config.index_name)?;

    let source = match &config.input {
        BuildInput::Files(paths) => Source::from_files(paths, config)?,
        BuildInput::Index(index_name) => Source::from_index(index_name, config)?,
    };
    let alphabet = &source.alphabet;
    let stats = TextStats::collect(&source.codes, alphabet.num_chars());

    let satellite = config
        .satellite
        .or(source.satellite)
        .unwrap_or_else(|| stats.choose(alphabet));
    let mut violations = stats.violations(satellite, alphabet);
    check_direction(config.direction, alphabet, &mut violations);
    let prefix_length = resolve_prefix_length(config.prefix_length, alphabet.num_chars(), stats.total_length);
    if let Err(Error::Configuration(found)) = &prefix_length {
        violations.extend(found.clone());
    }
    violations.into_result()?;
    let prefix_length = prefix_length?;
    let sort = SortConfig {
        prefix_length,
        ..config.sort.clone()
    };

    let encoded = EncodedSequence::encode(source.codes, &stats, satellite);
    log::info!(
        "init character encoding ({}, {} bytes)",
        satellite,
        encoded.size_in_bytes()
    );

    let suffix_width = entry_width_for(stats.total_length);
    let suffix_array = if config.tables.needs_suffix_array() {
        Some(SuffixArrayBuilder::new(sort.clone()).build(&encoded, config.direction)?)
    } else {
        None
    };
    let derived = match &suffix_array {
        Some(built) => {
            let spinner = phase_spinner("computing derived tables", sort.show_progress);
            let derived = DerivedTables::compute(&encoded, built, config.tables.derived());
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            derived
        }
        None => DerivedTables::default(),
    };

    if config.tables.is_empty() {
        log::warn!("no tables selected, writing the project file only");
    }
    for kind in config.tables.iter() {
        match kind {
            TableKind::Tis => writer.write_encoded(&encoded)?,
            TableKind::Suf => {
                if let Some(built) = &suffix_array {
                    writer.write_suffixes(&built.suffixes, suffix_width)?;
                }
            }
            TableKind::Lcp => {
                if let Some(lcp) = &derived.lcp {
                    writer.write_lcp(lcp)?;
                }
            }
            TableKind::Bwt => {
                if let Some(bwt) = &derived.bwt {
                    writer.write_bwt(bwt)?;
                }
            }
            TableKind::Bck => {
                if let Some(buckets) = &derived.buckets {
                    writer.write_buckets(buckets, suffix_width)?;
                }
            }
            TableKind::Des => writer.write_descriptions(&source.descriptions)?,
            TableKind::Sds => writer.write_description_ends(&source.descriptions)?,
            TableKind::Ssp => writer.write_separators(&stats.separators, suffix_width)?,
        }
    }

    let num_sequences = stats.separators.len() as u64 + 1;
    let project = IndexProject {
        version: INDEX_VERSION,
        build_id: writer.build_id(),
        total_length: stats.total_length,
        num_sequences,
        num_residues: stats.total_length - stats.separators.len() as u64,
        files: source.files,
        alphabet: alphabet.spec().clone(),
        satellite,
        direction: config.direction,
        prefix_length,
        strategy: sort.strategy,
        parts: sort.parts,
        tables: writer.written(),
        equal_length: stats.equal_length,
        wildcards: stats.wildcards,
        special_ranges: stats.special_ranges.len() as u64,
        character_distribution: stats.distribution.clone(),
        suffix_width: suffix_width as u32,
        created_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    };
    let tables = writer.written();
    writer.commit(&project)?;

    let elapsed = start.elapsed();
    log::info!(
        "built {} ({} symbols, {} tables, {}) in {:.2?}",
        config.index_name.display(),
        stats.total_length,
        tables,
        format_size(encoded.size_in_bytes()),
        elapsed
    );
    Ok(BuildSummary {
        index_name: config.index_name.clone(),
        total_length: stats.total_length,
        num_sequences,
        satellite,
        prefix_length,
        tables,
        elapsed,
    })
}

fn check_direction(direction: Direction, alphabet: &Alphabet, violations: &mut Violations) {
    if direction.is_complement() && !alphabet.is_dna() {
        violations.push(format!("direction {} requires a DNA alphabet", direction));
    }
}
