//! Build and map configuration.
//!
//! [`BuildOptions`] is the raw, partially specified form: it is read from a
//! JSON file (`--config`) and from command-line flags, the latter taking
//! precedence. [`BuildOptions::validate`] checks every constraint between
//! options at once and produces an immutable [`BuildConfig`].

use crate::alphabet::AlphabetChoice;
use crate::encseq::{Direction, SatelliteKind};
use crate::error::{Error, Result, Violations};
use crate::index::reader::ReadMode;
use crate::index::suffix_array::dcover::{MAX_MODULUS, MIN_MODULUS};
use crate::index::suffix_array::{BucketBounds, SortConfig, Strategy, MAX_CODE_SPACE};
use crate::index::types::TableSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Options of one build, as given by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    pub inputs: Vec<PathBuf>,
    pub index_name: Option<PathBuf>,
    /// Build from the encoded sequence of an existing index
    pub input_index: Option<PathBuf>,
    pub dna: Option<bool>,
    pub protein: Option<bool>,
    pub smap: Option<String>,
    pub sat: Option<String>,
    pub parts: Option<usize>,
    pub dir: Option<String>,
    /// `None` chooses the prefix length from the input size
    pub prefix_length: Option<u32>,
    pub algbds: Option<Vec<u64>>,
    pub dc: Option<u32>,
    pub maxdepth: Option<bool>,
    pub cmpcharbychar: Option<bool>,
    pub storespecialcodes: Option<bool>,
    /// Worker threads, 0 for all cores
    pub threads: Option<usize>,
    pub tables: Option<TableSet>,
    pub progress: Option<bool>,
}

impl BuildOptions {
    /// Load options from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::file("read config file", path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("cannot parse config file {}: {}", path.display(), e))
        })
    }

    /// Options of `self` overridden by every option set in `overrides`
    pub fn merge(self, overrides: BuildOptions) -> BuildOptions {
        BuildOptions {
            inputs: if overrides.inputs.is_empty() {
                self.inputs
            } else {
                overrides.inputs
            },
            index_name: overrides.index_name.or(self.index_name),
            input_index: overrides.input_index.or(self.input_index),
            dna: overrides.dna.or(self.dna),
            protein: overrides.protein.or(self.protein),
            smap: overrides.smap.or(self.smap),
            sat: overrides.sat.or(self.sat),
            parts: overrides.parts.or(self.parts),
            dir: overrides.dir.or(self.dir),
            prefix_length: overrides.prefix_length.or(self.prefix_length),
            algbds: overrides.algbds.or(self.algbds),
            dc: overrides.dc.or(self.dc),
            maxdepth: overrides.maxdepth.or(self.maxdepth),
            cmpcharbychar: overrides.cmpcharbychar.or(self.cmpcharbychar),
            storespecialcodes: overrides.storespecialcodes.or(self.storespecialcodes),
            threads: overrides.threads.or(self.threads),
            tables: overrides.tables.or(self.tables),
            progress: overrides.progress.or(self.progress),
        }
    }

    /// Check all option constraints, reporting every violation together
    pub fn validate(self) -> Result<BuildConfig> {
        let mut violations = Violations::default();
        let flag = |v: Option<bool>| v.unwrap_or(false);

        let input = match (self.inputs.is_empty(), &self.input_index) {
            (true, None) => {
                violations.push("no input files given (use --input-index to build from an existing index)");
                BuildInput::Files(Vec::new())
            }
            (false, Some(_)) => {
                violations.push("input files and --input-index are mutually exclusive");
                BuildInput::Files(self.inputs.clone())
            }
            (true, Some(index)) => BuildInput::Index(index.clone()),
            (false, None) => BuildInput::Files(self.inputs.clone()),
        };

        let index_name = match (&self.index_name, &input) {
            (Some(name), _) => name.clone(),
            (None, BuildInput::Index(index)) => index.clone(),
            (None, BuildInput::Files(files)) if files.len() == 1 => {
                files[0].file_name().map(PathBuf::from).unwrap_or_else(|| files[0].clone())
            }
            (None, BuildInput::Files(files)) => {
                if files.len() > 1 {
                    violations.push("an index name (--indexname) is required with more than one input file");
                }
                PathBuf::new()
            }
        };

        let alphabet_flags =
            flag(self.dna) as usize + flag(self.protein) as usize + self.smap.is_some() as usize;
        if alphabet_flags > 1 {
            violations.push("options --dna, --protein and --smap are mutually exclusive");
        }
        let alphabet = if flag(self.dna) {
            AlphabetChoice::Dna
        } else if flag(self.protein) {
            AlphabetChoice::Protein
        } else if let Some(name) = &self.smap {
            AlphabetChoice::Smap(name.clone())
        } else {
            AlphabetChoice::Auto
        };
        if matches!(input, BuildInput::Index(_)) && alphabet != AlphabetChoice::Auto {
            violations.push("the alphabet of --input-index is fixed; --dna, --protein and --smap do not apply");
        }

        let satellite = match self.sat.as_deref().map(str::parse::<SatelliteKind>) {
            Some(Ok(kind)) => {
                let explicit_dna = match alphabet {
                    AlphabetChoice::Dna => Some(true),
                    AlphabetChoice::Protein => Some(false),
                    _ => None,
                };
                if let Some(message) = explicit_dna.and_then(|dna| kind.alphabet_violations(dna)) {
                    violations.push(message);
                }
                Some(kind)
            }
            Some(Err(message)) => {
                violations.push(message);
                None
            }
            None => None,
        };

        let direction = match self.dir.as_deref().map(str::parse::<Direction>) {
            Some(Ok(direction)) => direction,
            Some(Err(message)) => {
                violations.push(message);
                Direction::Forward
            }
            None => Direction::Forward,
        };
        if direction.is_complement() && alphabet == AlphabetChoice::Protein {
            violations.push(format!("direction {} requires a DNA alphabet", direction));
        }

        let parts = self.parts.unwrap_or(1);
        if parts == 0 {
            violations.push("parts must be at least 1");
        }

        let maxdepth = flag(self.maxdepth);
        if maxdepth && parts > 1 {
            violations.push("prefix doubling (--maxdepth) cannot be combined with more than one part");
        }
        if maxdepth && self.dc.is_some() {
            violations.push("options --dc and --maxdepth are mutually exclusive");
        }
        let strategy = match self.dc {
            Some(modulus) => {
                if !modulus.is_power_of_two() || !(MIN_MODULUS..=MAX_MODULUS).contains(&modulus) {
                    violations.push(format!(
                        "difference cover modulus {} must be a power of two between {} and {}",
                        modulus, MIN_MODULUS, MAX_MODULUS
                    ));
                }
                Strategy::DifferenceCover { modulus }
            }
            None if maxdepth => Strategy::Doubling,
            None => Strategy::Direct,
        };

        let bounds = match self.algbds.as_deref() {
            None => BucketBounds::default(),
            Some(&[low, high, max_depth]) => {
                if low > high {
                    violations.push(format!("algbds: low bound {} exceeds high bound {}", low, high));
                }
                BucketBounds {
                    low: low as usize,
                    high: high as usize,
                    max_depth,
                }
            }
            Some(values) => {
                violations.push(format!("--algbds takes three values, got {}", values.len()));
                BucketBounds::default()
            }
        };

        if self.prefix_length == Some(0) {
            violations.push("prefix length must be at least 1");
        }

        violations.into_result()?;
        Ok(BuildConfig {
            input,
            index_name,
            alphabet,
            satellite,
            direction,
            prefix_length: self.prefix_length,
            sort: SortConfig {
                strategy,
                prefix_length: 1,
                parts,
                bounds,
                char_by_char: flag(self.cmpcharbychar),
                store_special_codes: flag(self.storespecialcodes),
                show_progress: flag(self.progress),
            },
            threads: self.threads.unwrap_or(0),
            tables: self.tables.unwrap_or_default(),
        })
    }
}

/// Where the text of a build comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInput {
    Files(Vec<PathBuf>),
    Index(PathBuf),
}

/// Validated configuration of one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub input: BuildInput,
    pub index_name: PathBuf,
    pub alphabet: AlphabetChoice,
    /// `None` picks the smallest legal satellite
    pub satellite: Option<SatelliteKind>,
    pub direction: Direction,
    /// `None` chooses the prefix length from the input size
    pub prefix_length: Option<u32>,
    /// Sort settings; the prefix length is filled in once the text is known
    pub sort: SortConfig,
    pub threads: usize,
    pub tables: TableSet,
}

/// Largest prefix length usable for a text: σ^k must not exceed N and the
/// extended code space must stay within the counting-sort limit
pub fn max_prefix_length(num_chars: usize, total_length: u64) -> u32 {
    let sigma = num_chars as u64;
    let mut k = 1;
    loop {
        let next = k + 1;
        let fits_text = sigma.checked_pow(next).is_some_and(|s| s <= total_length);
        let fits_space = (sigma + 1).checked_pow(next).is_some_and(|s| s <= MAX_CODE_SPACE);
        if !(fits_text && fits_space) {
            return k;
        }
        k = next;
    }
}

/// Automatic prefix length: largest k with σ^k <= N/4, at least 1
pub fn auto_prefix_length(num_chars: usize, total_length: u64) -> u32 {
    let sigma = num_chars as u64;
    let limit = total_length / 4;
    let mut k = 1;
    while sigma.checked_pow(k + 1).is_some_and(|s| s <= limit) {
        k += 1;
    }
    k.min(max_prefix_length(num_chars, total_length))
}

/// Prefix length for a text, explicit or automatic
pub fn resolve_prefix_length(requested: Option<u32>, num_chars: usize, total_length: u64) -> Result<u32> {
    let max = max_prefix_length(num_chars, total_length);
    match requested {
        None => Ok(auto_prefix_length(num_chars, total_length)),
        Some(k) if k > max => Err(Error::configuration(format!(
            "prefix length {} exceeds the maximum of {} for {} symbols over {} characters",
            k, max, total_length, num_chars
        ))),
        Some(k) => Ok(k),
    }
}

/// Validated configuration of one map (verification) run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    pub index_name: PathBuf,
    pub tables: TableSet,
    pub mode: ReadMode,
    /// Random positions checked against a sequential scan
    pub scan_trials: u64,
    /// Random suffix pairs compared block-wise and char by char
    pub multichar_cmp_trials: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::TableKind;

    fn options(inputs: &[&str]) -> BuildOptions {
        BuildOptions {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            ..Default::default()
        }
    }

    fn violations(options: BuildOptions) -> Vec<String> {
        match options.validate() {
            Err(Error::Configuration(v)) => v.messages().to_vec(),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = options(&["data/at1MB.fna"]).validate().unwrap();
        assert_eq!(config.index_name, PathBuf::from("at1MB.fna"));
        assert_eq!(config.input, BuildInput::Files(vec![PathBuf::from("data/at1MB.fna")]));
        assert_eq!(config.alphabet, AlphabetChoice::Auto);
        assert_eq!(config.satellite, None);
        assert_eq!(config.direction, Direction::Forward);
        assert_eq!(config.sort.strategy, Strategy::Direct);
        assert_eq!(config.sort.parts, 1);
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_all_violations_reported_sorted() {
        let opts = BuildOptions {
            protein: Some(true),
            sat: Some("bit".to_string()),
            dir: Some("cpl".to_string()),
            parts: Some(2),
            maxdepth: Some(true),
            ..options(&["a.fsa", "b.fsa"])
        };
        let messages = violations(opts);
        assert_eq!(
            messages,
            vec![
                "an index name (--indexname) is required with more than one input file",
                "cannot use satellite bit as the sequence is not DNA",
                "direction cpl requires a DNA alphabet",
                "prefix doubling (--maxdepth) cannot be combined with more than one part",
            ]
        );
    }

    #[test]
    fn test_unknown_names() {
        let opts = BuildOptions {
            sat: Some("plain".to_string()),
            dir: Some("up".to_string()),
            ..options(&["x.fna"])
        };
        let messages = violations(opts);
        assert!(messages[0].starts_with("unknown direction up"));
        assert!(messages[1].starts_with("unknown satellite plain"));
    }

    #[test]
    fn test_dna_bytecompress_and_exclusive_flags() {
        let opts = BuildOptions {
            dna: Some(true),
            smap: Some("TransDNA".to_string()),
            sat: Some("bytecompress".to_string()),
            ..options(&["x.fna"])
        };
        let messages = violations(opts);
        assert!(messages.contains(&"cannot use bytecompress on DNA sequences".to_string()));
        assert!(messages.contains(&"options --dna, --protein and --smap are mutually exclusive".to_string()));
    }

    #[test]
    fn test_strategies_and_bounds() {
        let dc = BuildOptions {
            dc: Some(64),
            algbds: Some(vec![10, 31, 80]),
            ..options(&["x.fna"])
        }
        .validate()
        .unwrap();
        assert_eq!(dc.sort.strategy, Strategy::DifferenceCover { modulus: 64 });
        assert_eq!(dc.sort.bounds, BucketBounds { low: 10, high: 31, max_depth: 80 });

        let doubling = BuildOptions {
            maxdepth: Some(true),
            ..options(&["x.fna"])
        }
        .validate()
        .unwrap();
        assert_eq!(doubling.sort.strategy, Strategy::Doubling);

        let bad = BuildOptions {
            dc: Some(48),
            maxdepth: Some(true),
            algbds: Some(vec![40, 30, 80]),
            parts: Some(0),
            prefix_length: Some(0),
            ..options(&["x.fna"])
        };
        assert_eq!(violations(bad).len(), 5);
    }

    #[test]
    fn test_input_sources() {
        assert_eq!(
            violations(BuildOptions::default()),
            vec!["no input files given (use --input-index to build from an existing index)"]
        );
        let both = BuildOptions {
            input_index: Some(PathBuf::from("old")),
            ..options(&["x.fna"])
        };
        assert_eq!(violations(both), vec!["input files and --input-index are mutually exclusive"]);

        let from_index = BuildOptions {
            input_index: Some(PathBuf::from("dir/old")),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(from_index.input, BuildInput::Index(PathBuf::from("dir/old")));
        assert_eq!(from_index.index_name, PathBuf::from("dir/old"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = BuildOptions {
            sat: Some("bit".to_string()),
            parts: Some(4),
            tables: Some([TableKind::Suf].into_iter().collect()),
            ..options(&["base.fna"])
        };
        let cli = BuildOptions {
            parts: Some(2),
            ..options(&["cli.fna"])
        };
        let merged = base.merge(cli);
        assert_eq!(merged.inputs, vec![PathBuf::from("cli.fna")]);
        assert_eq!(merged.sat.as_deref(), Some("bit"));
        assert_eq!(merged.parts, Some(2));
        assert!(merged.tables.unwrap().contains(TableKind::Suf));
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        fs::write(&path, r#"{"sat": "uchar", "parts": 3, "tables": ["suf", "lcp"]}"#).unwrap();
        let loaded = BuildOptions::load(&path).unwrap();
        assert_eq!(loaded.sat.as_deref(), Some("uchar"));
        assert_eq!(loaded.parts, Some(3));

        fs::write(&path, r#"{"satellite": "uchar"}"#).unwrap();
        assert!(matches!(BuildOptions::load(&path), Err(Error::Configuration(_))));
        assert!(matches!(BuildOptions::load(&dir.path().join("missing.json")), Err(Error::Io { .. })));
    }

    #[test]
    fn test_prefix_lengths() {
        // 4^4 <= 4000 / 4 < 4^5
        assert_eq!(auto_prefix_length(4, 4000), 4);
        assert_eq!(auto_prefix_length(4, 3), 1);
        assert_eq!(auto_prefix_length(20, 100), 1);
        // 4^8 <= 100000 < 4^9
        assert_eq!(max_prefix_length(4, 100_000), 8);
        // (20+1)^5 > 2^24 bounds protein prefixes
        assert_eq!(max_prefix_length(20, u64::MAX), 5);
        assert_eq!(max_prefix_length(4, 4000), 5);
        assert_eq!(resolve_prefix_length(None, 4, 4000).unwrap(), 4);
        assert_eq!(resolve_prefix_length(Some(3), 4, 4000).unwrap(), 3);
        assert!(matches!(
            resolve_prefix_length(Some(10), 4, 4000),
            Err(Error::Configuration(_))
        ));
    }
}
