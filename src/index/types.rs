use crate::alphabet::AlphabetSpec;
use crate::encseq::{Direction, SatelliteKind};
use crate::error::{Error, Result};
use crate::index::suffix_array::derived::DerivedSelection;
use crate::index::suffix_array::Strategy;
use crate::sequence::FileInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// Magic number at the start of every binary table
pub const INDEX_MAGIC: u32 = 0x58494653; // "SFIX"

/// On-disk format version
pub const INDEX_VERSION: u32 = 1;

/// Bytes in a table header
pub const HEADER_SIZE: usize = 32;

/// Extension of the project file
pub const PROJECT_EXTENSION: &str = "prj";

/// One optional on-disk table of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TableKind {
    /// Encoded sequence (satellite)
    Tis = 0,
    /// Suffix array
    Suf = 1,
    Lcp = 2,
    Bwt = 3,
    /// Bucket boundaries
    Bck = 4,
    /// Descriptions
    Des = 5,
    /// Description end offsets
    Sds = 6,
    /// Separator positions
    Ssp = 7,
}

impl TableKind {
    pub const ALL: [TableKind; 8] = [
        TableKind::Tis,
        TableKind::Suf,
        TableKind::Lcp,
        TableKind::Bwt,
        TableKind::Bck,
        TableKind::Des,
        TableKind::Sds,
        TableKind::Ssp,
    ];

    /// File extension, also the CLI flag name
    pub fn ext(self) -> &'static str {
        match self {
            TableKind::Tis => "tis",
            TableKind::Suf => "suf",
            TableKind::Lcp => "lcp",
            TableKind::Bwt => "bwt",
            TableKind::Bck => "bck",
            TableKind::Des => "des",
            TableKind::Sds => "sds",
            TableKind::Ssp => "ssp",
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Tables computed from the suffix array
    pub fn needs_suffix_array(self) -> bool {
        matches!(self, TableKind::Suf | TableKind::Lcp | TableKind::Bwt | TableKind::Bck)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.ext() == s)
            .ok_or_else(|| format!("unknown table {}", s))
    }
}

/// Set of tables, serialized as a list of names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<TableKind>", into = "Vec<TableKind>")]
pub struct TableSet(u8);

impl TableSet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        TableKind::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, kind: TableKind) {
        self.0 |= 1 << kind as u8;
    }

    pub fn contains(&self, kind: TableKind) -> bool {
        self.0 & (1 << kind as u8) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TableKind> + '_ {
        TableKind::ALL.into_iter().filter(|&k| self.contains(k))
    }

    pub fn union(self, other: TableSet) -> TableSet {
        TableSet(self.0 | other.0)
    }

    /// Whether any member is computed from the suffix array
    pub fn needs_suffix_array(&self) -> bool {
        self.iter().any(TableKind::needs_suffix_array)
    }

    pub fn derived(&self) -> DerivedSelection {
        DerivedSelection {
            lcp: self.contains(TableKind::Lcp),
            bwt: self.contains(TableKind::Bwt),
            bck: self.contains(TableKind::Bck),
        }
    }
}

impl FromIterator<TableKind> for TableSet {
    fn from_iter<I: IntoIterator<Item = TableKind>>(iter: I) -> Self {
        let mut set = TableSet::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<TableKind>> for TableSet {
    fn from(kinds: Vec<TableKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<TableSet> for Vec<TableKind> {
    fn from(set: TableSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Display for TableSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(TableKind::ext).collect();
        f.write_str(&names.join(","))
    }
}

/// Header at the start of every binary table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub magic: u32,
    pub version: u32,
    pub kind: TableKind,
    /// Shared by all tables of one construction run and the project file
    pub build_id: u64,
    pub count: u64,
    /// Entry width in bytes; the satellite code for `tis`
    pub width: u32,
}

impl TableHeader {
    pub fn new(kind: TableKind, build_id: u64, count: u64, width: u32) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            kind,
            build_id,
            count,
            width,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.magic.to_le_bytes())?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.kind.code().to_le_bytes())?;
        writer.write_all(&self.build_id.to_le_bytes())?;
        writer.write_all(&self.count.to_le_bytes())?;
        writer.write_all(&self.width.to_le_bytes())?;
        Ok(())
    }

    /// Parse and check a header against the expected kind and build id
    pub fn parse(bytes: &[u8], path: &Path, expected: TableKind, build_id: u64) -> Result<Self> {
        let corrupt = |message: String| Error::corrupt(path, message);
        if bytes.len() < HEADER_SIZE {
            return Err(corrupt(format!("{} table is shorter than its header", expected)));
        }
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let u64_at = |i: usize| u64::from(u32_at(i)) | (u64::from(u32_at(i + 4)) << 32);

        let magic = u32_at(0);
        if magic != INDEX_MAGIC {
            return Err(corrupt(format!("{} table has bad magic {:#010x}", expected, magic)));
        }
        let version = u32_at(4);
        if version != INDEX_VERSION {
            return Err(corrupt(format!(
                "{} table has version {}, expected {}",
                expected, version, INDEX_VERSION
            )));
        }
        let kind = TableKind::from_code(u32_at(8))
            .filter(|&k| k == expected)
            .ok_or_else(|| corrupt(format!("{} table declares kind {}", expected, u32_at(8))))?;
        let header_build = u64_at(12);
        if header_build != build_id {
            return Err(corrupt(format!(
                "{} table belongs to build {:016x}, project is build {:016x}",
                expected, header_build, build_id
            )));
        }

        Ok(Self {
            magic,
            version,
            kind,
            build_id: header_build,
            count: u64_at(20),
            width: u32_at(28),
        })
    }
}

/// Project file: describes the table set of one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexProject {
    pub version: u32,
    pub build_id: u64,
    /// Residues plus separators
    pub total_length: u64,
    pub num_sequences: u64,
    pub num_residues: u64,
    pub files: Vec<FileInfo>,
    pub alphabet: AlphabetSpec,
    pub satellite: SatelliteKind,
    pub direction: Direction,
    pub prefix_length: u32,
    pub strategy: Strategy,
    pub parts: usize,
    pub tables: TableSet,
    /// Common sequence length, when all sequences have one
    pub equal_length: Option<u64>,
    pub wildcards: u64,
    pub special_ranges: u64,
    /// Occurrences of each regular character
    pub character_distribution: Vec<u64>,
    /// Entry width of suf, bck and ssp
    pub suffix_width: u32,
    pub created_at: u64,
}
