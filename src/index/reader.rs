//! Index reader.
//!
//! Opens the tables of an index by name and checks every table against
//! its header and the project file. [`IndexReader::verify`] then checks
//! the table contents against each other.
//!
//! In [`ReadMode::Mapped`] every table is memory-mapped and decoded. In
//! [`ReadMode::Stream`] only the encoded sequence and the per-sequence
//! tables are loaded. The suffix, lcp, bwt and bucket tables stay on disk
//! and `verify` reads them once, rank by rank, through fixed-size buffers.

use crate::alphabet::SEPARATOR;
use crate::encseq::bitpack::BitVector;
use crate::encseq::{Cursor, DirectSymbols, EncodedSequence, SatelliteKind, SymbolAccess, SymbolVisitor};
use crate::error::{Error, Result};
use crate::index::suffix_array::compare::SuffixComparator;
use crate::index::suffix_array::derived::{
    bucket_table, bwt_table, first_unsorted, inverse, lcp_table, regular_prefix,
};
use crate::index::suffix_array::types::{BucketEntry, SuffixEntry};
use crate::index::suffix_array::{LcpStream, SuffixArrayReader, TableStream, STREAM_BUFFER_SIZE};
use crate::index::types::*;
use crate::utils::{decode_uint_le, index_file};
use memmap2::Mmap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// How table files are accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    Mapped,
    /// Sequential reads through fixed-size buffers; memory does not grow
    /// with the suffix-indexed tables
    Stream,
}

/// Tables that stay on disk in stream mode
fn streams(kind: TableKind) -> bool {
    matches!(kind, TableKind::Suf | TableKind::Lcp | TableKind::Bwt | TableKind::Bck)
}

/// Bytes of one table file
enum TableBytes {
    Mapped(Mmap),
    Stream(Vec<u8>),
}

impl Deref for TableBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TableBytes::Mapped(mmap) => mmap,
            TableBytes::Stream(bytes) => bytes,
        }
    }
}

/// Randomized consistency checks run by [`IndexReader::verify`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trials {
    pub scan: u64,
    pub multichar_cmp: u64,
}

/// The requested tables of an index, validated against the project file
pub struct IndexReader {
    index_name: PathBuf,
    project: IndexProject,
    tables: TableSet,
    encoded: Option<EncodedSequence>,
    suffixes: Option<Vec<SuffixEntry>>,
    lcp: Option<Vec<u64>>,
    bwt: Option<Vec<u8>>,
    buckets: Option<Vec<BucketEntry>>,
    descriptions: Option<Vec<u8>>,
    description_ends: Option<Vec<u64>>,
    separators: Option<Vec<u64>>,
    /// Tables validated at open and read during `verify`
    streamed: TableSet,
}

impl IndexReader {
    /// Read the project file of an index
    pub fn read_project(index_name: &Path) -> Result<IndexProject> {
        let path = index_file(index_name, PROJECT_EXTENSION);
        let file = File::open(&path).map_err(|e| Error::file("open index project", &path, e))?;
        let project: IndexProject = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::corrupt(index_name, format!("cannot parse {}: {}", path.display(), e)))?;
        if project.version != INDEX_VERSION {
            return Err(Error::corrupt(
                index_name,
                format!("project version {} is not supported (expected {})", project.version, INDEX_VERSION),
            ));
        }
        Ok(project)
    }

    /// Open the `tables` of an index; a table the index was built without is
    /// a [`Error::MissingTable`]
    pub fn open(index_name: &Path, tables: TableSet, mode: ReadMode) -> Result<Self> {
        let project = Self::read_project(index_name)?;
        if let Some(missing) = tables.iter().find(|&k| !project.tables.contains(k)) {
            return Err(Error::MissingTable {
                index: index_name.to_path_buf(),
                table: missing.ext().to_string(),
            });
        }

        let mut reader = Self {
            index_name: index_name.to_path_buf(),
            project,
            tables,
            encoded: None,
            suffixes: None,
            lcp: None,
            bwt: None,
            buckets: None,
            descriptions: None,
            description_ends: None,
            separators: None,
            streamed: TableSet::new(),
        };
        for kind in tables.iter() {
            reader.load(kind, mode)?;
            log::debug!("loaded {} table of {}", kind, index_name.display());
        }
        Ok(reader)
    }

    pub fn index_name(&self) -> &Path {
        &self.index_name
    }

    pub fn project(&self) -> &IndexProject {
        &self.project
    }

    pub fn tables(&self) -> TableSet {
        self.tables
    }

    /// Tables left on disk by [`ReadMode::Stream`]; their accessors return
    /// `None`
    pub fn streamed(&self) -> TableSet {
        self.streamed
    }

    pub fn encoded(&self) -> Option<&EncodedSequence> {
        self.encoded.as_ref()
    }

    pub fn suffixes(&self) -> Option<&[SuffixEntry]> {
        self.suffixes.as_deref()
    }

    pub fn lcp(&self) -> Option<&[u64]> {
        self.lcp.as_deref()
    }

    pub fn bwt(&self) -> Option<&[u8]> {
        self.bwt.as_deref()
    }

    pub fn buckets(&self) -> Option<&[BucketEntry]> {
        self.buckets.as_deref()
    }

    pub fn separators(&self) -> Option<&[u64]> {
        self.separators.as_deref()
    }

    /// Descriptions from `des`, split at the `sds` offsets when loaded
    pub fn descriptions(&self) -> Option<Vec<String>> {
        let des = self.descriptions.as_ref()?;
        let descriptions = match &self.description_ends {
            Some(ends) => {
                let mut start = 0usize;
                ends.iter()
                    .map(|&end| {
                        let line = des.get(start..(end as usize).saturating_sub(1)).unwrap_or_default();
                        let text = String::from_utf8_lossy(line).into_owned();
                        start = end as usize;
                        text
                    })
                    .collect()
            }
            None => des
                .split(|&b| b == b'\n')
                .take(self.project.num_sequences as usize)
                .map(|line| String::from_utf8_lossy(line).into_owned())
                .collect(),
        };
        Some(descriptions)
    }

    fn corrupt(&self, message: impl Into<String>) -> Error {
        Error::corrupt(&self.index_name, message)
    }

    fn map(&self, path: &Path, mode: ReadMode) -> Result<TableBytes> {
        let file = File::open(path).map_err(|e| Error::file("open", path, e))?;
        match mode {
            ReadMode::Mapped => {
                let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::file("map", path, e))?;
                Ok(TableBytes::Mapped(mmap))
            }
            ReadMode::Stream => {
                let mut bytes = Vec::new();
                BufReader::with_capacity(STREAM_BUFFER_SIZE, file)
                    .read_to_end(&mut bytes)
                    .map_err(|e| Error::file("read", path, e))?;
                Ok(TableBytes::Stream(bytes))
            }
        }
    }

    fn bucket_count(&self) -> Result<u64> {
        let sigma = self.project.alphabet.groups.len() as u64;
        sigma
            .checked_pow(self.project.prefix_length)
            .ok_or_else(|| self.corrupt("bucket table size overflows"))
    }

    /// Declared counts and widths against the project
    fn check_header(&self, kind: TableKind, header: &TableHeader) -> Result<()> {
        let n = self.project.total_length;
        let width = self.project.suffix_width as u64;
        let expect = |what: &str, actual: u64, expected: u64| -> Result<()> {
            if actual == expected {
                Ok(())
            } else {
                Err(self.corrupt(format!(
                    "{} table declares {} {}, expected {}",
                    kind, what, actual, expected
                )))
            }
        };

        match kind {
            TableKind::Tis => {
                expect("length", header.count, n)?;
                expect("satellite", header.width as u64, self.project.satellite.code() as u64)
            }
            TableKind::Suf => {
                expect("entries", header.count, n)?;
                expect("width", header.width as u64, width)
            }
            TableKind::Lcp | TableKind::Bwt => expect("entries", header.count, n),
            TableKind::Bck => {
                expect("buckets", header.count, self.bucket_count()?)?;
                expect("width", header.width as u64, width)
            }
            TableKind::Des => Ok(()),
            TableKind::Sds => expect("entries", header.count, self.project.num_sequences),
            TableKind::Ssp => {
                expect("entries", header.count, self.project.num_sequences.saturating_sub(1))?;
                expect("width", header.width as u64, width)
            }
        }
    }

    fn load(&mut self, kind: TableKind, mode: ReadMode) -> Result<()> {
        let path = index_file(&self.index_name, kind.ext());
        if mode == ReadMode::Stream && streams(kind) {
            self.check_streamed(kind, &path)?;
            self.streamed.insert(kind);
            return Ok(());
        }

        let bytes = self.map(&path, mode)?;
        let header = TableHeader::parse(&bytes, &self.index_name, kind, self.project.build_id)?;
        self.check_header(kind, &header)?;
        let mut cursor = Cursor::new(&bytes[HEADER_SIZE..], &self.index_name);

        let n = self.project.total_length;
        let width = self.project.suffix_width as usize;
        match kind {
            TableKind::Tis => {
                let satellite = SatelliteKind::from_code(header.width)
                    .ok_or_else(|| self.corrupt(format!("unknown satellite code {}", header.width)))?;
                let encoded = EncodedSequence::read_payload(satellite, n, &mut cursor)?;
                let chars = self.project.alphabet.groups.len();
                if encoded.num_chars() != chars {
                    return Err(self.corrupt(format!(
                        "tis table declares alphabet size {}, expected {}",
                        encoded.num_chars(),
                        chars
                    )));
                }
                self.encoded = Some(encoded);
            }
            TableKind::Suf => {
                self.suffixes = Some(SuffixArrayReader::read_suffixes(&mut cursor, n, width)?);
            }
            TableKind::Lcp => {
                self.lcp = Some(SuffixArrayReader::read_lcp(&mut cursor, n)?);
            }
            TableKind::Bwt => {
                self.bwt = Some(SuffixArrayReader::read_bwt(&mut cursor, n)?);
            }
            TableKind::Bck => {
                self.buckets = Some(SuffixArrayReader::read_buckets(&mut cursor, header.count, width)?);
            }
            TableKind::Des => {
                if header.count != cursor.remaining() as u64 {
                    return Err(self.corrupt(format!(
                        "des table declares bytes {}, expected {}",
                        header.count,
                        cursor.remaining()
                    )));
                }
                self.descriptions = Some(cursor.take(header.count as usize)?.to_vec());
            }
            TableKind::Sds => {
                self.description_ends = Some(cursor.words(header.count as usize)?);
            }
            TableKind::Ssp => {
                let bytes = cursor.take(header.count as usize * width)?;
                self.separators = Some(bytes.chunks_exact(width).map(|c| decode_uint_le(c, width)).collect());
            }
        }

        if cursor.remaining() != 0 {
            return Err(self.corrupt(format!(
                "{} table has {} unexpected trailing bytes",
                kind,
                cursor.remaining()
            )));
        }
        Ok(())
    }

    /// Header, declared sizes and file length of a table left on disk
    fn check_streamed(&self, kind: TableKind, path: &Path) -> Result<()> {
        let mut stream = TableStream::open(path, &self.index_name, 0)?;
        let mut header = [0u8; HEADER_SIZE];
        stream.fill(&mut header)?;
        let header = TableHeader::parse(&header, &self.index_name, kind, self.project.build_id)?;
        self.check_header(kind, &header)?;

        let n = self.project.total_length;
        let width = self.project.suffix_width as u64;
        let payload = match kind {
            TableKind::Suf => n.checked_mul(width),
            TableKind::Bwt => Some(n),
            TableKind::Bck => header.count.checked_mul(2 * width),
            TableKind::Lcp => {
                let lcp = LcpStream::open(path, &self.index_name, HEADER_SIZE as u64, n)?;
                lcp.exceptions()
                    .checked_mul(16)
                    .and_then(|e| e.checked_add(n))
                    .and_then(|e| e.checked_add(8))
            }
            other => return Err(self.corrupt(format!("{} table is not read as a stream", other))),
        };
        let expected = payload
            .and_then(|p| p.checked_add(HEADER_SIZE as u64))
            .ok_or_else(|| self.corrupt(format!("{} table size overflows", kind)))?;
        let actual = fs::metadata(path).map_err(|e| Error::file("stat", path, e))?.len();
        match actual.cmp(&expected) {
            Ordering::Less => Err(self.corrupt(format!(
                "{} table is truncated ({} of {} bytes)",
                kind, actual, expected
            ))),
            Ordering::Greater => Err(self.corrupt(format!(
                "{} table has {} unexpected trailing bytes",
                kind,
                actual - expected
            ))),
            Ordering::Equal => Ok(()),
        }
    }

    /// Check the loaded tables against each other; returns one line per check
    pub fn verify(&self, trials: Trials) -> Result<Vec<String>> {
        let mut report = Vec::new();
        let n = self.project.total_length;
        let direction = self.project.direction;

        if let Some(encoded) = &self.encoded {
            self.verify_encoded(encoded)?;
            report.push(format!("tis: {} symbols in {} satellite", n, encoded.kind()));
        }

        if let Some(separators) = &self.separators {
            if separators.windows(2).any(|w| w[0] >= w[1]) || separators.last().is_some_and(|&p| p >= n) {
                return Err(self.corrupt("separator positions are not increasing within the text"));
            }
            if let Some(encoded) = &self.encoded {
                if encoded.separator_positions() != *separators {
                    return Err(self.corrupt("ssp table disagrees with the encoded sequence"));
                }
            }
            report.push(format!("ssp: {} separators", separators.len()));
        }

        if let Some(ends) = &self.description_ends {
            if ends.windows(2).any(|w| w[0] >= w[1]) || ends.first().is_some_and(|&e| e == 0) {
                return Err(self.corrupt("description ends are not increasing"));
            }
            if let Some(des) = &self.descriptions {
                if ends.last().copied().unwrap_or(0) != des.len() as u64
                    || ends.iter().any(|&e| des[e as usize - 1] != b'\n')
                {
                    return Err(self.corrupt("description ends do not match the descriptions"));
                }
            }
            report.push(format!("sds: {} descriptions", ends.len()));
        }
        if let Some(des) = &self.descriptions {
            let lines = des.iter().filter(|&&b| b == b'\n').count() as u64;
            if lines != self.project.num_sequences {
                return Err(self.corrupt(format!(
                    "des table holds {} descriptions for {} sequences",
                    lines, self.project.num_sequences
                )));
            }
            report.push(format!("des: {} bytes", des.len()));
        }

        if let Some(suffixes) = &self.suffixes {
            let mut seen = vec![false; n as usize];
            for &p in suffixes.iter() {
                if p >= n || seen[p as usize] {
                    return Err(self.corrupt(format!("suffix table is not a permutation (entry {})", p)));
                }
                seen[p as usize] = true;
            }
            let rank = inverse(suffixes);
            if let Some(encoded) = &self.encoded {
                struct Sorted<'a>(&'a [u64], &'a [u64]);
                impl SymbolVisitor for Sorted<'_> {
                    type Output = Option<usize>;
                    fn visit<S: SymbolAccess>(self, symbols: &S) -> Option<usize> {
                        first_unsorted(symbols, self.0, self.1)
                    }
                }
                if let Some(i) = encoded.accept_oriented(direction, Sorted(suffixes, &rank)) {
                    return Err(self.corrupt(format!("suffixes at ranks {} and {} are out of order", i - 1, i)));
                }
                report.push(format!("suf: {} suffixes sorted ({})", n, direction));
            } else {
                report.push(format!("suf: {} suffixes form a permutation", n));
            }
        }

        let recompute = |which: &str| -> Option<(&EncodedSequence, &[u64])> {
            let pair = self.encoded.as_ref().zip(self.suffixes.as_deref());
            if pair.is_none() {
                log::debug!("{}: tis and suf not loaded, checking structure only", which);
            }
            pair
        };

        if let Some(lcp) = &self.lcp {
            if lcp.first().is_some_and(|&v| v != 0) {
                return Err(self.corrupt("lcp of rank 0 must be 0"));
            }
            if let Some((encoded, suffixes)) = recompute("lcp") {
                struct Lcp<'a>(&'a [u64]);
                impl SymbolVisitor for Lcp<'_> {
                    type Output = Vec<u64>;
                    fn visit<S: SymbolAccess>(self, symbols: &S) -> Vec<u64> {
                        lcp_table(symbols, self.0)
                    }
                }
                let expected = encoded.accept_oriented(direction, Lcp(suffixes));
                if let Some(i) = (0..lcp.len()).find(|&i| lcp[i] != expected[i]) {
                    return Err(self.corrupt(format!(
                        "lcp at rank {} is {}, expected {}",
                        i, lcp[i], expected[i]
                    )));
                }
            }
            report.push(format!("lcp: {} values, maximum {}", lcp.len(), lcp.iter().max().unwrap_or(&0)));
        }

        if let Some(bwt) = &self.bwt {
            self.verify_bwt_distribution(bwt)?;
            if let Some((encoded, suffixes)) = recompute("bwt") {
                struct Bwt<'a>(&'a [u64]);
                impl SymbolVisitor for Bwt<'_> {
                    type Output = Vec<u8>;
                    fn visit<S: SymbolAccess>(self, symbols: &S) -> Vec<u8> {
                        bwt_table(symbols, self.0)
                    }
                }
                if encoded.accept_oriented(direction, Bwt(suffixes)) != *bwt {
                    return Err(self.corrupt("bwt disagrees with the suffix table"));
                }
            }
            report.push(format!("bwt: {} symbols", bwt.len()));
        }

        if let Some(buckets) = &self.buckets {
            let mut previous = 0u64;
            for (code, bucket) in buckets.iter().enumerate() {
                previous = bucket_end(bucket, previous, n)
                    .ok_or_else(|| self.corrupt(format!("bucket {} ({:?}) is out of order", code, bucket)))?;
            }
            if let Some((encoded, suffixes)) = recompute("bck") {
                struct Buckets<'a>(&'a [u64], usize, u32);
                impl SymbolVisitor for Buckets<'_> {
                    type Output = Vec<BucketEntry>;
                    fn visit<S: SymbolAccess>(self, symbols: &S) -> Vec<BucketEntry> {
                        bucket_table(symbols, self.0, self.1, self.2)
                    }
                }
                let expected = encoded.accept_oriented(
                    direction,
                    Buckets(suffixes, encoded.num_chars(), self.project.prefix_length),
                );
                if expected != *buckets {
                    return Err(self.corrupt("bucket table disagrees with the suffix table"));
                }
            }
            report.push(format!(
                "bck: {} buckets of prefix length {}",
                buckets.len(),
                self.project.prefix_length
            ));
        }

        if !self.streamed.is_empty() {
            report.extend(self.verify_streamed()?);
        }

        if let Some(encoded) = &self.encoded {
            let mut rng = StdRng::seed_from_u64(self.project.build_id);
            if trials.scan > 0 && n > 0 {
                self.scan_trials(encoded, trials.scan, &mut rng)?;
                report.push(format!("scan trials: {}", trials.scan));
            }
            if trials.multichar_cmp > 0 && n > 0 {
                self.multichar_trials(encoded, trials.multichar_cmp, &mut rng)?;
                report.push(format!("multichar comparison trials: {}", trials.multichar_cmp));
            }
        } else if trials.scan > 0 || trials.multichar_cmp > 0 {
            log::warn!("trials need the tis table, skipping");
        }

        for line in &report {
            log::debug!("{}", line);
        }
        Ok(report)
    }

    fn verify_encoded(&self, encoded: &EncodedSequence) -> Result<()> {
        let separators = encoded.separator_positions().len() as u64;
        if separators != self.project.num_sequences.saturating_sub(1) {
            return Err(self.corrupt(format!(
                "encoded sequence has {} separators for {} sequences",
                separators, self.project.num_sequences
            )));
        }
        let mut distribution = vec![0u64; encoded.num_chars()];
        for c in encoded.decode(0..encoded.total_length()) {
            if let Some(count) = distribution.get_mut(c as usize) {
                *count += 1;
            }
        }
        if distribution != self.project.character_distribution {
            return Err(self.corrupt("character distribution of the encoded sequence differs from the project"));
        }
        Ok(())
    }

    fn verify_bwt_distribution(&self, bwt: &[u8]) -> Result<()> {
        let mut counts = vec![0u64; self.project.character_distribution.len()];
        for &c in bwt {
            self.count_bwt_symbol(&mut counts, c)?;
        }
        self.check_bwt_counts(&counts)
    }

    fn count_bwt_symbol(&self, counts: &mut [u64], c: u8) -> Result<()> {
        match counts.get_mut(c as usize) {
            Some(count) => *count += 1,
            None if crate::alphabet::is_special(c) => {}
            None => return Err(self.corrupt(format!("bwt holds invalid symbol code {}", c))),
        }
        Ok(())
    }

    /// Every symbol but the one at N-1 precedes some suffix
    fn check_bwt_counts(&self, counts: &[u64]) -> Result<()> {
        let expected = &self.project.character_distribution;
        let deficit: u64 = expected.iter().zip(counts).map(|(&e, &c)| e.saturating_sub(c)).sum();
        if counts.iter().zip(expected).any(|(&c, &e)| c > e) || deficit > 1 {
            return Err(self.corrupt("bwt symbol counts differ from the character distribution"));
        }
        Ok(())
    }

    /// Check the streamed tables in one pass over the ranks
    fn verify_streamed(&self) -> Result<Vec<String>> {
        let n = self.project.total_length;
        let path = |kind: TableKind| index_file(&self.index_name, kind.ext());
        let open = |kind: TableKind| -> Result<Option<TableStream>> {
            if self.streamed.contains(kind) {
                TableStream::open(&path(kind), &self.index_name, HEADER_SIZE as u64).map(Some)
            } else {
                Ok(None)
            }
        };
        let lcp = if self.streamed.contains(TableKind::Lcp) {
            Some(LcpStream::open(&path(TableKind::Lcp), &self.index_name, HEADER_SIZE as u64, n)?)
        } else {
            None
        };
        let buckets = match open(TableKind::Bck)? {
            Some(stream) => Some(BucketCheck::new(
                stream,
                self.project.suffix_width as usize,
                self.bucket_count()?,
                n,
            )),
            None => None,
        };
        let pass = StreamPass {
            reader: self,
            suffixes: open(TableKind::Suf)?,
            lcp,
            bwt: open(TableKind::Bwt)?,
            buckets,
        };
        match &self.encoded {
            Some(encoded) => encoded.accept_oriented(self.project.direction, pass),
            None => pass.run::<DirectSymbols>(None),
        }
    }

    fn scan_trials(&self, encoded: &EncodedSequence, trials: u64, rng: &mut StdRng) -> Result<()> {
        let n = encoded.total_length();
        let text = encoded.decode(0..n);
        for _ in 0..trials {
            let p = rng.gen_range(0..n);
            if encoded.symbol(p) != text[p as usize] {
                return Err(self.corrupt(format!("random access at {} disagrees with a sequential scan", p)));
            }
            let end = (p + rng.gen_range(1..=64)).min(n);
            if encoded.decode(p..end) != text[p as usize..end as usize] {
                return Err(self.corrupt(format!("decoding {}..{} disagrees with a sequential scan", p, end)));
            }
        }
        Ok(())
    }

    fn multichar_trials(&self, encoded: &EncodedSequence, trials: u64, rng: &mut StdRng) -> Result<()> {
        struct Compare(Vec<(u64, u64)>);
        impl SymbolVisitor for Compare {
            type Output = Option<(u64, u64)>;
            fn visit<S: SymbolAccess>(self, symbols: &S) -> Option<(u64, u64)> {
                let blocks = SuffixComparator::new(symbols, false);
                let chars = SuffixComparator::new(symbols, true);
                self.0.into_iter().find(|&(a, b)| {
                    blocks.compare_bounded(a, b, 0, u64::MAX) != chars.compare_bounded(a, b, 0, u64::MAX)
                })
            }
        }

        let n = encoded.total_length();
        let pairs = (0..trials).map(|_| (rng.gen_range(0..n), rng.gen_range(0..n))).collect();
        match encoded.accept_oriented(self.project.direction, Compare(pairs)) {
            Some((a, b)) => Err(self.corrupt(format!(
                "block and char-by-char comparison of suffixes {} and {} disagree",
                a, b
            ))),
            None => Ok(()),
        }
    }
}

/// End of `bucket` when it starts at or after `previous` and ends within
/// `total` ranks
fn bucket_end(bucket: &BucketEntry, previous: u64, total: u64) -> Option<u64> {
    if bucket.left < previous {
        return None;
    }
    bucket.left.checked_add(bucket.count).filter(|&end| end <= total)
}

/// Rank-ordered walk over the streamed tables
struct StreamPass<'r> {
    reader: &'r IndexReader,
    suffixes: Option<TableStream>,
    lcp: Option<LcpStream>,
    bwt: Option<TableStream>,
    buckets: Option<BucketCheck>,
}

impl SymbolVisitor for StreamPass<'_> {
    type Output = Result<Vec<String>>;

    fn visit<S: SymbolAccess>(self, symbols: &S) -> Result<Vec<String>> {
        self.run(Some(symbols))
    }
}

impl StreamPass<'_> {
    /// Without `symbols` only the structure of each table is checked
    fn run<S: SymbolAccess>(mut self, symbols: Option<&S>) -> Result<Vec<String>> {
        let reader = self.reader;
        let project = &reader.project;
        let n = project.total_length;
        let width = project.suffix_width as usize;
        let sigma = project.alphabet.groups.len() as u64;
        let cmp = symbols
            .filter(|_| self.suffixes.is_some())
            .map(|s| SuffixComparator::new(s, false));
        if let Some(buckets) = &mut self.buckets {
            buckets.expect_runs = cmp.is_some();
        }

        let mut seen = BitVector::new(if self.suffixes.is_some() { n } else { 0 });
        let mut bwt_counts = vec![0u64; project.character_distribution.len()];
        let mut max_lcp = 0u64;
        let mut previous: Option<SuffixEntry> = None;

        for rank in 0..n {
            let suffix = match &mut self.suffixes {
                Some(stream) => {
                    let p = stream.uint(width)?;
                    if p >= n || seen.get(p) {
                        return Err(reader.corrupt(format!("suffix table is not a permutation (entry {})", p)));
                    }
                    seen.set(p);
                    Some(p)
                }
                None => None,
            };
            let lcp = match &mut self.lcp {
                Some(stream) => Some(stream.next(rank)?),
                None => None,
            };
            let before = match &mut self.bwt {
                Some(stream) => Some(stream.byte()?),
                None => None,
            };

            if let Some(value) = lcp {
                if rank == 0 && value != 0 {
                    return Err(reader.corrupt("lcp of rank 0 must be 0"));
                }
                max_lcp = max_lcp.max(value);
            }
            if let Some(c) = before {
                reader.count_bwt_symbol(&mut bwt_counts, c)?;
            }

            if let (Some(cmp), Some(p)) = (&cmp, suffix) {
                if let Some(q) = previous {
                    let (order, common) = cmp.compare_bounded(q, p, 0, u64::MAX);
                    if order != Ordering::Less {
                        return Err(reader.corrupt(format!(
                            "suffixes at ranks {} and {} are out of order",
                            rank - 1,
                            rank
                        )));
                    }
                    if let Some(value) = lcp.filter(|&v| v != common) {
                        return Err(reader.corrupt(format!(
                            "lcp at rank {} is {}, expected {}",
                            rank, value, common
                        )));
                    }
                }
                let symbols = cmp.symbols();
                if let Some(c) = before {
                    let expected = if p == 0 { SEPARATOR } else { symbols.symbol(p - 1) };
                    if c != expected {
                        return Err(reader.corrupt("bwt disagrees with the suffix table"));
                    }
                }
                if let Some(buckets) = &mut self.buckets {
                    buckets.push(rank, regular_prefix(symbols, p, sigma, project.prefix_length))?;
                }
            }
            previous = suffix;
        }

        let mut report = Vec::new();
        if self.suffixes.is_some() {
            report.push(match cmp {
                Some(_) => format!("suf: {} suffixes sorted ({})", n, project.direction),
                None => format!("suf: {} suffixes form a permutation", n),
            });
        }
        if let Some(lcp) = self.lcp {
            lcp.finish()?;
            report.push(format!("lcp: {} values, maximum {}", n, max_lcp));
        }
        if self.bwt.is_some() {
            reader.check_bwt_counts(&bwt_counts)?;
            report.push(format!("bwt: {} symbols", n));
        }
        if let Some(buckets) = self.buckets {
            let count = buckets.finish()?;
            report.push(format!(
                "bck: {} buckets of prefix length {}",
                count, project.prefix_length
            ));
        }
        Ok(report)
    }
}

/// Checks bucket table entries as they arrive in code order.
///
/// Suffixes sharing a regular prefix are adjacent in a sorted table, so
/// each run of equal codes is one bucket, and the runs arrive in code order.
struct BucketCheck {
    stream: TableStream,
    width: usize,
    space: u64,
    total: u64,
    /// Entries consumed so far; also the code of the next entry
    read: u64,
    /// End of the previous bucket
    end: u64,
    expect_runs: bool,
    run: Option<(u64, BucketEntry)>,
}

impl BucketCheck {
    fn new(stream: TableStream, width: usize, space: u64, total: u64) -> Self {
        Self {
            stream,
            width,
            space,
            total,
            read: 0,
            end: 0,
            expect_runs: false,
            run: None,
        }
    }

    fn next_entry(&mut self) -> Result<BucketEntry> {
        let code = self.read;
        let bucket = self.stream.bucket(self.width)?;
        match bucket_end(&bucket, self.end, self.total) {
            Some(end) => {
                self.end = end;
                self.read += 1;
                Ok(bucket)
            }
            None => Err(self
                .stream
                .corrupt(format!("bucket {} ({:?}) is out of order", code, bucket))),
        }
    }

    /// Entries up to `code` are empty buckets left of `bucket`, then `bucket`
    fn expect_through(&mut self, code: u64, bucket: BucketEntry) -> Result<()> {
        while self.read <= code {
            let expected = if self.read == code {
                bucket
            } else {
                BucketEntry {
                    left: bucket.left,
                    count: 0,
                }
            };
            if self.next_entry()? != expected {
                return Err(self.stream.corrupt("bucket table disagrees with the suffix table"));
            }
        }
        Ok(())
    }

    /// Account for the suffix at `rank`, whose regular prefix has `code`
    fn push(&mut self, rank: u64, code: Option<u64>) -> Result<()> {
        let Some(code) = code else {
            return Ok(());
        };
        if let Some((current, bucket)) = &mut self.run {
            if *current == code {
                bucket.count += 1;
                return Ok(());
            }
        }
        if let Some((current, bucket)) = self.run.take() {
            self.expect_through(current, bucket)?;
        }
        self.run = Some((code, BucketEntry { left: rank, count: 1 }));
        Ok(())
    }

    /// Check the remaining entries; returns the number of buckets
    fn finish(mut self) -> Result<u64> {
        if self.expect_runs {
            if let Some((current, bucket)) = self.run.take() {
                self.expect_through(current, bucket)?;
            }
            if self.read < self.space {
                let tail = BucketEntry {
                    left: self.total,
                    count: 0,
                };
                self.expect_through(self.space - 1, tail)?;
            }
        } else {
            while self.read < self.space {
                self.next_entry()?;
            }
        }
        Ok(self.space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::index::build::build_index;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn set(kinds: &[TableKind]) -> TableSet {
        kinds.iter().copied().collect()
    }

    fn built(tables: &[TableKind]) -> (TempDir, PathBuf) {
        built_from(">a one\nACGTTGCANNACGTAGGACC\n>b two\nTTACGATTACA\n", tables)
    }

    fn built_from(fasta_text: &str, tables: &[TableKind]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let fasta = dir.path().join("in.fna");
        fs::write(&fasta, fasta_text).unwrap();
        let name = dir.path().join("sfx");
        let options = BuildOptions {
            inputs: vec![fasta],
            index_name: Some(name.clone()),
            tables: Some(set(tables)),
            ..Default::default()
        };
        build_index(&options.validate().unwrap()).unwrap();
        (dir, name)
    }

    #[test]
    fn test_modes_agree() {
        let (_dir, name) = built(&TableKind::ALL);
        let mapped = IndexReader::open(&name, TableSet::all(), ReadMode::Mapped).unwrap();
        let stream = IndexReader::open(&name, TableSet::all(), ReadMode::Stream).unwrap();
        assert_eq!(mapped.encoded(), stream.encoded());
        assert_eq!(mapped.descriptions(), stream.descriptions());
        assert_eq!(
            stream.streamed(),
            set(&[TableKind::Suf, TableKind::Lcp, TableKind::Bwt, TableKind::Bck])
        );
        assert!(stream.suffixes().is_none());
        assert!(stream.lcp().is_none());

        let trials = Trials {
            scan: 20,
            multichar_cmp: 20,
        };
        let report = stream.verify(trials).unwrap();
        assert_eq!(report.len(), 10);
        assert_eq!(report, mapped.verify(trials).unwrap());
    }

    #[test]
    fn test_stream_checks_long_lcp_values() {
        let repeat = "ACGTTGCA".repeat(50);
        let text = format!(">a\n{}GG\n>b\n{}TT\n", repeat, repeat);
        let (_dir, name) = built_from(&text, &TableKind::ALL);
        let mapped = IndexReader::open(&name, TableSet::all(), ReadMode::Mapped).unwrap();
        assert!(mapped.lcp().unwrap().iter().any(|&v| v >= 255));
        let stream = IndexReader::open(&name, TableSet::all(), ReadMode::Stream).unwrap();
        let report = stream.verify(Trials::default()).unwrap();
        assert_eq!(report, mapped.verify(Trials::default()).unwrap());
        assert!(report.iter().any(|l| l == "lcp: 805 values, maximum 400"), "{:?}", report);
    }

    #[test]
    fn test_stream_structure_only_without_suffixes() {
        let (_dir, name) = built(&TableKind::ALL);
        let tables = set(&[TableKind::Lcp, TableKind::Bwt, TableKind::Bck]);
        let reader = IndexReader::open(&name, tables, ReadMode::Stream).unwrap();
        let report = reader.verify(Trials::default()).unwrap();
        assert_eq!(report.len(), 3);
        assert!(report[2].starts_with("bck: "));
    }

    #[test]
    fn test_bucket_end_rejects_overflow() {
        let ok = BucketEntry { left: 3, count: 2 };
        assert_eq!(bucket_end(&ok, 3, 5), Some(5));
        assert_eq!(bucket_end(&ok, 4, 5), None);
        assert_eq!(bucket_end(&ok, 0, 4), None);
        let huge = BucketEntry {
            left: u64::MAX - 1,
            count: 2,
        };
        assert_eq!(bucket_end(&huge, 0, u64::MAX), None);
    }

    #[test]
    fn test_verify_detects_wrong_bucket() {
        let tables = [TableKind::Tis, TableKind::Suf, TableKind::Bck];
        let (_dir, name) = built(&tables);
        let path = index_file(&name, "bck");
        let mut bytes = fs::read(&path).unwrap();
        // count of bucket 0 (4-byte entries)
        bytes[HEADER_SIZE + 4] = bytes[HEADER_SIZE + 4].wrapping_add(1);
        fs::write(&path, &bytes).unwrap();

        for mode in [ReadMode::Mapped, ReadMode::Stream] {
            let reader = IndexReader::open(&name, set(&tables), mode).unwrap();
            let err = reader.verify(Trials::default()).unwrap_err();
            assert!(matches!(err, Error::Corrupt { ref message, .. } if message.contains("bucket")), "{:?}", mode);
        }
    }

    #[test]
    fn test_missing_table() {
        let (_dir, name) = built(&[TableKind::Tis, TableKind::Suf, TableKind::Lcp]);
        let err = IndexReader::open(&name, set(&[TableKind::Suf, TableKind::Bck]), ReadMode::Mapped)
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingTable { ref table, .. } if table == "bck"));
    }

    #[test]
    fn test_missing_project() {
        let dir = tempdir().unwrap();
        let err = IndexReader::open(&dir.path().join("none"), TableSet::new(), ReadMode::Mapped)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_table_from_other_build() {
        let (_dir, name) = built(&[TableKind::Suf]);
        let (_other_dir, other) = built(&[TableKind::Suf]);
        fs::copy(index_file(&other, "suf"), index_file(&name, "suf")).unwrap();
        let err = IndexReader::open(&name, set(&[TableKind::Suf]), ReadMode::Stream)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Corrupt { ref message, .. } if message.contains("belongs to build")));
    }

    #[test]
    fn test_truncated_and_trailing_bytes() {
        let (_dir, name) = built(&[TableKind::Suf]);
        let path = index_file(&name, "suf");
        let bytes = fs::read(&path).unwrap();

        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        let err = IndexReader::open(&name, set(&[TableKind::Suf]), ReadMode::Mapped).err().unwrap();
        assert!(matches!(err, Error::Corrupt { .. }));

        let err = IndexReader::open(&name, set(&[TableKind::Suf]), ReadMode::Stream).err().unwrap();
        assert!(matches!(err, Error::Corrupt { ref message, .. } if message.contains("truncated")));

        let mut longer = bytes.clone();
        longer.push(0);
        fs::write(&path, &longer).unwrap();
        for mode in [ReadMode::Mapped, ReadMode::Stream] {
            let err = IndexReader::open(&name, set(&[TableKind::Suf]), mode).err().unwrap();
            assert!(matches!(err, Error::Corrupt { ref message, .. } if message.contains("trailing")));
        }
    }

    #[test]
    fn test_verify_detects_swapped_suffixes() {
        let (_dir, name) = built(&[TableKind::Tis, TableKind::Suf]);
        let path = index_file(&name, "suf");
        let mut bytes = fs::read(&path).unwrap();
        // swap ranks 3 and 4 (4-byte entries)
        let (a, b) = (HEADER_SIZE + 12, HEADER_SIZE + 16);
        for k in 0..4 {
            bytes.swap(a + k, b + k);
        }
        fs::write(&path, &bytes).unwrap();

        let reader = IndexReader::open(&name, set(&[TableKind::Tis, TableKind::Suf]), ReadMode::Stream).unwrap();
        let err = reader.verify(Trials::default()).unwrap_err();
        assert!(matches!(err, Error::Corrupt { ref message, .. } if message.contains("out of order")));
    }

    #[test]
    fn test_verify_detects_wrong_lcp() {
        let (_dir, name) = built(&[TableKind::Tis, TableKind::Suf, TableKind::Lcp]);
        let path = index_file(&name, "lcp");
        let mut bytes = fs::read(&path).unwrap();
        bytes[HEADER_SIZE + 5] = bytes[HEADER_SIZE + 5].wrapping_add(1);
        fs::write(&path, &bytes).unwrap();

        let all = set(&[TableKind::Tis, TableKind::Suf, TableKind::Lcp]);
        for mode in [ReadMode::Mapped, ReadMode::Stream] {
            let reader = IndexReader::open(&name, all, mode).unwrap();
            assert!(reader.verify(Trials::default()).is_err(), "{:?}", mode);
        }

        // without tis and suf only the structure is checked
        let reader = IndexReader::open(&name, set(&[TableKind::Lcp]), ReadMode::Mapped).unwrap();
        assert!(reader.verify(Trials::default()).is_ok());
    }

    #[test]
    fn test_descriptions() {
        let (_dir, name) = built(&[TableKind::Des]);
        let reader = IndexReader::open(&name, set(&[TableKind::Des]), ReadMode::Mapped).unwrap();
        assert_eq!(reader.descriptions().unwrap(), vec!["a one".to_string(), "b two".to_string()]);
        reader.verify(Trials::default()).unwrap();
    }
}
