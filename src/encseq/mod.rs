//! Encoded sequence: the concatenated text in one of several satellite
//! representations.
//!
//! ## Satellites
//!
//! | name           | layout                                             | legal for      |
//! |----------------|----------------------------------------------------|----------------|
//! | `direct`       | one byte per symbol                                | any alphabet   |
//! | `bytecompress` | `ceil(log2(σ+2))` bits per symbol                  | non-DNA        |
//! | `eqlen`        | two bits per symbol, separators implied by length  | DNA, see below |
//! | `bit`          | two bits per symbol plus a special-position bitmap | DNA            |
//! | `uchar`        | two bits per symbol plus paged u8 special ranges   | DNA            |
//! | `ushort`       | same with u16 ranges                               | DNA            |
//! | `uint32`       | same with u32 ranges                               | DNA            |
//!
//! `eqlen` additionally requires that all sequences have the same length and
//! contain no wildcard.
//!
//! ## Access
//!
//! Hot loops never match on the satellite per symbol. They are written
//! against [`SymbolAccess`] and invoked through [`EncodedSequence::accept`],
//! which matches once and monomorphizes the visitor for the representation.

pub mod bitpack;
pub mod special;

use crate::alphabet::{self, is_special, Alphabet, SEPARATOR, WILDCARD};
use crate::error::{Error, Result, Violations};
use crate::sequence::SequenceCollection;
use crate::utils::{decode_uint_le, entry_width_for, write_u64_le, write_uint_le, write_words_le};
use bitpack::{BitPackedArray, BitVector};
use serde::{Deserialize, Serialize};
use special::{RangeWidth, SpecialRangeTable};
use std::fmt;
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

/// Symbols compared at once by two-bit satellites
pub const TWOBIT_BLOCK: u64 = 32;

/// Physical representation of the encoded text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatelliteKind {
    Direct,
    Bytecompress,
    Eqlen,
    Bit,
    Uchar,
    Ushort,
    Uint32,
}

impl SatelliteKind {
    pub const ALL: [SatelliteKind; 7] = [
        SatelliteKind::Direct,
        SatelliteKind::Bytecompress,
        SatelliteKind::Eqlen,
        SatelliteKind::Bit,
        SatelliteKind::Uchar,
        SatelliteKind::Ushort,
        SatelliteKind::Uint32,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SatelliteKind::Direct => "direct",
            SatelliteKind::Bytecompress => "bytecompress",
            SatelliteKind::Eqlen => "eqlen",
            SatelliteKind::Bit => "bit",
            SatelliteKind::Uchar => "uchar",
            SatelliteKind::Ushort => "ushort",
            SatelliteKind::Uint32 => "uint32",
        }
    }

    /// Code stored in the `tis` header
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Two-bit satellites only hold nucleotides
    pub fn requires_dna(self) -> bool {
        !matches!(self, SatelliteKind::Direct | SatelliteKind::Bytecompress)
    }

    /// Constraint violations of this satellite for the given alphabet
    pub fn alphabet_violations(self, alphabet_is_dna: bool) -> Option<String> {
        if self == SatelliteKind::Bytecompress && alphabet_is_dna {
            return Some("cannot use bytecompress on DNA sequences".to_string());
        }
        if self.requires_dna() && !alphabet_is_dna {
            return Some(format!(
                "cannot use satellite {} as the sequence is not DNA",
                self
            ));
        }
        None
    }
}

impl fmt::Display for SatelliteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SatelliteKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown satellite {} (expected one of {})", s, names.join(", "))
            })
    }
}

/// Scan direction of the suffix array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(rename = "fwd")]
    Forward,
    #[serde(rename = "cpl")]
    Complement,
    #[serde(rename = "rev")]
    Reverse,
    #[serde(rename = "rcl")]
    ReverseComplement,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Forward => "fwd",
            Direction::Complement => "cpl",
            Direction::Reverse => "rev",
            Direction::ReverseComplement => "rcl",
        }
    }

    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse | Direction::ReverseComplement)
    }

    pub fn is_complement(self) -> bool {
        matches!(self, Direction::Complement | Direction::ReverseComplement)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fwd" => Ok(Direction::Forward),
            "cpl" => Ok(Direction::Complement),
            "rev" => Ok(Direction::Reverse),
            "rcl" => Ok(Direction::ReverseComplement),
            _ => Err(format!("unknown direction {} (expected fwd, cpl, rev or rcl)", s)),
        }
    }
}

/// Up to one machine word of regular symbols, left-aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub code: u64,
    /// Regular symbols before the first special symbol or the end of text
    pub len: u32,
}

/// Random access to the symbols of a text of length N.
///
/// Positions are always `< total_length()`; callers handle the end of text.
pub trait SymbolAccess: Sync {
    fn total_length(&self) -> u64;

    fn symbol(&self, pos: u64) -> u8;

    /// Bits per regular symbol in a [`Block`]
    fn symbol_bits(&self) -> u32;

    /// Regular symbols starting at `pos`
    fn block(&self, pos: u64) -> Block {
        let bits = self.symbol_bits();
        let end = self.total_length().min(pos + (64 / bits) as u64);
        let mut code = 0u64;
        let mut len = 0u32;
        for p in pos..end {
            let c = self.symbol(p);
            if is_special(c) {
                break;
            }
            len += 1;
            code |= (c as u64) << (64 - bits * len);
        }
        Block { code, len }
    }

    /// Decode `range` by a sequential scan
    fn decode_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        out.extend(range.map(|p| self.symbol(p)));
    }
}

/// Generic operation over any symbol representation
pub trait SymbolVisitor {
    type Output;

    fn visit<S: SymbolAccess>(self, symbols: &S) -> Self::Output;
}

/// Oriented view of a text: reversed and/or complemented
pub struct Oriented<'a, S> {
    inner: &'a S,
    direction: Direction,
}

impl<'a, S: SymbolAccess> Oriented<'a, S> {
    pub fn new(inner: &'a S, direction: Direction) -> Self {
        Self { inner, direction }
    }
}

impl<S: SymbolAccess> SymbolAccess for Oriented<'_, S> {
    fn total_length(&self) -> u64 {
        self.inner.total_length()
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        let p = if self.direction.is_reverse() {
            self.inner.total_length() - 1 - pos
        } else {
            pos
        };
        let c = self.inner.symbol(p);
        if self.direction.is_complement() {
            alphabet::complement(c)
        } else {
            c
        }
    }

    fn symbol_bits(&self) -> u32 {
        self.inner.symbol_bits()
    }
}

/// Summary of an encoded text, gathered before choosing a satellite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStats {
    pub total_length: u64,
    pub num_chars: usize,
    /// Maximal runs of special symbols
    pub special_ranges: Vec<Range<u64>>,
    pub separators: Vec<u64>,
    pub wildcards: u64,
    pub equal_length: Option<u64>,
    /// Occurrences of each regular symbol
    pub distribution: Vec<u64>,
}

impl TextStats {
    pub fn collect(codes: &[u8], num_chars: usize) -> Self {
        let mut stats = TextStats {
            total_length: codes.len() as u64,
            num_chars,
            distribution: vec![0; num_chars],
            ..Default::default()
        };
        let mut run: Option<Range<u64>> = None;
        for (p, &c) in codes.iter().enumerate() {
            let p = p as u64;
            if is_special(c) {
                match c {
                    SEPARATOR => stats.separators.push(p),
                    _ => stats.wildcards += 1,
                }
                match run.as_mut() {
                    Some(r) => r.end = p + 1,
                    None => run = Some(p..p + 1),
                }
            } else {
                stats.distribution[c as usize] += 1;
                if let Some(r) = run.take() {
                    stats.special_ranges.push(r);
                }
            }
        }
        stats.special_ranges.extend(run);
        stats.equal_length = equal_spacing(&stats.separators, stats.total_length);
        stats
    }

    /// Whether the `eqlen` satellite can represent this text
    pub fn eqlen_legal(&self) -> bool {
        self.equal_length.is_some() && self.wildcards == 0
    }

    /// Data-dependent violations of a satellite choice
    pub fn violations(&self, kind: SatelliteKind, alphabet: &Alphabet) -> Violations {
        let mut violations = Violations::default();
        if let Some(message) = kind.alphabet_violations(alphabet.is_dna()) {
            violations.push(message);
        } else if kind == SatelliteKind::Eqlen && !self.eqlen_legal() {
            violations.push(
                "eqlen satellite requires that all sequences are of equal length and no \
                 sequence contains a wildcard",
            );
        }
        violations
    }

    /// Bytes the satellite would occupy
    pub fn estimated_size(&self, kind: SatelliteKind) -> u64 {
        let n = self.total_length;
        let twobit = (2 * n).div_ceil(64) * 8;
        let separators = 8 + self.separators.len() as u64 * 8;
        match kind {
            SatelliteKind::Direct => n,
            SatelliteKind::Bytecompress => {
                let bits = alphabet::bits_for(self.num_chars as u64 + 2) as u64;
                (bits * n).div_ceil(64) * 8 + 4
            }
            SatelliteKind::Eqlen => twobit + 8,
            SatelliteKind::Bit => twobit + n.div_ceil(64) * 8 + separators,
            SatelliteKind::Uchar => twobit + range_size::<u8>(self) + separators,
            SatelliteKind::Ushort => twobit + range_size::<u16>(self) + separators,
            SatelliteKind::Uint32 => twobit + range_size::<u32>(self) + separators,
        }
    }

    /// Smallest legal satellite
    pub fn choose(&self, alphabet: &Alphabet) -> SatelliteKind {
        if !alphabet.is_dna() {
            return SatelliteKind::Bytecompress;
        }
        if self.eqlen_legal() {
            return SatelliteKind::Eqlen;
        }
        [
            SatelliteKind::Bit,
            SatelliteKind::Uchar,
            SatelliteKind::Ushort,
            SatelliteKind::Uint32,
        ]
        .into_iter()
        .min_by_key(|&k| self.estimated_size(k))
        .unwrap_or(SatelliteKind::Bit)
    }
}

fn range_size<W: RangeWidth>(stats: &TextStats) -> u64 {
    let pieces = SpecialRangeTable::<W>::pieces_for(&stats.special_ranges);
    SpecialRangeTable::<W>::size_for(pieces, stats.total_length)
}

/// Sequence length when separators split the text into equal pieces
fn equal_spacing(separators: &[u64], total_length: u64) -> Option<u64> {
    let len = separators.first().copied().unwrap_or(total_length);
    let period = len + 1;
    let consistent = separators
        .iter()
        .enumerate()
        .all(|(k, &p)| p == k as u64 * period + len);
    let sequences = separators.len() as u64 + 1;
    (consistent && sequences * len + separators.len() as u64 == total_length).then_some(len)
}

/// Map the residues of a collection to symbol codes, separators included
pub fn encode_text(collection: &SequenceCollection, alphabet: &Alphabet) -> Result<Vec<u8>> {
    let mut codes = Vec::with_capacity(collection.total_length() as usize);
    for (i, residues) in collection.sequences().enumerate() {
        if i > 0 {
            codes.push(SEPARATOR);
        }
        for &raw in residues {
            let code = alphabet.encode(raw);
            if code == alphabet::UNDEFINED {
                let file = collection
                    .file_of(i)
                    .map(|f| f.path.display().to_string())
                    .unwrap_or_default();
                return Err(Error::Alphabet(format!(
                    "illegal character '{}' in sequence {} ({}) of file {} for alphabet {}",
                    raw.escape_ascii(),
                    i,
                    collection.descriptions()[i],
                    file,
                    alphabet.name()
                )));
            }
            codes.push(code);
        }
    }
    Ok(codes)
}

/// Byte reader over a serialized table, reporting truncation as corruption
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8], path: &'a Path) -> Self {
        Self { bytes, pos: 0, path }
    }

    pub fn corrupt(&self, message: impl Into<String>) -> Error {
        Error::corrupt(self.path, message)
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.corrupt(format!(
                "table is truncated at byte {} of {}",
                self.pos,
                self.bytes.len()
            ))),
        }
    }

    pub fn uint(&mut self, width: usize) -> Result<u64> {
        Ok(decode_uint_le(self.take(width)?, width))
    }

    pub fn u64(&mut self) -> Result<u64> {
        self.uint(8)
    }

    pub fn words(&mut self, count: usize) -> Result<Vec<u64>> {
        let bytes = self.take(count.saturating_mul(8))?;
        Ok(bytes.chunks_exact(8).map(|c| decode_uint_le(c, 8)).collect())
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// One byte per symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectSymbols {
    codes: Vec<u8>,
    bits: u32,
}

impl SymbolAccess for DirectSymbols {
    fn total_length(&self) -> u64 {
        self.codes.len() as u64
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        self.codes[pos as usize]
    }

    fn symbol_bits(&self) -> u32 {
        self.bits
    }

    fn decode_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.codes[range.start as usize..range.end as usize]);
    }
}

/// `ceil(log2(σ+2))` bits per symbol; σ codes wildcards, σ+1 separators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteCompressed {
    packed: BitPackedArray,
    num_chars: u64,
    bits: u32,
}

impl SymbolAccess for ByteCompressed {
    fn total_length(&self) -> u64 {
        self.packed.len()
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        let v = self.packed.get(pos);
        if v == self.num_chars {
            WILDCARD
        } else if v == self.num_chars + 1 {
            SEPARATOR
        } else {
            v as u8
        }
    }

    fn symbol_bits(&self) -> u32 {
        self.bits
    }
}

/// Two-bit text, separators every `seq_len + 1` positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualLength {
    twobit: BitPackedArray,
    seq_len: u64,
}

impl EqualLength {
    #[inline]
    fn next_separator(&self, pos: u64) -> u64 {
        let period = self.seq_len + 1;
        (pos / period) * period + self.seq_len
    }
}

impl SymbolAccess for EqualLength {
    fn total_length(&self) -> u64 {
        self.twobit.len()
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        if (pos + 1) % (self.seq_len + 1) == 0 {
            SEPARATOR
        } else {
            self.twobit.get(pos) as u8
        }
    }

    fn symbol_bits(&self) -> u32 {
        2
    }

    #[inline]
    fn block(&self, pos: u64) -> Block {
        let end = self.total_length().min(pos + TWOBIT_BLOCK);
        let stop = end.min(self.next_separator(pos));
        twobit_block(&self.twobit, pos, stop)
    }

    fn decode_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        let start = out.len();
        decode_twobit(&self.twobit, range.clone(), out);
        let mut sep = self.next_separator(range.start);
        while sep < range.end {
            out[start + (sep - range.start) as usize] = SEPARATOR;
            sep += self.seq_len + 1;
        }
    }
}

/// Two-bit text plus a bitmap of special positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSpecials {
    twobit: BitPackedArray,
    specials: BitVector,
    separators: Vec<u64>,
}

impl SymbolAccess for BitSpecials {
    fn total_length(&self) -> u64 {
        self.twobit.len()
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        if !self.specials.get(pos) {
            self.twobit.get(pos) as u8
        } else if self.separators.binary_search(&pos).is_ok() {
            SEPARATOR
        } else {
            WILDCARD
        }
    }

    fn symbol_bits(&self) -> u32 {
        2
    }

    #[inline]
    fn block(&self, pos: u64) -> Block {
        let end = self.total_length().min(pos + TWOBIT_BLOCK);
        let stop = self.specials.first_set(pos, end).unwrap_or(end);
        twobit_block(&self.twobit, pos, stop)
    }

    fn decode_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        let start = out.len();
        decode_twobit(&self.twobit, range.clone(), out);
        let mut p = range.start;
        while p < range.end {
            let to = range.end.min(p + 64);
            match self.specials.first_set(p, to) {
                Some(hit) => {
                    out[start + (hit - range.start) as usize] = WILDCARD;
                    p = hit + 1;
                }
                None => p = to,
            }
        }
        overlay_separators(&self.separators, range, start, out);
    }
}

/// Two-bit text plus paged special ranges of width `W`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpecials<W> {
    twobit: BitPackedArray,
    specials: SpecialRangeTable<W>,
    separators: Vec<u64>,
}

impl<W: RangeWidth> SymbolAccess for RangeSpecials<W> {
    fn total_length(&self) -> u64 {
        self.twobit.len()
    }

    #[inline]
    fn symbol(&self, pos: u64) -> u8 {
        if !self.specials.contains(pos) {
            self.twobit.get(pos) as u8
        } else if self.separators.binary_search(&pos).is_ok() {
            SEPARATOR
        } else {
            WILDCARD
        }
    }

    fn symbol_bits(&self) -> u32 {
        2
    }

    #[inline]
    fn block(&self, pos: u64) -> Block {
        let end = self.total_length().min(pos + TWOBIT_BLOCK);
        let stop = self.specials.first_in(pos, end).unwrap_or(end);
        twobit_block(&self.twobit, pos, stop)
    }

    fn decode_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        let start = out.len();
        decode_twobit(&self.twobit, range.clone(), out);
        for special in self.specials.ranges() {
            let from = special.start.max(range.start);
            let to = special.end.min(range.end);
            for p in from..to {
                out[start + (p - range.start) as usize] = WILDCARD;
            }
        }
        overlay_separators(&self.separators, range, start, out);
    }
}

#[inline]
fn twobit_block(twobit: &BitPackedArray, pos: u64, stop: u64) -> Block {
    let len = stop.saturating_sub(pos) as u32;
    Block {
        code: twobit.extract(pos, len),
        len,
    }
}

fn decode_twobit(twobit: &BitPackedArray, range: Range<u64>, out: &mut Vec<u8>) {
    let mut p = range.start;
    while p < range.end {
        let count = (range.end - p).min(TWOBIT_BLOCK) as u32;
        let code = twobit.extract(p, count);
        out.extend((0..count).map(|k| ((code >> (62 - 2 * k)) & 3) as u8));
        p += count as u64;
    }
}

fn overlay_separators(separators: &[u64], range: Range<u64>, start: usize, out: &mut [u8]) {
    let first = separators.partition_point(|&s| s < range.start);
    for &s in separators[first..].iter().take_while(|&&s| s < range.end) {
        out[start + (s - range.start) as usize] = SEPARATOR;
    }
}

fn twobit_of(codes: &[u8]) -> BitPackedArray {
    let mut twobit = BitPackedArray::new(2, codes.len() as u64);
    for (p, &c) in codes.iter().enumerate() {
        if !is_special(c) {
            twobit.set(p as u64, c as u64);
        }
    }
    twobit
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Representation {
    Direct(DirectSymbols),
    Bytecompress(ByteCompressed),
    Eqlen(EqualLength),
    Bit(BitSpecials),
    Uchar(RangeSpecials<u8>),
    Ushort(RangeSpecials<u16>),
    Uint32(RangeSpecials<u32>),
}

/// The encoded text in its chosen satellite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    num_chars: usize,
    repr: Representation,
}

impl EncodedSequence {
    /// Encode symbol codes; the satellite must be legal for `stats`
    pub fn encode(codes: Vec<u8>, stats: &TextStats, kind: SatelliteKind) -> Self {
        let num_chars = stats.num_chars;
        let bits = alphabet::bits_for(num_chars as u64);
        let repr = match kind {
            SatelliteKind::Direct => Representation::Direct(DirectSymbols { codes, bits }),
            SatelliteKind::Bytecompress => {
                let sigma = num_chars as u8;
                let values: Vec<u8> = codes
                    .iter()
                    .map(|&c| match c {
                        WILDCARD => sigma,
                        SEPARATOR => sigma + 1,
                        c => c,
                    })
                    .collect();
                Representation::Bytecompress(ByteCompressed {
                    packed: BitPackedArray::from_values(
                        alphabet::bits_for(num_chars as u64 + 2),
                        &values,
                    ),
                    num_chars: num_chars as u64,
                    bits,
                })
            }
            SatelliteKind::Eqlen => Representation::Eqlen(EqualLength {
                twobit: twobit_of(&codes),
                seq_len: stats.equal_length.unwrap_or(stats.total_length),
            }),
            SatelliteKind::Bit => {
                let mut specials = BitVector::new(codes.len() as u64);
                for range in &stats.special_ranges {
                    for p in range.clone() {
                        specials.set(p);
                    }
                }
                Representation::Bit(BitSpecials {
                    twobit: twobit_of(&codes),
                    specials,
                    separators: stats.separators.clone(),
                })
            }
            SatelliteKind::Uchar => Representation::Uchar(range_specials(&codes, stats)),
            SatelliteKind::Ushort => Representation::Ushort(range_specials(&codes, stats)),
            SatelliteKind::Uint32 => Representation::Uint32(range_specials(&codes, stats)),
        };
        Self { num_chars, repr }
    }

    pub fn kind(&self) -> SatelliteKind {
        match &self.repr {
            Representation::Direct(_) => SatelliteKind::Direct,
            Representation::Bytecompress(_) => SatelliteKind::Bytecompress,
            Representation::Eqlen(_) => SatelliteKind::Eqlen,
            Representation::Bit(_) => SatelliteKind::Bit,
            Representation::Uchar(_) => SatelliteKind::Uchar,
            Representation::Ushort(_) => SatelliteKind::Ushort,
            Representation::Uint32(_) => SatelliteKind::Uint32,
        }
    }

    pub fn num_chars(&self) -> usize {
        self.num_chars
    }

    /// Run a visitor monomorphized for the satellite representation
    pub fn accept<V: SymbolVisitor>(&self, visitor: V) -> V::Output {
        match &self.repr {
            Representation::Direct(s) => visitor.visit(s),
            Representation::Bytecompress(s) => visitor.visit(s),
            Representation::Eqlen(s) => visitor.visit(s),
            Representation::Bit(s) => visitor.visit(s),
            Representation::Uchar(s) => visitor.visit(s),
            Representation::Ushort(s) => visitor.visit(s),
            Representation::Uint32(s) => visitor.visit(s),
        }
    }

    /// Run a visitor over the text read in `direction`
    pub fn accept_oriented<V: SymbolVisitor>(&self, direction: Direction, visitor: V) -> V::Output {
        struct Orient<V> {
            direction: Direction,
            visitor: V,
        }

        impl<V: SymbolVisitor> SymbolVisitor for Orient<V> {
            type Output = V::Output;

            fn visit<S: SymbolAccess>(self, symbols: &S) -> V::Output {
                match self.direction {
                    Direction::Forward => self.visitor.visit(symbols),
                    direction => self.visitor.visit(&Oriented::new(symbols, direction)),
                }
            }
        }

        self.accept(Orient { direction, visitor })
    }

    pub fn total_length(&self) -> u64 {
        struct Length;
        impl SymbolVisitor for Length {
            type Output = u64;
            fn visit<S: SymbolAccess>(self, symbols: &S) -> u64 {
                symbols.total_length()
            }
        }
        self.accept(Length)
    }

    /// Random access to one symbol
    pub fn symbol(&self, pos: u64) -> u8 {
        struct At(u64);
        impl SymbolVisitor for At {
            type Output = u8;
            fn visit<S: SymbolAccess>(self, symbols: &S) -> u8 {
                symbols.symbol(self.0)
            }
        }
        self.accept(At(pos))
    }

    /// Sequential decode of a range
    pub fn decode(&self, range: Range<u64>) -> Vec<u8> {
        struct Decode(Range<u64>);
        impl SymbolVisitor for Decode {
            type Output = Vec<u8>;
            fn visit<S: SymbolAccess>(self, symbols: &S) -> Vec<u8> {
                let mut out = Vec::with_capacity((self.0.end - self.0.start) as usize);
                symbols.decode_into(self.0, &mut out);
                out
            }
        }
        self.accept(Decode(range))
    }

    /// Positions of all separator symbols
    pub fn separator_positions(&self) -> Vec<u64> {
        match &self.repr {
            Representation::Bit(s) => s.separators.clone(),
            Representation::Uchar(s) => s.separators.clone(),
            Representation::Ushort(s) => s.separators.clone(),
            Representation::Uint32(s) => s.separators.clone(),
            Representation::Eqlen(s) => {
                let period = s.seq_len + 1;
                (1..)
                    .map(|k| k * period - 1)
                    .take_while(|&p| p < s.twobit.len())
                    .collect()
            }
            _ => self
                .decode(0..self.total_length())
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c == SEPARATOR)
                .map(|(p, _)| p as u64)
                .collect(),
        }
    }

    /// Serialized payload size in bytes
    pub fn size_in_bytes(&self) -> u64 {
        let separators = |s: &[u64]| 8 + s.len() as u64 * 8;
        8 + match &self.repr {
            Representation::Direct(s) => s.codes.len() as u64,
            Representation::Bytecompress(s) => 12 + s.packed.size_in_bytes(),
            Representation::Eqlen(s) => 16 + s.twobit.size_in_bytes(),
            Representation::Bit(s) => {
                16 + s.twobit.size_in_bytes()
                    + s.specials.as_array().size_in_bytes()
                    + separators(&s.separators)
            }
            Representation::Uchar(s) => range_payload_size(s),
            Representation::Ushort(s) => range_payload_size(s),
            Representation::Uint32(s) => range_payload_size(s),
        }
    }

    /// Write the satellite payload (the header is written by the caller)
    pub fn write_payload<Wr: Write>(&self, writer: &mut Wr) -> io::Result<()> {
        write_u64_le(writer, self.num_chars as u64)?;
        match &self.repr {
            Representation::Direct(s) => writer.write_all(&s.codes),
            Representation::Bytecompress(s) => {
                write_uint_le(writer, s.packed.bits() as u64, 4)?;
                write_packed(writer, &s.packed)
            }
            Representation::Eqlen(s) => {
                write_u64_le(writer, s.seq_len)?;
                write_packed(writer, &s.twobit)
            }
            Representation::Bit(s) => {
                write_packed(writer, &s.twobit)?;
                write_packed(writer, s.specials.as_array())?;
                write_positions(writer, &s.separators)
            }
            Representation::Uchar(s) => write_range_specials(writer, s),
            Representation::Ushort(s) => write_range_specials(writer, s),
            Representation::Uint32(s) => write_range_specials(writer, s),
        }
    }

    /// Read a payload written by [`write_payload`](Self::write_payload)
    pub fn read_payload(kind: SatelliteKind, total_length: u64, cursor: &mut Cursor<'_>) -> Result<Self> {
        let num_chars = cursor.u64()? as usize;
        if num_chars == 0 || num_chars > alphabet::MAX_CHARS {
            return Err(cursor.corrupt(format!("invalid alphabet size {}", num_chars)));
        }
        let bits = alphabet::bits_for(num_chars as u64);
        let repr = match kind {
            SatelliteKind::Direct => {
                let codes = cursor.take(total_length as usize)?.to_vec();
                Representation::Direct(DirectSymbols { codes, bits })
            }
            SatelliteKind::Bytecompress => {
                let packed_bits = cursor.uint(4)? as u32;
                Representation::Bytecompress(ByteCompressed {
                    packed: read_packed(cursor, packed_bits, total_length)?,
                    num_chars: num_chars as u64,
                    bits,
                })
            }
            SatelliteKind::Eqlen => {
                let seq_len = cursor.u64()?;
                Representation::Eqlen(EqualLength {
                    twobit: read_packed(cursor, 2, total_length)?,
                    seq_len,
                })
            }
            SatelliteKind::Bit => {
                let twobit = read_packed(cursor, 2, total_length)?;
                let specials = BitVector::from_array(read_packed(cursor, 1, total_length)?)
                    .ok_or_else(|| cursor.corrupt("special bitmap has the wrong width"))?;
                let separators = read_positions(cursor)?;
                Representation::Bit(BitSpecials {
                    twobit,
                    specials,
                    separators,
                })
            }
            SatelliteKind::Uchar => Representation::Uchar(read_range_specials(cursor, total_length)?),
            SatelliteKind::Ushort => Representation::Ushort(read_range_specials(cursor, total_length)?),
            SatelliteKind::Uint32 => Representation::Uint32(read_range_specials(cursor, total_length)?),
        };
        if cursor.remaining() != 0 {
            return Err(cursor.corrupt(format!(
                "{} unexpected trailing bytes after the {} satellite",
                cursor.remaining(),
                kind
            )));
        }
        Ok(Self { num_chars, repr })
    }
}

fn range_specials<W: RangeWidth>(codes: &[u8], stats: &TextStats) -> RangeSpecials<W> {
    RangeSpecials {
        twobit: twobit_of(codes),
        specials: SpecialRangeTable::from_ranges(&stats.special_ranges, stats.total_length),
        separators: stats.separators.clone(),
    }
}

fn range_payload_size<W: RangeWidth>(s: &RangeSpecials<W>) -> u64 {
    8 + s.twobit.size_in_bytes() + s.specials.size_in_bytes() + 8 + s.separators.len() as u64 * 8
}

fn write_packed<Wr: Write>(writer: &mut Wr, packed: &BitPackedArray) -> io::Result<()> {
    write_u64_le(writer, packed.words().len() as u64)?;
    write_words_le(writer, packed.words())
}

fn read_packed(cursor: &mut Cursor<'_>, bits: u32, len: u64) -> Result<BitPackedArray> {
    let count = cursor.u64()? as usize;
    let words = cursor.words(count)?;
    BitPackedArray::from_words(bits, len, words)
        .ok_or_else(|| cursor.corrupt(format!("packed array of {} words does not hold {} symbols", count, len)))
}

fn write_positions<Wr: Write>(writer: &mut Wr, positions: &[u64]) -> io::Result<()> {
    write_u64_le(writer, positions.len() as u64)?;
    write_words_le(writer, positions)
}

fn read_positions(cursor: &mut Cursor<'_>) -> Result<Vec<u64>> {
    let count = cursor.u64()? as usize;
    let positions = cursor.words(count)?;
    if positions.windows(2).any(|w| w[0] >= w[1]) {
        return Err(cursor.corrupt("separator positions are not increasing"));
    }
    Ok(positions)
}

fn write_range_specials<W: RangeWidth, Wr: Write>(writer: &mut Wr, s: &RangeSpecials<W>) -> io::Result<()> {
    write_packed(writer, &s.twobit)?;
    s.specials.write(writer)?;
    write_positions(writer, &s.separators)
}

fn read_range_specials<W: RangeWidth>(cursor: &mut Cursor<'_>, total_length: u64) -> Result<RangeSpecials<W>> {
    let twobit = read_packed(cursor, 2, total_length)?;
    let specials = SpecialRangeTable::read(cursor, total_length)?;
    let separators = read_positions(cursor)?;
    Ok(RangeSpecials {
        twobit,
        specials,
        separators,
    })
}

/// Entry width used for positions in this text
pub fn position_width(total_length: u64) -> usize {
    entry_width_for(total_length)
}
