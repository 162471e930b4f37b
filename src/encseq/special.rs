//! Paged tables of wildcard ranges for the `uchar`, `ushort` and `uint32`
//! satellites.
//!
//! The text is divided into pages of `2^W::BITS` positions. A wildcard run
//! is split at page boundaries and each piece stored as its offset within
//! the page and its length minus one, both of width `W`. `page_ends[p]` is
//! the number of pieces in pages `0..=p`.

use super::Cursor;
use crate::error::Result;
use crate::utils::{write_u64_le, write_uint_le};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::ops::Range;

/// Integer width of a range table
pub trait RangeWidth: Copy + Send + Sync + 'static {
    const BITS: u32;
    const BYTES: usize = (Self::BITS / 8) as usize;
}

impl RangeWidth for u8 {
    const BITS: u32 = 8;
}

impl RangeWidth for u16 {
    const BITS: u32 = 16;
}

impl RangeWidth for u32 {
    const BITS: u32 = 32;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialRangeTable<W> {
    starts: Vec<u32>,
    last_offsets: Vec<u32>,
    page_ends: Vec<u64>,
    _width: PhantomData<W>,
}

impl<W: RangeWidth> SpecialRangeTable<W> {
    const PAGE: u64 = 1 << W::BITS;

    /// Build from sorted, disjoint ranges over a text of `total_length`
    pub fn from_ranges(ranges: &[Range<u64>], total_length: u64) -> Self {
        let pages = total_length.div_ceil(Self::PAGE).max(1) as usize;
        let mut table = Self {
            starts: Vec::new(),
            last_offsets: Vec::new(),
            page_ends: vec![0; pages],
            _width: PhantomData,
        };
        for range in ranges {
            let mut start = range.start;
            while start < range.end {
                let page = start / Self::PAGE;
                let page_limit = (page + 1) * Self::PAGE;
                let end = range.end.min(page_limit);
                table.starts.push((start % Self::PAGE) as u32);
                table.last_offsets.push((end - start - 1) as u32);
                table.page_ends[page as usize] += 1;
                start = end;
            }
        }
        for p in 1..pages {
            table.page_ends[p] += table.page_ends[p - 1];
        }
        table
    }

    /// Number of pieces needed to store `ranges`
    pub fn pieces_for(ranges: &[Range<u64>]) -> u64 {
        ranges
            .iter()
            .map(|r| (r.end - 1) / Self::PAGE - r.start / Self::PAGE + 1)
            .sum()
    }

    /// Serialized size of a table with `pieces` pieces over `total_length`
    pub fn size_for(pieces: u64, total_length: u64) -> u64 {
        let pages = total_length.div_ceil(Self::PAGE).max(1);
        pieces * 2 * W::BYTES as u64 + pages * 8 + 8
    }

    pub fn num_pieces(&self) -> usize {
        self.starts.len()
    }

    fn page_pieces(&self, page: usize) -> Range<usize> {
        let start = if page == 0 { 0 } else { self.page_ends[page - 1] as usize };
        start..self.page_ends[page] as usize
    }

    /// True when `pos` lies inside a stored range
    pub fn contains(&self, pos: u64) -> bool {
        let page = (pos / Self::PAGE) as usize;
        if page >= self.page_ends.len() {
            return false;
        }
        let offset = (pos % Self::PAGE) as u32;
        let pieces = self.page_pieces(page);
        let starts = &self.starts[pieces.clone()];
        let after = starts.partition_point(|&s| s <= offset);
        if after == 0 {
            return false;
        }
        let k = pieces.start + after - 1;
        offset <= self.starts[k] + self.last_offsets[k]
    }

    /// First position in `[from, to)` inside a stored range
    pub fn first_in(&self, from: u64, to: u64) -> Option<u64> {
        if from >= to {
            return None;
        }
        let first_page = (from / Self::PAGE) as usize;
        let last_page = (((to - 1) / Self::PAGE) as usize).min(self.page_ends.len() - 1);
        for page in first_page..=last_page {
            let base = page as u64 * Self::PAGE;
            for k in self.page_pieces(page) {
                let start = base + self.starts[k] as u64;
                let end = start + self.last_offsets[k] as u64 + 1;
                if end > from {
                    let hit = start.max(from);
                    return (hit < to).then_some(hit);
                }
            }
        }
        None
    }

    /// All stored ranges, pieces of one run merged again
    pub fn ranges(&self) -> Vec<Range<u64>> {
        let mut ranges: Vec<Range<u64>> = Vec::with_capacity(self.num_pieces());
        for page in 0..self.page_ends.len() {
            let base = page as u64 * Self::PAGE;
            for k in self.page_pieces(page) {
                let start = base + self.starts[k] as u64;
                let end = start + self.last_offsets[k] as u64 + 1;
                match ranges.last_mut() {
                    Some(last) if last.end == start => last.end = end,
                    _ => ranges.push(start..end),
                }
            }
        }
        ranges
    }

    pub fn size_in_bytes(&self) -> u64 {
        Self::size_for(self.num_pieces() as u64, self.page_ends.len() as u64 * Self::PAGE)
    }

    pub fn write<Wr: Write>(&self, writer: &mut Wr) -> io::Result<()> {
        write_u64_le(writer, self.num_pieces() as u64)?;
        for &p in &self.page_ends {
            write_u64_le(writer, p)?;
        }
        for (&start, &last) in self.starts.iter().zip(&self.last_offsets) {
            write_uint_le(writer, start as u64, W::BYTES)?;
            write_uint_le(writer, last as u64, W::BYTES)?;
        }
        Ok(())
    }

    pub fn read(cursor: &mut Cursor<'_>, total_length: u64) -> Result<Self> {
        let pieces = cursor.u64()? as usize;
        let pages = total_length.div_ceil(Self::PAGE).max(1) as usize;
        let mut page_ends = Vec::with_capacity(pages);
        for _ in 0..pages {
            page_ends.push(cursor.u64()?);
        }
        if page_ends.last().copied() != Some(pieces as u64)
            || page_ends.windows(2).any(|w| w[0] > w[1])
        {
            return Err(cursor.corrupt("wildcard range page table is inconsistent"));
        }
        let mut starts = Vec::with_capacity(pieces);
        let mut last_offsets = Vec::with_capacity(pieces);
        for _ in 0..pieces {
            starts.push(cursor.uint(W::BYTES)? as u32);
            last_offsets.push(cursor.uint(W::BYTES)? as u32);
        }
        Ok(Self {
            starts,
            last_offsets,
            page_ends,
            _width: PhantomData,
        })
    }
}
