//! Suffix array table writer
//!
//! Serializes the suffix array and its derived tables. Every payload follows
//! the table header written by the index writer.

use super::types::{BucketEntry, SuffixEntry};
use crate::utils::{write_u64_le, write_uint_le};
use std::io::{self, Write};

/// LCP byte marking a value stored in the exception list
pub const LCP_ESCAPE: u8 = u8::MAX;

/// Writes suffix array tables
pub struct SuffixArrayWriter;

impl SuffixArrayWriter {
    /// `suf`: one `width`-byte entry per rank
    pub fn write_suffixes<W: Write>(writer: &mut W, suffixes: &[SuffixEntry], width: usize) -> io::Result<()> {
        // Using a buffer to reduce system call overhead
        let mut buffer = Vec::with_capacity(8 * 1024);
        for &entry in suffixes {
            buffer.extend_from_slice(&entry.to_le_bytes()[..width]);
            if buffer.len() >= 8 * 1024 {
                writer.write_all(&buffer)?;
                buffer.clear();
            }
        }
        if !buffer.is_empty() {
            writer.write_all(&buffer)?;
        }
        Ok(())
    }

    /// `lcp`: one byte per rank, then the (rank, value) pairs of every
    /// value that does not fit below [`LCP_ESCAPE`]
    pub fn write_lcp<W: Write>(writer: &mut W, lcp: &[u64]) -> io::Result<()> {
        let mut exceptions = Vec::new();
        let small: Vec<u8> = lcp
            .iter()
            .enumerate()
            .map(|(rank, &value)| {
                if value >= LCP_ESCAPE as u64 {
                    exceptions.push((rank as u64, value));
                    LCP_ESCAPE
                } else {
                    value as u8
                }
            })
            .collect();
        writer.write_all(&small)?;

        write_u64_le(writer, exceptions.len() as u64)?;
        for (rank, value) in exceptions {
            write_u64_le(writer, rank)?;
            write_u64_le(writer, value)?;
        }
        Ok(())
    }

    /// `bwt`: one symbol code per rank
    pub fn write_bwt<W: Write>(writer: &mut W, bwt: &[u8]) -> io::Result<()> {
        writer.write_all(bwt)
    }

    /// `bck`: (left, count) per regular prefix code
    pub fn write_buckets<W: Write>(writer: &mut W, buckets: &[BucketEntry], width: usize) -> io::Result<()> {
        for bucket in buckets {
            write_uint_le(writer, bucket.left, width)?;
            write_uint_le(writer, bucket.count, width)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_widths() {
        let mut narrow = Vec::new();
        SuffixArrayWriter::write_suffixes(&mut narrow, &[3, 0, 2, 1], 4).unwrap();
        assert_eq!(narrow.len(), 16);
        assert_eq!(&narrow[..4], &[3, 0, 0, 0]);

        let mut wide = Vec::new();
        SuffixArrayWriter::write_suffixes(&mut wide, &[1 << 33], 8).unwrap();
        assert_eq!(wide, (1u64 << 33).to_le_bytes());
    }

    #[test]
    fn test_lcp_exceptions() {
        let mut buf = Vec::new();
        SuffixArrayWriter::write_lcp(&mut buf, &[0, 3, 254, 255, 1000]).unwrap();
        assert_eq!(&buf[..5], &[0, 3, 254, LCP_ESCAPE, LCP_ESCAPE]);
        assert_eq!(buf.len(), 5 + 8 + 2 * 16);
        assert_eq!(u64::from_le_bytes(buf[5..13].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(buf[13..21].try_into().unwrap()), 3);
        assert_eq!(u64::from_le_bytes(buf[21..29].try_into().unwrap()), 255);
    }
}
