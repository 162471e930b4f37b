//! Suffix array table reader
//!
//! Decodes the payloads written by [`SuffixArrayWriter`](super::SuffixArrayWriter)
//! from a mapped table, rejecting truncated or malformed data.
//! [`TableStream`] and [`LcpStream`] decode the same payloads entry by entry
//! through a fixed-size buffer.

use super::types::{BucketEntry, SuffixEntry};
use super::writer::LCP_ESCAPE;
use crate::encseq::Cursor;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Buffer size of a streamed table
pub const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Reads suffix array tables
pub struct SuffixArrayReader;

impl SuffixArrayReader {
    fn check_width(cursor: &Cursor<'_>, width: usize) -> Result<()> {
        if width == 4 || width == 8 {
            Ok(())
        } else {
            Err(cursor.corrupt(format!("unsupported entry width {}", width)))
        }
    }

    pub fn read_suffixes(cursor: &mut Cursor<'_>, count: u64, width: usize) -> Result<Vec<SuffixEntry>> {
        Self::check_width(cursor, width)?;
        let bytes = cursor.take((count as usize).saturating_mul(width))?;
        Ok(bytes
            .chunks_exact(width)
            .map(|chunk| crate::utils::decode_uint_le(chunk, width))
            .collect())
    }

    pub fn read_lcp(cursor: &mut Cursor<'_>, count: u64) -> Result<Vec<u64>> {
        let small = cursor.take(count as usize)?;
        let mut lcp: Vec<u64> = small.iter().map(|&b| b as u64).collect();
        let escaped: Vec<usize> = small
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == LCP_ESCAPE)
            .map(|(i, _)| i)
            .collect();

        let exceptions = cursor.u64()?;
        if exceptions != escaped.len() as u64 {
            return Err(cursor.corrupt(format!(
                "lcp table escapes {} values but lists {} exceptions",
                escaped.len(),
                exceptions
            )));
        }
        for &expected in &escaped {
            let rank = cursor.u64()?;
            let value = cursor.u64()?;
            if rank != expected as u64 || value < LCP_ESCAPE as u64 {
                return Err(cursor.corrupt(format!("lcp exception for rank {} is invalid", rank)));
            }
            lcp[expected] = value;
        }
        Ok(lcp)
    }

    pub fn read_bwt(cursor: &mut Cursor<'_>, count: u64) -> Result<Vec<u8>> {
        Ok(cursor.take(count as usize)?.to_vec())
    }

    pub fn read_buckets(cursor: &mut Cursor<'_>, count: u64, width: usize) -> Result<Vec<BucketEntry>> {
        Self::check_width(cursor, width)?;
        let bytes = cursor.take((count as usize).saturating_mul(2 * width))?;
        Ok(bytes
            .chunks_exact(2 * width)
            .map(|pair| BucketEntry {
                left: crate::utils::decode_uint_le(pair, width),
                count: crate::utils::decode_uint_le(&pair[width..], width),
            })
            .collect())
    }
}

/// Sequential reader over one table file
pub struct TableStream {
    reader: BufReader<File>,
    path: PathBuf,
    index: PathBuf,
}

impl TableStream {
    /// Open `path` positioned at `offset`; errors name the index `index`
    pub fn open(path: &Path, index: &Path, offset: u64) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| Error::file("open", path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::file("seek in", path, e))?;
        Ok(Self {
            reader: BufReader::with_capacity(STREAM_BUFFER_SIZE, file),
            path: path.to_path_buf(),
            index: index.to_path_buf(),
        })
    }

    pub fn corrupt(&self, message: impl Into<String>) -> Error {
        Error::corrupt(&self.index, message)
    }

    pub fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                self.corrupt(format!("{} ends early", self.path.display()))
            } else {
                Error::file("read", &self.path, e)
            }
        })
    }

    pub fn byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    /// Little-endian unsigned integer of `width` bytes
    pub fn uint(&mut self, width: usize) -> Result<u64> {
        if width == 0 || width > 8 {
            return Err(self.corrupt(format!("unsupported entry width {}", width)));
        }
        let mut buf = [0u8; 8];
        self.fill(&mut buf[..width])?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn bucket(&mut self, width: usize) -> Result<BucketEntry> {
        Ok(BucketEntry {
            left: self.uint(width)?,
            count: self.uint(width)?,
        })
    }
}

/// LCP values in rank order: the byte column and the exception list are
/// read side by side
pub struct LcpStream {
    small: TableStream,
    exceptions: TableStream,
    remaining: u64,
}

impl LcpStream {
    /// `payload` is the offset of the byte column of a table of `count`
    /// values
    pub fn open(path: &Path, index: &Path, payload: u64, count: u64) -> Result<Self> {
        let small = TableStream::open(path, index, payload)?;
        let mut exceptions = TableStream::open(path, index, payload + count)?;
        let remaining = exceptions.uint(8)?;
        Ok(Self {
            small,
            exceptions,
            remaining,
        })
    }

    /// Number of values listed in the exception list
    pub fn exceptions(&self) -> u64 {
        self.remaining
    }

    /// Value at `rank`; ranks must be requested in order
    pub fn next(&mut self, rank: u64) -> Result<u64> {
        let small = self.small.byte()?;
        if small != LCP_ESCAPE {
            return Ok(small as u64);
        }
        if self.remaining == 0 {
            return Err(self.small.corrupt("lcp table escapes more values than it lists"));
        }
        self.remaining -= 1;
        let listed = self.exceptions.uint(8)?;
        let value = self.exceptions.uint(8)?;
        if listed != rank || value < LCP_ESCAPE as u64 {
            return Err(self.small.corrupt(format!("lcp exception for rank {} is invalid", listed)));
        }
        Ok(value)
    }

    /// Fails when listed exceptions were never escaped
    pub fn finish(self) -> Result<()> {
        if self.remaining != 0 {
            return Err(self.small.corrupt(format!(
                "lcp table lists {} exceptions that are never escaped",
                self.remaining
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::suffix_array::SuffixArrayWriter;
    use std::path::Path;

    #[test]
    fn test_tables_read_back() {
        let path = Path::new("t");
        let mut buf = Vec::new();
        SuffixArrayWriter::write_suffixes(&mut buf, &[2, 0, 1], 4).unwrap();
        SuffixArrayWriter::write_lcp(&mut buf, &[0, 300, 7]).unwrap();
        let buckets = [BucketEntry { left: 0, count: 2 }, BucketEntry { left: 2, count: 0 }];
        SuffixArrayWriter::write_buckets(&mut buf, &buckets, 8).unwrap();

        let mut cursor = Cursor::new(&buf, path);
        assert_eq!(SuffixArrayReader::read_suffixes(&mut cursor, 3, 4).unwrap(), vec![2, 0, 1]);
        assert_eq!(SuffixArrayReader::read_lcp(&mut cursor, 3).unwrap(), vec![0, 300, 7]);
        assert_eq!(SuffixArrayReader::read_buckets(&mut cursor, 2, 8).unwrap(), buckets.to_vec());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_malformed_tables() {
        let path = Path::new("t");
        let mut cursor = Cursor::new(&[1, 2, 3], path);
        assert!(SuffixArrayReader::read_suffixes(&mut cursor, 1, 4).is_err());

        let mut cursor = Cursor::new(&[0u8; 8], path);
        assert!(SuffixArrayReader::read_suffixes(&mut cursor, 1, 3).is_err());

        // one escaped value but no exceptions listed
        let mut buf = vec![LCP_ESCAPE];
        buf.extend_from_slice(&0u64.to_le_bytes());
        let mut cursor = Cursor::new(&buf, path);
        assert!(SuffixArrayReader::read_lcp(&mut cursor, 1).is_err());
    }

    #[test]
    fn test_streams_decode_like_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.lcp");
        let lcp = [0u64, 300, 7, 255, 3];
        let mut buf = vec![9u8; 5];
        SuffixArrayWriter::write_lcp(&mut buf, &lcp).unwrap();
        std::fs::write(&path, &buf).unwrap();

        let mut stream = LcpStream::open(&path, dir.path(), 5, lcp.len() as u64).unwrap();
        assert_eq!(stream.exceptions(), 2);
        for (rank, &value) in lcp.iter().enumerate() {
            assert_eq!(stream.next(rank as u64).unwrap(), value);
        }
        stream.finish().unwrap();

        let mut table = TableStream::open(&path, dir.path(), 0).unwrap();
        assert_eq!(table.uint(4).unwrap(), 0x0909_0909);
        assert!(table.uint(9).is_err());
        let mut rest = vec![0u8; buf.len() - 4];
        table.fill(&mut rest).unwrap();
        assert!(matches!(table.byte(), Err(Error::Corrupt { ref message, .. }) if message.contains("ends early")));
    }
}
