use std::io::{self, Read, Write};

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u64 in little-endian format
pub fn read_u64_le<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write the low `width` bytes (1, 2, 4 or 8) of `value`
pub fn write_uint_le<W: Write>(writer: &mut W, value: u64, width: usize) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes()[..width])
}

/// Read a `width`-byte little-endian unsigned integer
pub fn read_uint_le<R: Read>(reader: &mut R, width: usize) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf[..width])?;
    Ok(u64::from_le_bytes(buf))
}

/// Decode a `width`-byte little-endian unsigned integer from the front of `bytes`
#[inline]
pub fn decode_uint_le(bytes: &[u8], width: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(buf)
}

/// Write a slice of u64 words in little-endian format, buffered
pub fn write_words_le<W: Write>(writer: &mut W, words: &[u64]) -> io::Result<()> {
    let mut buffer = Vec::with_capacity(8 * 1024);
    for &word in words {
        buffer.extend_from_slice(&word.to_le_bytes());
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

/// Read `count` u64 words in little-endian format
pub fn read_words_le<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<u64>> {
    let mut bytes = vec![0u8; count * 8];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| decode_uint_le(chunk, 8))
        .collect())
}

/// Smallest entry width (4 or 8 bytes) able to hold every value below `limit`
pub fn entry_width_for(limit: u64) -> usize {
    if limit <= u32::MAX as u64 { 4 } else { 8 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_widths() {
        for width in [1usize, 2, 4, 8] {
            let value = 0x0102_0304_0506_0708u64 & (u64::MAX >> (64 - 8 * width));
            let mut buf = Vec::new();
            write_uint_le(&mut buf, value, width).unwrap();
            assert_eq!(buf.len(), width);
            assert_eq!(read_uint_le(&mut buf.as_slice(), width).unwrap(), value);
            assert_eq!(decode_uint_le(&buf, width), value);
        }
    }

    #[test]
    fn test_words() {
        let words: Vec<u64> = (0..3000).map(|i| i * 0x9E37_79B9).collect();
        let mut buf = Vec::new();
        write_words_le(&mut buf, &words).unwrap();
        assert_eq!(buf.len(), words.len() * 8);
        let back = read_words_le(&mut buf.as_slice(), words.len()).unwrap();
        assert_eq!(back, words);
    }

    #[test]
    fn test_entry_width() {
        assert_eq!(entry_width_for(10), 4);
        assert_eq!(entry_width_for(u32::MAX as u64), 4);
        assert_eq!(entry_width_for(u32::MAX as u64 + 1), 8);
    }
}
