//! Little-endian primitives and LZ4 chunk framing for network images.
//!
//! An image is `MAGIC`, a `u32` version, then a sequence of chunks:
//!
//! - tag: `[u8; 4]`
//! - len: `u32` (bytes following, including the 4-byte uncompressed length)
//! - uncompressed_len: `u32`
//! - LZ4 block

use std::io::{self, Read, Write};

pub const MAGIC: &[u8; 8] = b"SELNET01";
pub const VERSION_V1: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_V1;

pub fn compress_lz4(input: &[u8]) -> Vec<u8> {
    lz4_flex::compress(input)
}

pub fn decompress_lz4(input: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
    lz4_flex::decompress(input, expected_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "lz4 decompression failed"))
}

/// Sink that only counts bytes; used to size an image without buffering it.
#[derive(Debug, Default)]
pub struct CountingWriter {
    written: usize,
}

impl CountingWriter {
    pub fn new() -> Self {
        Self { written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl Write for CountingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written = self.written.saturating_add(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_all(&[v])
}

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_u64_le<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_f32_le<W: Write>(w: &mut W, v: f32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

/// Lengths and indices are stored as `u32`.
pub fn write_len<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    let n = u32::try_from(n).map_err(|_| invalid("length does not fit in u32"))?;
    write_u32_le(w, n)
}

pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_len(w, bytes.len())?;
    w.write_all(bytes)
}

pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_bytes(w, s.as_bytes())
}

pub fn read_exact<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    Ok(read_exact::<1, _>(r)?[0])
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    Ok(u64::from_le_bytes(read_exact::<8, _>(r)?))
}

pub fn read_f32_le<R: Read>(r: &mut R) -> io::Result<f32> {
    Ok(f32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_len<R: Read>(r: &mut R) -> io::Result<usize> {
    Ok(read_u32_le(r)? as usize)
}

pub fn read_bool<R: Read>(r: &mut R) -> io::Result<bool> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(invalid("invalid bool byte")),
    }
}

pub fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let n = read_len(r)?;
    let mut buf = Vec::new();
    r.take(n as u64).read_to_end(&mut buf)?;
    if buf.len() != n {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated byte string",
        ));
    }
    Ok(buf)
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let bytes = read_bytes(r)?;
    String::from_utf8(bytes).map_err(|_| invalid("invalid utf-8 string"))
}

/// Write one LZ4-compressed chunk.
pub fn write_chunk_lz4<W: Write>(w: &mut W, tag: [u8; 4], payload: &[u8]) -> io::Result<()> {
    let compressed = compress_lz4(payload);
    let uncompressed_len =
        u32::try_from(payload.len()).map_err(|_| invalid("chunk too large"))?;
    let total_len = 4u32.saturating_add(
        u32::try_from(compressed.len()).map_err(|_| invalid("chunk too large"))?,
    );

    w.write_all(&tag)?;
    write_u32_le(w, total_len)?;
    write_u32_le(w, uncompressed_len)?;
    w.write_all(&compressed)
}

pub fn read_chunk_header<R: Read>(r: &mut R) -> io::Result<([u8; 4], u32)> {
    let tag = read_exact::<4, _>(r)?;
    let len = read_u32_le(r)?;
    Ok((tag, len))
}

/// Read and decompress the body of a chunk whose header has been consumed.
pub fn read_chunk_payload<R: Read>(r: &mut R, len: u32) -> io::Result<Vec<u8>> {
    let mut take = r.take(len as u64);
    let uncompressed_len = read_u32_le(&mut take)? as usize;
    let mut compressed = Vec::new();
    take.read_to_end(&mut compressed)?;
    if compressed.len() + 4 != len as usize {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "truncated chunk",
        ));
    }
    decompress_lz4(&compressed, uncompressed_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_framing_survives_a_round_trip() {
        let payload: Vec<u8> = (0..200u32).flat_map(|i| (i % 7).to_le_bytes()).collect();
        let mut buf = Vec::new();
        write_chunk_lz4(&mut buf, *b"TEST", &payload).unwrap();

        let mut r = io::Cursor::new(buf);
        let (tag, len) = read_chunk_header(&mut r).unwrap();
        assert_eq!(&tag, b"TEST");
        assert_eq!(read_chunk_payload(&mut r, len).unwrap(), payload);
    }

    #[test]
    fn truncated_chunk_is_an_error() {
        let mut buf = Vec::new();
        write_chunk_lz4(&mut buf, *b"TEST", &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        buf.truncate(buf.len() - 2);

        let mut r = io::Cursor::new(buf);
        let (_, len) = read_chunk_header(&mut r).unwrap();
        assert!(read_chunk_payload(&mut r, len).is_err());
    }

    #[test]
    fn oversized_chunk_length_fails_without_reserving_it() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"HUGE");
        write_u32_le(&mut buf, u32::MAX).unwrap();
        write_u32_le(&mut buf, 16).unwrap();
        buf.extend_from_slice(&[0u8; 6]);

        let mut r = io::Cursor::new(buf);
        let (_, len) = read_chunk_header(&mut r).unwrap();
        let err = read_chunk_payload(&mut r, len).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn counting_writer_counts() {
        let mut cw = CountingWriter::new();
        write_string(&mut cw, "abc").unwrap();
        write_u64_le(&mut cw, 9).unwrap();
        assert_eq!(cw.written(), 4 + 3 + 8);
    }

    #[test]
    fn strings_reject_bad_utf8() {
        let mut buf = Vec::new();
        write_bytes(&mut buf, &[0xff, 0xfe]).unwrap();
        assert!(read_string(&mut io::Cursor::new(buf)).is_err());
    }
}
