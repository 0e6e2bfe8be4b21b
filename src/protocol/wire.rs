//! Little-endian wire primitives.
//!
//! All multi-byte scalars travel least-significant byte first. Strings are
//! an `i32` byte length followed by UTF-8 bytes, no terminator. The reader
//! never panics on short input; every read reports [`WireError::Underrun`]
//! with what it needed and what was left.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Growable output buffer with typed little-endian writes.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the accumulated bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    /// Length-prefixed UTF-8 string.
    pub fn put_string(&mut self, v: &str) -> Result<()> {
        let len = i32::try_from(v.len()).map_err(|_| {
            WireError::Malformed(format!("string of {} bytes exceeds wire limit", v.len()))
        })?;
        self.buf.put_i32_le(len);
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    /// Length-prefixed element count for lists and maps.
    pub fn put_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| {
            WireError::Malformed(format!("container of {count} elements exceeds wire limit"))
        })?;
        self.buf.put_i32_le(count);
        Ok(())
    }
}

/// Cursor over received bytes with typed little-endian reads.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::Underrun {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    /// Length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| WireError::Malformed(format!("negative string length {len}")))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| WireError::Malformed(format!("invalid UTF-8 in string: {e}")))
    }

    /// Length-prefixed element count for lists and maps.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| WireError::Malformed(format!("negative element count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut writer = WireWriter::new();
        writer.put_bool(true);
        writer.put_i8(-5);
        writer.put_u16(0xBEEF);
        writer.put_i32(-1_000_000);
        writer.put_u64(u64::MAX);
        writer.put_f64(2.5);
        let bytes = writer.finish();

        let mut reader = WireReader::new(&bytes);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_i8().unwrap(), -5);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_i32().unwrap(), -1_000_000);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX);
        assert_eq!(reader.read_f64().unwrap(), 2.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut writer = WireWriter::new();
        writer.put_u32(0x0403_0201);
        assert_eq!(&writer.finish()[..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_string_layout_and_round_trip() {
        let mut writer = WireWriter::new();
        writer.put_string("hi").unwrap();
        let bytes = writer.finish();
        assert_eq!(&bytes[..], &[2, 0, 0, 0, b'h', b'i']);

        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "hi");
    }

    #[test]
    fn test_underrun_reports_needed_and_remaining() {
        let mut reader = WireReader::new(&[1, 2]);
        let err = reader.read_u32().unwrap_err();
        match err {
            WireError::Underrun { needed, remaining } => {
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_negative_string_length_is_malformed() {
        let mut writer = WireWriter::new();
        writer.put_i32(-1);
        let bytes = writer.finish();

        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_string().unwrap_err(),
            WireError::Malformed(_)
        ));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut writer = WireWriter::new();
        writer.put_i32(2);
        writer.put_u8(0xFF);
        writer.put_u8(0xFE);
        let bytes = writer.finish();

        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_string().unwrap_err(),
            WireError::Malformed(_)
        ));
    }
}
