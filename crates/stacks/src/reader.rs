//! Bounds-checked big-endian reader over a byte slice.

use sidecar_core::error::{DecodeError, DecodeResult};

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Bytes consumed since `start`.
    pub fn since(&self, start: usize) -> &'a [u8] {
        &self.bytes[start..self.offset]
    }

    pub fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// UTF-8 string with a one-byte length prefix.
    pub fn short_string(&mut self, field: &'static str) -> DecodeResult<String> {
        let len = self.u8()? as usize;
        self.utf8(len, field)
    }

    /// UTF-8 string with a four-byte length prefix.
    pub fn long_string(&mut self, field: &'static str) -> DecodeResult<String> {
        let len = self.u32()? as usize;
        self.utf8(len, field)
    }

    fn utf8(&mut self, len: usize, field: &'static str) -> DecodeResult<String> {
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_integers() {
        let bytes = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.u8().unwrap(), 1);
        assert_eq!(reader.u16().unwrap(), 2);
        assert_eq!(reader.u32().unwrap(), 3);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_short_read_reports_offset_and_shortfall() {
        let bytes = [0xaa, 0x00, 0x01];
        let mut reader = ByteReader::new(&bytes);
        reader.u8().unwrap();
        assert_eq!(
            reader.u64(),
            Err(DecodeError::UnexpectedEof {
                offset: 1,
                needed: 6
            })
        );
        // Failed reads consume nothing
        assert_eq!(reader.offset(), 1);
    }

    #[test]
    fn test_strings_must_be_utf8() {
        let mut reader = ByteReader::new(&[0x02, b'o', b'k']);
        assert_eq!(reader.short_string("name").unwrap(), "ok");

        let mut reader = ByteReader::new(&[0x00, 0x00, 0x00, 0x01, 0xff]);
        assert_eq!(
            reader.long_string("code"),
            Err(DecodeError::InvalidUtf8("code"))
        );
    }
}
