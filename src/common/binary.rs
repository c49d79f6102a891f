// Little-endian reading over in-memory stream contents
//
// Compound file streams (EncryptionInfo) are small and read fully into memory
// before parsing, so readers work over byte slices rather than file handles.

use crate::error::{DocIdError, DocIdResult};

/// Forward-only cursor over a byte slice
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current offset
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read exact bytes from current position
    pub fn read_bytes(&mut self, length: usize) -> DocIdResult<&'a [u8]> {
        if length > self.remaining() {
            return Err(DocIdError::EncryptionInfo(format!(
                "Truncated: wanted {} bytes at offset {}, {} left",
                length,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + length];
        self.pos += length;
        Ok(bytes)
    }

    /// Everything after the current position
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Read u16 little-endian
    pub fn read_u16_le(&mut self) -> DocIdResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read u32 little-endian
    pub fn read_u32_le(&mut self) -> DocIdResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Encode a password the way Office key derivation expects (UTF-16LE, no terminator)
pub fn utf16le_bytes(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode a UTF-16LE buffer, stopping at the first NUL
pub fn utf16le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le().unwrap(), 0x12345678);
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.read_rest(), &[0xAA]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_is_an_error() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = ByteReader::new(&data);
        assert!(matches!(reader.read_u32_le(), Err(DocIdError::EncryptionInfo(_))));
        // A failed read does not advance the cursor
        assert_eq!(reader.read_u16_le().unwrap(), 0x0201);
    }

    #[test]
    fn test_utf16le_round_trip() {
        let encoded = utf16le_bytes("Velvet");
        assert_eq!(encoded.len(), 12);
        assert_eq!(&encoded[..4], &[b'V', 0, b'e', 0]);

        let mut terminated = encoded.clone();
        terminated.extend_from_slice(&[0, 0, b'x', 0]);
        assert_eq!(utf16le_to_string(&terminated), "Velvet");
    }
}
