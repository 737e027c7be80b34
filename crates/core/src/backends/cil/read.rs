//! Little-endian byte cursor shared by the metadata readers.

/// Forward-only reader over a byte slice. Every accessor returns `None`
/// instead of running past the end, so truncated input surfaces as a single
/// failure at the call site.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn skip(&mut self, count: usize) -> Option<()> {
        let end = self.pos.checked_add(count)?;
        if end > self.bytes.len() {
            return None;
        }
        self.pos = end;
        Some(())
    }

    pub fn bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn u8(&mut self) -> Option<u8> {
        let value = self.peek_u8()?;
        self.pos += 1;
        Some(value)
    }

    pub fn u16(&mut self) -> Option<u16> {
        let raw = self.bytes(2)?;
        Some(u16::from_le_bytes([raw[0], raw[1]]))
    }

    pub fn u32(&mut self) -> Option<u32> {
        let raw = self.bytes(4)?;
        Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn u64(&mut self) -> Option<u64> {
        let raw = self.bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Some(u64::from_le_bytes(buf))
    }

    /// ECMA-335 II.23.2 compressed unsigned integer: 1, 2 or 4 bytes wide
    /// depending on the leading bits.
    pub fn compressed_u32(&mut self) -> Option<u32> {
        let first = self.u8()?;
        if first & 0x80 == 0 {
            Some(u32::from(first))
        } else if first & 0xC0 == 0x80 {
            let second = self.u8()?;
            Some((u32::from(first & 0x3F) << 8) | u32::from(second))
        } else if first & 0xE0 == 0xC0 {
            let rest = self.bytes(3)?;
            Some(
                (u32::from(first & 0x1F) << 24)
                    | (u32::from(rest[0]) << 16)
                    | (u32::from(rest[1]) << 8)
                    | u32::from(rest[2]),
            )
        } else {
            None
        }
    }
}
