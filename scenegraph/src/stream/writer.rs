//! Seekable write cursor

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::Endian;
use crate::bytecode::{ByteCodeCmd, ByteCodeOp, RECORD_SIZE};
use crate::error::{Result, SceneGraphError};

/// Writer that builds a byte buffer.
///
/// Writes land at the cursor and overwrite whatever is already there, growing
/// the buffer when the cursor passes its end. Seeking backwards does not
/// shrink the buffer; the next write simply overwrites the old bytes.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    pos: usize,
    endian: Endian,
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            endian,
        }
    }

    /// Write into an existing buffer, starting at `pos`.
    ///
    /// Used when the bytecode region sits inside a larger container that has
    /// already been laid out.
    pub fn from_vec(buf: Vec<u8>, pos: usize, endian: Endian) -> Self {
        Self { buf, pos, endian }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Total bytes in the buffer (high-water mark, not the cursor).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Seek to an absolute position. Seeking past the end zero-fills on the next write.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Move the cursor by `delta` bytes; negative values rewind.
    pub fn skip(&mut self, delta: isize) -> Result<()> {
        let target = self
            .pos
            .checked_add_signed(delta)
            .ok_or(SceneGraphError::UnexpectedEof {
                offset: self.pos,
                need: delta.unsigned_abs(),
                have: self.pos,
            })?;
        self.pos = target;
        Ok(())
    }

    pub fn write_i16(&mut self, v: i16) {
        let mut bytes = [0u8; 2];
        match self.endian {
            Endian::Big => BigEndian::write_i16(&mut bytes, v),
            Endian::Little => LittleEndian::write_i16(&mut bytes, v),
        }
        self.write_bytes(&bytes);
    }

    pub fn write_u16(&mut self, v: u16) {
        let mut bytes = [0u8; 2];
        match self.endian {
            Endian::Big => BigEndian::write_u16(&mut bytes, v),
            Endian::Little => LittleEndian::write_u16(&mut bytes, v),
        }
        self.write_bytes(&bytes);
    }

    pub fn write_u32(&mut self, v: u32) {
        let mut bytes = [0u8; 4];
        match self.endian {
            Endian::Big => BigEndian::write_u32(&mut bytes, v),
            Endian::Little => LittleEndian::write_u32(&mut bytes, v),
        }
        self.write_bytes(&bytes);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    /// The `n` bytes immediately before the cursor.
    pub fn peek_back(&self, n: usize) -> Option<&[u8]> {
        let start = self.pos.checked_sub(n)?;
        self.buf.get(start..self.pos)
    }

    /// The command record immediately before the cursor.
    ///
    /// Returns `None` if fewer than [`RECORD_SIZE`] bytes precede the cursor
    /// or the record does not hold a known opcode.
    pub fn peek_last_command(&self) -> Option<ByteCodeCmd> {
        let bytes = self.peek_back(RECORD_SIZE)?;
        let (op, idx) = match self.endian {
            Endian::Big => (
                BigEndian::read_i16(&bytes[0..2]),
                BigEndian::read_i16(&bytes[2..4]),
            ),
            Endian::Little => (
                LittleEndian::read_i16(&bytes[0..2]),
                LittleEndian::read_i16(&bytes[2..4]),
            ),
        };
        Some(ByteCodeCmd::new(ByteCodeOp::from_i16(op)?, idx))
    }

    /// Rewind over the last command record so the next write replaces it.
    pub fn undo_last_command(&mut self) -> Result<()> {
        self.skip(-(RECORD_SIZE as isize))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_big_endian() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write_i16(0x12);
        writer.write_i16(-1);
        assert_eq!(writer.into_bytes(), vec![0x00, 0x12, 0xFF, 0xFF]);
    }

    #[test]
    fn test_write_little_endian() {
        let mut writer = ByteWriter::new(Endian::Little);
        writer.write_u16(0x0102);
        writer.write_u32(0x0304_0506);
        assert_eq!(
            writer.into_bytes(),
            vec![0x02, 0x01, 0x06, 0x05, 0x04, 0x03]
        );
    }

    #[test]
    fn test_rewind_and_overwrite() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write_u32(0xAAAA_AAAA);
        writer.write_u32(0xBBBB_BBBB);
        writer.skip(-4).unwrap();
        assert_eq!(writer.position(), 4);
        writer.write_u16(0xCCCC);
        // The tail of the old record survives until overwritten
        assert_eq!(
            writer.into_bytes(),
            vec![0xAA, 0xAA, 0xAA, 0xAA, 0xCC, 0xCC, 0xBB, 0xBB]
        );
    }

    #[test]
    fn test_skip_before_start_fails() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write_u16(1);
        assert!(writer.skip(-4).is_err());
        assert_eq!(writer.position(), 2);
    }

    #[test]
    fn test_peek_back() {
        let mut writer = ByteWriter::new(Endian::Big);
        assert!(writer.peek_back(1).is_none());
        writer.write_u32(0x0102_0304);
        assert_eq!(writer.peek_back(2), Some(&[0x03, 0x04][..]));
        assert_eq!(writer.peek_back(4), Some(&[0x01, 0x02, 0x03, 0x04][..]));
        assert!(writer.peek_back(5).is_none());
    }

    #[test]
    fn test_peek_and_undo_last_command() {
        for endian in [Endian::Big, Endian::Little] {
            let mut writer = ByteWriter::new(endian);
            assert!(writer.peek_last_command().is_none());

            ByteCodeCmd::new(ByteCodeOp::Joint, 3).write(&mut writer);
            ByteCodeCmd::open().write(&mut writer);
            assert_eq!(writer.peek_last_command(), Some(ByteCodeCmd::open()));

            writer.undo_last_command().unwrap();
            assert_eq!(writer.position(), 4);
            assert_eq!(
                writer.peek_last_command(),
                Some(ByteCodeCmd::new(ByteCodeOp::Joint, 3))
            );
        }
    }

    #[test]
    fn test_write_into_existing_buffer() {
        let mut writer = ByteWriter::from_vec(vec![0xEE; 8], 2, Endian::Big);
        writer.write_u16(0x0001);
        writer.seek(10);
        writer.write_u16(0x0002);
        assert_eq!(
            writer.into_bytes(),
            vec![0xEE, 0xEE, 0x00, 0x01, 0xEE, 0xEE, 0xEE, 0xEE, 0x00, 0x00, 0x00, 0x02]
        );
    }
}
