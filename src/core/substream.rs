//! A bounded window over a seekable byte source.
//!
//! The view is seek-transparent to every other holder of the base source:
//! each operation saves the base position, performs its own positioned I/O,
//! and restores the saved position before returning. The view itself carries
//! an absolute offset, so it never depends on where the base cursor happened
//! to be left.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::core::error::{CodecError, ErrorKind, Res};

#[derive(Debug)]
pub struct SubStream<S> {
    base: S,
    offset: u64,
    len: u64,
    cap: u64,
    pos: u64,
}

impl<S: Seek> SubStream<S> {
    /// A fixed window of `length` bytes starting at `offset`. Fails with
    /// `InvalidRange` when the window does not fit in the base source.
    pub fn new(mut base: S, offset: u64, length: u64) -> Res<Self> {
        if length == 0 {
            return Err(CodecError::new(ErrorKind::InvalidRange, "sub-stream length must be non-zero"));
        }
        let saved = base.stream_position()?;
        let base_len = base.seek(SeekFrom::End(0))?;
        base.seek(SeekFrom::Start(saved))?;
        if offset.checked_add(length).map_or(true, |end| end > base_len) {
            return Err(CodecError::new(
                ErrorKind::InvalidRange,
                format!("window {}+{} exceeds base length {}", offset, length, base_len),
            ));
        }
        Ok(SubStream { base, offset, len: length, cap: length, pos: 0 })
    }

    /// An initially empty window that grows with writes, up to `cap` bytes.
    pub fn output(base: S, offset: u64, cap: u64) -> Res<Self> {
        if cap == 0 {
            return Err(CodecError::new(ErrorKind::InvalidRange, "sub-stream capacity must be non-zero"));
        }
        Ok(SubStream { base, offset, len: 0, cap, pos: 0 })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Truncate or grow the view. Growing past the cap is `OutOfRangeWrite`.
    pub fn set_len(&mut self, len: u64) -> Res<()> {
        if len > self.cap {
            return Err(CodecError::new(
                ErrorKind::OutOfRangeWrite,
                format!("length {} exceeds fixed cap {}", len, self.cap),
            ));
        }
        self.len = len;
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.base
    }

    /// Run `op` with the base cursor placed at the view's current position,
    /// restoring the caller's cursor afterwards.
    fn positioned<T>(&mut self, op: impl FnOnce(&mut S) -> std::io::Result<T>) -> std::io::Result<T> {
        let saved = self.base.stream_position()?;
        self.base.seek(SeekFrom::Start(self.offset + self.pos))?;
        let result = op(&mut self.base);
        let restore = self.base.seek(SeekFrom::Start(saved));
        match (result, restore) {
            (Ok(v), Ok(_)) => Ok(v),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
        }
    }
}

impl<S: Read + Seek> Read for SubStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let left = self.len.saturating_sub(self.pos);
        if left == 0 || buf.is_empty() {
            return Ok(0);
        }
        let take = buf.len().min(left as usize);
        let n = self.positioned(|base| base.read(&mut buf[..take]))?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Write + Seek> Write for SubStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = self.pos + buf.len() as u64;
        if end > self.cap {
            return Err(CodecError::new(
                ErrorKind::OutOfRangeWrite,
                format!("write of {} bytes at {} exceeds fixed length {}", buf.len(), self.pos, self.cap),
            )
            .into());
        }
        let n = self.positioned(|base| base.write(buf))?;
        self.pos += n as u64;
        if self.pos > self.len {
            self.len = self.pos;
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.base.flush()
    }
}

impl<S: Seek> Seek for SubStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => self.len.checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        match target {
            Some(p) => {
                self.pos = p;
                Ok(p)
            }
            None => Err(CodecError::new(ErrorKind::InvalidRange, "seek before start of sub-stream").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use std::io::Cursor;

    #[test_log::test]
    fn reads_are_bounded_to_the_window() {
        let base = Cursor::new((0u8..32).collect::<Vec<u8>>());
        let mut view = SubStream::new(base, 8, 4).unwrap();
        let mut buf = Vec::new();
        view.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![8, 9, 10, 11]);
    }

    #[test_log::test]
    fn the_base_cursor_is_left_where_it_was() {
        let mut base = Cursor::new((0u8..32).collect::<Vec<u8>>());
        base.seek(SeekFrom::Start(21)).unwrap();
        let mut view = SubStream::new(base, 0, 16).unwrap();
        let mut buf = [0u8; 4];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(view.into_inner().position(), 21);
    }

    #[test_log::test]
    fn construction_rejects_windows_outside_the_base() {
        let base = Cursor::new(vec![0u8; 16]);
        let err = SubStream::new(base, 8, 9).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRange);

        let base = Cursor::new(vec![0u8; 16]);
        let err = SubStream::new(base, 0, 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRange);
    }

    #[test_log::test]
    fn writes_grow_the_view_up_to_the_cap() {
        let base = Cursor::new(vec![0u8; 16]);
        let mut view = SubStream::output(base, 4, 8).unwrap();
        view.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(view.len(), 3);
        view.write_all(&[4, 5, 6, 7, 8]).unwrap();
        assert_eq!(view.len(), 8);

        let err = view.write_all(&[9]).unwrap_err();
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<crate::core::error::CodecError>()).unwrap();
        assert_eq!(inner.kind, ErrorKind::OutOfRangeWrite);

        view.set_len(5).unwrap();
        assert_eq!(view.len(), 5);
        assert_eq!(view.set_len(9).unwrap_err().kind, ErrorKind::OutOfRangeWrite);

        let base = view.into_inner().into_inner();
        assert_eq!(&base[4..12], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test_log::test]
    fn seeks_are_relative_to_the_view() {
        let base = Cursor::new((0u8..32).collect::<Vec<u8>>());
        let mut view = SubStream::new(base, 16, 8).unwrap();
        view.seek(SeekFrom::End(-2)).unwrap();
        let mut buf = [0u8; 2];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [22, 23]);
    }
}
