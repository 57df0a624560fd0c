//! Shadow-cursor shim between a decoder library and a shared [`DataIo`].
//!
//! The decoder issues read, seek and tell callbacks whenever it likes,
//! including during look-ahead and re-sync. Other holders of the same
//! storage handle may move its cursor in between. The shim therefore keeps
//! its own copy of the position and puts the storage back there before any
//! operation that depends on it:
//!
//! * read: seek storage to the shadow cursor, read, record `tell()`.
//! * seek: for `Current`, seek storage to the shadow cursor first; always
//!   record `tell()` afterwards, even on failure.
//! * tell: answer from the shadow cursor, never from storage.
//!
//! [`DataIo`]: crate::engine::io::DataIo

use std::io::{self, Read, Seek, SeekFrom};

use symphonia::core::io::MediaSource;
use tracing::{error, trace};

use crate::engine::io::{DioSeek, SharedDataIo};

/// Callback context handed to the decoder library.
pub struct CursorShim {
    dio: SharedDataIo,
    cursor: i64,
}

impl CursorShim {
    pub fn new(dio: SharedDataIo) -> Self {
        Self { dio, cursor: 0 }
    }

    pub fn storage(&self) -> &SharedDataIo {
        &self.dio
    }

    /// Read callback. Returns the number of bytes transferred; a short count
    /// is the end-of-stream signal, and 0 also covers a failed re-sync.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut dio = self.dio.lock();

        if !dio.seek(self.cursor, DioSeek::Set) {
            error!(cursor = self.cursor, "Failed to restore DataIO cursor!");
            return 0;
        }

        let read = dio.read(buf);
        self.cursor = dio.tell();

        trace!(requested = buf.len(), read, cursor = self.cursor, "shim read");
        read
    }

    /// Seek callback. Returns 0 on success and -1 on failure.
    pub fn seek_to(&mut self, offset: i64, origin: DioSeek) -> i32 {
        let mut dio = self.dio.lock();

        // Current is relative to where the decoder last saw the stream.
        if origin == DioSeek::Current && !dio.seek(self.cursor, DioSeek::Set) {
            error!(cursor = self.cursor, "Failed to restore DataIO cursor!");
            return -1;
        }

        let result = dio.seek(offset, origin);
        self.cursor = dio.tell();

        trace!(offset, ?origin, result, cursor = self.cursor, "shim seek");
        if result {
            0
        } else {
            -1
        }
    }

    /// Tell callback.
    pub fn tell(&self) -> i64 {
        self.cursor
    }
}

impl Read for CursorShim {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_bytes(buf))
    }
}

impl Seek for CursorShim {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset out of range")
                })?;
                (offset, DioSeek::Set)
            }
            SeekFrom::Current(offset) => (offset, DioSeek::Current),
            SeekFrom::End(offset) => (offset, DioSeek::End),
        };

        if self.seek_to(offset, origin) != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "DataIO seek failed",
            ));
        }
        self.stream_position()
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        u64::try_from(self.tell())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "DataIO cursor is undefined"))
    }
}

impl MediaSource for CursorShim {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        let dio = self.dio.lock();
        if !dio.is_open() {
            return None;
        }
        Some(dio.size() as u64)
    }
}
