pub mod buffer_io;
pub mod file_io;

use std::fmt;
use std::io;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::Arc;

use parking_lot::Mutex;

/// Open mode for a [`DataIo`] device, stored as bit flags.
///
/// `WRITE_ONLY | READ_ONLY` requests update mode, `APPEND` changes where
/// writes land, and the absence of `TEXT` means binary mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DioMode(u8);

impl DioMode {
    pub const INVALID: DioMode = DioMode(0);
    pub const READ_ONLY: DioMode = DioMode(1 << 0);
    pub const WRITE_ONLY: DioMode = DioMode(1 << 1);
    pub const APPEND: DioMode = DioMode(1 << 2);
    pub const TEXT: DioMode = DioMode(1 << 3);

    /// Read and write on an existing stream.
    pub const READ_WRITE: DioMode = DioMode(Self::READ_ONLY.0 | Self::WRITE_ONLY.0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    pub const fn contains(self, other: DioMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn readable(self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    pub const fn writable(self) -> bool {
        self.contains(Self::WRITE_ONLY)
    }

    /// A mode is usable only if it asks for reading, writing or both.
    pub const fn is_valid(self) -> bool {
        self.readable() || self.writable()
    }
}

impl BitOr for DioMode {
    type Output = DioMode;

    fn bitor(self, rhs: DioMode) -> DioMode {
        DioMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for DioMode {
    fn bitor_assign(&mut self, rhs: DioMode) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DioMode {
    type Output = DioMode;

    fn bitand(self, rhs: DioMode) -> DioMode {
        DioMode(self.0 & rhs.0)
    }
}

impl fmt::Debug for DioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("DioMode(INVALID)");
        }
        let names = [
            (Self::READ_ONLY, "READ_ONLY"),
            (Self::WRITE_ONLY, "WRITE_ONLY"),
            (Self::APPEND, "APPEND"),
            (Self::TEXT, "TEXT"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "DioMode({})", set.join(" | "))
    }
}

/// Seek origin, relative to the start, the current position or the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DioSeek {
    Set,
    Current,
    End,
}

/// Reasons a device refused to open.
#[derive(Debug, thiserror::Error)]
pub enum DioError {
    #[error("device has no name or backing buffer")]
    NoLocator,

    #[error("invalid open mode {0:?}")]
    InvalidMode(DioMode),

    #[error("device is already open")]
    AlreadyOpen,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The storage contract every backend (file, memory block, archive entry)
/// implements.
///
/// `read`, `write`, `seek`, `tell` and `size` are only defined while
/// [`is_open`](DataIo::is_open) is true. Calling them on a closed device is
/// a programming error: debug builds assert, release builds get the failure
/// value back.
pub trait DataIo {
    /// Opens the device. Fails without a name/buffer or on an invalid mode.
    fn open(&mut self, mode: DioMode) -> Result<(), DioError>;

    /// Closes the device. Calling it twice is harmless.
    fn close(&mut self);

    /// Mode the device was opened with, `INVALID` while closed.
    fn mode(&self) -> DioMode;

    fn is_open(&self) -> bool;

    fn at_eof(&self) -> bool;

    /// Reads up to `buf.len()` bytes and returns how many were transferred.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Writes up to `buf.len()` bytes and returns how many were transferred.
    fn write(&mut self, buf: &[u8]) -> usize;

    fn seek(&mut self, offset: i64, origin: DioSeek) -> bool;

    /// Current byte offset, or `-1` if it cannot be determined.
    fn tell(&self) -> i64;

    /// Total length in bytes. Must leave the cursor where it was.
    fn size(&self) -> usize;
}

/// A storage device that several owners may hold at once.
///
/// The lock only makes the aliasing legal; it does not keep the cursor
/// where any particular holder left it.
pub type SharedDataIo = Arc<Mutex<dyn DataIo + Send>>;

/// Wraps a backend into a [`SharedDataIo`].
pub fn shared<T>(io: T) -> SharedDataIo
where
    T: DataIo + Send + 'static,
{
    Arc::new(Mutex::new(io))
}

/// Resolves `offset` against `origin` for a stream of `len` bytes positioned
/// at `cursor`. Returns `None` if the target would land before the start.
pub(crate) fn resolve_seek(cursor: u64, len: u64, offset: i64, origin: DioSeek) -> Option<u64> {
    let base = match origin {
        DioSeek::Set => 0i128,
        DioSeek::Current => cursor as i128,
        DioSeek::End => len as i128,
    };
    let target = base + offset as i128;
    if target < 0 || target > u64::MAX as i128 {
        None
    } else {
        Some(target as u64)
    }
}
