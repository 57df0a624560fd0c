use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::engine::io::{DataIo, DioError, DioMode, DioSeek};

/// A [`DataIo`] device backed by a file on disk.
///
/// Text mode is recorded but no newline translation happens; every
/// supported platform reads and writes bytes as-is.
#[derive(Debug, Default)]
pub struct FileIo {
    file_name: Option<PathBuf>,
    mode: DioMode,
    handle: Option<File>,
    eof: bool,
}

impl FileIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed device that will open `path`.
    pub fn named(path: impl AsRef<Path>) -> Self {
        Self {
            file_name: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Names the device and opens it in one step. Check
    /// [`is_open`](DataIo::is_open) for the outcome.
    pub fn with_mode(path: impl AsRef<Path>, mode: DioMode) -> Self {
        let mut io = Self::named(path);
        if let Err(e) = io.open(mode) {
            warn!("Failed to open {:?}: {}", io.file_name, e);
        }
        io
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, path: impl AsRef<Path>) {
        if self.is_open() {
            error!("Can't change filename on open device.");
            return;
        }
        self.file_name = Some(path.as_ref().to_path_buf());
    }

    fn options(mode: DioMode) -> OpenOptions {
        let append = mode.contains(DioMode::APPEND);
        let mut options = OpenOptions::new();

        if mode.writable() {
            if mode.readable() && !append {
                // update in place
                options.read(true).write(true);
            } else if append {
                options.append(true).create(true).read(mode.readable());
            } else {
                options.write(true).create(true).truncate(true);
            }
        } else {
            options.read(true);
        }
        options
    }
}

impl DataIo for FileIo {
    fn open(&mut self, mode: DioMode) -> Result<(), DioError> {
        if self.handle.is_some() {
            warn!("Tried to open a device that is already open.");
            return Err(DioError::AlreadyOpen);
        }

        let Some(path) = self.file_name.as_ref() else {
            warn!("Tried to open device without a filename.");
            return Err(DioError::NoLocator);
        };

        if !mode.is_valid() {
            debug_assert!(false, "invalid open mode: {:?}", mode);
            return Err(DioError::InvalidMode(mode));
        }

        let file = Self::options(mode).open(path)?;
        self.handle = Some(file);
        self.mode = mode;
        self.eof = false;
        Ok(())
    }

    fn close(&mut self) {
        self.handle = None;
        self.mode = DioMode::INVALID;
        self.file_name = None;
        self.eof = false;
    }

    fn mode(&self) -> DioMode {
        self.mode
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn at_eof(&self) -> bool {
        self.eof
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        debug_assert!(self.handle.is_some(), "Invalid file handle!");
        let Some(file) = self.handle.as_mut() else {
            return 0;
        };

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("File read failed: {}", e);
                    break;
                }
            }
        }
        total
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        debug_assert!(self.handle.is_some(), "Invalid file handle!");
        let Some(file) = self.handle.as_mut() else {
            return 0;
        };

        let mut total = 0;
        while total < buf.len() {
            match file.write(&buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("File write failed: {}", e);
                    break;
                }
            }
        }
        total
    }

    fn seek(&mut self, offset: i64, origin: DioSeek) -> bool {
        debug_assert!(self.handle.is_some(), "Invalid file handle!");
        let Some(file) = self.handle.as_mut() else {
            return false;
        };

        let target = match origin {
            DioSeek::Set => match u64::try_from(offset) {
                Ok(offset) => SeekFrom::Start(offset),
                Err(_) => return false,
            },
            DioSeek::Current => SeekFrom::Current(offset),
            DioSeek::End => SeekFrom::End(offset),
        };

        if file.seek(target).is_err() {
            return false;
        }
        self.eof = false;
        true
    }

    fn tell(&self) -> i64 {
        debug_assert!(self.handle.is_some(), "Invalid file handle!");
        let Some(mut file) = self.handle.as_ref() else {
            return -1;
        };

        file.stream_position()
            .ok()
            .and_then(|pos| i64::try_from(pos).ok())
            .unwrap_or(-1)
    }

    fn size(&self) -> usize {
        debug_assert!(self.handle.is_some(), "Invalid file handle!");
        let Some(mut file) = self.handle.as_ref() else {
            return 0;
        };

        let cursor = match file.stream_position() {
            Ok(cursor) => cursor,
            Err(_) => {
                warn!("Failed to get current cursor position in file.");
                return 0;
            }
        };

        let end = match file.seek(SeekFrom::End(0)) {
            Ok(end) => end,
            Err(_) => {
                warn!("Failed to move cursor to end of file.");
                return 0;
            }
        };

        if file.seek(SeekFrom::Start(cursor)).is_err() {
            warn!("Failed to return cursor to last position in file.");
        }

        usize::try_from(end).unwrap_or(usize::MAX)
    }
}
