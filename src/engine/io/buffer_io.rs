use tracing::{error, warn};

use crate::engine::io::{resolve_seek, DataIo, DioError, DioMode, DioSeek};

/// A [`DataIo`] device over an in-memory block.
///
/// The backing buffer plays the part a file name plays for [`FileIo`]: a
/// `BufferIo` without one refuses to open. Closing keeps the buffer so the
/// block can be reopened or taken back with [`into_inner`](BufferIo::into_inner).
///
/// [`FileIo`]: crate::engine::io::file_io::FileIo
#[derive(Debug, Default)]
pub struct BufferIo {
    data: Option<Vec<u8>>,
    cursor: u64,
    mode: DioMode,
    opened: bool,
    eof: bool,
}

impl BufferIo {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// A device with no backing buffer yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replaces the backing buffer. Refused while the device is open.
    pub fn set_buffer(&mut self, data: impl Into<Vec<u8>>) {
        if self.opened {
            error!("Can't change buffer on open device.");
            return;
        }
        self.data = Some(data.into());
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.unwrap_or_default()
    }

    fn len(&self) -> u64 {
        self.as_bytes().len() as u64
    }
}

impl DataIo for BufferIo {
    fn open(&mut self, mode: DioMode) -> Result<(), DioError> {
        if self.opened {
            warn!("Tried to open a device that is already open.");
            return Err(DioError::AlreadyOpen);
        }

        let Some(data) = self.data.as_mut() else {
            warn!("Tried to open device without a buffer.");
            return Err(DioError::NoLocator);
        };

        if !mode.is_valid() {
            debug_assert!(false, "invalid open mode: {:?}", mode);
            return Err(DioError::InvalidMode(mode));
        }

        let append = mode.contains(DioMode::APPEND);
        if mode.writable() && !mode.readable() && !append {
            data.clear();
        }

        self.cursor = if mode.writable() && append && !mode.readable() {
            data.len() as u64
        } else {
            0
        };
        self.mode = mode;
        self.opened = true;
        self.eof = false;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.mode = DioMode::INVALID;
        self.cursor = 0;
        self.eof = false;
    }

    fn mode(&self) -> DioMode {
        self.mode
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn at_eof(&self) -> bool {
        self.eof
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        debug_assert!(self.opened, "Invalid buffer handle!");
        if !self.opened || !self.mode.readable() {
            return 0;
        }

        let data = self.as_bytes();
        let start = (self.cursor as usize).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);

        self.cursor += count as u64;
        if count < buf.len() {
            self.eof = true;
        }
        count
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        debug_assert!(self.opened, "Invalid buffer handle!");
        if !self.opened || !self.mode.writable() {
            return 0;
        }
        let append = self.mode.contains(DioMode::APPEND);
        let Some(data) = self.data.as_mut() else {
            return 0;
        };

        if append {
            self.cursor = data.len() as u64;
        }

        let Some((start, end)) = usize::try_from(self.cursor)
            .ok()
            .and_then(|start| Some((start, start.checked_add(buf.len())?)))
        else {
            error!(cursor = self.cursor, len = buf.len(), "Write offset out of range.");
            return 0;
        };

        if end > data.len() {
            if let Err(e) = data.try_reserve(end - data.len()) {
                error!(cursor = self.cursor, len = buf.len(), "Failed to grow buffer: {}", e);
                return 0;
            }
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);

        self.cursor = end as u64;
        buf.len()
    }

    fn seek(&mut self, offset: i64, origin: DioSeek) -> bool {
        debug_assert!(self.opened, "Invalid buffer handle!");
        if !self.opened {
            return false;
        }

        match resolve_seek(self.cursor, self.len(), offset, origin) {
            Some(target) => {
                self.cursor = target;
                self.eof = false;
                true
            }
            None => false,
        }
    }

    fn tell(&self) -> i64 {
        debug_assert!(self.opened, "Invalid buffer handle!");
        if !self.opened {
            return -1;
        }
        i64::try_from(self.cursor).unwrap_or(-1)
    }

    fn size(&self) -> usize {
        debug_assert!(self.opened, "Invalid buffer handle!");
        self.as_bytes().len()
    }
}
