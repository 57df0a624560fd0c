use std::sync::Arc;

use tracing::{debug, error};

use crate::engine::codec::{AudioCodec, BIT_DEPTH};
use crate::engine::decoder::cursor::CursorShim;
use crate::engine::decoder::symphonia_decoder::SymphoniaLibrary;
use crate::engine::decoder::{DecoderHandle, DecoderLibrary, HandshakeError};
use crate::engine::io::{DioMode, DioSeek, SharedDataIo};
use crate::engine::settings::{CodecSettings, OGG_MAGIC};

/// Signature check behind [`OggCodec::validate`]. On success the cursor is
/// back at offset 0 so the handshake sees a clean stream.
pub(crate) fn validate(dio: &SharedDataIo) -> bool {
    let mut dio = dio.lock();

    if !dio.is_open() {
        if let Err(e) = dio.open(DioMode::READ_ONLY) {
            error!("Failed to open audio stream: {}", e);
            return false;
        }
    }

    if !dio.seek(0, DioSeek::Set) {
        debug!("Invalid DataIO (failed seek).");
        return false;
    }

    let mut ident = [0u8; 4];
    if dio.read(&mut ident) != ident.len() {
        debug!("Invalid DataIO (short read).");
        dio.seek(0, DioSeek::Set);
        return false;
    }

    if &ident != OGG_MAGIC {
        debug!("Invalid DataIO (not Ogg container)");
        dio.seek(0, DioSeek::Set);
        return false;
    }

    debug!("Detected Ogg file.");

    if !dio.seek(0, DioSeek::Set) {
        debug!("Invalid DataIO (reset failed).");
        return false;
    }

    true
}

struct Session<H> {
    handle: H,
    rate: u32,
    channels: u8,
}

/// Streams 16-bit PCM out of an Ogg Vorbis [`SharedDataIo`].
///
/// The storage device stays shared: the codec reaches it only through a
/// [`CursorShim`], which keeps its own cursor, so other holders may use the
/// device between reads. Dropping the codec closes the session.
pub struct OggCodec<L: DecoderLibrary = SymphoniaLibrary> {
    library: L,
    settings: CodecSettings,
    session: Option<Session<L::Handle>>,
}

impl OggCodec {
    pub fn new() -> Self {
        Self::with_library(SymphoniaLibrary)
    }

    /// Checks that `dio` starts with the Ogg container signature.
    ///
    /// Opens the device read-only if nobody has opened it yet and leaves the
    /// cursor at offset 0 whenever it can. A mismatch is an ordinary "not
    /// this format" answer, not an error.
    pub fn validate(dio: &SharedDataIo) -> bool {
        validate(dio)
    }
}

impl Default for OggCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: DecoderLibrary> OggCodec<L> {
    pub fn with_library(library: L) -> Self {
        Self {
            library,
            settings: CodecSettings::default(),
            session: None,
        }
    }

    pub fn with_settings(mut self, settings: CodecSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CodecSettings {
        &self.settings
    }

    /// Opens a session, reporting why the handshake failed.
    ///
    /// Any session already open is closed first. On failure the codec is
    /// left closed and the shim has been released.
    pub fn try_open(&mut self, dio: &SharedDataIo) -> Result<(), HandshakeError> {
        self.close();

        if !validate(dio) {
            error!("Tried to open invalid Ogg file.");
            return Err(HandshakeError::NotVorbis);
        }

        let shim = CursorShim::new(Arc::clone(dio));
        let handle = self.library.open(shim, &self.settings).map_err(|e| {
            error!("{}", e);
            error!("Failed to setup Ogg Vorbis <=> DataIO callbacks.");
            e
        })?;

        let info = handle.info();
        debug!(rate = info.rate, channels = info.channels, "Opened Ogg Vorbis stream.");

        self.session = Some(Session {
            handle,
            rate: info.rate,
            channels: info.channels,
        });
        Ok(())
    }

    pub fn open(&mut self, dio: &SharedDataIo) -> bool {
        self.try_open(dio).is_ok()
    }

    /// Releases the decoder and its shim. No-op while closed.
    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn rate(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.rate)
    }

    pub fn depth(&self) -> u8 {
        BIT_DEPTH
    }

    pub fn channels(&self) -> u8 {
        self.session.as_ref().map_or(0, |s| s.channels)
    }

    /// Decodes into `buf` until it is full, the stream ends, or the decoder
    /// reports an error. Bytes decoded before an error are kept and counted;
    /// the session stays open and a later call resumes after the damage.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let mut total = 0;
        while total < buf.len() {
            match session.handle.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(read) => {
                    debug_assert!(read <= buf.len() - total, "decoder overran the buffer");
                    total += read.min(buf.len() - total);
                }
                Err(e) => {
                    error!("Error occurred while reading data!");
                    debug!("{}", e);
                    break;
                }
            }
        }
        total
    }

    /// Seeks the decoder back to PCM sample 0. A failure is logged and the
    /// session stays usable.
    pub fn reset(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Err(e) = session.handle.pcm_seek(0) {
            error!("Failed to reset codec.");
            debug!("{}", e);
        }
    }
}

impl<L: DecoderLibrary> AudioCodec for OggCodec<L> {
    fn open(&mut self, dio: &SharedDataIo) -> bool {
        OggCodec::open(self, dio)
    }

    fn close(&mut self) {
        OggCodec::close(self)
    }

    fn is_open(&self) -> bool {
        OggCodec::is_open(self)
    }

    fn rate(&self) -> u32 {
        OggCodec::rate(self)
    }

    fn depth(&self) -> u8 {
        OggCodec::depth(self)
    }

    fn channels(&self) -> u8 {
        OggCodec::channels(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        OggCodec::read(self, buf)
    }

    fn reset(&mut self) {
        OggCodec::reset(self)
    }
}
