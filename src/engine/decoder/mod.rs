pub mod cursor;
pub mod symphonia_decoder;

use crate::engine::decoder::cursor::CursorShim;
use crate::engine::settings::CodecSettings;

/// Why a decoder handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("A read from media returned an error.")]
    Read,

    #[error("Bitstream does not contain any Vorbis data.")]
    NotVorbis,

    #[error("Vorbis version mismatch.")]
    Version,

    #[error("Invalid Vorbis bitstream header.")]
    BadHeader,

    #[error("Internal logic fault; indicates a bug or heap/stack corruption.")]
    Fault,
}

/// Errors surfaced by the decoder while a session is streaming.
///
/// None of these end the session; the next read picks up after the
/// damaged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("OV_HOLE: Data interruption.")]
    Hole,

    #[error("OV_EBADLINK: Invalid stream.")]
    BadLink,

    #[error("OV_EINVAL: Invalid header.")]
    Invalid,

    #[error("OV_EREAD: Read from media failed.")]
    Read,
}

/// Stream parameters established by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub rate: u32,
    pub channels: u8,
}

/// The entry points of a third-party streaming decoder.
///
/// `open` is the handshake. The library takes the [`CursorShim`] and pulls
/// every byte through it; dropping the returned handle is the teardown and
/// releases the shim with it. There is no close callback: the storage
/// device stays open for its other holders.
pub trait DecoderLibrary {
    type Handle: DecoderHandle;

    fn open(&self, shim: CursorShim, settings: &CodecSettings)
        -> Result<Self::Handle, HandshakeError>;
}

/// An open decoder.
pub trait DecoderHandle {
    fn info(&self) -> StreamInfo;

    /// Decodes the next chunk as interleaved signed 16-bit little-endian
    /// PCM into `buf`. `Ok(0)` means the stream ended cleanly.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// Repositions the decoder to PCM frame `sample`.
    fn pcm_seek(&mut self, sample: u64) -> Result<(), StreamError>;
}
