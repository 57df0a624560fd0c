pub mod ogg_codec;

use crate::engine::io::SharedDataIo;

/// Every codec decodes to signed 16-bit samples.
pub const BIT_DEPTH: u8 = 16;

pub trait AudioCodec {
    /// Opens a decode session over `dio`. Returns false if the stream is not
    /// in this codec's format or the decoder refused it.
    fn open(&mut self, dio: &SharedDataIo) -> bool;

    /// Ends the session. Safe to call on a closed codec.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Sample rate in Hz, 0 while closed.
    fn rate(&self) -> u32;

    /// Bits per sample of the PCM that `read` produces.
    fn depth(&self) -> u8 {
        BIT_DEPTH
    }

    /// Channel count, 0 while closed.
    fn channels(&self) -> u8;

    /// Fills `buf` with interleaved little-endian PCM and returns the number
    /// of bytes written. Fewer than `buf.len()` means the stream ended or
    /// hit an error.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Rewinds to the first sample.
    fn reset(&mut self);
}
