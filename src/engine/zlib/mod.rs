//! One-shot, whole-buffer zlib compression for asset payloads.
//!
//! Both directions allocate their output once, up front, and never grow it:
//! `inflate` needs the decompressed size from the caller, `deflate` sizes
//! its buffer with [`compress_bound`]. A failed call returns `None` and
//! keeps nothing allocated.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tracing::{debug, error};

use crate::engine::settings::DeflateSettings;

/// Worst-case zlib output size for `len` input bytes.
pub fn compress_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Decompresses a zlib stream into a buffer of at most `expected_size`
/// bytes. The returned buffer is truncated to the actual decompressed size.
pub fn inflate(input: &[u8], expected_size: usize) -> Option<Vec<u8>> {
    // zlib needs somewhere to write even when nothing comes out
    let mut output = Vec::with_capacity(expected_size.max(1));
    let mut stream = Decompress::new(true);

    loop {
        let (before_in, before_out) = (stream.total_in(), stream.total_out());
        let consumed = before_in as usize;

        match stream.decompress_vec(&input[consumed..], &mut output, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => break,
            Ok(status) => {
                let progressed =
                    stream.total_in() != before_in || stream.total_out() != before_out;
                if !progressed || output.len() == output.capacity() {
                    debug!(?status, expected_size, "zlib inflate stopped early");
                    return None;
                }
            }
            Err(e) => {
                error!("zlib inflate failed: {}", e);
                return None;
            }
        }
    }

    if output.len() > expected_size {
        debug!(
            actual = output.len(),
            expected_size, "zlib inflate exceeded expected size"
        );
        return None;
    }
    Some(output)
}

/// Compresses `input` at the default level.
pub fn deflate(input: &[u8]) -> Option<Vec<u8>> {
    deflate_with(input, &DeflateSettings::default())
}

/// Compresses `input` into a zlib stream.
///
/// The buffer's capacity is [`compress_bound`] of the input; only the first
/// `len()` bytes are meaningful.
pub fn deflate_with(input: &[u8], settings: &DeflateSettings) -> Option<Vec<u8>> {
    let mut output = Vec::with_capacity(compress_bound(input.len()));
    let mut stream = Compress::new(Compression::new(settings.level()), true);

    loop {
        let (before_in, before_out) = (stream.total_in(), stream.total_out());
        let consumed = before_in as usize;

        match stream.compress_vec(&input[consumed..], &mut output, FlushCompress::Finish) {
            Ok(Status::StreamEnd) => return Some(output),
            Ok(status) => {
                let progressed =
                    stream.total_in() != before_in || stream.total_out() != before_out;
                if !progressed || output.len() == output.capacity() {
                    error!(?status, input = input.len(), "zlib deflate ran out of room");
                    return None;
                }
            }
            Err(e) => {
                error!("zlib deflate failed: {}", e);
                return None;
            }
        }
    }
}
