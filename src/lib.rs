//! Streams 16-bit PCM out of Ogg Vorbis data held in any [`DataIo`]
//! backend, and packs asset payloads with one-shot zlib.
//!
//! The storage device is shared: an [`OggCodec`] never assumes it is the
//! only one moving the device's cursor.

pub mod engine;

pub use engine::codec::ogg_codec::OggCodec;
pub use engine::codec::{AudioCodec, BIT_DEPTH};
pub use engine::decoder::cursor::CursorShim;
pub use engine::decoder::symphonia_decoder::{SymphoniaDecoder, SymphoniaLibrary};
pub use engine::decoder::{DecoderHandle, DecoderLibrary, HandshakeError, StreamError, StreamInfo};
pub use engine::io::buffer_io::BufferIo;
pub use engine::io::file_io::FileIo;
pub use engine::io::{shared, DataIo, DioError, DioMode, DioSeek, SharedDataIo};
pub use engine::settings::{CodecSettings, DeflateSettings, OGG_MAGIC};
pub use engine::zlib::{compress_bound, deflate, deflate_with, inflate};
