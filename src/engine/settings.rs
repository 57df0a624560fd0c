//! Settings for the codec bridge and the zlib helpers.
//!
//! Nothing here is persisted; callers build the structs in code and hand
//! them to [`OggCodec::with_settings`](crate::engine::codec::ogg_codec::OggCodec::with_settings)
//! or [`deflate_with`](crate::engine::zlib::deflate_with).

/// Container signature at the start of every Ogg stream.
pub const OGG_MAGIC: &[u8; 4] = b"OggS";

/// Settings for opening a decode session.
#[derive(Debug, Clone)]
pub struct CodecSettings {
    /// Read-ahead buffer the decoder library keeps in front of the shim, in
    /// bytes. Must be a power of two larger than 32 KiB.
    /// Default: 64 KiB.
    pub stream_buffer_len: usize,

    /// File extension passed to the format probe as a hint.
    /// Default: `"ogg"`.
    pub hint_extension: String,

    /// Ask the decoder to verify packets where the codec supports it.
    /// Default: false.
    pub verify: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            stream_buffer_len: 64 * 1024,
            hint_extension: "ogg".to_string(),
            verify: false,
        }
    }
}

impl CodecSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream_buffer_len(mut self, len: usize) -> Self {
        self.stream_buffer_len = len;
        self
    }

    pub fn with_hint_extension(mut self, ext: impl Into<String>) -> Self {
        self.hint_extension = ext.into();
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Settings for [`deflate_with`](crate::engine::zlib::deflate_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateSettings {
    /// zlib compression level, 0 (store) to 9 (smallest).
    /// Default: 6.
    level: u32,
}

impl Default for DeflateSettings {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateSettings {
    /// Levels above 9 are clamped to 9.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}
