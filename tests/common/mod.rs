//! Shared fixtures for the integration tests.
//!
//! `ScriptedLibrary` stands in for the real decoder library. Its streams use
//! a toy layout, `"OggS" | channels:u8 | rate:u32 LE | pcm...`, and the
//! "decoded" PCM is the payload itself, pulled through the cursor shim. It
//! counts live decoder handles so tests can check nothing leaks, and can
//! move the shared storage cursor between its own callbacks the way another
//! holder of the device would.

#![allow(dead_code)]

use std::num::{NonZeroU32, NonZeroU8};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ogg_bridge::{
    shared, BufferIo, CodecSettings, CursorShim, DataIo, DecoderHandle, DecoderLibrary, DioMode,
    DioSeek, HandshakeError, SharedDataIo, StreamError, StreamInfo,
};
use vorbis_rs::VorbisEncoderBuilder;

pub const HEADER_LEN: usize = 9;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Generate `len` deterministic bytes using a simple LCG.
pub fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = next_rand(rng);
            (rng >> 56) as u8
        })
        .collect()
}

pub fn next_rand(state: u64) -> u64 {
    state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

/// Builds a stream in the scripted layout.
pub fn scripted_stream(rate: u32, channels: u8, pcm: &[u8]) -> Vec<u8> {
    let mut data = b"OggS".to_vec();
    data.push(channels);
    data.extend_from_slice(&rate.to_le_bytes());
    data.extend_from_slice(pcm);
    data
}

/// A closed in-memory device holding `data`.
pub fn memory_device(data: Vec<u8>) -> SharedDataIo {
    shared(BufferIo::new(data))
}

/// An already opened in-memory device holding `data`.
pub fn open_memory_device(data: Vec<u8>) -> SharedDataIo {
    let mut io = BufferIo::new(data);
    io.open(DioMode::READ_ONLY).expect("memory device opens");
    shared(io)
}

/// Encodes a two-tone sine as a real Ogg Vorbis stream.
///
/// The left channel carries 440 Hz and any further channel 660 Hz. The
/// stream serial is fixed so the bytes are the same on every run.
pub fn vorbis_tone(rate: u32, channels: u8, frames: usize) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut encoder = VorbisEncoderBuilder::new_with_serial(
        NonZeroU32::new(rate).expect("non-zero rate"),
        NonZeroU8::new(channels).expect("non-zero channel count"),
        &mut encoded,
        0x0b5e,
    )
    .build()
    .expect("vorbis encoder");

    let block = 1024;
    let mut start = 0;
    while start < frames {
        let len = block.min(frames - start);
        let planes: Vec<Vec<f32>> = (0..channels)
            .map(|ch| {
                let freq = if ch == 0 { 440.0 } else { 660.0 };
                (start..start + len)
                    .map(|i| {
                        let t = i as f32 / rate as f32;
                        0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
                    })
                    .collect()
            })
            .collect();
        encoder.encode_audio_block(&planes).expect("encode block");
        start += len;
    }
    encoder.finish().expect("finish vorbis stream");
    encoded
}

#[derive(Clone, Default)]
pub struct Counters {
    pub handshakes: Arc<AtomicUsize>,
    pub live_handles: Arc<AtomicUsize>,
}

impl Counters {
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct ScriptedLibrary {
    pub counters: Counters,
    /// Refuse the handshake with this class after reading the header.
    pub handshake_error: Option<HandshakeError>,
    /// Largest chunk a single decode call returns. 0 means unlimited.
    pub max_chunk: usize,
    /// Payload offsets at which a decode call fails once with `Hole`.
    pub holes: Vec<u64>,
    pub fail_seek: bool,
    /// Seed for moving the storage cursor between callbacks.
    pub drift: Option<u64>,
}

impl ScriptedLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk;
        self
    }

    pub fn with_handshake_error(mut self, err: HandshakeError) -> Self {
        self.handshake_error = Some(err);
        self
    }

    pub fn with_hole_at(mut self, offset: u64) -> Self {
        self.holes.push(offset);
        self
    }

    pub fn with_failing_seek(mut self) -> Self {
        self.fail_seek = true;
        self
    }

    pub fn with_drift(mut self, seed: u64) -> Self {
        self.drift = Some(seed);
        self
    }
}

impl DecoderLibrary for ScriptedLibrary {
    type Handle = ScriptedDecoder;

    fn open(
        &self,
        mut shim: CursorShim,
        _settings: &CodecSettings,
    ) -> Result<ScriptedDecoder, HandshakeError> {
        self.counters.handshakes.fetch_add(1, Ordering::SeqCst);

        let mut header = [0u8; HEADER_LEN];
        if shim.read_bytes(&mut header) != HEADER_LEN {
            return Err(HandshakeError::BadHeader);
        }
        if &header[..4] != b"OggS" {
            return Err(HandshakeError::NotVorbis);
        }
        if let Some(err) = self.handshake_error {
            return Err(err);
        }

        // a seekable demuxer measures the stream before decoding
        if shim.seek_to(0, DioSeek::End) != 0 {
            return Err(HandshakeError::Read);
        }
        let end = shim.tell();
        if shim.seek_to(HEADER_LEN as i64, DioSeek::Set) != 0 {
            return Err(HandshakeError::Read);
        }

        let mut rate = [0u8; 4];
        rate.copy_from_slice(&header[5..9]);

        self.counters.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedDecoder {
            shim,
            info: StreamInfo {
                rate: u32::from_le_bytes(rate),
                channels: header[4],
            },
            end,
            max_chunk: self.max_chunk,
            holes: self.holes.clone(),
            fail_seek: self.fail_seek,
            drift: self.drift,
            live: Arc::clone(&self.counters.live_handles),
        })
    }
}

pub struct ScriptedDecoder {
    shim: CursorShim,
    info: StreamInfo,
    end: i64,
    max_chunk: usize,
    holes: Vec<u64>,
    fail_seek: bool,
    drift: Option<u64>,
    live: Arc<AtomicUsize>,
}

impl ScriptedDecoder {
    /// Moves the shared cursor somewhere else, as another holder might.
    fn perturb(&mut self) {
        let Some(state) = self.drift else {
            return;
        };
        let state = next_rand(state);
        self.drift = Some(state);

        let mut dio = self.shim.storage().lock();
        let len = dio.size().max(1) as u64;
        dio.seek(((state >> 33) % len) as i64, DioSeek::Set);
    }
}

impl DecoderHandle for ScriptedDecoder {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.perturb();

        let pos = (self.shim.tell() - HEADER_LEN as i64) as u64;
        if let Some(i) = self.holes.iter().position(|&hole| pos >= hole) {
            self.holes.remove(i);
            return Err(StreamError::Hole);
        }

        let mut want = buf.len();
        if self.max_chunk > 0 {
            want = want.min(self.max_chunk);
        }
        let read = self.shim.read_bytes(&mut buf[..want]);

        // look back over what was just read and return, relative to the
        // shim's own position
        self.perturb();
        if self.shim.seek_to(-(read as i64), DioSeek::Current) != 0 {
            return Err(StreamError::Read);
        }
        self.perturb();
        if self.shim.seek_to(read as i64, DioSeek::Current) != 0 {
            return Err(StreamError::Read);
        }
        debug_assert!(self.shim.tell() <= self.end);

        Ok(read)
    }

    fn pcm_seek(&mut self, sample: u64) -> Result<(), StreamError> {
        if self.fail_seek {
            return Err(StreamError::Read);
        }
        self.perturb();

        let frame = self.info.channels.max(1) as i64 * 2;
        let offset = HEADER_LEN as i64 + sample as i64 * frame;
        if self.shim.seek_to(offset, DioSeek::Set) != 0 {
            return Err(StreamError::Read);
        }
        Ok(())
    }
}

impl Drop for ScriptedDecoder {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
