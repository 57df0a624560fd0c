use std::io::ErrorKind;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::decoder::cursor::CursorShim;
use crate::engine::decoder::{
    DecoderHandle, DecoderLibrary, HandshakeError, StreamError, StreamInfo,
};
use crate::engine::settings::CodecSettings;

/// Smallest read-ahead buffer symphonia accepts is anything above this.
const MIN_STREAM_BUFFER_LEN: usize = 32 * 1024;

/// Decoder library backed by symphonia's Ogg demuxer and Vorbis decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaLibrary;

impl DecoderLibrary for SymphoniaLibrary {
    type Handle = SymphoniaDecoder;

    fn open(
        &self,
        shim: CursorShim,
        settings: &CodecSettings,
    ) -> Result<SymphoniaDecoder, HandshakeError> {
        let mut stream_opts = MediaSourceStreamOptions::default();
        let buffer_len = settings.stream_buffer_len;
        if buffer_len.is_power_of_two() && buffer_len > MIN_STREAM_BUFFER_LEN {
            stream_opts.buffer_len = buffer_len;
        } else {
            warn!(buffer_len, "Ignoring invalid stream buffer length.");
        }
        let mss = MediaSourceStream::new(Box::new(shim), stream_opts);

        let mut hint = Hint::new();
        if !settings.hint_extension.is_empty() {
            hint.with_extension(&settings.hint_extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| handshake_error(&e))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(HandshakeError::NotVorbis)?;

        let track_id = track.id;
        let rate = track.codec_params.sample_rate.ok_or(HandshakeError::BadHeader)?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .ok_or(HandshakeError::BadHeader)?;
        let channels = u8::try_from(channels).map_err(|_| HandshakeError::BadHeader)?;

        let mut dec_opts = DecoderOptions::default();
        dec_opts.verify = settings.verify;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &dec_opts)
            .map_err(|e| handshake_error(&e))?;

        Ok(SymphoniaDecoder {
            reader,
            decoder,
            dec_opts,
            track_id,
            info: StreamInfo { rate, channels },
            sample_buf: None,
            pending: Vec::new(),
            pending_off: 0,
            seek_target: None,
        })
    }
}

/// An open symphonia decode session.
///
/// A decoded packet rarely fits the caller's buffer exactly, so the PCM
/// bytes that did not fit wait in `pending` for the next read.
pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    dec_opts: DecoderOptions,
    track_id: u32,
    info: StreamInfo,
    sample_buf: Option<SampleBuffer<i16>>,
    pending: Vec<u8>,
    pending_off: usize,
    /// Frames before this timestamp are dropped after an accurate seek.
    seek_target: Option<u64>,
}

impl SymphoniaDecoder {
    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let available = &self.pending[self.pending_off..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pending_off += n;
        if self.pending_off == self.pending.len() {
            self.pending.clear();
            self.pending_off = 0;
        }
        n
    }

    /// Pulls and decodes the next packet of the selected track into
    /// `pending`. Returns false at end of stream.
    fn decode_packet(&mut self) -> Result<bool, StreamError> {
        let packet = loop {
            match self.reader.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => break packet,
                Ok(_) => continue,
                Err(Error::IoError(ref err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(false)
                }
                Err(Error::ResetRequired) => {
                    self.rebuild_decoder()?;
                    return Err(StreamError::BadLink);
                }
                Err(err) => {
                    debug!("Packet read failed: {}", err);
                    return Err(stream_error(&err));
                }
            }
        };

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!("Packet decode failed: {}", err);
                return Err(stream_error(&err));
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let channels = spec.channels.count();
        let capacity = decoded.capacity();

        if self
            .sample_buf
            .as_ref()
            .is_some_and(|buf| buf.capacity() < capacity * channels)
        {
            self.sample_buf = None;
        }
        let sample_buf = self
            .sample_buf
            .get_or_insert_with(|| SampleBuffer::<i16>::new(capacity as u64, spec));
        sample_buf.copy_interleaved_ref(decoded);

        let mut skip = 0;
        if let Some(target) = self.seek_target {
            let start = packet.ts();
            if target > start {
                skip = ((target - start) as usize).min(frames);
            }
            if start + frames as u64 >= target {
                self.seek_target = None;
            }
        }

        let samples = &sample_buf.samples()[skip * channels..];
        self.pending.reserve(samples.len() * 2);
        for sample in samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(true)
    }

    /// The stream switched to a new logical bitstream; follow it.
    fn rebuild_decoder(&mut self) -> Result<(), StreamError> {
        let track = self
            .reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(StreamError::BadLink)?;

        self.decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &self.dec_opts)
            .map_err(|e| {
                debug!("Decoder rebuild failed: {}", e);
                StreamError::Invalid
            })?;
        self.track_id = track.id;
        self.sample_buf = None;
        Ok(())
    }
}

impl DecoderHandle for SymphoniaDecoder {
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pending_off < self.pending.len() {
                return Ok(self.drain_pending(buf));
            }
            if !self.decode_packet()? {
                return Ok(0);
            }
        }
    }

    fn pcm_seek(&mut self, sample: u64) -> Result<(), StreamError> {
        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: sample,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| {
                debug!("PCM seek failed: {}", e);
                stream_error(&e)
            })?;

        self.decoder.reset();
        self.pending.clear();
        self.pending_off = 0;
        self.seek_target = (seeked.required_ts > seeked.actual_ts).then_some(seeked.required_ts);
        Ok(())
    }
}

fn handshake_error(err: &Error) -> HandshakeError {
    match err {
        Error::IoError(e) if e.kind() == ErrorKind::UnexpectedEof => HandshakeError::BadHeader,
        Error::IoError(_) => HandshakeError::Read,
        Error::DecodeError(msg) if msg.contains("version") => HandshakeError::Version,
        Error::DecodeError(_) => HandshakeError::BadHeader,
        Error::Unsupported(_) => HandshakeError::NotVorbis,
        _ => HandshakeError::Fault,
    }
}

fn stream_error(err: &Error) -> StreamError {
    match err {
        Error::DecodeError(_) => StreamError::Hole,
        Error::ResetRequired => StreamError::BadLink,
        Error::IoError(_) | Error::SeekError(_) => StreamError::Read,
        _ => StreamError::Invalid,
    }
}
