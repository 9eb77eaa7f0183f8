//! WAV reading and writing.
//!
//! Decodes the transcoder's piped WAV output into a [`SampleBuffer`] and
//! writes processed audio back out as 16-bit PCM using the hound crate.

use std::borrow::Cow;
use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{DaemonError, Result};
use crate::types::SampleBuffer;

/// Audio sample rate of the streamed output (44.1kHz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Number of audio channels in the streamed output (stereo).
pub const CHANNELS: u16 = 2;

/// Bit depth of the streamed output.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const HEADER_LEN: usize = 44;

/// Sentinel written by muxers that cannot seek back to patch sizes.
const UNKNOWN_SIZE: u32 = u32::MAX;

/// Writes samples to an in-memory 16-bit PCM WAV file.
///
/// The channel count and sample rate are taken from the buffer as-is;
/// callers normalize to the output format first.
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    if buffer.channels == 0 || buffer.sample_rate == 0 {
        return Err(DaemonError::encode_failed(format!(
            "invalid format: {} channels at {} Hz",
            buffer.channels, buffer.sample_rate
        )));
    }

    let spec = WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + buffer.samples.len() * 2));

    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| DaemonError::encode_failed(format!("creating WAV writer: {}", e)))?;

        // Only whole frames are written.
        let whole = buffer.frames() * buffer.channels as usize;
        for sample in &buffer.samples[..whole] {
            writer
                .write_sample(to_i16(*sample))
                .map_err(|e| DaemonError::encode_failed(format!("writing sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| DaemonError::encode_failed(format!("finalizing WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// Decodes a WAV byte buffer into floating-point samples.
///
/// Headers with placeholder sizes (as written to a pipe) are repaired to the
/// actual payload length before parsing. Layouts wider than stereo keep their
/// first two channels.
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer> {
    let bytes = repair_header(bytes)?;

    let reader = WavReader::new(Cursor::new(bytes.as_ref()))
        .map_err(|e| DaemonError::decode_failed(format!("invalid WAV header: {}", e)))?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(DaemonError::decode_failed("WAV declares zero channels"));
    }
    if spec.sample_rate == 0 {
        return Err(DaemonError::decode_failed("WAV declares a zero sample rate"));
    }

    let samples = read_samples(reader, spec)?;
    let buffer = SampleBuffer::new(samples, spec.sample_rate, spec.channels);

    if buffer.is_empty() {
        return Err(DaemonError::decode_failed("WAV contains no audio frames"));
    }

    if buffer.channels > 2 {
        Ok(buffer.into_stereo())
    } else {
        Ok(buffer)
    }
}

fn read_samples<R: std::io::Read>(mut reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>> {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DaemonError::decode_failed(format!("reading samples: {}", e))),
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DaemonError::decode_failed(format!("reading samples: {}", e)))
        }
        (format, bits) => Err(DaemonError::decode_failed(format!(
            "unsupported sample format {:?} at {} bits",
            format, bits
        ))),
    }
}

/// Patches RIFF and data chunk sizes to match the bytes actually present.
///
/// A muxer writing to a pipe cannot seek back, so it leaves the size fields
/// as zero or `0xFFFFFFFF`. Returns the input unchanged when the sizes are
/// already consistent.
pub fn repair_header(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(DaemonError::decode_failed("missing RIFF/WAVE header"));
    }

    let mut pos = 12;
    let mut block_align = 1usize;

    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let declared = read_u32(bytes, pos + 4);

        if id == b"data" {
            let data_start = pos + 8;
            let available = bytes.len() - data_start;
            let fits = declared != 0
                && declared != UNKNOWN_SIZE
                && (declared as usize) <= available;
            let riff_ok = read_u32(bytes, 4) as usize == bytes.len() - 8;
            if fits && riff_ok {
                return Ok(Cow::Borrowed(bytes));
            }

            let data_len = if fits {
                declared as usize
            } else {
                available - available % block_align.max(1)
            };

            let mut fixed = bytes[..data_start + data_len].to_vec();
            let riff_len = (fixed.len() - 8) as u32;
            fixed[4..8].copy_from_slice(&riff_len.to_le_bytes());
            fixed[pos + 4..pos + 8].copy_from_slice(&(data_len as u32).to_le_bytes());
            return Ok(Cow::Owned(fixed));
        }

        if id == b"fmt " && pos + 8 + 14 <= bytes.len() {
            block_align = u16::from_le_bytes([bytes[pos + 20], bytes[pos + 21]]) as usize;
        }

        if declared == UNKNOWN_SIZE {
            break;
        }
        // Chunks are padded to an even length.
        pos += 8 + declared as usize + (declared as usize & 1);
    }

    Err(DaemonError::decode_failed("WAV has no data chunk"))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Converts a float sample to 16-bit PCM.
///
/// Uses the same 32768 scale as decoding so that 16-bit input survives a
/// decode/encode pass unchanged.
fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
