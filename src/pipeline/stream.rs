//! Encode/stream stage.
//!
//! Turns processed samples into an in-memory WAV file and hands it out as a
//! finite sequence of fixed-size chunks.

use bytes::Bytes;

use crate::audio::resample::resample;
use crate::audio::wav::encode_wav;
use crate::error::Result;
use crate::types::SampleBuffer;

/// Default size of each response body chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Ordered, restartable chunks of an encoded WAV file.
///
/// Chunks share the underlying allocation, so cloning or restarting does
/// not copy audio data.
#[derive(Debug, Clone)]
pub struct WavChunks {
    data: Bytes,
    chunk_size: usize,
    offset: usize,
}

impl WavChunks {
    /// Wraps encoded bytes; a zero chunk size is treated as one byte.
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }

    /// Total encoded size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.data.len()
    }

    /// Number of chunks in a full pass.
    pub fn chunk_count(&self) -> usize {
        self.data.len().div_ceil(self.chunk_size)
    }

    /// Rewinds to the first chunk.
    pub fn restart(&mut self) {
        self.offset = 0;
    }

    /// The complete encoded file.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }
}

impl Iterator for WavChunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.offset >= self.data.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data.slice(self.offset..end);
        self.offset = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.data.len() - self.offset).div_ceil(self.chunk_size);
        (remaining, Some(remaining))
    }
}

/// Normalizes a buffer to stereo at `output_rate` and encodes it.
pub fn encode(buffer: SampleBuffer, output_rate: u32, chunk_size: usize) -> Result<WavChunks> {
    let stereo = buffer.into_stereo();
    let normalized = resample(stereo, output_rate)?;
    let wav = encode_wav(&normalized)?;
    Ok(WavChunks::new(wav, chunk_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::HEADER_LEN;

    #[test]
    fn chunks_cover_the_file_in_order() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let chunks = WavChunks::new(data.clone(), DEFAULT_CHUNK_SIZE);

        assert_eq!(chunks.chunk_count(), 3);
        let collected: Vec<Bytes> = chunks.collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].len(), 8192);
        assert_eq!(collected[2].len(), 20_000 - 2 * 8192);
        assert_eq!(collected.concat(), data);
    }

    #[test]
    fn restart_replays_the_same_chunks() {
        let mut chunks = WavChunks::new(vec![1u8; 100], 30);
        let first: Vec<Bytes> = chunks.by_ref().collect();
        assert!(chunks.next().is_none());

        chunks.restart();
        let second: Vec<Bytes> = chunks.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_data_yields_nothing() {
        let mut chunks = WavChunks::new(Vec::new(), 8);
        assert_eq!(chunks.chunk_count(), 0);
        assert!(chunks.next().is_none());
    }

    #[test]
    fn mono_input_is_encoded_as_stereo() {
        let buffer = SampleBuffer::new(vec![0.1; 1000], 44_100, 1);
        let chunks = encode(buffer, 44_100, DEFAULT_CHUNK_SIZE).unwrap();

        let wav = chunks.as_bytes();
        assert_eq!(wav.len(), HEADER_LEN + 1000 * 4);
        let reader = hound::WavReader::new(std::io::Cursor::new(wav.as_ref())).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44_100);
    }

    #[test]
    fn other_rates_are_resampled_to_output_rate() {
        let buffer = SampleBuffer::new(vec![0.0; 2 * 48_000], 48_000, 2);
        let chunks = encode(buffer, 44_100, DEFAULT_CHUNK_SIZE).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(chunks.as_bytes().as_ref())).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.spec().channels, 2);
    }
}
