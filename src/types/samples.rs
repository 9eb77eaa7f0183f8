//! SampleBuffer type holding decoded PCM audio.

/// Interleaved floating-point PCM audio owned by a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 or 2).
    pub channels: u16,
}

impl SampleBuffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Builds an interleaved buffer from channel-major data.
    ///
    /// All channels are truncated to the shortest one.
    pub fn from_planar(planar: &[Vec<f32>], sample_rate: u32) -> Self {
        let channels = planar.len().max(1);
        let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for channel in planar {
                samples.push(channel[frame]);
            }
        }
        Self::new(samples, sample_rate, channels as u16)
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Splits the interleaved samples into one vector per channel.
    pub fn to_planar(&self) -> Vec<Vec<f32>> {
        let channels = self.channels.max(1) as usize;
        let frames = self.frames();
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in self.samples.chunks_exact(channels) {
            for (channel, sample) in planar.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        planar
    }

    /// Returns a stereo buffer, duplicating a mono channel.
    pub fn into_stereo(self) -> Self {
        match self.channels {
            2 => self,
            1 => {
                let mut samples = Vec::with_capacity(self.samples.len() * 2);
                for sample in &self.samples {
                    samples.push(*sample);
                    samples.push(*sample);
                }
                Self::new(samples, self.sample_rate, 2)
            }
            _ => {
                // Keep the first two channels of wider layouts.
                let planar = self.to_planar();
                Self::from_planar(&planar[..2.min(planar.len())], self.sample_rate).into_stereo()
            }
        }
    }
}
