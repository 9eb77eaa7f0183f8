//! Sample rate conversion using rubato.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{DaemonError, Result};
use crate::types::SampleBuffer;

/// Resamples a buffer to `target_rate`, returning it unchanged when the rates match.
///
/// The whole buffer is processed as a single chunk.
pub fn resample(buffer: SampleBuffer, target_rate: u32) -> Result<SampleBuffer> {
    if buffer.sample_rate == target_rate || buffer.is_empty() {
        return Ok(SampleBuffer {
            sample_rate: target_rate,
            ..buffer
        });
    }

    let planar = buffer.to_planar();
    let frames = buffer.frames();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / buffer.sample_rate as f64,
        2.0,
        params,
        frames,
        planar.len(),
    )
    .map_err(|e| DaemonError::encode_failed(format!("creating resampler: {}", e)))?;

    let resampled = resampler
        .process(&planar, None)
        .map_err(|e| DaemonError::encode_failed(format!("resampling: {}", e)))?;

    tracing::debug!(
        from = buffer.sample_rate,
        to = target_rate,
        frames_in = frames,
        frames_out = resampled.first().map(Vec::len).unwrap_or(0),
        "resampled audio"
    );

    Ok(SampleBuffer::from_planar(&resampled, target_rate))
}
