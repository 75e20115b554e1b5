use std::time::Duration;
use anyhow::Result;
use rubato::{SincFixedIn, SincInterpolationType, SincInterpolationParameters, WindowFunction, Resampler};

pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        samples.len(),
        1, // mono
    )?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();

    let input = vec![samples.to_vec()];
    let mut output = resampler.process(&input, None)?
        .into_iter()
        .next()
        .unwrap_or_default();

    // The sinc filter holds back `delay` frames; flush them with silence.
    while output.len() < expected_len + delay {
        let tail = resampler.process_partial(None::<&[Vec<f32>]>, None)?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.resize(expected_len, 0.0);
    Ok(output)
}

/// Interleave a mono signal into `channels` identical copies per frame.
pub fn upmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let mut interleaved = Vec::with_capacity(samples.len() * channels);
    for &sample in samples {
        interleaved.extend(std::iter::repeat(sample).take(channels));
    }
    interleaved
}

pub fn duration_of(sample_count: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(sample_count as f64 / sample_rate as f64)
}
