use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

const CHUNK_SIZE: usize = 1024;

/// Resample mono audio using rubato
///
/// The tail is zero-padded to a full chunk and the output trimmed back to the
/// length implied by the rate ratio.
///
/// # Errors
///
/// Returns error if the resampler rejects the rates
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Audio(format!(
            "cannot resample from {from_rate} Hz to {to_rate} Hz"
        )));
    }

    let mut resampler = FftFixedIn::<f64>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        2,
        1,
    )
    .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;

    let expected =
        (samples.len() as f64 * f64::from(to_rate) / f64::from(from_rate)).round() as usize;
    // The resampler may round the chunk size to suit the rate ratio
    let chunk_size = resampler.input_frames_next();
    let mut output = Vec::with_capacity(expected + resampler.output_frames_max());

    for chunk in samples.chunks(chunk_size) {
        let mut block: Vec<f64> = chunk.iter().map(|&s| f64::from(s)).collect();
        block.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[block], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    // Flush the resampler's internal delay
    while output.len() < expected {
        let result = resampler
            .process(&[vec![0.0; chunk_size]], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        if result[0].is_empty() {
            break;
        }
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    output.truncate(expected);
    Ok(output)
}
