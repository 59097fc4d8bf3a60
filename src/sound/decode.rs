//! Decoding of downloaded cue bytes into mono PCM

use std::io::Cursor;

use crate::{Error, Result};

/// Mono PCM samples with their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode MP3 or WAV bytes to mono f32 samples
///
/// WAV is recognised by its `RIFF` header; everything else is treated as MP3.
///
/// # Errors
///
/// Returns error if the bytes cannot be decoded or contain no audio
pub fn decode(data: &[u8]) -> Result<Pcm> {
    let pcm = if data.starts_with(b"RIFF") {
        decode_wav(data)?
    } else {
        decode_mp3(data)?
    };

    if pcm.samples.is_empty() {
        return Err(Error::Decode("no audio frames".to_string()));
    }

    Ok(pcm)
}

/// Decode MP3 bytes, averaging stereo down to mono
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn decode_mp3(mp3_data: &[u8]) -> Result<Pcm> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0_u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                if frame.channels == 2 {
                    for chunk in frame.data.chunks(2) {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        samples.push(f32::midpoint(left, right));
                    }
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(Pcm {
        samples,
        sample_rate,
    })
}

/// Decode WAV bytes of any channel count, averaging frames down to mono
#[allow(clippy::cast_precision_loss)]
fn decode_wav(wav_data: &[u8]) -> Result<Pcm> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_data))
        .map_err(|e| Error::Decode(format!("WAV header: {e}")))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(format!("WAV samples: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(format!("WAV samples: {e}")))?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(Pcm {
        samples,
        sample_rate: spec.sample_rate,
    })
}
