use crate::error::{AppError, Result};
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

/// Decoded mono audio at its source rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an audio byte stream to mono f32 samples. The filename is advisory:
/// its extension routes WAV through hound and everything else through the
/// symphonia probe.
pub fn decode_bytes(bytes: &[u8], filename: &str) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        return Err(AppError::Decode("empty audio stream".into()));
    }

    let extension = filename
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let decoded = match extension.as_str() {
        "wav" => decode_wav(bytes)?,
        _ => decode_with_symphonia(bytes, &extension)?,
    };

    if decoded.samples.is_empty() {
        return Err(AppError::Decode("no audio frames decoded".into()));
    }

    debug!(
        "Decoded {} samples at {}Hz from '{}'",
        decoded.samples.len(),
        decoded.sample_rate,
        filename
    );

    Ok(decoded)
}

fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AppError::Decode(e.to_string()))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;

    info!(
        "Decoding WAV: {}Hz, {} channels, {:?}",
        sample_rate, channels, spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AppError::Decode(e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        samples: mix_to_mono(&samples, channels),
        sample_rate,
    })
}

fn decode_with_symphonia(bytes: &[u8], extension: &str) -> Result<DecodedAudio> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AppError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AppError::Decode("no supported audio track".into()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AppError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AppError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break, // end of stream
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(buffer) => append_mono(&buffer, &mut samples),
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(AppError::Decode(e.to_string())),
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Mix a decoded packet down to mono and append it to `out`.
fn append_mono(buffer: &AudioBufferRef<'_>, out: &mut Vec<f32>) {
    macro_rules! mix {
        ($buf:expr, $to_f32:expr) => {{
            let channels = $buf.spec().channels.count();
            for frame in 0..$buf.frames() {
                let sum: f32 = (0..channels).map(|ch| $to_f32($buf.chan(ch)[frame])).sum();
                out.push(sum / channels as f32);
            }
        }};
    }

    match buffer {
        AudioBufferRef::F32(buf) => mix!(buf, |s: f32| s),
        AudioBufferRef::F64(buf) => mix!(buf, |s: f64| s as f32),
        AudioBufferRef::S32(buf) => mix!(buf, |s: i32| s as f32 / i32::MAX as f32),
        AudioBufferRef::S16(buf) => mix!(buf, |s: i16| s as f32 / 32768.0),
        AudioBufferRef::U8(buf) => mix!(buf, |s: u8| (s as f32 - 128.0) / 128.0),
        AudioBufferRef::S24(buf) => {
            mix!(buf, |s: symphonia::core::sample::i24| s.inner() as f32
                / 8_388_608.0)
        }
        _ => {}
    }
}

fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * 32767.0) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_wav_to_mono() {
        let samples: Vec<f32> = (0..4410)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        let bytes = wav_bytes(&samples, 44100);

        let decoded = decode_bytes(&bytes, "clip.wav").unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.samples.len(), 4410);
    }

    #[test]
    fn stereo_wav_is_averaged() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16384i16).unwrap();
                writer.write_sample(-16384i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = decode_bytes(&cursor.into_inner(), "stereo.wav").unwrap();
        assert_eq!(decoded.samples.len(), 100);
        assert!(decoded.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let result = decode_bytes(b"definitely not audio", "clip.wav");
        assert!(matches!(result, Err(AppError::Decode(_))));

        let result = decode_bytes(b"definitely not audio", "clip.mp3");
        assert!(matches!(result, Err(AppError::Decode(_))));
    }

    #[test]
    fn empty_stream_fails() {
        assert!(matches!(
            decode_bytes(&[], "clip.wav"),
            Err(AppError::Decode(_))
        ));
    }
}
