// PCM codec utilities
// Decodes the raw speech payload into playable samples and wraps it in a WAV container

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::audio::AudioClip;
use crate::error::{AppError, AppResult};

/// Decode a base64 string into a raw byte buffer.
pub fn decode_base64(data: &str) -> AppResult<Vec<u8>> {
    BASE64
        .decode(data)
        .map_err(|e| AppError::Decode(format!("invalid base64 payload: {}", e)))
}

/// Interpret raw bytes as signed 16-bit little-endian PCM and convert to
/// normalized f32 samples.
///
/// A trailing partial sample is dropped silently.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioClip {
    let scale = 1.0 / 32768.0;
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 * scale)
        .collect();

    AudioClip {
        samples,
        sample_rate,
        channels,
    }
}

/// Build a 16-bit mono PCM WAV container around the raw sample bytes.
///
/// The output is a standard 44-byte RIFF/WAVE header followed by the PCM
/// data verbatim, playable in any standard audio player.
pub fn wav_bytes(pcm: &[u8], sample_rate: u32) -> AppResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + pcm.len()));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AppError::Decode(format!("failed to start wav container: {}", e)))?;
        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| AppError::Decode(format!("failed to write wav sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AppError::Decode(format!("failed to finalize wav container: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_decode_base64_roundtrip() {
        let bytes = vec![0u8, 1, 2, 3, 254, 255];
        let encoded = BASE64.encode(&bytes);
        assert_eq!(decode_base64(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64("not*base64!"),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_pcm16_values() {
        // 0, max positive, min negative, -1
        let mut bytes = Vec::new();
        for value in [0i16, 32767, -32768, -1] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let clip = decode_pcm16(&bytes, 24000, 1);

        assert_eq!(clip.samples.len(), bytes.len() / 2);
        assert_eq!(clip.samples[0], 0.0);
        assert_eq!(clip.samples[1], 32767.0 / 32768.0);
        assert_eq!(clip.samples[2], -1.0);
        assert_eq!(clip.samples[3], -1.0 / 32768.0);
        assert_eq!(clip.sample_rate, 24000);
        assert_eq!(clip.channels, 1);
    }

    #[test]
    fn test_decode_pcm16_truncates_trailing_byte() {
        let bytes = [0u8, 0, 0x12, 0x34, 0x56];
        let clip = decode_pcm16(&bytes, 24000, 1);
        assert_eq!(clip.samples.len(), 2);
    }

    #[test]
    fn test_decode_pcm16_duration() {
        let bytes = vec![0u8; 48000]; // one second of 16-bit mono at 24 kHz
        let clip = decode_pcm16(&bytes, 24000, 1);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wav_header_fields() {
        let pcm: Vec<u8> = (0..200u16).flat_map(|n| (n as i16).to_le_bytes()).collect();
        let wav = wav_bytes(&pcm, 24000).unwrap();

        assert_eq!(wav.len(), 44 + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4) as usize, 36 + pcm.len());
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16); // PCM fmt chunk size
        assert_eq!(u16_at(&wav, 20), 1); // format tag = PCM
        assert_eq!(u16_at(&wav, 22), 1); // channels
        assert_eq!(u32_at(&wav, 24), 24000); // sample rate
        assert_eq!(u32_at(&wav, 28), 48000); // byte rate
        assert_eq!(u16_at(&wav, 32), 2); // block align
        assert_eq!(u16_at(&wav, 34), 16); // bits per sample
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40) as usize, pcm.len());
        assert_eq!(&wav[44..], &pcm[..]);
    }

    #[test]
    fn test_wav_roundtrips_through_reader() {
        let pcm: Vec<u8> = [-32768i16, -1, 0, 1, 32767]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let wav = wav_bytes(&pcm, 24000).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![-32768, -1, 0, 1, 32767]);
    }

    #[test]
    fn test_wav_empty_payload() {
        let wav = wav_bytes(&[], 24000).unwrap();
        assert_eq!(wav.len(), 44);
        assert_eq!(u32_at(&wav, 40), 0);
    }
}
