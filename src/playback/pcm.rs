//! Raw PCM to normalized float conversion.

use super::types::AudioFormat;

/// Decoded, immutable samples ready for scheduling. Created once from a
/// slice of accumulated bytes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl DecodedAudioBuffer {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback time of this buffer in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Convert little-endian 16-bit signed PCM into normalized floats.
///
/// A trailing odd byte cannot form a sample and is ignored here; the chunk
/// buffer keeps such a byte out of the slices it flushes, so only the very
/// last flush of a stream can ever truncate.
///
/// Returns `None` when no whole sample is present, so callers never hand an
/// empty buffer to the scheduler.
pub fn decode(bytes: &[u8], format: &AudioFormat) -> Option<DecodedAudioBuffer> {
    let usable = bytes.len() & !1;
    if usable == 0 {
        return None;
    }
    // The uniform 32768.0 divisor maps 32767 to just under 1.0. The service
    // and its waveform fixtures assume this asymmetric mapping, so it stays.
    let samples = bytes[..usable]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Some(DecodedAudioBuffer {
        samples,
        sample_rate: format.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> AudioFormat {
        AudioFormat::stream()
    }

    #[test]
    fn known_vectors() {
        let buf = decode(&[0x00, 0x80, 0xFF, 0x7F, 0x00, 0x00], &fmt()).unwrap();
        assert_eq!(buf.samples(), &[-1.0, 32767.0 / 32768.0, 0.0]);
    }

    #[test]
    fn all_samples_stay_normalized() {
        let bytes: Vec<u8> = (0..=u8::MAX).flat_map(|b| [b, b ^ 0xA5]).collect();
        let buf = decode(&bytes, &fmt()).unwrap();
        for &sample in buf.samples() {
            assert!((-1.0..1.0).contains(&sample));
        }
    }

    #[test]
    fn trailing_byte_ignored() {
        let buf = decode(&[0x00, 0x80, 0x7F], &fmt()).unwrap();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.samples()[0], -1.0);
    }

    #[test]
    fn empty_and_single_byte_decode_to_nothing() {
        assert!(decode(&[], &fmt()).is_none());
        assert!(decode(&[0x42], &fmt()).is_none());
    }

    #[test]
    fn duration_follows_sample_rate() {
        let buf = decode(&vec![0u8; 48000], &fmt()).unwrap();
        assert_eq!(buf.len(), 24000);
        assert_eq!(buf.duration(), 1.0);
    }
}
