//! Canonical 44-byte WAV header construction.
//!
//! Playback consumes the PCM stream directly; this exists so a captured
//! stream can be written out as a standalone playable file.

use std::fs;
use std::io;
use std::path::Path;

use super::types::AudioFormat;

pub const WAV_HEADER_LEN: usize = 44;

/// Build the RIFF/WAVE/fmt/data header for `data_len` payload bytes.
///
/// Pure and deterministic; the payload itself is never read.
pub fn build_wav_header(data_len: u32, format: &AudioFormat) -> [u8; WAV_HEADER_LEN] {
    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}

/// Header plus payload as one playable byte vector.
pub fn wav_bytes(pcm: &[u8], format: &AudioFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    out.extend_from_slice(&build_wav_header(pcm.len() as u32, format));
    out.extend_from_slice(pcm);
    out
}

pub fn write_wav(path: &Path, pcm: &[u8], format: &AudioFormat) -> io::Result<()> {
    fs::write(path, wav_bytes(pcm, format))
}
