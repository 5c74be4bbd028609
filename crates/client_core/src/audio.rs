//! Silent audio attached to text-only memos; the store rejects creations without an audio part.

pub const PLACEHOLDER_FILE_NAME: &str = "placeholder.wav";
pub const PLACEHOLDER_MIME_TYPE: &str = "audio/wav";
pub const PLACEHOLDER_DURATION_SECONDS: u32 = 1;
const SAMPLE_RATE: u32 = 8_000;
// unsigned 8-bit PCM midpoint
const SILENCE: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderAudio {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub duration_seconds: u32,
    pub bytes: Vec<u8>,
}

pub fn silent_placeholder() -> PlaceholderAudio {
    PlaceholderAudio {
        file_name: PLACEHOLDER_FILE_NAME,
        mime_type: PLACEHOLDER_MIME_TYPE,
        duration_seconds: PLACEHOLDER_DURATION_SECONDS,
        bytes: silent_wav(PLACEHOLDER_DURATION_SECONDS),
    }
}

fn silent_wav(seconds: u32) -> Vec<u8> {
    let data_len = SAMPLE_RATE * seconds;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    // PCM, mono
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    // byte rate, block align, bits per sample
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&8u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, SILENCE);
    wav
}
