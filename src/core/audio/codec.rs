//! Conversion from synthesizer output to the telephony wire format.
//!
//! The synthesis engine produces 16-bit linear PCM at its native sample
//! rate; the media stream wants 8 kHz mono G.711 mu-law. Conversion is
//! stateless and applied per chunk, so each synthesized sentence can be
//! converted and shipped independently.

/// Sample rate of the telephony media stream.
pub const WIRE_SAMPLE_RATE: u32 = 8_000;

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32_635;

/// Converts little-endian PCM16 mono audio at `sample_rate` into 8 kHz
/// mu-law wire bytes. Downsampling is naive decimation; telephony audio
/// is bandlimited enough that this is acceptable for speech.
pub fn pcm16_to_wire(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let step = (sample_rate / WIRE_SAMPLE_RATE).max(1) as usize;
    pcm.chunks_exact(2)
        .step_by(step)
        .map(|pair| linear_to_mulaw(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// G.711 mu-law encoding of a single linear sample.
fn linear_to_mulaw(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0
    };
    if pcm > MULAW_CLIP {
        pcm = MULAW_CLIP;
    }
    pcm += MULAW_BIAS;

    let mut exponent = 7i32;
    let mut mask = 0x4000;
    while exponent > 0 && (pcm & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (pcm >> (exponent + 3)) & 0x0F;

    !((sign | (exponent << 4) | mantissa) as u8)
}
