/// Sound engine: named effects synthesized at startup, played via rodio.
///
/// The simulation only knows cue names (`GameEvent::sound_cue`). Each
/// name maps to an in-memory WAV buffer built from a small note list.
/// Unknown names are a logged no-op; no audio device means a silent
/// engine rather than an error.
///
/// Build without the "sound" feature to drop rodio entirely.

use std::f32::consts::TAU;

const SAMPLE_RATE: u32 = 22050;

/// Every cue the game asks for.
pub const CUES: &[&str] = &["jump", "diamond_collect", "damage", "death", "level_complete"];

#[derive(Clone, Copy)]
enum Wave {
    Sine,
    /// Sine plus a third harmonic; reads as "retro square".
    Buzzy,
    /// Tone mixed with LCG noise.
    Noisy,
}

/// One segment: start and end frequency (Hz), seconds.
type Note = (f32, f32, f32);

fn recipe(cue: &str) -> Option<(Wave, &'static [Note])> {
    Some(match cue {
        "jump" => (Wave::Sine, &[(320.0, 720.0, 0.09)]),
        // C6 E6 G6
        "diamond_collect" => (Wave::Buzzy, &[(1047.0, 1047.0, 0.045), (1319.0, 1319.0, 0.045), (1568.0, 1568.0, 0.06)]),
        "damage" => (Wave::Noisy, &[(420.0, 160.0, 0.14)]),
        // A4 F#4 Eb4 C4
        "death" => (Wave::Sine, &[(440.0, 440.0, 0.12), (370.0, 370.0, 0.12), (311.0, 311.0, 0.12), (261.0, 261.0, 0.25)]),
        // C5 E5 G5 C6, last note held
        "level_complete" => (Wave::Buzzy, &[(523.0, 523.0, 0.1), (659.0, 659.0, 0.1), (784.0, 784.0, 0.1), (1047.0, 1047.0, 0.3)]),
        _ => return None,
    })
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn synth(wave: Wave, notes: &[Note]) -> Vec<f32> {
    let mut samples = Vec::new();
    let mut noise: u32 = 0x2545_f491;
    for &(f0, f1, dur) in notes {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        let mut phase = 0.0_f32;
        for i in 0..n {
            let t = i as f32 / n as f32;
            phase += (f0 + (f1 - f0) * t) / SAMPLE_RATE as f32;
            let s = match wave {
                Wave::Sine => (phase * TAU).sin(),
                Wave::Buzzy => (phase * TAU).sin() * 0.7 + (phase * 3.0 * TAU).sin() * 0.3,
                Wave::Noisy => {
                    noise = noise.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                    let r = (noise >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                    (phase * TAU).sin() * 0.4 + r * 0.6
                }
            };
            let env = (1.0 - t).powf(0.6);
            samples.push(s * env * 0.3);
        }
    }
    samples
}

/// 16-bit mono PCM WAV.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn make_wav(samples: &[f32]) -> Vec<u8> {
    let data_size = samples.len() as u32 * 2;
    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::{debug, warn};

    pub struct SoundEngine {
        output: Option<(OutputStream, OutputStreamHandle)>,
        buffers: HashMap<&'static str, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Self {
            let output = match OutputStream::try_default() {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    None
                }
            };
            let buffers = super::CUES
                .iter()
                .filter_map(|&name| {
                    let (wave, notes) = super::recipe(name)?;
                    Some((name, Arc::new(super::make_wav(&super::synth(wave, notes)))))
                })
                .collect();
            SoundEngine { output, buffers }
        }

        /// Fire-and-forget playback of a named cue.
        pub fn play(&self, name: &str) {
            let Some((_, handle)) = &self.output else { return };
            let Some(buf) = self.buffers.get(name) else {
                debug!(cue = name, "unknown sound cue");
                return;
            };
            if let Ok(sink) = Sink::try_new(handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Self {
        SoundEngine
    }

    pub fn play(&self, name: &str) {
        if recipe(name).is_none() {
            tracing::debug!(cue = name, "unknown sound cue");
        }
    }
}
