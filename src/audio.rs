use anyhow::{Context as _, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Software mixer over one cpal output stream.
///
/// Clips are decoded to mono f32 at load time and registered under a sound
/// id; playing a sound spawns a fire-and-forget voice. The mixer state is
/// independent of the output stream, so sounds can be triggered (and
/// inspected) with no audio device present; the stream, when running, just
/// drains whatever voices exist.
pub struct AudioSystem(pub(crate) Arc<AudioSystemInner>);

impl Clone for AudioSystem {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

pub(crate) struct AudioSystemInner {
    stream: Mutex<Option<cpal::Stream>>,
    mixer: Arc<Mutex<Mixer>>,
}

// cpal::Stream is safe to send and sync on the platforms this game targets.
// We explicitly implement Send and Sync to allow storing AudioSystem in a
// global static.
unsafe impl Send for AudioSystemInner {}
unsafe impl Sync for AudioSystemInner {}

impl fmt::Debug for AudioSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSystem").finish()
    }
}

struct Mixer {
    sample_rate: u32,
    channels: u16,
    next_play_id: u64,
    next_sound_id: u32,
    registry: HashMap<u32, SoundData>,
    voices: Vec<Voice>,
}

impl Mixer {
    fn process(&mut self, output: &mut [f32]) {
        let channels = self.channels.max(1) as usize;
        let frames = output.len() / channels;
        for frame in 0..frames {
            let mut mix = 0.0f32;
            for voice in &mut self.voices {
                mix += voice.next_sample(self.sample_rate);
            }
            let mix = mix.clamp(-1.0, 1.0);
            let base = frame * channels;
            for ch in 0..channels {
                output[base + ch] = mix;
            }
        }
        self.voices.retain(|voice| !voice.finished);
    }

    fn spawn_voice(&mut self, sound_id: u32) -> Option<u64> {
        let sound = self.registry.get(&sound_id)?;
        if sound.samples.is_empty() || sound.sample_rate == 0 {
            return None;
        }
        let play_id = self.next_play_id;
        self.next_play_id = self.next_play_id.wrapping_add(1).max(1);
        self.voices.push(Voice {
            id: play_id,
            sound_id,
            samples: Arc::clone(&sound.samples),
            source_rate: sound.sample_rate,
            position: 0.0,
            finished: false,
        });
        Some(play_id)
    }
}

impl AudioSystem {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AudioSystemInner {
            stream: Mutex::new(None),
            mixer: Arc::new(Mutex::new(Mixer {
                sample_rate: 44_100,
                channels: 2,
                next_play_id: 1,
                next_sound_id: 1,
                registry: HashMap::new(),
                voices: Vec::new(),
            })),
        }))
    }

    /// Opens the default output device and starts draining the mixer.
    ///
    /// Failure leaves the system in silent mode: triggers keep working, the
    /// samples just go nowhere.
    pub(crate) fn start_output(&self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no output device available")?;
        let config = device.default_output_config()?;

        {
            let Ok(mut mixer) = self.0.mixer.lock() else {
                return Err(anyhow::anyhow!("mixer lock poisoned"));
            };
            mixer.sample_rate = config.sample_rate();
            mixer.channels = config.channels();
        }

        let mixer = Arc::clone(&self.0.mixer);
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut m) = mixer.lock() {
                        m.process(data);
                    }
                },
                |err| log::warn!("audio stream error: {err}"),
                None,
            )?,
            other => return Err(anyhow::anyhow!("unsupported sample format {other:?}")),
        };
        stream.play()?;

        if let Ok(mut slot) = self.0.stream.lock() {
            *slot = Some(stream);
        }
        Ok(())
    }

    pub(crate) fn register_sound(&self, sound: SoundData) -> u32 {
        let Ok(mut mixer) = self.0.mixer.lock() else {
            return 0;
        };
        let sound_id = mixer.next_sound_id;
        mixer.next_sound_id = mixer.next_sound_id.saturating_add(1).max(1);
        mixer.registry.insert(sound_id, sound);
        sound_id
    }

    /// Starts a fresh voice for the sound.
    pub(crate) fn play(&self, sound_id: u32) -> Option<u64> {
        let Ok(mut mixer) = self.0.mixer.lock() else {
            return None;
        };
        mixer.spawn_voice(sound_id)
    }

    /// Rewind-and-play: any voice already playing this sound is cut, and the
    /// clip restarts from the beginning.
    pub(crate) fn restart(&self, sound_id: u32) -> Option<u64> {
        let Ok(mut mixer) = self.0.mixer.lock() else {
            return None;
        };
        mixer.voices.retain(|voice| voice.sound_id != sound_id);
        mixer.spawn_voice(sound_id)
    }

    pub(crate) fn stop(&self, play_id: u64) {
        if let Ok(mut mixer) = self.0.mixer.lock() {
            mixer.voices.retain(|voice| voice.id != play_id);
        }
    }

    pub(crate) fn is_playing(&self, play_id: u64) -> bool {
        let Ok(mixer) = self.0.mixer.lock() else {
            return false;
        };
        mixer
            .voices
            .iter()
            .any(|voice| voice.id == play_id && !voice.finished)
    }

    #[cfg(test)]
    pub(crate) fn latest_play_for(&self, sound_id: u32) -> Option<u64> {
        let mixer = self.0.mixer.lock().ok()?;
        mixer
            .voices
            .iter()
            .filter(|voice| voice.sound_id == sound_id)
            .map(|voice| voice.id)
            .max()
    }

    #[cfg(test)]
    pub(crate) fn active_plays(&self, sound_id: u32) -> usize {
        let Ok(mixer) = self.0.mixer.lock() else {
            return 0;
        };
        mixer
            .voices
            .iter()
            .filter(|voice| voice.sound_id == sound_id && !voice.finished)
            .count()
    }
}

#[derive(Clone)]
pub(crate) struct SoundData {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

struct Voice {
    id: u64,
    sound_id: u32,
    samples: Arc<Vec<f32>>,
    source_rate: u32,
    position: f64,
    finished: bool,
}

impl Voice {
    fn next_sample(&mut self, output_rate: u32) -> f32 {
        if self.finished || output_rate == 0 || self.source_rate == 0 {
            return 0.0;
        }

        let sample = self.sample_at_position();

        self.position += self.source_rate as f64 / output_rate as f64;
        if self.position >= self.samples.len() as f64 {
            self.finished = true;
        }

        sample
    }

    fn sample_at_position(&self) -> f32 {
        let len = self.samples.len();
        let idx = self.position.floor() as usize;
        if idx >= len {
            return 0.0;
        }
        let frac = (self.position - idx as f64) as f32;
        let s0 = self.samples[idx];
        let s1 = if idx + 1 < len { self.samples[idx + 1] } else { 0.0 };
        s0 + (s1 - s0) * frac
    }
}

/// Decodes an encoded clip (anything symphonia probes) to mono f32 PCM.
pub(crate) fn decode_sound_from_bytes(bytes: Vec<u8>) -> Result<SoundData> {
    let src = std::io::Cursor::new(bytes);
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("no supported audio track found")?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let track_id = track.id;
    let mut sample_rate = 0u32;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        mix_down(&decoded, &mut samples);
    }

    Ok(SoundData {
        samples: Arc::new(samples),
        sample_rate,
    })
}

fn mix_down(decoded: &AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => fold_mono(buf, out, |s| s),
        AudioBufferRef::U8(buf) => fold_mono(buf, out, |s| (s as f32 - 128.0) / 128.0),
        AudioBufferRef::S16(buf) => fold_mono(buf, out, |s| s as f32 / 32768.0),
        AudioBufferRef::S32(buf) => fold_mono(buf, out, |s| s as f32 / 2_147_483_648.0),
        _ => {}
    }
}

fn fold_mono<S: Sample>(buf: &AudioBuffer<S>, out: &mut Vec<f32>, conv: impl Fn(S) -> f32) {
    let channels = buf.spec().channels.count();
    for frame in 0..buf.frames() {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += conv(buf.chan(ch)[frame]);
        }
        out.push(sum / channels as f32);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Minimal 16-bit mono RIFF/WAVE blob for decode tests.
    pub(crate) fn wav_bytes(samples: &[i16], rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&rate.to_le_bytes());
        out.extend_from_slice(&(rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub(crate) fn beep() -> SoundData {
        SoundData {
            samples: Arc::new(vec![0.0, 0.5, -0.5, 0.25]),
            sample_rate: 22_050,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{beep, wav_bytes};
    use super::*;

    #[test]
    fn decodes_pcm_wav() {
        let samples: Vec<i16> = (0..220).map(|i| (i * 64) as i16).collect();
        let sound = decode_sound_from_bytes(wav_bytes(&samples, 22_050)).unwrap();
        assert_eq!(sound.sample_rate, 22_050);
        assert_eq!(sound.samples.len(), 220);
        assert!((sound.samples[1] - 64.0 / 32768.0).abs() < 1e-4);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_sound_from_bytes(vec![0u8; 64]).is_err());
    }

    #[test]
    fn restart_cuts_the_running_voice() {
        let audio = AudioSystem::new();
        let id = audio.register_sound(beep());

        let first = audio.play(id).unwrap();
        assert!(audio.is_playing(first));
        assert_eq!(audio.active_plays(id), 1);

        let second = audio.restart(id).unwrap();
        assert!(second > first);
        assert!(!audio.is_playing(first));
        assert_eq!(audio.active_plays(id), 1);
    }

    #[test]
    fn unknown_sound_does_not_play() {
        let audio = AudioSystem::new();
        assert_eq!(audio.play(999), None);
    }

    #[test]
    fn mixer_drains_finished_voices() {
        let audio = AudioSystem::new();
        let id = audio.register_sound(beep());
        audio.play(id).unwrap();

        let mut out = vec![0.0f32; 2 * 4096];
        audio.0.mixer.lock().unwrap().process(&mut out);
        assert_eq!(audio.active_plays(id), 0);
        // The four source samples upsampled to 44.1k must appear early on.
        assert!(out.iter().any(|s| s.abs() > 0.1));
    }
}
