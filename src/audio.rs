//! SDL2-backed audio output.
//!
//! Implements the audio unit's synthesis collaborator: the emulation core
//! pushes per-channel frequency/volume state into a shared snapshot, and the
//! SDL2 callback mixes square, triangle and noise waveforms from whatever
//! state is current when it fires.

use crate::apu::AudioSink;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};
use std::sync::{Arc, Mutex};

/// Snapshot of channel oscillator state shared with the audio callback
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    square: [(f32, f32, f32); 2], // frequency, volume, duty
    triangle: (f32, f32),         // frequency, volume
    noise: (f32, f32, bool),      // clock rate, volume, short mode
}

/// Audio output handler owning the SDL2 playback device
pub struct SdlAudio {
    device: AudioDevice<Mixer>,
    state: Arc<Mutex<ChannelState>>,
}

impl SdlAudio {
    /// Initialize SDL2 audio with the given sample rate
    pub fn new(sdl_context: &sdl2::Sdl, sample_rate: i32) -> Result<Self, String> {
        let audio_subsystem = sdl_context.audio()?;
        let desired_spec = AudioSpecDesired {
            freq: Some(sample_rate),
            channels: Some(1), // mono
            samples: None,     // default buffer size
        };

        let state = Arc::new(Mutex::new(ChannelState::default()));
        let callback_state = state.clone();
        let device = audio_subsystem.open_playback(None, &desired_spec, |spec| Mixer {
            state: callback_state,
            sample_rate: spec.freq as f32,
            square_phase: [0.0; 2],
            triangle_phase: 0.0,
            noise_phase: 0.0,
            noise_shift: 1,
        })?;

        Ok(Self { device, state })
    }

    /// Handle the core pushes channel state through
    pub fn sink(&self) -> SdlAudioSink {
        SdlAudioSink {
            state: self.state.clone(),
        }
    }

    pub fn resume(&self) {
        self.device.resume();
    }

    pub fn pause(&self) {
        self.device.pause();
    }
}

/// The `AudioSink` half handed to the audio unit
pub struct SdlAudioSink {
    state: Arc<Mutex<ChannelState>>,
}

impl AudioSink for SdlAudioSink {
    fn update_square(&mut self, channel: usize, frequency: f32, volume: f32, duty: f32) {
        if let Ok(mut state) = self.state.lock() {
            state.square[channel & 1] = (frequency, volume, duty);
        }
    }

    fn update_triangle(&mut self, frequency: f32, volume: f32) {
        if let Ok(mut state) = self.state.lock() {
            state.triangle = (frequency, volume);
        }
    }

    fn update_noise(&mut self, frequency: f32, volume: f32, short_mode: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.noise = (frequency, volume, short_mode);
        }
    }
}

/// SDL2 callback mixing the three channel models
struct Mixer {
    state: Arc<Mutex<ChannelState>>,
    sample_rate: f32,
    square_phase: [f32; 2],
    triangle_phase: f32,
    noise_phase: f32,
    /// 15-bit feedback shift register for noise generation
    noise_shift: u16,
}

impl Mixer {
    fn clock_noise_shift(&mut self, short_mode: bool) {
        let bit0 = self.noise_shift & 1;
        let tap = if short_mode {
            (self.noise_shift >> 6) & 1
        } else {
            (self.noise_shift >> 1) & 1
        };
        let feedback = bit0 ^ tap;
        self.noise_shift >>= 1;
        self.noise_shift = (self.noise_shift & 0x3FFF) | (feedback << 14);
    }
}

impl AudioCallback for Mixer {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        let state = match self.state.lock() {
            Ok(state) => *state,
            Err(_) => return,
        };

        for sample in out.iter_mut() {
            let mut mixed = 0.0;

            for (channel, &(frequency, volume, duty)) in state.square.iter().enumerate() {
                if volume > 0.0 && frequency > 0.0 {
                    self.square_phase[channel] =
                        (self.square_phase[channel] + frequency / self.sample_rate) % 1.0;
                    let level = if self.square_phase[channel] < duty { 1.0 } else { -1.0 };
                    mixed += level * volume * 0.25;
                }
            }

            let (tri_freq, tri_volume) = state.triangle;
            if tri_volume > 0.0 && tri_freq > 0.0 {
                self.triangle_phase = (self.triangle_phase + tri_freq / self.sample_rate) % 1.0;
                // Ramp -1..1..-1 across one period
                let ramp = if self.triangle_phase < 0.5 {
                    4.0 * self.triangle_phase - 1.0
                } else {
                    3.0 - 4.0 * self.triangle_phase
                };
                mixed += ramp * tri_volume * 0.25;
            }

            let (noise_rate, noise_volume, short_mode) = state.noise;
            if noise_volume > 0.0 && noise_rate > 0.0 {
                self.noise_phase += noise_rate / self.sample_rate;
                while self.noise_phase >= 1.0 {
                    self.noise_phase -= 1.0;
                    self.clock_noise_shift(short_mode);
                }
                let level = if self.noise_shift & 1 == 0 { 1.0 } else { -1.0 };
                mixed += level * noise_volume * 0.15;
            }

            *sample = mixed;
        }
    }
}
