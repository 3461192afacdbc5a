//! Audio system: synthesized 8-bit sound effects and background melody
//!
//! Everything is generated as square waves at runtime, no asset files.

use crate::game::GameEvent;
use crate::settings::AudioSettings;
use rand::Rng;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;

/// Number of notes in a generated melody
pub const MELODY_LENGTH: usize = 64;

/// Note durations to draw from; 0.2 s is listed twice so it comes up more
const NOTE_DURATIONS_MS: [u64; 5] = [100, 200, 200, 300, 400];

const MELODY_AMPLITUDE: f32 = 0.2;

/// A single square-wave tone
#[derive(Debug, Clone)]
pub struct SquareWave {
    frequency: f32,
    amplitude: f32,
    total_samples: usize,
    position: usize,
}

impl SquareWave {
    pub fn new(frequency: f32, duration: Duration, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            total_samples: (duration.as_micros() * SAMPLE_RATE as u128 / 1_000_000) as usize,
            position: 0,
        }
    }
}

impl Iterator for SquareWave {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total_samples {
            return None;
        }
        let t = self.position as f32 / SAMPLE_RATE as f32;
        self.position += 1;
        if (2.0 * PI * self.frequency * t).sin() >= 0.0 {
            Some(self.amplitude)
        } else {
            Some(-self.amplitude)
        }
    }
}

impl Source for SquareWave {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.position)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_micros(
            self.total_samples as u64 * 1_000_000 / SAMPLE_RATE as u64,
        ))
    }
}

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    /// Piece locked into the board
    Land,
    /// One soft drop step
    SoftDrop,
    /// Played once per cleared line
    Line,
    /// Extra fanfare for four lines at once
    Quad,
    GameOver,
}

impl Sfx {
    /// (frequency Hz, duration ms, amplitude)
    fn params(&self) -> (f32, u64, f32) {
        match self {
            Sfx::Land => (220.00, 100, 0.3),     // A3
            Sfx::SoftDrop => (523.25, 50, 0.4),  // C5
            Sfx::Line => (659.25, 100, 0.5),     // E5
            Sfx::Quad => (783.99, 200, 0.6),     // G5
            Sfx::GameOver => (130.81, 500, 0.5), // C3
        }
    }

    pub fn tone(&self) -> SquareWave {
        let (frequency, ms, amplitude) = self.params();
        SquareWave::new(frequency, Duration::from_millis(ms), amplitude)
    }
}

/// Sound effects for a game event, to be played back to back
pub fn cues_for(event: GameEvent) -> Vec<Sfx> {
    match event {
        GameEvent::PieceLocked => vec![Sfx::Land],
        GameEvent::SoftDropScored => vec![Sfx::SoftDrop],
        GameEvent::LinesCleared(lines) => {
            let mut cues = vec![Sfx::Line; lines];
            if lines == 4 {
                cues.push(Sfx::Quad);
            }
            cues
        }
        GameEvent::GameOver => vec![Sfx::GameOver],
    }
}

/// Keys the background melody can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicKey {
    C,
    F,
    G,
}

impl MusicKey {
    pub fn all() -> [MusicKey; 3] {
        [MusicKey::C, MusicKey::F, MusicKey::G]
    }

    /// Major pentatonic scale as note names
    fn scale(&self) -> [char; 5] {
        match self {
            MusicKey::C => ['C', 'D', 'E', 'G', 'A'],
            MusicKey::F => ['F', 'G', 'A', 'C', 'D'],
            MusicKey::G => ['G', 'A', 'B', 'D', 'E'],
        }
    }
}

/// Frequency of a note name in octave 4, or octave 5 when `octave_up`
fn note_frequency(note: char, octave_up: bool) -> f32 {
    let (base, upper) = match note {
        'C' => (261.63, 523.25),
        'D' => (293.66, 587.33),
        'E' => (329.63, 659.25),
        'F' => (349.23, 698.46),
        'G' => (392.00, 783.99),
        'A' => (440.00, 880.00),
        _ => (493.88, 987.77), // B
    };
    if octave_up { upper } else { base }
}

/// A generated background melody
#[derive(Debug, Clone, PartialEq)]
pub struct Melody {
    pub key: MusicKey,
    /// (frequency Hz, duration)
    pub notes: Vec<(f32, Duration)>,
}

impl Melody {
    /// Random pentatonic melody in a random key
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let keys = MusicKey::all();
        let key = keys[rng.gen_range(0..keys.len())];
        Self::generate(rng, key, MELODY_LENGTH)
    }

    pub fn generate<R: Rng>(rng: &mut R, key: MusicKey, length: usize) -> Self {
        let scale = key.scale();
        let notes = (0..length)
            .map(|_| {
                let note = scale[rng.gen_range(0..scale.len())];
                let octave_up = rng.gen_bool(0.5);
                let ms = NOTE_DURATIONS_MS[rng.gen_range(0..NOTE_DURATIONS_MS.len())];
                (note_frequency(note, octave_up), Duration::from_millis(ms))
            })
            .collect();
        Self { key, notes }
    }

    /// An endless source cycling through the melody
    pub fn looped(&self) -> MelodySource {
        MelodySource::new(self.notes.clone())
    }
}

/// Plays melody notes back to back, forever
#[derive(Debug, Clone)]
pub struct MelodySource {
    notes: Vec<(f32, Duration)>,
    index: usize,
    current: Option<SquareWave>,
}

impl MelodySource {
    fn new(notes: Vec<(f32, Duration)>) -> Self {
        let current = notes
            .first()
            .map(|&(frequency, duration)| SquareWave::new(frequency, duration, MELODY_AMPLITUDE));
        Self {
            notes,
            index: 0,
            current,
        }
    }
}

impl Iterator for MelodySource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        // Bounded so a melody of zero-length notes cannot spin forever
        for _ in 0..=self.notes.len() {
            if let Some(sample) = self.current.as_mut()?.next() {
                return Some(sample);
            }
            self.index = (self.index + 1) % self.notes.len();
            let (frequency, duration) = self.notes[self.index];
            self.current = Some(SquareWave::new(frequency, duration, MELODY_AMPLITUDE));
        }
        None
    }
}

impl Source for MelodySource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Audio manager handles all sound playback
pub struct AudioManager {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    music_sink: Option<Sink>,
    music_volume: f32,
    sfx_volume: f32,
}

impl AudioManager {
    /// Open the default output device; None when audio is disabled or
    /// unavailable
    pub fn new(settings: &AudioSettings) -> Option<Self> {
        if !settings.enabled {
            tracing::info!("Audio disabled in settings");
            return None;
        }
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("No audio output, playing silently: {}", e);
                return None;
            }
        };

        Some(Self {
            _stream: stream,
            stream_handle,
            music_sink: None,
            music_volume: settings.music_volume as f32 / 100.0,
            sfx_volume: settings.sfx_volume as f32 / 100.0,
        })
    }

    /// Start looping a melody, replacing any current one
    pub fn play_music(&mut self, melody: &Melody) {
        self.stop_music();
        if self.music_volume <= 0.0 || melody.notes.is_empty() {
            return;
        }
        let Ok(sink) = Sink::try_new(&self.stream_handle) else {
            return;
        };
        sink.set_volume(self.music_volume);
        sink.append(melody.looped());
        tracing::debug!("Playing {:?} melody of {} notes", melody.key, melody.notes.len());
        self.music_sink = Some(sink);
    }

    pub fn stop_music(&mut self) {
        if let Some(sink) = self.music_sink.take() {
            sink.stop();
        }
    }

    /// Play the cues for a game event
    pub fn handle_event(&self, event: GameEvent) {
        self.play_sequence(&cues_for(event));
    }

    /// Play sound effects back to back
    fn play_sequence(&self, cues: &[Sfx]) {
        if self.sfx_volume <= 0.0 || cues.is_empty() {
            return;
        }
        let Ok(sink) = Sink::try_new(&self.stream_handle) else {
            return;
        };
        sink.set_volume(self.sfx_volume);
        for sfx in cues {
            sink.append(sfx.tone());
        }
        sink.detach(); // Let it play and clean up automatically
    }

    /// Stop everything
    pub fn stop(&mut self) {
        self.stop_music();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_square_wave_length_and_levels() {
        let wave = SquareWave::new(220.0, Duration::from_millis(100), 0.3);
        assert_eq!(wave.total_duration(), Some(Duration::from_millis(100)));
        let samples: Vec<f32> = wave.collect();
        assert_eq!(samples.len(), 4410);
        assert_eq!(samples[0], 0.3);
        assert!(samples.iter().all(|&s| s == 0.3 || s == -0.3));
        assert!(samples.contains(&-0.3));
    }

    #[test]
    fn test_square_wave_frame_len_counts_down() {
        let mut wave = Sfx::SoftDrop.tone();
        let total = wave.current_frame_len().unwrap();
        wave.next();
        assert_eq!(wave.current_frame_len(), Some(total - 1));
    }

    #[test]
    fn test_cues_for_events() {
        assert_eq!(cues_for(GameEvent::PieceLocked), vec![Sfx::Land]);
        assert_eq!(cues_for(GameEvent::SoftDropScored), vec![Sfx::SoftDrop]);
        assert_eq!(cues_for(GameEvent::GameOver), vec![Sfx::GameOver]);
        assert_eq!(
            cues_for(GameEvent::LinesCleared(2)),
            vec![Sfx::Line, Sfx::Line]
        );
        assert_eq!(
            cues_for(GameEvent::LinesCleared(4)),
            vec![Sfx::Line, Sfx::Line, Sfx::Line, Sfx::Line, Sfx::Quad]
        );
    }

    #[test]
    fn test_melody_stays_in_scale() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let melody = Melody::generate(&mut rng, MusicKey::G, MELODY_LENGTH);
        assert_eq!(melody.notes.len(), 64);

        let allowed: Vec<f32> = MusicKey::G
            .scale()
            .iter()
            .flat_map(|&n| [note_frequency(n, false), note_frequency(n, true)])
            .collect();
        for (frequency, duration) in &melody.notes {
            assert!(allowed.contains(frequency), "{} not in G pentatonic", frequency);
            assert!(NOTE_DURATIONS_MS.contains(&(duration.as_millis() as u64)));
        }
    }

    #[test]
    fn test_random_melody_key() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let melody = Melody::random(&mut rng);
        assert!(MusicKey::all().contains(&melody.key));
        assert_eq!(melody.notes.len(), MELODY_LENGTH);
    }

    #[test]
    fn test_melody_source_loops() {
        let melody = Melody {
            key: MusicKey::C,
            notes: vec![
                (261.63, Duration::from_millis(10)),
                (523.26, Duration::from_millis(20)),
            ],
        };
        // 441 + 882 samples per pass; take three passes
        let samples = melody.looped().take(3 * 1323).count();
        assert_eq!(samples, 3 * 1323);
    }

    #[test]
    fn test_empty_melody_is_silent() {
        let melody = Melody {
            key: MusicKey::F,
            notes: Vec::new(),
        };
        assert_eq!(melody.looped().next(), None);
    }
}
