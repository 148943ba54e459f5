//! Audio cues for lifecycle events.
//!
//! Synthesis is someone else's problem: this module decides *which* cue to
//! play, at what pitch and volume, and hands it to an [`AudioBackend`].
//! Backends need a one-time [`AudioCues::initialize`] (normally triggered by
//! user interaction); until then every cue is dropped silently and the frame
//! loop carries on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use firefly_events::{EventKind, SimEvent, Signal};
use firefly_types::Tier;

use crate::config::AudioConfig;
use crate::error::ObserverError;
use crate::observer::Observer;

/// What a cue announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    /// Birth chirp.
    Birth,
    /// Death fade.
    Death,
    /// Collision click.
    Collision,
    /// Evolution chime.
    Evolution,
    /// Predator growl.
    Predator,
    /// Rare variant sparkle.
    Rare,
    /// Cosmic event swell.
    Cosmic,
    /// Achievement fanfare.
    Achievement,
}

impl CueKind {
    /// Minimum simulated time between two cues of this kind.
    pub const fn cooldown_ms(self) -> f64 {
        match self {
            Self::Birth | Self::Death => 50.0,
            Self::Collision => 30.0,
            Self::Evolution => 100.0,
            Self::Predator => 200.0,
            Self::Rare | Self::Cosmic | Self::Achievement => 0.0,
        }
    }

    const fn duration_ms(self) -> f64 {
        match self {
            Self::Collision => 40.0,
            Self::Birth | Self::Death => 120.0,
            Self::Evolution | Self::Rare => 400.0,
            Self::Predator | Self::Achievement => 600.0,
            Self::Cosmic => 2000.0,
        }
    }
}

/// A sound to play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cue {
    /// What it announces.
    pub kind: CueKind,
    /// Base frequency in hertz.
    pub frequency_hz: f64,
    /// Linear gain in `[0, 1]`.
    pub volume: f64,
    /// Length of the sound.
    pub duration_ms: f64,
}

/// Sink for cues.
pub trait AudioBackend: std::fmt::Debug {
    /// Prepare the backend. Called once, outside the frame loop.
    fn initialize(&mut self) -> Result<(), ObserverError> {
        Ok(())
    }

    /// Play one cue.
    fn play(&mut self, cue: &Cue) -> Result<(), ObserverError>;
}

/// Backend that discards every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
    fn play(&mut self, _cue: &Cue) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Backend that keeps every cue it receives, for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    played: Rc<RefCell<Vec<Cue>>>,
}

impl RecordingBackend {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the recorded cues, shared with the backend.
    pub fn played(&self) -> Rc<RefCell<Vec<Cue>>> {
        Rc::clone(&self.played)
    }
}

impl AudioBackend for RecordingBackend {
    fn play(&mut self, cue: &Cue) -> Result<(), ObserverError> {
        self.played
            .try_borrow_mut()
            .map_err(|_borrowed| ObserverError::Audio("recording buffer is borrowed".to_owned()))?
            .push(*cue);
        Ok(())
    }
}

const SIGNALS: &[Signal] = &[
    Signal::Birth,
    Signal::Death,
    Signal::Collision,
    Signal::Evolution,
    Signal::PredatorKill,
    Signal::HazardKill,
    Signal::RareSpawn,
    Signal::EventStart,
    Signal::AchievementUnlocked,
];

/// Event-driven cue selection with per-kind rate limiting.
#[derive(Debug)]
pub struct AudioCues {
    config: AudioConfig,
    backend: Box<dyn AudioBackend>,
    initialized: bool,
    last_played: BTreeMap<CueKind, f64>,
    rng: StdRng,
    played: u64,
}

impl AudioCues {
    /// Cue player over `backend`. `seed` drives pitch variation.
    pub fn new(config: AudioConfig, backend: Box<dyn AudioBackend>, seed: u64) -> Self {
        Self {
            config,
            backend,
            initialized: false,
            last_played: BTreeMap::new(),
            rng: StdRng::seed_from_u64(seed),
            played: 0,
        }
    }

    /// One-time deferred setup. Does nothing when audio is disabled or
    /// already initialized.
    pub fn initialize(&mut self) -> Result<(), ObserverError> {
        if !self.config.enabled || self.initialized {
            return Ok(());
        }
        self.backend.initialize()?;
        self.initialized = true;
        info!(master_volume = self.config.master_volume, "Audio initialized");
        Ok(())
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Turn cues on or off at runtime.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub const fn set_master_volume(&mut self, volume: f64) {
        self.config.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Cues handed to the backend so far.
    pub const fn played(&self) -> u64 {
        self.played
    }

    /// Active configuration.
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Play `kind` at `base_hz` if audio is live and the kind is off
    /// cooldown at `now_ms`. Returns whether the cue was sent.
    pub fn cue(&mut self, kind: CueKind, base_hz: f64, now_ms: f64) -> Result<bool, ObserverError> {
        if !self.config.enabled || !self.initialized {
            return Ok(false);
        }
        if let Some(&last) = self.last_played.get(&kind)
            && now_ms - last < kind.cooldown_ms()
        {
            return Ok(false);
        }

        let spread = self.config.pitch_variation.abs();
        let detune = if spread > 0.0 {
            self.rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        let layer = if kind == CueKind::Cosmic {
            self.config.ambient_volume
        } else {
            self.config.event_volume
        };
        let cue = Cue {
            kind,
            frequency_hz: base_hz * (1.0 + detune),
            volume: (self.config.master_volume * layer).clamp(0.0, 1.0),
            duration_ms: kind.duration_ms(),
        };

        self.last_played.insert(kind, now_ms);
        self.backend.play(&cue)?;
        self.played = self.played.saturating_add(1);
        debug!(?kind, frequency = cue.frequency_hz, "Cue played");
        Ok(true)
    }
}

fn tier_pitch(base: f64, step: f64, tier: Tier) -> f64 {
    step.mul_add(f64::from(tier.level()), base)
}

impl Observer for AudioCues {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn signals(&self) -> &'static [Signal] {
        SIGNALS
    }

    fn handle(&mut self, event: &SimEvent) -> Result<(), ObserverError> {
        let (kind, hz) = match &event.kind {
            EventKind::Birth { entity, .. } => (CueKind::Birth, tier_pitch(440.0, 100.0, entity.tier)),
            EventKind::Death { entity, .. } => (CueKind::Death, tier_pitch(220.0, 50.0, entity.tier)),
            EventKind::Collision { .. } => (CueKind::Collision, 660.0),
            EventKind::Evolution { to, .. } => (CueKind::Evolution, tier_pitch(523.25, 130.0, *to)),
            EventKind::PredatorKill { .. } => (CueKind::Predator, 110.0),
            EventKind::HazardKill { .. } => (CueKind::Predator, 82.41),
            EventKind::RareSpawn { .. } => (CueKind::Rare, 880.0),
            EventKind::EventStart { .. } => (CueKind::Cosmic, 196.0),
            EventKind::AchievementUnlocked { .. } => (CueKind::Achievement, 784.0),
            _ => return Ok(()),
        };
        self.cue(kind, hz, event.at_ms).map(|_played| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn live(config: AudioConfig) -> (AudioCues, Rc<RefCell<Vec<Cue>>>) {
        let backend = RecordingBackend::new();
        let played = backend.played();
        let mut cues = AudioCues::new(config, Box::new(backend), 7);
        cues.initialize().unwrap();
        (cues, played)
    }

    fn enabled() -> AudioConfig {
        AudioConfig {
            enabled: true,
            pitch_variation: 0.0,
            ..AudioConfig::default()
        }
    }

    #[test]
    fn cues_are_dropped_until_initialized() {
        let backend = RecordingBackend::new();
        let played = backend.played();
        let mut cues = AudioCues::new(enabled(), Box::new(backend), 1);
        assert!(!cues.cue(CueKind::Birth, 440.0, 0.0).unwrap());
        cues.initialize().unwrap();
        assert!(cues.cue(CueKind::Birth, 440.0, 0.0).unwrap());
        assert_eq!(played.borrow().len(), 1);
    }

    #[test]
    fn disabled_audio_never_initializes() {
        let mut cues = AudioCues::new(AudioConfig::default(), Box::new(SilentBackend), 1);
        cues.initialize().unwrap();
        assert!(!cues.is_initialized());
        assert!(!cues.cue(CueKind::Death, 220.0, 0.0).unwrap());
    }

    #[test]
    fn cooldown_limits_repeats_per_kind() {
        let (mut cues, played) = live(enabled());
        assert!(cues.cue(CueKind::Predator, 110.0, 0.0).unwrap());
        assert!(!cues.cue(CueKind::Predator, 110.0, 150.0).unwrap());
        assert!(cues.cue(CueKind::Collision, 660.0, 150.0).unwrap());
        assert!(cues.cue(CueKind::Predator, 110.0, 200.0).unwrap());
        assert_eq!(played.borrow().len(), 3);
    }

    #[test]
    fn pitch_rises_with_tier_and_volume_follows_layers() {
        let (mut cues, played) = live(enabled());
        cues.cue(CueKind::Birth, tier_pitch(440.0, 100.0, Tier::Basic), 0.0).unwrap();
        cues.cue(CueKind::Cosmic, 196.0, 0.0).unwrap();
        cues.cue(CueKind::Birth, tier_pitch(440.0, 100.0, Tier::Ascended), 100.0).unwrap();
        let played = played.borrow();
        let summary: Vec<(f64, f64)> = played.iter().map(|c| (c.frequency_hz, c.volume)).collect();
        let expected = [(440.0, 0.3), (196.0, 0.15), (840.0, 0.3)];
        assert_eq!(summary.len(), expected.len());
        for ((hz, volume), (want_hz, want_volume)) in summary.into_iter().zip(expected) {
            assert!((hz - want_hz).abs() < 1e-9);
            assert!((volume - want_volume).abs() < 1e-9);
        }
    }

    #[test]
    fn variation_stays_within_spread() {
        let (mut cues, played) = live(AudioConfig {
            enabled: true,
            pitch_variation: 0.1,
            ..AudioConfig::default()
        });
        for i in 0..50 {
            cues.cue(CueKind::Achievement, 784.0, f64::from(i)).unwrap();
        }
        assert!(
            played
                .borrow()
                .iter()
                .all(|c| (c.frequency_hz - 784.0).abs() <= 78.4 + 1e-9)
        );
    }
}
