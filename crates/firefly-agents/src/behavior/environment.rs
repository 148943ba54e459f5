//! Day/night cycle and weather.
//!
//! Runs last so it can scale every force the other modules accumulated by
//! the current period's activity level, then adds wind.

use std::any::Any;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use firefly_types::{BehaviorKind, Vec2};

use super::{BehaviorContext, BehaviorModule};
use crate::error::AgentError;

/// Length of one simulated day.
pub const DAY_LENGTH_MS: f64 = 120_000.0;
const WEATHER_CHANGE_CHANCE: f64 = 0.0005;

/// Part of the simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    /// First sixth.
    Dawn,
    /// Second sixth.
    Morning,
    /// Third sixth.
    Afternoon,
    /// Fourth sixth.
    Dusk,
    /// Fifth sixth.
    Evening,
    /// Last sixth.
    Night,
}

impl DayPeriod {
    /// Period for a fraction of the day in `[0, 1)`.
    pub fn from_fraction(fraction: f64) -> Self {
        let sixth = (fraction.rem_euclid(1.0) * 6.0).floor();
        if sixth < 1.0 {
            Self::Dawn
        } else if sixth < 2.0 {
            Self::Morning
        } else if sixth < 3.0 {
            Self::Afternoon
        } else if sixth < 4.0 {
            Self::Dusk
        } else if sixth < 5.0 {
            Self::Evening
        } else {
            Self::Night
        }
    }

    /// Multiplier applied to accumulated forces.
    pub const fn activity(self) -> f64 {
        match self {
            Self::Dawn => 0.9,
            Self::Morning => 0.6,
            Self::Afternoon => 0.5,
            Self::Dusk => 1.2,
            Self::Evening => 1.0,
            Self::Night => 0.8,
        }
    }
}

/// Current weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    /// No wind.
    Clear,
    /// Light wind.
    Windy,
    /// Strong wind.
    Stormy,
}

impl Weather {
    const ALL: [Self; 3] = [Self::Clear, Self::Windy, Self::Stormy];

    /// Wind force magnitude.
    pub const fn wind(self) -> f64 {
        match self {
            Self::Clear => 0.0,
            Self::Windy => 0.02,
            Self::Stormy => 0.05,
        }
    }
}

/// Day/night and weather behavior.
#[derive(Debug)]
pub struct EnvironmentModule {
    clock_ms: f64,
    weather: Weather,
    wind_angle: f64,
}

impl Default for EnvironmentModule {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentModule {
    /// Start at dawn with clear skies.
    pub const fn new() -> Self {
        Self {
            clock_ms: 0.0,
            weather: Weather::Clear,
            wind_angle: 0.0,
        }
    }

    /// Current period of the day.
    pub fn period(&self) -> DayPeriod {
        DayPeriod::from_fraction(self.clock_ms / DAY_LENGTH_MS)
    }

    /// Current weather.
    pub const fn weather(&self) -> Weather {
        self.weather
    }
}

impl BehaviorModule for EnvironmentModule {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Environment
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), AgentError> {
        let before = self.period();
        self.clock_ms = (self.clock_ms + ctx.dt_ms).rem_euclid(DAY_LENGTH_MS);
        let period = self.period();
        if period != before {
            debug!(period = ?period, "Day period changed");
        }

        if ctx.rng.random_bool(WEATHER_CHANGE_CHANCE) {
            self.weather = Weather::ALL
                .get(ctx.rng.random_range(0..Weather::ALL.len()))
                .copied()
                .unwrap_or(Weather::Clear);
            self.wind_angle = ctx.rng.random_range(0.0..std::f64::consts::TAU);
            debug!(weather = ?self.weather, "Weather changed");
        }

        let activity = period.activity();
        let wind = Vec2::from_angle(self.wind_angle).scaled(self.weather.wind());
        for entity in ctx.population.entities_mut() {
            if entity.is_doomed() {
                continue;
            }
            entity.scale_force(activity);
            entity.apply_force(wind);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_split_the_day_in_sixths() {
        assert_eq!(DayPeriod::from_fraction(0.0), DayPeriod::Dawn);
        assert_eq!(DayPeriod::from_fraction(0.2), DayPeriod::Morning);
        assert_eq!(DayPeriod::from_fraction(0.5), DayPeriod::Dusk);
        assert_eq!(DayPeriod::from_fraction(0.99), DayPeriod::Night);
        assert_eq!(DayPeriod::from_fraction(1.0), DayPeriod::Dawn);
    }

    #[test]
    fn dusk_is_the_most_active() {
        let peak = [
            DayPeriod::Dawn,
            DayPeriod::Morning,
            DayPeriod::Afternoon,
            DayPeriod::Dusk,
            DayPeriod::Evening,
            DayPeriod::Night,
        ]
        .into_iter()
        .max_by(|a, b| a.activity().total_cmp(&b.activity()));
        assert_eq!(peak, Some(DayPeriod::Dusk));
    }
}
