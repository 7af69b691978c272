/// Host configuration
use crate::error::{HostError, Result};
use qmusic_crossfade::volume::MAX_VOLUME;
use qmusic_crossfade::CrossfadeConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "qmusic.toml";

/// Longest simulated track (24h)
pub const MAX_TRACK_MS: i64 = 86_400_000;

/// Slowest position tick
pub const MAX_TICK_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub player: PlayerSettings,

    #[serde(default)]
    pub crossfade: CrossfadeConfig,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerSettings {
    #[serde(default = "default_volume")]
    pub volume: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Playlist as track durations in milliseconds
    #[serde(default = "default_tracks_ms")]
    pub tracks_ms: Vec<i64>,

    /// Position update interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Skip to the next track partway through one
    #[serde(default)]
    pub skip: Option<TrackSkip>,

    /// Move the volume slider at some point of the run
    #[serde(default)]
    pub volume_change: Option<VolumeChange>,
}

/// Skip `track` (playlist index) once it reaches `at_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackSkip {
    pub track: usize,
    pub at_ms: i64,
}

/// Set the volume to `volume` once `at_ms` of the whole run has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct VolumeChange {
    pub at_ms: i64,
    pub volume: u8,
}

/// Split `a:b` into two parsed halves
fn parse_pair<A: FromStr, B: FromStr>(s: &str, usage: &str) -> Result<(A, B)> {
    let invalid = || HostError::InvalidArgument(format!("expected {}, got {:?}", usage, s));

    let (a, b) = s.split_once(':').ok_or_else(invalid)?;
    let a = a.trim().parse().map_err(|_| invalid())?;
    let b = b.trim().parse().map_err(|_| invalid())?;
    Ok((a, b))
}

impl FromStr for TrackSkip {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self> {
        let (track, at_ms) = parse_pair(s, "TRACK:AT_MS")?;
        Ok(Self { track, at_ms })
    }
}

impl fmt::Display for TrackSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.track, self.at_ms)
    }
}

impl FromStr for VolumeChange {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self> {
        let (at_ms, volume) = parse_pair(s, "AT_MS:VOLUME")?;
        Ok(Self { at_ms, volume })
    }
}

impl fmt::Display for VolumeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.at_ms, self.volume)
    }
}

impl HostConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `qmusic.toml` in the working
    /// directory is used if present. `QMUSIC_` environment variables override
    /// file values, nested keys joined with `__` (e.g.
    /// `QMUSIC_CROSSFADE__FADE_IN_RATE_HZ=100`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("QMUSIC")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("simulation.tracks_ms")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| HostError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| HostError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.player.volume > MAX_VOLUME {
            return Err(HostError::Config(format!(
                "Player volume {} is above {}",
                self.player.volume, MAX_VOLUME
            )));
        }

        self.crossfade
            .validate()
            .map_err(|e| HostError::Config(e.to_string()))?;

        let simulation = &self.simulation;
        if simulation.tracks_ms.is_empty() {
            return Err(HostError::Config(
                "Simulation needs at least one track".to_string(),
            ));
        }
        if let Some(duration) = simulation
            .tracks_ms
            .iter()
            .find(|d| **d <= 0 || **d > MAX_TRACK_MS)
        {
            return Err(HostError::Config(format!(
                "Track duration must be within 1..={} ms, got {} ms",
                MAX_TRACK_MS, duration
            )));
        }
        if simulation.tick_ms == 0 || simulation.tick_ms > MAX_TICK_MS {
            return Err(HostError::Config(format!(
                "Simulation tick must be within 1..={} ms, got {} ms",
                MAX_TICK_MS, simulation.tick_ms
            )));
        }
        if let Some(skip) = simulation.skip {
            if skip.track >= simulation.tracks_ms.len() {
                return Err(HostError::Config(format!(
                    "Skip refers to track {} but the playlist has {}",
                    skip.track,
                    simulation.tracks_ms.len()
                )));
            }
        }
        if let Some(change) = simulation.volume_change {
            if change.volume > MAX_VOLUME {
                return Err(HostError::Config(format!(
                    "Volume change to {} is above {}",
                    change.volume, MAX_VOLUME
                )));
            }
        }

        Ok(())
    }

    /// Render as TOML, the format `load` reads
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))
    }
}

// Default values
fn default_volume() -> u8 {
    100
}

fn default_tracks_ms() -> Vec<i64> {
    vec![5_000, 4_000, 6_000]
}

fn default_tick_ms() -> u64 {
    100
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tracks_ms: default_tracks_ms(),
            tick_ms: default_tick_ms(),
            skip: None,
            volume_change: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmusic_crossfade::ManualVolumePolicy;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = HostConfig::default();
        assert_eq!(config.player.volume, 100);
        assert!(config.crossfade.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[player]
volume = 70

[crossfade]
fade_in_rate_hz = 100
manual_volume = "follow_ramp"

[simulation]
tracks_ms = [3000, 3000]
tick_ms = 50
skip = {{ track = 0, at_ms = 1200 }}
"#
        )
        .unwrap();

        let config = HostConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.player.volume, 70);
        assert_eq!(config.crossfade.fade_in_rate_hz, 100);
        assert_eq!(config.crossfade.fade_out_rate_hz, 200);
        assert_eq!(
            config.crossfade.manual_volume,
            ManualVolumePolicy::FollowRamp
        );
        assert_eq!(config.simulation.tracks_ms, vec![3000, 3000]);
        assert_eq!(config.simulation.tick_ms, 50);
        assert_eq!(
            config.simulation.skip,
            Some(TrackSkip {
                track: 0,
                at_ms: 1200
            })
        );
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let result = HostConfig::load(Some(Path::new("/nonexistent/qmusic.toml")));
        assert!(matches!(result, Err(HostError::Config(_))));
    }

    #[test]
    fn toml_output_loads_back() {
        let mut config = HostConfig::default();
        config.simulation.volume_change = Some(VolumeChange {
            at_ms: 4500,
            volume: 40,
        });

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        assert_eq!(HostConfig::load(Some(file.path())).unwrap(), config);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = HostConfig::default();
        config.player.volume = 120;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.crossfade.fade_out_rate_hz = 0;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tracks_ms = vec![];
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tracks_ms = vec![3000, 0];
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tick_ms = MAX_TICK_MS + 1;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tracks_ms = vec![i64::MAX, 1];
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.simulation.tracks_ms = vec![MAX_TRACK_MS, 1];
        config.simulation.tick_ms = MAX_TICK_MS;
        assert!(config.validate().is_ok());

        let mut config = HostConfig::default();
        config.simulation.skip = Some(TrackSkip {
            track: 3,
            at_ms: 100,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_cli_pairs() {
        assert_eq!(
            "1:2500".parse::<TrackSkip>().unwrap(),
            TrackSkip {
                track: 1,
                at_ms: 2500
            }
        );
        assert_eq!(
            "4000:35".parse::<VolumeChange>().unwrap(),
            VolumeChange {
                at_ms: 4000,
                volume: 35
            }
        );
        assert!("4000".parse::<VolumeChange>().is_err());
        assert!("a:b".parse::<TrackSkip>().is_err());
        assert_eq!(
            VolumeChange {
                at_ms: 10,
                volume: 5
            }
            .to_string(),
            "10:5"
        );
    }
}
