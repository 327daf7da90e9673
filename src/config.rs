//! Command line arguments and engine settings.

use std::time::Duration;

use clap::Parser;

use crate::theory::{Scale, Voicing};

/// MIDI clock resolution: pulses per quarter note
pub const PULSES_PER_QUARTER_NOTE: u64 = 24;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List available MIDI devices
    #[arg(long)]
    pub device_list: bool,

    /// Bind to a specific MIDI input device
    #[arg(long)]
    pub bind_to_device: Option<String>,

    /// Send transformed events to this MIDI output device
    #[arg(long)]
    pub midi_output: Option<String>,

    /// Key to conform notes to, e.g. C_major or f#_minor
    #[arg(long, default_value = "C_major")]
    pub key: String,

    /// Chord voicing: root, first, second, third or open
    #[arg(long, default_value = "root")]
    pub voicing: String,

    /// Pipeline mode: through, through-all, chord or chord-echo
    #[arg(long, default_value = "chord")]
    pub mode: String,

    /// Milliseconds between strummed chord tones
    #[arg(long, default_value_t = 50)]
    pub stagger_ms: u64,

    /// Milliseconds before the echoed note sounds
    #[arg(long, default_value_t = 500)]
    pub echo_ms: u64,
}

/// Which transformation chain the dispatcher runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Forward notes unchanged
    Through,
    /// Forward every decoded event unchanged
    ThroughAll,
    /// Expand notes into strummed chords
    Chord,
    /// Chords plus a delayed transposed echo
    ChordEcho,
}

impl PipelineMode {
    pub fn parse(name: &str) -> Result<PipelineMode, String> {
        match name {
            "through" => Ok(PipelineMode::Through),
            "through-all" => Ok(PipelineMode::ThroughAll),
            "chord" => Ok(PipelineMode::Chord),
            "chord-echo" => Ok(PipelineMode::ChordEcho),
            other => Err(format!(
                "unknown mode '{}', expected through, through-all, chord or chord-echo",
                other
            )),
        }
    }
}

/// Validated engine settings derived from [`Args`]
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub scale: Scale,
    pub voicing: Voicing,
    pub mode: PipelineMode,
    pub stagger: Duration,
    pub echo: Duration,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Settings, String> {
        Ok(Settings {
            scale: Scale::parse(&args.key)?,
            voicing: Voicing::parse(&args.voicing)?,
            mode: PipelineMode::parse(&args.mode)?,
            stagger: Duration::from_millis(args.stagger_ms),
            echo: Duration::from_millis(args.echo_ms),
        })
    }
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(key: &str, voicing: &str, mode: &str) -> Args {
        Args {
            device_list: false,
            bind_to_device: None,
            midi_output: None,
            key: key.to_string(),
            voicing: voicing.to_string(),
            mode: mode.to_string(),
            stagger_ms: 50,
            echo_ms: 500,
        }
    }

    #[test]
    fn test_defaults_parse() {
        let settings = Settings::from_args(&args_with("C_major", "root", "chord")).unwrap();
        assert_eq!(settings.mode, PipelineMode::Chord);
        assert_eq!(settings.voicing, Voicing::Root);
        assert_eq!(settings.stagger, Duration::from_millis(50));
    }

    #[test]
    fn test_bad_key_is_rejected() {
        assert!(Settings::from_args(&args_with("H_major", "root", "chord")).is_err());
    }

    #[test]
    fn test_bad_mode_is_rejected() {
        assert!(Settings::from_args(&args_with("C_major", "root", "reverb")).is_err());
    }

    #[test]
    fn test_validate_device_matches_substring() {
        let devices = vec!["Arturia KeyStep 32".to_string(), "Virtual Port".to_string()];
        assert!(validate_device("KeyStep", &devices).is_ok());
        assert!(validate_device("Launchpad", &devices).is_err());
    }
}
