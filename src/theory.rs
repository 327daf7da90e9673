//! Scale membership, quantization and chord voicings.

use std::fmt;

pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const MAJOR_INTERVALS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_INTERVALS: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Dominant seventh intervals, used as the fallback voicing for trigger
/// notes whose pitch class falls outside the active scale
pub const DOMINANT_SEVENTH: [u8; 4] = [0, 4, 7, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    Major,
    Minor,
}

/// A named scale: a root pitch class plus major or minor intervals,
/// defining which `note % 12` residues are in key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    root: u8,
    kind: ScaleKind,
}

impl Scale {
    pub fn new(root: u8, kind: ScaleKind) -> Self {
        Scale {
            root: root % 12,
            kind,
        }
    }

    /// All 24 major and minor keys
    pub fn all() -> Vec<Scale> {
        let mut scales = Vec::with_capacity(24);
        for root in 0..12 {
            scales.push(Scale::new(root, ScaleKind::Major));
            scales.push(Scale::new(root, ScaleKind::Minor));
        }
        scales
    }

    /// Parses names like `C_major`, `f#_minor` or `A#_major`
    pub fn parse(name: &str) -> Result<Scale, String> {
        let (root_name, kind_name) = name
            .split_once('_')
            .ok_or_else(|| format!("invalid key '{}', expected e.g. C_major", name))?;
        let root = PITCH_CLASS_NAMES
            .iter()
            .position(|pc| pc.eq_ignore_ascii_case(root_name))
            .ok_or_else(|| format!("unknown pitch class '{}'", root_name))? as u8;
        let kind = match kind_name.to_ascii_lowercase().as_str() {
            "major" => ScaleKind::Major,
            "minor" => ScaleKind::Minor,
            other => return Err(format!("unknown scale kind '{}'", other)),
        };
        Ok(Scale::new(root, kind))
    }

    fn intervals(&self) -> &'static [u8] {
        match self.kind {
            ScaleKind::Major => &MAJOR_INTERVALS,
            ScaleKind::Minor => &MINOR_INTERVALS,
        }
    }

    /// Whether the note's pitch class is in key
    pub fn contains(&self, note: u8) -> bool {
        let degree = ((note % 12) + 12 - self.root) % 12;
        self.intervals().contains(&degree)
    }

    /// Conforms a note to the nearest in-key note at or below it.
    ///
    /// Every scale hits each pitch-class window within 11 semitones, so the
    /// downward search always terminates. Notes near zero that cannot reach
    /// an in-key pitch below them search upward instead.
    pub fn quantize(&self, note: u8) -> u8 {
        let mut candidate = note as i16;
        while candidate >= 0 && !self.contains(candidate as u8) {
            candidate -= 1;
        }
        if candidate < 0 {
            candidate = note as i16;
            while !self.contains(candidate as u8) {
                candidate += 1;
            }
        }
        candidate as u8
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ScaleKind::Major => "Major",
            ScaleKind::Minor => "Minor",
        };
        write!(f, "{} {}", PITCH_CLASS_NAMES[self.root as usize], kind)
    }
}

/// A chord voicing: the interval sequence applied relative to a root note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voicing {
    /// R, M3, P5, M7
    Root,
    /// M3, P5, M7, R+8va
    First,
    /// P5, M7, R+8va, M3+8va
    Second,
    /// M7, R+8va, M3+8va, P5+8va
    Third,
    /// R, P5, M3+8va, M7+8va
    Open,
}

impl Voicing {
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Voicing::Root => &[0, 4, 7, 11],
            Voicing::First => &[4, 7, 11, 12],
            Voicing::Second => &[7, 11, 12, 16],
            Voicing::Third => &[11, 12, 16, 19],
            Voicing::Open => &[0, 7, 16, 23],
        }
    }

    pub fn parse(name: &str) -> Result<Voicing, String> {
        match name.to_ascii_lowercase().as_str() {
            "root" => Ok(Voicing::Root),
            "first" => Ok(Voicing::First),
            "second" => Ok(Voicing::Second),
            "third" => Ok(Voicing::Third),
            "open" => Ok(Voicing::Open),
            other => Err(format!("unknown voicing '{}'", other)),
        }
    }
}

/// Maps `root + interval` for each interval in the voicing. Notes that
/// would exceed 127 are dropped. No re-quantization happens here; callers
/// that want diatonic tones conform them afterwards.
pub fn expand_chord(root: u8, intervals: &[u8]) -> Vec<u8> {
    intervals
        .iter()
        .map(|&interval| root as u16 + interval as u16)
        .filter(|&note| note < 128)
        .map(|note| note as u8)
        .collect()
}
