//! Session data model
//!
//! Declarative description of a mixing session submitted for rendering:
//! tracks, placed regions, effect inserts, aux sends and the master bus.
//! These types exist only for the duration of validation and mix-graph
//! resolution of a single render request; they are never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds for clip gain on a region (dB)
pub const MIN_CLIP_GAIN_DB: f64 = -60.0;
pub const MAX_CLIP_GAIN_DB: f64 = 12.0;

/// Supported session tempo range (BPM)
pub const MIN_TEMPO_BPM: f64 = 20.0;
pub const MAX_TEMPO_BPM: f64 = 300.0;

/// Pan range (hard left to hard right)
pub const MIN_PAN: f64 = -100.0;
pub const MAX_PAN: f64 = 100.0;

/// A placed audio or MIDI clip on a track
///
/// Immutable once scheduled; owned exclusively by its track. Timing is in
/// seconds with `end > start` required by request validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Reference to the source audio/MIDI asset
    pub source: String,
    /// Placement start on the session timeline (seconds)
    pub start: f64,
    /// Placement end on the session timeline (seconds)
    pub end: f64,
    /// Offset into the source material (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Length of source material to use (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Time-stretch factor (1.0 = unchanged)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stretch: Option<f64>,
    /// Clip gain in dB, bounded to −60…+12
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_db: Option<f64>,
}

/// Effect insert kinds supported on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertKind {
    Equalizer,
    Compressor,
}

impl std::fmt::Display for InsertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertKind::Equalizer => write!(f, "equalizer"),
            InsertKind::Compressor => write!(f, "compressor"),
        }
    }
}

/// An in-line effect processor on a track
///
/// Order within the track's insert list is significant: signal passes
/// through inserts in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insert {
    pub kind: InsertKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Named parameter values; ordered map keeps resolution deterministic
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

fn default_true() -> bool {
    true
}

/// A track's contribution to an auxiliary bus
///
/// `level_db = None` means "unset": the mix graph resolver substitutes the
/// preset level for the track's instrument kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuxSend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_db: Option<f64>,
    #[serde(default)]
    pub pre_fader: bool,
}

/// Track content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Midi,
    Drums,
}

/// Instrument kind, used only to select mix defaults
///
/// Unknown values deserialize to `Other`, the fallback preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Vocal,
    Drums,
    Bass,
    Synth,
    Guitar,
    Keys,
    Fx,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InstrumentKind::Vocal => "vocal",
            InstrumentKind::Drums => "drums",
            InstrumentKind::Bass => "bass",
            InstrumentKind::Synth => "synth",
            InstrumentKind::Guitar => "guitar",
            InstrumentKind::Keys => "keys",
            InstrumentKind::Fx => "fx",
            InstrumentKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A single mixer track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    /// Selects send/insert defaults; absent falls back to `Other`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<InstrumentKind>,
    #[serde(default)]
    pub regions: Vec<Region>,
    /// Track fader in dB (0 = unity)
    #[serde(default)]
    pub volume_db: f64,
    /// Pan position, −100 (left) to +100 (right)
    #[serde(default)]
    pub pan: f64,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub inserts: Vec<Insert>,
    #[serde(default)]
    pub send_a: AuxSend,
    #[serde(default)]
    pub send_b: AuxSend,
}

/// Limiter parameters on the master bus (input form; unset fields take
/// the fixed defaults during resolution)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LimiterParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_db: Option<f64>,
}

/// Master bus settings (input form)
///
/// Exactly one per session; a missing master bus resolves to all defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MasterBus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_db: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limiter: Option<LimiterParams>,
}

/// Auxiliary bus processor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxBusKind {
    Reverb,
    Delay,
}

/// A named auxiliary bus definition (shared reverb/delay)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxBus {
    pub kind: AuxBusKind,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// Loop or punch marker pair (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Markers {
    pub start: f64,
    pub end: f64,
}

/// The full declarative description of a mix to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tempo in BPM, bounded 20–300
    pub tempo: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_region: Option<Markers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punch: Option<Markers>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<MasterBus>,
    #[serde(default)]
    pub buses: BTreeMap<String, AuxBus>,
}
