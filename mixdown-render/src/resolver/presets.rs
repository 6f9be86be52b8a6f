//! Mix defaults per instrument kind
//!
//! Send levels and insert parameter presets substituted by the resolver
//! wherever a track leaves them unset. `Other` is the fallback for tracks
//! with an unknown or absent instrument kind.

use mixdown_common::model::{InsertKind, InstrumentKind};

/// Default mix settings for one instrument kind
#[derive(Debug, Clone, Copy)]
pub struct KindPreset {
    /// Send A (reverb bus) level in dB
    pub send_a_db: f64,
    /// Send B (delay bus) level in dB
    pub send_b_db: f64,
    /// Equalizer parameter defaults
    pub equalizer: &'static [(&'static str, f64)],
    /// Compressor parameter defaults
    pub compressor: &'static [(&'static str, f64)],
}

impl KindPreset {
    /// Preset parameters for one insert kind
    pub fn insert_params(&self, kind: InsertKind) -> &'static [(&'static str, f64)] {
        match kind {
            InsertKind::Equalizer => self.equalizer,
            InsertKind::Compressor => self.compressor,
        }
    }
}

const VOCAL: KindPreset = KindPreset {
    send_a_db: -14.0,
    send_b_db: -20.0,
    equalizer: &[("lowCutHz", 90.0), ("midGainDb", 1.5), ("highGainDb", 2.0)],
    compressor: &[("thresholdDb", -18.0), ("ratio", 3.0), ("attackMs", 10.0), ("releaseMs", 120.0)],
};

const DRUMS: KindPreset = KindPreset {
    send_a_db: -18.0,
    send_b_db: -30.0,
    equalizer: &[("lowCutHz", 35.0), ("midGainDb", -1.0), ("highGainDb", 1.0)],
    compressor: &[("thresholdDb", -12.0), ("ratio", 4.0), ("attackMs", 5.0), ("releaseMs", 80.0)],
};

const BASS: KindPreset = KindPreset {
    send_a_db: -36.0,
    send_b_db: -36.0,
    equalizer: &[("lowCutHz", 28.0), ("midGainDb", 0.5), ("highGainDb", -1.0)],
    compressor: &[("thresholdDb", -15.0), ("ratio", 4.0), ("attackMs", 15.0), ("releaseMs", 150.0)],
};

const SYNTH: KindPreset = KindPreset {
    send_a_db: -16.0,
    send_b_db: -18.0,
    equalizer: &[("lowCutHz", 60.0), ("midGainDb", 0.0), ("highGainDb", 0.5)],
    compressor: &[("thresholdDb", -20.0), ("ratio", 2.5), ("attackMs", 20.0), ("releaseMs", 200.0)],
};

const GUITAR: KindPreset = KindPreset {
    send_a_db: -15.0,
    send_b_db: -22.0,
    equalizer: &[("lowCutHz", 80.0), ("midGainDb", 1.0), ("highGainDb", 0.5)],
    compressor: &[("thresholdDb", -16.0), ("ratio", 3.0), ("attackMs", 12.0), ("releaseMs", 140.0)],
};

const KEYS: KindPreset = KindPreset {
    send_a_db: -16.0,
    send_b_db: -24.0,
    equalizer: &[("lowCutHz", 50.0), ("midGainDb", 0.0), ("highGainDb", 1.0)],
    compressor: &[("thresholdDb", -20.0), ("ratio", 2.0), ("attackMs", 25.0), ("releaseMs", 180.0)],
};

const FX: KindPreset = KindPreset {
    send_a_db: -10.0,
    send_b_db: -12.0,
    equalizer: &[("lowCutHz", 100.0), ("midGainDb", 0.0), ("highGainDb", 0.0)],
    compressor: &[("thresholdDb", -24.0), ("ratio", 2.0), ("attackMs", 30.0), ("releaseMs", 250.0)],
};

const OTHER: KindPreset = KindPreset {
    send_a_db: -18.0,
    send_b_db: -24.0,
    equalizer: &[("lowCutHz", 40.0), ("midGainDb", 0.0), ("highGainDb", 0.0)],
    compressor: &[("thresholdDb", -20.0), ("ratio", 2.5), ("attackMs", 15.0), ("releaseMs", 150.0)],
};

/// Preset for an instrument kind; absent kinds take the `Other` fallback
pub fn for_kind(kind: Option<InstrumentKind>) -> &'static KindPreset {
    match kind {
        Some(InstrumentKind::Vocal) => &VOCAL,
        Some(InstrumentKind::Drums) => &DRUMS,
        Some(InstrumentKind::Bass) => &BASS,
        Some(InstrumentKind::Synth) => &SYNTH,
        Some(InstrumentKind::Guitar) => &GUITAR,
        Some(InstrumentKind::Keys) => &KEYS,
        Some(InstrumentKind::Fx) => &FX,
        Some(InstrumentKind::Other) | None => &OTHER,
    }
}
