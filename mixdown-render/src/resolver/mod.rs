//! Mix graph resolver
//!
//! Turns a raw `Session` into a validated, defaulted, render-ready
//! `MixPlan`: applies per-instrument-kind presets, resolves solo/mute into
//! the active track set, computes total duration and merges the master bus
//! over its fixed defaults.
//!
//! Resolution is a pure function of the session. It never fails and never
//! mutates its input; invalid sessions are rejected earlier by request
//! validation in the orchestrator.

pub mod presets;

use mixdown_common::model::{
    AuxBus, InsertKind, InstrumentKind, Region, Session, Track, TrackKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed master bus defaults
pub const DEFAULT_MASTER_VOLUME_DB: f64 = 0.0;
pub const DEFAULT_LIMITER_THRESHOLD_DB: f64 = -1.0;
pub const DEFAULT_LIMITER_RELEASE_MS: f64 = 100.0;
pub const DEFAULT_LIMITER_CEILING_DB: f64 = -0.3;

/// A send with its level resolved to a concrete value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSend {
    pub level_db: f64,
    pub pre_fader: bool,
}

/// An insert with preset parameters merged underneath explicit ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInsert {
    pub kind: InsertKind,
    pub enabled: bool,
    pub params: BTreeMap<String, f64>,
}

/// A track that survived solo/mute resolution, with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrack {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<InstrumentKind>,
    pub regions: Vec<Region>,
    pub volume_db: f64,
    pub pan: f64,
    pub inserts: Vec<ResolvedInsert>,
    pub send_a: ResolvedSend,
    pub send_b: ResolvedSend,
}

/// Resolved limiter settings on the master bus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterSettings {
    pub threshold_db: f64,
    pub release_ms: f64,
    pub ceiling_db: f64,
}

/// Resolved master summing stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterMix {
    pub volume_db: f64,
    pub limiter: LimiterSettings,
}

impl Default for MasterMix {
    fn default() -> Self {
        Self {
            volume_db: DEFAULT_MASTER_VOLUME_DB,
            limiter: LimiterSettings {
                threshold_db: DEFAULT_LIMITER_THRESHOLD_DB,
                release_ms: DEFAULT_LIMITER_RELEASE_MS,
                ceiling_db: DEFAULT_LIMITER_CEILING_DB,
            },
        }
    }
}

/// The resolved, defaulted, render-ready view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixPlan {
    pub session_id: String,
    pub tempo: f64,
    pub active_tracks: Vec<ActiveTrack>,
    /// Maximum region end across active tracks (seconds); 0 with no active tracks
    pub total_duration: f64,
    pub master: MasterMix,
    pub buses: BTreeMap<String, AuxBus>,
}

/// Resolve a session into a mix plan
pub fn resolve(session: &Session) -> MixPlan {
    let active: Vec<&Track> = active_tracks(&session.tracks);

    let total_duration = active
        .iter()
        .flat_map(|t| t.regions.iter())
        .map(|r| r.end)
        .fold(0.0_f64, f64::max);

    MixPlan {
        session_id: session.id.clone(),
        tempo: session.tempo,
        active_tracks: active.into_iter().map(resolve_track).collect(),
        total_duration,
        master: resolve_master(session),
        buses: session.buses.clone(),
    }
}

/// Solo/mute resolution: any soloed track makes the active set exactly the
/// soloed tracks (mute ignored for them); otherwise all non-muted tracks.
fn active_tracks(tracks: &[Track]) -> Vec<&Track> {
    let any_solo = tracks.iter().any(|t| t.solo);
    tracks
        .iter()
        .filter(|t| if any_solo { t.solo } else { !t.muted })
        .collect()
}

fn resolve_track(track: &Track) -> ActiveTrack {
    let preset = presets::for_kind(track.instrument);

    ActiveTrack {
        id: track.id.clone(),
        name: track.name.clone(),
        kind: track.kind,
        instrument: track.instrument,
        regions: track.regions.clone(),
        volume_db: track.volume_db,
        pan: track.pan,
        inserts: track
            .inserts
            .iter()
            .map(|insert| {
                // Preset params first, explicit values merged on top
                let mut params: BTreeMap<String, f64> = preset
                    .insert_params(insert.kind)
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect();
                params.extend(insert.params.iter().map(|(k, v)| (k.clone(), *v)));
                ResolvedInsert {
                    kind: insert.kind,
                    enabled: insert.enabled,
                    params,
                }
            })
            .collect(),
        send_a: ResolvedSend {
            level_db: track.send_a.level_db.unwrap_or(preset.send_a_db),
            pre_fader: track.send_a.pre_fader,
        },
        send_b: ResolvedSend {
            level_db: track.send_b.level_db.unwrap_or(preset.send_b_db),
            pre_fader: track.send_b.pre_fader,
        },
    }
}

/// Shallow-merge the session master bus over the fixed defaults, nested
/// limiter fields merged individually.
fn resolve_master(session: &Session) -> MasterMix {
    let defaults = MasterMix::default();
    let Some(master) = &session.master else {
        return defaults;
    };

    let limiter = master.limiter.clone().unwrap_or_default();
    MasterMix {
        volume_db: master.volume_db.unwrap_or(defaults.volume_db),
        limiter: LimiterSettings {
            threshold_db: limiter.threshold_db.unwrap_or(defaults.limiter.threshold_db),
            release_ms: limiter.release_ms.unwrap_or(defaults.limiter.release_ms),
            ceiling_db: limiter.ceiling_db.unwrap_or(defaults.limiter.ceiling_db),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdown_common::model::{AuxSend, Insert, LimiterParams, MasterBus};

    fn region(start: f64, end: f64) -> Region {
        Region {
            source: "take.wav".to_string(),
            start,
            end,
            offset: None,
            duration: None,
            stretch: None,
            gain_db: None,
        }
    }

    fn track(id: &str, regions: Vec<Region>) -> Track {
        Track {
            id: id.to_string(),
            name: None,
            kind: TrackKind::Audio,
            instrument: None,
            regions,
            volume_db: 0.0,
            pan: 0.0,
            muted: false,
            solo: false,
            inserts: vec![],
            send_a: AuxSend::default(),
            send_b: AuxSend::default(),
        }
    }

    fn session(tracks: Vec<Track>) -> Session {
        Session {
            id: "s-1".to_string(),
            name: None,
            tempo: 120.0,
            key: None,
            time_signature: None,
            loop_region: None,
            punch: None,
            tracks,
            master: None,
            buses: BTreeMap::new(),
        }
    }

    #[test]
    fn test_solo_wins_over_mute() {
        let mut a = track("a", vec![region(0.0, 4.0)]);
        a.solo = true;
        a.muted = true; // mute ignored for soloed tracks
        let b = track("b", vec![region(0.0, 8.0)]);

        let plan = resolve(&session(vec![a, b]));
        assert_eq!(plan.active_tracks.len(), 1);
        assert_eq!(plan.active_tracks[0].id, "a");
    }

    #[test]
    fn test_no_solo_excludes_muted() {
        let a = track("a", vec![region(0.0, 4.0)]);
        let mut b = track("b", vec![region(0.0, 8.0)]);
        b.muted = true;

        let plan = resolve(&session(vec![a, b]));
        assert_eq!(plan.active_tracks.len(), 1);
        assert_eq!(plan.active_tracks[0].id, "a");
    }

    #[test]
    fn test_all_tracks_active_when_none_muted() {
        let plan = resolve(&session(vec![
            track("a", vec![region(0.0, 4.0)]),
            track("b", vec![region(2.0, 6.5)]),
        ]));
        assert_eq!(plan.active_tracks.len(), 2);
        assert_eq!(plan.total_duration, 6.5);
    }

    #[test]
    fn test_duration_is_zero_with_no_active_tracks() {
        let mut a = track("a", vec![region(0.0, 4.0)]);
        a.muted = true;

        let plan = resolve(&session(vec![a]));
        assert!(plan.active_tracks.is_empty());
        assert_eq!(plan.total_duration, 0.0);
    }

    #[test]
    fn test_duration_follows_solo_resolution() {
        // The longest track is not soloed, so it does not count
        let mut a = track("a", vec![region(0.0, 4.0)]);
        a.solo = true;
        let b = track("b", vec![region(0.0, 30.0)]);

        let plan = resolve(&session(vec![a, b]));
        assert_eq!(plan.total_duration, 4.0);
    }

    #[test]
    fn test_unset_send_takes_instrument_preset() {
        let mut t = track("v", vec![region(0.0, 4.0)]);
        t.instrument = Some(InstrumentKind::Vocal);

        let plan = resolve(&session(vec![t]));
        let preset = presets::for_kind(Some(InstrumentKind::Vocal));
        assert_eq!(plan.active_tracks[0].send_a.level_db, preset.send_a_db);
        assert_eq!(plan.active_tracks[0].send_b.level_db, preset.send_b_db);
    }

    #[test]
    fn test_explicit_send_level_is_kept() {
        let mut t = track("v", vec![region(0.0, 4.0)]);
        t.instrument = Some(InstrumentKind::Vocal);
        t.send_a = AuxSend { level_db: Some(-3.0), pre_fader: true };

        let plan = resolve(&session(vec![t]));
        assert_eq!(plan.active_tracks[0].send_a.level_db, -3.0);
        assert!(plan.active_tracks[0].send_a.pre_fader);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_other_preset() {
        let t = track("x", vec![region(0.0, 4.0)]); // instrument: None
        let plan = resolve(&session(vec![t]));
        let fallback = presets::for_kind(None);
        assert_eq!(plan.active_tracks[0].send_a.level_db, fallback.send_a_db);
    }

    #[test]
    fn test_insert_preset_merged_under_explicit_params() {
        let mut t = track("v", vec![region(0.0, 4.0)]);
        t.instrument = Some(InstrumentKind::Vocal);
        t.inserts = vec![Insert {
            kind: InsertKind::Compressor,
            enabled: true,
            params: BTreeMap::from([("ratio".to_string(), 8.0)]),
        }];

        let plan = resolve(&session(vec![t]));
        let params = &plan.active_tracks[0].inserts[0].params;
        // Explicit value wins
        assert_eq!(params["ratio"], 8.0);
        // Preset values fill the rest
        assert_eq!(params["thresholdDb"], -18.0);
        assert!(params.contains_key("attackMs"));
    }

    #[test]
    fn test_master_defaults_when_absent() {
        let plan = resolve(&session(vec![track("a", vec![region(0.0, 1.0)])]));
        assert_eq!(plan.master, MasterMix::default());
        assert_eq!(plan.master.limiter.threshold_db, -1.0);
        assert_eq!(plan.master.limiter.release_ms, 100.0);
        assert_eq!(plan.master.limiter.ceiling_db, -0.3);
    }

    #[test]
    fn test_master_limiter_fields_merge_individually() {
        let mut s = session(vec![track("a", vec![region(0.0, 1.0)])]);
        s.master = Some(MasterBus {
            volume_db: Some(-2.0),
            limiter: Some(LimiterParams {
                threshold_db: Some(-4.0),
                release_ms: None,
                ceiling_db: None,
            }),
        });

        let plan = resolve(&s);
        assert_eq!(plan.master.volume_db, -2.0);
        assert_eq!(plan.master.limiter.threshold_db, -4.0);
        // Unset limiter fields keep defaults
        assert_eq!(plan.master.limiter.release_ms, 100.0);
        assert_eq!(plan.master.limiter.ceiling_db, -0.3);
    }

    #[test]
    fn test_resolution_is_idempotent_and_pure() {
        let mut t = track("v", vec![region(0.0, 12.0)]);
        t.instrument = Some(InstrumentKind::Keys);
        let s = session(vec![t]);
        let before = s.clone();

        let first = resolve(&s);
        let second = resolve(&s);
        assert_eq!(first, second);
        assert_eq!(s, before, "resolution must not mutate the session");
    }
}
