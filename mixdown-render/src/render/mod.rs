//! Render engine seam
//!
//! The orchestrator drives a render through a fixed sequence of stages,
//! delegating the actual signal processing to a [`Renderer`]. The engine
//! behind the trait is an external collaborator; this crate bundles
//! [`offline::OfflineRenderer`] as the baseline implementation.

pub mod offline;

use crate::resolver::MixPlan;
use async_trait::async_trait;
use mixdown_common::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Render quality requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    Fast,
    High,
}

impl RenderQuality {
    /// Rough render-time multiplier relative to session duration, used
    /// only for the caller-facing completion estimate
    pub fn time_factor(&self) -> f64 {
        match self {
            RenderQuality::Fast => 0.1,
            RenderQuality::High => 0.5,
        }
    }
}

/// Output container format of the rendered artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// The fixed, ordered render pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    AssetLoading,
    RegionProcessing,
    InsertApplication,
    SendMixing,
    MasterProcessing,
    Encoding,
}

impl RenderStage {
    /// Stages in execution order
    pub const ALL: [RenderStage; 6] = [
        RenderStage::AssetLoading,
        RenderStage::RegionProcessing,
        RenderStage::InsertApplication,
        RenderStage::SendMixing,
        RenderStage::MasterProcessing,
        RenderStage::Encoding,
    ];

    /// Job progress value reported once this stage completes
    pub fn progress(&self) -> u8 {
        match self {
            RenderStage::AssetLoading => 20,
            RenderStage::RegionProcessing => 40,
            RenderStage::InsertApplication => 60,
            RenderStage::SendMixing => 75,
            RenderStage::MasterProcessing => 90,
            RenderStage::Encoding => 100,
        }
    }
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RenderStage::AssetLoading => "asset loading",
            RenderStage::RegionProcessing => "region processing",
            RenderStage::InsertApplication => "insert application",
            RenderStage::SendMixing => "send mixing",
            RenderStage::MasterProcessing => "master processing",
            RenderStage::Encoding => "encoding",
        };
        write!(f, "{}", name)
    }
}

/// Everything a renderer needs to process one job
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub job_id: Uuid,
    pub plan: MixPlan,
    pub quality: RenderQuality,
    pub format: AudioFormat,
    /// Optional trim window start (seconds on the session timeline)
    pub start_time: Option<f64>,
    /// Optional trim window end (seconds on the session timeline)
    pub end_time: Option<f64>,
}

impl RenderContext {
    /// Duration actually rendered: the plan duration clipped to the trim window
    pub fn effective_duration(&self) -> f64 {
        trimmed_duration(self.plan.total_duration, self.start_time, self.end_time)
    }
}

/// Clip a total duration to an optional trim window
pub fn trimmed_duration(total: f64, start_time: Option<f64>, end_time: Option<f64>) -> f64 {
    let start = start_time.unwrap_or(0.0).clamp(0.0, total);
    let end = end_time.unwrap_or(total).min(total);
    (end - start).max(0.0)
}

/// Where a rendered artifact ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    /// Local file written by the engine
    Path(PathBuf),
    /// External URL recorded by an object-storage collaborator
    Url(String),
}

/// Output of a successful render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub location: ArtifactLocation,
    /// Measured peak level after limiting (dB)
    pub peak_db: f64,
}

/// Result payload stored on a completed mix-preview job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    /// Rendered duration in seconds
    pub duration: f64,
    pub peak_db: f64,
    pub format: AudioFormat,
}

impl ResultDescriptor {
    pub fn new(artifact: RenderedArtifact, duration: f64, format: AudioFormat) -> Self {
        let (artifact_path, artifact_url) = match artifact.location {
            ArtifactLocation::Path(p) => (Some(p.to_string_lossy().into_owned()), None),
            ArtifactLocation::Url(u) => (None, Some(u)),
        };
        Self {
            artifact_path,
            artifact_url,
            duration,
            peak_db: artifact.peak_db,
            format,
        }
    }
}

/// External render engine invoked stage by stage
///
/// Implementations perform the actual signal processing and encoding. Only
/// the final [`RenderStage::Encoding`] stage returns an artifact; every
/// other stage returns `Ok(None)` on success.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn run_stage(
        &self,
        stage: RenderStage,
        ctx: &RenderContext,
    ) -> Result<Option<RenderedArtifact>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MasterMix;
    use std::collections::BTreeMap;

    fn context(total_duration: f64, start: Option<f64>, end: Option<f64>) -> RenderContext {
        RenderContext {
            job_id: Uuid::new_v4(),
            plan: MixPlan {
                session_id: "s-1".to_string(),
                tempo: 120.0,
                active_tracks: vec![],
                total_duration,
                master: MasterMix::default(),
                buses: BTreeMap::new(),
            },
            quality: RenderQuality::Fast,
            format: AudioFormat::Wav,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_stage_progress_is_monotone() {
        let mut last = 0;
        for stage in RenderStage::ALL {
            assert!(stage.progress() > last);
            last = stage.progress();
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_effective_duration_without_trim() {
        assert_eq!(context(10.0, None, None).effective_duration(), 10.0);
    }

    #[test]
    fn test_effective_duration_with_trim_window() {
        assert_eq!(context(10.0, Some(2.0), Some(6.0)).effective_duration(), 4.0);
        // End clipped to the plan duration
        assert_eq!(context(10.0, Some(8.0), Some(30.0)).effective_duration(), 2.0);
        // Window entirely past the content renders nothing
        assert_eq!(context(10.0, Some(15.0), None).effective_duration(), 0.0);
    }

    #[test]
    fn test_quality_factors() {
        assert_eq!(RenderQuality::Fast.time_factor(), 0.1);
        assert_eq!(RenderQuality::High.time_factor(), 0.5);
    }

    #[test]
    fn test_result_descriptor_wire_format() {
        let descriptor = ResultDescriptor::new(
            RenderedArtifact {
                location: ArtifactLocation::Path(PathBuf::from("/tmp/p.wav")),
                peak_db: -0.4,
            },
            10.0,
            AudioFormat::Wav,
        );

        let json = serde_json::to_string(&descriptor).expect("descriptor should serialize");
        assert!(json.contains("\"artifactPath\":\"/tmp/p.wav\""));
        assert!(json.contains("\"peakDb\":-0.4"));
        assert!(json.contains("\"format\":\"wav\""));
        assert!(!json.contains("artifactUrl"));
    }
}
