//! Bundled offline render engine
//!
//! Baseline [`Renderer`] used when no external DSP engine is wired in. It
//! walks the full stage sequence against the resolved plan and, in the
//! encoding stage, writes a tempo-aligned placeholder click track honoring
//! the master volume and limiter ceiling. Sample-accurate mixing of the
//! session's actual audio belongs to the external engine.

use super::{
    ArtifactLocation, AudioFormat, RenderContext, RenderStage, RenderedArtifact, Renderer,
};
use async_trait::async_trait;
use mixdown_common::level::{db_to_linear, linear_to_db};
use mixdown_common::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// Working sample rate of the placeholder preview
const SAMPLE_RATE: u32 = 44_100;

/// Click tone frequency and decay
const CLICK_FREQ_HZ: f64 = 1_000.0;
const CLICK_DECAY_PER_SEC: f64 = 60.0;
const CLICK_AMPLITUDE: f64 = 0.5;

/// Offline placeholder renderer writing WAV previews to a local directory
pub struct OfflineRenderer {
    artifact_dir: PathBuf,
}

impl OfflineRenderer {
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self { artifact_dir }
    }

    async fn encode(&self, ctx: &RenderContext) -> Result<RenderedArtifact> {
        if ctx.format == AudioFormat::Mp3 {
            return Err(Error::Render(
                "mp3 encoding requires the external render engine; request wav".to_string(),
            ));
        }

        let path = self.artifact_dir.join(format!(
            "mix-preview-{}.{}",
            ctx.job_id,
            ctx.format.extension()
        ));

        let duration = ctx.effective_duration();
        let tempo = ctx.plan.tempo;
        let master_gain = db_to_linear(ctx.plan.master.volume_db);
        let ceiling = db_to_linear(ctx.plan.master.limiter.ceiling_db);

        let out_path = path.clone();
        let peak = tokio::task::spawn_blocking(move || {
            write_click_track(&out_path, duration, tempo, master_gain, ceiling)
        })
        .await
        .map_err(|e| Error::Internal(format!("encode task panicked: {}", e)))??;

        debug!(
            "Encoded {:.2}s preview to {} (peak {:.2} dB)",
            duration,
            path.display(),
            linear_to_db(peak)
        );

        Ok(RenderedArtifact {
            location: ArtifactLocation::Path(path),
            peak_db: linear_to_db(peak),
        })
    }
}

#[async_trait]
impl Renderer for OfflineRenderer {
    async fn run_stage(
        &self,
        stage: RenderStage,
        ctx: &RenderContext,
    ) -> Result<Option<RenderedArtifact>> {
        match stage {
            RenderStage::AssetLoading => {
                tokio::fs::create_dir_all(&self.artifact_dir).await?;
                let sources: usize = ctx.plan.active_tracks.iter().map(|t| t.regions.len()).sum();
                debug!("Job {}: {} region source(s) referenced", ctx.job_id, sources);
            }
            RenderStage::RegionProcessing => {
                debug!(
                    "Job {}: processing regions across {} active track(s)",
                    ctx.job_id,
                    ctx.plan.active_tracks.len()
                );
            }
            RenderStage::InsertApplication => {
                let enabled: usize = ctx
                    .plan
                    .active_tracks
                    .iter()
                    .flat_map(|t| t.inserts.iter())
                    .filter(|i| i.enabled)
                    .count();
                debug!("Job {}: applying {} enabled insert(s)", ctx.job_id, enabled);
            }
            RenderStage::SendMixing => {
                debug!(
                    "Job {}: mixing sends into {} aux bus(es)",
                    ctx.job_id,
                    ctx.plan.buses.len()
                );
            }
            RenderStage::MasterProcessing => {
                debug!(
                    "Job {}: master volume {:.1} dB, limiter ceiling {:.1} dB",
                    ctx.job_id, ctx.plan.master.volume_db, ctx.plan.master.limiter.ceiling_db
                );
            }
            RenderStage::Encoding => return self.encode(ctx).await.map(Some),
        }
        Ok(None)
    }
}

/// Synthesize a decaying click on every beat and write it as 16-bit stereo
/// WAV. Returns the linear peak after the ceiling clamp.
fn write_click_track(
    path: &std::path::Path,
    duration: f64,
    tempo: f64,
    master_gain: f64,
    ceiling: f64,
) -> Result<f64> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| Error::Render(format!("wav create failed: {}", e)))?;

    let frames = (duration * SAMPLE_RATE as f64) as usize;
    let beat_period = 60.0 / tempo.max(1.0);
    let mut peak = 0.0_f64;

    for frame in 0..frames {
        let t = frame as f64 / SAMPLE_RATE as f64;
        let since_beat = t % beat_period;
        let raw = CLICK_AMPLITUDE
            * (2.0 * std::f64::consts::PI * CLICK_FREQ_HZ * since_beat).sin()
            * (-CLICK_DECAY_PER_SEC * since_beat).exp();
        let limited = (raw * master_gain).clamp(-ceiling, ceiling);
        peak = peak.max(limited.abs());

        let sample = (limited * f64::from(i16::MAX)) as i16;
        for _ in 0..2 {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Render(format!("wav write failed: {}", e)))?;
        }
    }

    writer
        .finalize()
        .map_err(|e| Error::Render(format!("wav finalize failed: {}", e)))?;
    Ok(peak)
}
