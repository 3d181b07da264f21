// Audio player implementation
// Transport control over an in-memory clip fed to the shared output device

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::Serialize;

use crate::audio::output::OutputHandle;
use crate::audio::transport::{PlaybackStatus, Transport};
use crate::audio::AudioClip;
use crate::error::{AppError, AppResult};

const RESAMPLE_CHUNK: usize = 1024;
const FEED_BLOCK_FRAMES: usize = 2048;

/// Snapshot of the playback session for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub has_clip: bool,
}

pub struct Player {
    output: OnceCell<OutputHandle>,
    inner: Arc<Mutex<PlayerInner>>,
    /// Generation counter shared with feeder threads. Bumping it supersedes
    /// whatever is currently feeding the device; a feeder that already
    /// finished simply never observes the bump.
    live_generation: Arc<AtomicU64>,
}

#[derive(Default)]
struct PlayerInner {
    clip: Option<Arc<AudioClip>>,
    prepared: Option<Prepared>,
    transport: Transport,
}

/// Clip samples converted to the device rate, cached per clip.
struct Prepared {
    source: Arc<AudioClip>,
    samples: Arc<Vec<f32>>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            output: OnceCell::new(),
            inner: Arc::new(Mutex::new(PlayerInner::default())),
            live_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The shared output device, created on first use.
    fn output(&self) -> AppResult<&OutputHandle> {
        self.output.get_or_try_init(OutputHandle::spawn)
    }

    /// Start playing a clip from the stored pause offset (zero on a fresh
    /// session). Any active playback is superseded first.
    pub fn play(&self, clip: Arc<AudioClip>) -> AppResult<()> {
        let output = self.output()?.clone();

        let generation = self.live_generation.fetch_add(1, Ordering::SeqCst) + 1;
        output.clear();

        let mut inner = self.inner.lock();
        let samples = prepare(&mut inner, &clip, &output)?;
        let offset = inner.transport.paused_offset();
        let start_frame = (offset.as_secs_f64() * output.sample_rate() as f64).round() as usize;
        inner.transport.begin(Instant::now());
        inner.clip = Some(clip);
        drop(inner);

        let live = self.live_generation.clone();
        let inner_handle = self.inner.clone();
        std::thread::Builder::new()
            .name("audio-feeder".to_string())
            .spawn(move || run_feeder(samples, start_frame, generation, live, output, inner_handle))
            .map_err(|e| AppError::Playback(format!("failed to spawn feeder thread: {}", e)))?;

        Ok(())
    }

    /// Freeze playback and remember how far it got. No-op unless playing.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.transport.status() != PlaybackStatus::Playing {
            return;
        }

        self.live_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = self.output.get() {
            output.clear();
        }

        let offset = inner.transport.pause(Instant::now());
        log::debug!("playback paused at {:.2}s", offset.as_secs_f64());
    }

    /// Restart the stored clip from the pause offset. No-op without a clip.
    pub fn resume(&self) -> AppResult<()> {
        let clip = self.inner.lock().clip.clone();
        match clip {
            Some(clip) => self.play(clip),
            None => Ok(()),
        }
    }

    /// Best-effort stop: supersede any feeder, rewind the offset. Safe to
    /// call at any time, including twice in a row.
    pub fn stop(&self) {
        self.live_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = self.output.get() {
            output.clear();
        }
        self.inner.lock().transport.halt();
    }

    pub fn state(&self) -> PlaybackState {
        let inner = self.inner.lock();
        let duration_secs = inner.clip.as_ref().map(|clip| clip.duration_secs());
        let mut position_secs = inner.transport.position(Instant::now()).as_secs_f64();
        if let Some(duration) = duration_secs {
            position_secs = position_secs.min(duration);
        }

        PlaybackState {
            status: inner.transport.status(),
            position_secs,
            duration_secs,
            has_clip: inner.clip.is_some(),
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a clip to device-rate mono samples, reusing the cached
/// conversion when the same clip is played again.
fn prepare(
    inner: &mut PlayerInner,
    clip: &Arc<AudioClip>,
    output: &OutputHandle,
) -> AppResult<Arc<Vec<f32>>> {
    if let Some(prepared) = &inner.prepared {
        if Arc::ptr_eq(&prepared.source, clip) {
            return Ok(prepared.samples.clone());
        }
    }

    let mono = mixdown(clip);
    let samples = if clip.sample_rate != output.sample_rate() {
        resample_mono(&mono, clip.sample_rate, output.sample_rate())?
    } else {
        mono
    };

    let samples = Arc::new(samples);
    inner.prepared = Some(Prepared {
        source: clip.clone(),
        samples: samples.clone(),
    });
    Ok(samples)
}

/// Collapse interleaved samples to mono by averaging each frame.
fn mixdown(clip: &AudioClip) -> Vec<f32> {
    if clip.channels <= 1 {
        return clip.samples.clone();
    }

    let channels = clip.channels as usize;
    clip.samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Convert mono samples between sample rates.
fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> AppResult<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| AppError::Playback(format!("failed to build resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut out: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while samples.len() - pos >= RESAMPLE_CHUNK {
        let chunk = resampler
            .process(&[&samples[pos..pos + RESAMPLE_CHUNK]], None)
            .map_err(|e| AppError::Playback(format!("resampling failed: {}", e)))?;
        out.extend_from_slice(&chunk[0]);
        pos += RESAMPLE_CHUNK;
    }

    if pos < samples.len() {
        let tail = resampler
            .process_partial(Some(&[&samples[pos..]]), None)
            .map_err(|e| AppError::Playback(format!("resampling failed: {}", e)))?;
        out.extend_from_slice(&tail[0]);
    }

    // Flush the resampler's delay line so the end of the clip is not cut off.
    while out.len() < expected + delay {
        let flushed = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| AppError::Playback(format!("resampling failed: {}", e)))?;
        if flushed[0].is_empty() {
            break;
        }
        out.extend_from_slice(&flushed[0]);
    }

    if out.len() < expected + delay {
        out.resize(expected + delay, 0.0);
    }
    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}

/// Feeder thread body: pushes device-rate samples into the ring buffer,
/// aborting as soon as its generation is superseded, and finishing the
/// transport when the clip plays to its natural end.
fn run_feeder(
    samples: Arc<Vec<f32>>,
    start_frame: usize,
    generation: u64,
    live: Arc<AtomicU64>,
    output: OutputHandle,
    inner: Arc<Mutex<PlayerInner>>,
) {
    let channels = output.channels().max(1) as usize;
    let superseded = || live.load(Ordering::SeqCst) != generation;

    // Wait until the device callback has processed any pending clear, so it
    // does not throw away the first samples of this session.
    while output.clearing() {
        if superseded() {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    let mut frame = start_frame.min(samples.len());
    let mut block: Vec<f32> = Vec::with_capacity(FEED_BLOCK_FRAMES * channels);

    while frame < samples.len() {
        if superseded() {
            return;
        }

        let end = (frame + FEED_BLOCK_FRAMES).min(samples.len());
        block.clear();
        for &sample in &samples[frame..end] {
            // Mono source duplicated across the device's channels
            for _ in 0..channels {
                block.push(sample);
            }
        }

        let mut pending: &[f32] = &block;
        while !pending.is_empty() {
            if superseded() {
                return;
            }
            let written = output.write(pending);
            if written == 0 {
                // Ring buffer full, wait for the device to catch up
                std::thread::sleep(Duration::from_millis(1));
            } else {
                pending = &pending[written..];
            }
        }

        frame = end;
    }

    // Everything is queued; wait for the device to drain it before
    // declaring the natural end of the session.
    while output.queued() > 0 {
        if superseded() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    std::thread::sleep(Duration::from_millis(50));

    let mut inner = inner.lock();
    if !superseded() {
        inner.transport.halt();
        log::debug!("playback finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixdown_averages_stereo_frames() {
        let clip = AudioClip {
            samples: vec![0.5, -0.5, 1.0, 0.0, -1.0, -1.0],
            sample_rate: 24000,
            channels: 2,
        };
        assert_eq!(mixdown(&clip), vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_mixdown_passes_mono_through() {
        let clip = AudioClip {
            samples: vec![0.1, 0.2, 0.3],
            sample_rate: 24000,
            channels: 1,
        };
        assert_eq!(mixdown(&clip), clip.samples);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.25; 1000];
        assert_eq!(resample_mono(&samples, 24000, 24000).unwrap(), samples);
    }

    #[test]
    fn test_resample_preserves_duration() {
        // 0.2s of a low-frequency ramp at 24 kHz -> 0.2s at 48 kHz
        let samples: Vec<f32> = (0..4800).map(|n| (n as f32 / 4800.0) - 0.5).collect();
        let out = resample_mono(&samples, 24000, 48000).unwrap();
        assert_eq!(out.len(), 9600);
    }

    #[test]
    fn test_resample_downrate() {
        let samples = vec![0.0f32; 4410];
        let out = resample_mono(&samples, 44100, 24000).unwrap();
        assert_eq!(out.len(), 2400);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_mono(&[], 24000, 48000).unwrap().is_empty());
    }
}
