//! Command-line recorder.
//!
//! # Run sequence
//!
//! 1. Initialise logging.
//! 2. Load [`RecorderConfig`] (defaults on first run), apply CLI overrides.
//! 3. Open the default microphone through [`CpalDevice`].
//! 4. Tick at ~60 Hz: accumulate blocks, sample the live waveform, draw a
//!    waveform strip on stderr.
//! 5. Stop on Ctrl-C, or trim to the limit when the maximum duration is
//!    reached.
//! 6. Write the WAV file and print the analysis report.

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use voice_recorder::{
    audio::{column_envelope, wav, CpalDevice, WaveformData},
    config::{AppPaths, RecorderConfig},
    recorder::{Recorder, RecorderError, Recording},
};

/// Rendering cadence of the live meter.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const METER_WIDTH: usize = 30;
const REPORT_BARS: usize = 48;

/// Eighth-block glyphs, quietest first.
const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Parser)]
#[command(name = "voice-recorder", about = "Record a voice prompt and check its quality")]
struct Args {
    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output WAV path (defaults to a timestamped file in the output directory).
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Override the maximum recording length in seconds.
    #[arg(long)]
    max_secs: Option<f64>,

    /// Input device name.
    #[arg(long)]
    device: Option<String>,

    /// Print the analysis report as JSON.
    #[arg(long)]
    json: bool,
}

fn default_output(config: &RecorderConfig) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    config
        .output
        .resolve_dir(&AppPaths::new())
        .join(format!("recording-{stamp}.wav"))
}

fn glyph(level: f32) -> char {
    let idx = (level.clamp(0.0, 1.0) * (BAR_GLYPHS.len() - 1) as f32).round() as usize;
    BAR_GLYPHS[idx.min(BAR_GLYPHS.len() - 1)]
}

/// One glyph per column, sized by that column's peak-to-peak swing.
fn draw_meter(columns: &[(f32, f32)], secs: f64) {
    let strip: String = columns.iter().map(|&(lo, hi)| glyph((hi - lo) / 2.0)).collect();
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "\r[{strip:<METER_WIDTH$}] {secs:5.1}s");
    let _ = err.flush();
}

fn print_report(recording: &Recording, json: bool) -> anyhow::Result<()> {
    let report = &recording.analysis;
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Duration: {:.2}s @ {} Hz | peak {:.3} | avg RMS {:.4} | silence {:.0}%",
        recording.duration,
        recording.sample_rate,
        report.peak_amplitude,
        report.avg_rms,
        report.silence_ratio * 100.0
    );
    let bars = WaveformData::compute(&recording.samples, REPORT_BARS);
    let peak = bars.peak();
    if peak > 0.0 {
        let sketch: String = bars.bars.iter().map(|&b| glyph(b / peak)).collect();
        println!("  {sketch}");
    }
    for issue in report.hard_issues() {
        println!("  ✗ [{}] {}", issue.kind, issue.message);
    }
    for issue in report.soft_issues() {
        println!("  ! [{}] {}", issue.kind, issue.message);
    }
    if report.is_valid {
        println!("Recording OK");
    } else {
        println!("Recording rejected; please record again");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RecorderConfig::load_from(path)?,
        None => RecorderConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            RecorderConfig::default()
        }),
    };
    if let Some(secs) = args.max_secs {
        config.quality.max_duration_secs = secs;
    }
    if args.device.is_some() {
        config.capture.device = args.device.clone();
    }

    let device = CpalDevice::new(config.capture.device.clone(), config.capture.snapshot_len.max(1));
    let mut recorder = Recorder::with_config(device, &config);

    let columns = Rc::new(RefCell::new(Vec::new()));
    let meter = Rc::clone(&columns);
    recorder.set_waveform_callback(move |frame| {
        *meter.borrow_mut() = column_envelope(frame, METER_WIDTH);
    });

    if let Err(e) = recorder.start() {
        eprintln!("{e}");
        return Ok(ExitCode::FAILURE);
    }
    eprintln!(
        "Recording (max {:.0}s); press Ctrl-C to stop",
        recorder.max_duration().as_secs_f64()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);

    let mut hit_limit = false;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                recorder.poll_blocks();
                recorder.sample_waveform();
                draw_meter(&columns.borrow(), recorder.captured_secs());
                if recorder.max_duration_reached() {
                    log::info!("Maximum duration reached; stopping");
                    hit_limit = true;
                    break;
                }
            }
        }
    }
    eprintln!();

    let recording = if hit_limit {
        recorder.stop_at_limit()
    } else {
        recorder.stop()
    }
    .ok_or_else(|| anyhow::anyhow!("recorder was not recording"))?;
    let recording = match recording.require_samples() {
        Ok(r) => r,
        Err(e @ RecorderError::EmptyRecording) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let out = args.out.clone().unwrap_or_else(|| default_output(&config));
    wav::write_wav(&out, &recording.samples, recording.sample_rate)?;
    log::info!(
        "Wrote {} ({} bytes, {})",
        out.display(),
        recording.blob.len(),
        recording.mime()
    );

    print_report(&recording, args.json)?;

    Ok(if recording.analysis.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_span_silence_to_full_scale() {
        assert_eq!(glyph(0.0), '▁');
        assert_eq!(glyph(1.0), '█');
        assert_eq!(glyph(7.5), '█');
        assert_eq!(glyph(-0.3), '▁');
    }

    #[test]
    fn envelope_columns_drive_meter_glyphs() {
        let frame = [0.0_f32, 0.0, -1.0, 1.0];
        let strip: String = column_envelope(&frame, 2)
            .iter()
            .map(|&(lo, hi)| glyph((hi - lo) / 2.0))
            .collect();
        assert_eq!(strip, "▁█");
    }
}
