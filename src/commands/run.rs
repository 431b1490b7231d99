//! Live waterfall visualization.
//!
//! Wires the microphone spectrum source, the render orchestrator and the
//! terminal backend into the frame loop, and applies keyboard style toggles
//! between ticks.

use crate::audio::{MicSpectrumSource, SpectrumSource};
use crate::config::{CascadeConfig, ColorMode, RenderStyle};
use crate::waterfall::backend::RenderBackend;
use crate::waterfall::{InputCommand, RenderOrchestrator, TerminalBackend, WaterfallTui};
use std::time::{Duration, Instant};

/// Frame pacing for the render loop (roughly 30 fps).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Runs the waterfall until the user quits.
///
/// # Arguments
/// * `device` - Optional device override from the command line; takes
///   precedence over the configured device
///
/// # Errors
/// - If configuration cannot be loaded or is invalid
/// - If the audio device cannot be opened
/// - If the terminal cannot be initialized
pub async fn handle_run(device: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== cascade waterfall started ===");

    let mut config = CascadeConfig::load_or_init().map_err(|err| {
        tracing::error!("Failed to load configuration: {err}");
        anyhow::anyhow!(
            "Configuration error: {err}. Please check your ~/.config/cascade/cascade.toml file."
        )
    })?;
    if let Some(device) = device {
        config.audio.device = device;
    }

    tracing::info!(
        "Configuration loaded: device={}, fft_size={}, window={}-{}Hz, capacity={}, admission={}Hz",
        config.audio.device,
        config.audio.fft_size,
        config.audio.min_freq_hz,
        config.audio.max_freq_hz,
        config.waterfall.capacity,
        config.waterfall.admission_hz
    );

    let mut source = MicSpectrumSource::start(&config.audio).map_err(|err| {
        tracing::error!("Failed to start audio capture: {}", err);
        err
    })?;

    let mut orchestrator =
        RenderOrchestrator::new(&config.waterfall, source.window_len(), Instant::now());
    let mut gpu = TerminalBackend::new();
    let mut tui =
        WaterfallTui::new().map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    let result = event_loop(
        &config,
        &mut source,
        &mut orchestrator,
        &mut gpu,
        &mut tui,
    )
    .await;

    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    tracing::info!("=== cascade waterfall exited ===");
    result
}

/// The frame loop proper, separated so terminal cleanup runs on every exit path.
async fn event_loop(
    config: &CascadeConfig,
    source: &mut MicSpectrumSource,
    orchestrator: &mut RenderOrchestrator,
    gpu: &mut TerminalBackend,
    tui: &mut WaterfallTui,
) -> Result<(), anyhow::Error> {
    let mut style = config.waterfall.style.clone();

    let (mut width, mut height) = tui.size()?;
    gpu.set_viewport(width, height);
    orchestrator.set_aspect(gpu.aspect_ratio());

    loop {
        match tui.handle_input()? {
            InputCommand::Quit => break,
            InputCommand::ToggleLine => style.line = !style.line,
            InputCommand::ToggleRibbon => style.ribbon = !style.ribbon,
            InputCommand::CycleColor => {
                style.color_mode = match style.color_mode {
                    ColorMode::Hue => ColorMode::Uniform,
                    ColorMode::Uniform => ColorMode::Hue,
                };
            }
            InputCommand::Continue => {}
        }

        let (current_width, current_height) = tui.size()?;
        if (current_width, current_height) != (width, height) {
            width = current_width;
            height = current_height;
            gpu.set_viewport(width, height);
            orchestrator.set_aspect(gpu.aspect_ratio());
            tracing::debug!("Viewport resized to {}x{}", width, height);
        }

        gpu.begin_frame();
        if let Err(err) = orchestrator.frame(Instant::now(), source, gpu, &style) {
            tracing::warn!("Frame failed: {err:#}");
        }

        let status = format_status(config, &style, orchestrator.history().len());
        tui.draw(gpu.segments(), &status)
            .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;

        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    Ok(())
}

fn format_status(config: &CascadeConfig, style: &RenderStyle, strips: usize) -> String {
    let flag = |on: bool| if on { "on" } else { "off" };
    format!(
        "● {strips}/{} strips / {:.0} Hz / [l]ine:{} [r]ibbon:{} [c]olor:{} / q quit",
        config.waterfall.capacity,
        config.waterfall.admission_hz,
        flag(style.line),
        flag(style.ribbon),
        style.color_mode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_reflects_style() {
        let config = CascadeConfig::default();
        let mut style = RenderStyle::default();
        style.ribbon = false;

        let status = format_status(&config, &style, 12);
        assert!(status.contains("12/50 strips"));
        assert!(status.contains("[l]ine:on"));
        assert!(status.contains("[r]ibbon:off"));
        assert!(status.contains("hue"));
    }
}
