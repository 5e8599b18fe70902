use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use referral_core::config::{AppConfig, LoadOptions};
use referral_core::domain::signature::SignatureImage;
use referral_core::signature::{PadUpdate, SignaturePad, SignatureScript};

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INPUT};

const COMMAND: &str = "sign";

pub fn run(script_path: &Path, out: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    match render(script_path, out, config.signature.stroke_width) {
        Ok(image) => CommandResult::success(
            COMMAND,
            format!(
                "wrote {}x{} signature ({} bytes) to {}",
                image.width,
                image.height,
                image.png.len(),
                out.display()
            ),
        ),
        Err(error) => CommandResult::failure(COMMAND, "input", format!("{error:#}"), EXIT_INPUT),
    }
}

fn render(script_path: &Path, out: &Path, default_stroke_width: f32) -> Result<SignatureImage> {
    let raw = fs::read_to_string(script_path)
        .with_context(|| format!("could not read signature script `{}`", script_path.display()))?;
    let script = SignatureScript::from_json(&raw)
        .with_context(|| format!("invalid signature script `{}`", script_path.display()))?;

    let stroke_width = script.stroke_width.unwrap_or(default_stroke_width);
    let mut pad = SignaturePad::new(script.surface, stroke_width);
    let mut committed = None;
    for event in script.events() {
        if let PadUpdate::Committed(image) = pad.handle(event) {
            committed = Some(image);
        }
    }

    let Some(image) = committed else {
        bail!("signature script `{}` contains no drawn strokes", script_path.display());
    };
    fs::write(out, &image.png).with_context(|| format!("could not write `{}`", out.display()))?;
    Ok(image)
}
