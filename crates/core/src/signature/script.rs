use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signature::{validate_stroke_width, PointerEvent, PointerId, SurfaceError, SurfaceSize};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("could not parse signature script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unusable signature script: {0}")]
    Surface(#[from] SurfaceError),
}

/// A recorded signature: the surface it was drawn on and each stroke's
/// points in CSS pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignatureScript {
    pub surface: SurfaceSize,
    #[serde(default)]
    pub stroke_width: Option<f32>,
    pub strokes: Vec<Vec<[f32; 2]>>,
}

impl SignatureScript {
    /// Parses a script and checks its surface and stroke width, so replaying
    /// it never needs an unbounded buffer.
    pub fn from_json(raw: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(raw)?;
        script.surface.validate()?;
        if let Some(stroke_width) = script.stroke_width {
            validate_stroke_width(stroke_width)?;
        }
        Ok(script)
    }

    /// Pointer events reproducing the strokes: down on the first point, a
    /// move per following point, then up. Each stroke uses its own pointer id.
    pub fn events(&self) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        for (index, stroke) in self.strokes.iter().enumerate() {
            let Some((first, rest)) = stroke.split_first() else {
                continue;
            };
            let pointer = PointerId(index as u32 + 1);
            events.push(PointerEvent::Down { pointer, at: (*first).into() });
            events.extend(rest.iter().map(|point| PointerEvent::Move { pointer, at: (*point).into() }));
            events.push(PointerEvent::Up { pointer });
        }
        events
    }
}
