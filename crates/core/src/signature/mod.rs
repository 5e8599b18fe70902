//! Free-hand signature capture.
//!
//! The pad turns pointer gestures into a raster image. An image is only
//! produced when a gesture that actually drew something ends, so rapid
//! pointer-move events never pay for PNG encoding.

pub mod raster;
pub mod script;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::signature::SignatureImage;

pub use raster::{
    validate_stroke_width, Point, Surface, SurfaceError, SurfaceSize, MAX_SURFACE_EXTENT,
};
pub use script::{ScriptError, SignatureScript};

pub const DEFAULT_STROKE_WIDTH: f32 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { pointer: PointerId, at: Point },
    Move { pointer: PointerId, at: Point },
    Up { pointer: PointerId },
    Leave { pointer: PointerId },
    Cancel { pointer: PointerId },
}

/// What the owner of the form state has to do after a pad operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PadUpdate {
    Unchanged,
    Committed(SignatureImage),
    /// Any previously committed image no longer matches the surface.
    Invalidated,
}

#[derive(Clone, Debug)]
pub struct SignaturePad {
    surface: Surface,
    size: SurfaceSize,
    stroke_width: f32,
    captured: Option<PointerId>,
    last_position: Option<Point>,
    has_stroke: bool,
    drew_in_gesture: bool,
}

impl SignaturePad {
    pub fn new(size: SurfaceSize, stroke_width: f32) -> Self {
        Self {
            surface: Surface::new(size),
            size,
            stroke_width,
            captured: None,
            last_position: None,
            has_stroke: false,
            drew_in_gesture: false,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn pixel_dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn has_stroke(&self) -> bool {
        self.has_stroke
    }

    pub fn is_drawing(&self) -> bool {
        self.captured.is_some()
    }

    /// Re-creates the buffer at the new size. Always destructive.
    pub fn resize(&mut self, size: SurfaceSize) -> PadUpdate {
        self.surface = Surface::new(size);
        self.size = size;
        self.reset_gesture();
        self.has_stroke = false;
        debug!(
            event_name = "signature.resized",
            width = size.width,
            height = size.height,
            device_pixel_ratio = size.scale(),
            "signature surface re-initialized"
        );
        PadUpdate::Invalidated
    }

    pub fn clear(&mut self) -> PadUpdate {
        self.surface.clear();
        self.reset_gesture();
        self.has_stroke = false;
        PadUpdate::Invalidated
    }

    /// A repeated down from the captured pointer restarts the segment at `at`
    /// but keeps the gesture, so whatever it already drew still commits on up.
    pub fn begin_stroke(&mut self, pointer: PointerId, at: Point) -> PadUpdate {
        match self.captured {
            Some(owner) if owner != pointer => return PadUpdate::Unchanged,
            _ => {}
        }
        self.captured = Some(pointer);
        self.last_position = Some(at);
        PadUpdate::Unchanged
    }

    pub fn continue_stroke(&mut self, pointer: PointerId, at: Point) -> PadUpdate {
        if self.captured != Some(pointer) {
            return PadUpdate::Unchanged;
        }
        let Some(last) = self.last_position else {
            return PadUpdate::Unchanged;
        };
        if last == at {
            return PadUpdate::Unchanged;
        }

        self.surface.stroke_segment(last, at, self.stroke_width);
        self.last_position = Some(at);
        self.has_stroke = true;
        self.drew_in_gesture = true;
        PadUpdate::Unchanged
    }

    pub fn end_stroke(&mut self, pointer: PointerId) -> PadUpdate {
        if self.captured != Some(pointer) {
            return PadUpdate::Unchanged;
        }
        let drew = self.drew_in_gesture;
        self.reset_gesture();
        if !drew {
            return PadUpdate::Unchanged;
        }

        match self.snapshot() {
            Some(image) => {
                debug!(
                    event_name = "signature.committed",
                    width = image.width,
                    height = image.height,
                    encoded_bytes = image.png.len(),
                    "signature image committed"
                );
                PadUpdate::Committed(image)
            }
            None => PadUpdate::Unchanged,
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> PadUpdate {
        match event {
            PointerEvent::Down { pointer, at } => self.begin_stroke(pointer, at),
            PointerEvent::Move { pointer, at } => self.continue_stroke(pointer, at),
            PointerEvent::Up { pointer }
            | PointerEvent::Leave { pointer }
            | PointerEvent::Cancel { pointer } => self.end_stroke(pointer),
        }
    }

    /// Encodes the current drawing, if anything has been drawn.
    pub fn snapshot(&self) -> Option<SignatureImage> {
        if !self.has_stroke {
            return None;
        }
        let (width, height) = self.surface.dimensions();
        match self.surface.encode_png() {
            Ok(png) => Some(SignatureImage { png, width, height }),
            Err(error) => {
                warn!(
                    event_name = "signature.encode_failed",
                    error = %error,
                    "signature image could not be encoded"
                );
                None
            }
        }
    }

    fn reset_gesture(&mut self) {
        self.captured = None;
        self.last_position = None;
        self.drew_in_gesture = false;
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(SurfaceSize::new(600.0, 160.0, 1.0), DEFAULT_STROKE_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::{PadUpdate, Point, PointerEvent, PointerId, SignaturePad, SurfaceSize};

    const PEN: PointerId = PointerId(1);

    fn draw_line(pad: &mut SignaturePad) -> PadUpdate {
        pad.begin_stroke(PEN, Point::new(10.0, 40.0));
        pad.continue_stroke(PEN, Point::new(60.0, 40.0));
        pad.continue_stroke(PEN, Point::new(90.0, 70.0));
        pad.end_stroke(PEN)
    }

    #[test]
    fn completed_stroke_commits_png_image() {
        let mut pad = SignaturePad::new(SurfaceSize::new(200.0, 100.0, 2.0), 2.5);

        let update = draw_line(&mut pad);

        let PadUpdate::Committed(image) = update else {
            panic!("expected committed image, got {update:?}");
        };
        assert_eq!((image.width, image.height), (400, 200));
        assert_eq!(&image.png[..4], b"\x89PNG");
        assert!(pad.has_stroke());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn zero_length_first_gesture_commits_nothing() {
        let mut pad = SignaturePad::default();

        pad.begin_stroke(PEN, Point::new(25.0, 25.0));
        let update = pad.end_stroke(PEN);

        assert_eq!(update, PadUpdate::Unchanged);
        assert!(!pad.has_stroke());
        assert!(pad.snapshot().is_none());
    }

    #[test]
    fn zero_length_gesture_after_stroke_keeps_prior_commit() {
        let mut pad = SignaturePad::default();
        assert!(matches!(draw_line(&mut pad), PadUpdate::Committed(_)));

        pad.begin_stroke(PEN, Point::new(120.0, 20.0));
        pad.continue_stroke(PEN, Point::new(120.0, 20.0));
        let update = pad.end_stroke(PEN);

        assert_eq!(update, PadUpdate::Unchanged);
        assert!(pad.has_stroke());
    }

    #[test]
    fn repeated_down_from_same_pointer_restarts_segment() {
        let mut pad = SignaturePad::default();

        pad.handle(PointerEvent::Down { pointer: PEN, at: Point::new(10.0, 40.0) });
        pad.handle(PointerEvent::Move { pointer: PEN, at: Point::new(60.0, 40.0) });
        pad.handle(PointerEvent::Down { pointer: PEN, at: Point::new(100.0, 100.0) });
        assert!(pad.is_drawing());
        pad.handle(PointerEvent::Move { pointer: PEN, at: Point::new(150.0, 100.0) });
        let update = pad.handle(PointerEvent::Up { pointer: PEN });

        assert!(matches!(update, PadUpdate::Committed(_)), "got {update:?}");
        let surface = pad.surface();
        assert!(surface.alpha_at(35, 40).is_some_and(|alpha| alpha > 0));
        assert!(surface.alpha_at(125, 100).is_some_and(|alpha| alpha > 0));
        // No segment joins the old position to the new down point.
        assert_eq!(surface.alpha_at(80, 70), Some(0));
    }

    #[test]
    fn repeated_down_then_up_still_commits_earlier_ink() {
        let mut pad = SignaturePad::default();

        pad.handle(PointerEvent::Down { pointer: PEN, at: Point::new(10.0, 40.0) });
        pad.handle(PointerEvent::Move { pointer: PEN, at: Point::new(60.0, 40.0) });
        pad.handle(PointerEvent::Down { pointer: PEN, at: Point::new(100.0, 100.0) });
        let update = pad.handle(PointerEvent::Up { pointer: PEN });

        assert!(matches!(update, PadUpdate::Committed(_)), "got {update:?}");
        assert!(!pad.is_drawing());
    }

    #[test]
    fn moves_without_pressed_pointer_are_ignored() {
        let mut pad = SignaturePad::default();
        pad.continue_stroke(PEN, Point::new(5.0, 5.0));
        pad.continue_stroke(PEN, Point::new(50.0, 50.0));

        assert!(!pad.has_stroke());
        assert!(pad.surface().is_blank());
    }

    #[test]
    fn captured_pointer_excludes_other_pointers() {
        let mut pad = SignaturePad::default();
        let finger = PointerId(7);

        pad.begin_stroke(PEN, Point::new(10.0, 10.0));
        pad.begin_stroke(finger, Point::new(100.0, 100.0));
        pad.continue_stroke(finger, Point::new(150.0, 100.0));
        assert!(!pad.has_stroke());
        assert_eq!(pad.end_stroke(finger), PadUpdate::Unchanged);
        assert!(pad.is_drawing());

        pad.continue_stroke(PEN, Point::new(-30.0, 10.0));
        assert!(pad.has_stroke(), "captured drags outside the surface are still tracked");
        assert!(matches!(pad.end_stroke(PEN), PadUpdate::Committed(_)));
    }

    #[test]
    fn leaving_the_surface_ends_the_stroke() {
        let mut pad = SignaturePad::default();
        pad.handle(PointerEvent::Down { pointer: PEN, at: Point::new(10.0, 10.0) });
        pad.handle(PointerEvent::Move { pointer: PEN, at: Point::new(40.0, 12.0) });

        let update = pad.handle(PointerEvent::Leave { pointer: PEN });

        assert!(matches!(update, PadUpdate::Committed(_)));
        assert!(!pad.is_drawing());
        pad.handle(PointerEvent::Move { pointer: PEN, at: Point::new(80.0, 80.0) });
        assert_eq!(pad.surface().alpha_at(80, 80), Some(0));
    }

    #[test]
    fn resize_after_strokes_is_destructive() {
        let mut pad = SignaturePad::default();
        draw_line(&mut pad);

        let update = pad.resize(SurfaceSize::new(320.0, 120.0, 1.5));

        assert_eq!(update, PadUpdate::Invalidated);
        assert!(!pad.has_stroke());
        assert!(pad.surface().is_blank());
        assert_eq!(pad.pixel_dimensions(), (480, 180));
        assert!(pad.snapshot().is_none());
    }

    #[test]
    fn resize_mid_gesture_drops_the_gesture() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(PEN, Point::new(10.0, 10.0));
        pad.continue_stroke(PEN, Point::new(30.0, 30.0));

        pad.resize(SurfaceSize::new(600.0, 160.0, 1.0));

        assert!(!pad.is_drawing());
        assert_eq!(pad.end_stroke(PEN), PadUpdate::Unchanged);
    }

    #[test]
    fn clear_wipes_surface_and_invalidates_commit() {
        let mut pad = SignaturePad::default();
        draw_line(&mut pad);

        assert_eq!(pad.clear(), PadUpdate::Invalidated);
        assert!(!pad.has_stroke());
        assert!(pad.surface().is_blank());
    }
}
