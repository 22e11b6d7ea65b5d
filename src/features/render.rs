//! Per-kind drawing policy for projected fields.

use thiserror::Error;

use crate::features::fields::{ChoiceState, FieldContent, FieldDescriptor, ImagePayload};
use crate::features::pdf::{CircleStyle, PageCanvas, PdfError, Rgb};
use crate::features::projection::{Point, PointBox};

const TEXT_INSET_PT: f64 = 5.0;
const TEXT_HEIGHT_RATIO: f64 = 0.6;
const MAX_FONT_SIZE_PT: f64 = 16.0;
const CHOICE_BORDER_WIDTH_PT: f64 = 2.0;
const CHOICE_DOT_RATIO: f64 = 0.6;
pub const CHOICE_ACCENT: Rgb = Rgb::new(0.15, 0.39, 0.92);

#[derive(Error, Debug)]
pub enum FieldRenderError {
    #[error("image payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("image could not be embedded: {0}")]
    Embed(#[source] PdfError),

    #[error("drawing failed: {0}")]
    Draw(#[source] PdfError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextLayout {
    pub origin: Point,
    pub font_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceMarker {
    pub center: Point,
    pub radius: f64,
    pub dot_radius: Option<f64>,
}

/// Largest box with the image's aspect ratio that fits inside `bbox`.
/// A relatively wider image is flush left and vertically centered; a taller
/// (or equal) one is flush bottom and horizontally centered.
pub fn aspect_fit(image_width: f64, image_height: f64, bbox: PointBox) -> PointBox {
    let image_ratio = image_width / image_height;
    let box_ratio = bbox.width / bbox.height;

    if image_ratio > box_ratio {
        let draw_height = bbox.width / image_ratio;
        PointBox::new(
            bbox.x,
            bbox.y + (bbox.height - draw_height) / 2.0,
            bbox.width,
            draw_height,
        )
    } else {
        let draw_width = bbox.height * image_ratio;
        PointBox::new(
            bbox.x + (bbox.width - draw_width) / 2.0,
            bbox.y,
            draw_width,
            bbox.height,
        )
    }
}

/// Baseline placement approximating optical vertical centering.
pub fn text_layout(bbox: PointBox) -> TextLayout {
    let font_size = (bbox.height * TEXT_HEIGHT_RATIO).min(MAX_FONT_SIZE_PT);
    TextLayout {
        origin: Point::new(
            bbox.x + TEXT_INSET_PT,
            bbox.y + bbox.height / 2.0 - font_size / 3.0,
        ),
        font_size,
    }
}

pub fn choice_marker(bbox: PointBox, state: ChoiceState) -> ChoiceMarker {
    let radius = bbox.width.min(bbox.height) / 3.0;
    ChoiceMarker {
        center: bbox.center(),
        radius,
        dot_radius: match state {
            ChoiceState::Selected => Some(radius * CHOICE_DOT_RATIO),
            ChoiceState::Unselected => None,
        },
    }
}

/// Paint one field into its projected box.
pub fn render_field(
    canvas: &mut dyn PageCanvas,
    field: &FieldDescriptor,
    bbox: PointBox,
) -> Result<(), FieldRenderError> {
    match &field.content {
        FieldContent::Signature(payload) | FieldContent::Image(payload) => {
            render_image(canvas, payload, bbox)
        }
        FieldContent::Text(text) | FieldContent::Date(text) => {
            let layout = text_layout(bbox);
            canvas
                .draw_text(text, layout.origin, layout.font_size, Rgb::BLACK)
                .map_err(FieldRenderError::Draw)
        }
        FieldContent::SingleChoice(state) => render_choice(canvas, choice_marker(bbox, *state)),
    }
}

fn render_image(
    canvas: &mut dyn PageCanvas,
    payload: &ImagePayload,
    bbox: PointBox,
) -> Result<(), FieldRenderError> {
    let bytes = payload.decode()?;
    let handle = canvas
        .embed_raster_image(&bytes, payload.format)
        .map_err(FieldRenderError::Embed)?;
    let placement = aspect_fit(f64::from(handle.width), f64::from(handle.height), bbox);
    canvas
        .draw_image(&handle, placement)
        .map_err(FieldRenderError::Draw)
}

fn render_choice(canvas: &mut dyn PageCanvas, marker: ChoiceMarker) -> Result<(), FieldRenderError> {
    canvas
        .draw_circle(
            marker.center,
            marker.radius,
            CircleStyle::outline(Rgb::BLACK, CHOICE_BORDER_WIDTH_PT),
        )
        .map_err(FieldRenderError::Draw)?;
    if let Some(dot_radius) = marker.dot_radius {
        canvas
            .draw_circle(marker.center, dot_radius, CircleStyle::filled(CHOICE_ACCENT))
            .map_err(FieldRenderError::Draw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::coordinates::NormalizedRect;
    use crate::features::fields::ImageFormat;
    use crate::features::pdf::ImageHandle;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Embed(ImageFormat),
        Image(PointBox),
        Text(String, Point, f64),
        Circle(Point, f64, CircleStyle),
    }

    /// Pretends every payload decodes to a fixed-size image.
    struct RecordingCanvas {
        image_size: (u32, u32),
        reject_images: bool,
        calls: Vec<Call>,
    }

    impl RecordingCanvas {
        fn new(image_size: (u32, u32)) -> Self {
            Self {
                image_size,
                reject_images: false,
                calls: Vec::new(),
            }
        }
    }

    impl PageCanvas for RecordingCanvas {
        fn embed_raster_image(
            &mut self,
            _bytes: &[u8],
            format: ImageFormat,
        ) -> Result<ImageHandle, PdfError> {
            if self.reject_images {
                return Err(PdfError::Decode("corrupt".into()));
            }
            self.calls.push(Call::Embed(format));
            Ok(ImageHandle {
                name: "Im1".into(),
                width: self.image_size.0,
                height: self.image_size.1,
            })
        }

        fn draw_image(&mut self, _image: &ImageHandle, bbox: PointBox) -> Result<(), PdfError> {
            self.calls.push(Call::Image(bbox));
            Ok(())
        }

        fn draw_text(
            &mut self,
            text: &str,
            origin: Point,
            font_size: f64,
            _color: Rgb,
        ) -> Result<(), PdfError> {
            self.calls.push(Call::Text(text.into(), origin, font_size));
            Ok(())
        }

        fn draw_circle(
            &mut self,
            center: Point,
            radius: f64,
            style: CircleStyle,
        ) -> Result<(), PdfError> {
            self.calls.push(Call::Circle(center, radius, style));
            Ok(())
        }
    }

    fn field(content: FieldContent) -> FieldDescriptor {
        FieldDescriptor::new(content, NormalizedRect::new(0.1, 0.1, 0.2, 0.1))
    }

    #[test]
    fn wide_image_is_letterboxed_vertically() {
        let placed = aspect_fit(400.0, 200.0, PointBox::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(placed, PointBox::new(0.0, 25.0, 100.0, 50.0));
    }

    #[test]
    fn tall_image_is_pillarboxed_horizontally() {
        let placed = aspect_fit(100.0, 400.0, PointBox::new(10.0, 20.0, 100.0, 100.0));
        assert_eq!(placed, PointBox::new(47.5, 20.0, 25.0, 100.0));
    }

    #[test]
    fn equal_ratio_fills_the_box() {
        let bbox = PointBox::new(5.0, 5.0, 60.0, 30.0);
        assert_eq!(aspect_fit(200.0, 100.0, bbox), bbox);
    }

    #[test]
    fn fitted_image_never_exceeds_box() {
        let bbox = PointBox::new(30.0, 700.0, 148.75, 84.2);
        for (w, h) in [(1.0, 1.0), (1000.0, 3.0), (3.0, 1000.0), (640.0, 480.0)] {
            let placed = aspect_fit(w, h, bbox);
            assert!(placed.width <= bbox.width + 1e-9);
            assert!(placed.height <= bbox.height + 1e-9);
            assert!(placed.x >= bbox.x - 1e-9 && placed.y >= bbox.y - 1e-9);
            assert!((placed.width / placed.height - w / h).abs() < 1e-6);
        }
    }

    #[test]
    fn font_size_is_capped_at_sixteen_points() {
        let small = text_layout(PointBox::new(100.0, 200.0, 150.0, 20.0));
        assert!((small.font_size - 12.0).abs() < 1e-9);
        assert_eq!(small.origin.x, 105.0);
        assert!((small.origin.y - 206.0).abs() < 1e-9);

        let large = text_layout(PointBox::new(0.0, 0.0, 150.0, 80.0));
        assert_eq!(large.font_size, 16.0);
        assert!((large.origin.y - (40.0 - 16.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn unselected_choice_draws_one_circle() {
        let mut canvas = RecordingCanvas::new((1, 1));
        let bbox = PointBox::new(0.0, 0.0, 30.0, 60.0);
        render_field(
            &mut canvas,
            &field(FieldContent::SingleChoice(ChoiceState::Unselected)),
            bbox,
        )
        .unwrap();
        assert_eq!(
            canvas.calls,
            vec![Call::Circle(
                Point::new(15.0, 30.0),
                10.0,
                CircleStyle::outline(Rgb::BLACK, 2.0)
            )]
        );
    }

    #[test]
    fn selected_choice_draws_concentric_dot() {
        let mut canvas = RecordingCanvas::new((1, 1));
        let bbox = PointBox::new(0.0, 0.0, 30.0, 30.0);
        render_field(
            &mut canvas,
            &field(FieldContent::SingleChoice(ChoiceState::Selected)),
            bbox,
        )
        .unwrap();
        assert_eq!(canvas.calls.len(), 2);
        let (Call::Circle(outer_c, outer_r, _), Call::Circle(inner_c, inner_r, inner_style)) =
            (&canvas.calls[0], &canvas.calls[1])
        else {
            panic!("expected two circles, got {:?}", canvas.calls);
        };
        assert_eq!(outer_c, inner_c);
        assert!((inner_r - outer_r * 0.6).abs() < 1e-9);
        assert_eq!(inner_style.fill, Some(CHOICE_ACCENT));
        assert_eq!(inner_style.border, None);
    }

    #[test]
    fn signature_is_embedded_then_fitted() {
        let mut canvas = RecordingCanvas::new((400, 200));
        let payload = ImagePayload::from_bytes(b"raw", ImageFormat::Jpeg);
        render_field(
            &mut canvas,
            &field(FieldContent::Signature(payload)),
            PointBox::new(0.0, 0.0, 100.0, 100.0),
        )
        .unwrap();
        assert_eq!(
            canvas.calls,
            vec![
                Call::Embed(ImageFormat::Jpeg),
                Call::Image(PointBox::new(0.0, 25.0, 100.0, 50.0))
            ]
        );
    }

    #[test]
    fn image_failures_surface_as_field_errors() {
        let mut canvas = RecordingCanvas::new((10, 10));
        let bad_base64 = ImagePayload::from_content("data:image/png;base64,%%%");
        let err = render_field(
            &mut canvas,
            &field(FieldContent::Image(bad_base64)),
            PointBox::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap_err();
        assert!(matches!(err, FieldRenderError::Payload(_)));

        canvas.reject_images = true;
        let err = render_field(
            &mut canvas,
            &field(FieldContent::Signature(ImagePayload::from_bytes(
                b"x",
                ImageFormat::Png,
            ))),
            PointBox::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap_err();
        assert!(matches!(err, FieldRenderError::Embed(PdfError::Decode(_))));
        assert!(canvas.calls.is_empty());
    }

    #[test]
    fn date_uses_text_layout() {
        let mut canvas = RecordingCanvas::new((1, 1));
        let bbox = PointBox::new(50.0, 50.0, 100.0, 10.0);
        render_field(&mut canvas, &field(FieldContent::Date("2024-06-30".into())), bbox).unwrap();
        let layout = text_layout(bbox);
        assert_eq!(
            canvas.calls,
            vec![Call::Text("2024-06-30".into(), layout.origin, layout.font_size)]
        );
    }
}
