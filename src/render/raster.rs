//! Rasterization of [`Frame`]s with `tiny-skia`.
//!
//! Frames are in surface-local points (origin bottom-left, Y up) while a
//! pixmap is stored top-down in device pixels. A single transform does both
//! the flip and the backing scale, so paths, gradients and strokes are all
//! built straight from frame coordinates.
//!
//! Label glyphs are drawn with `ab_glyph` from an optional [`LabelFont`].
//! Without a font a label is drawn as its backing plate only.

use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::paint::{Color, Frame, Outline, PaintOp};
use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use std::path::Path;
use std::sync::OnceLock;
use tiny_skia::{
    FillRule, GradientStop, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    RadialGradient, SpreadMode, Stroke, Transform,
};

/// Width of a glyph-less label per character, relative to the font size.
const TEXT_ADVANCE: f64 = 0.6;

/// Backing plate opacity, relative to the label's own alpha.
const PLATE_ALPHA: f64 = 0.55;

#[cfg(target_os = "macos")]
const SYSTEM_FONTS: &[&str] = &[
    "/System/Library/Fonts/SFNS.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
];

#[cfg(target_os = "windows")]
const SYSTEM_FONTS: &[&str] = &[
    "C:\\Windows\\Fonts\\segoeui.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
];

/// A font for keystroke labels.
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
}

impl LabelFont {
    /// Parse a TrueType/OpenType font (the first face of a collection).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec_and_index(bytes, 0)
            .map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self {
            font: FontArc::new(font),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Font(format!("failed to read {}: {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    /// The first loadable font from a short list of platform defaults.
    ///
    /// Looked up once per process.
    pub fn system() -> Option<Self> {
        static SYSTEM: OnceLock<Option<LabelFont>> = OnceLock::new();
        SYSTEM
            .get_or_init(|| {
                let found = SYSTEM_FONTS.iter().find_map(|path| {
                    let font = Self::from_file(path).ok()?;
                    log::debug!("label font: {path}");
                    Some(font)
                });
                if found.is_none() {
                    log::warn!("no system font found, keystroke labels are drawn without glyphs");
                }
                found
            })
            .clone()
    }

    /// Advance width of `text` at `size` points.
    fn text_width(&self, text: &str, size: f64) -> f64 {
        let scaled = self.font.as_scaled(PxScale::from(size as f32));
        text.chars()
            .map(|ch| scaled.h_advance(scaled.glyph_id(ch)) as f64)
            .sum()
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont").finish_non_exhaustive()
    }
}

/// Backing plate for a label of advance `width` centered on `anchor`.
pub fn text_plate(anchor: Point, width: f64, size: f64) -> Rect {
    let pad = size * 0.4;
    Rect::new(
        anchor.x - width / 2.0 - pad,
        anchor.y - size * 0.3 - pad / 2.0,
        width + pad * 2.0,
        size * 1.4 + pad,
    )
}

/// A premultiplied RGBA pixmap that frames are drawn into.
pub struct Canvas {
    pixmap: Pixmap,
    scale: f64,
    font: Option<LabelFont>,
}

impl Canvas {
    /// A transparent canvas where one frame point is one pixel.
    ///
    /// `None` if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Option<Self> {
        Self::with_scale(width, height, 1.0)
    }

    /// A transparent canvas of `width` x `height` device pixels where one
    /// frame point covers `scale` pixels.
    pub fn with_scale(width: usize, height: usize, scale: f64) -> Option<Self> {
        let width = u32::try_from(width).ok()?;
        let height = u32::try_from(height).ok()?;
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            scale,
            font: None,
        })
    }

    pub fn with_font(mut self, font: Option<LabelFont>) -> Self {
        self.font = font;
        self
    }

    pub fn width(&self) -> usize {
        self.pixmap.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixmap.height() as usize
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Premultiplied RGBA bytes, rows top-down.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Copy the pixels into `out` as premultiplied BGRA scaled by `opacity`,
    /// the layout GDI and X11 32-bit visuals expect.
    ///
    /// Stops at whichever of the two buffers is shorter.
    pub fn write_bgra(&self, out: &mut [u8], opacity: f64) {
        let factor = (opacity.clamp(0.0, 1.0) * 255.0).round() as u16;
        let scale = |v: u8| ((v as u16 * factor + 127) / 255) as u8;
        for (src, dst) in self.pixmap.data().chunks_exact(4).zip(out.chunks_exact_mut(4)) {
            dst[0] = scale(src[2]);
            dst[1] = scale(src[1]);
            dst[2] = scale(src[0]);
            dst[3] = scale(src[3]);
        }
    }

    /// Pixel at column `x`, row `y` (row 0 is the top), straight alpha.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        let pixel = self
            .pixmap
            .pixel(u32::try_from(x).ok()?, u32::try_from(y).ok()?)?
            .demultiply();
        let unit = |v: u8| v as f64 / 255.0;
        Some(Color::rgba(
            unit(pixel.red()),
            unit(pixel.green()),
            unit(pixel.blue()),
            unit(pixel.alpha()),
        ))
    }

    /// Color of the pixel covering surface-local `point`.
    pub fn sample(&self, point: Point) -> Option<Color> {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let col = (point.x * self.scale).floor() as usize;
        let from_bottom = (point.y * self.scale).floor() as usize;
        let row = self.height().checked_sub(from_bottom + 1)?;
        self.pixel(col, row)
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Composite every op of `frame` in order.
    pub fn render(&mut self, frame: &Frame) {
        for op in frame.ops() {
            self.render_op(op);
        }
    }

    /// Frame points to device pixels.
    fn transform(&self) -> Transform {
        let s = self.scale as f32;
        Transform::from_row(s, 0.0, 0.0, -s, 0.0, self.pixmap.height() as f32)
    }

    fn render_op(&mut self, op: &PaintOp) {
        match op {
            PaintOp::Clear => self.clear(),
            PaintOp::FillWithHole { rect, hole, color } => {
                let mut pb = PathBuilder::new();
                push_rect(&mut pb, *rect);
                if let Some(hole) = hole {
                    push_outline(&mut pb, hole);
                }
                self.fill(pb, solid(*color), FillRule::EvenOdd);
            }
            PaintOp::RadialGradientRing {
                center,
                inner_radius,
                outer_radius,
                inner_color,
                outer_color,
            } => {
                let span = outer_radius - inner_radius;
                if span.is_nan() || span <= 0.0 || *inner_radius < 0.0 {
                    return;
                }
                let c = tiny_skia::Point::from_xy(center.x as f32, center.y as f32);
                let shader = RadialGradient::new(
                    c,
                    c,
                    *outer_radius as f32,
                    vec![
                        GradientStop::new(
                            (inner_radius / outer_radius) as f32,
                            skia_color(*inner_color),
                        ),
                        GradientStop::new(1.0, skia_color(*outer_color)),
                    ],
                    SpreadMode::Pad,
                    Transform::identity(),
                );
                let Some(shader) = shader else {
                    return;
                };
                let mut pb = PathBuilder::new();
                push_outline(&mut pb, &Outline::Circle { center: *center, radius: *outer_radius });
                push_outline(&mut pb, &Outline::Circle { center: *center, radius: *inner_radius });
                let paint = Paint {
                    shader,
                    anti_alias: true,
                    ..Paint::default()
                };
                self.fill(pb, Some(paint), FillRule::EvenOdd);
            }
            PaintOp::FillRing {
                outer,
                inner,
                color,
            } => {
                let mut pb = PathBuilder::new();
                push_outline(&mut pb, outer);
                push_outline(&mut pb, inner);
                self.fill(pb, solid(*color), FillRule::EvenOdd);
            }
            PaintOp::StrokeOutline {
                outline,
                width,
                color,
            } => {
                if !(width.is_finite() && *width > 0.0) {
                    return;
                }
                let mut pb = PathBuilder::new();
                push_outline(&mut pb, outline);
                let (Some(path), Some(paint)) = (pb.finish(), solid(*color)) else {
                    return;
                };
                let stroke = Stroke {
                    width: *width as f32,
                    ..Stroke::default()
                };
                let transform = self.transform();
                self.pixmap
                    .stroke_path(&path, &paint, &stroke, transform, None);
            }
            PaintOp::FillOutline { outline, color } => {
                let mut pb = PathBuilder::new();
                push_outline(&mut pb, outline);
                self.fill(pb, solid(*color), FillRule::Winding);
            }
            PaintOp::Text {
                anchor,
                text,
                size,
                color,
            } => self.draw_label(*anchor, text, *size, *color),
        }
    }

    fn fill(&mut self, pb: PathBuilder, paint: Option<Paint<'_>>, rule: FillRule) {
        let (Some(path), Some(paint)) = (pb.finish(), paint) else {
            return;
        };
        let transform = self.transform();
        self.pixmap.fill_path(&path, &paint, rule, transform, None);
    }

    fn draw_label(&mut self, anchor: Point, text: &str, size: f64, color: Color) {
        if text.is_empty() || !(size.is_finite() && size > 0.0) || !anchor.is_finite() {
            return;
        }
        let color = color.sanitized();
        let width = match &self.font {
            Some(font) => font.text_width(text, size),
            None => text.chars().count() as f64 * size * TEXT_ADVANCE,
        };

        let mut pb = PathBuilder::new();
        push_rect(&mut pb, text_plate(anchor, width, size));
        let plate = Color::BLACK.with_alpha(PLATE_ALPHA * color.a);
        self.fill(pb, solid(plate), FillRule::Winding);

        let Some(font) = self.font.clone() else {
            return;
        };
        let scaled = font.font.as_scaled(PxScale::from((size * self.scale) as f32));
        let mut origin = [tiny_skia::Point::from_xy(
            (anchor.x - width / 2.0) as f32,
            anchor.y as f32,
        )];
        self.transform().map_points(&mut origin);
        let mut caret = point(origin[0].x, origin[0].y);
        for ch in text.chars() {
            let mut glyph = scaled.scaled_glyph(ch);
            glyph.position = caret;
            caret.x += scaled.h_advance(glyph.id);
            let Some(outlined) = scaled.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let w = bounds.width().ceil() as u32;
            let Some(mut glyph_pixmap) = Pixmap::new(w, bounds.height().ceil() as u32) else {
                continue;
            };
            let pixels = glyph_pixmap.pixels_mut();
            outlined.draw(|x, y, coverage| {
                if let Some(slot) = pixels.get_mut((y * w + x) as usize)
                    && let Some(px) = premultiplied(color, coverage as f64)
                {
                    *slot = px;
                }
            });
            self.pixmap.draw_pixmap(
                bounds.min.x as i32,
                bounds.min.y as i32,
                glyph_pixmap.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("scale", &self.scale)
            .field("font", &self.font)
            .finish()
    }
}

fn push_rect(pb: &mut PathBuilder, rect: Rect) {
    if let Some(rect) = tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    ) {
        pb.push_rect(rect);
    }
}

fn push_outline(pb: &mut PathBuilder, outline: &Outline) {
    match outline {
        Outline::Circle { center, radius } => {
            if center.is_finite() && radius.is_finite() && *radius > 0.0 {
                pb.push_circle(center.x as f32, center.y as f32, *radius as f32);
            }
        }
        Outline::Polygon(vertices) => {
            let mut points = vertices.iter().filter(|p| p.is_finite());
            let Some(first) = points.next() else {
                return;
            };
            pb.move_to(first.x as f32, first.y as f32);
            for p in points {
                pb.line_to(p.x as f32, p.y as f32);
            }
            pb.close();
        }
    }
}

fn skia_color(color: Color) -> tiny_skia::Color {
    let c = color.sanitized();
    tiny_skia::Color::from_rgba(c.r as f32, c.g as f32, c.b as f32, c.a as f32)
        .unwrap_or(tiny_skia::Color::TRANSPARENT)
}

/// An antialiased solid paint, or `None` for fully transparent colors.
fn solid(color: Color) -> Option<Paint<'static>> {
    let color = color.sanitized();
    if color.a <= 0.0 {
        return None;
    }
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    Some(paint)
}

/// `color` with its alpha scaled by `coverage`, premultiplied.
fn premultiplied(color: Color, coverage: f64) -> Option<PremultipliedColorU8> {
    let a = (color.a * coverage.clamp(0.0, 1.0)).clamp(0.0, 1.0);
    let alpha = (a * 255.0).round() as u8;
    let channel = |v: f64| ((v * a * 255.0).round() as u8).min(alpha);
    PremultipliedColorU8::from_rgba(channel(color.r), channel(color.g), channel(color.b), alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::render::spotlight::{SpotlightParams, SpotlightRenderer};
    use crate::settings::SpotlightShape;

    /// One 8-bit step.
    const STEP: f64 = 1.0 / 255.0;

    fn spotlight(shape: SpotlightShape, blur: f64) -> Canvas {
        let mut canvas = Canvas::new(300, 300).unwrap();
        let frame = SpotlightRenderer::new().paint(
            Size::new(300.0, 300.0),
            &SpotlightParams {
                center: Some(Point::new(150.0, 150.0)),
                radius: 100.0,
                shape,
                dim_color: Color::BLACK,
                dim_opacity: 0.6,
                edge_blur: blur,
            },
        );
        canvas.render(&frame);
        canvas
    }

    fn alpha_at(canvas: &Canvas, dx: f64) -> f64 {
        // Sample along the horizontal axis through the center.
        canvas.sample(Point::new(150.0 + dx, 150.5)).unwrap().a
    }

    #[test]
    fn test_hard_edge_exactly_at_radius() {
        let canvas = spotlight(SpotlightShape::Circle, 0.0);
        assert_eq!(alpha_at(&canvas, 0.5), 0.0);
        assert!(alpha_at(&canvas, 98.5) < STEP * 2.0);
        assert!(alpha_at(&canvas, 101.5) > 0.6 - STEP * 2.0);
        assert!((alpha_at(&canvas, 120.5) - 0.6).abs() < STEP);
    }

    #[test]
    fn test_soft_edge_ramps_between_radii() {
        let canvas = spotlight(SpotlightShape::Circle, 0.5);
        assert_eq!(alpha_at(&canvas, 40.5), 0.0);
        let a60 = alpha_at(&canvas, 60.5);
        let a80 = alpha_at(&canvas, 80.5);
        assert!(a60 > 0.0 && a60 < a80 && a80 < 0.6, "{a60} {a80}");
        assert!((alpha_at(&canvas, 120.5) - 0.6).abs() < STEP);
    }

    #[test]
    fn test_soft_square_bands_rise_outwards() {
        let canvas = spotlight(SpotlightShape::Square, 0.5);
        // Square corners sit on the radius; along the axis its edge is at R/sqrt(2).
        let edge = 100.0 / 2f64.sqrt();
        let near = alpha_at(&canvas, edge * 0.55);
        let far = alpha_at(&canvas, edge * 0.95);
        assert!(near < far, "{near} {far}");
        assert!((alpha_at(&canvas, edge + 20.0) - 0.6).abs() < STEP);
    }

    #[test]
    fn test_rows_are_flipped() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        let mut frame = Frame::new();
        frame.push(PaintOp::FillOutline {
            outline: Outline::Polygon(vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 1.0),
                Point::new(0.0, 1.0),
            ]),
            color: Color::WHITE,
        });
        canvas.render(&frame);
        // Bottom strip in Y-up space is the last row.
        assert_eq!(canvas.pixel(0, 3), Some(Color::WHITE));
        assert_eq!(canvas.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(canvas.sample(Point::new(0.5, 0.5)), Some(Color::WHITE));
        assert_eq!(canvas.sample(Point::new(0.5, 4.5)), None);
    }

    #[test]
    fn test_scale_maps_points_to_pixels() {
        let mut canvas = Canvas::with_scale(8, 8, 2.0).unwrap();
        let mut frame = Frame::new();
        frame.push(PaintOp::FillWithHole {
            rect: Rect::new(0.0, 0.0, 4.0, 1.0),
            hole: None,
            color: Color::WHITE,
        });
        canvas.render(&frame);
        assert_eq!(canvas.pixel(7, 7), Some(Color::WHITE));
        assert_eq!(canvas.pixel(7, 6), Some(Color::WHITE));
        assert_eq!(canvas.pixel(7, 5), Some(Color::TRANSPARENT));
        assert_eq!(canvas.sample(Point::new(3.9, 0.9)), Some(Color::WHITE));
        assert_eq!(canvas.data().len(), 8 * 8 * 4);
    }

    #[test]
    fn test_label_without_font_draws_plate_on_anchor() {
        let mut canvas = Canvas::new(200, 100).unwrap();
        let mut frame = Frame::new();
        frame.push(PaintOp::Text {
            anchor: Point::new(100.0, 40.0),
            text: "Ctrl+A".into(),
            size: 20.0,
            color: Color::WHITE,
        });
        canvas.render(&frame);
        let plate = canvas.sample(Point::new(100.0, 45.0)).unwrap();
        assert!((plate.a - PLATE_ALPHA).abs() < STEP * 2.0);
        assert_eq!(canvas.sample(Point::new(5.0, 5.0)).unwrap().a, 0.0);
    }

    #[test]
    fn test_degenerate_ops_are_skipped() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        let mut frame = Frame::new();
        frame.push(PaintOp::StrokeOutline {
            outline: Outline::Circle {
                center: Point::new(5.0, 5.0),
                radius: f64::NAN,
            },
            width: 2.0,
            color: Color::WHITE,
        });
        frame.push(PaintOp::RadialGradientRing {
            center: Point::new(5.0, 5.0),
            inner_radius: 4.0,
            outer_radius: 4.0,
            inner_color: Color::WHITE,
            outer_color: Color::WHITE,
        });
        frame.push(PaintOp::FillOutline {
            outline: Outline::Polygon(Vec::new()),
            color: Color::WHITE,
        });
        canvas.render(&frame);
        assert!(canvas.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_zero_sized_canvas() {
        assert!(Canvas::new(0, 10).is_none());
        assert!(Canvas::new(10, 0).is_none());
    }

    #[test]
    fn test_bgra_swaps_channels_and_scales() {
        let mut canvas = Canvas::new(1, 1).unwrap();
        let mut frame = Frame::new();
        frame.push(PaintOp::FillWithHole {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            hole: None,
            color: Color::rgba(1.0, 0.0, 0.0, 1.0),
        });
        canvas.render(&frame);

        let mut out = [0u8; 4];
        canvas.write_bgra(&mut out, 1.0);
        assert_eq!(out, [0, 0, 255, 255]);
        canvas.write_bgra(&mut out, 0.5);
        assert_eq!(out, [0, 0, 128, 128]);
        canvas.write_bgra(&mut out, f64::NAN);
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn test_premultiplied_coverage() {
        let px = premultiplied(Color::rgba(1.0, 0.5, 0.0, 1.0), 0.5).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
        assert_eq!(px.green(), 64);
        assert_eq!(premultiplied(Color::WHITE, 0.0).unwrap().alpha(), 0);
    }
}
