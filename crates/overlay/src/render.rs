//! Overlay rendering in normalized device coordinates

use capture_x11::{FrameBuffer, Rect, BYTES_PER_PIXEL};

/// Straight-alpha color, channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Axis-aligned quad in normalized coordinates (`top > bottom`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Quad {
    /// The whole surface
    pub const FULL: Quad = Quad {
        left: -1.0,
        top: 1.0,
        right: 1.0,
        bottom: -1.0,
    };

    /// Quad covering `rect` of a `width x height` pixel surface.
    pub fn from_rect(rect: &Rect, width: u32, height: u32) -> Self {
        let (left, top) = to_ndc(rect.x as f32, rect.y as f32, width, height);
        let (right, bottom) = to_ndc(rect.right() as f32, rect.bottom() as f32, width, height);
        Self { left, top, right, bottom }
    }
}

/// Map device pixel (`px`, `py`) to normalized coordinates.
///
/// Pixel rows grow downward while normalized Y grows upward, so Y flips.
pub fn to_ndc(px: f32, py: f32, width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width as f32, height as f32);
    (px / w * 2.0 - 1.0, (h - py) / h * 2.0 - 1.0)
}

/// Inverse of `to_ndc`.
pub fn from_ndc(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width as f32, height as f32);
    ((x + 1.0) / 2.0 * w, h - (y + 1.0) / 2.0 * h)
}

/// Drawing capability the overlay needs from a backend
pub trait RenderTarget {
    fn clear(&mut self, color: Color);

    /// Draw `image` stretched over `quad`.
    fn draw_image(&mut self, quad: Quad, image: &FrameBuffer);

    /// Alpha-blend a solid color over `quad`.
    fn fill_quad(&mut self, quad: Quad, color: Color);
}

const CLEAR_COLOR: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
const SELECTION_FILL: Color = Color::rgba(0.2, 0.5, 1.0, 0.2);
const SELECTION_BORDER: Color = Color::rgba(0.2, 0.6, 1.0, 1.0);
const BORDER_THICKNESS: u32 = 2;

/// Draws the frozen capture plus the live selection each frame
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, target: &mut impl RenderTarget, image: &FrameBuffer, selection: Option<Rect>) {
        target.clear(CLEAR_COLOR);
        target.draw_image(Quad::FULL, image);

        if let Some(rect) = selection.filter(|r| !r.is_empty()) {
            let (w, h) = (image.width(), image.height());
            target.fill_quad(Quad::from_rect(&rect, w, h), SELECTION_FILL);
            for edge in border_edges(&rect, BORDER_THICKNESS) {
                target.fill_quad(Quad::from_rect(&edge, w, h), SELECTION_BORDER);
            }
        }
    }
}

/// Top, bottom, left and right strips of `rect`, at most `thickness` wide.
fn border_edges(rect: &Rect, thickness: u32) -> [Rect; 4] {
    let tx = thickness.min(rect.width);
    let ty = thickness.min(rect.height);
    [
        Rect::new(rect.x, rect.y, rect.width, ty),
        Rect::new(rect.x, rect.bottom() - ty as i32, rect.width, ty),
        Rect::new(rect.x, rect.y, tx, rect.height),
        Rect::new(rect.right() - tx as i32, rect.y, tx, rect.height),
    ]
}

/// CPU render target producing a BGRX frame for the window to present
pub struct RasterTarget {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed BGRX rows
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// `[B, G, R]` at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let o = self.offset(x as usize, y as usize);
        [self.pixels[o], self.pixels[o + 1], self.pixels[o + 2]]
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width as usize + x) * BYTES_PER_PIXEL
    }

    /// Pixel span `[x0, x1) x [y0, y1)` covered by `quad`, clipped to the surface.
    fn span(&self, quad: Quad) -> (usize, usize, usize, usize) {
        let (left, top) = from_ndc(quad.left, quad.top, self.width, self.height);
        let (right, bottom) = from_ndc(quad.right, quad.bottom, self.width, self.height);
        let clip_x = |v: f32| v.round().clamp(0.0, self.width as f32) as usize;
        let clip_y = |v: f32| v.round().clamp(0.0, self.height as f32) as usize;
        (clip_x(left), clip_y(top), clip_x(right), clip_y(bottom))
    }
}

impl RenderTarget for RasterTarget {
    fn clear(&mut self, color: Color) {
        let bgrx = [to_byte(color.b), to_byte(color.g), to_byte(color.r), 0xFF];
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&bgrx);
        }
    }

    fn draw_image(&mut self, quad: Quad, image: &FrameBuffer) {
        let (x0, y0, x1, y1) = self.span(quad);
        if x1 <= x0 || y1 <= y0 || image.is_destroyed() {
            return;
        }
        let (span_w, span_h) = (x1 - x0, y1 - y0);
        let row_bytes = span_w * BYTES_PER_PIXEL;

        // 1:1 blit; the stored layout is already B, G, R, A
        if span_w == image.width() as usize && span_h == image.height() as usize {
            let src = image.bytes();
            for y in 0..span_h {
                let s = y * image.stride();
                let d = self.offset(x0, y0 + y);
                self.pixels[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
            }
            return;
        }

        // nearest-neighbour scaling
        for y in 0..span_h {
            let sy = (y * image.height() as usize / span_h) as u32;
            for x in 0..span_w {
                let sx = (x * image.width() as usize / span_w) as u32;
                let px = image.pixel_at(sx, sy);
                let d = self.offset(x0 + x, y0 + y);
                self.pixels[d..d + 4].copy_from_slice(&[px.b, px.g, px.r, 0xFF]);
            }
        }
    }

    fn fill_quad(&mut self, quad: Quad, color: Color) {
        let (x0, y0, x1, y1) = self.span(quad);
        let a = color.a.clamp(0.0, 1.0);
        let src = [color.b, color.g, color.r];

        for y in y0..y1 {
            for x in x0..x1 {
                let o = self.offset(x, y);
                for (c, s) in src.iter().enumerate() {
                    let d = f32::from(self.pixels[o + c]) / 255.0;
                    self.pixels[o + c] = to_byte(s * a + d * (1.0 - a));
                }
            }
        }
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, bgra: [u8; 4]) -> FrameBuffer {
        let data = bgra.repeat(width as usize * height as usize);
        FrameBuffer::from_raw(width, height, width as usize * 4, data)
    }

    #[test]
    fn test_to_ndc_corners() {
        for (w, h) in [(1, 1), (1920, 1080), (7, 3)] {
            assert_eq!(to_ndc(0.0, 0.0, w, h), (-1.0, 1.0));
            assert_eq!(to_ndc(w as f32, h as f32, w, h), (1.0, -1.0));
        }
    }

    #[test]
    fn test_to_ndc_center() {
        assert_eq!(to_ndc(960.0, 540.0, 1920, 1080), (0.0, 0.0));
    }

    #[test]
    fn test_from_ndc_inverts_to_ndc() {
        let (x, y) = to_ndc(20.0, 50.0, 200, 100);
        let (px, py) = from_ndc(x, y, 200, 100);
        assert!((px - 20.0).abs() < 1e-3);
        assert!((py - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_quad_from_rect() {
        let quad = Quad::from_rect(&Rect::new(0, 0, 100, 50), 200, 100);
        assert_eq!(quad, Quad { left: -1.0, top: 1.0, right: 0.0, bottom: 0.0 });
    }

    #[test]
    fn test_border_edges_thin_rect() {
        let edges = border_edges(&Rect::new(10, 10, 1, 5), 2);
        assert_eq!(edges[2], Rect::new(10, 10, 1, 5));
        assert_eq!(edges[3], Rect::new(10, 10, 1, 5));
        assert_eq!(edges[1], Rect::new(10, 13, 1, 2));
    }

    #[test]
    fn test_render_without_selection_shows_image() {
        let image = solid(8, 6, [10, 20, 30, 255]);
        let mut target = RasterTarget::new(8, 6);
        OverlayRenderer::new().render(&mut target, &image, None);

        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(target.pixel(x, y), [10, 20, 30]);
            }
        }
    }

    #[test]
    fn test_render_selection_border_and_fill() {
        let image = solid(40, 30, [0, 0, 0, 255]);
        let mut target = RasterTarget::new(40, 30);
        OverlayRenderer::new().render(&mut target, &image, Some(Rect::new(10, 5, 20, 15)));

        // outside untouched
        assert_eq!(target.pixel(2, 2), [0, 0, 0]);
        assert_eq!(target.pixel(30, 5), [0, 0, 0]);
        // border is opaque highlight
        assert_eq!(target.pixel(10, 5), [255, 153, 51]);
        assert_eq!(target.pixel(29, 19), [255, 153, 51]);
        // interior is tinted, not opaque
        let inner = target.pixel(20, 12);
        assert!(inner[0] > 0 && inner[0] < 255);
    }

    #[test]
    fn test_draw_image_scales_to_quad() {
        let image = solid(2, 2, [1, 2, 3, 255]);
        let mut target = RasterTarget::new(4, 4);
        target.clear(Color::rgba(0.0, 0.0, 0.0, 1.0));
        target.draw_image(Quad::FULL, &image);
        assert_eq!(target.pixel(3, 3), [1, 2, 3]);
    }
}
