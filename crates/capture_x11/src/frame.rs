//! Captured framebuffer and CPU-side cropping

use crate::Rect;

/// Stored pixels are 4 bytes each, `[B, G, R, A]` as delivered by the server.
pub const BYTES_PER_PIXEL: usize = 4;

/// One pixel in output channel order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Raw pixel snapshot of the screen.
///
/// Storage is always exactly `stride * height` bytes. A crop replaces the
/// storage with a tightly packed copy, so a buffer never aliases another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl FrameBuffer {
    /// Take ownership of raw rows.
    ///
    /// # Panics
    ///
    /// Panics if the geometry does not describe `data` exactly.
    pub fn from_raw(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "framebuffer must not be empty");
        assert!(
            stride >= width as usize * BYTES_PER_PIXEL,
            "stride {} too small for width {}",
            stride,
            width
        );
        assert_eq!(data.len(), stride * height as usize, "storage size mismatch");

        Self { data, width, height, stride }
    }

    /// Force every alpha byte to fully opaque.
    pub fn normalize_alpha(&mut self) {
        if self.is_destroyed() {
            return;
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        for row in self.data.chunks_exact_mut(self.stride) {
            for px in row[..row_bytes].chunks_exact_mut(BYTES_PER_PIXEL) {
                px[3] = 255;
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including any padding.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whole-buffer rectangle at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn is_destroyed(&self) -> bool {
        self.data.is_empty()
    }

    /// Read pixel number `index` in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside `[0, width * height)`.
    pub fn get_pixel(&self, index: usize) -> Pixel {
        assert!(
            index < self.pixel_count(),
            "pixel index {} out of range for {}x{}",
            index,
            self.width,
            self.height
        );
        let x = index % self.width as usize;
        let y = index / self.width as usize;
        self.read(x, y)
    }

    /// Read the pixel at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the buffer.
    pub fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) out of range", x, y);
        self.read(x as usize, y as usize)
    }

    fn read(&self, x: usize, y: usize) -> Pixel {
        let offset = y * self.stride + x * BYTES_PER_PIXEL;
        let px = &self.data[offset..offset + BYTES_PER_PIXEL];
        Pixel { r: px[2], g: px[1], b: px[0] }
    }

    /// Crop in place to `width x height` starting at (`from_x`, `from_y`).
    ///
    /// Rows are copied one by one into a freshly allocated, tightly packed
    /// buffer which then replaces the old storage.
    ///
    /// # Panics
    ///
    /// Out-of-bounds or empty rectangles are a caller bug and abort.
    pub fn crop(&mut self, from_x: u32, from_y: u32, width: u32, height: u32) {
        assert!(width > 0, "crop width must be positive");
        assert!(height > 0, "crop height must be positive");
        assert!(from_x + width <= self.width, "crop exceeds buffer width");
        assert!(from_y + height <= self.height, "crop exceeds buffer height");

        let row_bytes = width as usize * BYTES_PER_PIXEL;
        let mut cropped = Vec::with_capacity(row_bytes * height as usize);

        for y in 0..height as usize {
            let src_offset = (from_y as usize + y) * self.stride + from_x as usize * BYTES_PER_PIXEL;
            cropped.extend_from_slice(&self.data[src_offset..src_offset + row_bytes]);
        }

        self.data = cropped;
        self.width = width;
        self.height = height;
        self.stride = row_bytes;
    }

    /// Crop to a rectangle in buffer coordinates.
    ///
    /// # Panics
    ///
    /// Panics on negative origin or the `crop` preconditions.
    pub fn crop_rect(&mut self, rect: &Rect) {
        assert!(rect.x >= 0 && rect.y >= 0, "crop origin must not be negative");
        self.crop(rect.x as u32, rect.y as u32, rect.width, rect.height);
    }

    /// Tightly packed `R, G, B` rows for the encoders.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        if self.is_destroyed() {
            return rgb;
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        for row in self.data.chunks_exact(self.stride) {
            for px in row[..row_bytes].chunks_exact(BYTES_PER_PIXEL) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
        }
        rgb
    }

    /// Release the pixel storage now. Calling it again does nothing.
    pub fn destroy(&mut self) {
        self.data = Vec::new();
        self.width = 0;
        self.height = 0;
        self.stride = 0;
    }
}
