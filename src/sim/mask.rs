//! Packed pixel occupancy masks
//!
//! A `BitMask` stores one bit per pixel, 64 pixels per word, row-major.
//! Overlap tests AND whole words together instead of branching per pixel.
//! Padding bits past the right edge of each row are always zero, which lets
//! `row_bits` read past the edge without extra masking.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::LevelError;

/// Raw RGBA track image handed over by the level loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA pixels, `width * height` entries
    pub pixels: Vec<[u8; 4]>,
}

impl TrackImage {
    /// Build an image by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Check dimensions against the pixel buffer
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 || self.height == 0 {
            return Err(LevelError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize;
        if self.pixels.len() != expected {
            return Err(LevelError::PixelCountMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

/// Binary occupancy grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask {
    width: u32,
    height: u32,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl BitMask {
    /// Empty mask of the given size
    pub fn new(width: u32, height: u32) -> Self {
        let words_per_row = (width as usize).div_ceil(64);
        Self {
            width,
            height,
            words_per_row,
            bits: vec![0; words_per_row * height as usize],
        }
    }

    /// Mask with every pixel set
    pub fn filled(width: u32, height: u32) -> Self {
        let mut mask = Self::new(width, height);
        let tail = width % 64;
        for y in 0..height as usize {
            let row = &mut mask.bits[y * mask.words_per_row..(y + 1) * mask.words_per_row];
            row.fill(u64::MAX);
            if tail != 0 {
                if let Some(last) = row.last_mut() {
                    *last = (1u64 << tail) - 1;
                }
            }
        }
        mask
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x as i32, y as i32, true);
                }
            }
        }
        mask
    }

    /// Set every pixel whose colour is within `tolerance` of `color` on all channels
    pub fn from_threshold(image: &TrackImage, color: [u8; 4], tolerance: u8) -> Self {
        let width = image.width;
        Self::from_fn(image.width, image.height, |x, y| {
            let px = image.pixels[(y * width + x) as usize];
            px.iter()
                .zip(color.iter())
                .all(|(a, b)| a.abs_diff(*b) <= tolerance)
        })
    }

    /// Solid rectangle of `length` x `width` rotated to `heading_deg`
    ///
    /// The mask is the axis-aligned bounding box of the rotated rectangle, with
    /// the rectangle centred in it.
    pub fn rotated_rect(length: u32, width: u32, heading_deg: f32) -> Self {
        let (sin, cos) = heading_deg.to_radians().sin_cos();
        let (l, w) = (length as f32, width as f32);
        // Shave float noise so right angles give exact boxes (cos 90° != 0 in f32)
        let bw = (l * cos.abs() + w * sin.abs() - 1e-3).ceil().max(1.0) as u32;
        let bh = (l * sin.abs() + w * cos.abs() - 1e-3).ceil().max(1.0) as u32;
        let (cx, cy) = (bw as f32 / 2.0, bh as f32 / 2.0);
        let (half_l, half_w) = (l / 2.0, w / 2.0);

        Self::from_fn(bw, bh, |x, y| {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            // Rotate into the car's local frame
            let along = dx * cos + dy * sin;
            let across = -dx * sin + dy * cos;
            along.abs() <= half_l && across.abs() <= half_w
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Read a pixel; anything outside the mask is unset
    pub fn get(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let word = self.bits[y as usize * self.words_per_row + x as usize / 64];
        word >> (x as u32 % 64) & 1 == 1
    }

    /// Write a pixel; writes outside the mask are ignored
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = y as usize * self.words_per_row + x as usize / 64;
        let bit = 1u64 << (x as u32 % 64);
        if value {
            self.bits[idx] |= bit;
        } else {
            self.bits[idx] &= !bit;
        }
    }

    /// Number of set pixels
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Mirror left-right
    pub fn flip_x(&self) -> Self {
        let mut out = Self::new(self.width, self.height);
        let last = self.width as i32 - 1;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.get(x, y) {
                    out.set(last - x, y, true);
                }
            }
        }
        out
    }

    /// Mirror top-bottom
    pub fn flip_y(&self) -> Self {
        let mut out = Self::new(self.width, self.height);
        let wpr = self.words_per_row;
        let h = self.height as usize;
        for y in 0..h {
            let src = &self.bits[y * wpr..(y + 1) * wpr];
            let dst_row = h - 1 - y;
            out.bits[dst_row * wpr..(dst_row + 1) * wpr].copy_from_slice(src);
        }
        out
    }

    /// Rasterize a one-pixel-wide line (Bresenham), clipped to the mask
    pub fn draw_line(&mut self, from: IVec2, to: IVec2) {
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (from.x, from.y);

        loop {
            self.set(x, y, true);
            if x == to.x && y == to.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 64 pixels of row `y` starting at column `x` (bit 0 = column `x`)
    ///
    /// Columns outside the mask read as zero.
    fn row_bits(&self, y: i32, x: i32) -> u64 {
        if y < 0 || y >= self.height as i32 || x >= self.width as i32 || x <= -64 {
            return 0;
        }
        let start = y as usize * self.words_per_row;
        let row = &self.bits[start..start + self.words_per_row];
        if x < 0 {
            return row[0] << (-x) as u32;
        }
        let word = x as usize / 64;
        let shift = x as u32 % 64;
        let lo = row[word] >> shift;
        if shift == 0 {
            lo
        } else {
            let hi = row.get(word + 1).copied().unwrap_or(0);
            lo | (hi << (64 - shift))
        }
    }

    /// First pixel set in both masks, with `other` placed at `offset`
    ///
    /// Scans row-major (top row first, then left to right) and returns the
    /// point in this mask's coordinates.
    pub fn overlap(&self, other: &BitMask, offset: IVec2) -> Option<IVec2> {
        let x0 = offset.x.max(0);
        let x1 = (offset.x + other.width as i32).min(self.width as i32);
        let y0 = offset.y.max(0);
        let y1 = (offset.y + other.height as i32).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let first_word = x0 as usize / 64;
        let last_word = (x1 - 1) as usize / 64;
        for y in y0..y1 {
            let row = y as usize * self.words_per_row;
            for w in first_word..=last_word {
                let mine = self.bits[row + w];
                if mine == 0 {
                    continue;
                }
                let base = (w * 64) as i32;
                let hit = mine & other.row_bits(y - offset.y, base - offset.x);
                if hit != 0 {
                    return Some(IVec2::new(base + hit.trailing_zeros() as i32, y));
                }
            }
        }
        None
    }

    /// Number of pixels set in both masks, with `other` placed at `offset`
    pub fn overlap_count(&self, other: &BitMask, offset: IVec2) -> u32 {
        let x0 = offset.x.max(0);
        let x1 = (offset.x + other.width as i32).min(self.width as i32);
        let y0 = offset.y.max(0);
        let y1 = (offset.y + other.height as i32).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }

        let first_word = x0 as usize / 64;
        let last_word = (x1 - 1) as usize / 64;
        let mut total = 0;
        for y in y0..y1 {
            let row = y as usize * self.words_per_row;
            for w in first_word..=last_word {
                let mine = self.bits[row + w];
                if mine != 0 {
                    let base = (w * 64) as i32;
                    total += (mine & other.row_bits(y - offset.y, base - offset.x)).count_ones();
                }
            }
        }
        total
    }

    /// Whether any pixel overlaps
    #[inline]
    pub fn intersects(&self, other: &BitMask, offset: IVec2) -> bool {
        self.overlap(other, offset).is_some()
    }
}

/// Overlap of two masks placed in a shared world space
///
/// Returns the first overlapping point in `a`'s coordinate space. Only the
/// relative offset matters, so translating both operands by the same vector
/// leaves the result unchanged.
pub fn overlaps(a: &BitMask, offset_a: IVec2, b: &BitMask, offset_b: IVec2) -> Option<IVec2> {
    a.overlap(b, offset_b - offset_a)
}

/// Track boundary, pre-built in all four axis-flip combinations
///
/// Built once per level and never mutated during a race.
#[derive(Debug, Clone)]
pub struct BoundaryMask {
    /// Indexed `[flip_x][flip_y]`
    variants: [[BitMask; 2]; 2],
}

impl BoundaryMask {
    /// Classify every pixel of the track image as boundary or track
    pub fn build(image: &TrackImage, boundary_color: [u8; 4], tolerance: u8) -> Self {
        Self::from_mask(BitMask::from_threshold(image, boundary_color, tolerance))
    }

    pub fn from_mask(mask: BitMask) -> Self {
        let flipped_x = mask.flip_x();
        let flipped_y = mask.flip_y();
        let flipped_xy = flipped_x.flip_y();
        Self {
            variants: [[mask, flipped_y], [flipped_x, flipped_xy]],
        }
    }

    /// The unflipped boundary
    #[inline]
    pub fn mask(&self) -> &BitMask {
        &self.variants[0][0]
    }

    /// Boundary mirrored along the requested axes
    #[inline]
    pub fn variant(&self, flip_x: bool, flip_y: bool) -> &BitMask {
        &self.variants[flip_x as usize][flip_y as usize]
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.mask().width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.mask().height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_filled_has_clean_padding() {
        let mask = BitMask::filled(70, 3);
        assert_eq!(mask.count(), 210);
        assert!(!mask.get(70, 0));
    }

    #[test]
    fn test_overlap_reports_first_point() {
        let a = BitMask::filled(100, 100);
        let b = BitMask::filled(10, 10);
        assert_eq!(a.overlap(&b, IVec2::new(95, 40)), Some(IVec2::new(95, 40)));
        assert_eq!(a.overlap(&b, IVec2::new(-5, -5)), Some(IVec2::new(0, 0)));
        assert_eq!(a.overlap(&b, IVec2::new(100, 0)), None);
        assert_eq!(a.overlap(&b, IVec2::new(-10, 0)), None);
        assert_eq!(a.overlap_count(&b, IVec2::new(95, 40)), 50);
        assert_eq!(a.overlap_count(&b, IVec2::new(100, 0)), 0);
    }

    #[test]
    fn test_overlap_across_word_boundary() {
        let mut a = BitMask::new(200, 4);
        a.set(130, 2, true);
        let b = BitMask::filled(3, 3);
        assert_eq!(a.overlap(&b, IVec2::new(129, 1)), Some(IVec2::new(130, 2)));
        assert_eq!(a.overlap(&b, IVec2::new(131, 1)), None);
        // Negative column offset inside the other mask
        let mut c = BitMask::new(80, 1);
        c.set(70, 0, true);
        let mut d = BitMask::new(10, 1);
        d.set(8, 0, true);
        assert_eq!(c.overlap(&d, IVec2::new(62, 0)), Some(IVec2::new(70, 0)));
        assert_eq!(d.overlap(&c, IVec2::new(-62, 0)), Some(IVec2::new(8, 0)));
    }

    #[test]
    fn test_flips() {
        let mut mask = BitMask::new(5, 3);
        mask.set(0, 0, true);
        assert!(mask.flip_x().get(4, 0));
        assert!(mask.flip_y().get(0, 2));
        let boundary = BoundaryMask::from_mask(mask);
        assert!(boundary.variant(true, true).get(4, 2));
        assert_eq!(boundary.variant(true, true).count(), 1);
    }

    #[test]
    fn test_threshold_build() {
        let red = [255, 0, 0, 255];
        let image = TrackImage::from_fn(4, 2, |x, _| if x == 0 { red } else { [250, 0, 0, 255] });
        assert_eq!(BitMask::from_threshold(&image, red, 0).count(), 2);
        assert_eq!(BitMask::from_threshold(&image, red, 5).count(), 8);
    }

    #[test]
    fn test_rotated_rect_dimensions() {
        let flat = BitMask::rotated_rect(40, 20, 0.0);
        assert_eq!((flat.width(), flat.height()), (40, 20));
        assert_eq!(flat.count(), 800);

        let upright = BitMask::rotated_rect(40, 20, 90.0);
        assert_eq!((upright.width(), upright.height()), (20, 40));

        let diagonal = BitMask::rotated_rect(40, 20, 45.0);
        assert!(diagonal.width() > 40);
        // Corners of the bounding box are empty
        assert!(!diagonal.get(0, 0));
    }

    #[test]
    fn test_draw_line_endpoints() {
        let mut mask = BitMask::new(10, 10);
        mask.draw_line(IVec2::ZERO, IVec2::new(9, 4));
        assert!(mask.get(0, 0));
        assert!(mask.get(9, 4));
        assert_eq!(mask.count(), 10);
    }

    #[test]
    fn test_image_validation() {
        let image = TrackImage {
            width: 2,
            height: 2,
            pixels: vec![[0; 4]; 3],
        };
        assert!(matches!(
            image.validate(),
            Err(LevelError::PixelCountMismatch { expected: 4, actual: 3 })
        ));
    }

    proptest! {
        #[test]
        fn prop_overlap_translation_invariant(
            ax in -50i32..150, ay in -50i32..150,
            bx in -50i32..150, by in -50i32..150,
            tx in -300i32..300, ty in -300i32..300,
        ) {
            let a = BitMask::rotated_rect(40, 20, 30.0);
            let b = BitMask::rotated_rect(30, 30, 75.0);
            let t = IVec2::new(tx, ty);
            let before = overlaps(&a, IVec2::new(ax, ay), &b, IVec2::new(bx, by));
            let after = overlaps(&a, IVec2::new(ax, ay) + t, &b, IVec2::new(bx, by) + t);
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_overlap_matches_per_pixel(ox in -40i32..80, oy in -40i32..80) {
            let a = BitMask::rotated_rect(70, 30, 20.0);
            let b = BitMask::rotated_rect(25, 12, 110.0);
            let fast = a.overlap(&b, IVec2::new(ox, oy));
            let mut slow = None;
            'scan: for y in 0..a.height() as i32 {
                for x in 0..a.width() as i32 {
                    if a.get(x, y) && b.get(x - ox, y - oy) {
                        slow = Some(IVec2::new(x, y));
                        break 'scan;
                    }
                }
            }
            prop_assert_eq!(fast, slow);
        }
    }
}
