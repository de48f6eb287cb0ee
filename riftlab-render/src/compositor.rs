use riftlab_core::{Rgb, StimulusMask};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use crate::surface::Placement;

/// CPU compositor over an offscreen pixmap. Rasterizes the shared stimulus
/// mask with a per-call tint, plus the fixation cross and probe dot. The
/// app's presentation host copies the finished canvas into the swapchain.
pub struct Compositor {
    width: u32,
    height: u32,
    canvas: Pixmap,
    background: [u8; 3],
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

impl Compositor {
    pub fn new(width: u32, height: u32, background: Rgb) -> Option<Self> {
        let mut canvas = Pixmap::new(width, height)?;
        let background = [
            to_u8(background[0]),
            to_u8(background[1]),
            to_u8(background[2]),
        ];
        canvas.fill(Color::from_rgba8(
            background[0],
            background[1],
            background[2],
            255,
        ));
        Some(Self {
            width,
            height,
            canvas,
            background,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> Placement {
        Placement {
            x: self.width as f32 / 2.0,
            y: self.height as f32 / 2.0,
        }
    }

    pub fn clear(&mut self) {
        self.canvas.fill(Color::from_rgba8(
            self.background[0],
            self.background[1],
            self.background[2],
            255,
        ));
    }

    /// Premultiplied source-over blit of the coverage field, tinted per
    /// call. The canvas stays opaque so downstream copies are plain memcpy.
    pub fn blit_mask(&mut self, mask: &StimulusMask, tint: Rgb, placement: Placement) {
        let size = mask.size() as i32;
        let x0 = (placement.x - size as f32 * 0.5).floor() as i32;
        let y0 = (placement.y - size as f32 * 0.5).floor() as i32;

        let dst_x_start = x0.max(0);
        let dst_y_start = y0.max(0);
        let dst_x_end = (x0 + size).min(self.width as i32);
        let dst_y_end = (y0 + size).min(self.height as i32);
        if dst_x_end <= dst_x_start || dst_y_end <= dst_y_start {
            return;
        }

        let src_x_start = (dst_x_start - x0) as u32;
        let src_y_start = (dst_y_start - y0) as u32;
        let rows = (dst_y_end - dst_y_start) as u32;
        let cols = (dst_x_end - dst_x_start) as u32;

        let tint = [to_u8(tint[0]) as u32, to_u8(tint[1]) as u32, to_u8(tint[2]) as u32];
        let stride = self.width as usize;
        let dst = self.canvas.data_mut();

        for row in 0..rows {
            let sy = src_y_start + row;
            let dy = dst_y_start as usize + row as usize;
            for col in 0..cols {
                let cov = mask.at(src_x_start + col, sy);
                if cov <= 0.0 {
                    continue;
                }
                let sa = (cov * 255.0 + 0.5) as u32;
                let inv = 255 - sa;
                let idx = (dy * stride + dst_x_start as usize + col as usize) * 4;

                // Source is premultiplied by coverage; destination is opaque.
                for c in 0..3 {
                    let s = (tint[c] * sa + 127) / 255;
                    let d = dst[idx + c] as u32;
                    dst[idx + c] = (s + (d * inv + 127) / 255) as u8;
                }
                dst[idx + 3] = 255;
            }
        }
    }

    pub fn draw_fixation(&mut self, placement: Placement) {
        let arm = 20.0f32;
        let thickness = 2.0f32;

        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(Color::from_rgba8(255, 255, 255, 255));

        if let Some(h) = Rect::from_xywh(
            placement.x - arm,
            placement.y - thickness * 0.5,
            arm * 2.0,
            thickness,
        ) {
            self.canvas.fill_rect(h, &paint, Transform::identity(), None);
        }
        if let Some(v) = Rect::from_xywh(
            placement.x - thickness * 0.5,
            placement.y - arm,
            thickness,
            arm * 2.0,
        ) {
            self.canvas.fill_rect(v, &paint, Transform::identity(), None);
        }
    }

    pub fn draw_dot(&mut self, placement: Placement, radius: f32, color: Rgb) {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(Color::from_rgba8(
            to_u8(color[0]),
            to_u8(color[1]),
            to_u8(color[2]),
            255,
        ));

        let mut pb = PathBuilder::new();
        pb.push_circle(placement.x, placement.y, radius);
        if let Some(path) = pb.finish() {
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    pub fn data(&self) -> &[u8] {
        self.canvas.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(c: &Compositor, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * c.width() + x) * 4) as usize;
        let d = c.data();
        [d[idx], d[idx + 1], d[idx + 2], d[idx + 3]]
    }

    #[test]
    fn clear_fills_background() {
        let c = Compositor::new(16, 16, [0.5, 0.5, 0.5]).unwrap();
        let p = pixel(&c, 8, 8);
        assert_eq!(p[3], 255);
        assert!((p[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn tinted_blit_reaches_tint_at_full_coverage() {
        let mut c = Compositor::new(64, 64, [0.0, 0.0, 0.0]).unwrap();
        let mask = StimulusMask::square(16).unwrap();
        c.blit_mask(&mask, [1.0, 0.0, 0.5], Placement { x: 32.0, y: 32.0 });

        let p = pixel(&c, 32, 32);
        assert_eq!(p[0], 255);
        assert_eq!(p[1], 0);
        assert!((p[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn blit_clips_at_canvas_edges() {
        let mut c = Compositor::new(32, 32, [0.0, 0.0, 0.0]).unwrap();
        let mask = StimulusMask::square(16).unwrap();
        // Centered off the left edge; must not panic and must still paint
        // the on-canvas part.
        c.blit_mask(&mask, [1.0, 1.0, 1.0], Placement { x: 0.0, y: 16.0 });
        assert_eq!(pixel(&c, 0, 16)[0], 255);
        assert_eq!(pixel(&c, 20, 16)[0], 0);
    }

    #[test]
    fn gaussian_edge_blends_toward_background() {
        let mut c = Compositor::new(64, 64, [0.0, 0.0, 0.0]).unwrap();
        let mask = StimulusMask::circular(16, 0.3).unwrap();
        c.blit_mask(&mask, [1.0, 1.0, 1.0], Placement { x: 32.0, y: 32.0 });

        let center = pixel(&c, 32, 32)[0];
        let edge = pixel(&c, 32 + 14, 32)[0];
        let outside = pixel(&c, 32 + 20, 32)[0];
        assert!(center > 250);
        assert!(edge < center);
        assert_eq!(outside, 0);
    }
}
