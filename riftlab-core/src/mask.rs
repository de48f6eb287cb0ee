use crate::error::SetupError;

/// Shared 2D coverage field for one stimulus shape, built once per session
/// and referenced read-only by every draw call. Color is never baked in;
/// it arrives as a per-call multiplicative tint.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusMask {
    size: u32,
    coverage: Vec<f32>,
}

impl StimulusMask {
    /// Soft-edged disc: `exp(-r^2 / (2 sigma^2))` for normalized radius
    /// r <= 1, hard zero outside the nominal radius.
    pub fn circular(radius_px: u32, edge_sigma: f32) -> Result<Self, SetupError> {
        if radius_px == 0 {
            return Err(SetupError::InvalidMaskSize(radius_px));
        }
        if !edge_sigma.is_finite() || edge_sigma <= 0.0 {
            return Err(SetupError::InvalidEdgeSigma(edge_sigma));
        }

        let size = radius_px * 2;
        let radius = radius_px as f32;
        let mut coverage = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = (x as f32 + 0.5 - radius) / radius;
                let dy = (y as f32 + 0.5 - radius) / radius;
                let r2 = dx * dx + dy * dy;
                let value = if r2 <= 1.0 {
                    (-r2 / (2.0 * edge_sigma * edge_sigma)).exp()
                } else {
                    0.0
                };
                coverage.push(value);
            }
        }
        Ok(Self { size, coverage })
    }

    /// Hard-edged square of full coverage.
    pub fn square(size_px: u32) -> Result<Self, SetupError> {
        if size_px == 0 {
            return Err(SetupError::InvalidMaskSize(size_px));
        }
        Ok(Self {
            size: size_px,
            coverage: vec![1.0; (size_px * size_px) as usize],
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn coverage(&self) -> &[f32] {
        &self.coverage
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.size + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_peaks_at_center_and_cuts_off_at_radius() {
        let mask = StimulusMask::circular(32, 0.3).unwrap();
        assert_eq!(mask.size(), 64);

        let center = mask.at(32, 32);
        assert!(center > 0.99, "center coverage {center}");

        // Corners lie outside the nominal radius.
        assert_eq!(mask.at(0, 0), 0.0);
        assert_eq!(mask.at(63, 63), 0.0);

        // Coverage is monotone along the horizontal from the center.
        let mut prev = center;
        for x in 33..64 {
            let v = mask.at(x, 32);
            assert!(v <= prev + 1e-6);
            prev = v;
        }
    }

    #[test]
    fn circular_is_deterministic() {
        let a = StimulusMask::circular(16, 0.2).unwrap();
        let b = StimulusMask::circular(16, 0.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn square_is_full_coverage() {
        let mask = StimulusMask::square(8).unwrap();
        assert_eq!(mask.size(), 8);
        assert!(mask.coverage().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(StimulusMask::circular(0, 0.2).is_err());
        assert!(StimulusMask::circular(16, 0.0).is_err());
        assert!(StimulusMask::circular(16, -1.0).is_err());
        assert!(StimulusMask::square(0).is_err());
    }
}
