use riftlab_core::{DeviceError, Rgb, Side, StimulusMask};

/// Where a draw command lands, as the center of the drawn field in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

/// What the display reported back for one presented frame.
#[derive(Debug, Clone, Copy)]
pub struct PresentInfo {
    /// Actual presentation instant, nanoseconds on the session clock.
    pub timestamp_ns: u64,
    /// Host-side hint that the previous swap missed its blank. Advisory;
    /// the scheduler's own deadline comparison is authoritative.
    pub missed_hint: bool,
}

/// The display seam. The frame scheduler drives presentation exclusively
/// through this trait; tests substitute a simulated host.
pub trait PresentationHost {
    /// Clear the back buffer to the session background.
    fn clear(&mut self) -> Result<(), DeviceError>;

    /// Draw the shared mask at `placement`, multiplied by `tint`. The mask
    /// is referenced, never copied, and never carries color of its own.
    fn draw(
        &mut self,
        placement: Placement,
        mask: &StimulusMask,
        tint: Rgb,
    ) -> Result<(), DeviceError>;

    fn draw_fixation(&mut self) -> Result<(), DeviceError>;

    fn draw_probe(&mut self, placement: Placement) -> Result<(), DeviceError>;

    /// Block until the next vertical blank and report when the frame
    /// actually became visible.
    fn present(&mut self) -> Result<PresentInfo, DeviceError>;

    /// Placement of one side's stimulus field.
    fn placement(&self, side: Side) -> Placement;
}
