use async_trait::async_trait;

use crate::OpenRgbResult;
use crate::device::color::Color;
use crate::device::mode::ModeData;

/// Hardware side of a controller, implemented by device drivers.
///
/// Methods are invoked from the controller's worker with the controller
/// writer lock held; implementations see one call at a time. Errors are
/// caught at the worker boundary and surface as a single failed update, so a
/// failing device never poisons other controllers.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Pushes the whole color buffer to the device.
    async fn update_leds(&mut self, colors: &[Color]) -> OpenRgbResult<()>;

    /// Pushes one zone's colors to the device.
    async fn update_zone_leds(&mut self, zone: usize, colors: &[Color]) -> OpenRgbResult<()>;

    /// Pushes a single LED's color to the device.
    async fn update_single_led(&mut self, led: usize, color: Color) -> OpenRgbResult<()>;

    /// Applies the given mode on the device.
    async fn update_mode(&mut self, mode: &ModeData) -> OpenRgbResult<()>;

    /// Stores the given mode in device flash.
    ///
    /// Devices without onboard storage fall back to applying the mode.
    async fn save_mode(&mut self, mode: &ModeData) -> OpenRgbResult<()> {
        self.update_mode(mode).await
    }

    /// Reconfigures the device for a new zone size.
    async fn resize_zone(&mut self, zone: usize, new_size: usize) -> OpenRgbResult<()>;
}
