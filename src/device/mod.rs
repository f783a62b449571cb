//! Device abstraction layer: the data model of an RGB controller and the
//! runtime wrapper that ties it to a hardware backend.

mod backend;
mod callback;
mod color;
mod controller;
mod device_type;
mod json;
mod led;
mod mode;
mod segment;
mod zone;

pub use {
    backend::*, callback::*, color::*, controller::*, device_type::*, led::*, mode::*, segment::*,
    zone::*,
};

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::OpenRgbResult;
use crate::protocol::WriteMessage;

/// Why a controller update callback fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// LED colors were pushed to the device.
    UpdateLeds,
    /// A mode was applied.
    UpdateMode,
    /// A mode was saved to device flash.
    SaveMode,
    /// A zone was resized.
    ResizeZone,
    /// A zone's segments were cleared.
    ClearSegments,
    /// A segment was added to a zone.
    AddSegment,
    /// The controller was hidden.
    Hidden,
    /// The controller was unhidden.
    Unhidden,
}

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(0);

struct ControllerState {
    data: ControllerData,
    backend: Box<dyn DeviceBackend>,
}

/// A live RGB controller: the data model plus its hardware backend, guarded
/// by one readers-writer lock.
///
/// Reads (metadata queries, encoding) take the reader side and may observe
/// writes in flight. Mutations take the writer side, touch the hardware with
/// the lock held, then fan out to the registered update callbacks.
pub struct Controller {
    id: u64,
    state: RwLock<ControllerState>,
    callbacks: CallbackRegistry<UpdateReason>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller").field("id", &self.id).finish()
    }
}

impl Controller {
    /// Wraps a validated controller model and its hardware backend.
    pub fn new(
        data: ControllerData,
        backend: Box<dyn DeviceBackend>,
    ) -> OpenRgbResult<std::sync::Arc<Self>> {
        data.validate().map_err(crate::OpenRgbError::Invariant)?;
        Ok(std::sync::Arc::new(Self {
            id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(ControllerState { data, backend }),
            callbacks: CallbackRegistry::new(),
        }))
    }

    /// Process-unique identity of this controller, stable across registry
    /// index shifts.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read access to the controller model.
    pub async fn data(&self) -> RwLockReadGuard<'_, ControllerData> {
        RwLockReadGuard::map(self.state.read().await, |state| &state.data)
    }

    /// Returns the controller flags.
    pub async fn flags(&self) -> flagset::FlagSet<ControllerFlags> {
        self.state.read().await.data.flags()
    }

    /// Encodes the controller description at the given protocol version.
    pub async fn encode(&self, protocol_version: u32) -> OpenRgbResult<Vec<u8>> {
        let state = self.state.read().await;
        let mut buf = WriteMessage::with_capacity(protocol_version, 256);
        buf.write_value(&state.data)?;
        Ok(buf.into_bytes())
    }

    /// Registers an update observer; fired after every applied mutation.
    pub fn register_update_callback(
        &self,
        callback: impl Fn(&UpdateReason) + Send + Sync + 'static,
    ) -> CallbackToken {
        self.callbacks.register(callback)
    }

    /// Unregisters an update observer.
    pub fn unregister_update_callback(&self, token: CallbackToken) -> bool {
        self.callbacks.unregister(token)
    }

    /// Paints the whole color buffer and pushes it to the device.
    pub async fn update_leds(&self, colors: &[Color]) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.set_colors(colors);
            backend.update_leds(data.colors()).await?;
        }
        self.callbacks.signal(&UpdateReason::UpdateLeds);
        Ok(())
    }

    /// Paints one zone and pushes it to the device.
    pub async fn update_zone_leds(&self, zone: usize, colors: &[Color]) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.set_zone_colors(zone, colors)?;
            backend.update_zone_leds(zone, data.zone_colors(zone)?).await?;
        }
        self.callbacks.signal(&UpdateReason::UpdateLeds);
        Ok(())
    }

    /// Paints a single LED and pushes it to the device.
    pub async fn update_single_led(&self, led: usize, color: Color) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.set_color(led, color)?;
            backend.update_single_led(led, color).await?;
        }
        self.callbacks.signal(&UpdateReason::UpdateLeds);
        Ok(())
    }

    /// Replaces a mode, makes it active and applies it on the device.
    pub async fn update_mode(&self, mode_idx: usize, mode: ModeData) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.apply_mode(mode_idx, mode)?;
            backend.update_mode(&data.modes()[mode_idx]).await?;
        }
        self.callbacks.signal(&UpdateReason::UpdateMode);
        Ok(())
    }

    /// Replaces a mode, makes it active and saves it to device flash.
    pub async fn save_mode(&self, mode_idx: usize, mode: ModeData) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.apply_mode(mode_idx, mode)?;
            backend.save_mode(&data.modes()[mode_idx]).await?;
        }
        self.callbacks.signal(&UpdateReason::SaveMode);
        Ok(())
    }

    /// Switches to the "Direct"/"Custom" mode if the device has one; keeps
    /// the current mode otherwise. Does not touch the hardware.
    pub async fn set_custom_mode(&self) -> Option<usize> {
        self.state.write().await.data.set_custom_mode()
    }

    /// Resizes a zone on the model and the device.
    pub async fn resize_zone(&self, zone: usize, new_size: usize) -> OpenRgbResult<()> {
        {
            let mut guard = self.state.write().await;
            let ControllerState { data, backend } = &mut *guard;
            data.resize_zone(zone, new_size)?;
            backend.resize_zone(zone, new_size).await?;
        }
        self.callbacks.signal(&UpdateReason::ResizeZone);
        Ok(())
    }

    /// Appends a user-defined segment to a zone.
    pub async fn add_segment(&self, zone: usize, segment: SegmentData) -> OpenRgbResult<()> {
        self.state.write().await.data.add_segment(zone, segment)?;
        self.callbacks.signal(&UpdateReason::AddSegment);
        Ok(())
    }

    /// Removes every segment of a zone.
    pub async fn clear_segments(&self, zone: usize) -> OpenRgbResult<()> {
        self.state.write().await.data.clear_segments(zone)?;
        self.callbacks.signal(&UpdateReason::ClearSegments);
        Ok(())
    }

    /// Sets or clears the hidden flag, signalling observers on change.
    pub async fn set_hidden(&self, hidden: bool) {
        let changed = self.state.write().await.data.set_hidden(hidden);
        if changed {
            let reason = match hidden {
                true => UpdateReason::Hidden,
                false => UpdateReason::Unhidden,
            };
            self.callbacks.signal(&reason);
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio_test::{assert_err, assert_ok};

    use super::testing::{RecordingBackend, sample_controller, sample_data};
    use super::*;

    #[tokio::test]
    async fn test_update_leds_applies_and_signals() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let reasons = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let reasons2 = Arc::clone(&reasons);
        controller.register_update_callback(move |reason| reasons2.lock().push(*reason));

        let colors = vec![Color { r: 0, g: 255, b: 0 }; 16];
        controller.update_leds(&colors).await?;

        assert_eq!(backend.last_colors.lock().as_slice(), &colors[..]);
        assert_eq!(reasons.lock().as_slice(), &[UpdateReason::UpdateLeds]);
        Ok(())
    }

    #[tokio::test]
    async fn test_backend_error_surfaces_once() {
        let backend = RecordingBackend {
            fail: true,
            ..Default::default()
        };
        let controller = Controller::new(sample_data(), Box::new(backend)).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        controller.register_update_callback(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        let colors = vec![Color { r: 1, g: 1, b: 1 }; 16];
        assert_err!(controller.update_leds(&colors).await);
        // no callback fires for a failed update
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resize_zone_runs_backend_under_lock() {
        let (controller, backend) = sample_controller();
        assert_ok!(controller.resize_zone(0, 20).await);
        assert_eq!(backend.calls.lock().as_slice(), &["resize_zone 0 20"]);
        assert_eq!(controller.data().await.num_leds(), 24);
    }

    #[tokio::test]
    async fn test_invalid_resize_never_reaches_backend() {
        let (controller, backend) = sample_controller();
        assert_err!(controller.resize_zone(0, 31).await);
        assert!(backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_set_custom_mode_fallback() {
        let (controller, _backend) = sample_controller();
        assert_eq!(controller.set_custom_mode().await, Some(0));
        assert_eq!(controller.data().await.active_mode(), 0);
    }

    #[tokio::test]
    async fn test_hidden_signals_on_edge_only() {
        let (controller, _backend) = sample_controller();
        let reasons = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let reasons2 = Arc::clone(&reasons);
        controller.register_update_callback(move |reason| reasons2.lock().push(*reason));

        controller.set_hidden(true).await;
        controller.set_hidden(true).await;
        controller.set_hidden(false).await;
        assert_eq!(
            reasons.lock().as_slice(),
            &[UpdateReason::Hidden, UpdateReason::Unhidden]
        );
    }
}
