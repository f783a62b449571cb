use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::OpenRgbResult;
use crate::device::{Color, Controller, ModeData, SegmentData};
use crate::protocol::{PacketId, ReceivedMessage};

/// One client write, copied off the session and queued for the controller.
#[derive(Debug)]
pub(crate) struct QueueEntry {
    pub payload: Vec<u8>,
    pub packet_id: PacketId,
    pub protocol_version: u32,
}

/// Spawns the worker task serializing all hardware-facing writes for one
/// controller. The bounded queue is the back-pressure point: a slow device
/// blocks the sessions feeding it.
///
/// Closing every sender shuts the worker down after it drained the queue, so
/// accepted work always executes.
pub(crate) fn spawn(
    controller: Arc<Controller>,
    coalesce: bool,
    queue_depth: usize,
) -> (mpsc::Sender<QueueEntry>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(queue_depth);
    let worker = Worker {
        controller,
        rx,
        lookahead: None,
        coalesce,
    };
    (tx, tokio::spawn(worker.run()))
}

struct Worker {
    controller: Arc<Controller>,
    rx: mpsc::Receiver<QueueEntry>,
    /// Entry popped while coalescing that was not itself a repaint.
    lookahead: Option<QueueEntry>,
    /// Whether consecutive repaints may collapse into the newest one. Off
    /// for controllers flagged `ResetBeforeUpdate`: those execute every
    /// queued update.
    coalesce: bool,
}

impl Worker {
    async fn run(mut self) {
        tracing::debug!("Worker for controller {} up", self.controller.id());
        loop {
            let mut entry = match self.lookahead.take() {
                Some(entry) => entry,
                None => match self.rx.recv().await {
                    Some(entry) => entry,
                    None => break,
                },
            };
            if self.coalesce && entry.packet_id == PacketId::RGBControllerUpdateLeds {
                entry = self.coalesce_repaints(entry);
            }
            if let Err(e) = self.apply(&entry).await {
                tracing::warn!(
                    "Dropped {:?} for controller {}: {e}",
                    entry.packet_id,
                    self.controller.id()
                );
            }
        }
        tracing::debug!("Worker for controller {} drained", self.controller.id());
    }

    /// Collapses a run of already-queued repaints into the newest one.
    /// "Paint these colors now" is idempotent; only the last coat matters.
    fn coalesce_repaints(&mut self, mut entry: QueueEntry) -> QueueEntry {
        while let Ok(next) = self.rx.try_recv() {
            if next.packet_id == PacketId::RGBControllerUpdateLeds {
                entry = next;
            } else {
                self.lookahead = Some(next);
                break;
            }
        }
        entry
    }

    async fn apply(&self, entry: &QueueEntry) -> OpenRgbResult<()> {
        let mut msg = ReceivedMessage::new(&entry.payload, entry.protocol_version);
        match entry.packet_id {
            PacketId::RGBControllerResizeZone => {
                let (zone, new_size): (u32, u32) = msg.read_value()?;
                self.controller
                    .resize_zone(zone as usize, new_size as usize)
                    .await
            }
            PacketId::RGBControllerUpdateLeds => {
                let len = msg.read_u32()? as usize;
                let mut sub = msg.sub_message(len)?;
                let colors: Vec<Color> = sub.read_value()?;
                self.controller.update_leds(&colors).await
            }
            PacketId::RGBControllerUpdateZoneLeds => {
                let len = msg.read_u32()? as usize;
                let mut sub = msg.sub_message(len)?;
                let zone = sub.read_u32()? as usize;
                let colors: Vec<Color> = sub.read_value()?;
                self.controller.update_zone_leds(zone, &colors).await
            }
            PacketId::RGBControllerUpdateSingleLed => {
                let led: i32 = msg.read_value()?;
                let color: Color = msg.read_value()?;
                self.controller.update_single_led(led as usize, color).await
            }
            PacketId::RGBControllerSetCustomMode => {
                if self.controller.set_custom_mode().await.is_none() {
                    tracing::debug!(
                        "Controller {} has no direct mode, keeping current",
                        self.controller.id()
                    );
                }
                Ok(())
            }
            PacketId::RGBControllerUpdateMode => {
                let len = msg.read_u32()? as usize;
                let mut sub = msg.sub_message(len)?;
                let mode_idx = sub.read_u32()? as usize;
                let mode: ModeData = sub.read_value()?;
                self.controller.update_mode(mode_idx, mode).await
            }
            PacketId::RGBControllerSaveMode => {
                let len = msg.read_u32()? as usize;
                let mut sub = msg.sub_message(len)?;
                let mode_idx = sub.read_u32()? as usize;
                let mode: ModeData = sub.read_value()?;
                self.controller.save_mode(mode_idx, mode).await
            }
            PacketId::RGBControllerAddSegment => {
                let len = msg.read_u32()? as usize;
                let mut sub = msg.sub_message(len)?;
                let zone = sub.read_u32()? as usize;
                let segment: SegmentData = sub.read_value()?;
                self.controller.add_segment(zone, segment).await
            }
            PacketId::RGBControllerClearSegments => {
                let zone = msg.read_u32()? as usize;
                self.controller.clear_segments(zone).await
            }
            other => {
                tracing::warn!("Worker received non-mutation packet {other:?}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::{QueueEntry, spawn};
    use crate::OpenRgbResult;
    use crate::device::testing::sample_controller;
    use crate::device::Color;
    use crate::protocol::{PacketId, WriteMessage};

    fn update_leds_entry(color: Color, count: usize) -> QueueEntry {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_len_prefixed(&vec![color; count]).unwrap();
        QueueEntry {
            payload: buf.into_bytes(),
            packet_id: PacketId::RGBControllerUpdateLeds,
            protocol_version: crate::PROTOCOL_VERSION,
        }
    }

    fn resize_entry(zone: u32, size: u32) -> QueueEntry {
        let mut buf = WriteMessage::new(crate::PROTOCOL_VERSION);
        buf.write_u32(zone);
        buf.write_u32(size);
        QueueEntry {
            payload: buf.into_bytes(),
            packet_id: PacketId::RGBControllerResizeZone,
            protocol_version: crate::PROTOCOL_VERSION,
        }
    }

    async fn drain(tx: mpsc::Sender<QueueEntry>, handle: tokio::task::JoinHandle<()>) {
        drop(tx);
        handle.await.expect("worker completes");
    }

    #[tokio::test]
    async fn test_applies_updates_in_order() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), false, 8);

        let red = Color { r: 255, g: 0, b: 0 };
        let green = Color { r: 0, g: 255, b: 0 };
        tx.send(update_leds_entry(red, 16)).await.unwrap();
        tx.send(resize_entry(0, 20)).await.unwrap();
        tx.send(update_leds_entry(green, 24)).await.unwrap();
        drain(tx, handle).await;

        assert_eq!(
            backend.calls.lock().as_slice(),
            &["update_leds", "resize_zone 0 20", "update_leds"]
        );
        assert!(controller.data().await.colors().iter().all(|c| *c == green));
        Ok(())
    }

    #[tokio::test]
    async fn test_every_update_runs_without_coalescing() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        // coalescing off, as for ResetBeforeUpdate controllers
        let (tx, handle) = spawn(Arc::clone(&controller), false, 64);

        for i in 0..10 {
            tx.send(update_leds_entry(Color { r: i, g: 0, b: 0 }, 16))
                .await
                .unwrap();
        }
        drain(tx, handle).await;

        assert_eq!(backend.calls.lock().len(), 10);
        assert_eq!(
            backend.last_colors.lock()[0],
            Color { r: 9, g: 0, b: 0 }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_coalescing_keeps_newest_repaint() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), true, 64);

        // queue everything before the worker can pop: the run of repaints
        // may collapse, the final colors are the last queued coat
        for i in 0..10 {
            tx.send(update_leds_entry(Color { r: i, g: 0, b: 0 }, 16))
                .await
                .unwrap();
        }
        drain(tx, handle).await;

        assert!(backend.calls.lock().len() <= 10);
        assert_eq!(
            controller.data().await.colors()[0],
            Color { r: 9, g: 0, b: 0 }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_coalescing_never_skips_other_packets() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), true, 64);

        tx.send(update_leds_entry(Color { r: 1, g: 0, b: 0 }, 16))
            .await
            .unwrap();
        tx.send(resize_entry(0, 20)).await.unwrap();
        tx.send(update_leds_entry(Color { r: 2, g: 0, b: 0 }, 24))
            .await
            .unwrap();
        drain(tx, handle).await;

        let calls = backend.calls.lock();
        assert!(calls.contains(&"resize_zone 0 20".to_string()));
        assert_eq!(controller.data().await.num_leds(), 24);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_payload_is_discarded() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), false, 8);

        tx.send(QueueEntry {
            payload: vec![1, 2],
            packet_id: PacketId::RGBControllerUpdateLeds,
            protocol_version: crate::PROTOCOL_VERSION,
        })
        .await
        .unwrap();
        tx.send(update_leds_entry(Color { r: 5, g: 5, b: 5 }, 16))
            .await
            .unwrap();
        drain(tx, handle).await;

        // the bad entry was dropped, the good one still ran
        assert_eq!(backend.calls.lock().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_resize_keeps_worker_alive() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), false, 8);

        tx.send(resize_entry(0, 1000)).await.unwrap();
        tx.send(resize_entry(0, 20)).await.unwrap();
        drain(tx, handle).await;

        assert_eq!(backend.calls.lock().as_slice(), &["resize_zone 0 20"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_accepted_work_survives_sender_drop() -> OpenRgbResult<()> {
        let (controller, backend) = sample_controller();
        let (tx, handle) = spawn(Arc::clone(&controller), false, 64);

        // the "client" enqueues and dies immediately
        for i in 0..5 {
            tx.send(update_leds_entry(Color { r: i, g: 1, b: 1 }, 16))
                .await
                .unwrap();
        }
        drop(tx);
        handle.await.expect("worker completes");

        assert_eq!(backend.calls.lock().len(), 5);
        Ok(())
    }
}
