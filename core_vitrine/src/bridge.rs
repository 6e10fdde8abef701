//! In-process host plumbing: a frame bus out, a command bridge in, and a
//! worker that steps the engine at real-time cadence on its own thread.
//!
//! The channels carry the same encoded bytes a remote transport would, so a
//! host can move across a process boundary without touching the engine.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bevy::prelude::Resource;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::{build_app_with, content::ContentLibrary, resources::EngineConfig, run_frame};

/// Publishes encoded frames to the host.
#[derive(Resource, Clone)]
pub struct FrameBus {
    sender: Sender<Vec<u8>>,
}

impl FrameBus {
    pub fn publish(&self, bytes: &[u8]) {
        if self.sender.send(bytes.to_vec()).is_err() {
            log::debug!("frame receiver dropped, skipping publish");
        }
    }
}

pub fn frame_channel() -> (FrameBus, Receiver<Vec<u8>>) {
    let (sender, receiver) = unbounded();
    (FrameBus { sender }, receiver)
}

/// Receives encoded command envelopes from the host; drained every tick.
#[derive(Resource)]
pub struct CommandBridge {
    receiver: Receiver<Vec<u8>>,
}

impl CommandBridge {
    pub fn drain(&self) -> Vec<Vec<u8>> {
        let mut drained = Vec::new();
        while let Ok(bytes) = self.receiver.try_recv() {
            drained.push(bytes);
        }
        drained
    }
}

pub fn command_channel() -> (Sender<Vec<u8>>, CommandBridge) {
    let (sender, receiver) = unbounded();
    (sender, CommandBridge { receiver })
}

/// Handle to a running engine thread. Dropping it stops the engine.
pub struct EngineWorker {
    handle: Option<JoinHandle<()>>,
    shutdown: Sender<()>,
}

impl EngineWorker {
    pub fn stop(self) {
        // Drop runs the shutdown handshake.
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Build an engine from `config` + `library` on a dedicated thread and step
/// it once per `tick_ms` of wall time. Returns the worker handle, the frame
/// stream and the command sender.
pub fn spawn_engine_worker(
    config: EngineConfig,
    library: Arc<ContentLibrary>,
) -> (EngineWorker, Receiver<Vec<u8>>, Sender<Vec<u8>>) {
    let (frame_bus, frames) = frame_channel();
    let (commands, command_bridge) = command_channel();
    let (shutdown, shutdown_rx) = bounded::<()>(1);
    let tick = Duration::from_millis(config.tick_ms.max(1));

    let handle = thread::Builder::new()
        .name("vitrine-engine".to_string())
        .spawn(move || {
            let mut app = build_app_with(config, library);
            app.insert_resource(frame_bus);
            app.insert_resource(command_bridge);
            loop {
                match shutdown_rx.recv_timeout(tick) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => run_frame(&mut app),
                }
            }
        })
        .expect("failed to spawn engine worker thread");

    (
        EngineWorker {
            handle: Some(handle),
            shutdown,
        },
        frames,
        commands,
    )
}
