use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};

use crate::capture::domain::frame_source::FrameSource;
use crate::session::controller::{EnrollmentPreview, SessionController};
use crate::session::frame_slot::FrameSlot;
use crate::shared::constants::{DETECT_INTERVAL, RECOGNIZE_INTERVAL};

/// How long the producer idles between capture attempts.
const PRODUCER_IDLE: Duration = Duration::from_millis(5);

/// Cadence of the two evaluation cycles. The recognition interval is
/// expected to be substantially larger than the detection interval.
#[derive(Clone, Copy, Debug)]
pub struct CycleConfig {
    pub detect_interval: Duration,
    pub recognize_interval: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            detect_interval: DETECT_INTERVAL,
            recognize_interval: RECOGNIZE_INTERVAL,
        }
    }
}

/// Operator actions delivered into the session loop between cycles.
enum Command {
    PrepareEnrollment {
        reply: Sender<Result<Option<EnrollmentPreview>, String>>,
    },
    SaveFace {
        user_name: String,
        url: String,
        image: Vec<u8>,
        reply: Sender<Result<(), String>>,
    },
    Shutdown,
}

/// Drives the session controller from two repeating timers plus a frame
/// producer thread.
///
/// Layout: `producer -> FrameSlot <- [detect tick | recognize tick | commands]`
///
/// The producer publishes into the slot; everything that touches the
/// controller runs on one loop thread, serialized by `select!`. That
/// single timeline is what makes a concurrent double-open impossible:
/// the two timers can interleave in any order, but their handlers never
/// overlap. Cycle handlers take a best-effort snapshot of the slot and
/// skip the tick when no frame has arrived yet.
pub struct TimerSessionRunner {
    config: CycleConfig,
}

impl TimerSessionRunner {
    pub fn new(config: CycleConfig) -> Self {
        Self { config }
    }

    /// Starts the producer and loop threads. The returned handle owns
    /// both; dropping it (or calling [`RunnerHandle::shutdown`]) stops
    /// the loop and closes any open session.
    ///
    /// `slot` must be the same slot the controller was given as its
    /// capture gate, or pausing during session opening will gate nothing.
    pub fn run(
        &self,
        controller: SessionController,
        source: Box<dyn FrameSource>,
        slot: Arc<FrameSlot>,
    ) -> RunnerHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = bounded::<Command>(4);

        let producer_handle = spawn_producer(source, slot.clone(), stop.clone());
        let loop_handle = spawn_loop(controller, slot, cmd_rx, self.config, stop.clone());

        RunnerHandle {
            cmd_tx,
            stop,
            loop_handle: Some(loop_handle),
            producer_handle: Some(producer_handle),
        }
    }
}

fn spawn_producer(
    mut source: Box<dyn FrameSource>,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn FrameSource>> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            if !slot.is_paused() {
                match source.capture() {
                    Ok(Some(frame)) => slot.publish(frame),
                    Ok(None) => {}
                    Err(e) => log::debug!("capture tick skipped: {e}"),
                }
            }
            std::thread::sleep(PRODUCER_IDLE);
        }
        source
    })
}

fn spawn_loop(
    mut controller: SessionController,
    slot: Arc<FrameSlot>,
    cmd_rx: Receiver<Command>,
    config: CycleConfig,
    stop: Arc<AtomicBool>,
) -> JoinHandle<SessionController> {
    std::thread::spawn(move || {
        let detect_tick = tick(config.detect_interval);
        let recognize_tick = tick(config.recognize_interval);

        loop {
            select! {
                recv(detect_tick) -> _ => {
                    if let Some(frame) = slot.snapshot() {
                        controller.run_detection_cycle(&frame);
                    }
                }
                recv(recognize_tick) -> _ => {
                    if let Some(frame) = slot.snapshot() {
                        controller.run_recognition_cycle(&frame);
                    } else {
                        log::debug!("no frame captured yet, recognition tick skipped");
                    }
                }
                recv(cmd_rx) -> msg => match msg {
                    Ok(Command::PrepareEnrollment { reply }) => {
                        let result = match slot.snapshot() {
                            Some(frame) => controller
                                .prepare_enrollment(&frame)
                                .map_err(|e| e.to_string()),
                            None => Ok(None),
                        };
                        let _ = reply.send(result);
                    }
                    Ok(Command::SaveFace { user_name, url, image, reply }) => {
                        let result = controller
                            .save_face(&user_name, &url, &image)
                            .map_err(|e| e.to_string());
                        let _ = reply.send(result);
                    }
                    // All senders gone counts as shutdown too.
                    Ok(Command::Shutdown) | Err(_) => break,
                },
            }
        }

        controller.shutdown();
        stop.store(true, Ordering::Relaxed);
        controller
    })
}

/// Owner of the two runner threads.
pub struct RunnerHandle {
    cmd_tx: Sender<Command>,
    stop: Arc<AtomicBool>,
    loop_handle: Option<JoinHandle<SessionController>>,
    producer_handle: Option<JoinHandle<Box<dyn FrameSource>>>,
}

impl RunnerHandle {
    /// Asks the loop for an enrollment preview of the first detected
    /// face. Blocks until the loop picks the command up between cycles.
    pub fn prepare_enrollment(&self) -> Result<Option<EnrollmentPreview>, String> {
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send(Command::PrepareEnrollment { reply: reply_tx })
            .map_err(|_| "session loop has exited".to_string())?;
        reply_rx
            .recv()
            .map_err(|_| "session loop has exited".to_string())?
    }

    /// Persists a confirmed enrollment through the loop thread.
    pub fn save_face(&self, user_name: &str, url: &str, image: &[u8]) -> Result<(), String> {
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send(Command::SaveFace {
                user_name: user_name.to_string(),
                url: url.to_string(),
                image: image.to_vec(),
                reply: reply_tx,
            })
            .map_err(|_| "session loop has exited".to_string())?;
        reply_rx
            .recv()
            .map_err(|_| "session loop has exited".to_string())?
    }

    /// Stops both threads, closing any open session, and returns the
    /// controller for final-state inspection.
    pub fn shutdown(mut self) -> Result<SessionController, Box<dyn std::error::Error>> {
        let _ = self.cmd_tx.send(Command::Shutdown);
        let controller = match self.loop_handle.take() {
            Some(handle) => handle.join().map_err(|_| "session loop panicked")?,
            None => return Err("session loop already joined".into()),
        };
        self.stop.store(true, Ordering::Relaxed);
        if let Some(producer) = self.producer_handle.take() {
            let _ = producer.join();
        }
        Ok(controller)
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.loop_handle.take() {
            let _ = handle.join();
        }
        if let Some(producer) = self.producer_handle.take() {
            let _ = producer.join();
        }
    }
}
