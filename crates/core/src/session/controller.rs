use std::io::Cursor;
use std::sync::Arc;

use crate::capture::domain::capture_gate::CaptureGate;
use crate::detection::domain::face_detector::FaceDetector;
use crate::launch::domain::action_launcher::ActionLauncher;
use crate::recognition::domain::face_recognizer::{FaceRecognizer, Recognition};
use crate::session::session_state::{ActiveSession, SessionState};
use crate::shared::constants::{UNRECOGNIZED_STREAK_LIMIT, UNRECOGNIZED_USER};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;
use crate::storage::domain::face_store::FaceStore;

/// One recognition result paired with the region it came from.
///
/// The set is replaced wholesale every recognition cycle; rendering
/// layers read it to label faces, nothing in the core feeds it back.
#[derive(Clone, Debug)]
pub struct SightedUser {
    pub recognition: Recognition,
    pub region: FaceRegion,
}

/// What the operator sees before confirming an enrollment: the encoded
/// face crop plus an identity prefill when the face is already enrolled.
#[derive(Clone, Debug)]
pub struct EnrollmentPreview {
    pub image: Vec<u8>,
    pub prefill: Option<(String, String)>,
}

/// The access-session state machine.
///
/// Owns every mutable slot the two evaluation cycles share: the current
/// face regions, the per-cycle sighting set, the session state, and the
/// unrecognized debounce streak. The controller is driven synchronously
/// by whoever schedules it (the timer runner, a replay driver, tests);
/// it never spawns work of its own, which is what keeps per-region
/// evaluation strictly sequential and the state machine race-free.
pub struct SessionController {
    detector: Box<dyn FaceDetector>,
    recognizer: Box<dyn FaceRecognizer>,
    launcher: Box<dyn ActionLauncher>,
    store: Box<dyn FaceStore>,
    gate: Arc<dyn CaptureGate>,
    regions: Vec<FaceRegion>,
    sighted: Vec<SightedUser>,
    state: SessionState,
    unrecognized_streak: u32,
}

impl SessionController {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        recognizer: Box<dyn FaceRecognizer>,
        launcher: Box<dyn ActionLauncher>,
        store: Box<dyn FaceStore>,
        gate: Arc<dyn CaptureGate>,
    ) -> Self {
        Self {
            detector,
            recognizer,
            launcher,
            store,
            gate,
            regions: Vec::new(),
            sighted: Vec::new(),
            state: SessionState::Closed,
            unrecognized_streak: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn regions(&self) -> &[FaceRegion] {
        &self.regions
    }

    pub fn sighted(&self) -> &[SightedUser] {
        &self.sighted
    }

    pub fn faces_present(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Detection cycle: refresh the authoritative region sequence.
    ///
    /// A detector error skips the cycle and leaves the previous regions
    /// in place; no error escapes to the scheduling loop.
    pub fn run_detection_cycle(&mut self, frame: &Frame) {
        match self.detector.detect(frame) {
            Ok(regions) => {
                log::debug!(
                    "detection: {} face(s) in frame {}",
                    regions.len(),
                    frame.index()
                );
                self.regions = regions;
            }
            Err(e) => log::debug!("detection cycle skipped: {e}"),
        }
    }

    /// Recognition cycle: classify every currently detected region, in
    /// sequence order, and drive the session state machine.
    ///
    /// Regions are evaluated strictly sequentially so that a later region
    /// observes state changes made by an earlier one in the same cycle
    /// (last-writer-within-cycle policy).
    pub fn run_recognition_cycle(&mut self, frame: &Frame) {
        self.sighted.clear();

        if self.regions.is_empty() {
            // No face in front of the camera: an open session must close.
            if self.state.is_open() {
                log::info!("face lost, closing session");
                self.close_session();
            }
            return;
        }

        let mut streak_counted = false;
        for region in self.regions.clone() {
            let face = match self.cropped_face(frame, &region) {
                Some(face) => face,
                None => continue,
            };
            let recognition = match self.recognizer.recognize(&face) {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("recognition skipped for region at {},{}: {e}", region.x, region.y);
                    continue;
                }
            };
            self.sighted.push(SightedUser {
                recognition: recognition.clone(),
                region,
            });

            if recognition.is_unrecognized() {
                self.handle_unrecognized(&mut streak_counted);
                continue;
            }
            self.handle_recognized(recognition);
        }
    }

    /// Debounce against momentary misclassification: the streak counts
    /// cycles (at most one bump per cycle, however many regions missed)
    /// and only ticks while a session is open.
    fn handle_unrecognized(&mut self, streak_counted: &mut bool) {
        if !self.state.is_open() || *streak_counted {
            return;
        }
        *streak_counted = true;
        self.unrecognized_streak += 1;
        if self.unrecognized_streak >= UNRECOGNIZED_STREAK_LIMIT {
            log::info!(
                "unrecognized for {} consecutive cycles, closing session",
                self.unrecognized_streak
            );
            self.close_session();
        }
    }

    fn handle_recognized(&mut self, recognition: Recognition) {
        let same_user = self
            .state
            .active()
            .map(|active| {
                active.user_name == recognition.user_name && active.url == recognition.url
            })
            .unwrap_or(false);

        if self.state.is_open() {
            if same_user {
                // Session holder still present; the debounce starts over.
                self.unrecognized_streak = 0;
            } else {
                // A different identity in frame while a session is open is
                // a privacy violation: close now. The region that caused
                // the close never opens its own session; a later region or
                // cycle has to do that from the Closed state.
                log::info!(
                    "user '{}' sighted while session is open for someone else, closing",
                    recognition.user_name
                );
                self.close_session();
            }
        } else {
            self.open_session(recognition);
        }
    }

    fn open_session(&mut self, recognition: Recognition) {
        // The producer stays quiet while the launch blocks. Resume on
        // every path: a feed frozen after a failed launch is a liveness
        // bug, not an error state.
        self.gate.pause();
        let started = self.launcher.start(&recognition.url);
        self.gate.resume();

        match started {
            Ok(handle) => {
                log::info!(
                    "session opened for '{}' at {}",
                    recognition.user_name,
                    recognition.url
                );
                self.state = SessionState::Open(ActiveSession {
                    user_name: recognition.user_name,
                    url: recognition.url,
                    handle,
                });
                self.unrecognized_streak = 0;
            }
            Err(e) => log::warn!(
                "launch failed for '{}': {e}",
                recognition.user_name
            ),
        }
    }

    /// Ownership of the handle passes here on teardown. Termination
    /// failure (process already gone) is tolerated; the state moves to
    /// `Closed` regardless.
    fn close_session(&mut self) {
        if let SessionState::Open(active) = std::mem::replace(&mut self.state, SessionState::Closed)
        {
            if let Err(e) = self.launcher.terminate(active.handle) {
                log::warn!("terminating action process failed: {e}");
            }
            log::info!("session closed for '{}'", active.user_name);
        }
        self.unrecognized_streak = 0;
    }

    /// Operator-invoked enrollment: crop the first detected face, check
    /// whether it is already enrolled for the prefill, and hand back the
    /// encoded crop for confirmation. Never touches the session state.
    ///
    /// Returns `Ok(None)` when no face is currently detected.
    pub fn prepare_enrollment(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<EnrollmentPreview>, Box<dyn std::error::Error>> {
        let Some(region) = self.regions.first().copied() else {
            return Ok(None);
        };
        let Some(face) = self.cropped_face(frame, &region) else {
            return Ok(None);
        };

        // Prefill is best-effort; a recognizer hiccup just means the
        // operator types the identity themselves.
        let prefill = match self.recognizer.recognize(&face) {
            Ok(r) if !r.is_unrecognized() => Some((r.user_name, r.url)),
            Ok(_) => None,
            Err(e) => {
                log::debug!("enrollment prefill unavailable: {e}");
                None
            }
        };

        Ok(Some(EnrollmentPreview {
            image: encode_png(&face)?,
            prefill,
        }))
    }

    /// Persist a confirmed enrollment, then ask the recognizer to pick it
    /// up. Retrain failure is logged and swallowed: the enrollment is
    /// already saved and the stale model keeps serving. Never touches the
    /// session state.
    pub fn save_face(
        &mut self,
        user_name: &str,
        url: &str,
        image: &[u8],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if user_name == UNRECOGNIZED_USER {
            return Err(format!("user name {user_name:?} is reserved").into());
        }
        self.store.save_face(user_name, url, image)?;
        if let Err(e) = self.recognizer.retrain() {
            log::warn!("recognizer retrain failed, stale model keeps serving: {e}");
        }
        Ok(())
    }

    /// Terminates the action process if a session is open. Called by the
    /// runner on loop exit; always leaves the machine `Closed`.
    pub fn shutdown(&mut self) {
        if self.state.is_open() {
            log::info!("shutting down with an open session");
        }
        self.close_session();
    }

    fn cropped_face(&self, frame: &Frame, region: &FaceRegion) -> Option<Frame> {
        frame.crop(region).map(|crop| crop.to_grayscale())
    }
}

fn encode_png(face: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let img = image::GrayImage::from_raw(face.width(), face.height(), face.data().to_vec())
        .ok_or("face crop does not match its dimensions")?;
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
