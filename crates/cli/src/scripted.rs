use std::time::{Duration, Instant};

use serde::Deserialize;

use facegate_core::capture::domain::frame_source::FrameSource;
use facegate_core::detection::domain::face_detector::FaceDetector;
use facegate_core::launch::domain::action_launcher::{ActionLauncher, ProcessHandle};
use facegate_core::recognition::domain::face_recognizer::{FaceRecognizer, Recognition};
use facegate_core::shared::frame::Frame;
use facegate_core::shared::region::FaceRegion;

/// A recorded scenario standing in for camera, detector and recognizer.
///
/// The frame source advances one step per recognition interval and
/// stamps the step number into the frame index; detector and recognizer
/// look their answers up by that index, so the whole gating loop runs
/// exactly as it would against live backends. The last step repeats
/// until the replay is stopped.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub regions: Vec<ScriptRegion>,
    /// One entry per region, in region order; cycled when short.
    #[serde(default)]
    pub results: Vec<ScriptResult>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// `user_name: null` (or absent) replays the unrecognized sentinel.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptResult {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_distance")]
    pub distance: f64,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_distance() -> f64 {
    0.5
}

impl Scenario {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn step(&self, index: usize) -> &Step {
        &self.steps[index.min(self.steps.len() - 1)]
    }
}

impl ScriptResult {
    fn to_recognition(&self) -> Recognition {
        match &self.user_name {
            Some(name) => Recognition::new(name.clone(), self.url.clone(), self.distance),
            None => Recognition::unrecognized(self.distance),
        }
    }
}

/// Emits a flat synthetic frame per capture, indexed by scenario step.
pub struct ScriptedFrameSource {
    scenario: Scenario,
    step_time: Duration,
    started: Option<Instant>,
}

impl ScriptedFrameSource {
    pub fn new(scenario: &Scenario, step_time: Duration) -> Self {
        Self {
            scenario: scenario.clone(),
            step_time,
            started: None,
        }
    }
}

impl FrameSource for ScriptedFrameSource {
    fn capture(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let step = (started.elapsed().as_millis() / self.step_time.as_millis().max(1)) as usize;
        let step = step.min(self.scenario.steps.len() - 1);

        let size = (self.scenario.width * self.scenario.height) as usize;
        Ok(Some(Frame::new(
            vec![128; size],
            self.scenario.width,
            self.scenario.height,
            1,
            step,
        )))
    }
}

/// Replays each step's regions for frames carrying that step's index.
pub struct ScriptedDetector {
    scenario: Scenario,
}

impl ScriptedDetector {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            scenario: scenario.clone(),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        Ok(self
            .scenario
            .step(frame.index())
            .regions
            .iter()
            .map(|r| FaceRegion::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}

/// Replays each step's results in region order. Crops keep their source
/// frame's index, which is how results line up with the right step.
pub struct ScriptedRecognizer {
    scenario: Scenario,
    last_index: usize,
    cursor: usize,
}

impl ScriptedRecognizer {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            scenario: scenario.clone(),
            last_index: usize::MAX,
            cursor: 0,
        }
    }
}

impl FaceRecognizer for ScriptedRecognizer {
    fn recognize(&mut self, face: &Frame) -> Result<Recognition, Box<dyn std::error::Error>> {
        if face.index() != self.last_index {
            self.last_index = face.index();
            self.cursor = 0;
        }
        let results = &self.scenario.step(face.index()).results;
        let recognition = if results.is_empty() {
            Recognition::unrecognized(default_distance())
        } else {
            results[self.cursor % results.len()].to_recognition()
        };
        self.cursor += 1;
        Ok(recognition)
    }

    fn retrain(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("scripted recognizer has nothing to retrain");
        Ok(())
    }
}

/// Logs launches instead of spawning browsers; the default for replays.
pub struct DryRunLauncher {
    next_id: u64,
}

impl DryRunLauncher {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }
}

impl Default for DryRunLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLauncher for DryRunLauncher {
    fn start(&mut self, url: &str) -> Result<ProcessHandle, Box<dyn std::error::Error>> {
        let handle = ProcessHandle(self.next_id);
        self.next_id += 1;
        log::info!("[dry run] would launch browser for {url}");
        Ok(handle)
    }

    fn terminate(&mut self, handle: ProcessHandle) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("[dry run] would terminate process {}", handle.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "width": 320,
        "height": 240,
        "steps": [
            { "regions": [{"x": 100, "y": 80, "width": 64, "height": 64}],
              "results": [{"user_name": "alice", "url": "alice.example", "distance": 0.2}] },
            { "regions": [{"x": 100, "y": 80, "width": 64, "height": 64}],
              "results": [{}] },
            { "regions": [], "results": [] }
        ]
    }"#;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0; 320 * 240], 320, 240, 1, index)
    }

    #[test]
    fn test_scenario_parses() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.width, 320);
    }

    #[test]
    fn test_detector_replays_step_regions() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut detector = ScriptedDetector::new(&scenario);

        assert_eq!(detector.detect(&frame(0)).unwrap().len(), 1);
        assert!(detector.detect(&frame(2)).unwrap().is_empty());
    }

    #[test]
    fn test_steps_past_the_end_repeat_the_last() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut detector = ScriptedDetector::new(&scenario);
        assert!(detector.detect(&frame(99)).unwrap().is_empty());
    }

    #[test]
    fn test_recognizer_replays_identity_and_sentinel() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut recognizer = ScriptedRecognizer::new(&scenario);

        let first = recognizer.recognize(&frame(0)).unwrap();
        assert_eq!(first.user_name, "alice");
        assert_eq!(first.url, "alice.example");

        let second = recognizer.recognize(&frame(1)).unwrap();
        assert!(second.is_unrecognized());
    }

    #[test]
    fn test_recognizer_cursor_resets_per_step() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut recognizer = ScriptedRecognizer::new(&scenario);

        // Two reads of the same step replay the same single result.
        assert_eq!(recognizer.recognize(&frame(0)).unwrap().user_name, "alice");
        assert_eq!(recognizer.recognize(&frame(0)).unwrap().user_name, "alice");
    }

    #[test]
    fn test_source_starts_at_step_zero() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let mut source = ScriptedFrameSource::new(&scenario, Duration::from_secs(60));
        let frame = source.capture().unwrap().unwrap();
        assert_eq!(frame.index(), 0);
        assert_eq!(frame.width(), 320);
    }
}
