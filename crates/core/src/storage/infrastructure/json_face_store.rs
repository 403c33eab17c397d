use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::UNRECOGNIZED_USER;
use crate::storage::domain::face_store::FaceStore;

const PROFILE_FILE: &str = "profile.json";

#[derive(Error, Debug)]
pub enum FaceStoreError {
    #[error("user name may not be empty")]
    EmptyName,
    #[error("user name {0:?} is reserved")]
    ReservedName(String),
    #[error("could not determine a data directory")]
    NoDataDir,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed profile {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One enrolled identity: the URL a session opens for them plus the
/// file names of their face samples, newest last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceProfile {
    pub user_name: String,
    pub url: String,
    pub samples: Vec<String>,
}

/// File-backed face store: one directory per user under the root,
/// holding `profile.json` plus numbered PNG samples.
///
/// Recognizer implementations read the profiles back when retraining;
/// this store only owns layout and validity of what goes in.
pub struct JsonFaceStore {
    root: PathBuf,
}

impl JsonFaceStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory, e.g. `~/.local/share/facegate/faces` on
    /// Linux.
    pub fn open_default() -> Result<Self, FaceStoreError> {
        dirs::data_dir()
            .map(|d| Self::open(d.join("facegate").join("faces")))
            .ok_or(FaceStoreError::NoDataDir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All enrolled profiles, sorted by user name. A missing root means
    /// nobody is enrolled yet.
    pub fn load_profiles(&self) -> Result<Vec<FaceProfile>, FaceStoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|e| FaceStoreError::Read {
            path: self.root.clone(),
            source: e,
        })?;

        let mut profiles = Vec::new();
        for entry in entries.flatten() {
            let profile_path = entry.path().join(PROFILE_FILE);
            if !profile_path.is_file() {
                continue;
            }
            let raw = fs::read_to_string(&profile_path).map_err(|e| FaceStoreError::Read {
                path: profile_path.clone(),
                source: e,
            })?;
            let profile =
                serde_json::from_str(&raw).map_err(|e| FaceStoreError::Malformed {
                    path: profile_path,
                    source: e,
                })?;
            profiles.push(profile);
        }
        profiles.sort_by(|a: &FaceProfile, b: &FaceProfile| a.user_name.cmp(&b.user_name));
        Ok(profiles)
    }

    fn save(&self, user_name: &str, url: &str, image: &[u8]) -> Result<(), FaceStoreError> {
        if user_name.is_empty() {
            return Err(FaceStoreError::EmptyName);
        }
        if user_name == UNRECOGNIZED_USER {
            return Err(FaceStoreError::ReservedName(user_name.to_string()));
        }

        let dir = self.user_dir(user_name);
        fs::create_dir_all(&dir).map_err(|e| FaceStoreError::Write {
            path: dir.clone(),
            source: e,
        })?;

        let mut profile = self.read_profile(&dir)?.unwrap_or_else(|| FaceProfile {
            user_name: user_name.to_string(),
            url: url.to_string(),
            samples: Vec::new(),
        });
        // Re-enrollment may change where the user's session points.
        profile.url = url.to_string();

        let sample_name = format!("face_{:03}.png", profile.samples.len() + 1);
        let sample_path = dir.join(&sample_name);
        fs::write(&sample_path, image).map_err(|e| FaceStoreError::Write {
            path: sample_path,
            source: e,
        })?;
        profile.samples.push(sample_name);

        self.write_profile(&dir, &profile)
    }

    fn read_profile(&self, dir: &Path) -> Result<Option<FaceProfile>, FaceStoreError> {
        let path = dir.join(PROFILE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| FaceStoreError::Read {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| FaceStoreError::Malformed { path, source: e })
    }

    /// Write to a temp file first, then rename for atomicity.
    fn write_profile(&self, dir: &Path, profile: &FaceProfile) -> Result<(), FaceStoreError> {
        let path = dir.join(PROFILE_FILE);
        let temp_path = path.with_extension("json.part");
        let raw = serde_json::to_string_pretty(profile).map_err(|e| FaceStoreError::Malformed {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&temp_path, raw).map_err(|e| FaceStoreError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &path).map_err(|e| FaceStoreError::Write { path, source: e })
    }

    fn user_dir(&self, user_name: &str) -> PathBuf {
        self.root.join(sanitize(user_name))
    }
}

impl FaceStore for JsonFaceStore {
    fn save_face(
        &mut self,
        user_name: &str,
        url: &str,
        image: &[u8],
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.save(user_name, url, image)?)
    }
}

/// Directory names come from operator-typed user names; anything outside
/// a conservative character set becomes `_`. The real name lives in the
/// profile, so sanitizing is lossless for callers.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonFaceStore) {
        let tmp = TempDir::new().unwrap();
        let store = JsonFaceStore::open(tmp.path().join("faces"));
        (tmp, store)
    }

    #[test]
    fn test_save_creates_profile_and_sample() {
        let (_tmp, mut s) = store();
        s.save_face("alice", "alice.example", &[1, 2, 3]).unwrap();

        let profiles = s.load_profiles().unwrap();
        assert_eq!(
            profiles,
            vec![FaceProfile {
                user_name: "alice".into(),
                url: "alice.example".into(),
                samples: vec!["face_001.png".into()],
            }]
        );
        let sample = s.root().join("alice").join("face_001.png");
        assert_eq!(fs::read(sample).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_second_save_appends_sample_and_updates_url() {
        let (_tmp, mut s) = store();
        s.save_face("alice", "alice.example", &[1]).unwrap();
        s.save_face("alice", "moved.example", &[2]).unwrap();

        let profiles = s.load_profiles().unwrap();
        assert_eq!(profiles[0].url, "moved.example");
        assert_eq!(
            profiles[0].samples,
            vec!["face_001.png".to_string(), "face_002.png".to_string()]
        );
    }

    #[test]
    fn test_reserved_name_is_rejected() {
        let (_tmp, mut s) = store();
        let result = s.save_face(UNRECOGNIZED_USER, "x.example", &[1]);
        assert!(result.is_err());
        assert!(s.load_profiles().unwrap().is_empty());
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let (_tmp, mut s) = store();
        assert!(s.save_face("", "x.example", &[1]).is_err());
    }

    #[test]
    fn test_missing_root_means_nobody_enrolled() {
        let (_tmp, s) = store();
        assert!(s.load_profiles().unwrap().is_empty());
    }

    #[test]
    fn test_profiles_sorted_by_user_name() {
        let (_tmp, mut s) = store();
        s.save_face("carol", "carol.example", &[1]).unwrap();
        s.save_face("alice", "alice.example", &[1]).unwrap();
        s.save_face("bob", "bob.example", &[1]).unwrap();

        let names: Vec<_> = s
            .load_profiles()
            .unwrap()
            .into_iter()
            .map(|p| p.user_name)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_awkward_names_stay_inside_the_root() {
        let (_tmp, mut s) = store();
        s.save_face("../escape", "x.example", &[1]).unwrap();

        let profiles = s.load_profiles().unwrap();
        assert_eq!(profiles[0].user_name, "../escape");
        assert!(s.root().join("___escape").join(PROFILE_FILE).is_file());
    }

    #[test]
    fn test_malformed_profile_surfaces_error() {
        let (_tmp, mut s) = store();
        s.save_face("alice", "alice.example", &[1]).unwrap();
        fs::write(s.root().join("alice").join(PROFILE_FILE), b"not json").unwrap();

        assert!(matches!(
            s.load_profiles(),
            Err(FaceStoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_no_partial_profile_left_behind() {
        let (_tmp, mut s) = store();
        s.save_face("alice", "alice.example", &[1]).unwrap();
        assert!(!s.root().join("alice").join("profile.json.part").exists());
    }
}
