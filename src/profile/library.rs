// Profile library
// Every compiled profile found in a directory, keyed by file name

use std::collections::BTreeMap;
use std::path::Path;

use macropad_device::Profile;
use tracing::{debug, info, warn};

use super::compile::{compile, Compiled};
use super::document::ProfileDocument;
use super::error::LoadError;

/// Read, decode and compile one profile file
pub fn load_profile_file<P: AsRef<Path>>(path: P) -> Result<Compiled, LoadError> {
    let document = ProfileDocument::load_from_file(path)?;
    debug!(
        "Compiling {} profile with {} keys",
        document.kind(),
        document.key_count()
    );
    Ok(compile(&document)?)
}

/// Named profiles available for upload
#[derive(Debug, Clone, Default)]
pub struct ProfileLibrary {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every regular file in `dir` as a profile
    ///
    /// Files that fail to load are logged and skipped. Only an unreadable
    /// directory is an error.
    pub fn load_from_directory<P: AsRef<Path>>(dir: P) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let io_error = |e: std::io::Error| LoadError::Io {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut library = Self::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match load_profile_file(&path) {
                Ok(compiled) => {
                    debug!("Loaded profile {} ({} keys)", name, compiled.profile.len());
                    library.insert(name, compiled.profile);
                }
                Err(e) => warn!("Failed to load profile {}: {}", name, e),
            }
        }

        info!("Loaded {} profiles from {}", library.len(), dir.display());
        Ok(library)
    }

    /// Add or replace a profile
    pub fn insert(&mut self, name: impl Into<String>, profile: Profile) {
        self.profiles.insert(name.into(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
