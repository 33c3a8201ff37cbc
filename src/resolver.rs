//! Date-based image selection for a pack.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::error::PackError;
use crate::pack::{self, PackDescriptor};
use crate::probe::{is_supported_image, DirectoryLister, FsLister};

/// Folder name that switches the default selector to random mode.
const RANDOM_FOLDER: &str = "random";

/// A random pick pinned for the rest of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLock {
    /// Day of year (1-based) the pick was made on.
    pub day_of_year: u32,
    /// Entry name chosen from the random folder.
    pub name: String,
}

/// Maps a pack directory and a date to the image to display.
pub struct PackResolver {
    lister: Box<dyn DirectoryLister>,
    rng: ChaChaRng,
    lock: Option<DailyLock>,
}

impl std::fmt::Debug for PackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackResolver")
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl Default for PackResolver {
    fn default() -> Self {
        Self::new(Box::new(FsLister), ChaChaRng::from_entropy())
    }
}

impl PackResolver {
    pub fn new(lister: Box<dyn DirectoryLister>, rng: ChaChaRng) -> Self {
        Self {
            lister,
            rng,
            lock: None,
        }
    }

    /// Current daily lock, if a random pick has been made.
    pub fn lock(&self) -> Option<&DailyLock> {
        self.lock.as_ref()
    }

    /// Drop the daily lock so the next random selection rerolls.
    pub fn invalidate_lock(&mut self) {
        if self.lock.take().is_some() {
            tracing::debug!("daily lock invalidated");
        }
    }

    /// Resolve the image for `today` from the pack at `pack_dir`.
    pub fn resolve(&mut self, pack_dir: &Path, today: NaiveDate) -> Result<PathBuf, PackError> {
        let descriptor = pack::load(pack_dir)?;
        self.resolve_with(pack_dir, &descriptor, today)
    }

    /// Resolve against an already loaded descriptor.
    pub fn resolve_with(
        &mut self,
        pack_dir: &Path,
        descriptor: &PackDescriptor,
        today: NaiveDate,
    ) -> Result<PathBuf, PackError> {
        if let Some(variant) = descriptor.matching_variant(today) {
            tracing::debug!("variant {} matches {today}", variant.path);
            return Ok(pack_dir.join(&variant.path));
        }

        let default = pack_dir.join(&descriptor.default);
        if !self.lister.is_dir(&default) {
            tracing::debug!("no variant matches {today}, using {}", descriptor.default);
            return Ok(default);
        }

        let mut names = self.lister.entries(&default)?;
        names.retain(|name| is_supported_image(Path::new(name)));
        names.sort();
        let day = today.ordinal();
        let name = if is_random_folder(&default) {
            self.pick_locked(&names, day, &default)?
        } else {
            cyclic_pick(&names, day, &default)?
        };
        Ok(default.join(name))
    }

    /// Return the locked entry for `day`, or pick and lock a new one.
    fn pick_locked(&mut self, names: &[String], day: u32, dir: &Path) -> Result<String, PackError> {
        if let Some(lock) = &self.lock {
            if lock.day_of_year == day {
                return Ok(lock.name.clone());
            }
        }
        let name = names
            .choose(&mut self.rng)
            .ok_or_else(|| PackError::EmptySelection {
                dir: dir.to_path_buf(),
            })?
            .clone();
        tracing::debug!("locked random pick {name} for day {day}");
        self.lock = Some(DailyLock {
            day_of_year: day,
            name: name.clone(),
        });
        Ok(name)
    }
}

/// Select `names[day % len]`; repeats every `len` days and every year.
fn cyclic_pick(names: &[String], day: u32, dir: &Path) -> Result<String, PackError> {
    if names.is_empty() {
        return Err(PackError::EmptySelection {
            dir: dir.to_path_buf(),
        });
    }
    Ok(names[day as usize % names.len()].clone())
}

fn is_random_folder(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case(RANDOM_FOLDER))
}
