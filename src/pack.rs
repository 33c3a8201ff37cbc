//! Pack metadata model and `catpack.json` IO.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::PackError;

/// File name of the metadata document inside every pack directory.
pub const METADATA_FILE: &str = "catpack.json";

/// Year-agnostic calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    /// Place this day in `year`.
    ///
    /// Days past the end of the month roll into the next one, so Feb 29 in a
    /// non-leap year lands on Mar 1.
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(year, self.month, 1)?;
        first.checked_add_days(Days::new(u64::from(self.day.saturating_sub(1))))
    }

    fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month) && (1..=31).contains(&self.day)
    }
}

/// A date-bounded image inside a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(rename = "startTime")]
    pub start: MonthDay,
    #[serde(rename = "endTime")]
    pub end: MonthDay,
    /// Image path relative to the pack directory.
    pub path: String,
}

impl Variant {
    /// Return true when `today` falls inside this variant's range.
    ///
    /// An end month earlier than the start month is read as a range crossing
    /// Dec 31: the end date moves into the year after the start. Both the
    /// window starting this year and the one starting last year are checked,
    /// so early January still matches a December start. Spans longer than one
    /// wraparound are not representable.
    pub fn contains(&self, today: NaiveDate) -> bool {
        let year = today.year();
        if self.end.month < self.start.month {
            self.window(year, year + 1, today) || self.window(year - 1, year, today)
        } else {
            self.window(year, year, today)
        }
    }

    fn window(&self, start_year: i32, end_year: i32, today: NaiveDate) -> bool {
        match (self.start.in_year(start_year), self.end.in_year(end_year)) {
            (Some(start), Some(end)) => start <= today && today <= end,
            _ => false,
        }
    }
}

/// Parsed contents of `catpack.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackDescriptor {
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Fallback image or image folder, relative to the pack directory.
    pub default: String,
}

impl PackDescriptor {
    /// Parse a descriptor from JSON text, attributing errors to `source`.
    pub fn from_json(text: &str, source: &Path) -> Result<Self, PackError> {
        let descriptor: PackDescriptor =
            serde_json::from_str(text).map_err(|err| PackError::parse(source, err))?;
        descriptor.validate(source)?;
        Ok(descriptor)
    }

    /// First variant, in declaration order, whose range contains `today`.
    pub fn matching_variant(&self, today: NaiveDate) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.contains(today))
    }

    fn validate(&self, source: &Path) -> Result<(), PackError> {
        if self.default.trim().is_empty() {
            return Err(PackError::parse(source, "`default` must not be empty"));
        }
        for (idx, variant) in self.variants.iter().enumerate() {
            for (label, md) in [("startTime", variant.start), ("endTime", variant.end)] {
                if !md.is_valid() {
                    return Err(PackError::parse(
                        source,
                        format!(
                            "variant {idx}: {label} {}/{} is not a calendar day",
                            md.month, md.day
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Path of the metadata document for `pack_dir`.
pub fn metadata_path(pack_dir: &Path) -> PathBuf {
    pack_dir.join(METADATA_FILE)
}

/// Read and parse the metadata document of the pack at `pack_dir`.
pub fn load(pack_dir: &Path) -> Result<PackDescriptor, PackError> {
    let path = metadata_path(pack_dir);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PackError::NotFound { path });
        }
        Err(err) => return Err(PackError::probe(&path, err)),
    };
    PackDescriptor::from_json(&contents, &path)
}

/// Names of the packs installed under `packs_dir`, sorted.
///
/// A pack is any direct sub-folder holding a metadata document.
pub fn installed_packs(packs_dir: &Path) -> Result<Vec<String>, PackError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(packs_dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|err| PackError::probe(packs_dir, err))?;
        if !entry.file_type().is_dir() || !metadata_path(entry.path()).is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
