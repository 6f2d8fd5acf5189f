use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::error::{LoadError, SegmentError};
use crate::models::{Keyframe, Segment, SpeedClass};

use super::store::SegmentLibrary;

#[derive(Debug, Deserialize)]
struct RawAction {
    at: f64,
    pos: f64,
}

#[derive(Debug, Deserialize)]
struct FunscriptFile {
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRecord {
    name: String,
    actions: Vec<RawAction>,
    #[serde(default)]
    intensity: Option<f64>,
    #[serde(default, alias = "speed_class")]
    speed_class: Option<SpeedClass>,
}

/// Loads a segment library from either a JSON array of segment records or a
/// directory of `.funscript` files (scanned one level deep).
pub fn load(source: &Path) -> Result<SegmentLibrary, LoadError> {
    let segments = if source.is_dir() {
        load_directory(source)?
    } else {
        load_record_file(source)?
    };

    if segments.is_empty() {
        return Err(LoadError::Empty(source.to_path_buf()));
    }

    let library = SegmentLibrary::from_segments(segments);
    let summary = library.summary();
    info!(
        "Loaded {} segments from {} (gentle={}, medium={}, intense={}, holds={}, transitions={})",
        summary.total,
        source.display(),
        summary.gentle,
        summary.medium,
        summary.intense,
        summary.holds,
        summary.transitions
    );
    Ok(library)
}

/// Loading failures are never fatal: playback continues with whatever loaded,
/// possibly nothing.
pub fn load_or_empty(source: &Path) -> SegmentLibrary {
    match load(source) {
        Ok(library) => library,
        Err(err) => {
            warn!("Segment library unavailable, continuing empty: {}", err);
            SegmentLibrary::empty()
        }
    }
}

fn load_record_file(path: &Path) -> Result<Vec<Segment>, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<SegmentRecord> =
        serde_json::from_str(&contents).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut segments = Vec::with_capacity(records.len());
    for record in records {
        let name = record.name.clone();
        match segment_from_actions(&record.name, record.actions) {
            Ok(mut segment) => {
                if let Some(intensity) = record.intensity {
                    segment = segment.with_intensity(intensity);
                }
                if let Some(speed) = record.speed_class {
                    segment = segment.with_speed_class(speed);
                }
                segments.push(segment);
            }
            Err(err) => warn!("Skipping segment {}: {}", name, err),
        }
    }
    Ok(segments)
}

fn load_directory(dir: &Path) -> Result<Vec<Segment>, LoadError> {
    let mut files = funscripts_in(dir)?;

    // Category folders (e.g. holds/, transitions/) one level down.
    for entry in read_dir_sorted(dir)? {
        if entry.is_dir() {
            match funscripts_in(&entry) {
                Ok(found) => files.extend(found),
                Err(err) => warn!("Skipping folder {}: {}", entry.display(), err),
            }
        }
    }

    let mut segments = Vec::with_capacity(files.len());
    for path in files {
        match load_funscript(&path) {
            Ok(segment) => segments.push(segment),
            Err(err) => warn!("Skipping {}: {}", path.display(), err),
        }
    }
    Ok(segments)
}

fn load_funscript(path: &Path) -> anyhow::Result<Segment> {
    let contents = fs::read_to_string(path)?;
    let script: FunscriptFile = serde_json::from_str(&contents)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(segment_from_actions(&name, script.actions)?)
}

fn segment_from_actions(name: &str, mut actions: Vec<RawAction>) -> Result<Segment, SegmentError> {
    actions.sort_by(|a, b| a.at.total_cmp(&b.at));
    let keyframes = actions
        .into_iter()
        .map(|action| Keyframe::from_raw(action.at, action.pos))
        .collect::<Result<Vec<_>, _>>()?;
    Segment::new(name, keyframes)
}

fn funscripts_in(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("funscript"))
                    .unwrap_or(false)
        })
        .collect())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}
