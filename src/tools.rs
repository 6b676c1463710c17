//! External tool capabilities.
//!
//! Some enrichment steps shell out to binaries that may not be installed.
//! Each binary sits behind a small trait so the pipeline never branches on
//! "is the tool there": when `exiftool` is missing, [`detect_metadata_tool`]
//! hands out a [`NoopTool`] and the dependent steps quietly do nothing.
//!
//! | Capability | Trait | Binary |
//! |---|---|---|
//! | Maker-specific tags as JSON | [`MetadataTool::read_tags`] | `exiftool -j` |
//! | Embedded raw preview | [`MetadataTool::extract_preview`] | `exiftool -b -PreviewImage` |
//! | Tag writing / scrubbing | [`MetadataTool::write_tags`], [`MetadataTool::scrub`] | `exiftool -overwrite_original` |
//! | Lossless JPEG rotation | [`RotateTool`] | `jpegtran` |

use crate::format::{self, Distance};
use crate::metadata::Rotation;
use crate::types::Details;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0} is not installed")]
    NotInstalled(&'static str),
    #[error("{tool} failed: {message}")]
    Failed { tool: &'static str, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tags requested from exiftool. A trailing `#` asks for the numeric value
/// instead of the printed one.
const SECONDARY_TAGS: &[&str] = &[
    "-Flash",
    "-Software",
    "-FocusMode",
    "-SubjectDistance#",
    "-FocusDistanceLower#",
    "-FocusDistanceUpper#",
    "-MeasuredEV#",
    "-LightValue#",
    "-ScaleFactor35efl#",
];

/// Tags preserved when scrubbing: needed to keep the gallery ordered and upright.
const SCRUB_KEEP: &[&str] = &["-Orientation", "-DateTimeOriginal"];

/// Secondary fields only the external metadata tool knows about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolTags {
    pub flash: Option<String>,
    /// Meters.
    pub subject_distance: Option<f64>,
    pub focus_near: Option<Distance>,
    pub focus_far: Option<Distance>,
    pub software: Option<String>,
    pub focus_mode: Option<String>,
    pub measured_ev: Option<f64>,
    pub light_value: Option<f64>,
    pub crop_factor: Option<f64>,
}

impl ToolTags {
    /// Parse `exiftool -j` output (a one-element JSON array of tag maps).
    pub fn from_json(json: &str) -> Result<Self, ToolError> {
        let mut entries: Vec<HashMap<String, Value>> = serde_json::from_str(json)?;
        let Some(tags) = entries.pop() else {
            return Ok(Self::default());
        };

        let text = |key: &str| -> Option<String> {
            match tags.get(key)? {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
            .filter(|s| !s.is_empty())
        };
        let number = |key: &str| -> Option<f64> {
            match tags.get(key)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }
        };
        let distance = |key: &str| -> Option<Distance> {
            match tags.get(key)? {
                Value::String(s) if s.trim().eq_ignore_ascii_case("inf") => {
                    Some(Distance::Infinite)
                }
                _ => number(key).map(|m| {
                    if m.is_finite() {
                        Distance::Meters(m)
                    } else {
                        Distance::Infinite
                    }
                }),
            }
        };

        Ok(Self {
            flash: text("Flash"),
            subject_distance: number("SubjectDistance").filter(|m| *m > 0.0),
            focus_near: distance("FocusDistanceLower"),
            focus_far: distance("FocusDistanceUpper"),
            software: text("Software"),
            focus_mode: text("FocusMode"),
            measured_ev: number("MeasuredEV").filter(|v| v.is_finite()),
            light_value: number("LightValue").filter(|v| v.is_finite()),
            crop_factor: number("ScaleFactor35efl").filter(|v| v.is_finite() && *v > 0.0),
        })
    }

    /// Write the formatted secondary fragments into `details`.
    pub fn fill_details(&self, details: &mut Details) {
        details.flash = self.flash.clone();
        details.subject_distance = self.subject_distance.map(format::subject_distance);
        details.focus_range = match (self.focus_near, self.focus_far) {
            (Some(near), Some(far)) => Some(format::focus_range(near, far)),
            _ => None,
        };
        details.software = self.software.clone();
        details.focus_mode = self.focus_mode.clone();
        details.exposure_value = self.measured_ev.map(format::exposure_value);
        details.light_value = self.light_value.map(format::light_value);
    }
}

/// Detailed-metadata capability: read maker tags, pull previews, rewrite tags.
pub trait MetadataTool {
    fn name(&self) -> &'static str;

    fn read_tags(&self, path: &Path) -> Result<ToolTags, ToolError>;

    /// Write the largest embedded JPEG preview of `source` to `dest`.
    fn extract_preview(&self, source: &Path, dest: &Path) -> Result<(), ToolError>;

    /// Set tags in place, e.g. `[("Copyright", "© 2024 A. Person")]`.
    fn write_tags(&self, path: &Path, tags: &[(&str, &str)]) -> Result<(), ToolError>;

    /// Remove all metadata in place except orientation and capture time.
    fn scrub(&self, path: &Path) -> Result<(), ToolError>;

    /// Copy every tag of `from` onto `to`.
    fn copy_tags(&self, from: &Path, to: &Path) -> Result<(), ToolError>;
}

/// Run a command, mapping a missing binary and a non-zero exit to [`ToolError`].
fn run(command: &mut Command, tool: &'static str) -> Result<Vec<u8>, ToolError> {
    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotInstalled(tool)
        } else {
            ToolError::Io(e)
        }
    })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// The `exiftool` binary.
pub struct ExifTool {
    binary: PathBuf,
}

impl ExifTool {
    /// Probe for `exiftool` on the `PATH`.
    pub fn detect() -> Option<Self> {
        Self::detect_at(PathBuf::from("exiftool"))
    }

    pub fn detect_at(binary: PathBuf) -> Option<Self> {
        let version = run(Command::new(&binary).arg("-ver"), "exiftool").ok()?;
        debug!(
            version = %String::from_utf8_lossy(&version).trim(),
            "found exiftool"
        );
        Some(Self { binary })
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }
}

impl MetadataTool for ExifTool {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    fn read_tags(&self, path: &Path) -> Result<ToolTags, ToolError> {
        let stdout = run(
            self.command().arg("-j").args(SECONDARY_TAGS).arg(path),
            "exiftool",
        )?;
        ToolTags::from_json(&String::from_utf8_lossy(&stdout))
    }

    fn extract_preview(&self, source: &Path, dest: &Path) -> Result<(), ToolError> {
        for tag in ["-PreviewImage", "-JpgFromRaw"] {
            let bytes = run(self.command().arg("-b").arg(tag).arg(source), "exiftool")?;
            if !bytes.is_empty() {
                std::fs::write(dest, bytes)?;
                return Ok(());
            }
        }
        Err(ToolError::Failed {
            tool: "exiftool",
            message: format!("no embedded preview in {}", source.display()),
        })
    }

    fn write_tags(&self, path: &Path, tags: &[(&str, &str)]) -> Result<(), ToolError> {
        let mut command = self.command();
        command.arg("-overwrite_original");
        for (tag, value) in tags {
            command.arg(format!("-{}={}", tag, value));
        }
        run(command.arg(path), "exiftool").map(|_| ())
    }

    fn scrub(&self, path: &Path) -> Result<(), ToolError> {
        run(
            self.command()
                .args(["-overwrite_original", "-all=", "-tagsfromfile", "@"])
                .args(SCRUB_KEEP)
                .arg(path),
            "exiftool",
        )
        .map(|_| ())
    }

    fn copy_tags(&self, from: &Path, to: &Path) -> Result<(), ToolError> {
        run(
            self.command()
                .args(["-overwrite_original", "-tagsfromfile"])
                .arg(from)
                .arg("-all:all")
                .arg(to),
            "exiftool",
        )
        .map(|_| ())
    }
}

/// Stand-in when no metadata tool is installed.
///
/// Reading yields no secondary tags; every write is refused.
pub struct NoopTool;

impl MetadataTool for NoopTool {
    fn name(&self) -> &'static str {
        "none"
    }

    fn read_tags(&self, _path: &Path) -> Result<ToolTags, ToolError> {
        Ok(ToolTags::default())
    }

    fn extract_preview(&self, _source: &Path, _dest: &Path) -> Result<(), ToolError> {
        Err(ToolError::NotInstalled("exiftool"))
    }

    fn write_tags(&self, _path: &Path, _tags: &[(&str, &str)]) -> Result<(), ToolError> {
        Err(ToolError::NotInstalled("exiftool"))
    }

    fn scrub(&self, _path: &Path) -> Result<(), ToolError> {
        Err(ToolError::NotInstalled("exiftool"))
    }

    fn copy_tags(&self, _from: &Path, _to: &Path) -> Result<(), ToolError> {
        Err(ToolError::NotInstalled("exiftool"))
    }
}

/// Pick the real metadata tool if installed, else the no-op.
pub fn detect_metadata_tool() -> Box<dyn MetadataTool> {
    match ExifTool::detect() {
        Some(tool) => Box::new(tool),
        None => {
            info!("exiftool not found; secondary metadata and raw previews disabled");
            Box::new(NoopTool)
        }
    }
}

/// Lossless in-place rotation of a JPEG file.
pub trait RotateTool {
    fn rotate_in_place(&self, path: &Path, rotation: Rotation) -> Result<(), ToolError>;
}

/// The `jpegtran` binary from libjpeg.
pub struct Jpegtran;

impl RotateTool for Jpegtran {
    fn rotate_in_place(&self, path: &Path, rotation: Rotation) -> Result<(), ToolError> {
        let tmp = path.with_extension("rotating.jpg");
        let degrees = rotation.clockwise_degrees().to_string();
        run(
            Command::new("jpegtran")
                .args(["-copy", "all", "-rotate", &degrees, "-outfile"])
                .arg(&tmp)
                .arg(path),
            "jpegtran",
        )?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
