//! Mean/variance normalization statistics.
//!
//! Parses the Kaldi-style text resource shipped with the acoustic model: an
//! `<AddShift>` section carrying per-dimension negative means and a
//! `<Rescale>` section carrying per-dimension inverse standard deviations,
//! each on a `<LearnRateCoef> ... [ values ]` payload line.

use crate::error::{Result, VadError};
use std::fs;
use std::path::Path;

/// Per-dimension shift/scale vectors, parsed once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct CmvnStats {
    /// Added to each feature value (negative mean).
    pub shift: Vec<f32>,
    /// Multiplied into each feature value (inverse stddev).
    pub scale: Vec<f32>,
}

impl CmvnStats {
    /// Identity stats: zero shift, unit scale.
    pub fn identity(dim: usize) -> Self {
        Self {
            shift: vec![0.0; dim],
            scale: vec![1.0; dim],
        }
    }

    /// Load stats from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VadError::CmvnFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VadError::Io(e)
            }
        })?;
        Self::parse(&contents)
    }

    /// Parse stats from the text resource format.
    pub fn parse(contents: &str) -> Result<Self> {
        #[derive(PartialEq)]
        enum Section {
            None,
            Shift,
            Scale,
        }

        let mut section = Section::None;
        let mut shift: Option<Vec<f32>> = None;
        let mut scale: Option<Vec<f32>> = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.starts_with("<AddShift>") {
                section = Section::Shift;
                continue;
            }
            if line.starts_with("<Rescale>") {
                section = Section::Scale;
                continue;
            }
            if line.starts_with("<LearnRateCoef>") && section != Section::None {
                let values = parse_bracketed_values(line)?;
                match section {
                    Section::Shift => shift = Some(values),
                    Section::Scale => scale = Some(values),
                    Section::None => unreachable!(),
                }
            }
        }

        let shift = shift.ok_or_else(|| VadError::CmvnParse {
            message: "missing <AddShift> section".to_string(),
        })?;
        let scale = scale.ok_or_else(|| VadError::CmvnParse {
            message: "missing <Rescale> section".to_string(),
        })?;
        if shift.len() != scale.len() {
            return Err(VadError::DimensionMismatch {
                context: "CMVN shift vs scale".to_string(),
                expected: shift.len(),
                actual: scale.len(),
            });
        }
        if shift.is_empty() {
            return Err(VadError::CmvnParse {
                message: "empty statistics vectors".to_string(),
            });
        }
        Ok(Self { shift, scale })
    }

    /// Number of dimensions the stats cover.
    pub fn dim(&self) -> usize {
        self.shift.len()
    }

    /// Normalize stacked frames of width `dim * copies` in place.
    ///
    /// Stats of the full frame width apply directly; stats of sub-frame
    /// width `dim` broadcast across all stacked copies. Any other width is
    /// a dimensional inconsistency surfaced before inference.
    pub fn apply(&self, frames: &mut [Vec<f32>], frame_dim: usize) -> Result<()> {
        if self.dim() != frame_dim && frame_dim % self.dim() != 0 {
            return Err(VadError::DimensionMismatch {
                context: "CMVN statistics vs feature frame".to_string(),
                expected: frame_dim,
                actual: self.dim(),
            });
        }
        for frame in frames.iter_mut() {
            if frame.len() != frame_dim {
                return Err(VadError::DimensionMismatch {
                    context: "feature frame width".to_string(),
                    expected: frame_dim,
                    actual: frame.len(),
                });
            }
            for (k, value) in frame.iter_mut().enumerate() {
                let d = k % self.dim();
                *value = (*value + self.shift[d]) * self.scale[d];
            }
        }
        Ok(())
    }
}

fn parse_bracketed_values(line: &str) -> Result<Vec<f32>> {
    let open = line.find('[').ok_or_else(|| VadError::CmvnParse {
        message: format!("missing '[' in payload line: {line}"),
    })?;
    let close = line.rfind(']').ok_or_else(|| VadError::CmvnParse {
        message: format!("missing ']' in payload line: {line}"),
    })?;
    if close <= open {
        return Err(VadError::CmvnParse {
            message: "malformed bracketed payload".to_string(),
        });
    }
    line[open + 1..close]
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f32>().map_err(|_| VadError::CmvnParse {
                message: format!("invalid float: {tok}"),
            })
        })
        .collect()
}
