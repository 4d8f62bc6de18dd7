//! Dataset selections
//!
//! A selection restricts which elements of a dataset are fetched. It is
//! an ordered per-dimension specifier: a single index, a range with
//! step, or the entire dimension. The wire form matches what the remote
//! service expects (`1,0:10:2,:`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ImviewError, ImviewResult};

/// Per-dimension specifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimSlice {
    /// Single index; the dimension is dropped from the result shape
    Index(usize),
    /// Half-open range with step; `stop: None` runs to the end
    Slice {
        start: usize,
        stop: Option<usize>,
        step: usize,
    },
    /// Entire dimension
    All,
}

impl DimSlice {
    pub fn slice(start: usize, stop: usize, step: usize) -> Self {
        DimSlice::Slice {
            start,
            stop: Some(stop),
            step,
        }
    }
}

impl fmt::Display for DimSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimSlice::Index(i) => write!(f, "{i}"),
            DimSlice::All => write!(f, ":"),
            DimSlice::Slice { start, stop, step } => {
                write!(f, "{start}:")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if *step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

/// An ordered per-dimension selection
///
/// Dimensions beyond the specified ones are taken whole; an empty
/// selection selects the entire dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection(pub Vec<DimSlice>);

impl Selection {
    pub fn all() -> Self {
        Selection(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn check_rank(&self, dims: &[usize]) -> ImviewResult<()> {
        if self.0.len() > dims.len() {
            return Err(ImviewError::InvalidFormat(format!(
                "selection has {} specifiers for {} dimensions",
                self.0.len(),
                dims.len()
            )));
        }
        Ok(())
    }

    /// Shape of the selected elements: indexed dimensions are dropped,
    /// sliced dimensions shrink
    pub fn shape_of(&self, dims: &[usize]) -> ImviewResult<Vec<usize>> {
        self.check_rank(dims)?;

        let mut shape = Vec::with_capacity(dims.len());
        for (dim, len) in dims.iter().enumerate() {
            match self.0.get(dim) {
                Some(DimSlice::Index(i)) => {
                    if i >= len {
                        return Err(ImviewError::InvalidFormat(format!(
                            "index {i} out of bounds for dimension {dim} of size {len}"
                        )));
                    }
                }
                Some(DimSlice::Slice { start, stop, step }) => {
                    shape.push(slice_len(*start, *stop, *step, *len)?);
                }
                Some(DimSlice::All) | None => shape.push(*len),
            }
        }
        Ok(shape)
    }

    /// Selected indices per dimension, in order
    ///
    /// The row-major cartesian product of these lists enumerates the
    /// selected elements; indexed dimensions contribute one entry each.
    pub fn dim_indices(&self, dims: &[usize]) -> ImviewResult<Vec<Vec<usize>>> {
        self.check_rank(dims)?;

        let mut indices = Vec::with_capacity(dims.len());
        for (dim, len) in dims.iter().enumerate() {
            match self.0.get(dim) {
                Some(DimSlice::Index(i)) => {
                    if i >= len {
                        return Err(ImviewError::InvalidFormat(format!(
                            "index {i} out of bounds for dimension {dim} of size {len}"
                        )));
                    }
                    indices.push(vec![*i]);
                }
                Some(DimSlice::Slice { start, stop, step }) => {
                    slice_len(*start, *stop, *step, *len)?;
                    let stop = stop.unwrap_or(*len).min(*len);
                    indices.push((*start..stop).step_by(*step).collect());
                }
                Some(DimSlice::All) | None => indices.push((0..*len).collect()),
            }
        }
        Ok(indices)
    }
}

fn slice_len(start: usize, stop: Option<usize>, step: usize, len: usize) -> ImviewResult<usize> {
    if step == 0 {
        return Err(ImviewError::InvalidFormat(
            "slice step must be non-zero".to_string(),
        ));
    }
    let stop = stop.unwrap_or(len).min(len);
    if stop <= start {
        return Ok(0);
    }
    Ok((stop - start).div_ceil(step))
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(DimSlice::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}
