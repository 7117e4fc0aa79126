//! Fixed-shape state buffers.
//!
//! Observations cross the binding boundary as flat `f64` buffers plus explicit
//! shape metadata. [`StateShape`] is the configured logical shape; it
//! reconstructs and validates incoming buffers before the agent copies them
//! into owned arrays. Networks always see the flattened form, one row per
//! state in a batch.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, RlPackError};

/// Logical shape of a single observation, fixed at agent construction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct StateShape {
    dims: Vec<usize>,
}

impl TryFrom<Vec<usize>> for StateShape {
    type Error = RlPackError;

    fn try_from(dims: Vec<usize>) -> Result<Self> {
        StateShape::new(dims)
    }
}

impl From<StateShape> for Vec<usize> {
    fn from(shape: StateShape) -> Self {
        shape.dims
    }
}

impl StateShape {
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(RlPackError::configuration(
                "state_shape",
                "State shape must have at least one dimension",
            ));
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(RlPackError::configuration(
                "state_shape".to_string(),
                format!("All dimensions must be positive, got {:?}", dims),
            ));
        }
        if dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)).is_none() {
            return Err(RlPackError::configuration(
                "state_shape".to_string(),
                format!("Element count of {:?} overflows usize", dims),
            ));
        }
        Ok(StateShape { dims })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of scalars in one flattened observation; cannot overflow, since
    /// `new` rejects such shapes.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Whether caller-supplied shape metadata describes this shape.
    ///
    /// A single leading batch axis of size 1 is accepted, since callers
    /// evaluating one state often pass it batched.
    pub fn matches(&self, shape: &[usize]) -> bool {
        if shape == self.dims.as_slice() {
            return true;
        }
        shape.len() == self.dims.len() + 1 && shape[0] == 1 && &shape[1..] == self.dims.as_slice()
    }

    /// Rebuild an owned, flattened observation from a caller buffer.
    ///
    /// Fails with `ShapeMismatch` when the metadata disagrees with the
    /// configured shape, when the buffer length disagrees with the metadata,
    /// or when the buffer holds non-finite values.
    pub fn reconstruct(&self, data: &[f64], shape: &[usize]) -> Result<Array1<f64>> {
        if !self.matches(shape) {
            return Err(RlPackError::shape_mismatch(
                self.to_string(),
                format_dims(shape),
            ));
        }
        let declared: usize = shape.iter().product();
        if data.len() != declared {
            return Err(RlPackError::shape_mismatch(
                format!("{} values for shape {}", declared, format_dims(shape)),
                format!("{} values", data.len()),
            ));
        }
        if let Some(idx) = data.iter().position(|v| !v.is_finite()) {
            return Err(RlPackError::shape_mismatch(
                "finite values".to_string(),
                format!("{} at index {}", data[idx], idx),
            ));
        }
        Ok(Array1::from(data.to_vec()))
    }
}

impl fmt::Display for StateShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_dims(&self.dims))
    }
}

fn format_dims(dims: &[usize]) -> String {
    let inner = dims
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

/// Stack flattened states into a `[batch, features]` matrix
pub fn stack_states<'a, I>(states: I, num_features: usize) -> Array2<f64>
where
    I: ExactSizeIterator<Item = &'a Array1<f64>>,
{
    let mut batch = Array2::zeros((states.len(), num_features));
    for (mut row, state) in batch.rows_mut().into_iter().zip(states) {
        row.assign(state);
    }
    batch
}

/// Whether every value in an iterator is finite
pub fn all_finite<'a, I>(values: I) -> bool
where
    I: IntoIterator<Item = &'a f64>,
{
    values.into_iter().all(|v| v.is_finite())
}
