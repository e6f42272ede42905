//! Batch-shape bookkeeping shared by vectors, phase-space positions and dispatch

use crate::error::{Error, Result};
use ndarray::{ArrayD, Axis, IxDyn};

/// Broadcast two batch shapes with the usual trailing-axis alignment rules
pub fn broadcast_shapes(left: &[usize], right: &[usize]) -> Result<Vec<usize>> {
    let ndim = left.len().max(right.len());
    let axis = |shape: &[usize], i: usize| {
        let offset = ndim - shape.len();
        if i < offset { 1 } else { shape[i - offset] }
    };

    (0..ndim)
        .map(|i| match (axis(left, i), axis(right, i)) {
            (l, r) if l == r => Ok(l),
            (1, r) => Ok(r),
            (l, 1) => Ok(l),
            _ => Err(Error::Broadcast {
                left: left.to_vec(),
                right: right.to_vec(),
            }),
        })
        .collect()
}

/// The batch part of a shape whose trailing axis must have length `trailing`
pub fn batch_shape(shape: &[usize], trailing: usize) -> Result<&[usize]> {
    match shape.split_last() {
        Some((&last, batch)) if last == trailing => Ok(batch),
        _ => Err(Error::Shape {
            expected: trailing,
            shape: shape.to_vec(),
        }),
    }
}

/// Materialize `array` at `shape`, failing if the shapes do not broadcast
pub fn broadcast_to<A: Clone>(array: &ArrayD<A>, shape: &[usize]) -> Result<ArrayD<A>> {
    array
        .broadcast(IxDyn(shape))
        .map(|view| view.to_owned())
        .ok_or_else(|| Error::Broadcast {
            left: array.shape().to_vec(),
            right: shape.to_vec(),
        })
}

/// Prepend unit axes until `array` has rank `ndim`
pub fn expand_leading<A>(mut array: ArrayD<A>, ndim: usize) -> ArrayD<A> {
    while array.ndim() < ndim {
        array = array.insert_axis(Axis(0));
    }
    array
}

/// Number of elements in a batch of the given shape
pub fn batch_len(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// `shape` with `extra` axes appended
pub fn with_trailing(shape: &[usize], extra: &[usize]) -> Vec<usize> {
    shape.iter().chain(extra).copied().collect()
}

/// Bounds check for indexing the leading batch axis
pub(crate) fn check_index(shape: &[usize], index: usize) -> Result<()> {
    match shape.first() {
        None => Err(Error::Array(
            "cannot index along the batch axis of a scalar batch".to_string(),
        )),
        Some(&len) if index >= len => Err(Error::Array(format!(
            "index {index} is out of bounds for a batch axis of length {len}"
        ))),
        Some(_) => Ok(()),
    }
}

/// Bounds check for slicing the leading batch axis
pub(crate) fn check_range(shape: &[usize], range: &std::ops::Range<usize>) -> Result<()> {
    match shape.first() {
        None => Err(Error::Array(
            "cannot slice along the batch axis of a scalar batch".to_string(),
        )),
        Some(&len) if range.start > range.end || range.end > len => Err(Error::Array(format!(
            "range {range:?} is out of bounds for a batch axis of length {len}"
        ))),
        Some(_) => Ok(()),
    }
}
