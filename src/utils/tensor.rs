//! Conversions between plain Rust batches and tch tensors
//!
//! The interaction loop works on `Vec<Vec<f32>>` batches (one row per
//! parallel environment); the models and updaters work on tensors. These
//! helpers are the only place the two representations meet.

use tch::{Device, Kind, Tensor};

/// Build a 2-D float tensor `[rows, row_len]` from a batch of rows
///
/// # Panics
///
/// Panics if the rows have uneven lengths or the batch is empty.
pub fn rows_to_tensor(rows: &[Vec<f32>], device: Device) -> Tensor {
    assert!(!rows.is_empty(), "cannot build a tensor from an empty batch");
    let row_len = rows[0].len();
    let mut flat = Vec::with_capacity(rows.len() * row_len);
    for row in rows {
        assert_eq!(row.len(), row_len, "uneven row lengths in batch");
        flat.extend_from_slice(row);
    }
    Tensor::from_slice(&flat)
        .view([rows.len() as i64, row_len as i64])
        .to_device(device)
}

/// Build a 1-D float tensor from a slice
pub fn slice_to_tensor(values: &[f32], device: Device) -> Tensor {
    Tensor::from_slice(values).to_device(device)
}

/// Convert a 2-D tensor back into per-row vectors
///
/// The tensor is moved to CPU and flattened; rows are recovered from the
/// trailing dimension.
pub fn tensor_to_rows(tensor: &Tensor) -> Vec<Vec<f32>> {
    let size = tensor.size();
    assert_eq!(size.len(), 2, "expected a 2-D tensor, got shape {size:?}");
    let rows = size[0] as usize;
    let cols = size[1] as usize;

    let flat = tensor_to_vec(tensor);
    let mut result = Vec::with_capacity(rows);
    for i in 0..rows {
        result.push(flat[i * cols..(i + 1) * cols].to_vec());
    }
    result
}

/// Flatten any float tensor into a `Vec<f32>`
pub fn tensor_to_vec(tensor: &Tensor) -> Vec<f32> {
    let cpu = tensor.to_device(Device::Cpu).to_kind(Kind::Float).contiguous();
    Vec::try_from(cpu.view([-1])).expect("failed to read tensor contents")
}
