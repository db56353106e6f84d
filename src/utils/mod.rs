//! Utility functions and helpers

mod tensor;

pub use tensor::{rows_to_tensor, slice_to_tensor, tensor_to_rows, tensor_to_vec};
