mod utils;

use bytemuck::Zeroable;
use core_types::{DataType, Element, TensorDesc};
use thiserror::Error;

pub use utils::compute_strides;

/// Errors raised while building or slicing a tensor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TensorError {
    #[error("buffer of {found} elements does not fit shape {shape:?} ({expected} elements)")]
    LengthMismatch { shape: Vec<usize>, expected: usize, found: usize },

    #[error("cannot take row {row} of a tensor with shape {shape:?}")]
    NotIndexable { shape: Vec<usize>, row: usize },

    #[error("shape {shape:?} is too large to allocate")]
    TooLarge { shape: Vec<usize> },
}

/// Dense row-major tensor owning its host buffer
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor<T: Element> {
    data:    Vec<T>,
    shape:   Vec<usize>,
    strides: Vec<usize>,
}

impl<T: Element> Tensor<T> {
    /* --------------------------------------------------------------------- */
    /* Constructors                                                          */
    /* --------------------------------------------------------------------- */

    /// Allocate a zero-filled tensor.
    ///
    /// Fails without allocating when the element count overflows or the
    /// buffer cannot be reserved.
    pub fn zeros(shape: &[usize]) -> Result<Self, TensorError> {
        let (strides, elem_count) = layout(shape)?;
        let mut data = Vec::new();
        data.try_reserve_exact(elem_count)
            .map_err(|_| TensorError::TooLarge { shape: shape.to_vec() })?;
        data.resize(elem_count, T::zeroed());
        Ok(Tensor { data, shape: shape.to_vec(), strides })
    }

    /// Wrap an existing buffer; its length must match the shape.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self, TensorError> {
        let (strides, expected) = layout(shape)?;
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                shape: shape.to_vec(),
                expected,
                found: data.len(),
            });
        }
        Ok(Tensor { data, shape: shape.to_vec(), strides })
    }

    /// 0-d tensor holding a single value
    pub fn scalar(value: T) -> Self {
        Tensor { data: vec![value], shape: Vec::new(), strides: Vec::new() }
    }

    /* --------------------------------------------------------------------- */
    /* Accessors                                                             */
    /* --------------------------------------------------------------------- */

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Extent of dimension `i`
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.shape.get(i).copied()
    }

    /// Number of elements in one slice taken at dimension `k`,
    /// i.e. the product of `shape[k..]` (1 past the last dimension).
    pub fn size_from_dim(&self, k: usize) -> usize {
        match k {
            0 => self.data.len(),
            // strides[k - 1] is already the product of shape[k..]
            k => self.strides.get(k - 1).copied().unwrap_or(1),
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// The tensor’s DataType
    pub fn dtype(&self) -> DataType {
        T::DTYPE
    }

    pub fn desc(&self) -> TensorDesc {
        TensorDesc::known(T::DTYPE, &self.shape)
    }

    /// Contiguous block holding the `row`-th entry along dimension 0
    pub fn row(&self, row: usize) -> Result<&[T], TensorError> {
        let (start, len) = self.row_span(row)?;
        Ok(&self.data[start..start + len])
    }

    pub fn row_mut(&mut self, row: usize) -> Result<&mut [T], TensorError> {
        let (start, len) = self.row_span(row)?;
        Ok(&mut self.data[start..start + len])
    }

    fn row_span(&self, row: usize) -> Result<(usize, usize), TensorError> {
        match self.shape.first() {
            Some(&rows) if row < rows => {
                let len = self.size_from_dim(1);
                let start = row
                    .checked_mul(len)
                    .ok_or_else(|| TensorError::TooLarge { shape: self.shape.clone() })?;
                Ok((start, len))
            }
            _ => Err(TensorError::NotIndexable { shape: self.shape.clone(), row }),
        }
    }
}

/// Strides and element count, or `TooLarge` if the shape overflows `usize`
fn layout(shape: &[usize]) -> Result<(Vec<usize>, usize), TensorError> {
    compute_strides(shape).ok_or_else(|| TensorError::TooLarge { shape: shape.to_vec() })
}

/* ------------------------------------------------------------------------- */
/*                                     Tests                                 */
/* ------------------------------------------------------------------------- */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_dtype_and_layout() {
        let t: Tensor<f32> = Tensor::zeros(&[2, 3, 4]).unwrap();

        assert_eq!(t.dtype(), DataType::F32);
        assert_eq!(t.shape(), &[2, 3, 4]);
        assert_eq!(t.strides(), &[12, 4, 1]);
        assert_eq!(t.numel(), 24);
        assert!(t.data().iter().all(|&v| v == 0.0));
        assert_eq!(t.desc(), TensorDesc::known(DataType::F32, &[2, 3, 4]));
    }

    #[test]
    fn test_from_vec_checks_length() {
        let t = Tensor::from_vec(vec![1i64, 2, 3, 4], &[2, 2]).unwrap();
        assert_eq!(t.dtype(), DataType::I64);
        assert_eq!(t.clone().into_vec(), vec![1, 2, 3, 4]);

        let err = Tensor::from_vec(vec![1i32, 2, 3], &[2, 2]).unwrap_err();
        assert_eq!(
            err,
            TensorError::LengthMismatch { shape: vec![2, 2], expected: 4, found: 3 }
        );
    }

    #[test]
    fn test_rows_and_block_sizes() {
        let mut t = Tensor::from_vec((0..12).map(|v| v as f64).collect(), &[3, 2, 2]).unwrap();
        assert_eq!(t.size_from_dim(1), 4);
        assert_eq!(t.size_from_dim(3), 1);
        assert_eq!(t.row(1).unwrap(), &[4.0, 5.0, 6.0, 7.0]);

        t.row_mut(2).unwrap()[0] = -1.0;
        assert_eq!(t.data()[8], -1.0);

        assert!(matches!(t.row(3), Err(TensorError::NotIndexable { row: 3, .. })));
        assert!(Tensor::scalar(1i32).row(0).is_err());
    }

    #[test]
    fn test_empty_first_dimension() {
        let t: Tensor<i32> = Tensor::zeros(&[0, 5]).unwrap();
        assert_eq!(t.numel(), 0);
        assert_eq!(t.dim(0), Some(0));
        assert_eq!(t.dim(2), None);
        assert_eq!(t.size_from_dim(0), 0);
        assert_eq!(t.size_from_dim(1), 5);
        assert_eq!(Tensor::scalar(3i64).size_from_dim(0), 1);
    }

    #[test]
    fn test_oversized_shapes_are_errors() {
        let err = Tensor::<f32>::zeros(&[(1 << 62) + 1, 4]).unwrap_err();
        assert_eq!(err, TensorError::TooLarge { shape: vec![(1 << 62) + 1, 4] });

        // element count fits in usize but the byte size does not
        let err = Tensor::<f32>::zeros(&[(1 << 61) + 1, 1]).unwrap_err();
        assert!(matches!(err, TensorError::TooLarge { .. }));

        let err = Tensor::from_vec(vec![0i64], &[usize::MAX, 2]).unwrap_err();
        assert!(matches!(err, TensorError::TooLarge { .. }));
    }
}
