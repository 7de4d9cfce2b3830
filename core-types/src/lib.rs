use std::fmt;

include!("generated_data_types.rs");

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a tensor used by schema checks and shape inference.
///
/// A `None` extent means the dimension cannot be known before the kernel runs
/// (e.g. a row count that depends on the largest id in the data).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorDesc {
    pub dtype: DataType,
    pub dims:  Vec<Option<usize>>,
}

impl TensorDesc {
    /// Descriptor with every extent known
    pub fn known(dtype: DataType, shape: &[usize]) -> Self {
        Self { dtype, dims: shape.iter().copied().map(Some).collect() }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Extent of dimension `i`; `None` if unknown or out of range
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.dims.get(i).copied().flatten()
    }

    pub fn is_fully_known(&self) -> bool {
        self.dims.iter().all(Option::is_some)
    }

    /// Concrete shape, if every extent is known
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.dims.iter().copied().collect()
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match d {
                Some(n) => write!(f, "{n}")?,
                None => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}
