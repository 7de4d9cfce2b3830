use core_types::{DataType, IndexElement, TensorDesc};
use tensor::Tensor;

use crate::args::OpArgs;
use crate::error::OpError;
use crate::op::Op;
use crate::schema::OpSchema;
use crate::types::{AnyElement, RegistrationInfo, TensorAny, TensorVisitor};
use crate::{no_gradient, register_op};

const OUTPUT_FIRST_DIM: &str = "output_first_dim";

const DOC: &str = r#"
Convert sparse representations to dense with given indices.

Transforms a sparse representation of map<id, value> represented as `indices`
vector and `values` tensor into a compacted tensor where the first dimension
is determined by the first dimension of the 3rd input if it is given or the
max index. Missing values are filled with zeros. After running this op:

    output[indices[i], :] = values[i]
    output[j, ...] = 0 if j not in indices

Values sharing an index are summed.
"#;

/// Scatters rows of `values` into a zero-filled tensor at the rows named by
/// `indices`.
pub struct SparseToDenseOp {
    output_first_dim: Option<usize>,
}

impl RegistrationInfo for SparseToDenseOp {
    const NAME: &'static str = "SparseToDense";

    fn schema() -> OpSchema {
        OpSchema::new(Self::NAME)
            .num_inputs(2, 3)
            .num_outputs(1)
            .doc(DOC)
            .input(0, "indices", "1-D int32/int64 tensor of concatenated ids of data")
            .input_dtypes(0, &[DataType::I32, DataType::I64])
            .input(1, "values", "Data tensor, first dimension has to match `indices`")
            .input(
                2,
                "data_to_infer_dim",
                "Optional: if provided, the first dimension of output is the first \
                 dimension of this tensor.",
            )
            .output(
                0,
                "output",
                "Output tensor of the same type as `values`, of shape \
                 `[rows] + shape(values)[1:]`",
            )
            .arg(
                OUTPUT_FIRST_DIM,
                "Fixed first dimension of the output when `data_to_infer_dim` is absent \
                 (0 = infer from the max index)",
            )
            .tensor_inference(infer_output)
    }

    fn from_args(args: &OpArgs) -> Result<Self, OpError> {
        Ok(Self { output_first_dim: fixed_rows(args)? })
    }
}

impl Op for SparseToDenseOp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, inputs: &[&TensorAny]) -> Result<Vec<TensorAny>, OpError> {
        let [indices, values, rest @ ..] = inputs else {
            return Err(OpError::InputArity {
                op:    Self::NAME.to_string(),
                min:   2,
                max:   3,
                found: inputs.len(),
            });
        };
        let infer_from = rest.first().copied();

        let output = match indices {
            TensorAny::I32(ids) => self.densify(ids, values, infer_from)?,
            TensorAny::I64(ids) => self.densify(ids, values, infer_from)?,
            other => {
                return Err(OpError::DtypeMismatch {
                    op:       Self::NAME.to_string(),
                    index:    0,
                    expected: vec![DataType::I32, DataType::I64],
                    found:    other.dtype(),
                });
            }
        };
        Ok(vec![output])
    }
}

impl SparseToDenseOp {
    fn densify<I: IndexElement>(
        &self,
        ids:        &Tensor<I>,
        values:     &TensorAny,
        infer_from: Option<&TensorAny>,
    ) -> Result<TensorAny, OpError> {
        check_ranks(ids.ndim(), values.shape().len())?;
        check_rows(values.shape()[0], ids.numel())?;

        let first_dim = self.first_dim(ids.data(), infer_from)?;
        values.visit(Scatter { ids: ids.data(), first_dim })
    }

    fn first_dim<I: IndexElement>(
        &self,
        ids:        &[I],
        infer_from: Option<&TensorAny>,
    ) -> Result<usize, OpError> {
        if let Some(template) = infer_from {
            return template_rows(self.output_first_dim, template.shape());
        }
        if let Some(n) = self.output_first_dim {
            return Ok(n);
        }

        let Some(max) = ids.iter().map(|i| i.to_i64()).max() else {
            return Ok(0);
        };
        if max < 0 {
            // every id is negative; report the first one
            return Err(OpError::IndexOutOfRange {
                op:       Self::NAME.to_string(),
                position: 0,
                index:    ids[0].to_i64(),
                bound:    0,
            });
        }
        usize::try_from(max)
            .ok()
            .and_then(|m| m.checked_add(1))
            .ok_or_else(|| invalid_input(format!("index {max} does not fit in memory")))
    }
}

/// Per-element-type body of the kernel
struct Scatter<'a, I> {
    ids:       &'a [I],
    first_dim: usize,
}

impl<I: IndexElement> TensorVisitor for Scatter<'_, I> {
    type Output = Result<TensorAny, OpError>;

    fn visit<T: AnyElement>(self, values: &Tensor<T>) -> Self::Output {
        let mut shape = values.shape().to_vec();
        shape[0] = self.first_dim;
        let mut output = Tensor::<T>::zeros(&shape)?;
        if self.first_dim == 0 {
            return Ok(T::into_any(output));
        }

        for (position, &id) in self.ids.iter().enumerate() {
            let index = id.to_i64();
            let row = usize::try_from(index)
                .ok()
                .filter(|&r| r < self.first_dim)
                .ok_or_else(|| OpError::IndexOutOfRange {
                    op: SparseToDenseOp::NAME.to_string(),
                    position,
                    index,
                    bound: self.first_dim,
                })?;

            let src = values.row(position)?;
            let dst = output.row_mut(row)?;
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = d.accumulate(s);
            }
        }
        Ok(T::into_any(output))
    }
}

fn infer_output(args: &OpArgs, inputs: &[TensorDesc]) -> Result<Vec<TensorDesc>, OpError> {
    let fixed = fixed_rows(args)?;
    let [indices, values, rest @ ..] = inputs else {
        return Err(invalid_input("shape inference needs indices and values"));
    };
    check_ranks(indices.ndim(), values.ndim())?;
    if let (Some(rows), Some(entries)) = (values.dims[0], indices.dims[0]) {
        check_rows(rows, entries)?;
    }

    let first = match rest.first() {
        Some(template) => template_rows(fixed, &template.dims)?,
        None => fixed,
    };
    let mut dims = vec![first];
    dims.extend(values.dims.iter().skip(1).copied());
    Ok(vec![TensorDesc { dtype: values.dtype, dims }])
}

/// Positive `output_first_dim`, if one was given
fn fixed_rows(args: &OpArgs) -> Result<Option<usize>, OpError> {
    let h = args.helper(SparseToDenseOp::NAME);
    let n = h.get_int(OUTPUT_FIRST_DIM, 0)?;
    let n = usize::try_from(n).map_err(|_| h.invalid(OUTPUT_FIRST_DIM, "must be non-negative"))?;
    Ok((n > 0).then_some(n))
}

fn check_ranks(indices: usize, values: usize) -> Result<(), OpError> {
    if indices != 1 {
        return Err(invalid_input(format!("indices must be 1-D, got {indices} dimensions")));
    }
    if values == 0 {
        return Err(invalid_input("values must have at least one dimension"));
    }
    Ok(())
}

fn check_rows(rows: usize, entries: usize) -> Result<(), OpError> {
    if rows != entries {
        return Err(invalid_input(format!(
            "values has {rows} rows but indices has {entries} entries"
        )));
    }
    Ok(())
}

/// First extent of `data_to_infer_dim`, which excludes `output_first_dim`
fn template_rows<D: Copy>(fixed: Option<usize>, dims: &[D]) -> Result<D, OpError> {
    if fixed.is_some() {
        return Err(OpError::InvalidArgument {
            op:     SparseToDenseOp::NAME.to_string(),
            arg:    OUTPUT_FIRST_DIM.to_string(),
            reason: "cannot be combined with a data_to_infer_dim input".to_string(),
        });
    }
    dims.first()
        .copied()
        .ok_or_else(|| invalid_input("data_to_infer_dim must have at least one dimension"))
}

fn invalid_input(reason: impl Into<String>) -> OpError {
    OpError::InvalidInput { op: SparseToDenseOp::NAME.to_string(), reason: reason.into() }
}

register_op!(SparseToDenseOp);
no_gradient!(SparseToDenseOp);
