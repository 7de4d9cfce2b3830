use core_types::{DataType, Element, TensorDesc};
use derive_more::From;
use serde::{Deserialize, Serialize};
use tensor::{Tensor, TensorError};

use crate::args::{OpArgs, OperatorDef};
use crate::error::OpError;
use crate::schema::OpSchema;

include!("generated_tensor_any.rs");

/// Generic callback over the concrete element type held by a `TensorAny`
pub trait TensorVisitor {
    type Output;

    fn visit<T: AnyElement>(self, tensor: &Tensor<T>) -> Self::Output;
}

/// Trait to implement for each Op to work with inventory
pub trait RegistrationInfo: Sized {
    /// Unique name for the operation
    const NAME: &'static str;

    /// Static schema; built once when the registry is populated
    fn schema() -> OpSchema;

    /// Instantiate the kernel from operator arguments
    fn from_args(args: &OpArgs) -> Result<Self, OpError>;

    /// Instantiate from the full definition; ops that need their blob
    /// names override this
    fn from_def(def: &OperatorDef) -> Result<Self, OpError> {
        Self::from_args(&def.args)
    }
}

/// How an operator takes part in backward-graph construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    /// Declared as having no gradient; contributes nothing to the backward graph
    NoGradient,
    /// Asking for a gradient is a usage error
    ShouldNotDo,
}
