use crate::args::OperatorDef;
use crate::error::OpError;
use crate::schema::OpSchema;
use crate::types::{GradientKind, RegistrationInfo, TensorAny};


/// Trait to implement for each Op
pub trait Op: Send + Sync {
    /// Registered operator name
    fn name(&self) -> &'static str;

    /// Compute the outputs from already schema-checked inputs
    fn run(&self, inputs: &[&TensorAny]) -> Result<Vec<TensorAny>, OpError>;

    /// Pair each output with the blob name it is stored under.
    ///
    /// `names` is the output list of the operator definition. Ops that only
    /// learn their output names while running (`Load` with `load_all`)
    /// override this.
    fn run_named(
        &self,
        inputs: &[&TensorAny],
        names:  &[String],
    ) -> Result<Vec<(String, TensorAny)>, OpError> {
        let outputs = self.run(inputs)?;
        if outputs.len() != names.len() {
            return Err(OpError::OutputNames {
                op:       self.name().to_string(),
                produced: outputs.len(),
                names:    names.len(),
            });
        }
        Ok(names.iter().cloned().zip(outputs).collect())
    }
}

/// Builds a kernel instance from its operator definition
pub type OpCreator = fn(&OperatorDef) -> Result<Box<dyn Op>, OpError>;

/// Wrapper for op factory functions
pub struct OpFactory {
    pub name:    &'static str,
    pub schema:  fn() -> OpSchema,
    pub factory: OpCreator,
}

/// Gradient declaration submitted next to an operator
pub struct GradientRegistration {
    pub name: &'static str,
    pub kind: GradientKind,
}

/// Boxing constructor used by `register_op!`
pub fn build_op<O>(def: &OperatorDef) -> Result<Box<dyn Op>, OpError>
where
    O: RegistrationInfo + Op + 'static,
{
    Ok(Box::new(O::from_def(def)?))
}

// Collect all registered ops
inventory::collect!(OpFactory);
inventory::collect!(GradientRegistration);
