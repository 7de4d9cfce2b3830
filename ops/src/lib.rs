pub mod args;
pub mod builtin;
pub mod db;
pub mod error;
pub mod op;
pub mod schema;
pub mod types;

use std::collections::HashMap;
use std::sync::OnceLock;

use core_types::TensorDesc;
use tracing::{debug, trace, warn};

pub use args::{Argument, ArgumentHelper, NetDef, OpArgs, OperatorDef};
pub use db::BlobDb;
pub use error::{ConfigError, OpError};
pub use op::{GradientRegistration, Op, OpCreator, OpFactory};
pub use schema::{OpSchema, SlotDoc};
pub use types::{AnyElement, GradientKind, RegistrationInfo, TensorAny, TensorData, TensorVisitor};

#[doc(hidden)]
pub use inventory;


/// Register an operation (kernel factory + schema) with the inventory system
#[macro_export]
macro_rules! register_op {
    ($op_type:ty) => {
        $crate::inventory::submit! {
            $crate::OpFactory {
                name:    <$op_type as $crate::RegistrationInfo>::NAME,
                schema:  <$op_type as $crate::RegistrationInfo>::schema,
                factory: $crate::op::build_op::<$op_type>,
            }
        }
    };
}

/// Declare that an operation has no gradient
#[macro_export]
macro_rules! no_gradient {
    ($op_type:ty) => {
        $crate::inventory::submit! {
            $crate::GradientRegistration {
                name: <$op_type as $crate::RegistrationInfo>::NAME,
                kind: $crate::GradientKind::NoGradient,
            }
        }
    };
}

/// Declare that asking for an operation's gradient is a usage error
#[macro_export]
macro_rules! should_not_do_gradient {
    ($op_type:ty) => {
        $crate::inventory::submit! {
            $crate::GradientRegistration {
                name: <$op_type as $crate::RegistrationInfo>::NAME,
                kind: $crate::GradientKind::ShouldNotDo,
            }
        }
    };
}


struct OpEntry {
    schema:  OpSchema,
    factory: OpCreator,
}

/// Holds all registered ops, validates arity & dtypes against their schema, then runs them
#[derive(Default)]
pub struct OpRegistry {
    ops:       HashMap<String, OpEntry>,
    gradients: HashMap<String, GradientKind>,
}

static GLOBAL: OnceLock<OpRegistry> = OnceLock::new();

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, populated from the inventory on first use
    pub fn global() -> &'static OpRegistry {
        GLOBAL.get_or_init(|| {
            let mut reg = OpRegistry::new();
            reg.collect_inventory();
            reg
        })
    }

    pub fn collect_inventory(&mut self) {
        for factory in inventory::iter::<OpFactory> {
            let schema = (factory.schema)();
            if let Err(error) = self.register_factory(factory.name, schema, factory.factory) {
                warn!(%error, "skipping operator registration");
            }
        }
        for grad in inventory::iter::<GradientRegistration> {
            self.declare_gradient(grad.name, grad.kind);
        }
        builtin::install(self);
        debug!(
            ops = self.ops.len(),
            gradients = self.gradients.len(),
            "collected operator inventory"
        );
    }

    /// Register an op type by hand
    pub fn register<O: RegistrationInfo + Op + 'static>(&mut self) -> Result<(), OpError> {
        self.register_factory(O::NAME, O::schema(), op::build_op::<O>)
    }

    /// Register a factory and its schema under `name`; names are unique
    pub fn register_factory(
        &mut self,
        name:    &str,
        schema:  OpSchema,
        factory: OpCreator,
    ) -> Result<(), OpError> {
        if self.ops.contains_key(name) {
            return Err(OpError::DuplicateOp(name.to_string()));
        }
        if schema.name() != name {
            warn!(op = name, schema = schema.name(), "schema registered under a different name");
        }
        trace!(op = name, "registered operator");
        self.ops.insert(name.to_string(), OpEntry { schema, factory });
        Ok(())
    }

    pub fn declare_gradient(&mut self, name: &str, kind: GradientKind) {
        if let Some(prev) = self.gradients.insert(name.to_string(), kind) {
            if prev != kind {
                warn!(op = name, ?prev, ?kind, "gradient declaration replaced");
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Registered operator names, sorted
    pub fn op_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn schema(&self, name: &str) -> Option<&OpSchema> {
        self.ops.get(name).map(|e| &e.schema)
    }

    fn entry(&self, name: &str) -> Result<&OpEntry, OpError> {
        self.ops.get(name).ok_or_else(|| OpError::UnknownOp(name.to_string()))
    }

    /// Instantiate a kernel from its definition
    pub fn create_op(&self, def: &OperatorDef) -> Result<Box<dyn Op>, OpError> {
        let entry = self.entry(&def.op_type)?;
        (entry.factory)(def)
    }

    /// Validate inputs against the op's schema, run it and check the output count
    pub fn run_op(&self, op: &dyn Op, inputs: &[&TensorAny]) -> Result<Vec<TensorAny>, OpError> {
        let schema = self.verify_inputs(op, inputs)?;
        let outputs = op.run(inputs)?;
        schema.verify_outputs(outputs.len())?;
        Ok(outputs)
    }

    /// Like `run_op`, pairing each output with the blob name it is stored under
    pub fn run_op_named(
        &self,
        op:     &dyn Op,
        inputs: &[&TensorAny],
        names:  &[String],
    ) -> Result<Vec<(String, TensorAny)>, OpError> {
        let schema = self.verify_inputs(op, inputs)?;
        let outputs = op.run_named(inputs, names)?;
        schema.verify_outputs(outputs.len())?;
        Ok(outputs)
    }

    fn verify_inputs(&self, op: &dyn Op, inputs: &[&TensorAny]) -> Result<&OpSchema, OpError> {
        let schema = &self.entry(op.name())?.schema;
        let descs: Vec<TensorDesc> = inputs.iter().map(|t| t.desc()).collect();
        schema.verify(&descs)?;
        trace!(op = op.name(), inputs = inputs.len(), "running operator");
        Ok(schema)
    }

    /// Lookup + instantiate + validate + run in one call
    pub fn check_and_run(
        &self,
        name:   &str,
        inputs: &[&TensorAny],
        args:   &OpArgs,
    ) -> Result<Vec<TensorAny>, OpError> {
        let def = OperatorDef { args: args.clone(), ..OperatorDef::new(name, &[], &[]) };
        let op = self.create_op(&def)?;
        self.run_op(op.as_ref(), inputs)
    }

    /// Static output descriptors; `None` if the op declares no inference function
    pub fn infer_shapes(
        &self,
        name:   &str,
        args:   &OpArgs,
        inputs: &[TensorDesc],
    ) -> Result<Option<Vec<TensorDesc>>, OpError> {
        self.entry(name)?.schema.infer(args, inputs)
    }

    pub fn gradient(&self, name: &str) -> Option<GradientKind> {
        self.gradients.get(name).copied()
    }

    /// Operators to append to a backward graph for `name`
    pub fn gradient_defs(&self, name: &str) -> Result<Vec<OperatorDef>, OpError> {
        self.entry(name)?;
        match self.gradient(name) {
            Some(GradientKind::NoGradient) => Ok(Vec::new()),
            Some(GradientKind::ShouldNotDo) => Err(OpError::GradientNotAllowed(name.to_string())),
            None => Err(OpError::GradientUndefined(name.to_string())),
        }
    }
}
