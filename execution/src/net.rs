use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info_span};

use opgraph_ops::{NetDef, Op, OpRegistry, OperatorDef, TensorAny};

use crate::workspace::Workspace;

struct NetStep {
    def: OperatorDef,
    op:  Box<dyn Op>,
}

/// Operators of a `NetDef`, instantiated once and run in order
pub struct Net<'r> {
    name:     String,
    registry: &'r OpRegistry,
    steps:    Vec<NetStep>,
}

impl<'r> Net<'r> {
    pub fn new(def: &NetDef, registry: &'r OpRegistry) -> Result<Self> {
        let steps = def
            .ops
            .iter()
            .enumerate()
            .map(|(i, op_def)| {
                let op = registry.create_op(op_def).with_context(|| {
                    format!("net `{}`: creating op #{i} `{}`", def.name, op_def.display_name())
                })?;
                Ok(NetStep { def: op_def.clone(), op })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(net = %def.name, ops = steps.len(), "created net");
        Ok(Self { name: def.name.clone(), registry, steps })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every operator once, stopping at the first failure
    pub fn run(&self, ws: &Workspace) -> Result<()> {
        let span = info_span!("net", name = %self.name);
        let _enter = span.enter();

        for (i, step) in self.steps.iter().enumerate() {
            run_step(self.registry, ws, &step.def, step.op.as_ref()).with_context(|| {
                format!("net `{}`: op #{i} `{}` failed", self.name, step.def.display_name())
            })?;
        }
        Ok(())
    }
}

/// Read the inputs of `def` from the workspace, run `op`, store its outputs
pub(crate) fn run_step(
    registry: &OpRegistry,
    ws:       &Workspace,
    def:      &OperatorDef,
    op:       &dyn Op,
) -> Result<()> {
    let held = ws
        .handles(&def.inputs)
        .map_err(|missing| anyhow!("input blob `{missing}` not found in workspace"))?;
    let inputs: Vec<&TensorAny> = held.iter().map(Arc::as_ref).collect();

    let outputs = registry.run_op_named(op, &inputs, &def.outputs)?;
    let written = outputs.len();
    for (name, value) in outputs {
        ws.feed_blob(&name, value);
    }
    debug!(op = def.display_name(), outputs = written, "ran operator");
    Ok(())
}
