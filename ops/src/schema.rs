use std::fmt;

use core_types::{DataType, TensorDesc};

use crate::args::OpArgs;
use crate::error::OpError;

/// Computes output descriptors from argument values and input descriptors
pub type TensorInferenceFn = fn(&OpArgs, &[TensorDesc]) -> Result<Vec<TensorDesc>, OpError>;

/// Name, description and accepted element types of one input or output slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotDoc {
    pub name:        String,
    pub description: String,
    /// Empty means any supported type
    pub dtypes:      Vec<DataType>,
}

/// Documented operator argument
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDoc {
    pub name:        String,
    pub description: String,
}

/// Static metadata of an operator: arity, documentation, slot types and an
/// optional shape-inference hook.
///
/// Built once with the chained setters and then only read:
///
/// ```ignore
/// OpSchema::new("SparseToDense")
///     .num_inputs(2, 3)
///     .num_outputs(1)
///     .input(0, "indices", "1-D int32/int64 tensor of ids")
/// ```
#[derive(Clone)]
pub struct OpSchema {
    name:        String,
    min_inputs:  usize,
    max_inputs:  usize,
    min_outputs: usize,
    max_outputs: usize,
    doc:         String,
    inputs:      Vec<SlotDoc>,
    outputs:     Vec<SlotDoc>,
    args:        Vec<ArgDoc>,
    inference:   Option<TensorInferenceFn>,
}

impl OpSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name:        name.to_string(),
            min_inputs:  0,
            max_inputs:  0,
            min_outputs: 0,
            max_outputs: 0,
            doc:         String::new(),
            inputs:      Vec::new(),
            outputs:     Vec::new(),
            args:        Vec::new(),
            inference:   None,
        }
    }

    /* ------------------------------------------------------------------ */
    /* Builder                                                            */
    /* ------------------------------------------------------------------ */

    pub fn num_inputs(mut self, min: usize, max: usize) -> Self {
        self.min_inputs = min;
        self.max_inputs = max.max(min);
        self
    }

    pub fn num_outputs(self, n: usize) -> Self {
        self.num_outputs_range(n, n)
    }

    /// Variable output count, for ops whose outputs are named by the caller
    pub fn num_outputs_range(mut self, min: usize, max: usize) -> Self {
        self.min_outputs = min;
        self.max_outputs = max.max(min);
        self
    }

    pub fn doc(mut self, text: &str) -> Self {
        self.doc = text.trim().to_string();
        self
    }

    pub fn input(mut self, idx: usize, name: &str, description: &str) -> Self {
        let slot = slot_mut(&mut self.inputs, idx);
        slot.name = name.to_string();
        slot.description = description.to_string();
        self
    }

    pub fn output(mut self, idx: usize, name: &str, description: &str) -> Self {
        let slot = slot_mut(&mut self.outputs, idx);
        slot.name = name.to_string();
        slot.description = description.to_string();
        self
    }

    /// Restrict input `idx` to the given element types
    pub fn input_dtypes(mut self, idx: usize, dtypes: &[DataType]) -> Self {
        slot_mut(&mut self.inputs, idx).dtypes = dtypes.to_vec();
        self
    }

    pub fn arg(mut self, name: &str, description: &str) -> Self {
        self.args.push(ArgDoc { name: name.to_string(), description: description.to_string() });
        self
    }

    pub fn tensor_inference(mut self, f: TensorInferenceFn) -> Self {
        self.inference = Some(f);
        self
    }

    /* ------------------------------------------------------------------ */
    /* Accessors                                                          */
    /* ------------------------------------------------------------------ */

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_inputs(&self) -> usize {
        self.min_inputs
    }

    pub fn max_inputs(&self) -> usize {
        self.max_inputs
    }

    pub fn min_outputs(&self) -> usize {
        self.min_outputs
    }

    pub fn max_outputs(&self) -> usize {
        self.max_outputs
    }

    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    pub fn inputs(&self) -> &[SlotDoc] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SlotDoc] {
        &self.outputs
    }

    pub fn args(&self) -> &[ArgDoc] {
        &self.args
    }

    /* ------------------------------------------------------------------ */
    /* Validation                                                         */
    /* ------------------------------------------------------------------ */

    /// Check input arity and per-slot element types
    pub fn verify(&self, inputs: &[TensorDesc]) -> Result<(), OpError> {
        let found = inputs.len();
        if found < self.min_inputs || found > self.max_inputs {
            return Err(OpError::InputArity {
                op:  self.name.clone(),
                min: self.min_inputs,
                max: self.max_inputs,
                found,
            });
        }
        for (index, (desc, slot)) in inputs.iter().zip(&self.inputs).enumerate() {
            if !slot.dtypes.is_empty() && !slot.dtypes.contains(&desc.dtype) {
                return Err(OpError::DtypeMismatch {
                    op: self.name.clone(),
                    index,
                    expected: slot.dtypes.clone(),
                    found: desc.dtype,
                });
            }
        }
        Ok(())
    }

    pub fn verify_outputs(&self, found: usize) -> Result<(), OpError> {
        if found < self.min_outputs || found > self.max_outputs {
            return Err(OpError::OutputArity {
                op:  self.name.clone(),
                min: self.min_outputs,
                max: self.max_outputs,
                found,
            });
        }
        Ok(())
    }

    /// Output descriptors for the given inputs, or `None` when the operator
    /// declares no inference function.
    pub fn infer(
        &self,
        args:   &OpArgs,
        inputs: &[TensorDesc],
    ) -> Result<Option<Vec<TensorDesc>>, OpError> {
        self.verify(inputs)?;
        let Some(f) = self.inference else {
            return Ok(None);
        };
        let outputs = f(args, inputs)?;
        self.verify_outputs(outputs.len())?;
        Ok(Some(outputs))
    }
}

fn slot_mut(slots: &mut Vec<SlotDoc>, idx: usize) -> &mut SlotDoc {
    if slots.len() <= idx {
        slots.resize_with(idx + 1, SlotDoc::default);
    }
    &mut slots[idx]
}

impl fmt::Debug for OpSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpSchema")
            .field("name", &self.name)
            .field("inputs", &(self.min_inputs..=self.max_inputs))
            .field("outputs", &(self.min_outputs..=self.max_outputs))
            .field("has_inference", &self.inference.is_some())
            .finish()
    }
}

/// Catalogue entry, as printed by operator listings
impl fmt::Display for OpSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(
            f,
            "  inputs: {}, outputs: {}",
            Arity(self.min_inputs, self.max_inputs),
            Arity(self.min_outputs, self.max_outputs)
        )?;
        if !self.doc.is_empty() {
            writeln!(f)?;
            for line in self.doc.lines() {
                writeln!(f, "  {line}")?;
            }
        }
        write_slots(f, "Inputs", &self.inputs)?;
        write_slots(f, "Outputs", &self.outputs)?;
        if !self.args.is_empty() {
            writeln!(f, "\n  Arguments:")?;
            for a in &self.args {
                writeln!(f, "    {}: {}", a.name, a.description)?;
            }
        }
        Ok(())
    }
}

/// `n`, `a..=b`, or `a..` when unbounded
struct Arity(usize, usize);

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Arity(min, max) if min == max => write!(f, "{min}"),
            Arity(min, usize::MAX) => write!(f, "{min}.."),
            Arity(min, max) => write!(f, "{min}..={max}"),
        }
    }
}

fn write_slots(f: &mut fmt::Formatter<'_>, title: &str, slots: &[SlotDoc]) -> fmt::Result {
    if slots.is_empty() {
        return Ok(());
    }
    writeln!(f, "\n  {title}:")?;
    for (i, s) in slots.iter().enumerate() {
        write!(f, "    {i} {}: {}", s.name, s.description)?;
        if !s.dtypes.is_empty() {
            let names: Vec<&str> = s.dtypes.iter().map(|d| d.name()).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        writeln!(f)?;
    }
    Ok(())
}
