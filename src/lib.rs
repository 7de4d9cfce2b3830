//! Operator-graph runtime with a schema-checked operator registry.
//!
//! Operators register a schema and a CPU kernel at link time
//! ([`register_op!`](opgraph_ops::register_op)); the process-wide
//! [`OpRegistry`] collects them on first use. Nets of operators run against
//! a [`Workspace`] of named tensors through the [`ExecutionEngine`].
//!
//! The builtin `SparseToDense` operator turns an `(indices, values)` pair
//! into a dense tensor whose row `indices[i]` holds `values[i]`, with
//! missing rows zero-filled. `Save` and `Load` persist workspace blobs to a
//! YAML [`BlobDb`].

pub use core_types::{DataType, Element, IndexElement, TensorDesc};
pub use execution::{ExecutionEngine, Net, Workspace};
pub use opgraph_ops::builtin::{LoadOp, SaveOp, SparseToDenseOp};
pub use opgraph_ops::{
    Argument, BlobDb, GradientKind, NetDef, Op, OpArgs, OpError, OpRegistry, OpSchema,
    OperatorDef, RegistrationInfo, TensorAny,
};
pub use tensor::{Tensor, TensorError};

/// Human-readable listing of every registered operator schema
pub fn operator_catalog(registry: &OpRegistry) -> String {
    registry
        .op_names()
        .into_iter()
        .filter_map(|name| registry.schema(name))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NET: &str = r#"
name: embeddings
ops:
  - type: SparseToDense
    name: scatter_ids
    inputs: [ids, vectors]
    outputs: [table]
    args:
      output_first_dim: 5
"#;

    #[test]
    fn yaml_net_end_to_end() -> anyhow::Result<()> {
        let ws = Workspace::new();
        ws.feed_blob("ids", Tensor::from_vec(vec![4i32, 0, 4], &[3])?);
        ws.feed_blob("vectors", Tensor::from_vec(vec![1i64, 1, 2, 2, 3, 3], &[3, 2])?);

        let engine = ExecutionEngine::global();
        engine.run_net_once(&ws, &NetDef::from_yaml_str(NET)?)?;

        let table = ws.fetch_tensor::<i64>("table").expect("table blob");
        assert_eq!(table.shape(), &[5, 2]);
        assert_eq!(table.into_vec(), vec![2, 2, 0, 0, 0, 0, 0, 0, 4, 4]);
        Ok(())
    }

    #[test]
    fn catalog_lists_builtins() {
        let catalog = operator_catalog(OpRegistry::global());
        assert!(catalog.starts_with("Load\n  inputs: 0, outputs: 0..\n"));
        assert!(catalog.contains("Save\n  inputs: 1.., outputs: 0\n"));
        assert!(catalog.contains("SparseToDense\n  inputs: 2..=3, outputs: 1\n"));
        assert!(catalog.contains("    0 indices: 1-D int32/int64 tensor of concatenated ids of data [int32, int64]"));
        assert!(catalog.contains("    2 data_to_infer_dim: Optional"));
    }

    #[test]
    fn builtins_have_no_gradient() {
        let reg = OpRegistry::global();
        for name in [SparseToDenseOp::NAME, SaveOp::NAME, LoadOp::NAME] {
            assert_eq!(reg.gradient(name), Some(GradientKind::NoGradient));
            assert_eq!(reg.gradient_defs(name).unwrap(), Vec::<OperatorDef>::new());
        }
    }
}
