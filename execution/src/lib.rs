mod net;
mod workspace;

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use core_types::TensorDesc;
use opgraph_ops::{NetDef, OpRegistry, OperatorDef};

pub use net::Net;
pub use workspace::Workspace;


/// Execution engine running operators and nets against a workspace.
pub struct ExecutionEngine<'r> {
    registry: &'r OpRegistry,
}

impl ExecutionEngine<'static> {
    /// Engine over the process-wide registry
    pub fn global() -> Self {
        Self::new(OpRegistry::global())
    }
}

impl<'r> ExecutionEngine<'r> {
    pub fn new(registry: &'r OpRegistry) -> Self {
        Self { registry }
    }

    /// Instantiate and run a single operator
    pub fn run_operator_once(&self, ws: &Workspace, def: &OperatorDef) -> Result<()> {
        let op = self
            .registry
            .create_op(def)
            .with_context(|| format!("creating `{}`", def.display_name()))?;
        net::run_step(self.registry, ws, def, op.as_ref())
            .with_context(|| format!("running `{}`", def.display_name()))
    }

    pub fn create_net(&self, def: &NetDef) -> Result<Net<'r>> {
        Net::new(def, self.registry)
    }

    pub fn run_net_once(&self, ws: &Workspace, def: &NetDef) -> Result<()> {
        self.create_net(def)?.run(ws)
    }

    /// Propagate static descriptors through `def`, starting from the blobs
    /// already in `ws`. Outputs of ops without an inference function are left
    /// out; consumers of such blobs make this fail.
    pub fn infer_net_shapes(
        &self,
        ws:  &Workspace,
        def: &NetDef,
    ) -> Result<BTreeMap<String, TensorDesc>> {
        let mut known: BTreeMap<String, TensorDesc> = BTreeMap::new();

        for (i, op_def) in def.ops.iter().enumerate() {
            let inputs = op_def
                .inputs
                .iter()
                .map(|name| {
                    known
                        .get(name)
                        .cloned()
                        .or_else(|| ws.blob_desc(name))
                        .ok_or_else(|| anyhow!("shape of blob `{name}` is unknown"))
                })
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("net `{}`: op #{i} `{}`", def.name, op_def.display_name()))?;

            let inferred = self
                .registry
                .infer_shapes(&op_def.op_type, &op_def.args, &inputs)
                .with_context(|| format!("net `{}`: op #{i} `{}`", def.name, op_def.display_name()))?;

            match inferred {
                Some(outputs) => {
                    for (name, desc) in op_def.outputs.iter().zip(outputs) {
                        known.insert(name.clone(), desc);
                    }
                }
                None => debug!(op = op_def.display_name(), "no shape inference; outputs unknown"),
            }
        }
        Ok(known)
    }
}


/* ------------------------------------------------------------------------- */
/*                                  Tests                                    */
/* ------------------------------------------------------------------------- */
#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DataType;
    use opgraph_ops::{OpError, TensorAny};
    use pretty_assertions::assert_eq;
    use tensor::Tensor;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn feed_sparse(ws: &Workspace) {
        ws.feed_blob("ids", Tensor::from_vec(vec![3i64, 1], &[2]).unwrap());
        ws.feed_blob("rows", Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap());
    }

    #[test]
    fn run_sparse_to_dense_op() {
        init_tracing();
        let ws = Workspace::new();
        feed_sparse(&ws);

        let engine = ExecutionEngine::global();
        let def = OperatorDef::new("SparseToDense", &["ids", "rows"], &["dense"]);
        engine.run_operator_once(&ws, &def).unwrap();

        let dense = ws.fetch_tensor::<f32>("dense").unwrap();
        assert_eq!(dense.shape(), &[4, 2]);
        assert_eq!(dense.data(), &[0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn net_chains_ops_through_workspace() {
        init_tracing();
        let ws = Workspace::new();
        feed_sparse(&ws);

        let def = NetDef::from_yaml_str(
            r#"
name: two_step
ops:
  - type: SparseToDense
    inputs: [ids, rows]
    outputs: [dense]
  - type: SparseToDense
    name: padded
    inputs: [ids, rows, dense]
    outputs: [again]
"#,
        )
        .unwrap();

        let engine = ExecutionEngine::global();
        let net = engine.create_net(&def).unwrap();
        assert_eq!(net.name(), "two_step");
        assert_eq!(net.len(), 2);

        net.run(&ws).unwrap();
        assert_eq!(ws.fetch_blob("dense"), ws.fetch_blob("again"));

        // nets can be run repeatedly against the same workspace
        net.run(&ws).unwrap();
        assert_eq!(ws.blobs(), vec!["again", "dense", "ids", "rows"]);
    }

    #[test]
    fn errors_name_the_failing_op() {
        let ws = Workspace::new();
        feed_sparse(&ws);
        let engine = ExecutionEngine::global();

        let def = OperatorDef::new("SparseToDense", &["ids", "missing"], &["out"]);
        let err = engine.run_operator_once(&ws, &def).unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "running `SparseToDense`: input blob `missing` not found in workspace"
        );

        let def = OperatorDef::new("SparseToDense", &["rows", "rows"], &["out"]).with_name("bad");
        let err = engine.run_operator_once(&ws, &def).unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<OpError>(),
            Some(OpError::DtypeMismatch { index: 0, .. })
        ));
        assert!(!ws.has_blob("out"));

        let def = OperatorDef::new("SparseToDense", &["ids", "rows"], &["a", "b"]);
        let err = engine.run_operator_once(&ws, &def).unwrap_err();
        assert!(format!("{err:#}").contains("produced 1 outputs but 2 output names"));

        let net = NetDef { name: "n".into(), ops: vec![OperatorDef::new("Nope", &[], &[])] };
        let err = engine.run_net_once(&ws, &net).unwrap_err();
        assert!(format!("{err:#}").starts_with("net `n`: creating op #0 `Nope`"));
    }

    #[test]
    fn infers_shapes_through_a_net() {
        let ws = Workspace::new();
        feed_sparse(&ws);

        let def = NetDef {
            name: "shapes".into(),
            ops:  vec![
                OperatorDef::new("SparseToDense", &["ids", "rows"], &["dense"])
                    .with_arg("output_first_dim", 6i64),
                OperatorDef::new("SparseToDense", &["ids", "rows", "dense"], &["again"]),
                OperatorDef::new("SparseToDense", &["ids", "rows"], &["unknown_rows"]),
            ],
        };
        let shapes = ExecutionEngine::global().infer_net_shapes(&ws, &def).unwrap();

        assert_eq!(shapes["dense"], TensorDesc::known(DataType::F32, &[6, 2]));
        assert_eq!(shapes["again"], TensorDesc::known(DataType::F32, &[6, 2]));
        assert_eq!(
            shapes["unknown_rows"],
            TensorDesc { dtype: DataType::F32, dims: vec![None, Some(2)] }
        );

        let bad = NetDef {
            name: "bad".into(),
            ops:  vec![OperatorDef::new("SparseToDense", &["ids", "ghost"], &["x"])],
        };
        let err = ExecutionEngine::global().infer_net_shapes(&ws, &bad).unwrap_err();
        assert!(format!("{err:#}").contains("shape of blob `ghost` is unknown"));
    }
    #[test]
    fn save_reset_and_load_blobs() {
        init_tracing();
        let engine = ExecutionEngine::global();
        let db = std::env::temp_dir().join(format!("opgraph-ws-db-{}.yaml", std::process::id()));
        let db = db.to_str().unwrap();

        let ws = Workspace::new();
        ws.feed_blob("0", Tensor::from_vec(vec![2.0f32, 0.0, 1.0, 5.0, 4.0, 3.0], &[2, 3]).unwrap());
        ws.feed_blob("1", Tensor::from_vec(vec![2.0f64, 0.0, 1.0, 5.0, 4.0, 3.0], &[2, 3]).unwrap());
        ws.feed_blob("2", Tensor::from_vec(vec![2i32, 0, 1, 5, 4, 3], &[2, 3]).unwrap());
        ws.feed_blob("3", Tensor::from_vec(vec![2i64, 0, 1, 5, 4, 3], &[2, 3]).unwrap());
        let names = ["0", "1", "2", "3"];
        let saved: Vec<TensorAny> = names.iter().map(|n| ws.fetch_blob(n).unwrap()).collect();

        let save = OperatorDef::new("Save", &names, &[]).with_arg("db", db);
        engine.run_operator_once(&ws, &save).unwrap();
        ws.reset();
        assert!(ws.blobs().is_empty());

        let check = |ws: &Workspace| {
            for (name, blob) in names.iter().zip(&saved) {
                assert_eq!(ws.fetch_blob(name).as_ref(), Some(blob));
            }
        };

        let load = OperatorDef::new("Load", &[], &names).with_arg("db", db);
        engine.run_operator_once(&ws, &load).unwrap();
        check(&ws);

        let load_all = OperatorDef::new("Load", &[], &[])
            .with_arg("db", db)
            .with_arg("load_all", 1i64);
        ws.reset();
        engine.run_operator_once(&ws, &load_all).unwrap();
        check(&ws);
        // loading over existing blobs overwrites them
        ws.feed_blob("2", Tensor::scalar(0i32));
        engine.run_operator_once(&ws, &load_all).unwrap();
        check(&ws);
        assert_eq!(ws.len(), 4);

        let repeated = OperatorDef::new("Save", &["0", "1", "0", "1"], &[]).with_arg("db", db);
        let err = engine.run_operator_once(&ws, &repeated).unwrap_err();
        assert!(format!("{err:#}").contains("input blob `0` is listed more than once"));

        std::fs::remove_file(db).unwrap();
    }
}
