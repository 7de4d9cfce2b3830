use std::collections::BTreeSet;

use tracing::debug;

use crate::args::{OpArgs, OperatorDef};
use crate::db::BlobDb;
use crate::error::{ConfigError, OpError};
use crate::op::Op;
use crate::schema::OpSchema;
use crate::types::{RegistrationInfo, TensorAny};
use crate::{no_gradient, register_op};

const DB: &str = "db";
const DB_TYPE: &str = "db_type";
const LOAD_ALL: &str = "load_all";
const YAML_DB: &str = "yaml";

const SAVE_DOC: &str = r#"
Save the input blobs to a db. Each blob is stored under its own name,
together with its shape and element type. An existing db at the same path
is replaced.
"#;

const LOAD_DOC: &str = r#"
Load blobs from a db written by `Save`. The outputs name the blobs to read;
with `load_all` set, every blob in the db is loaded under its stored name.
Blobs already in the workspace are overwritten.
"#;

/// Db path from the `db` argument; only YAML dbs are supported
fn db_path(op: &str, args: &OpArgs) -> Result<String, OpError> {
    let h = args.helper(op);
    let db_type = h.get_string(DB_TYPE, YAML_DB)?;
    if db_type != YAML_DB {
        return Err(h.invalid(DB_TYPE, format!("unsupported db type `{db_type}`")));
    }
    let path = h.get_string(DB, "")?;
    if path.is_empty() {
        return Err(h.invalid(DB, "a db path is required"));
    }
    Ok(path)
}

fn check_unique(op: &str, kind: &str, names: &[String]) -> Result<(), OpError> {
    let mut seen = BTreeSet::new();
    match names.iter().find(|n| !seen.insert(n.as_str())) {
        Some(name) => Err(OpError::InvalidInput {
            op:     op.to_string(),
            reason: format!("{kind} blob `{name}` is listed more than once"),
        }),
        None => Ok(()),
    }
}

fn db_error(op: &str) -> impl FnOnce(ConfigError) -> OpError + '_ {
    move |source| OpError::Db { op: op.to_string(), source }
}


/* ------------------------------------------------------------------------- */
/*                                   Save                                    */
/* ------------------------------------------------------------------------- */

/// Writes its inputs to a db, keyed by their blob names
pub struct SaveOp {
    db:    String,
    names: Vec<String>,
}

impl RegistrationInfo for SaveOp {
    const NAME: &'static str = "Save";

    fn schema() -> OpSchema {
        OpSchema::new(Self::NAME)
            .num_inputs(1, usize::MAX)
            .num_outputs(0)
            .doc(SAVE_DOC)
            .input(0, "blobs", "Blobs to save; names must be distinct")
            .arg(DB, "Path of the db file")
            .arg(DB_TYPE, "Db format; only `yaml` is supported")
    }

    fn from_args(args: &OpArgs) -> Result<Self, OpError> {
        Ok(Self { db: db_path(Self::NAME, args)?, names: Vec::new() })
    }

    fn from_def(def: &OperatorDef) -> Result<Self, OpError> {
        check_unique(Self::NAME, "input", &def.inputs)?;
        Ok(Self { names: def.inputs.clone(), ..Self::from_args(&def.args)? })
    }
}

impl Op for SaveOp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, inputs: &[&TensorAny]) -> Result<Vec<TensorAny>, OpError> {
        if inputs.len() != self.names.len() {
            return Err(OpError::InvalidInput {
                op:     Self::NAME.to_string(),
                reason: format!(
                    "{} inputs but {} blob names to save them under",
                    inputs.len(),
                    self.names.len()
                ),
            });
        }

        let mut db = BlobDb::create(&self.db);
        for (name, &tensor) in self.names.iter().zip(inputs) {
            db.insert(name, tensor);
        }
        db.commit().map_err(db_error(Self::NAME))?;
        debug!(db = %self.db, blobs = db.len(), "saved blobs");
        Ok(Vec::new())
    }
}


/* ------------------------------------------------------------------------- */
/*                                   Load                                    */
/* ------------------------------------------------------------------------- */

/// Reads blobs back from a db written by [`SaveOp`]
pub struct LoadOp {
    db:       String,
    names:    Vec<String>,
    load_all: bool,
}

impl RegistrationInfo for LoadOp {
    const NAME: &'static str = "Load";

    fn schema() -> OpSchema {
        OpSchema::new(Self::NAME)
            .num_inputs(0, 0)
            .num_outputs_range(0, usize::MAX)
            .doc(LOAD_DOC)
            .output(0, "blobs", "Blobs to load; names must be distinct")
            .arg(DB, "Path of the db file")
            .arg(DB_TYPE, "Db format; only `yaml` is supported")
            .arg(LOAD_ALL, "If non-zero, load every blob in the db (no outputs may be given)")
    }

    fn from_args(args: &OpArgs) -> Result<Self, OpError> {
        let db = db_path(Self::NAME, args)?;
        let load_all = args.helper(Self::NAME).get_int(LOAD_ALL, 0)? != 0;
        Ok(Self { db, names: Vec::new(), load_all })
    }

    fn from_def(def: &OperatorDef) -> Result<Self, OpError> {
        let op = Self::from_args(&def.args)?;
        let h = def.args.helper(Self::NAME);
        match (op.load_all, def.outputs.is_empty()) {
            (true, false) => return Err(h.invalid(LOAD_ALL, "cannot be combined with explicit outputs")),
            (false, true) => return Err(h.invalid(LOAD_ALL, "no outputs given and load_all is not set")),
            _ => {}
        }
        check_unique(Self::NAME, "output", &def.outputs)?;
        Ok(Self { names: def.outputs.clone(), ..op })
    }
}

impl LoadOp {
    fn load(&self, names: &[String]) -> Result<Vec<(String, TensorAny)>, OpError> {
        let db = BlobDb::open(&self.db).map_err(db_error(Self::NAME))?;
        let names: Vec<String> = if self.load_all {
            db.names().map(str::to_string).collect()
        } else {
            names.to_vec()
        };

        let loaded = names
            .into_iter()
            .map(|name| match db.get(&name).map_err(db_error(Self::NAME))? {
                Some(tensor) => Ok((name, tensor)),
                None => Err(OpError::InvalidInput {
                    op:     Self::NAME.to_string(),
                    reason: format!("blob `{name}` not found in db {}", self.db),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(db = %self.db, blobs = loaded.len(), "loaded blobs");
        Ok(loaded)
    }
}

impl Op for LoadOp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, _: &[&TensorAny]) -> Result<Vec<TensorAny>, OpError> {
        Ok(self.load(&self.names)?.into_iter().map(|(_, t)| t).collect())
    }

    fn run_named(
        &self,
        _:     &[&TensorAny],
        names: &[String],
    ) -> Result<Vec<(String, TensorAny)>, OpError> {
        self.load(names)
    }
}

register_op!(SaveOp);
no_gradient!(SaveOp);
register_op!(LoadOp);
no_gradient!(LoadOp);
