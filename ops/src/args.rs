//! Operator and net definitions.
//!
//! These are the serialized form of a graph: an [`OperatorDef`] names an
//! operator type, the workspace blobs it reads and writes, and its
//! arguments. A [`NetDef`] is an ordered list of them, usually loaded from
//! YAML:
//!
//! ```yaml
//! name: densify
//! ops:
//!   - type: SparseToDense
//!     inputs: [ids, rows]
//!     outputs: [dense]
//!     args:
//!       output_first_dim: 8
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, OpError};

/// Single operator argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Argument {
    Int(i64),
    Float(f64),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Str(s.to_string())
    }
}

impl Argument {
    fn kind(&self) -> &'static str {
        match self {
            Argument::Int(_) => "int",
            Argument::Float(_) => "float",
            Argument::Str(_) => "string",
            Argument::Ints(_) => "list of ints",
            Argument::Floats(_) => "list of floats",
            Argument::Strings(_) => "list of strings",
        }
    }
}

/// Named arguments of one operator, kept in name order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpArgs(BTreeMap<String, Argument>);

impl OpArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Argument>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Argument>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Typed accessors that report failures against operator `op`
    pub fn helper<'a>(&'a self, op: &'a str) -> ArgumentHelper<'a> {
        ArgumentHelper { op, args: self }
    }
}

/// Typed view over [`OpArgs`] bound to an operator name for error reporting
pub struct ArgumentHelper<'a> {
    op:   &'a str,
    args: &'a OpArgs,
}

impl ArgumentHelper<'_> {
    pub fn get_int(&self, name: &str, default: i64) -> Result<i64, OpError> {
        match self.args.get(name) {
            None => Ok(default),
            Some(Argument::Int(v)) => Ok(*v),
            Some(other) => Err(self.wrong_kind(name, "int", other)),
        }
    }

    pub fn get_string(&self, name: &str, default: &str) -> Result<String, OpError> {
        match self.args.get(name) {
            None => Ok(default.to_string()),
            Some(Argument::Str(v)) => Ok(v.clone()),
            Some(other) => Err(self.wrong_kind(name, "string", other)),
        }
    }

    /// Build an `InvalidArgument` error for `name`
    pub fn invalid(&self, name: &str, reason: impl Into<String>) -> OpError {
        OpError::InvalidArgument {
            op:     self.op.to_string(),
            arg:    name.to_string(),
            reason: reason.into(),
        }
    }

    fn wrong_kind(&self, name: &str, expected: &str, found: &Argument) -> OpError {
        self.invalid(name, format!("expected {expected}, found {}", found.kind()))
    }
}

/// One operator invocation inside a net
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorDef {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:    Option<String>,
    #[serde(default)]
    pub inputs:  Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "OpArgs::is_empty")]
    pub args:    OpArgs,
}

impl OperatorDef {
    pub fn new(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            op_type: op_type.to_string(),
            name:    None,
            inputs:  inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            args:    OpArgs::new(),
        }
    }

    pub fn with_arg(mut self, name: &str, value: impl Into<Argument>) -> Self {
        self.args.insert(name, value);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Explicit name if one was given, otherwise the operator type
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.op_type)
    }
}

/// Ordered list of operators sharing one workspace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetDef {
    pub name: String,
    #[serde(default)]
    pub ops:  Vec<OperatorDef>,
}

impl NetDef {
    pub fn from_yaml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&src)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NET: &str = r#"
name: densify
ops:
  - type: SparseToDense
    inputs: [ids, rows]
    outputs: [dense]
    args:
      output_first_dim: 8
      scale: 0.5
      mode: sum
      dims: [1, 2]
  - type: SparseToDense
    name: with_template
    inputs: [ids, rows, template]
    outputs: [dense2]
"#;

    #[test]
    fn parses_yaml_net() {
        let net = NetDef::from_yaml_str(NET).unwrap();
        assert_eq!(net.name, "densify");
        assert_eq!(net.ops.len(), 2);

        let first = &net.ops[0];
        assert_eq!(first.op_type, "SparseToDense");
        assert_eq!(first.inputs, vec!["ids", "rows"]);
        assert_eq!(first.display_name(), "SparseToDense");
        assert_eq!(first.args.get("output_first_dim"), Some(&Argument::Int(8)));
        assert_eq!(first.args.get("scale"), Some(&Argument::Float(0.5)));
        assert_eq!(first.args.get("mode"), Some(&Argument::Str("sum".into())));
        assert_eq!(first.args.get("dims"), Some(&Argument::Ints(vec![1, 2])));

        assert_eq!(net.ops[1].display_name(), "with_template");
        assert!(net.ops[1].args.is_empty());
    }

    #[test]
    fn yaml_output_reloads_to_same_net() {
        let net = NetDef {
            name: "n".into(),
            ops:  vec![OperatorDef::new("SparseToDense", &["i", "v"], &["o"])
                .with_arg("output_first_dim", 3i64)],
        };
        let yaml = net.to_yaml_string().unwrap();
        assert_eq!(NetDef::from_yaml_str(&yaml).unwrap(), net);
    }

    #[test]
    fn helper_checks_kinds() {
        let args = OpArgs::new().with("n", 4i64).with("f", 2.5f64).with("s", "x");
        let h = args.helper("Demo");

        assert_eq!(h.get_int("n", 0).unwrap(), 4);
        assert_eq!(h.get_int("missing", 7).unwrap(), 7);
        assert_eq!(h.get_string("s", "").unwrap(), "x");
        assert_eq!(h.get_string("missing", "yaml").unwrap(), "yaml");

        let err = h.get_int("s", 0).unwrap_err();
        assert_eq!(err.to_string(), "`Demo` argument `s`: expected int, found string");
        let err = h.get_string("f", "").unwrap_err();
        assert_eq!(err.to_string(), "`Demo` argument `f`: expected string, found float");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = NetDef::from_path("/nonexistent/net.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/net.yaml"));
    }
}
