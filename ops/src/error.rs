use core_types::DataType;
use tensor::TensorError;
use thiserror::Error;

/// Errors raised while registering, validating or running an operator
#[derive(Debug, Error)]
pub enum OpError {
    #[error("unknown operator `{0}`")]
    UnknownOp(String),

    #[error("operator `{0}` is already registered")]
    DuplicateOp(String),

    #[error("`{op}` takes {min}..={max} inputs, found {found}")]
    InputArity { op: String, min: usize, max: usize, found: usize },

    #[error("`{op}` produces {min}..={max} outputs, found {found}")]
    OutputArity { op: String, min: usize, max: usize, found: usize },

    #[error("`{op}` produced {produced} outputs but {names} output names were given")]
    OutputNames { op: String, produced: usize, names: usize },

    #[error("`{op}` input {index} has type {found}, expected one of {expected:?}")]
    DtypeMismatch { op: String, index: usize, expected: Vec<DataType>, found: DataType },

    #[error("`{op}` argument `{arg}`: {reason}")]
    InvalidArgument { op: String, arg: String, reason: String },

    #[error("`{op}`: {reason}")]
    InvalidInput { op: String, reason: String },

    #[error("`{op}`: index {index} at position {position} is outside [0, {bound})")]
    IndexOutOfRange { op: String, position: usize, index: i64, bound: usize },

    #[error("gradient of `{0}` should never be requested")]
    GradientNotAllowed(String),

    #[error("no gradient declared for `{0}`")]
    GradientUndefined(String),

    #[error("`{op}`: {source}")]
    Db { op: String, source: ConfigError },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Errors raised while reading or writing net definitions and blob dbs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid yaml document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("blob `{name}` in {path}: {source}")]
    Blob { path: String, name: String, source: TensorError },
}
