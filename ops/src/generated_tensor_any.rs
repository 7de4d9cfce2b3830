// @generated by ops/build.rs from supported_types.yaml. Do not edit.

/// Dynamically-typed Tensor: wraps `Tensor<T>` for every supported T
#[derive(Clone, Debug, PartialEq, From)]
pub enum TensorAny {
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
}

impl TensorAny {
    pub fn dtype(&self) -> DataType {
        match self {
            TensorAny::F32(_) => DataType::F32,
            TensorAny::F64(_) => DataType::F64,
            TensorAny::I32(_) => DataType::I32,
            TensorAny::I64(_) => DataType::I64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            TensorAny::F32(t) => t.shape(),
            TensorAny::F64(t) => t.shape(),
            TensorAny::I32(t) => t.shape(),
            TensorAny::I64(t) => t.shape(),
        }
    }

    pub fn numel(&self) -> usize {
        match self {
            TensorAny::F32(t) => t.numel(),
            TensorAny::F64(t) => t.numel(),
            TensorAny::I32(t) => t.numel(),
            TensorAny::I64(t) => t.numel(),
        }
    }

    pub fn desc(&self) -> TensorDesc {
        TensorDesc::known(self.dtype(), self.shape())
    }

    /// Borrow the concrete tensor if the element type matches
    pub fn downcast_ref<T: AnyElement>(&self) -> Option<&Tensor<T>> {
        T::from_any(self)
    }

    /// Take the concrete tensor if the element type matches
    pub fn into_tensor<T: AnyElement>(self) -> Option<Tensor<T>> {
        T::unwrap_any(self)
    }

    /// Run `visitor` against the concrete element type
    pub fn visit<V: TensorVisitor>(&self, visitor: V) -> V::Output {
        match self {
            TensorAny::F32(t) => visitor.visit(t),
            TensorAny::F64(t) => visitor.visit(t),
            TensorAny::I32(t) => visitor.visit(t),
            TensorAny::I64(t) => visitor.visit(t),
        }
    }

    /// Shape and typed copy of the element buffer
    pub fn to_data(&self) -> (Vec<usize>, TensorData) {
        match self {
            TensorAny::F32(t) => (t.shape().to_vec(), TensorData::F32(t.data().to_vec())),
            TensorAny::F64(t) => (t.shape().to_vec(), TensorData::F64(t.data().to_vec())),
            TensorAny::I32(t) => (t.shape().to_vec(), TensorData::I32(t.data().to_vec())),
            TensorAny::I64(t) => (t.shape().to_vec(), TensorData::I64(t.data().to_vec())),
        }
    }

    /// Rebuild a tensor from its shape and element buffer
    pub fn from_data(shape: &[usize], data: TensorData) -> Result<Self, TensorError> {
        Ok(match data {
            TensorData::F32(v) => TensorAny::F32(Tensor::from_vec(v, shape)?),
            TensorData::F64(v) => TensorAny::F64(Tensor::from_vec(v, shape)?),
            TensorData::I32(v) => TensorAny::I32(Tensor::from_vec(v, shape)?),
            TensorData::I64(v) => TensorAny::I64(Tensor::from_vec(v, shape)?),
        })
    }
}

/// Element buffer tagged with its type; the serialized form of a `TensorAny`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "data")]
pub enum TensorData {
    #[serde(rename = "float32")]
    F32(Vec<f32>),
    #[serde(rename = "float64")]
    F64(Vec<f64>),
    #[serde(rename = "int32")]
    I32(Vec<i32>),
    #[serde(rename = "int64")]
    I64(Vec<i64>),
}

/// Element types that can be wrapped into and recovered from `TensorAny`
pub trait AnyElement: Element {
    fn from_any(tensor: &TensorAny) -> Option<&Tensor<Self>>;
    fn unwrap_any(tensor: TensorAny) -> Option<Tensor<Self>>;
    fn into_any(tensor: Tensor<Self>) -> TensorAny;
}

impl AnyElement for f32 {
    fn from_any(tensor: &TensorAny) -> Option<&Tensor<Self>> {
        match tensor {
            TensorAny::F32(t) => Some(t),
            _ => None,
        }
    }

    fn unwrap_any(tensor: TensorAny) -> Option<Tensor<Self>> {
        match tensor {
            TensorAny::F32(t) => Some(t),
            _ => None,
        }
    }

    fn into_any(tensor: Tensor<Self>) -> TensorAny {
        TensorAny::F32(tensor)
    }
}

impl AnyElement for f64 {
    fn from_any(tensor: &TensorAny) -> Option<&Tensor<Self>> {
        match tensor {
            TensorAny::F64(t) => Some(t),
            _ => None,
        }
    }

    fn unwrap_any(tensor: TensorAny) -> Option<Tensor<Self>> {
        match tensor {
            TensorAny::F64(t) => Some(t),
            _ => None,
        }
    }

    fn into_any(tensor: Tensor<Self>) -> TensorAny {
        TensorAny::F64(tensor)
    }
}

impl AnyElement for i32 {
    fn from_any(tensor: &TensorAny) -> Option<&Tensor<Self>> {
        match tensor {
            TensorAny::I32(t) => Some(t),
            _ => None,
        }
    }

    fn unwrap_any(tensor: TensorAny) -> Option<Tensor<Self>> {
        match tensor {
            TensorAny::I32(t) => Some(t),
            _ => None,
        }
    }

    fn into_any(tensor: Tensor<Self>) -> TensorAny {
        TensorAny::I32(tensor)
    }
}

impl AnyElement for i64 {
    fn from_any(tensor: &TensorAny) -> Option<&Tensor<Self>> {
        match tensor {
            TensorAny::I64(t) => Some(t),
            _ => None,
        }
    }

    fn unwrap_any(tensor: TensorAny) -> Option<Tensor<Self>> {
        match tensor {
            TensorAny::I64(t) => Some(t),
            _ => None,
        }
    }

    fn into_any(tensor: Tensor<Self>) -> TensorAny {
        TensorAny::I64(tensor)
    }
}
