// @generated by core-types/build.rs from supported_types.yaml. Do not edit.

/// Supported element types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    F64,
    I32,
    I64,
}

impl DataType {
    /// Every supported element type, in declaration order
    pub const ALL: &'static [DataType] = &[
        DataType::F32,
        DataType::F64,
        DataType::I32,
        DataType::I64,
    ];

    /// Size of one element, in bytes
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 => std::mem::size_of::<f32>(),
            DataType::F64 => std::mem::size_of::<f64>(),
            DataType::I32 => std::mem::size_of::<i32>(),
            DataType::I64 => std::mem::size_of::<i64>(),
        }
    }

    /// Canonical lowercase name, e.g. `float32`
    pub fn name(self) -> &'static str {
        match self {
            DataType::F32 => "float32",
            DataType::F64 => "float64",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
        }
    }

    /// True for the integer types that may address rows of another tensor
    pub fn is_index(self) -> bool {
        match self {
            DataType::F32 => false,
            DataType::F64 => false,
            DataType::I32 => true,
            DataType::I64 => true,
        }
    }
}

/// Marker-trait so we can go from T to DataType
pub trait Element: bytemuck::Pod + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    const DTYPE: DataType;

    /// Sum used when several sparse entries land on the same dense slot
    fn accumulate(self, other: Self) -> Self;
}

impl Element for f32 {
    const DTYPE: DataType = DataType::F32;

    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl Element for f64 {
    const DTYPE: DataType = DataType::F64;

    fn accumulate(self, other: Self) -> Self {
        self + other
    }
}

impl Element for i32 {
    const DTYPE: DataType = DataType::I32;

    fn accumulate(self, other: Self) -> Self {
        self.wrapping_add(other)
    }
}

impl Element for i64 {
    const DTYPE: DataType = DataType::I64;

    fn accumulate(self, other: Self) -> Self {
        self.wrapping_add(other)
    }
}

/// Integer element types accepted as ids
pub trait IndexElement: Element {
    fn to_i64(self) -> i64;
}

impl IndexElement for i32 {
    fn to_i64(self) -> i64 { i64::from(self) }
}

impl IndexElement for i64 {
    fn to_i64(self) -> i64 { i64::from(self) }
}
