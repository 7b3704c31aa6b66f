//! ValueSlot - named, typed binding points flowing between nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of the values bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ElemType {
    #[default]
    Float32,
    Float64,
    Int64,
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElemType::Float32 => "float32",
            ElemType::Float64 => "float64",
            ElemType::Int64 => "int64",
        };
        f.write_str(name)
    }
}

/// A named, typed binding point between nodes.
///
/// Tracks:
/// - The slot name (unique within a graph)
/// - The element type
/// - The static shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueSlot {
    name: String,
    elem_type: ElemType,
    shape: Vec<usize>,
}

impl ValueSlot {
    /// Creates a new slot with the given name, element type and shape.
    pub fn new(name: impl Into<String>, elem_type: ElemType, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            elem_type,
            shape,
        }
    }

    /// Creates a float32 slot, the only element type the executor runs.
    pub fn float(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self::new(name, ElemType::Float32, shape)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elem_type(&self) -> ElemType {
        self.elem_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements described by the shape.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns true if both slots carry the same element type and shape.
    pub fn same_signature(&self, other: &ValueSlot) -> bool {
        self.elem_type == other.elem_type && self.shape == other.shape
    }

    /// Returns a copy of this slot bound to a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elem_type: self.elem_type,
            shape: self.shape.clone(),
        }
    }
}

impl fmt::Display for ValueSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{:?}", self.name, self.elem_type, self.shape)
    }
}
