//! Cached input/output descriptions of a loaded model.

use serde::Serialize;

use crate::backend::Model;
use crate::error::OnnxError;

/// Name and declared shape of one model input or output.
///
/// Negative dimensions are dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<i64>,
}

impl TensorInfo {
    pub fn new(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.shape.iter().any(|&d| d < 0)
    }

    /// Number of elements of a fully static shape.
    ///
    /// `None` for dynamic shapes and for shapes whose size overflows `usize`.
    pub fn element_count(&self) -> Option<usize> {
        if self.is_dynamic() {
            return None;
        }
        static_product(self.shape.iter().copied())
    }

    /// Resolves the shape to bind for a buffer of `len` elements.
    ///
    /// Static shapes must match `len` exactly. A single dynamic dimension is
    /// inferred from `len`; more than one cannot be resolved.
    pub(crate) fn resolve_shape(&self, len: usize) -> Option<Vec<i64>> {
        if !self.is_dynamic() {
            return (self.element_count()? == len).then(|| self.shape.clone());
        }
        if self.shape.iter().filter(|&&d| d < 0).count() > 1 {
            return None;
        }
        let fixed = static_product(self.shape.iter().copied().filter(|&d| d >= 0))?;
        if fixed == 0 {
            return (len == 0).then(|| self.shape.iter().map(|&d| d.max(0)).collect());
        }
        if len % fixed != 0 {
            return None;
        }
        let inferred = i64::try_from(len / fixed).ok()?;
        Some(
            self.shape
                .iter()
                .map(|&d| if d < 0 { inferred } else { d })
                .collect(),
        )
    }
}

/// Product of non-negative dimensions, `None` on overflow.
fn static_product(dims: impl IntoIterator<Item = i64>) -> Option<usize> {
    dims.into_iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(usize::try_from(d).ok()?))
}

/// Input and output descriptions, read once when a model is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModelMetadata {
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

impl ModelMetadata {
    pub(crate) fn read<M: Model>(model: &M) -> Result<Self, OnnxError> {
        Ok(Self {
            inputs: model.inputs()?,
            outputs: model.outputs()?,
        })
    }

    pub fn input(&self, index: usize) -> Result<&TensorInfo, OnnxError> {
        self.inputs.get(index).ok_or(OnnxError::IndexOutOfRange {
            kind: "input",
            index,
            count: self.inputs.len(),
        })
    }

    pub fn output(&self, index: usize) -> Result<&TensorInfo, OnnxError> {
        self.outputs.get(index).ok_or(OnnxError::IndexOutOfRange {
            kind: "output",
            index,
            count: self.outputs.len(),
        })
    }
}
