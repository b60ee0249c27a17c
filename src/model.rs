//! Polymorphic data model exchanged between activities
//!
//! A `DataItem` is either a `Scalar` (one opaque value) or a `Vector`
//! (an ordered, randomly-indexable sequence of opaque values).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{Result, StrandError};

/// Wraps exactly one opaque value. The value may be replaced in place;
/// the wrapper itself is owned by whichever activity is processing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scalar {
    value: Value,
}

impl Scalar {
    /// Create a scalar holding the given value
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Create a scalar holding null
    pub fn null() -> Self {
        Self { value: Value::Null }
    }

    /// Borrow the wrapped value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the wrapped value in place
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    /// Consume the scalar, yielding the wrapped value
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Ordered, mutable, randomly-indexable sequence of opaque values.
///
/// Indexing is circular on the negative side: index `-k` (for
/// `1 <= k <= size`) addresses the element at `size - k`, so `-1` is the
/// last element and `-size` the first. Non-negative indices must be below
/// `size`. Anything else fails with `IndexOutOfRange`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector {
    items: Vec<Value>,
}

impl Vector {
    /// Create an empty vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vector from existing values, preserving their order
    pub fn from_values(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a value at the end
    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    /// Get the element addressed by `index`
    pub fn get(&self, index: i64) -> Result<&Value> {
        let offset = self.offset(index)?;
        Ok(&self.items[offset])
    }

    /// Replace the element addressed by `index`, returning the old value
    pub fn set(&mut self, index: i64, value: impl Into<Value>) -> Result<Value> {
        let offset = self.offset(index)?;
        Ok(std::mem::replace(&mut self.items[offset], value.into()))
    }

    /// Remove and return the element addressed by `index`, shifting
    /// subsequent elements left
    pub fn remove(&mut self, index: i64) -> Result<Value> {
        let offset = self.offset(index)?;
        Ok(self.items.remove(offset))
    }

    /// Resize to exactly `new_len` elements, filling with null or
    /// truncating from the end
    pub fn resize(&mut self, new_len: usize) {
        self.items.resize(new_len, Value::Null);
    }

    /// Iterate the elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Consume the vector, yielding its elements in order
    pub fn into_values(self) -> Vec<Value> {
        self.items
    }

    // Maps an index to a concrete offset, wrapping negative indices.
    fn offset(&self, index: i64) -> Result<usize> {
        let size = self.items.len();
        let resolved = if index < 0 {
            size.checked_sub(index.unsigned_abs() as usize)
        } else if (index as usize) < size {
            Some(index as usize)
        } else {
            None
        };
        resolved.ok_or_else(|| StrandError::index_out_of_range(index, size))
    }
}

impl FromIterator<Value> for Vector {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// The unit of payload passed between activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DataItem {
    Scalar(Scalar),
    Vector(Vector),
}

impl DataItem {
    /// Create a scalar item from any value
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(Scalar::new(value))
    }

    /// Create a vector item from existing values
    pub fn vector(items: Vec<Value>) -> Self {
        Self::Vector(Vector::from_values(items))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&Vector> {
        match self {
            Self::Scalar(_) => None,
            Self::Vector(v) => Some(v),
        }
    }

    /// Flatten into a plain value: a scalar yields its value, a vector
    /// yields an array of its elements
    pub fn into_value(self) -> Value {
        match self {
            Self::Scalar(s) => s.into_value(),
            Self::Vector(v) => Value::Array(v.into_values()),
        }
    }
}

impl From<Scalar> for DataItem {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vector> for DataItem {
    fn from(v: Vector) -> Self {
        Self::Vector(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Vector {
        Vector::from_values(vec![json!("a"), json!("b"), json!("c"), json!("d"), json!("e")])
    }

    #[test]
    fn scalar_replace_in_place() {
        let mut s = Scalar::new("before");
        assert_eq!(s.value(), &json!("before"));
        s.set_value(42);
        assert_eq!(s.value(), &json!(42));
        assert_eq!(Scalar::null().into_value(), Value::Null);
    }

    #[test]
    fn negative_index_is_circular() {
        let v = sample();
        let size = v.len() as i64;
        for k in 1..=size {
            assert_eq!(v.get(-k).unwrap(), v.get(size - k).unwrap());
        }
        assert_eq!(v.get(-1).unwrap(), &json!("e"));
        assert_eq!(v.get(-5).unwrap(), &json!("a"));
    }

    #[test]
    fn index_magnitude_beyond_size_fails() {
        let v = sample();
        for index in [5, 6, -6, i64::MAX, i64::MIN] {
            let err = v.get(index).unwrap_err();
            assert!(
                matches!(err, StrandError::IndexOutOfRange { size: 5, .. }),
                "index {index} should be out of range, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_vector_rejects_every_index() {
        let v = Vector::new();
        assert!(v.get(0).is_err());
        assert!(v.get(-1).is_err());
    }

    #[test]
    fn set_and_remove_honor_negative_indices() {
        let mut v = sample();
        let old = v.set(-2, json!("D")).unwrap();
        assert_eq!(old, json!("d"));
        assert_eq!(v.get(3).unwrap(), &json!("D"));

        let removed = v.remove(-1).unwrap();
        assert_eq!(removed, json!("e"));
        assert_eq!(v.len(), 4);
        assert_eq!(v.get(-1).unwrap(), &json!("D"));
    }

    #[test]
    fn resize_fills_with_null_and_truncates() {
        let mut v = Vector::from_values(vec![json!(1)]);
        v.resize(3);
        assert_eq!(v.len(), 3);
        assert_eq!(v.get(2).unwrap(), &Value::Null);
        v.resize(1);
        assert_eq!(v.into_values(), vec![json!(1)]);
    }

    #[test]
    fn data_item_flattens() {
        assert_eq!(DataItem::scalar(7).into_value(), json!(7));
        assert_eq!(
            DataItem::vector(vec![json!(1), json!(2)]).into_value(),
            json!([1, 2])
        );
    }
}
