//! Activities: units of transformation over the data model
//!
//! An activity transforms one `DataItem` into another, given the shared
//! context. Dispatch is polymorphic over the input shape: scalars go
//! through the scalar rule, vectors are mapped element-wise by default
//! unless the activity overrides the vector-level behavior to process
//! the whole sequence holistically.

pub mod composite;
pub mod config;

use async_trait::async_trait;

use crate::context::Context;
use crate::core::errors::Result;
use crate::model::{DataItem, Scalar, Vector};

pub use composite::{Composition, FailureMarker, ParallelGroup};
pub use config::{EngineConfig, PartialFailureMode};

/// A unit of transformation over the data model
#[async_trait]
pub trait Activity: Send + Sync {
    /// Name used in logs and task labels
    fn name(&self) -> &str;

    /// The scalar-level transformation rule
    async fn apply(&self, ctx: &Context, scalar: Scalar) -> Result<DataItem>;

    /// Vector-level behavior. The default applies the scalar rule to
    /// every element independently, preserving order and size. Override
    /// to process the sequence holistically (e.g. reduce to a scalar).
    async fn apply_vector(&self, ctx: &Context, vector: Vector) -> Result<DataItem> {
        let mut items = Vec::with_capacity(vector.len());
        for value in vector.into_values() {
            items.push(self.apply(ctx, Scalar::new(value)).await?.into_value());
        }
        Ok(DataItem::Vector(Vector::from_values(items)))
    }

    /// Dispatch on the input shape
    async fn perform(&self, ctx: &Context, input: DataItem) -> Result<DataItem> {
        match input {
            DataItem::Scalar(scalar) => self.apply(ctx, scalar).await,
            DataItem::Vector(vector) => self.apply_vector(ctx, vector).await,
        }
    }
}
