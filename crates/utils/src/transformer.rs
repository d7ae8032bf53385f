//! Form submission transformations.
//!
//! Transformers turn a raw [`FormData`] submission into the typed request
//! the rest of the messaging flow works with. Every field is normalized
//! independently and a transformer never fails: malformed input resolves to
//! the field's default. Concrete implementations live in the
//! [`transformers`](crate::transformers) module.

use tracing::debug;

use crate::FormData;

/// Trait for transformers that normalize form submissions.
pub trait FormTransformer: Send + Sync {
    /// The typed record produced from a submission.
    type Output;

    /// Normalizes a form submission.
    fn transform(&self, form: &FormData) -> Self::Output;

    /// Returns the name of this transformer.
    fn name(&self) -> &str;

    /// Normalizes a batch of submissions in order.
    fn transform_all(&self, forms: &[FormData]) -> Vec<Self::Output>
    where
        Self: Sized,
    {
        debug!(
            transformer = self.name(),
            count = forms.len(),
            "Applying transformer to submissions"
        );
        forms.iter().map(|form| self.transform(form)).collect()
    }
}
