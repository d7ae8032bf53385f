//! Built-in form transformers.
//!
//! Each transformer normalizes one kind of submission into its typed
//! request. Currently supports the compose form, producing a
//! [`ComposeRequest`](crate::ComposeRequest).

pub mod compose;

pub use compose::*;
