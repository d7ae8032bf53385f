pub mod appender;
pub mod coerce;
pub mod config;
pub mod entity;
pub mod form;
pub mod format;
pub mod request;
pub mod signature;
pub mod transformer;
pub mod transformers;

pub use appender::*;
pub use coerce::*;
pub use config::*;
pub use entity::*;
pub use form::*;
pub use format::*;
pub use request::*;
pub use signature::*;
pub use transformer::*;
pub use transformers::*;
