//! Data models shared by the transaction and metadata layers.

pub mod datetime;
pub mod value;

pub use datetime::{DATETIME_FORMAT, NormalDatetime};
pub use value::Value;
