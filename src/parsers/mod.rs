pub mod logfmt;
pub mod type_conversion;

pub use logfmt::LogfmtParser;
pub use type_conversion::{infer_value, FieldType};
