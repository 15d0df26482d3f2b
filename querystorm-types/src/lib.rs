pub mod random;
pub mod typegen;
pub mod types;
pub mod value;

pub use random::RandomGenerator;
pub use typegen::{mask, TypeGenerator};
pub use types::{EnumValue, GeoKind, NestedField, SqlType, TupleField};
pub use value::ValueGenerator;
