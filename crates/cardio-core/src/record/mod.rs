//! Patient record construction and validation.
//!
//! Raw form values ([`RawInput`]) are turned into a typed, complete
//! [`PatientRecord`] by [`build_record`]. The column schema lives in
//! [`Field`]; categorical columns have their own code types in [`codes`].

mod builder;
pub mod codes;
mod field;
mod raw;
mod schema;

pub use builder::{build_record, FieldError, FieldValue, PatientRecord, RecordError};
pub use codes::{CategoricalCode, InvalidCode};
pub use field::{field_names, Field, FieldKind, UnknownField};
pub use raw::{InputError, RawInput, RawValue};
pub use schema::{validate_raw_input_schema, SchemaError};
