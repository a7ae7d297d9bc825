//! Transition catalog, line requests, and ion-field naming.

mod database;
mod fields;
mod selector;

pub use database::{LineDatabase, Transition, parse_ion_label};
pub use fields::{
    FieldParseError, FieldResolution, IonFieldTable, IonKey, ResolvedIonField,
    canonical_field_name, parse_ion_field,
};
pub use selector::LineSpecifier;
