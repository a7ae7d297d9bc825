//! Mapping between ions and the dataset fields that hold their number density.
//!
//! Canonical names follow `<El>_p<level - 1>_number_density`, so `H I` is
//! `H_p0_number_density` and `Mg II` is `Mg_p1_number_density`. Resolution
//! consults an explicit table first and only parses the field name when the
//! table has no entry for it.

use super::database::Transition;
use crate::common::constants::NUMBER_DENSITY_SUFFIX;
use crate::common::{element_symbols, is_known_element, to_roman};
use crate::domain::{SpectraError, SpectraResult};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub fn canonical_field_name(element: &str, level: u32) -> String {
    format!(
        "{}_p{}_{}",
        element,
        level.saturating_sub(1),
        NUMBER_DENSITY_SUFFIX
    )
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IonKey {
    pub element: String,
    pub level: u32,
}

impl IonKey {
    pub fn new(element: impl Into<String>, level: u32) -> Self {
        Self {
            element: element.into(),
            level,
        }
    }

    pub fn for_transition(transition: &Transition) -> Self {
        Self::new(transition.element.clone(), transition.ion_state)
    }
}

impl Display for IonKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.element, to_roman(self.level))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldParseError {
    #[error("field '{field}' does not end in '_number_density'")]
    MissingSuffix { field: String },
    #[error("field '{field}' does not name an ion as '<El>_p<n>_number_density'")]
    MalformedIon { field: String },
    #[error("field '{field}' names unknown element '{element}'")]
    UnknownElement { field: String, element: String },
}

/// Parses `<El>_number_density` (neutral) or `<El>_p<n>_number_density` (level n + 1).
pub fn parse_ion_field(field: &str) -> Result<IonKey, FieldParseError> {
    let prefix = field
        .strip_suffix(NUMBER_DENSITY_SUFFIX)
        .and_then(|rest| rest.strip_suffix('_'))
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| FieldParseError::MissingSuffix {
            field: field.to_string(),
        })?;

    let malformed = || FieldParseError::MalformedIon {
        field: field.to_string(),
    };
    let mut parts = prefix.split('_');
    let element = parts.next().filter(|part| !part.is_empty()).ok_or_else(malformed)?;
    let level = match parts.next() {
        None => 1,
        Some(ion) => {
            let digits = ion.strip_prefix('p').ok_or_else(malformed)?;
            if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(malformed());
            }
            digits
                .parse::<u32>()
                .ok()
                .and_then(|ion| ion.checked_add(1))
                .ok_or_else(malformed)?
        }
    };
    if parts.next().is_some() {
        return Err(malformed());
    }
    if !is_known_element(element) {
        return Err(FieldParseError::UnknownElement {
            field: field.to_string(),
            element: element.to_string(),
        });
    }

    Ok(IonKey::new(element, level))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldResolution {
    /// The field name was registered in the [`IonFieldTable`].
    Table,
    /// The field name was not registered and was parsed instead.
    Parsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIonField {
    pub key: IonKey,
    pub field: String,
    pub resolution: FieldResolution,
}

/// Bidirectional map between ions and number-density field names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IonFieldTable {
    by_key: BTreeMap<IonKey, String>,
    by_field: BTreeMap<String, IonKey>,
}

impl IonFieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical field names for every ion of every tabulated element.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (index, symbol) in element_symbols().enumerate() {
            let atomic_number = index as u32 + 1;
            for level in 1..=atomic_number + 1 {
                table.insert(IonKey::new(symbol, level), canonical_field_name(symbol, level));
            }
        }
        table
    }

    /// Registers `field` for `key`, replacing any previous mapping for either side.
    pub fn insert(&mut self, key: IonKey, field: impl Into<String>) {
        let field = field.into();
        if let Some(previous) = self.by_key.insert(key.clone(), field.clone()) {
            self.by_field.remove(&previous);
        }
        if let Some(previous) = self.by_field.insert(field, key.clone()) {
            if previous != key {
                self.by_key.remove(&previous);
            }
        }
    }

    pub fn with_alias(mut self, element: &str, level: u32, field: &str) -> Self {
        self.insert(IonKey::new(element, level), field);
        self
    }

    pub fn field_for(&self, key: &IonKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn key_for(&self, field: &str) -> Option<&IonKey> {
        self.by_field.get(field)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Determines which ion a transition's field describes.
    ///
    /// Registered field names resolve through the table; anything else is
    /// parsed. Either way the ion must agree with the transition's own
    /// element and ion state.
    pub fn resolve(&self, transition: &Transition) -> SpectraResult<ResolvedIonField> {
        let (key, resolution) = match self.key_for(&transition.field) {
            Some(key) => (key.clone(), FieldResolution::Table),
            None => {
                let key = parse_ion_field(&transition.field).map_err(|error| {
                    SpectraError::dataset(
                        "DATA.ION_FIELD_NAME",
                        format!("cannot resolve field for {}: {}", transition.identifier, error),
                    )
                })?;
                (key, FieldResolution::Parsed)
            }
        };

        let expected = IonKey::for_transition(transition);
        if key != expected {
            return Err(SpectraError::dataset(
                "DATA.ION_FIELD_MISMATCH",
                format!(
                    "field '{}' holds {} but line {} is {}",
                    transition.field, key, transition.identifier, expected
                ),
            ));
        }

        Ok(ResolvedIonField {
            key,
            field: transition.field.clone(),
            resolution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FieldParseError, FieldResolution, IonFieldTable, IonKey, canonical_field_name,
        parse_ion_field,
    };
    use crate::lines::Transition;

    #[test]
    fn canonical_names_use_zero_based_suffix() {
        assert_eq!(canonical_field_name("H", 1), "H_p0_number_density");
        assert_eq!(canonical_field_name("Mg", 2), "Mg_p1_number_density");
        assert_eq!(canonical_field_name("O", 6), "O_p5_number_density");
    }

    #[test]
    fn parser_accepts_neutral_and_ionized_forms() {
        assert_eq!(parse_ion_field("H_number_density"), Ok(IonKey::new("H", 1)));
        assert_eq!(parse_ion_field("H_p0_number_density"), Ok(IonKey::new("H", 1)));
        assert_eq!(parse_ion_field("Si_p3_number_density"), Ok(IonKey::new("Si", 4)));
    }

    #[test]
    fn parser_rejects_malformed_names() {
        assert!(matches!(
            parse_ion_field("Mg_p1_density"),
            Err(FieldParseError::MissingSuffix { .. })
        ));
        assert!(matches!(
            parse_ion_field("_number_density"),
            Err(FieldParseError::MissingSuffix { .. })
        ));
        for field in [
            "Mg_q1_number_density",
            "Mg_p_number_density",
            "Mg_p1_x_number_density",
            "Mg_p-1_number_density",
            "Mg_p4294967295_number_density",
            "Mg_p99999999999_number_density",
        ] {
            assert!(
                matches!(parse_ion_field(field), Err(FieldParseError::MalformedIon { .. })),
                "{field}"
            );
        }
        assert!(matches!(
            parse_ion_field("Xx_p1_number_density"),
            Err(FieldParseError::UnknownElement { .. })
        ));
    }

    #[test]
    fn standard_table_resolves_canonical_fields() {
        let table = IonFieldTable::standard();
        assert_eq!(
            table.field_for(&IonKey::new("Zn", 31)),
            Some("Zn_p30_number_density")
        );
        assert_eq!(table.field_for(&IonKey::new("H", 3)), None);

        let resolved = table
            .resolve(&Transition::new("Mg", 2, 2796.352, 2.6e8, 0.608))
            .expect("canonical field should resolve");
        assert_eq!(resolved.key, IonKey::new("Mg", 2));
        assert_eq!(resolved.resolution, FieldResolution::Table);
    }

    #[test]
    fn unregistered_fields_fall_back_to_parsing() {
        let table = IonFieldTable::standard();
        let line = Transition::new("H", 1, 1215.67, 4.69e8, 0.416).with_field("H_number_density");

        let resolved = table.resolve(&line).expect("neutral alias should parse");
        assert_eq!(resolved.key, IonKey::new("H", 1));
        assert_eq!(resolved.resolution, FieldResolution::Parsed);
    }

    #[test]
    fn aliases_resolve_through_the_table() {
        let table = IonFieldTable::standard().with_alias("O", 6, "ovi_density");
        assert_eq!(table.key_for("O_p5_number_density"), None);

        let line = Transition::new("O", 6, 1031.912, 4.16e8, 0.133).with_field("ovi_density");
        let resolved = table.resolve(&line).expect("alias should resolve");
        assert_eq!(resolved.resolution, FieldResolution::Table);
        assert_eq!(resolved.field, "ovi_density");
    }

    #[test]
    fn mismatched_or_unparseable_fields_are_dataset_errors() {
        let table = IonFieldTable::standard();

        let mismatched =
            Transition::new("Mg", 2, 2796.352, 2.6e8, 0.608).with_field("Mg_p0_number_density");
        let error = table.resolve(&mismatched).expect_err("level mismatch should fail");
        assert_eq!(error.placeholder(), "DATA.ION_FIELD_MISMATCH");

        let opaque = Transition::new("Mg", 2, 2796.352, 2.6e8, 0.608).with_field("density");
        let error = table.resolve(&opaque).expect_err("opaque field should fail");
        assert_eq!(error.placeholder(), "DATA.ION_FIELD_NAME");
    }
}
