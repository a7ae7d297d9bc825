use super::fields::canonical_field_name;
use crate::common::{from_roman, to_roman};
use crate::domain::{SpectraError, SpectraResult};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

/// One atomic transition. Immutable once it enters a [`LineDatabase`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub element: String,
    /// Ionization level: 1 for the neutral atom (`I`), 2 for `II`, ...
    pub ion_state: u32,
    /// Rest wavelength in angstroms.
    pub wavelength: f64,
    /// Damping constant in Hz.
    pub gamma: f64,
    pub f_value: f64,
    pub field: String,
    pub identifier: String,
}

impl Transition {
    pub fn new(
        element: impl Into<String>,
        ion_state: u32,
        wavelength: f64,
        gamma: f64,
        f_value: f64,
    ) -> Self {
        let element = element.into();
        let field = canonical_field_name(&element, ion_state);
        let identifier = format!(
            "{} {} {}",
            element,
            to_roman(ion_state),
            wavelength.round() as i64
        );
        Self {
            element,
            ion_state,
            wavelength,
            gamma,
            f_value,
            field,
            identifier,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Ion label such as `"Mg II"`.
    pub fn ion_label(&self) -> String {
        format!("{} {}", self.element, to_roman(self.ion_state))
    }

    /// Rest wavelength rounded to the nearest angstrom.
    pub fn integer_wavelength(&self) -> i64 {
        self.wavelength.round() as i64
    }

    fn validate(&self) -> SpectraResult<()> {
        if self.element.is_empty() || self.element.chars().any(char::is_whitespace) {
            return Err(SpectraError::configuration(
                "CONFIG.LINE_ELEMENT",
                format!("invalid element symbol '{}'", self.element),
            ));
        }
        if self.ion_state == 0 {
            return Err(SpectraError::configuration(
                "CONFIG.LINE_ION_STATE",
                format!("ion state of {} must be at least I", self.identifier),
            ));
        }
        for (name, value) in [
            ("wavelength", self.wavelength),
            ("gamma", self.gamma),
            ("f_value", self.f_value),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SpectraError::configuration(
                    "CONFIG.LINE_VALUE",
                    format!(
                        "{} of {} must be finite and non-negative, got {}",
                        name, self.identifier, value
                    ),
                ));
            }
        }
        if self.wavelength == 0.0 {
            return Err(SpectraError::configuration(
                "CONFIG.LINE_VALUE",
                format!("wavelength of {} must be positive", self.identifier),
            ));
        }
        Ok(())
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<14} {:>12.4} A  f={:<10.4e} gamma={:<10.4e} field={}",
            self.identifier, self.wavelength, self.f_value, self.gamma, self.field
        )
    }
}

/// Catalog of transitions in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineDatabase {
    lines: Vec<Transition>,
    source: Option<PathBuf>,
}

impl LineDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> SpectraResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            SpectraError::io_system(
                "IO.LINE_DATABASE_READ",
                format!(
                    "failed to read line database '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        let mut database = Self::from_catalog_str(&source, &path.display().to_string())?;
        database.source = Some(path.to_path_buf());
        Ok(database)
    }

    /// Parses a tab-delimited catalog: `name  wavelength  gamma  f_value  [identifier]`,
    /// where `name` is an ion label such as `Mg II`. `#` lines are comments.
    pub fn from_catalog_str(source: &str, origin: &str) -> SpectraResult<Self> {
        let mut database = Self::new();
        for (index, raw_line) in source.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let columns: Vec<&str> = raw_line.split('\t').map(str::trim).collect();
            if columns.len() < 4 {
                return Err(catalog_error(
                    origin,
                    line_number,
                    format!("expected at least 4 tab-delimited columns, got {}", columns.len()),
                ));
            }

            let (element, ion_state) = parse_ion_label(columns[0]).ok_or_else(|| {
                catalog_error(
                    origin,
                    line_number,
                    format!("'{}' is not an ion label like 'Mg II'", columns[0]),
                )
            })?;
            let wavelength = parse_catalog_value(columns[1], "wavelength", origin, line_number)?;
            let gamma = parse_catalog_value(columns[2], "gamma", origin, line_number)?;
            let f_value = parse_catalog_value(columns[3], "f_value", origin, line_number)?;

            let mut transition = Transition::new(element, ion_state, wavelength, gamma, f_value);
            if let Some(identifier) = columns.get(4).filter(|column| !column.is_empty()) {
                transition = transition.with_identifier(*identifier);
            }
            database.add_transition(transition).map_err(|error| {
                catalog_error(origin, line_number, error.message().to_string())
            })?;
        }
        Ok(database)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &mut self,
        element: &str,
        ion_state: &str,
        wavelength: f64,
        gamma: f64,
        f_value: f64,
        field: Option<&str>,
        identifier: Option<&str>,
    ) -> SpectraResult<&Transition> {
        let level = from_roman(ion_state).ok_or_else(|| {
            SpectraError::configuration(
                "CONFIG.LINE_ION_STATE",
                format!("'{}' is not a Roman-numeral ion state", ion_state),
            )
        })?;
        let mut transition = Transition::new(element, level, wavelength, gamma, f_value);
        if let Some(field) = field {
            transition = transition.with_field(field);
        }
        if let Some(identifier) = identifier {
            transition = transition.with_identifier(identifier);
        }
        self.add_transition(transition)
    }

    pub fn add_transition(&mut self, transition: Transition) -> SpectraResult<&Transition> {
        transition.validate()?;
        tracing::debug!(identifier = %transition.identifier, "adding line to database");
        self.lines.push(transition);
        Ok(&self.lines[self.lines.len() - 1])
    }

    pub fn lines(&self) -> &[Transition] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, identifier: &str) -> Option<&Transition> {
        self.lines.iter().find(|line| line.identifier == identifier)
    }

    pub fn by_element<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.lines.iter().filter(move |line| line.element == element)
    }

    pub fn by_ion<'a>(
        &'a self,
        element: &'a str,
        ion_state: u32,
    ) -> impl Iterator<Item = &'a Transition> {
        self.by_element(element)
            .filter(move |line| line.ion_state == ion_state)
    }

    pub fn by_wavelength<'a>(
        &'a self,
        element: &'a str,
        ion_state: u32,
        wavelength: i64,
    ) -> impl Iterator<Item = &'a Transition> {
        self.by_ion(element, ion_state)
            .filter(move |line| line.integer_wavelength() == wavelength)
    }
}

/// Splits `"Mg II"` into `("Mg", 2)`.
pub fn parse_ion_label(label: &str) -> Option<(&str, u32)> {
    let mut tokens = label.split_whitespace();
    let element = tokens.next()?;
    let level = from_roman(tokens.next()?)?;
    if tokens.next().is_some() {
        return None;
    }
    Some((element, level))
}

fn parse_catalog_value(
    token: &str,
    column: &str,
    origin: &str,
    line_number: usize,
) -> SpectraResult<f64> {
    token.parse::<f64>().map_err(|_| {
        catalog_error(
            origin,
            line_number,
            format!("{} value '{}' is not a number", column, token),
        )
    })
}

fn catalog_error(origin: &str, line_number: usize, message: String) -> SpectraError {
    SpectraError::configuration(
        "CONFIG.LINE_DATABASE",
        format!("{}:{}: {}", origin, line_number, message),
    )
}

#[cfg(test)]
mod tests {
    use super::{LineDatabase, Transition, parse_ion_label};
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = "#Ion\tWavelength [A]\tgamma\tf_value\talt. name
H I\t1215.67\t4.690e8\t4.160e-1\tLyman alpha
H I\t1025.7222\t5.570e7\t7.910e-2
Mg II\t2796.352\t2.600e8\t6.080e-1
Mg II\t2803.531\t2.570e8\t3.030e-1

O VI\t1031.912\t4.160e8\t1.330e-1
";

    #[test]
    fn catalog_rows_become_transitions_in_order() {
        let database = LineDatabase::from_catalog_str(CATALOG, "lines.txt")
            .expect("catalog should parse");

        let identifiers: Vec<&str> = database
            .lines()
            .iter()
            .map(|line| line.identifier.as_str())
            .collect();
        assert_eq!(
            identifiers,
            vec!["Lyman alpha", "H I 1026", "Mg II 2796", "Mg II 2804", "O VI 1032"]
        );

        let mg = database.get("Mg II 2796").expect("Mg II 2796 should exist");
        assert_eq!(mg.element, "Mg");
        assert_eq!(mg.ion_state, 2);
        assert_eq!(mg.field, "Mg_p1_number_density");
        assert_eq!(mg.f_value, 0.608);
        assert_eq!(mg.ion_label(), "Mg II");
    }

    #[test]
    fn malformed_rows_report_line_numbers() {
        let error = LineDatabase::from_catalog_str("H I\t1215.67\tfast\t0.4\n", "bad.txt")
            .expect_err("non-numeric gamma should fail");
        assert_eq!(error.placeholder(), "CONFIG.LINE_DATABASE");
        assert!(error.message().starts_with("bad.txt:1:"), "{}", error.message());

        let error = LineDatabase::from_catalog_str("# header\nHI\t1215.67\t1\t0.4\n", "bad.txt")
            .expect_err("missing ion state should fail");
        assert!(error.message().starts_with("bad.txt:2:"), "{}", error.message());

        let error = LineDatabase::from_catalog_str(
            "H I\t1215.67\t4.69e8\t0.416\nMg II\t\t2796.35\t2.6e8\t0.6\n",
            "bad.txt",
        )
        .expect_err("doubled tab should leave an empty wavelength column");
        assert!(error.message().starts_with("bad.txt:2:"), "{}", error.message());

        let database =
            LineDatabase::from_catalog_str("H I\t1215.67\t4.69e8\t0.416\t\n", "ok.txt")
                .expect("trailing empty identifier column should parse");
        assert_eq!(database.len(), 1);
    }

    #[test]
    fn add_line_accepts_roman_ion_states() {
        let mut database = LineDatabase::new();
        let line = database
            .add_line("C", "IV", 1548.187, 2.65e8, 0.19, None, None)
            .expect("line should be added");
        assert_eq!(line.identifier, "C IV 1548");
        assert_eq!(line.field, "C_p3_number_density");

        let custom = database
            .add_line("Si", "III", 1206.5, 2.5e9, 1.63, Some("si3_density"), Some("SiIII"))
            .expect("line should be added");
        assert_eq!(custom.field, "si3_density");
        assert_eq!(custom.identifier, "SiIII");

        let error = database
            .add_line("C", "iv", 1548.187, 2.65e8, 0.19, None, None)
            .expect_err("lower-case numeral should fail");
        assert_eq!(error.placeholder(), "CONFIG.LINE_ION_STATE");
        assert_eq!(database.len(), 2);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut database = LineDatabase::new();
        let error = database
            .add_transition(Transition::new("H", 1, -5.0, 1.0, 1.0))
            .expect_err("negative wavelength should fail");
        assert_eq!(error.placeholder(), "CONFIG.LINE_VALUE");
        assert!(database.is_empty());
    }

    #[test]
    fn subset_iterators_filter_by_ion_and_wavelength() {
        let database = LineDatabase::from_catalog_str(CATALOG, "lines.txt")
            .expect("catalog should parse");

        assert_eq!(database.by_element("H").count(), 2);
        assert_eq!(database.by_ion("Mg", 2).count(), 2);
        assert_eq!(database.by_ion("Mg", 1).count(), 0);
        assert_eq!(database.by_wavelength("Mg", 2, 2796).count(), 1);
    }

    #[test]
    fn load_records_source_path() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("lines.txt");
        fs::write(&path, CATALOG).expect("catalog staged");

        let database = LineDatabase::load(&path).expect("catalog should load");
        assert_eq!(database.len(), 5);
        assert_eq!(database.source(), Some(path.as_path()));

        let error = LineDatabase::load(&temp.path().join("missing.txt"))
            .expect_err("missing catalog should fail");
        assert_eq!(error.placeholder(), "IO.LINE_DATABASE_READ");
    }

    #[test]
    fn ion_labels_parse_strictly() {
        assert_eq!(parse_ion_label("Mg II"), Some(("Mg", 2)));
        assert_eq!(parse_ion_label("  O   VI "), Some(("O", 6)));
        assert_eq!(parse_ion_label("Mg"), None);
        assert_eq!(parse_ion_label("Mg II 2796"), None);
    }
}
