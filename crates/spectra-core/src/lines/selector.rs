use super::database::{LineDatabase, Transition};
use crate::common::{from_roman, to_roman};
use crate::domain::{SpectraError, SpectraResult};
use std::fmt::{Display, Formatter};

/// One entry of a line request: `"H"`, `"C IV"`, or `"Mg II 2796"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSpecifier {
    Element(String),
    Ion { element: String, ion_state: u32 },
    Line {
        element: String,
        ion_state: u32,
        wavelength: i64,
    },
}

impl LineSpecifier {
    pub fn parse(specifier: &str) -> SpectraResult<Self> {
        let tokens: Vec<&str> = specifier.split_whitespace().collect();
        let parsed = match tokens.as_slice() {
            [element] => Some(Self::Element(element.to_string())),
            [element, ion] => from_roman(ion).map(|ion_state| Self::Ion {
                element: element.to_string(),
                ion_state,
            }),
            [element, ion, wavelength] => from_roman(ion).zip(parse_wavelength(wavelength)).map(
                |(ion_state, wavelength)| Self::Line {
                    element: element.to_string(),
                    ion_state,
                    wavelength,
                },
            ),
            _ => None,
        };

        parsed.ok_or_else(|| {
            SpectraError::selection(
                "SELECT.MALFORMED",
                format!(
                    "malformed line specifier '{}'; expected 'El', 'El ION', or 'El ION WAVELENGTH'",
                    specifier
                ),
            )
        })
    }

    pub fn matches(&self, transition: &Transition) -> bool {
        match self {
            Self::Element(element) => transition.element == *element,
            Self::Ion { element, ion_state } => {
                transition.element == *element && transition.ion_state == *ion_state
            }
            Self::Line {
                element,
                ion_state,
                wavelength,
            } => {
                transition.element == *element
                    && transition.ion_state == *ion_state
                    && transition.integer_wavelength() == *wavelength
            }
        }
    }
}

impl Display for LineSpecifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element(element) => write!(f, "{}", element),
            Self::Ion { element, ion_state } => {
                write!(f, "{} {}", element, to_roman(*ion_state))
            }
            Self::Line {
                element,
                ion_state,
                wavelength,
            } => write!(
                f,
                "{} {} {}",
                element,
                to_roman(*ion_state),
                wavelength
            ),
        }
    }
}

// Wavelength tokens compare after rounding, so "1216" and "1215.67" both name Lyman alpha.
fn parse_wavelength(token: &str) -> Option<i64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.round() as i64)
}

impl LineDatabase {
    /// Lines matching any of the requested specifiers.
    ///
    /// `None` or an empty request selects the whole catalog. Results follow
    /// the request order (catalog order within one specifier) and contain each
    /// transition once. A specifier that matches nothing is an error, as is
    /// one that cannot be parsed.
    pub fn select<S: AsRef<str>>(&self, requested: Option<&[S]>) -> SpectraResult<Vec<Transition>> {
        let requested = match requested {
            Some(requested) if !requested.is_empty() => requested,
            _ => return Ok(self.lines().to_vec()),
        };

        let specifiers = requested
            .iter()
            .map(|specifier| LineSpecifier::parse(specifier.as_ref()))
            .collect::<SpectraResult<Vec<_>>>()?;

        let mut chosen: Vec<usize> = Vec::new();
        for specifier in &specifiers {
            let mut matched = false;
            for (index, line) in self.lines().iter().enumerate() {
                if specifier.matches(line) {
                    matched = true;
                    if !chosen.contains(&index) {
                        chosen.push(index);
                    }
                }
            }
            if !matched {
                return Err(SpectraError::selection(
                    "SELECT.NO_MATCH",
                    format!("no lines in the database match '{}'", specifier),
                ));
            }
        }

        let selected: Vec<Transition> = chosen
            .into_iter()
            .map(|index| self.lines()[index].clone())
            .collect();
        tracing::debug!(
            requested = requested.len(),
            selected = selected.len(),
            "selected lines"
        );
        Ok(selected)
    }
}
