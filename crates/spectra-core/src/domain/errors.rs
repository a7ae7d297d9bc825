use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SpectraResult<T> = Result<T, SpectraError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectraErrorCategory {
    Configuration,
    Selection,
    Dataset,
    Format,
    IoSystem,
}

impl SpectraErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Selection => "SelectionError",
            Self::Dataset => "DatasetError",
            Self::Format => "FormatError",
            Self::IoSystem => "IoSystemError",
        }
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Selection => 3,
            Self::Dataset => 4,
            Self::Format => 5,
            Self::IoSystem => 6,
        }
    }
}

impl Display for SpectraErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectraError {
    category: SpectraErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SpectraError {
    pub fn new(
        category: SpectraErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Configuration, placeholder, message)
    }

    pub fn selection(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Selection, placeholder, message)
    }

    pub fn dataset(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Dataset, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::Format, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SpectraErrorCategory::IoSystem, placeholder, message)
    }

    pub const fn category(&self) -> SpectraErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

impl Display for SpectraError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SpectraError {}

#[cfg(test)]
mod tests {
    use super::{SpectraError, SpectraErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (SpectraErrorCategory::Configuration, 2, "ConfigurationError"),
            (SpectraErrorCategory::Selection, 3, "SelectionError"),
            (SpectraErrorCategory::Dataset, 4, "DatasetError"),
            (SpectraErrorCategory::Format, 5, "FormatError"),
            (SpectraErrorCategory::IoSystem, 6, "IoSystemError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
    }

    #[test]
    fn error_renders_diagnostic_line() {
        let error = SpectraError::configuration(
            "CONFIG.INSTRUMENT_UNKNOWN",
            "unknown instrument 'bogus'",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [CONFIG.INSTRUMENT_UNKNOWN] unknown instrument 'bogus'"
        );
        assert_eq!(
            error.to_string(),
            "ConfigurationError [CONFIG.INSTRUMENT_UNKNOWN] unknown instrument 'bogus'"
        );
    }
}
