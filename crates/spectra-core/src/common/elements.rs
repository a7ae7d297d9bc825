//! Element symbols, atomic masses, and Roman-numeral ion states.

const ELEMENTS: [(&str, f64); 30] = [
    ("H", 1.00794),
    ("He", 4.002602),
    ("Li", 6.941),
    ("Be", 9.012182),
    ("B", 10.811),
    ("C", 12.0107),
    ("N", 14.0067),
    ("O", 15.9994),
    ("F", 18.9984032),
    ("Ne", 20.1797),
    ("Na", 22.989770),
    ("Mg", 24.3050),
    ("Al", 26.981538),
    ("Si", 28.0855),
    ("P", 30.973761),
    ("S", 32.065),
    ("Cl", 35.453),
    ("Ar", 39.948),
    ("K", 39.0983),
    ("Ca", 40.078),
    ("Sc", 44.955910),
    ("Ti", 47.867),
    ("V", 50.9415),
    ("Cr", 51.9961),
    ("Mn", 54.938049),
    ("Fe", 55.845),
    ("Co", 58.933200),
    ("Ni", 58.6934),
    ("Cu", 63.546),
    ("Zn", 65.409),
];

const ROMAN_DIGITS: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Atomic mass in amu for a case-sensitive element symbol.
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ELEMENTS
        .iter()
        .find(|(candidate, _)| *candidate == symbol)
        .map(|(_, mass)| *mass)
}

pub fn atomic_number(symbol: &str) -> Option<usize> {
    ELEMENTS
        .iter()
        .position(|(candidate, _)| *candidate == symbol)
        .map(|index| index + 1)
}

/// Tabulated element symbols in order of atomic number.
pub fn element_symbols() -> impl Iterator<Item = &'static str> {
    ELEMENTS.iter().map(|(symbol, _)| *symbol)
}

pub fn is_known_element(symbol: &str) -> bool {
    atomic_number(symbol).is_some()
}

pub fn to_roman(value: u32) -> String {
    let mut remaining = value;
    let mut numeral = String::new();
    for (weight, digits) in ROMAN_DIGITS {
        while remaining >= weight {
            numeral.push_str(digits);
            remaining -= weight;
        }
    }
    numeral
}

/// Parses a canonical upper-case Roman numeral ("I", "IV", "XII").
pub fn from_roman(numeral: &str) -> Option<u32> {
    if numeral.is_empty() {
        return None;
    }

    let mut total = 0_u32;
    let mut rest = numeral;
    for (weight, digits) in ROMAN_DIGITS {
        while let Some(stripped) = rest.strip_prefix(digits) {
            total += weight;
            rest = stripped;
        }
    }

    // Non-canonical spellings such as "IIII" round-trip to a different string.
    (rest.is_empty() && to_roman(total) == numeral).then_some(total)
}
