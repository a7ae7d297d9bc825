pub mod constants;
pub mod elements;

pub use elements::{
    atomic_mass, atomic_number, element_symbols, from_roman, is_known_element, to_roman,
};
