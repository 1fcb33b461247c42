mod luhn;
mod minor_units;

pub mod op;

pub use luhn::is_luhn_valid;
pub use minor_units::{MinorUnits, MinorUnitsConversionError, MINOR_UNITS_PER_MAJOR};
