//! Physical unit normalization.
//!
//! Every stored dimension is expressed in the canonical unit of its
//! quantity: centimetres for lengths, square centimetres for areas, litres
//! for volumes. Masses keep the factor table used by the item normalizers
//! (`KG` is stored as is, `G` is divided by 1000).

use crate::errors::TransformError;
use crate::proto::Unit;

impl Unit {
    /// Multiplicative factor converting a value in this unit to its canonical unit.
    pub fn factor(self) -> f64 {
        match self {
            Unit::Cm | Unit::Kg | Unit::Cm2 | Unit::L => 1.0,
            Unit::M2 => 0.0001,
            Unit::G | Unit::M3 => 0.001,
            Unit::Mm2 => 0.01,
            Unit::Mm => 0.1,
            Unit::M => 100.0,
            Unit::Cm3 => 1000.0,
            Unit::Mm3 => 1_000_000.0,
        }
    }
}

/// Convert a raw value to the canonical unit of its quantity.
///
/// # Arguments
///
/// * `value` - The raw magnitude
/// * `unit` - The unit tag, as carried by the message
///
/// # Returns
///
/// * `Ok(f64)` - The normalized value
/// * `Err(TransformError::UnsupportedUnit)` - If the unit tag is unknown
pub fn normalize(value: f64, unit: i32) -> Result<f64, TransformError> {
    let unit = Unit::try_from(unit).map_err(|_| TransformError::UnsupportedUnit(unit))?;
    Ok(value * unit.factor())
}
