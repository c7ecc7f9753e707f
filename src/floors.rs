//! Floor elevation table and its monotonicity check.
//!
//! Floors are always indexed from the lowest floor upward: index 0 is
//! floor 1. Elevations the user has not entered yet are `None`.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::FormError;

/// One row of the floor elevation table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorRecord {
    /// 1 = lowest floor
    pub floor_number: u32,
    pub elevation: Option<f64>,
}

/// Check that floor elevations never decrease from the lowest floor up.
///
/// Only adjacent pairs where both entries are set are compared, so a gap
/// of unset floors hides the comparison across it. Empty, single-floor and
/// all-unset inputs are valid.
///
/// # Examples
/// ```
/// use aspenlog::floors::validate_floor_elevations;
///
/// assert!(validate_floor_elevations(&[Some(3.0), Some(6.0), Some(6.0)]));
/// assert!(!validate_floor_elevations(&[Some(6.0), Some(3.0)]));
/// assert!(validate_floor_elevations(&[Some(6.0), None, Some(3.0)]));
/// ```
pub fn validate_floor_elevations(elevations: &[Option<f64>]) -> bool {
    elevations.windows(2).all(|pair| match (pair[0], pair[1]) {
        (Some(below), Some(above)) => above >= below,
        _ => true,
    })
}

/// Per-floor elevations with the "typical floor" fill-down helper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorElevationTable {
    elevations: Vec<Option<f64>>,
    typical: Vec<bool>,
    typical_height: f64,
}

impl FloorElevationTable {
    /// Create a table of `floor_count` floors with every elevation unset and
    /// every floor marked typical. A zero floor count is rejected.
    pub fn new(floor_count: usize, typical_height: f64) -> Result<Self, FormError> {
        if floor_count == 0 {
            return Err(FormError::Invalid(
                "Invalid number of floors. Provide a positive integer.",
            ));
        }
        Ok(FloorElevationTable {
            elevations: vec![None; floor_count],
            typical: vec![true; floor_count],
            typical_height: if typical_height.is_finite() {
                typical_height
            } else {
                0.0
            },
        })
    }

    pub fn floor_count(&self) -> usize {
        self.elevations.len()
    }

    /// Set the elevation of `floor` (1-based). Returns false for a floor
    /// outside the table. Non-finite input clears the field.
    pub fn set_elevation(&mut self, floor: u32, elevation: Option<f64>) -> bool {
        match self.slot(floor) {
            Some(i) => {
                self.elevations[i] = elevation.filter(|e| e.is_finite());
                true
            }
            None => false,
        }
    }

    /// Toggle the typical flag of `floor` and refill the table, mirroring
    /// the checkbox behaviour of the elevation page.
    pub fn set_typical(&mut self, floor: u32, typical: bool) -> bool {
        match self.slot(floor) {
            Some(i) => {
                self.typical[i] = typical;
                self.recalculate();
                true
            }
            None => false,
        }
    }

    /// Fill typical floors from the bottom up.
    ///
    /// Floor 1 gets the typical height itself, every other typical floor
    /// sits one typical height above the floor below it. Floors that are not
    /// typical keep whatever the user entered and become the baseline for
    /// the floor above.
    pub fn recalculate(&mut self) {
        let mut previous: Option<f64> = None;
        for i in 0..self.elevations.len() {
            if self.typical[i] {
                let base = if i == 0 { 0.0 } else { previous.unwrap_or(0.0) };
                self.elevations[i] = Some(base + self.typical_height);
            }
            previous = self.elevations[i];
        }
    }

    pub fn elevations(&self) -> &[Option<f64>] {
        &self.elevations
    }

    pub fn records(&self) -> Vec<FloorRecord> {
        self.elevations
            .iter()
            .enumerate()
            .map(|(i, elevation)| FloorRecord {
                floor_number: i as u32 + 1,
                elevation: *elevation,
            })
            .collect()
    }

    pub fn validate(&self) -> bool {
        validate_floor_elevations(&self.elevations)
    }

    fn slot(&self, floor: u32) -> Option<usize> {
        let index = (floor as usize).checked_sub(1)?;
        (index < self.elevations.len()).then_some(index)
    }
}

/// The floor section of the building geometry page: floor count, the
/// sea/ground level datum and the elevation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorElevationInput {
    pub floor_count: usize,
    pub sea_level: f64,
    pub table: FloorElevationTable,
}

impl FloorElevationInput {
    pub fn new(floor_count: usize, sea_level: f64, typical_height: f64) -> Result<Self, FormError> {
        Ok(FloorElevationInput {
            floor_count,
            sea_level,
            table: FloorElevationTable::new(floor_count, typical_height)?,
        })
    }

    /// Build from elevations already known, lowest floor first.
    pub fn from_elevations(sea_level: f64, elevations: &[Option<f64>]) -> Result<Self, FormError> {
        let mut input = FloorElevationInput::new(elevations.len(), sea_level, 0.0)?;
        for (i, elevation) in elevations.iter().enumerate() {
            input.table.set_elevation(i as u32 + 1, *elevation);
            input.table.typical[i] = false;
        }
        Ok(input)
    }

    /// Page-level validation: the monotonicity check plus the rule that the
    /// lowest floor must sit above sea level.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.floor_count == 0 || self.floor_count != self.table.floor_count() {
            warn!("Invalid number of floors: {}", self.floor_count);
            return Err(FormError::Invalid("Invalid number of floors."));
        }

        if !self.sea_level.is_finite() {
            warn!("Sea level value must be a number");
            return Err(FormError::Invalid("Sea level value must be a number."));
        }

        if !self.table.validate() {
            warn!("Floor elevations are invalid. They must increase progressively");
            return Err(FormError::Invalid(
                "Floor elevations are invalid. They must increase progressively.",
            ));
        }

        // an unset lowest floor cannot clear the datum either
        match self.table.elevations().first() {
            Some(Some(lowest)) if *lowest > self.sea_level => {}
            lowest => {
                warn!(
                    "First floor elevation {:?} is not above sea level {}",
                    lowest.copied().flatten(),
                    self.sea_level
                );
                return Err(FormError::Invalid(
                    "The first floor elevation must be greater than the sea level.",
                ));
            }
        }

        Ok(())
    }

    /// `(floor, elevation above sea level)` rows for the height-zone table.
    /// Every floor must have an elevation by now.
    pub fn relative_elevations(&self) -> Result<Vec<(u32, f64)>, FormError> {
        self.table
            .records()
            .into_iter()
            .map(|record| {
                record
                    .elevation
                    .map(|e| (record.floor_number, e - self.sea_level))
                    .ok_or(FormError::Invalid(
                        "Please Enter Valid Floor Elevations. Ensure that Sea Level < all floor elevations",
                    ))
            })
            .collect()
    }
}
