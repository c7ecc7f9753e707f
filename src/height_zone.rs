//! Height-zone consolidation.
//!
//! The user labels each floor with a zone number. Consecutive floors that
//! share a label collapse into one zone whose top elevation is the
//! elevation of the highest floor in the run. Zones are then renumbered
//! 1..K from the bottom, discarding the user's labels.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ZoneError;

/// A floor with the zone label the user assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneAssignment {
    pub floor_number: u32,
    pub elevation: f64,
    /// Raw user input; range-checked by [`validate_zone_assignments`].
    pub zone_number: i64,
}

/// A consolidated zone: its position from the bottom and its top elevation.
///
/// Serialized as an `[index, elevation]` pair, which is the shape the
/// computation service expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u32, f64)", into = "(u32, f64)")]
pub struct Zone {
    pub zone_index: u32,
    pub top_elevation: f64,
}

impl From<(u32, f64)> for Zone {
    fn from((zone_index, top_elevation): (u32, f64)) -> Self {
        Zone {
            zone_index,
            top_elevation,
        }
    }
}

impl From<Zone> for (u32, f64) {
    fn from(zone: Zone) -> Self {
        (zone.zone_index, zone.top_elevation)
    }
}

/// Check the zone labels of a table ordered from floor 1 upward.
///
/// Every label must lie in `[1, N]` for an N-floor table, and labels may
/// never decrease going up.
pub fn validate_zone_assignments(assignments: &[ZoneAssignment]) -> Result<(), ZoneError> {
    let floors = assignments.len();
    let mut previous = 0;

    for (i, assignment) in assignments.iter().enumerate() {
        let zone = assignment.zone_number;
        if zone < 1 || zone > floors as i64 {
            return Err(ZoneError::OutOfRange {
                row: i + 1,
                zone,
                floors,
            });
        }
        if zone < previous {
            return Err(ZoneError::Descending {
                row: i + 1,
                zone,
                previous,
            });
        }
        previous = zone;
    }

    Ok(())
}

/// Collapse a labelled floor table into zones.
///
/// Returns an empty vector (and logs why) when the labels are invalid.
///
/// # Examples
/// ```
/// use aspenlog::height_zone::{compute_height_zones, ZoneAssignment};
///
/// let table: Vec<ZoneAssignment> = [1, 1, 2, 2, 3]
///     .iter()
///     .zip([10.0, 20.0, 30.0, 40.0, 50.0])
///     .enumerate()
///     .map(|(i, (&zone_number, elevation))| ZoneAssignment {
///         floor_number: i as u32 + 1,
///         elevation,
///         zone_number,
///     })
///     .collect();
///
/// let zones: Vec<(u32, f64)> = compute_height_zones(&table)
///     .into_iter()
///     .map(Into::into)
///     .collect();
/// assert_eq!(zones, vec![(1, 20.0), (2, 40.0), (3, 50.0)]);
/// ```
pub fn compute_height_zones(assignments: &[ZoneAssignment]) -> Vec<Zone> {
    if let Err(e) = validate_zone_assignments(assignments) {
        warn!("{}", e);
        return Vec::new();
    }

    // Walk from the top floor down so the first floor seen in each run is
    // its highest, and that floor's elevation becomes the zone top.
    let mut runs: Vec<(i64, f64)> = Vec::new();
    for assignment in assignments.iter().rev() {
        match runs.last() {
            Some(&(label, _)) if label == assignment.zone_number => {}
            _ => runs.push((assignment.zone_number, assignment.elevation)),
        }
    }

    runs.iter()
        .rev()
        .enumerate()
        .map(|(i, &(_, elevation))| Zone {
            zone_index: i as u32 + 1,
            top_elevation: elevation,
        })
        .collect()
}

/// Height of the building: the top of the highest zone.
pub fn building_height(zones: &[Zone]) -> Option<f64> {
    zones.last().map(|zone| zone.top_elevation)
}

/// One `(zone, material weight)` pair per zone, all sharing the same
/// material weight constant.
pub fn zone_weights(zones: &[Zone], material_weight: f64) -> Vec<(u32, f64)> {
    zones
        .iter()
        .map(|zone| (zone.zone_index, material_weight))
        .collect()
}

/// The zone labelling table shown after the floor elevations are accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeightZoneTable {
    rows: Vec<ZoneAssignment>,
}

impl HeightZoneTable {
    /// Build the table from `(floor, elevation)` rows ordered from floor 1.
    /// Each floor starts out as its own zone.
    pub fn render(rows: &[(u32, f64)]) -> Self {
        HeightZoneTable {
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, &(floor_number, elevation))| ZoneAssignment {
                    floor_number,
                    elevation,
                    zone_number: i as i64 + 1,
                })
                .collect(),
        }
    }

    /// Label `floor` with `zone`. Returns false when the floor is not in
    /// the table.
    pub fn set_zone(&mut self, floor: u32, zone: i64) -> bool {
        match self.rows.iter_mut().find(|row| row.floor_number == floor) {
            Some(row) => {
                row.zone_number = zone;
                true
            }
            None => false,
        }
    }

    pub fn assignments(&self) -> &[ZoneAssignment] {
        &self.rows
    }

    /// True when the table has exactly one row per `(floor, elevation)`
    /// pair, in the same order.
    pub fn matches_floors(&self, rows: &[(u32, f64)]) -> bool {
        self.rows.len() == rows.len()
            && self
                .rows
                .iter()
                .zip(rows)
                .all(|(row, &(floor, elevation))| row.floor_number == floor && row.elevation == elevation)
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        validate_zone_assignments(&self.rows)
    }

    pub fn zones(&self) -> Vec<Zone> {
        compute_height_zones(&self.rows)
    }
}
