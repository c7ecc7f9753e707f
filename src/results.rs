//! Result tables built from the service's per-zone wind factors.

use serde::{Deserialize, Serialize};

use crate::downloader::ExportTable;
use crate::models::{LimitState, LocationData, MainStructureWindFactor, WindFace};

pub const PRESSURE_HEADERS: [&str; 5] = ["Height Zone", "Ce", "Cg", "Cp", "p"];

pub const LOAD_COMBINATION_HEADERS: [&str; 6] =
    ["Height Zone", "Ce", "Cg", "Cp", "Wind p", "Total Load (KN)"];

pub const CLIMATE_SEISMIC_HEADERS: [&str; 7] = [
    "Wind Pressure, kPa, 1/50 (q)",
    "Ground Snow Load, kPa, 1/50 (Ss)",
    "Rain Load, kPa, 1/50 (Sr)",
    "Design Spectral Acceleration at 0.2 sec",
    "Design Spectral Acceleration at 1 sec",
    "Latitude",
    "Longitude",
];

/// Ce, Cg, Cp and p of one zone for a chosen face and limit state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorRow {
    pub ce: f64,
    pub cg: f64,
    pub cp: f64,
    pub p: f64,
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub fn select_factors(factor: &MainStructureWindFactor, face: WindFace, state: LimitState) -> FactorRow {
    let cg = match state {
        LimitState::Uls => factor.cg_uls,
        LimitState::Sls => factor.cg_sls,
    };
    let (ce, cp, p) = match (face, state) {
        (WindFace::Windward, LimitState::Uls) => (factor.ce_windward, factor.cp_windward, factor.p_windward_uls),
        (WindFace::Windward, LimitState::Sls) => (factor.ce_windward, factor.cp_windward, factor.p_windward_sls),
        (WindFace::Leeward, LimitState::Uls) => (factor.ce_leeward, factor.cp_leeward, factor.p_leeward_uls),
        (WindFace::Leeward, LimitState::Sls) => (factor.ce_leeward, factor.cp_leeward, factor.p_leeward_sls),
        (WindFace::SideWalls, LimitState::Uls) => {
            (factor.ce_side_walls, factor.cp_side_walls, factor.p_side_walls_uls)
        }
        (WindFace::SideWalls, LimitState::Sls) => {
            (factor.ce_side_walls, factor.cp_side_walls, factor.p_side_walls_sls)
        }
    };
    FactorRow { ce, cg, cp, p }
}

/// Pressure table: one row per zone, numbered from 1 by position.
pub fn pressure_table(factors: &[MainStructureWindFactor], face: WindFace, state: LimitState) -> ExportTable {
    let rows = factors
        .iter()
        .enumerate()
        .map(|(i, factor)| {
            let row = select_factors(factor, face, state);
            vec![(i + 1) as f64, round3(row.ce), round3(row.cg), round3(row.cp), round3(row.p)]
        })
        .collect();
    ExportTable::new(&PRESSURE_HEADERS, rows)
}

/// Pressure factors next to the total load of each zone.
///
/// Returns `None` when the service sent a different number of loads than
/// there are zones.
pub fn load_combination_table(
    factors: &[MainStructureWindFactor],
    loads: &[f64],
    face: WindFace,
    state: LimitState,
) -> Option<ExportTable> {
    if factors.len() != loads.len() {
        return None;
    }
    let rows = factors
        .iter()
        .zip(loads)
        .enumerate()
        .map(|(i, (factor, load))| {
            let row = select_factors(factor, face, state);
            vec![
                (i + 1) as f64,
                round3(row.ce),
                round3(row.cg),
                round3(row.cp),
                round3(row.p),
                round3(*load),
            ]
        })
        .collect();
    Some(ExportTable::new(&LOAD_COMBINATION_HEADERS, rows))
}

/// The single row of the climate and seismic table.
pub fn climate_seismic_row(location: &LocationData) -> Vec<f64> {
    vec![
        location.wind_velocity_pressure,
        location.snow_load,
        location.rain_load,
        location.design_spectral_acceleration_0_2,
        location.design_spectral_acceleration_1,
        round3(location.latitude),
        round3(location.longitude),
    ]
}

pub fn climate_seismic_table(location: &LocationData) -> ExportTable {
    ExportTable::new(&CLIMATE_SEISMIC_HEADERS, vec![climate_seismic_row(location)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(scale: f64) -> MainStructureWindFactor {
        MainStructureWindFactor {
            ce_windward: 0.9 * scale,
            ce_leeward: 0.7 * scale,
            ce_side_walls: 0.8 * scale,
            cp_windward: 0.8,
            cp_leeward: -0.5,
            cp_side_walls: -0.7,
            cg_uls: 2.0,
            cg_sls: 1.5,
            p_windward_uls: 1.23456 * scale,
            p_windward_sls: 0.9 * scale,
            p_leeward_uls: -0.5 * scale,
            p_leeward_sls: -0.4 * scale,
            p_side_walls_uls: -0.6 * scale,
            p_side_walls_sls: -0.45 * scale,
            ..Default::default()
        }
    }

    #[test]
    fn selects_face_and_limit_state() {
        let f = factor(1.0);
        assert_eq!(
            select_factors(&f, WindFace::Leeward, LimitState::Sls),
            FactorRow {
                ce: 0.7,
                cg: 1.5,
                cp: -0.5,
                p: -0.4
            }
        );
        assert_eq!(select_factors(&f, WindFace::SideWalls, LimitState::Uls).p, -0.6);
    }

    #[test]
    fn pressure_rows_are_rounded_and_numbered() {
        let table = pressure_table(&[factor(1.0), factor(2.0)], WindFace::Windward, LimitState::Uls);
        assert_eq!(table.headers, PRESSURE_HEADERS.to_vec());
        assert_eq!(table.rows[0], vec![1.0, 0.9, 2.0, 0.8, 1.235]);
        assert_eq!(table.rows[1][0], 2.0);
        assert_eq!(table.rows[1][4], 2.469);
    }

    #[test]
    fn load_table_requires_one_load_per_zone() {
        let factors = [factor(1.0), factor(1.0)];
        assert!(load_combination_table(&factors, &[10.0], WindFace::Windward, LimitState::Uls).is_none());
        let table =
            load_combination_table(&factors, &[10.12345, 20.0], WindFace::Windward, LimitState::Uls).unwrap();
        assert_eq!(table.rows[0][5], 10.123);
        assert_eq!(table.headers.len(), 6);
    }

    #[test]
    fn climate_row_rounds_coordinates() {
        let location = LocationData {
            latitude: 43.660741,
            longitude: -79.396612,
            wind_velocity_pressure: 0.34,
            ..Default::default()
        };
        let row = climate_seismic_row(&location);
        assert_eq!(row[0], 0.34);
        assert_eq!(row[5], 43.661);
        assert_eq!(row[6], -79.397);
    }
}
