//! Request and response bodies of the load computation service.
//!
//! Field names follow the service's snake_case JSON. Optional inputs are
//! sent as explicit `null`s, which the service expects.

use serde::{Deserialize, Serialize};

use crate::height_zone::Zone;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionsInput {
    pub width: f64,
    pub height: f64,
    pub eave_height: Option<f64>,
    pub ridge_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CladdingInput {
    pub c_top: f64,
    pub c_bot: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofInput {
    pub w_roof: f64,
    pub l_roof: f64,
    pub slope: f64,
    pub uniform_dead_load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingInput {
    pub num_floor: u32,
    pub h_opening: Option<f64>,
    /// `[zone, top elevation]` pairs
    pub zones: Vec<Zone>,
    /// `[zone, material weight]` pairs
    pub materials: Vec<(u32, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    pub address: String,
    pub site_designation: String,
    pub seismic_value: String,
}

/// Climate and seismic data the service looked up for an address.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub wind_velocity_pressure: f64,
    pub snow_load: f64,
    pub rain_load: f64,
    pub design_spectral_acceleration_0_2: f64,
    pub design_spectral_acceleration_1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceCategoryInput {
    pub importance_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialTypeInput {
    pub material_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalFrequencyInput {
    pub frequency: f64,
}

/// Terrain exposure used for the exposure factor Ce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureFactor {
    Open,
    Rough,
    Intermediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitState {
    #[serde(rename = "ULS")]
    Uls,
    #[serde(rename = "SLS")]
    Sls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindFace {
    Windward,
    Leeward,
    // the pressure page once sent SIDEWALLS without the underscore
    #[serde(alias = "SIDEWALLS")]
    SideWalls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindFactorInput {
    pub ct: f64,
    pub exposure_factor: ExposureFactor,
    pub manual_ce_cei: Option<f64>,
}

/// Wind factors the service computed for one height zone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MainStructureWindFactor {
    pub ct: Option<f64>,
    pub ce_windward: f64,
    pub ce_leeward: f64,
    pub ce_side_walls: f64,
    pub cp_windward: f64,
    pub cp_leeward: f64,
    pub cp_side_walls: f64,
    pub cg_uls: f64,
    pub cg_sls: f64,
    pub p_windward_uls: f64,
    pub p_windward_sls: f64,
    pub p_leeward_uls: f64,
    pub p_leeward_sls: f64,
    pub p_side_walls_uls: f64,
    pub p_side_walls_sls: f64,
}

/// One zone as stored by the service after the building was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHeightZone {
    pub zone_num: u32,
    pub elevation: f64,
    #[serde(default)]
    pub wp: Option<f64>,
    #[serde(default)]
    pub main_structure_wind_factor: Option<MainStructureWindFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadsInput {
    pub dead_coef: Option<f64>,
    pub live_coef: Option<f64>,
    pub wind_coef: Option<f64>,
    pub wind_face: Option<WindFace>,
    pub uls_or_sls: Option<LimitState>,
    pub snow_coef: Option<f64>,
    pub seismic_coef: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDataInput {
    pub json_data: String,
    pub id: i64,
}

/// A stored save file. `json_data` is itself a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(alias = "JsonData")]
    pub json_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn building_body_shape() {
        let body = BuildingInput {
            num_floor: 3,
            h_opening: None,
            zones: vec![
                Zone {
                    zone_index: 1,
                    top_elevation: 6.0,
                },
                Zone {
                    zone_index: 2,
                    top_elevation: 9.0,
                },
            ],
            materials: vec![(1, 1.5), (2, 1.5)],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "num_floor": 3,
                "h_opening": null,
                "zones": [[1, 6.0], [2, 9.0]],
                "materials": [[1, 1.5], [2, 1.5]],
            })
        );
    }

    #[test]
    fn enum_wire_names() {
        let input = LoadsInput {
            dead_coef: Some(1.25),
            live_coef: Some(1.5),
            wind_coef: Some(0.4),
            wind_face: Some(WindFace::SideWalls),
            uls_or_sls: Some(LimitState::Uls),
            snow_coef: None,
            seismic_coef: None,
        };
        let v = serde_json::to_value(&input).unwrap();
        assert_eq!(v["wind_face"], "SIDE_WALLS");
        assert_eq!(v["uls_or_sls"], "ULS");
        assert!(v["snow_coef"].is_null());

        let wf = WindFactorInput {
            ct: 1.0,
            exposure_factor: ExposureFactor::Intermediate,
            manual_ce_cei: Some(0.8),
        };
        assert_eq!(
            serde_json::to_value(&wf).unwrap()["exposure_factor"],
            "intermediate"
        );
    }

    #[test]
    fn side_walls_accepts_the_old_spelling() {
        let face: WindFace = serde_json::from_str(r#""SIDEWALLS""#).unwrap();
        assert_eq!(face, WindFace::SideWalls);
        assert_eq!(serde_json::to_value(face).unwrap(), "SIDE_WALLS");
    }

    #[test]
    fn save_data_accepts_both_spellings() {
        let a: SaveData = serde_json::from_str(r#"{"json_data":"{}"}"#).unwrap();
        let b: SaveData = serde_json::from_str(r#"{"JsonData":"{}"}"#).unwrap();
        assert_eq!(a, b);
    }
}
