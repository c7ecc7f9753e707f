//! Page form validation.
//!
//! Each form holds the raw values read from a page (`None` for an empty or
//! unparsable field) and turns them into the request bodies for the
//! computation service, or into the message shown in the page's alert box.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::floors::FloorElevationInput;
use crate::height_zone::{HeightZoneTable, building_height, zone_weights};
use crate::models::{
    BuildingInput, CladdingInput, DimensionsInput, ExposureFactor, ImportanceCategoryInput,
    LimitState, LoadsInput, LocationInput, MaterialTypeInput, NaturalFrequencyInput, RoofInput,
    WindFace, WindFactorInput,
};

/// Lower and upper bound of a measured Vs30, in m/s.
pub const VS30_RANGE: (f64, f64) = (140.0, 3000.0);

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn filled(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn reject(message: &'static str) -> FormError {
    warn!("{}", message);
    FormError::Invalid(message)
}

/// Building geometry page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGeometryForm {
    pub width: Option<f64>,
    pub floors: FloorElevationInput,
    pub cladding_top: Option<f64>,
    pub cladding_bottom: Option<f64>,
    pub dominant_opening: bool,
    pub mid_height: Option<f64>,
    pub roof_width: Option<f64>,
    pub roof_length: Option<f64>,
    pub roof_angle: Option<f64>,
    pub roof_dead_load: Option<f64>,
    pub zones: HeightZoneTable,
    pub material_weight: Option<f64>,
}

/// Everything the geometry page sends once it validates, in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySubmission {
    pub dimensions: DimensionsInput,
    pub cladding: CladdingInput,
    pub roof: RoofInput,
    pub building: BuildingInput,
}

impl BuildingGeometryForm {
    /// Fill the height-zone table from the accepted floor elevations,
    /// measured from sea level. Labels reset to one zone per floor.
    pub fn render_zone_table(&mut self) -> Result<(), FormError> {
        self.floors.validate().map_err(|_| {
            reject("Please Enter Valid Floor Elevations. Ensure that Sea Level < all floor elevations")
        })?;
        self.zones = HeightZoneTable::render(&self.floors.relative_elevations()?);
        Ok(())
    }

    pub fn validate(&self) -> Result<GeometrySubmission, FormError> {
        let width = positive(self.width).ok_or_else(|| reject("Please Enter A Valid Width value"))?;

        if self.floors.validate().is_err() {
            return Err(reject("Please Enter valid floor elevation dimensions"));
        }

        let num_floor = u32::try_from(self.floors.floor_count)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| reject("Please Enter A Valid floor number value"))?;

        let (c_top, c_bot) = match (positive(self.cladding_top), positive(self.cladding_bottom)) {
            (Some(top), Some(bottom)) if top > bottom => (top, bottom),
            _ => return Err(reject("Please Enter Valid Cladding Top and Bottom Information")),
        };

        let h_opening = if self.dominant_opening {
            Some(
                positive(self.mid_height)
                    .ok_or_else(|| reject("Please Enter Valid mid-height Information"))?,
            )
        } else {
            None
        };

        let slope = self
            .roof_angle
            .filter(|a| *a > 0.0 && *a < 360.0)
            .ok_or_else(|| reject("Please Enter A Valid roof angle [0, 360]"))?;

        let roof = match (
            positive(self.roof_width),
            positive(self.roof_length),
            positive(self.roof_dead_load),
        ) {
            (Some(w_roof), Some(l_roof), Some(uniform_dead_load)) if w_roof < l_roof => RoofInput {
                w_roof,
                l_roof,
                slope,
                uniform_dead_load,
            },
            _ => return Err(reject("Please Enter Valid roof information")),
        };

        let floor_rows = self
            .floors
            .relative_elevations()
            .map_err(|_| reject("Please enter valid height zone data."))?;
        if !self.zones.matches_floors(&floor_rows) {
            return Err(reject("Please enter valid height zone data."));
        }
        if let Err(e) = self.zones.validate() {
            warn!("{}", e);
            return Err(FormError::HeightZones(e));
        }
        let zones = self.zones.zones();
        let height = building_height(&zones).ok_or_else(|| reject("Please enter valid height zone data."))?;

        let material_weight = positive(self.material_weight)
            .ok_or_else(|| reject("Please enter a valid Material Weight KPA"))?;

        Ok(GeometrySubmission {
            dimensions: DimensionsInput {
                width,
                height,
                eave_height: None,
                ridge_height: None,
            },
            cladding: CladdingInput { c_top, c_bot },
            roof,
            building: BuildingInput {
                num_floor,
                h_opening,
                materials: zone_weights(&zones, material_weight),
                zones,
            },
        })
    }
}

/// Site class letter for the `Xs` site designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteClass {
    A,
    B,
    C,
    D,
    E,
}

impl SiteClass {
    pub fn parse(letter: &str) -> Option<Self> {
        match letter.trim() {
            "A" => Some(SiteClass::A),
            "B" => Some(SiteClass::B),
            "C" => Some(SiteClass::C),
            "D" => Some(SiteClass::D),
            "E" => Some(SiteClass::E),
            _ => None,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            SiteClass::A => "A",
            SiteClass::B => "B",
            SiteClass::C => "C",
            SiteClass::D => "D",
            SiteClass::E => "E",
        }
    }
}

/// How the site's seismic class is given: a site class letter, or a
/// measured shear-wave velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SiteDesignation {
    Xs(SiteClass),
    Vs30(f64),
}

impl SiteDesignation {
    /// A measured Vs30, accepted only inside [`VS30_RANGE`].
    pub fn vs30(value: f64) -> Option<Self> {
        (value >= VS30_RANGE.0 && value <= VS30_RANGE.1).then_some(SiteDesignation::Vs30(value))
    }

    /// Rebuild from the `(designation, value)` pair kept in save files.
    pub fn from_wire(designation: &str, value: &str) -> Option<Self> {
        match designation {
            "xs" => SiteClass::parse(value).map(SiteDesignation::Xs),
            "xv" => value.trim().parse().ok().and_then(SiteDesignation::vs30),
            _ => None,
        }
    }

    /// `("xs", "C")` or `("xv", "760")`.
    pub fn to_wire(&self) -> (&'static str, String) {
        match self {
            SiteDesignation::Xs(class) => ("xs", class.letter().to_string()),
            SiteDesignation::Vs30(v) => ("xv", v.to_string()),
        }
    }
}

/// Site parameters page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteParamsForm {
    pub project_name: String,
    pub address: String,
    pub site_designation: Option<SiteDesignation>,
    pub location_fetched: bool,
    pub importance_category: String,
    pub material_type: String,
    pub natural_frequency: Option<f64>,
}

/// Bodies sent when the site page is accepted, in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSubmission {
    pub natural_frequency: NaturalFrequencyInput,
    pub importance_category: ImportanceCategoryInput,
    pub material_type: MaterialTypeInput,
}

impl SiteParamsForm {
    /// Body for the climate/seismic lookup.
    pub fn location_request(&self) -> Result<LocationInput, FormError> {
        match (filled(&self.address), self.site_designation) {
            (Some(address), Some(designation)) => {
                let (site_designation, seismic_value) = designation.to_wire();
                Ok(LocationInput {
                    address,
                    site_designation: site_designation.to_string(),
                    seismic_value,
                })
            }
            _ => Err(reject(
                "Please enter the address and all site designation details. If using Vs30, ensure the value is between 140 and 3000.",
            )),
        }
    }

    pub fn validate(&self) -> Result<SiteSubmission, FormError> {
        if filled(&self.project_name).is_none() {
            return Err(reject("Please Choose A Project Name"));
        }
        if !self.location_fetched {
            return Err(reject("Please Hit the Get Sesmic and Climate Data Button"));
        }
        let importance_category = filled(&self.importance_category)
            .ok_or_else(|| reject("Please Choose An Importance Category"))?;
        let material_type =
            filled(&self.material_type).ok_or_else(|| reject("Please Choose An materialType"))?;
        let frequency = self
            .natural_frequency
            .filter(|f| f.is_finite() && *f != 0.0)
            .ok_or_else(|| reject("Please enter a valid natural frequency"))?;

        Ok(SiteSubmission {
            natural_frequency: NaturalFrequencyInput { frequency },
            importance_category: ImportanceCategoryInput { importance_category },
            material_type: MaterialTypeInput { material_type },
        })
    }
}

/// Which load page the engineer continues to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineerType {
    Main,
    WallCladding,
}

impl EngineerType {
    pub fn select(value: &str) -> Result<Self, FormError> {
        match value {
            "MAIN" => Ok(EngineerType::Main),
            "WALL_CLADDING" => Ok(EngineerType::WallCladding),
            _ => Err(reject("Please choose an engineering type")),
        }
    }

    pub fn next_page(self) -> &'static str {
        match self {
            EngineerType::Main => "main_structure_load.html",
            EngineerType::WallCladding => "wall_cladding_load.html",
        }
    }
}

/// Main-structure wind pressure page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WindFactorForm {
    pub exposure_factor: Option<ExposureFactor>,
    pub manual_ce: Option<f64>,
    pub ct: Option<f64>,
    pub limit_state: Option<LimitState>,
    pub face: Option<WindFace>,
}

impl WindFactorForm {
    pub fn validate(&self) -> Result<WindFactorInput, FormError> {
        let exposure_factor = self
            .exposure_factor
            .ok_or_else(|| reject("Please select an exposure factor"))?;

        let manual_ce = self.manual_ce.filter(|v| v.is_finite() && *v != 0.0);
        if exposure_factor == ExposureFactor::Intermediate && manual_ce.is_none() {
            return Err(reject("Please input an intermediate ce value"));
        }

        let ct = self
            .ct
            .filter(|v| v.is_finite() && *v != 0.0)
            .ok_or_else(|| reject("Please input a ct Value"))?;

        if self.limit_state.is_none() {
            return Err(reject("Please select either ULS or SLS"));
        }
        if self.face.is_none() {
            return Err(reject("Please select a face (typically value is Windward)"));
        }

        Ok(WindFactorInput {
            ct,
            exposure_factor,
            manual_ce_cei: if exposure_factor == ExposureFactor::Intermediate {
                manual_ce
            } else {
                None
            },
        })
    }
}

/// Load factors of one load combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadCombination {
    #[serde(rename = "type")]
    pub limit_state: LimitState,
    #[serde(rename = "D")]
    pub dead: f64,
    #[serde(rename = "L")]
    pub live: f64,
    #[serde(rename = "W")]
    pub wind: f64,
}

/// Load combination page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadCombinationForm {
    pub face: Option<WindFace>,
    pub combination: Option<LoadCombination>,
}

impl LoadCombinationForm {
    pub fn validate(&self) -> Result<LoadsInput, FormError> {
        match (self.face, self.combination) {
            (Some(face), Some(c)) => Ok(LoadsInput {
                dead_coef: Some(c.dead),
                live_coef: Some(c.live),
                wind_coef: Some(c.wind),
                wind_face: Some(face),
                uls_or_sls: Some(c.limit_state),
                snow_coef: None,
                seismic_coef: None,
            }),
            _ => Err(reject("Please select a combination and a face")),
        }
    }
}
