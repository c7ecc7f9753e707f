//! Project save state.
//!
//! The service keeps one JSON blob per save file. Pages merge what they
//! own into that blob without touching other pages' keys. A local snapshot
//! of the last saved state is kept as gzip-compressed bincode.

use bincode::{Options, serialize_into};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use crate::error::SaveError;
use crate::forms::{SiteDesignation, SiteParamsForm};

pub const DEFAULT_PROJECT_NAME: &str = "New Project";

/// Upper bound on the decoded size of a snapshot. Length prefixes past it
/// are rejected before anything is allocated.
pub const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// The climate and seismic table as shown on the site page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateSeismicTable {
    pub headers: Vec<String>,
    #[serde(rename = "matrixData")]
    pub matrix_data: Vec<Vec<f64>>,
}

/// The keys the site page contributes to the save blob.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSave {
    pub project_name: Option<String>,
    pub site_designation: Option<String>,
    pub seismic_value: Option<String>,
    pub address: Option<String>,
    pub importance_category: Option<String>,
    pub material_type: Option<String>,
    pub natural_frequency: Option<f64>,
    #[serde(rename = "climateSesmicData")]
    pub climate_seismic_data: Option<ClimateSeismicTable>,
}

impl ProjectSave {
    /// Collect the site page's inputs. A blank project name is saved as
    /// [`DEFAULT_PROJECT_NAME`].
    pub fn from_site(form: &SiteParamsForm, climate: Option<ClimateSeismicTable>) -> Self {
        let (site_designation, seismic_value) = match form.site_designation {
            Some(designation) => {
                let (kind, value) = designation.to_wire();
                (Some(kind.to_string()), Some(value))
            }
            None => (None, None),
        };
        let project_name = form.project_name.trim();

        ProjectSave {
            project_name: Some(if project_name.is_empty() {
                DEFAULT_PROJECT_NAME.to_string()
            } else {
                project_name.to_string()
            }),
            site_designation,
            seismic_value,
            address: Some(form.address.clone()),
            importance_category: Some(form.importance_category.clone()),
            material_type: Some(form.material_type.clone()),
            natural_frequency: form.natural_frequency,
            climate_seismic_data: if form.location_fetched { climate } else { None },
        }
    }

    /// Read the site page's keys out of a save blob. Keys owned by other
    /// pages are ignored; a numeric seismic value is accepted too.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let mut value: Value = serde_json::from_str(json)?;
        if let Some(object) = value.as_object_mut() {
            if let Some(Value::Number(n)) = object.get("seismicValue") {
                let text = n.to_string();
                object.insert("seismicValue".to_string(), Value::String(text));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Restore the site page from saved state. The location lookup has to
    /// be run again before the page can be accepted.
    pub fn apply_to(&self, form: &mut SiteParamsForm) {
        form.project_name = self.project_name.clone().unwrap_or_default();
        form.address = self.address.clone().unwrap_or_default();
        form.importance_category = self.importance_category.clone().unwrap_or_default();
        form.material_type = self.material_type.clone().unwrap_or_default();
        form.natural_frequency = self.natural_frequency;
        form.site_designation = match (&self.site_designation, &self.seismic_value) {
            (Some(kind), Some(value)) => SiteDesignation::from_wire(kind, value),
            _ => None,
        };
    }
}

/// Merge `update` over the blob `current` and return the new blob.
///
/// Top-level keys in `update` replace those in `current`; fields of
/// `update` that are unset leave the current value alone; every other key
/// of `current` is kept. An empty or non-object `current` counts as `{}`.
pub fn merge_save_data(current: &str, update: &ProjectSave) -> Result<String, SaveError> {
    let mut merged: Map<String, Value> = match serde_json::from_str::<Value>(current) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if let Value::Object(fields) = serde_json::to_value(update)? {
        for (key, value) in fields {
            if !value.is_null() {
                merged.insert(key, value);
            }
        }
    }

    Ok(serde_json::to_string(&Value::Object(merged))?)
}

/// Local copy of the last saved project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub save_file_id: Option<i64>,
    pub project: ProjectSave,
}

impl Snapshot {
    pub fn new(save_file_id: Option<i64>, project: ProjectSave) -> Self {
        Snapshot {
            saved_at: Utc::now(),
            save_file_id,
            project,
        }
    }
}

pub fn save_snapshot(snapshot: &Snapshot, filename: impl AsRef<Path>) -> Result<(), SaveError> {
    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, snapshot)?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?;

    Ok(())
}

// Same layout `serialize_into` writes, with a size limit for untrusted input.
fn snapshot_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_SNAPSHOT_BYTES)
}

pub fn load_snapshot(filename: impl AsRef<Path>) -> Result<Snapshot, SaveError> {
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    Ok(snapshot_options().deserialize_from(&mut reader)?)
}

/// Serialize a snapshot to a gzip buffer, for download.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, SaveError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serialize_into(&mut encoder, snapshot)?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

pub fn snapshot_from_bytes(buffer: &[u8]) -> Result<Snapshot, SaveError> {
    let decoder = GzDecoder::new(Cursor::new(buffer));
    let mut reader = BufReader::new(decoder);
    Ok(snapshot_options().deserialize_from(&mut reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::SiteClass;
    use serde_json::json;

    fn site() -> SiteParamsForm {
        SiteParamsForm {
            project_name: "  ".into(),
            address: "27 King's College Cir".into(),
            site_designation: Some(SiteDesignation::Xs(SiteClass::C)),
            location_fetched: true,
            importance_category: "NORMAL".into(),
            material_type: "CONCRETE".into(),
            natural_frequency: Some(1.1),
        }
    }

    #[test]
    fn merge_keeps_other_pages_keys() {
        let current = r#"{"projectName":"Old","zones":[[1,3.0]],"address":"x"}"#;
        let update = ProjectSave {
            project_name: Some("New".into()),
            ..Default::default()
        };
        let merged: Value = serde_json::from_str(&merge_save_data(current, &update).unwrap()).unwrap();
        assert_eq!(
            merged,
            json!({"projectName": "New", "zones": [[1, 3.0]], "address": "x"})
        );
    }

    #[test]
    fn merge_over_empty_or_garbage() {
        let update = ProjectSave::from_site(&site(), None);
        for current in ["", "null", "[1,2]", "{"] {
            let merged: Value =
                serde_json::from_str(&merge_save_data(current, &update).unwrap()).unwrap();
            assert_eq!(merged["projectName"], DEFAULT_PROJECT_NAME);
            assert_eq!(merged["siteDesignation"], "xs");
            assert_eq!(merged["seismicValue"], "C");
            assert!(merged.get("climateSesmicData").is_none());
        }
    }

    #[test]
    fn climate_table_only_saved_after_lookup() {
        let table = ClimateSeismicTable {
            headers: vec!["Latitude".into()],
            matrix_data: vec![vec![43.661]],
        };
        let mut form = site();
        assert!(ProjectSave::from_site(&form, Some(table.clone()))
            .climate_seismic_data
            .is_some());
        form.location_fetched = false;
        assert!(ProjectSave::from_site(&form, Some(table))
            .climate_seismic_data
            .is_none());
    }

    #[test]
    fn restore_site_page_from_blob() {
        let blob = r#"{"projectName":"Tower","siteDesignation":"xv","seismicValue":760,
                       "naturalFrequency":0.5,"somethingElse":true}"#;
        let saved = ProjectSave::from_json(blob).unwrap();
        let mut form = SiteParamsForm::default();
        saved.apply_to(&mut form);
        assert_eq!(form.project_name, "Tower");
        assert_eq!(form.site_designation, Some(SiteDesignation::Vs30(760.0)));
        assert_eq!(form.natural_frequency, Some(0.5));
        assert!(!form.location_fetched);
    }

    #[test]
    fn snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.bin.gz");
        let snapshot = Snapshot::new(Some(7), ProjectSave::from_site(&site(), None));

        save_snapshot(&snapshot, &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);

        let bytes = snapshot_to_bytes(&snapshot).unwrap();
        assert_eq!(snapshot_from_bytes(&bytes).unwrap(), snapshot);
        assert!(snapshot_from_bytes(b"not gzip").is_err());
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&(1u64 << 40).to_le_bytes()).unwrap();
        let bytes = encoder.finish().unwrap();

        assert!(matches!(
            snapshot_from_bytes(&bytes),
            Err(SaveError::Snapshot(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.bin.gz");
        std::fs::write(&path, &bytes).unwrap();
        assert!(load_snapshot(&path).is_err());
    }
}
