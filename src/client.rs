//! Authenticated client for the load computation service.
//!
//! Every call carries the stored bearer token. The service keeps the
//! submitted building per user, so the geometry pages must be submitted
//! before wind factors or loads can be requested.

use log::{debug, error};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::credentials::CredentialStore;
use crate::downloader::ExportTable;
use crate::error::{ClientError, FormError};
use crate::forms::{BuildingGeometryForm, GeometrySubmission, LoadCombinationForm, SiteParamsForm, WindFactorForm};
use crate::models::{
    BuildingInput, CladdingInput, DimensionsInput, ImportanceCategoryInput, LoadsInput, LocationData, LocationInput,
    MainStructureWindFactor, MaterialTypeInput, NaturalFrequencyInput, RoofInput, SaveData, SaveDataInput,
    StoredHeightZone, WindFactorInput,
};
use crate::results::{load_combination_table, pressure_table};
use crate::saving::{ProjectSave, merge_save_data};

pub struct BackendClient {
    http: Client,
    address: String,
    token: String,
    no_cache: bool,
}

impl BackendClient {
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        BackendClient {
            http: Client::new(),
            address: address.into().trim_end_matches('/').to_string(),
            token: token.into(),
            no_cache: false,
        }
    }

    /// Build a client from the stored connection address and token.
    pub fn from_store(store: &dyn CredentialStore) -> Result<Self, ClientError> {
        let address = store.get_connection_address()?;
        let token = store.get_token()?;
        Ok(Self::new(address, token))
    }

    /// Ask the service and any proxy in between not to serve cached responses.
    pub fn disable_cache(mut self, disabled: bool) -> Self {
        self.no_cache = disabled;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.address, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json");
        if self.no_cache {
            request.header(CACHE_CONTROL, "no-cache")
        } else {
            request
        }
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        debug!("calling {}", endpoint);
        let response = self.authorize(request).send().await.map_err(|source| {
            error!("request to {} failed: {}", endpoint, source);
            ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("{} answered {}", endpoint, status);
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn read<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ClientError> {
        let text = response.text().await.map_err(|source| ClientError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            endpoint: endpoint.to_string(),
            detail: e.to_string(),
        })
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(endpoint)).json(body);
        let response = self.send(endpoint, request).await?;
        Self::read(endpoint, response).await
    }

    /// Post a body whose response carries nothing the client needs.
    async fn post_ack<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<(), ClientError> {
        let request = self.http.post(self.url(endpoint)).json(body);
        let response = self.send(endpoint, request).await?;
        // drain so the connection can be reused
        let _ = response.bytes().await;
        Ok(())
    }

    async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let request = self.http.post(self.url(endpoint));
        let response = self.send(endpoint, request).await?;
        Self::read(endpoint, response).await
    }

    pub async fn dimensions(&self, input: &DimensionsInput) -> Result<(), ClientError> {
        self.post_ack("dimensions", input).await
    }

    pub async fn cladding(&self, input: &CladdingInput) -> Result<(), ClientError> {
        self.post_ack("cladding", input).await
    }

    pub async fn roof(&self, input: &RoofInput) -> Result<(), ClientError> {
        self.post_ack("roof", input).await
    }

    pub async fn building(&self, input: &BuildingInput) -> Result<(), ClientError> {
        self.post_ack("building", input).await
    }

    /// Look up climate and seismic data for an address.
    pub async fn location(&self, input: &LocationInput) -> Result<LocationData, ClientError> {
        self.post_json("location", input).await
    }

    pub async fn importance_category(&self, input: &ImportanceCategoryInput) -> Result<(), ClientError> {
        self.post_ack("importance_category", input).await
    }

    pub async fn material_type(&self, input: &MaterialTypeInput) -> Result<(), ClientError> {
        self.post_ack("material_type", input).await
    }

    pub async fn natural_frequency(&self, input: &NaturalFrequencyInput) -> Result<(), ClientError> {
        self.post_ack("natural_frequency", input).await
    }

    /// Wind factors for every stored height zone, lowest zone first.
    pub async fn calculate_main_structure_wind_factor(
        &self,
        input: &WindFactorInput,
    ) -> Result<Vec<MainStructureWindFactor>, ClientError> {
        self.post_json("calculate_main_structure_wind_factor", input).await
    }

    /// The zones the service stored for the submitted building.
    pub async fn get_height_zones(&self) -> Result<Vec<StoredHeightZone>, ClientError> {
        const ENDPOINT: &str = "get_height_zones";
        let value: Value = self.post_empty(ENDPOINT).await?;
        decode_height_zones(value).map_err(|detail| ClientError::Decode {
            endpoint: ENDPOINT.to_string(),
            detail,
        })
    }

    /// Total load of every stored height zone, lowest zone first.
    pub async fn calculate_main_structure_loads(&self, input: &LoadsInput) -> Result<Vec<f64>, ClientError> {
        self.post_json("calculate_main_structure_loads", input).await
    }

    pub async fn current_save_file_id(&self) -> Result<i64, ClientError> {
        const ENDPOINT: &str = "get_user_current_save_file";
        let value: Value = self.post_empty(ENDPOINT).await?;
        parse_save_file_id(&value).ok_or_else(|| ClientError::Decode {
            endpoint: ENDPOINT.to_string(),
            detail: format!("not a save file id: {}", value),
        })
    }

    pub async fn save_data(&self, id: i64) -> Result<SaveData, ClientError> {
        let endpoint = format!("get_user_save_data/{}", id);
        let request = self.http.get(self.url(&endpoint));
        let response = self.send(&endpoint, request).await?;
        Self::read(&endpoint, response).await
    }

    /// The save file the pages restore from. Fetched by query id.
    pub async fn save_file(&self, id: i64) -> Result<SaveData, ClientError> {
        let endpoint = format!("get_user_save_file?id={}", id);
        self.post_empty(&endpoint).await
    }

    pub async fn set_save_data(&self, id: i64, json_data: String) -> Result<(), ClientError> {
        self.post_ack("set_user_save_data", &SaveDataInput { json_data, id })
            .await
    }

    /// Validate the building geometry page and submit it.
    ///
    /// The page's four bodies are sent in order: dimensions, cladding, roof,
    /// then the building with its consolidated height zones. Nothing is sent
    /// when the page does not validate.
    ///
    /// # Returns
    /// The submitted bodies, so the caller can show the zones it sent.
    pub async fn submit_building_geometry(
        &self,
        form: &BuildingGeometryForm,
    ) -> Result<GeometrySubmission, ClientError> {
        let submission = form.validate()?;
        self.dimensions(&submission.dimensions).await?;
        self.cladding(&submission.cladding).await?;
        self.roof(&submission.roof).await?;
        self.building(&submission.building).await?;
        Ok(submission)
    }

    /// Validate the site parameters page and submit the three selections.
    pub async fn submit_site_params(&self, form: &SiteParamsForm) -> Result<(), ClientError> {
        let submission = form.validate()?;
        self.natural_frequency(&submission.natural_frequency).await?;
        self.importance_category(&submission.importance_category)
            .await?;
        self.material_type(&submission.material_type).await?;
        Ok(())
    }

    /// Validate the wind pressure page, compute the wind factors and
    /// tabulate them for the selected face and limit state.
    pub async fn wind_pressure_results(&self, form: &WindFactorForm) -> Result<ExportTable, ClientError> {
        let input = form.validate()?;
        let (Some(face), Some(state)) = (form.face, form.limit_state) else {
            return Err(FormError::Invalid("Please select a face (typically value is Windward)").into());
        };
        let factors = self.calculate_main_structure_wind_factor(&input).await?;
        Ok(pressure_table(&factors, face, state))
    }

    /// Validate the load combination page and tabulate the total load of
    /// each zone next to the wind factors the service stored for it.
    pub async fn load_combination_results(&self, form: &LoadCombinationForm) -> Result<ExportTable, ClientError> {
        const ENDPOINT: &str = "calculate_main_structure_loads";
        let input = form.validate()?;
        let (Some(face), Some(state)) = (input.wind_face, input.uls_or_sls) else {
            return Err(FormError::Invalid("Please select a combination and a face").into());
        };

        let factors = self
            .get_height_zones()
            .await?
            .into_iter()
            .map(|zone| zone.main_structure_wind_factor)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ClientError::Decode {
                endpoint: "get_height_zones".to_string(),
                detail: "wind factors have not been calculated".to_string(),
            })?;
        let loads = self.calculate_main_structure_loads(&input).await?;

        load_combination_table(&factors, &loads, face, state).ok_or_else(|| ClientError::Decode {
            endpoint: ENDPOINT.to_string(),
            detail: format!("expected {} loads, got {}", factors.len(), loads.len()),
        })
    }

    /// Read the site page's saved state from the user's current save file.
    /// A save file with no data yet gives an empty project.
    pub async fn load_project(&self) -> Result<ProjectSave, ClientError> {
        let id = self.current_save_file_id().await?;
        let saved = self.save_file(id).await?;
        if saved.json_data.trim().is_empty() {
            return Ok(ProjectSave::default());
        }
        let project = ProjectSave::from_json(&saved.json_data)?;
        debug!("loaded project from save file {}", id);
        Ok(project)
    }

    /// Merge `update` into the user's current save file.
    ///
    /// # Returns
    /// The id of the save file written.
    pub async fn save_project(&self, update: &ProjectSave) -> Result<i64, ClientError> {
        let id = self.current_save_file_id().await?;
        let current = self.save_data(id).await?;
        let merged = merge_save_data(&current.json_data, update)?;
        self.set_save_data(id, merged).await?;
        debug!("saved project to save file {}", id);
        Ok(id)
    }
}

/// The current save file id comes back as a bare number or a numeric string.
fn parse_save_file_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The zone list is sent as a JSON string holding the JSON array.
fn decode_height_zones(value: Value) -> Result<Vec<StoredHeightZone>, String> {
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(|e| e.to_string())?,
        other => other,
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use serde_json::json;

    #[test]
    fn urls_join_cleanly() {
        let client = BackendClient::new("http://localhost:42614/", "t");
        assert_eq!(client.address(), "http://localhost:42614");
        assert_eq!(client.url("/roof"), "http://localhost:42614/roof");
        assert_eq!(
            client.url("get_user_save_data/3"),
            "http://localhost:42614/get_user_save_data/3"
        );
    }

    #[test]
    fn from_store_needs_both_values() {
        let empty = MemoryCredentialStore::new();
        assert!(matches!(
            BackendClient::from_store(&empty),
            Err(ClientError::Store(_))
        ));
        let store = MemoryCredentialStore::with("tok", "https://aspenlog.cc:42613");
        let client = BackendClient::from_store(&store).unwrap();
        assert_eq!(client.address(), "https://aspenlog.cc:42613");
    }

    #[test]
    fn save_file_id_forms() {
        assert_eq!(parse_save_file_id(&json!(12)), Some(12));
        assert_eq!(parse_save_file_id(&json!(" 7 ")), Some(7));
        assert_eq!(parse_save_file_id(&json!(null)), None);
    }

    #[test]
    fn height_zones_string_or_array() {
        let array = json!([{"zone_num": 1, "elevation": 6.0, "wp": 1.5}]);
        let nested = Value::String(array.to_string());
        let a = decode_height_zones(array).unwrap();
        let b = decode_height_zones(nested).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].zone_num, 1);
        assert!(a[0].main_structure_wind_factor.is_none());
        assert!(decode_height_zones(json!("not json")).is_err());
    }
}
