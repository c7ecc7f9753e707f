/*!
# Aspenlog Load Workflow

The client side of a structural load workflow, built in Rust.

## Overview

An engineer describes a building page by page: site parameters, building
geometry (dimensions, floor elevations, cladding, roof, height zones) and
the wind and load selections of the main structure. Each page is validated
locally and then submitted to a remote computation service, which keeps the
building per user and returns wind factors and loads for every height zone.

## Architecture

### Core
- **floors**: Floor elevation table, the non-decreasing elevation check and
  the "typical floor" fill-down
- **height_zone**: Consolidation of per-floor zone labels into contiguous
  height zones, numbered 1..K from the bottom

### Pages and Wire Format
- **forms**: Validators for every workflow page, with the messages shown
  to the user
- **models**: Request and response bodies of the computation service
- **results**: Pressure, load combination and climate/seismic tables

### Services
- **client**: Bearer-token HTTP client for the computation service
- **credentials**: Token and connection address storage (system keychain, or a JSON file)
- **config**: Environment and `.env` configuration

### Data Persistence Layer
- Save-file merging for the service's per-user JSON blob
- Local snapshots with Gzip compression and bincode serialization
- CSV and XLSX export of result tables, CSV import of floor tables

## Binaries

- `aspenlog`: local HTTP shell for the workflow pages (requires `web`)
- `cli`: floor table validation, zone consolidation and credential
  management from the terminal

## Shell Endpoints

- `/api/store-token`, `/api/get-token` - Bearer token
- `/api/store-connection-address`, `/api/get-connection-address` - Service address
- `/api/floor_elevations/validate` - Floor elevation check
- `/api/height_zones` - Zone consolidation
- `/api/building_geometry`, `/api/site_params` - Page submission
- `/api/save` - Merge the site page into the current save file (POST) or read it back (GET)
- `/api/engineer_selection` - Next load page for the chosen engineer type
- `/api/location`, `/api/wind_pressure`, `/api/load_combination` - Result tables
- `/api/export` - CSV or XLSX download of a table
- `/api/snapshot`, `/api/snapshot/load` - Local project snapshots
*/

pub mod config;
pub mod credentials;
pub mod downloader;
pub mod error;
pub mod floors;
pub mod forms;
pub mod height_zone;
pub mod loader;
pub mod models;
pub mod results;
pub mod saving;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod client;

/// Re-export the core so callers need not know the module layout
pub use error::{FormError, SaveError, StoreError, ZoneError};
pub use floors::{FloorElevationInput, FloorElevationTable, FloorRecord, validate_floor_elevations};
pub use height_zone::{HeightZoneTable, Zone, ZoneAssignment, compute_height_zones};

#[cfg(feature = "web")]
pub use client::BackendClient;
#[cfg(feature = "web")]
pub use error::ClientError;
