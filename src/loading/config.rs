//! Run configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::Crs;
use crate::{
    DEFAULT_SNAP_TOLERANCE_M, DEFAULT_TIME_BUDGETS_MIN, DEFAULT_WALKING_SPEED_KMH, Error, Minutes,
};

/// Configuration for one isochrone run.
///
/// Deserializes from JSON; everything except the road network path and
/// the origin has a default. Paths are not touched until
/// [`WalkshedConfig::validate`] runs.
#[derive(Debug, Clone, Deserialize)]
pub struct WalkshedConfig {
    /// GeoJSON file with the road network linework
    pub roads_path: PathBuf,
    /// Optional building layer, GeoJSON or CSV with a WKT column
    #[serde(default)]
    pub buildings_path: Option<PathBuf>,
    /// Origin in WGS84 degrees
    pub origin_lon: f64,
    pub origin_lat: f64,
    #[serde(default = "default_speed_kmh")]
    pub speed_kmh: f64,
    #[serde(default = "default_snap_tolerance_m")]
    pub snap_tolerance_m: f64,
    #[serde(default = "default_time_budgets_min")]
    pub time_budgets_min: Vec<Minutes>,
    /// Authority id of the CRS the input files are in, `EPSG:4326`
    /// when absent
    #[serde(default)]
    pub data_crs: Option<String>,
    /// Authority id of the projected CRS the run works in; the UTM
    /// zone of the origin when absent
    #[serde(default)]
    pub work_crs: Option<String>,
}

fn default_speed_kmh() -> f64 {
    DEFAULT_WALKING_SPEED_KMH
}

fn default_snap_tolerance_m() -> f64 {
    DEFAULT_SNAP_TOLERANCE_M
}

fn default_time_budgets_min() -> Vec<Minutes> {
    DEFAULT_TIME_BUDGETS_MIN.to_vec()
}

impl WalkshedConfig {
    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if the file cannot be read and
    /// [`Error::InvalidData`] if it is not a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the JSON does not describe a
    /// configuration.
    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidData(format!("Invalid configuration: {e}")))
    }

    /// Checks field ranges, CRS ids and input paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for out-of-range values and
    /// unknown CRS ids, [`Error::IoError`] for missing input files.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.origin_lon.is_finite()
            || !self.origin_lat.is_finite()
            || self.origin_lon.abs() > 180.0
            || self.origin_lat.abs() > 90.0
        {
            return Err(Error::InvalidData(format!(
                "Origin ({}, {}) is not a WGS84 coordinate",
                self.origin_lon, self.origin_lat
            )));
        }
        if self.speed_kmh <= 0.0 || !self.speed_kmh.is_finite() {
            return Err(Error::InvalidData(format!(
                "Walking speed must be positive, got {} km/h",
                self.speed_kmh
            )));
        }
        if self.snap_tolerance_m < 0.0 || !self.snap_tolerance_m.is_finite() {
            return Err(Error::InvalidData(format!(
                "Snap tolerance must be non-negative, got {} m",
                self.snap_tolerance_m
            )));
        }
        if !self.time_budgets_min.iter().any(|&m| m > 0) {
            return Err(Error::InvalidData(
                "No positive time budgets provided".to_string(),
            ));
        }
        self.source_crs()?;
        self.working_crs()?;

        if !self.roads_path.exists() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Road network file not found: {}", self.roads_path.display()),
            )));
        }
        if let Some(path) = &self.buildings_path {
            if !path.exists() {
                return Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Building layer file not found: {}", path.display()),
                )));
            }
        }

        Ok(())
    }

    /// CRS of the input files, WGS84 unless configured otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for an unsupported authority id.
    pub fn source_crs(&self) -> Result<Crs, Error> {
        match &self.data_crs {
            Some(authid) => authid.parse(),
            None => Ok(Crs::Wgs84),
        }
    }

    /// Projected CRS the run works in.
    ///
    /// Defaults to the UTM zone covering the origin, the way field
    /// surveys usually pick their working CRS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for an unsupported authority id
    /// or a geographic CRS.
    pub fn working_crs(&self) -> Result<Crs, Error> {
        let crs = match &self.work_crs {
            Some(authid) => authid.parse()?,
            None => Crs::utm_for(self.origin_lon, self.origin_lat),
        };
        if crs.is_geographic() {
            return Err(Error::InvalidData(format!(
                "Working CRS must be projected, got {crs}"
            )));
        }
        Ok(crs)
    }
}
