//! This module is responsible for loading run inputs (road network,
//! building layer, configuration) from GeoJSON and CSV sources.

use std::path::Path;

mod config;
mod table;
mod vector;

pub use config::WalkshedConfig;
pub use table::{building_layer_from_csv_reader, building_layer_from_csv_str, load_building_table};
pub use vector::{
    building_layer_from_geojson_str, load_building_layer, load_road_network,
    road_network_from_geojson_str,
};

use crate::Error;
use crate::model::{BuildingLayer, RoadNetwork};

/// Loads the run inputs described by a configuration.
///
/// The road network is reprojected into the working CRS. The building
/// layer stays in its source CRS; the population overlay transforms
/// each isochrone into it on the fly.
///
/// # Errors
///
/// Everything the loaders return, plus validation errors from
/// [`WalkshedConfig::validate`].
pub fn load_run_inputs(
    config: &WalkshedConfig,
) -> Result<(RoadNetwork, Option<BuildingLayer>), Error> {
    config.validate()?;
    let source_crs = config.source_crs()?;
    let working_crs = config.working_crs()?;

    let network = load_road_network(&config.roads_path, source_crs)?.reproject(working_crs)?;

    let buildings = match &config.buildings_path {
        Some(path) => {
            let layer = if is_table(path) {
                load_building_table(path, source_crs)?
            } else {
                load_building_layer(path, source_crs)?
            };
            Some(layer)
        }
        None => None,
    };

    // While parsing GeoJSON collections, and during CSV deserialization
    // large amounts of memory are allocated. This memory is not always
    // released back to the system. This call will release all free memory
    // from the tail of the heap back to the system.
    //
    // # Safety
    //
    // This call is safe to use on linux with glibc implementation
    // which is checked by the cfg attribute in compile time.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            log::warn!("Memory trimming failed - continuing anyway");
        } else {
            log::debug!("Successfully trimmed unused heap memory");
        }
    }

    Ok((network, buildings))
}

fn is_table(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
