//! Run reporting
//!
//! GeoJSON output and the console summary table, both as impl blocks
//! on [`crate::algo::IsochroneRun`].

mod summary;
mod to_geojson;
