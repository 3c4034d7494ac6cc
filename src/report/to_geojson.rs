use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use serde_json::json;

use crate::Error;
use crate::algo::{Isochrone, IsochroneRun};
use crate::model::{Crs, transform_point, transform_polygon};

impl IsochroneRun {
    /// Converts the run to a `GeoJSON` `FeatureCollection`.
    ///
    /// Polygons are inverse-projected to WGS84 on the way out, one
    /// feature per isochrone in ascending budget order. Run-level
    /// metadata travels in foreign members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectionError`] if a polygon cannot be
    /// inverse-projected and [`Error::GeoJsonError`] for serialization
    /// failures.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::with_capacity(self.isochrones.len());
        for iso in &self.isochrones {
            features.push(isochrone_feature(iso, self.crs)?);
        }

        let origin = transform_point(self.origin, self.crs, Crs::Wgs84)?;
        let mut foreign_members = JsonObject::new();
        foreign_members.insert(
            "generated_at".to_string(),
            json!(self.generated_at.to_rfc3339()),
        );
        foreign_members.insert("origin".to_string(), json!([origin.x(), origin.y()]));
        foreign_members.insert("crs_authid".to_string(), json!(self.crs.to_string()));

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: Some(foreign_members),
        })
    }

    /// # Errors
    ///
    /// See [`IsochroneRun::to_geojson`].
    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

fn isochrone_feature(iso: &Isochrone, crs: Crs) -> Result<Feature, Error> {
    let wgs84 = transform_polygon(&iso.polygon, crs, Crs::Wgs84)?;
    let geometry = Geometry::new(GeoJsonValue::from(&wgs84));

    let value = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "id": iso.id,
            "name": iso.name,
            "time_min": iso.time_min,
            "points_count": iso.points_count,
            "area_m2": iso.area_m2,
            "buildings_count": iso.buildings_count,
            "population": iso.population,
            "density_ha": iso.density_ha,
        }
    });

    Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geo::{Point, polygon};

    use super::*;

    fn sample_run() -> IsochroneRun {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 0.0, y: 1000.0),
        ];
        IsochroneRun {
            isochrones: vec![Isochrone {
                id: 1,
                name: "isochrone_5min".to_string(),
                time_min: 5,
                points_count: 4,
                polygon,
                area_m2: 1.0e6,
                population: Some(120.0),
                buildings_count: Some(3.0),
                density_ha: Some(1.2),
            }],
            skipped: Vec::new(),
            origin: Point::new(500.0, 500.0),
            crs: Crs::WebMercator,
            has_population_data: true,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn features_carry_the_attribute_tuple() {
        let collection = sample_run().to_geojson().unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["id"], json!(1));
        assert_eq!(props["name"], json!("isochrone_5min"));
        assert_eq!(props["time_min"], json!(5));
        assert_eq!(props["points_count"], json!(4));
        assert_eq!(props["area_m2"], json!(1.0e6));
        assert_eq!(props["buildings_count"], json!(3.0));
        assert_eq!(props["population"], json!(120.0));
        assert_eq!(props["density_ha"], json!(1.2));
    }

    #[test]
    fn geometry_is_emitted_in_wgs84() {
        let collection = sample_run().to_geojson().unwrap();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        match &geometry.value {
            GeoJsonValue::Polygon(rings) => {
                // A kilometer square near the equator stays under a
                // hundredth of a degree
                for position in &rings[0] {
                    assert!(position[0].abs() < 0.01);
                    assert!(position[1].abs() < 0.01);
                }
            }
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn run_metadata_travels_in_foreign_members() {
        let collection = sample_run().to_geojson().unwrap();
        let foreign = collection.foreign_members.as_ref().unwrap();
        assert_eq!(foreign["crs_authid"], json!("EPSG:3857"));
        assert!(foreign.contains_key("generated_at"));
        let origin = foreign["origin"].as_array().unwrap();
        assert!(origin[0].as_f64().unwrap().abs() < 0.01);
    }

    #[test]
    fn missing_population_serializes_as_null() {
        let mut run = sample_run();
        run.has_population_data = false;
        run.isochrones[0].population = None;
        run.isochrones[0].buildings_count = None;
        run.isochrones[0].density_ha = None;

        let raw = run.to_geojson_string().unwrap();
        assert!(raw.contains(r#""population":null"#));
    }
}
