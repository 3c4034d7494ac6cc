use std::fmt::Write;

use crate::algo::IsochroneRun;

impl IsochroneRun {
    /// Renders the run as a fixed-width console table with a totals
    /// row, followed by one line per skipped budget.
    ///
    /// Populations of nested isochrones overlap, so the totals row
    /// counts shared buildings more than once; the per-row numbers are
    /// the ones to quote.
    pub fn summary_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {:>6} {:>8} {:>12} {:>10} {:>12} {:>12}",
            "Isochrone", "Time", "Points", "Area, ha", "Buildings", "Population", "Density/ha"
        );

        let mut total_area_ha = 0.0;
        let mut total_population = 0.0;
        let mut total_buildings = 0.0;

        for iso in &self.isochrones {
            total_area_ha += iso.area_ha();
            total_population += iso.population.unwrap_or(0.0);
            total_buildings += iso.buildings_count.unwrap_or(0.0);
            let _ = writeln!(
                out,
                "{:<20} {:>6} {:>8} {:>12.2} {:>10} {:>12} {:>12}",
                iso.name,
                iso.time_min,
                iso.points_count,
                iso.area_ha(),
                format_opt(iso.buildings_count, 1),
                format_opt(iso.population, 1),
                format_opt(iso.density_ha, 2),
            );
        }

        if self.has_population_data {
            let density = if total_area_ha > 0.0 {
                total_population / total_area_ha
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "{:<20} {:>6} {:>8} {:>12.2} {:>10.1} {:>12.1} {:>12.2}",
                "TOTAL", "", "", total_area_ha, total_buildings, total_population, density
            );
        } else {
            let _ = writeln!(
                out,
                "{:<20} {:>6} {:>8} {:>12.2} {:>10} {:>12} {:>12}",
                "TOTAL", "", "", total_area_ha, "-", "-", "-"
            );
        }

        for skipped in &self.skipped {
            let _ = writeln!(out, "skipped {} min: {}", skipped.time_min, skipped.reason);
        }

        out
    }
}

fn format_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use geo::{Point, polygon};

    use crate::algo::{Isochrone, SkipReason, SkippedBudget};
    use crate::model::Crs;

    use super::*;

    fn isochrone(id: u32, minutes: u32, area_m2: f64, population: Option<f64>) -> Isochrone {
        Isochrone {
            id,
            name: format!("isochrone_{minutes}min"),
            time_min: minutes,
            points_count: 4,
            polygon: polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ],
            area_m2,
            population,
            buildings_count: population.map(|_| 2.0),
            density_ha: population.map(|p| p / (area_m2 / 10_000.0)),
        }
    }

    #[test]
    fn table_lists_rows_totals_and_skips() {
        let run = IsochroneRun {
            isochrones: vec![
                isochrone(1, 5, 50_000.0, Some(100.0)),
                isochrone(2, 10, 200_000.0, Some(400.0)),
            ],
            skipped: vec![SkippedBudget {
                time_min: 15,
                reason: SkipReason::NoRoutes,
            }],
            origin: Point::new(0.0, 0.0),
            crs: Crs::WebMercator,
            has_population_data: true,
            generated_at: Utc::now(),
        };

        let table = run.summary_table();
        assert!(table.contains("isochrone_5min"));
        assert!(table.contains("isochrone_10min"));
        assert!(table.contains("TOTAL"));
        // 5.00 + 20.00 hectares
        assert!(table.contains("25.00"), "{table}");
        assert!(table.contains("500.0"), "{table}");
        assert!(table.contains("skipped 15 min: no reachable routes"));
    }

    #[test]
    fn runs_without_population_data_print_dashes() {
        let run = IsochroneRun {
            isochrones: vec![isochrone(1, 5, 50_000.0, None)],
            skipped: Vec::new(),
            origin: Point::new(0.0, 0.0),
            crs: Crs::WebMercator,
            has_population_data: false,
            generated_at: Utc::now(),
        };

        let table = run.summary_table();
        assert!(table.contains('-'), "{table}");
        assert!(!table.contains("NaN"));
    }
}
