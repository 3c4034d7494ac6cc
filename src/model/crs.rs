//! Coordinate reference systems and transforms
//!
//! Planar stages of the pipeline run in a projected CRS (meters). This
//! module provides the WGS84 / Web Mercator / UTM transforms needed to
//! project the origin, move polygons between layer CRSs and measure
//! geodesic areas, without binding to an external PROJ installation.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, GeodesicArea, MapCoords, Point, Polygon};

use crate::Error;

/// WGS84 semi-major axis in meters, shared by Web Mercator and UTM.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

const FLATTENING: f64 = 1.0 / 298.257_223_563;
const UTM_SCALE: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING: f64 = 10_000_000.0;

/// Latitude limit of the spherical Web Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// UTM is defined between 80°S and 84°N.
const UTM_MIN_LAT: f64 = -80.0;
const UTM_MAX_LAT: f64 = 84.0;

/// Transforms further than this from the zone's central meridian are
/// rejected; the series below loses accuracy far outside the zone.
const UTM_MAX_MERIDIAN_OFFSET_DEG: f64 = 20.0;

// Third flattening of the WGS84 ellipsoid and the truncated Krueger
// series coefficients derived from it (forward, inverse, rectifying to
// geodetic latitude). Good to well under a millimeter inside a zone.
const N: f64 = FLATTENING / (2.0 - FLATTENING);
const N2: f64 = N * N;
const N3: f64 = N2 * N;
const RECT_RADIUS: f64 = EARTH_RADIUS / (1.0 + N) * (1.0 + N2 / 4.0 + N2 * N2 / 64.0);
const ALPHA: [f64; 3] = [
    N / 2.0 - 2.0 * N2 / 3.0 + 5.0 * N3 / 16.0,
    13.0 * N2 / 48.0 - 3.0 * N3 / 5.0,
    61.0 * N3 / 240.0,
];
const BETA: [f64; 3] = [
    N / 2.0 - 2.0 * N2 / 3.0 + 37.0 * N3 / 96.0,
    N2 / 48.0 + N3 / 15.0,
    17.0 * N3 / 480.0,
];
const DELTA: [f64; 3] = [
    2.0 * N - 2.0 * N2 / 3.0 - 2.0 * N3,
    7.0 * N2 / 3.0 - 8.0 * N3 / 5.0,
    56.0 * N3 / 15.0,
];

/// Coordinate reference system of a layer or a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Geographic lon/lat degrees (EPSG:4326)
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857)
    WebMercator,
    /// Universal Transverse Mercator meters (EPSG:326xx / 327xx)
    Utm { zone: u8, north: bool },
}

impl Crs {
    /// UTM zone covering a WGS84 coordinate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32).clamp(0, 59) as u8 + 1;
        Crs::Utm {
            zone,
            north: lat >= 0.0,
        }
    }

    pub fn is_geographic(self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    fn coord_to_wgs84(self, c: Coord<f64>) -> Result<Coord<f64>, Error> {
        match self {
            Crs::Wgs84 => Ok(c),
            Crs::WebMercator => Ok(web_mercator_inverse(c)),
            Crs::Utm { zone, north } => utm_inverse(zone, north, c),
        }
    }

    fn coord_from_wgs84(self, c: Coord<f64>) -> Result<Coord<f64>, Error> {
        match self {
            Crs::Wgs84 => Ok(c),
            Crs::WebMercator => web_mercator_forward(c),
            Crs::Utm { zone, north } => utm_forward(zone, north, c),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Wgs84 => write!(f, "EPSG:4326"),
            Crs::WebMercator => write!(f, "EPSG:3857"),
            Crs::Utm { zone, north: true } => write!(f, "EPSG:{}", 32600 + u32::from(*zone)),
            Crs::Utm { zone, north: false } => write!(f, "EPSG:{}", 32700 + u32::from(*zone)),
        }
    }
}

impl FromStr for Crs {
    type Err = Error;

    #[allow(clippy::cast_possible_truncation)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .strip_prefix("EPSG:")
            .or_else(|| s.trim().strip_prefix("epsg:"))
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| Error::InvalidData(format!("Unrecognized CRS identifier: {s}")))?;

        match code {
            4326 => Ok(Crs::Wgs84),
            3857 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(Error::InvalidData(format!("Unsupported CRS: EPSG:{code}"))),
        }
    }
}

/// Transforms a single coordinate between reference systems, pivoting
/// through WGS84.
///
/// # Errors
///
/// Returns [`Error::ProjectionError`] for non-finite input or input
/// outside the target projection's domain.
pub fn transform_coord(c: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>, Error> {
    if !c.x.is_finite() || !c.y.is_finite() {
        return Err(Error::ProjectionError(format!(
            "Non-finite input coordinate {c:?}"
        )));
    }
    if from == to {
        return Ok(c);
    }
    to.coord_from_wgs84(from.coord_to_wgs84(c)?)
}

/// Transforms a point between reference systems.
///
/// # Errors
///
/// See [`transform_coord`].
pub fn transform_point(point: Point<f64>, from: Crs, to: Crs) -> Result<Point<f64>, Error> {
    transform_coord(point.0, from, to).map(Point)
}

/// Transforms a polygon between reference systems, returning a new
/// polygon. The input is left untouched.
///
/// # Errors
///
/// See [`transform_coord`].
pub fn transform_polygon(polygon: &Polygon<f64>, from: Crs, to: Crs) -> Result<Polygon<f64>, Error> {
    if from == to {
        return Ok(polygon.clone());
    }
    polygon.try_map_coords(|c| transform_coord(c, from, to))
}

/// Projects the WGS84 origin into the target CRS.
///
/// The assembler calls this exactly once per run; every time budget
/// reuses the projected point.
///
/// # Errors
///
/// Returns [`Error::ProjectionError`] if the origin lies outside the
/// domain of the target projection.
pub fn project_origin(lon: f64, lat: f64, target: Crs) -> Result<Point<f64>, Error> {
    transform_point(Point::new(lon, lat), Crs::Wgs84, target)
}

/// Ellipsoidal area of a polygon given in `crs`, in square meters.
///
/// The polygon is inverse-projected to WGS84 on a measurement copy and
/// the input geometry is left untouched, so callers can keep using the
/// same polygon for overlay work in a projected CRS.
///
/// # Errors
///
/// Returns [`Error::ProjectionError`] if the polygon cannot be
/// inverse-projected.
pub fn geodesic_area_m2(polygon: &Polygon<f64>, crs: Crs) -> Result<f64, Error> {
    let wgs84 = transform_polygon(polygon, crs, Crs::Wgs84)?;
    Ok(wgs84.geodesic_area_unsigned())
}

fn web_mercator_forward(c: Coord<f64>) -> Result<Coord<f64>, Error> {
    if c.y.abs() > MAX_MERCATOR_LAT {
        return Err(Error::ProjectionError(format!(
            "Latitude {} is outside the Web Mercator domain",
            c.y
        )));
    }
    let x = EARTH_RADIUS * c.x.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + c.y.to_radians() / 2.0).tan().ln();
    Ok(Coord { x, y })
}

fn web_mercator_inverse(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Coord { x: lon, y: lat }
}

fn central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

fn wrap_degrees(dlon: f64) -> f64 {
    let mut d = dlon % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}

fn utm_forward(zone: u8, north: bool, c: Coord<f64>) -> Result<Coord<f64>, Error> {
    if !(UTM_MIN_LAT..=UTM_MAX_LAT).contains(&c.y) {
        return Err(Error::ProjectionError(format!(
            "Latitude {} is outside the UTM domain [{UTM_MIN_LAT}, {UTM_MAX_LAT}]",
            c.y
        )));
    }
    let dlon_deg = wrap_degrees(c.x - central_meridian(zone));
    if dlon_deg.abs() > UTM_MAX_MERIDIAN_OFFSET_DEG {
        return Err(Error::ProjectionError(format!(
            "Longitude {} is too far from the central meridian of UTM zone {zone}",
            c.x
        )));
    }

    let lat = c.y.to_radians();
    let dlon = dlon_deg.to_radians();
    let e = (FLATTENING * (2.0 - FLATTENING)).sqrt();

    let t = (lat.sin().atanh() - e * (e * lat.sin()).atanh()).sinh();
    let xi_p = t.atan2(dlon.cos());
    let eta_p = (dlon.sin() / t.hypot(1.0)).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, a) in (1u32..).zip(ALPHA) {
        let k = f64::from(2 * j);
        xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
        eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
    }

    let easting = FALSE_EASTING + UTM_SCALE * RECT_RADIUS * eta;
    let mut northing = UTM_SCALE * RECT_RADIUS * xi;
    if !north {
        northing += FALSE_NORTHING;
    }
    Ok(Coord {
        x: easting,
        y: northing,
    })
}

fn utm_inverse(zone: u8, north: bool, c: Coord<f64>) -> Result<Coord<f64>, Error> {
    let northing = if north { c.y } else { c.y - FALSE_NORTHING };
    let xi = northing / (UTM_SCALE * RECT_RADIUS);
    let eta = (c.x - FALSE_EASTING) / (UTM_SCALE * RECT_RADIUS);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, b) in (1u32..).zip(BETA) {
        let k = f64::from(2 * j);
        xi_p -= b * (k * xi).sin() * (k * eta).cosh();
        eta_p -= b * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut lat = chi;
    for (j, d) in (1u32..).zip(DELTA) {
        let k = f64::from(2 * j);
        lat += d * (k * chi).sin();
    }

    let lon = central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos()).to_degrees();
    let lat = lat.to_degrees();
    if !lon.is_finite() || !lat.is_finite() {
        return Err(Error::ProjectionError(format!(
            "UTM inverse produced non-finite coordinates from {c:?}"
        )));
    }
    Ok(Coord { x: lon, y: lat })
}
