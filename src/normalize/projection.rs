//! WGS84 to SVY21 (EPSG:3414) projection.
//!
//! SVY21 is a transverse Mercator grid over Singapore on the WGS84
//! ellipsoid, with its origin at 1°22'N 103°50'E.

use super::location::LatLon;

/// A planar position in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

/// Pure mapping from geographic to planar coordinates.
pub trait Projection {
    fn project(&self, point: LatLon) -> PlanarPoint;
}

// WGS84 ellipsoid
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;

// SVY21 grid origin
const ORIGIN_LAT: f64 = 1.0 + 22.0 / 60.0;
const ORIGIN_LON: f64 = 103.0 + 50.0 / 60.0;
const FALSE_NORTHING: f64 = 38_744.572;
const FALSE_EASTING: f64 = 28_001.642;
const SCALE: f64 = 1.0;

/// The SVY21 transverse Mercator projection. `x` is easting, `y` northing.
#[derive(Debug, Clone, Copy)]
pub struct Svy21 {
    e2: f64,
    a0: f64,
    a2: f64,
    a4: f64,
    a6: f64,
    origin_meridian_arc: f64,
}

impl Svy21 {
    pub fn new() -> Self {
        let e2 = 2.0 * F - F * F;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let mut svy = Self {
            e2,
            a0: 1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0,
            a2: 3.0 / 8.0 * (e2 + e4 / 4.0 + 15.0 * e6 / 128.0),
            a4: 15.0 / 256.0 * (e4 + 3.0 * e6 / 4.0),
            a6: 35.0 * e6 / 3072.0,
            origin_meridian_arc: 0.0,
        };
        svy.origin_meridian_arc = svy.meridian_arc(ORIGIN_LAT.to_radians());
        svy
    }

    fn meridian_arc(&self, lat: f64) -> f64 {
        A * (self.a0 * lat - self.a2 * (2.0 * lat).sin() + self.a4 * (4.0 * lat).sin()
            - self.a6 * (6.0 * lat).sin())
    }
}

impl Default for Svy21 {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for Svy21 {
    fn project(&self, point: LatLon) -> PlanarPoint {
        let lat = point.lat.to_radians();
        let e2 = self.e2;

        let sin = lat.sin();
        let sin2 = sin * sin;
        let cos = lat.cos();
        let cos2 = cos * cos;
        let cos3 = cos2 * cos;
        let cos4 = cos3 * cos;
        let cos5 = cos4 * cos;
        let cos6 = cos5 * cos;
        let cos7 = cos6 * cos;

        // radii of curvature in the meridian and prime vertical
        let rho = A * (1.0 - e2) / (1.0 - e2 * sin2).powf(1.5);
        let v = A / (1.0 - e2 * sin2).sqrt();
        let psi = v / rho;
        let psi2 = psi * psi;
        let psi3 = psi2 * psi;
        let psi4 = psi3 * psi;

        let t = lat.tan();
        let t2 = t * t;
        let t4 = t2 * t2;
        let t6 = t4 * t2;

        let w = (point.lon - ORIGIN_LON).to_radians();
        let w2 = w * w;
        let w4 = w2 * w2;
        let w6 = w4 * w2;
        let w8 = w6 * w2;

        let n1 = w2 / 2.0 * v * sin * cos;
        let n2 = w4 / 24.0 * v * sin * cos3 * (4.0 * psi2 + psi - t2);
        let n3 = w6 / 720.0
            * v
            * sin
            * cos5
            * (8.0 * psi4 * (11.0 - 24.0 * t2) - 28.0 * psi3 * (1.0 - 6.0 * t2)
                + psi2 * (1.0 - 32.0 * t2)
                - psi * 2.0 * t2
                + t4);
        let n4 = w8 / 40320.0 * v * sin * cos7 * (1385.0 - 3111.0 * t2 + 543.0 * t4 - t6);
        let northing = FALSE_NORTHING
            + SCALE * (self.meridian_arc(lat) - self.origin_meridian_arc + n1 + n2 + n3 + n4);

        let e1 = w2 / 6.0 * cos2 * (psi - t2);
        let e2_term = w4 / 120.0
            * cos4
            * (4.0 * psi3 * (1.0 - 6.0 * t2) + psi2 * (1.0 + 8.0 * t2) - psi * 2.0 * t2 + t4);
        let e3 = w6 / 5040.0 * cos6 * (61.0 - 479.0 * t2 + 179.0 * t4 - t6);
        let easting = FALSE_EASTING + SCALE * v * w * cos * (1.0 + e1 + e2_term + e3);

        PlanarPoint {
            x: easting,
            y: northing,
        }
    }
}
