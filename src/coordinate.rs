//! Geographic coordinates and the British National Grid transform

use crate::error::{ClusterError, Result};
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};

/// EPSG:27700 - OSGB36 / British National Grid, with the OSGB36 -> WGS84
/// seven-parameter Helmert shift.
const BNG_PROJ: &str = "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 \
    +x_0=400000 +y_0=-100000 +ellps=airy \
    +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs";

/// EPSG:4326 - WGS84 geographic.
const WGS84_PROJ: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

/// WGS84 latitude/longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Squared Euclidean distance in (lat, lon) space.
    pub fn distance_sq(&self, other: &Coordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat * dlat + dlon * dlon
    }
}

/// Stateless easting/northing -> latitude/longitude transform.
pub struct GridTransform {
    source: Proj,
    target: Proj,
}

impl GridTransform {
    pub fn british_national_grid() -> Result<Self> {
        let source = Proj::from_proj_string(BNG_PROJ)
            .map_err(|e| ClusterError::Transform(format!("Invalid source CRS: {}", e)))?;
        let target = Proj::from_proj_string(WGS84_PROJ)
            .map_err(|e| ClusterError::Transform(format!("Invalid target CRS: {}", e)))?;
        Ok(Self { source, target })
    }

    /// Convert an (easting, northing) pair in metres to WGS84 degrees.
    pub fn to_wgs84(&self, easting: f64, northing: f64) -> std::result::Result<Coordinate, String> {
        if !easting.is_finite() || !northing.is_finite() {
            return Err(format!("non-finite grid reference ({}, {})", easting, northing));
        }

        let mut point = (easting, northing, 0.0);
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| e.to_string())?;

        // proj4rs returns geographic coordinates in radians
        let coordinate = Coordinate::new(point.1.to_degrees(), point.0.to_degrees());
        if !coordinate.is_valid() {
            return Err(format!(
                "transform produced out-of-range coordinate ({}, {})",
                coordinate.latitude, coordinate.longitude
            ));
        }
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckingham_palace() {
        let transform = GridTransform::british_national_grid().unwrap();
        let c = transform.to_wgs84(529090.0, 179645.0).unwrap();
        assert!((c.latitude - 51.501).abs() < 0.01, "lat {}", c.latitude);
        assert!((c.longitude - -0.1416).abs() < 0.01, "lon {}", c.longitude);
    }

    #[test]
    fn test_edinburgh_within_uk_bounds() {
        let transform = GridTransform::british_national_grid().unwrap();
        let c = transform.to_wgs84(325166.0, 673477.0).unwrap();
        assert!((49.0..=61.0).contains(&c.latitude));
        assert!((-8.0..=2.0).contains(&c.longitude));
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let transform = GridTransform::british_national_grid().unwrap();
        assert!(transform.to_wgs84(f64::NAN, 100.0).is_err());
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(51.5, -0.1).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }
}
