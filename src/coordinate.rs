use std::f64::consts::PI;
use std::fmt;

/// Latitude beyond which Web Mercator is undefined (the square's edge).
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Projects onto the unit Web Mercator square: x grows east, y grows south,
    /// both in `0.0..=1.0`.
    pub fn to_mercator(&self) -> (f64, f64) {
        let lat = self
            .latitude
            .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
            .to_radians();
        let x = (self.longitude + 180.0) / 360.0;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
        (x, y)
    }

    /// Inverse of [`Coordinate::to_mercator`].
    pub fn from_mercator(x: f64, y: f64) -> Self {
        let longitude = x * 360.0 - 180.0;
        let latitude = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude < 0.0 { 'S' } else { 'N' };
        let ew = if self.longitude < 0.0 { 'W' } else { 'E' };
        write!(
            f,
            "{:.5}° {}, {:.5}° {}",
            self.latitude.abs(),
            ns,
            self.longitude.abs(),
            ew
        )
    }
}

/// The geographic center and span a map is framed to show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl ViewportRegion {
    pub const DEFAULT_SPAN: f64 = 0.05;

    /// Region centered on a position fix with the same span on both axes.
    pub fn around(fix: Coordinate, span: f64) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            latitude_delta: span,
            longitude_delta: span,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn north_west(&self) -> Coordinate {
        Coordinate::new(
            self.latitude + self.latitude_delta / 2.0,
            self.longitude - self.longitude_delta / 2.0,
        )
    }

    pub fn south_east(&self) -> Coordinate {
        Coordinate::new(
            self.latitude - self.latitude_delta / 2.0,
            self.longitude + self.longitude_delta / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn region_around_fix_uses_span_on_both_axes() {
        let region = ViewportRegion::around(Coordinate::new(37.7749, -122.4194), 0.05);
        assert_eq!(
            region,
            ViewportRegion {
                latitude: 37.7749,
                longitude: -122.4194,
                latitude_delta: 0.05,
                longitude_delta: 0.05,
            }
        );
    }

    #[test]
    fn region_corners() {
        let region = ViewportRegion::around(Coordinate::new(10.0, 20.0), 2.0);
        assert!(close(region.north_west().latitude, 11.0));
        assert!(close(region.north_west().longitude, 19.0));
        assert!(close(region.south_east().latitude, 9.0));
        assert!(close(region.south_east().longitude, 21.0));
    }

    #[test]
    fn mercator_origin_is_null_island_at_square_center() {
        let (x, y) = Coordinate::new(0.0, 0.0).to_mercator();
        assert!(close(x, 0.5));
        assert!(close(y, 0.5));
    }

    #[test]
    fn mercator_projection_inverts() {
        let sf = Coordinate::new(37.7749, -122.4194);
        let (x, y) = sf.to_mercator();
        let back = Coordinate::from_mercator(x, y);
        assert!((back.latitude - sf.latitude).abs() < 1e-9);
        assert!((back.longitude - sf.longitude).abs() < 1e-9);
    }

    #[test]
    fn mercator_clamps_polar_latitudes() {
        let (_, y) = Coordinate::new(90.0, 0.0).to_mercator();
        assert!(y.abs() < 1e-6);
        let (_, y) = Coordinate::new(-90.0, 0.0).to_mercator();
        assert!((y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn validity_rejects_out_of_range_and_nan() {
        assert!(Coordinate::new(37.0, -122.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn display_uses_hemisphere_letters() {
        let text = Coordinate::new(37.8, -122.45).to_string();
        assert_eq!(text, "37.80000° N, 122.45000° W");
    }
}
