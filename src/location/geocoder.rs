//! Platform seams for location: reverse geocoding and the one-shot current position

use async_trait::async_trait;

use crate::error::LocationError;

/// One reverse-geocoding candidate. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub sub_locality: Option<String>,
    pub locality: Option<String>,
    pub admin_area: Option<String>,
    pub country_name: Option<String>,
}

impl Address {
    /// "sub-locality, locality, admin area, country", skipping missing parts
    pub fn place_name(&self) -> String {
        [
            &self.sub_locality,
            &self.locality,
            &self.admin_area,
            &self.country_name,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Reverse geocoding capability provided by the platform
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidates for the coordinate, best first. I/O errors mean the
    /// service could not be reached.
    async fn reverse(&self, lat: f64, lon: f64) -> std::io::Result<Vec<Address>>;
}

/// Geocoder for environments without one; never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> std::io::Result<Vec<Address>> {
        Ok(Vec::new())
    }
}

/// One-shot current device position, used to pre-fill a story's coordinates
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<(f64, f64), LocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_name_skips_missing_parts() {
        let full = Address {
            sub_locality: Some("Menteng".into()),
            locality: Some("Jakarta Pusat".into()),
            admin_area: Some("DKI Jakarta".into()),
            country_name: Some("Indonesia".into()),
        };
        assert_eq!(full.place_name(), "Menteng, Jakarta Pusat, DKI Jakarta, Indonesia");

        let partial = Address {
            locality: Some("Bandung".into()),
            country_name: Some("Indonesia".into()),
            ..Default::default()
        };
        assert_eq!(partial.place_name(), "Bandung, Indonesia");
    }
}
