use std::fmt;

/// Placeholder written into every column of a source whose lookup failed.
pub const SENTINEL: &str = "💩";

/// Normalized result of a geolocation lookup.
///
/// Both the remote API and the local database produce this shape; the two
/// are populated independently and only share the IP they were keyed by.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub country_code: String,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

/// A coordinate pair rendered as `"{lat:.2}, {lng:.2}"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

impl LocationRecord {
    /// Number of display fields a record contributes to a row.
    pub const FIELD_COUNT: usize = 4;

    #[inline]
    pub fn lat_lng(&self) -> LatLng {
        LatLng {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Display strings in table order: country, city, lat/lng, timezone.
    pub fn display_fields(&self) -> [String; Self::FIELD_COUNT] {
        [
            self.country_code.clone(),
            self.city_name.clone(),
            self.lat_lng().to_string(),
            self.timezone.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mountain_view() -> LocationRecord {
        LocationRecord {
            country_code: "US".to_string(),
            city_name: "Mountain View".to_string(),
            latitude: 37.40,
            longitude: -122.08,
            timezone: "America/Los_Angeles".to_string(),
        }
    }

    #[test]
    fn lat_lng_uses_two_decimals() {
        let latlng = LatLng {
            latitude: 59.3293,
            longitude: 18.0686,
        };
        assert_eq!(latlng.to_string(), "59.33, 18.07");

        let latlng = LatLng {
            latitude: 0.0,
            longitude: -0.004,
        };
        assert_eq!(latlng.to_string(), "0.00, -0.00");
    }

    #[test]
    fn display_fields_are_in_column_order() {
        assert_eq!(
            mountain_view().display_fields(),
            [
                "US".to_string(),
                "Mountain View".to_string(),
                "37.40, -122.08".to_string(),
                "America/Los_Angeles".to_string(),
            ]
        );
    }
}
