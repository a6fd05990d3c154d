use std::net::IpAddr;

use camino::{Utf8Path, Utf8PathBuf};
use maxminddb::{geoip2, Reader};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::location::LocationRecord;

/// File name of the City database looked for in the home directory.
pub const CITY_DB_FILENAME: &str = "GeoLite2-City.mmdb";

const EMPTY_STR: &str = "";

/// Trait for offline lookups against a local geolocation database.
pub trait LocalLookup {
    /// Look up one address. `Ok(None)` means the database has no record for it.
    fn lookup(&self, ip: IpAddr) -> Result<Option<LocationRecord>>;
}

/// Whether the remote results are compared against a local database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Compare when the database can be opened, otherwise warn and skip.
    #[default]
    Auto,
    /// Compare, failing the run if the database cannot be opened.
    Always,
    /// Never open the database.
    Never,
}

/// A MaxMind GeoIP2/GeoLite2 City database opened from disk.
///
/// The file is closed when the value is dropped.
pub struct CityDatabase {
    path: Utf8PathBuf,
    reader: Reader<Vec<u8>>,
}

impl std::fmt::Debug for CityDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityDatabase")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CityDatabase {
    /// Open the database at `path`.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = Reader::open_readfile(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        debug!(%path, "opened local database");
        Ok(Self { path, reader })
    }
}

impl LocalLookup for CityDatabase {
    fn lookup(&self, ip: IpAddr) -> Result<Option<LocationRecord>> {
        let failed = |source| Error::LookupFailed { ip, source };

        let result = self.reader.lookup(ip).map_err(failed)?;
        let city = result.decode::<geoip2::City>().map_err(failed)?;
        Ok(city.as_ref().map(record_from_city))
    }
}

// English names only; absent fields render as empty / zero.
fn record_from_city(city: &geoip2::City<'_>) -> LocationRecord {
    LocationRecord {
        country_code: city.country.iso_code.unwrap_or(EMPTY_STR).to_string(),
        city_name: city.city.names.english.unwrap_or(EMPTY_STR).to_string(),
        latitude: city.location.latitude.unwrap_or(0.0),
        longitude: city.location.longitude.unwrap_or(0.0),
        timezone: city.location.time_zone.unwrap_or(EMPTY_STR).to_string(),
    }
}

/// Open the comparison database according to `mode`.
///
/// Returns `Ok(None)` when comparison is disabled, either explicitly or
/// because `Auto` could not open the file.
pub fn open_for_comparison(mode: CompareMode, path: &Utf8Path) -> Result<Option<CityDatabase>> {
    match mode {
        CompareMode::Never => Ok(None),
        CompareMode::Always => CityDatabase::open(path).map(Some),
        CompareMode::Auto => match CityDatabase::open(path) {
            Ok(db) => Ok(Some(db)),
            Err(err) => {
                warn!(
                    error = &err as &dyn std::error::Error,
                    "disabling local database comparison"
                );
                Ok(None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_path() -> Utf8PathBuf {
        let dir = tempfile::tempdir().unwrap();
        Utf8PathBuf::from_path_buf(dir.path().join(CITY_DB_FILENAME)).unwrap()
    }

    // Same shape as a GeoLite2-City record for 89.160.20.128.
    const LINKOPING: &str = r#"{
        "city": { "geoname_id": 2694762, "names": { "de": "Linköping", "en": "Linköping" } },
        "continent": { "code": "EU", "geoname_id": 6255148, "names": { "en": "Europe" } },
        "country": { "geoname_id": 2661886, "iso_code": "SE", "names": { "en": "Sweden" } },
        "location": {
            "accuracy_radius": 76,
            "latitude": 58.4167,
            "longitude": 15.6167,
            "time_zone": "Europe/Stockholm"
        },
        "subdivisions": [ { "iso_code": "E", "names": { "en": "Östergötland County" } } ]
    }"#;

    #[test]
    fn city_record_maps_to_location() {
        let city: geoip2::City = serde_json::from_str(LINKOPING).unwrap();
        let record = record_from_city(&city);

        assert_eq!(
            record,
            LocationRecord {
                country_code: "SE".to_string(),
                city_name: "Linköping".to_string(),
                latitude: 58.4167,
                longitude: 15.6167,
                timezone: "Europe/Stockholm".to_string(),
            }
        );
        assert_eq!(record.display_fields()[2], "58.42, 15.62");
    }

    #[test]
    fn country_only_record_leaves_fields_empty() {
        let city: geoip2::City =
            serde_json::from_str(r#"{ "country": { "iso_code": "BT" } }"#).unwrap();
        let record = record_from_city(&city);

        assert_eq!(record.country_code, "BT");
        assert_eq!(record.city_name, "");
        assert_eq!(record.timezone, "");
        assert_eq!(record.display_fields()[2], "0.00, 0.00");
    }

    #[test]
    fn open_missing_file_fails() {
        let path = missing_path();
        let err = CityDatabase::open(&path).unwrap_err();
        match err {
            Error::DatabaseOpen { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn open_garbage_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CITY_DB_FILENAME);
        std::fs::write(&path, b"definitely not an mmdb file").unwrap();
        let path = Utf8PathBuf::from_path_buf(path).unwrap();

        assert!(matches!(
            CityDatabase::open(&path),
            Err(Error::DatabaseOpen { .. })
        ));
    }

    #[test]
    fn auto_mode_disables_comparison_when_missing() {
        let path = missing_path();
        assert!(open_for_comparison(CompareMode::Auto, &path)
            .unwrap()
            .is_none());
    }

    #[test]
    fn always_mode_fails_when_missing() {
        let path = missing_path();
        assert!(matches!(
            open_for_comparison(CompareMode::Always, &path),
            Err(Error::DatabaseOpen { .. })
        ));
    }

    #[test]
    fn never_mode_does_not_touch_the_file() {
        let path = missing_path();
        assert!(open_for_comparison(CompareMode::Never, &path)
            .unwrap()
            .is_none());
    }
}
