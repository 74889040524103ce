//! GeoIP country lookup.

use std::net::IpAddr;
#[cfg(feature = "geoip")]
use std::path::Path;

#[cfg(feature = "geoip")]
use maxminddb::{Reader, geoip2};

#[cfg(feature = "geoip")]
use crate::error::RulesError;

/// Read-only IP → country database consulted by country rules.
pub trait GeoIpReader: Send + Sync {
    /// ISO country code for `ip`, or `None` when the address is unknown or
    /// the lookup fails.
    fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// [`GeoIpReader`] over a MaxMind `.mmdb` database, country or city edition.
#[cfg(feature = "geoip")]
pub struct MaxmindReader {
    reader: Reader<Vec<u8>>,
}

#[cfg(feature = "geoip")]
impl MaxmindReader {
    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let reader = Reader::open_readfile(path).map_err(|e| {
            RulesError::GeoIp(format!("cannot open {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "GeoIP database opened");
        Ok(Self { reader })
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RulesError> {
        Reader::from_source(data)
            .map(|reader| Self { reader })
            .map_err(|e| RulesError::GeoIp(format!("invalid database: {e}")))
    }
}

#[cfg(feature = "geoip")]
impl GeoIpReader for MaxmindReader {
    fn country_code(&self, ip: IpAddr) -> Option<String> {
        let record = self.reader.lookup(ip).ok()?;
        let code = match record.decode::<geoip2::Country>() {
            Ok(Some(found)) if found.country.iso_code.is_some() => found.country.iso_code,
            // city edition
            _ => record
                .decode::<geoip2::City>()
                .ok()
                .flatten()
                .and_then(|city| city.country.iso_code),
        };
        code.map(str::to_ascii_uppercase)
    }
}

#[cfg(feature = "geoip")]
impl std::fmt::Debug for MaxmindReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxmindReader")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

#[cfg(all(test, feature = "geoip"))]
mod tests {
    use super::*;

    #[test]
    fn maxmind_reader_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MaxmindReader>();
    }

    #[test]
    fn missing_file_is_geoip_error() {
        let err = MaxmindReader::from_file(Path::new("/nonexistent/country.mmdb")).unwrap_err();
        assert!(matches!(err, RulesError::GeoIp(msg) if msg.contains("/nonexistent/country.mmdb")));
    }

    #[test]
    fn garbage_bytes_rejected() {
        let err = MaxmindReader::from_bytes(b"not a maxmind database".to_vec()).unwrap_err();
        assert!(matches!(err, RulesError::GeoIp(_)));
    }
}
