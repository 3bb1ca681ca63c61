use http::HeaderName;
use serde::{Deserialize, Deserializer};

/// Default inbound correlation header
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";
/// Default response header carrying the application error id
pub const DEFAULT_ERROR_ID_HEADER: &str = "x-error-id";

/// Writer configuration
///
/// ```toml
/// [errors]
/// expose_debug = false
/// request_id_header = "x-request-id"
/// error_id_header = "x-error-id"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WriterConfig {
    /// Include the `debug` field in client responses
    pub expose_debug: bool,
    /// Header the fallback request id is read from
    #[serde(deserialize_with = "deserialize_header_name")]
    pub request_id_header: HeaderName,
    /// Header the application error id is written to
    #[serde(deserialize_with = "deserialize_header_name")]
    pub error_id_header: HeaderName,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            expose_debug: false,
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            error_id_header: HeaderName::from_static(DEFAULT_ERROR_ID_HEADER),
        }
    }
}

impl WriterConfig {
    /// Same configuration with debug exposure toggled
    #[must_use]
    pub fn with_expose_debug(mut self, expose_debug: bool) -> Self {
        self.expose_debug = expose_debug;
        self
    }
}

fn deserialize_header_name<'de, D>(deserializer: D) -> Result<HeaderName, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    HeaderName::try_from(s.as_str()).map_err(serde::de::Error::custom)
}
