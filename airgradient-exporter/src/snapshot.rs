//! Measurement snapshot decoded from the AirGradient local server API.
//!
//! See <https://github.com/airgradienthq/arduino/blob/master/docs/local-server.md>.

use serde::{Deserialize, Serialize};

/// Path of the current-measures resource, relative to the device endpoint.
pub const MEASURES_PATH: &str = "/measures/current";

/// One reading from `GET /measures/current`.
///
/// Every field is required; a body missing any of them fails to decode as a
/// whole. Unknown keys (e.g. the legacy `bootCount` duplicate) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Device serial number.
    #[serde(rename = "serialno")]
    pub serial_no: String,
    /// Firmware version.
    pub firmware: String,
    /// Hardware model, e.g. `I-9PSL`.
    pub model: String,
    /// Current LED bar mode.
    pub led_mode: String,

    /// WiFi signal strength in dBm.
    pub wifi: i64,
    /// PM1.0 in ug/m3.
    pub pm01: i64,
    /// PM2.5 in ug/m3.
    pub pm02: i64,
    /// PM10 in ug/m3.
    pub pm10: i64,
    /// PM2.5 in ug/m3 with correction applied.
    pub pm02_compensated: i64,
    /// CO2 in ppm.
    pub rco2: i64,
    /// Particle count per dL.
    pub pm003_count: i64,
    /// Temperature in degrees Celsius.
    pub atmp: f64,
    /// Temperature in degrees Celsius with correction applied.
    pub atmp_compensated: f64,
    /// Relative humidity.
    pub rhum: i64,
    /// Relative humidity with correction applied.
    pub rhum_compensated: i64,
    /// Sensirion VOC index.
    pub tvoc_index: i64,
    /// VOC raw value.
    pub tvoc_raw: i64,
    /// Sensirion NOx index.
    pub nox_index: i64,
    /// NOx raw value.
    pub nox_raw: i64,
    /// Boot counter, reported by the device in measurement cycles.
    pub boot: i64,
}

impl Snapshot {
    /// Decode a snapshot from a JSON response body.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_BODY: &str = r#"{
        "wifi": -46,
        "serialno": "ecda3b1eaaaf",
        "rco2": 447,
        "pm01": 3,
        "pm02": 7,
        "pm10": 8,
        "pm003Count": 442,
        "atmp": 25.87,
        "rhum": 43,
        "atmpCompensated": 24.47,
        "rhumCompensated": 49,
        "pm02Compensated": 4,
        "tvocIndex": 100,
        "tvocRaw": 33051,
        "noxIndex": 1,
        "noxRaw": 16307,
        "boot": 6,
        "bootCount": 6,
        "ledMode": "pm",
        "firmware": "3.1.1",
        "model": "I-9PSL"
    }"#;

    #[test]
    fn test_decode_device_body() {
        let snapshot = Snapshot::from_json(DEVICE_BODY.as_bytes()).unwrap();

        assert_eq!(snapshot.serial_no, "ecda3b1eaaaf");
        assert_eq!(snapshot.firmware, "3.1.1");
        assert_eq!(snapshot.model, "I-9PSL");
        assert_eq!(snapshot.led_mode, "pm");
        assert_eq!(snapshot.wifi, -46);
        assert_eq!(snapshot.pm02_compensated, 4);
        assert_eq!(snapshot.pm003_count, 442);
        assert_eq!(snapshot.atmp, 25.87);
        assert_eq!(snapshot.atmp_compensated, 24.47);
        assert_eq!(snapshot.tvoc_raw, 33051);
        assert_eq!(snapshot.boot, 6);
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let body = DEVICE_BODY.replace("\"rco2\": 447,", "");
        let err = Snapshot::from_json(body.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("rco2"), "unexpected error: {}", err);
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let body = DEVICE_BODY.replace("\"pm02\": 7", "\"pm02\": \"seven\"");
        assert!(Snapshot::from_json(body.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_truncated_body_fails() {
        let body = &DEVICE_BODY.as_bytes()[..DEVICE_BODY.len() / 2];
        assert!(Snapshot::from_json(body).is_err());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let body = DEVICE_BODY.replace("\"serialno\"", "\"serialNo\"");
        assert!(Snapshot::from_json(body.as_bytes()).is_err());
    }
}
