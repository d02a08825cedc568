//! Input validation for inbound reports and registrations.
//!
//! Location reports arrive loosely typed. A field is accepted when it is a
//! JSON number or a string that parses as one; anything else is rejected
//! with a field-level [`ValidationError`] before any store is touched.

use serde_json::Value;
use smartbus_types::{BusId, NewBus, NewRoute, NewStop, RawLocationReport};

use crate::error::ValidationError;
use crate::store::NewLocationReport;

/// Turn a raw report into a well-formed one.
///
/// Coordinates must be finite. Speed must be finite and non-negative.
/// The bus id must be an integer.
pub fn location_report(raw: &RawLocationReport) -> Result<NewLocationReport, ValidationError> {
    let bus_id = integer_field("bus_id", raw.bus_id.as_ref())?;
    let latitude = finite_field("latitude", raw.latitude.as_ref())?;
    let longitude = finite_field("longitude", raw.longitude.as_ref())?;
    let speed = finite_field("speed", raw.speed.as_ref())?;

    if speed < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: "speed",
            reason: "must not be negative",
        });
    }

    Ok(NewLocationReport {
        bus_id: BusId::new(bus_id),
        latitude,
        longitude,
        speed,
    })
}

/// Check a bus registration payload.
pub fn new_bus(bus: &NewBus) -> Result<(), ValidationError> {
    non_empty("bus_number", &bus.bus_number)?;
    non_empty("driver_name", &bus.driver_name)
}

/// Check a route creation payload.
pub fn new_route(route: &NewRoute) -> Result<(), ValidationError> {
    non_empty("route_name", &route.route_name)?;
    non_empty("start_location", &route.start_location)?;
    non_empty("end_location", &route.end_location)
}

/// Check a stop creation payload.
pub fn new_stop(stop: &NewStop) -> Result<(), ValidationError> {
    non_empty("stop_name", &stop.stop_name)?;
    finite("latitude", stop.latitude)?;
    finite("longitude", stop.longitude)?;
    Ok(())
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

const fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            reason: "must be finite",
        })
    }
}

fn present<'a>(field: &'static str, value: Option<&'a Value>) -> Result<&'a Value, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::Missing { field }),
        Some(v) => Ok(v),
    }
}

fn finite_field(field: &'static str, value: Option<&Value>) -> Result<f64, ValidationError> {
    let parsed = match present(field, value)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    finite(field, parsed.ok_or(ValidationError::NotNumeric { field })?)
}

fn integer_field(field: &'static str, value: Option<&Value>) -> Result<i64, ValidationError> {
    match present(field, value)? {
        Value::Number(n) => n.as_i64().ok_or(ValidationError::NotNumeric { field }),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_parse| ValidationError::NotNumeric { field }),
        _ => Err(ValidationError::NotNumeric { field }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawLocationReport {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let report = location_report(&raw(json!({
            "bus_id": "3",
            "latitude": 13.0827,
            "longitude": "80.2707",
            "speed": 0,
        })))
        .unwrap();
        assert_eq!(report.bus_id, BusId::new(3));
        assert_eq!(report.longitude, 80.2707);
        assert_eq!(report.speed, 0.0);
    }

    #[test]
    fn missing_field_is_named() {
        let err = location_report(&raw(json!({
            "bus_id": 1,
            "latitude": 13.0,
            "speed": 10,
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "longitude" });
    }

    #[test]
    fn null_counts_as_missing() {
        let err = location_report(&raw(json!({
            "bus_id": null,
            "latitude": 13.0,
            "longitude": 80.0,
            "speed": 10,
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "bus_id" });
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = location_report(&raw(json!({
            "bus_id": 1,
            "latitude": "north",
            "longitude": 80.0,
            "speed": 10,
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::NotNumeric { field: "latitude" });

        let err = location_report(&raw(json!({
            "bus_id": 1.5,
            "latitude": 13.0,
            "longitude": 80.0,
            "speed": 10,
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::NotNumeric { field: "bus_id" });
    }

    #[test]
    fn negative_speed_is_out_of_range() {
        let err = location_report(&raw(json!({
            "bus_id": 1,
            "latitude": 13.0,
            "longitude": 80.0,
            "speed": -4,
        })))
        .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "speed", .. }));
    }

    #[test]
    fn registration_requires_names() {
        let bus = NewBus {
            bus_number: " ".to_owned(),
            driver_name: "Anita".to_owned(),
        };
        assert_eq!(
            new_bus(&bus).unwrap_err(),
            ValidationError::Empty { field: "bus_number" }
        );

        let stop = NewStop {
            stop_name: "Central".to_owned(),
            latitude: f64::NAN,
            longitude: 80.0,
            stop_order: 1,
        };
        assert!(new_stop(&stop).is_err());
    }
}
