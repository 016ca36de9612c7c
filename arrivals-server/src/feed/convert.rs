//! Conversion from transit API DTOs to domain types.
//!
//! Malformed records are skipped with a warning rather than failing the
//! whole response: partial data must not block the rest of the board.

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::{
    LineFeed, LineId, RealTimeArrival, ScheduledArrival, StopFeed, TripId, VehiclePosition,
    parse_timestamp, resolve_arrival,
};

use super::types::{BusPositionDto, LineDto, RealTimeDto, ScheduledDto, StopResponse};

/// Error during DTO to domain conversion of a single record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but unusable
    #[error("invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Convert a stop response to a validated feed.
///
/// `service_date` anchors clock-only arrival times.
pub fn convert_stop_response(response: &StopResponse, service_date: NaiveDate) -> StopFeed {
    let lines = response
        .lineas
        .iter()
        .filter_map(|line| match convert_line(line, service_date) {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!(error = %e, "skipping line entry");
                None
            }
        })
        .collect();

    StopFeed {
        stop_name: response.stop_name(),
        lines,
    }
}

/// Convert one line entry, skipping any malformed arrivals in it.
pub fn convert_line(line: &LineDto, service_date: NaiveDate) -> Result<LineFeed, ConversionError> {
    let raw_line = line
        .linea
        .as_deref()
        .ok_or(ConversionError::MissingField("linea"))?;
    let line_id = LineId::parse(raw_line).map_err(|e| ConversionError::InvalidField {
        field: "linea",
        message: e.to_string(),
    })?;

    let mut scheduled = Vec::with_capacity(line.horarios.len());
    for entry in &line.horarios {
        match convert_scheduled(entry, service_date) {
            Ok(arrival) => scheduled.push(arrival),
            Err(e) => warn!(line = %line_id, error = %e, "skipping scheduled arrival"),
        }
    }

    let mut real_time = Vec::with_capacity(line.realtime.len());
    for entry in &line.realtime {
        match convert_real_time(entry, service_date) {
            Ok(arrival) => real_time.push(arrival),
            Err(e) => warn!(line = %line_id, error = %e, "skipping real-time arrival"),
        }
    }

    Ok(LineFeed {
        line: line_id,
        scheduled,
        real_time,
    })
}

/// Convert a scheduled arrival entry.
pub fn convert_scheduled(
    entry: &ScheduledDto,
    service_date: NaiveDate,
) -> Result<ScheduledArrival, ConversionError> {
    let trip_id = parse_trip_id(entry.trip_id.as_deref())?;
    let arrival = resolve_arrival(
        entry.fecha_hora_llegada.as_deref(),
        entry.llegada.as_deref(),
        service_date,
    )
    .map_err(|e| ConversionError::InvalidField {
        field: "arrival time",
        message: e.to_string(),
    })?;

    Ok(ScheduledArrival {
        trip_id,
        arrival,
        destination: entry.destino.clone(),
    })
}

/// Convert a real-time arrival entry.
///
/// Vehicle metadata is copied through as-is; absent values stay absent.
pub fn convert_real_time(
    entry: &RealTimeDto,
    service_date: NaiveDate,
) -> Result<RealTimeArrival, ConversionError> {
    let trip_id = parse_trip_id(entry.trip_id.as_deref())?;
    let arrival = resolve_arrival(
        entry.fecha_hora_llegada.as_deref(),
        entry.llegada.as_deref(),
        service_date,
    )
    .map_err(|e| ConversionError::InvalidField {
        field: "arrival time",
        message: e.to_string(),
    })?;

    Ok(RealTimeArrival {
        trip_id,
        arrival,
        vehicle_id: entry.vehicle_id.clone(),
        plate_number: entry.matricula.clone(),
        latitude: entry.latitud,
        longitude: entry.longitud,
        speed: entry.velocidad,
        status: entry.estado.clone(),
        propagated_delay: entry.propagated_delay,
    })
}

/// Convert the first element of a bus position response.
///
/// An empty array means the vehicle is not currently reporting.
pub fn convert_bus_position(positions: &[BusPositionDto]) -> Option<VehiclePosition> {
    let first = positions.first()?;

    Some(VehiclePosition {
        latitude: first.latitud,
        longitude: first.longitud,
        speed: first.velocidad,
        occupancy: first.ocupacion.clone(),
        timestamp: first
            .timestamp
            .as_deref()
            .and_then(|ts| parse_timestamp(ts).ok()),
    })
}

fn parse_trip_id(raw: Option<&str>) -> Result<TripId, ConversionError> {
    let raw = raw.ok_or(ConversionError::MissingField("trip_id"))?;
    TripId::parse(raw).map_err(|e| ConversionError::InvalidField {
        field: "trip_id",
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn response(json: &str) -> StopResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn convert_full_line() {
        let resp = response(
            r#"{"lineas": [{
                "linea": "1",
                "horarios": [
                    {"trip_id": "T1", "llegada": "08:10", "destino": "Hospital"},
                    {"trip_id": "T2", "fechaHoraLlegada": "2024-03-15T08:25:00", "destino": "Hospital"}
                ],
                "realtime": [
                    {"trip_id": "T1", "fechaHoraLlegada": "2024-03-15 08:17:00", "vehicleId": 7, "propagated_delay": 0}
                ]
            }]}"#,
        );

        let feed = convert_stop_response(&resp, date());

        assert_eq!(feed.lines.len(), 1);
        let line = &feed.lines[0];
        assert_eq!(line.line.as_str(), "1");
        assert_eq!(line.scheduled.len(), 2);
        assert_eq!(
            line.scheduled[0].arrival,
            date().and_hms_opt(8, 10, 0).unwrap()
        );
        assert_eq!(line.scheduled[0].destination.as_deref(), Some("Hospital"));

        let rt = &line.real_time[0];
        assert_eq!(rt.arrival, date().and_hms_opt(8, 17, 0).unwrap());
        assert_eq!(rt.vehicle_id.as_deref(), Some("7"));
        assert_eq!(rt.propagated_delay, Some(false));
        assert_eq!(rt.plate_number, None);
        assert_eq!(rt.speed, None);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let resp = response(
            r#"{"lineas": [{
                "linea": "1",
                "horarios": [
                    {"llegada": "08:10"},
                    {"trip_id": "T2"},
                    {"trip_id": "T3", "llegada": "not a time"},
                    {"trip_id": "T4", "llegada": "08:40"}
                ],
                "realtime": [
                    {"trip_id": "", "llegada": "08:12"},
                    {"trip_id": "T4", "llegada": "08:42"}
                ]
            }]}"#,
        );

        let feed = convert_stop_response(&resp, date());
        let line = &feed.lines[0];

        assert_eq!(line.scheduled.len(), 1);
        assert_eq!(line.scheduled[0].trip_id.as_str(), "T4");
        assert_eq!(line.real_time.len(), 1);
        assert_eq!(line.real_time[0].trip_id.as_str(), "T4");
    }

    #[test]
    fn line_without_code_is_skipped() {
        let resp = response(
            r#"{"lineas": [
                {"horarios": [{"trip_id": "T1", "llegada": "08:10"}]},
                {"linea": "2", "horarios": [{"trip_id": "T9", "llegada": "09:10"}]}
            ]}"#,
        );

        let feed = convert_stop_response(&resp, date());

        assert_eq!(feed.lines.len(), 1);
        assert_eq!(feed.lines[0].line.as_str(), "2");
        assert_eq!(feed.record_count(), 1);
    }

    #[test]
    fn night_clock_times_roll_into_next_day() {
        let entry = ScheduledDto {
            trip_id: Some("N1".into()),
            llegada: Some("25:15".into()),
            fecha_hora_llegada: None,
            destino: None,
        };

        let arrival = convert_scheduled(&entry, date()).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        assert_eq!(arrival.arrival, next_day.and_hms_opt(1, 15, 0).unwrap());
    }

    #[test]
    fn bus_position_takes_first_element() {
        let positions: Vec<BusPositionDto> = serde_json::from_str(
            r#"[{"latitud": 40.96, "longitud": -5.66, "timestamp": "2024-03-15T08:15:42"}]"#,
        )
        .unwrap();

        let pos = convert_bus_position(&positions).unwrap();
        assert!(pos.has_fix());
        assert_eq!(pos.timestamp, Some(date().and_hms_opt(8, 15, 42).unwrap()));

        assert!(convert_bus_position(&[]).is_none());
    }

    #[test]
    fn error_display() {
        let err = ConversionError::MissingField("trip_id");
        assert_eq!(err.to_string(), "missing required field: trip_id");
    }
}
