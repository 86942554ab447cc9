//! Request, response and update datagrams.

use std::fmt;

use facility_core::{DayTime, TimeSpan};
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder, Marshal};
use crate::error::ProtocolResult;
use crate::wire_record;

/// Acknowledgement text returned for heartbeats.
pub const HEARTBEAT_ACK: &str = "Request received by server";

/// Message returned when a request cannot be decoded.
pub const MALFORMED_PAYLOAD: &str = "Malformed request payload";

/// Remote operation selected by the first field of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCode {
    GetAvailability,
    CreateBooking,
    UpdateBooking,
    RegisterObserver,
    /// Any code outside the defined set.
    Heartbeat,
}

impl FunctionCode {
    /// Wire value; heartbeats are sent as -1.
    pub fn code(&self) -> i32 {
        match self {
            Self::GetAvailability => 0,
            Self::CreateBooking => 1,
            Self::UpdateBooking => 2,
            Self::RegisterObserver => 3,
            Self::Heartbeat => -1,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::GetAvailability,
            1 => Self::CreateBooking,
            2 => Self::UpdateBooking,
            3 => Self::RegisterObserver,
            _ => Self::Heartbeat,
        }
    }

    /// Whether replies to this function are kept in the reply cache.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Heartbeat)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetAvailability => "get_availability",
            Self::CreateBooking => "create_booking",
            Self::UpdateBooking => "update_booking",
            Self::RegisterObserver => "register_observer",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    Conflict,
    InternalError,
}

impl StatusCode {
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InternalError => 500,
        }
    }

    pub fn from_i16(status: i16) -> Option<Self> {
        match status {
            200 => Some(Self::Ok),
            400 => Some(Self::BadRequest),
            404 => Some(Self::NotFound),
            409 => Some(Self::Conflict),
            500 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Returns a human-readable description of the status.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad request",
            Self::NotFound => "Not found",
            Self::Conflict => "Conflict",
            Self::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_i16(), self.description())
    }
}

wire_record! {
    /// Leading fields of every request datagram.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestHeader {
        pub function_code: i32,
        /// Client-assigned, increasing per logical action.
        pub sequence: i64,
    }
}

impl RequestHeader {
    pub fn function(&self) -> FunctionCode {
        FunctionCode::from_code(self.function_code)
    }
}

wire_record! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AvailabilityQuery {
        pub facility: String,
        pub days: Vec<i32>,
    }
}

wire_record! {
    /// Start and end are `D/HH/mm` strings.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BookingRequest {
        pub facility: String,
        pub start: String,
        pub end: String,
    }
}

wire_record! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BookingChange {
        pub confirmation_id: String,
        pub offset_minutes: i32,
    }
}

wire_record! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ObserveRequest {
        pub facility: String,
        pub duration_minutes: i32,
    }
}

/// A decoded request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    GetAvailability(AvailabilityQuery),
    CreateBooking(BookingRequest),
    UpdateBooking(BookingChange),
    RegisterObserver(ObserveRequest),
    Heartbeat,
}

impl Request {
    pub fn availability(facility: impl Into<String>, days: Vec<i32>) -> Self {
        Self::GetAvailability(AvailabilityQuery {
            facility: facility.into(),
            days,
        })
    }

    pub fn book(
        facility: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self::CreateBooking(BookingRequest {
            facility: facility.into(),
            start: start.into(),
            end: end.into(),
        })
    }

    pub fn change(confirmation_id: impl Into<String>, offset_minutes: i32) -> Self {
        Self::UpdateBooking(BookingChange {
            confirmation_id: confirmation_id.into(),
            offset_minutes,
        })
    }

    pub fn observe(facility: impl Into<String>, duration_minutes: i32) -> Self {
        Self::RegisterObserver(ObserveRequest {
            facility: facility.into(),
            duration_minutes,
        })
    }

    pub fn function(&self) -> FunctionCode {
        match self {
            Self::GetAvailability(_) => FunctionCode::GetAvailability,
            Self::CreateBooking(_) => FunctionCode::CreateBooking,
            Self::UpdateBooking(_) => FunctionCode::UpdateBooking,
            Self::RegisterObserver(_) => FunctionCode::RegisterObserver,
            Self::Heartbeat => FunctionCode::Heartbeat,
        }
    }

    /// Encodes header and body into one datagram.
    pub fn encode(&self, sequence: i64) -> ProtocolResult<Vec<u8>> {
        let mut encoder = Encoder::new();
        RequestHeader {
            function_code: self.function().code(),
            sequence,
        }
        .write_to(&mut encoder)?;
        match self {
            Self::GetAvailability(body) => body.write_to(&mut encoder)?,
            Self::CreateBooking(body) => body.write_to(&mut encoder)?,
            Self::UpdateBooking(body) => body.write_to(&mut encoder)?,
            Self::RegisterObserver(body) => body.write_to(&mut encoder)?,
            Self::Heartbeat => {}
        }
        encoder.finish()
    }

    /// Reads the body for `function` from the rest of a datagram.
    ///
    /// Heartbeat bodies are ignored; every other body must consume the
    /// remaining input exactly.
    pub fn read_body(function: FunctionCode, mut decoder: Decoder<'_>) -> ProtocolResult<Self> {
        let request = match function {
            FunctionCode::GetAvailability => {
                Self::GetAvailability(AvailabilityQuery::read_from(&mut decoder)?)
            }
            FunctionCode::CreateBooking => {
                Self::CreateBooking(BookingRequest::read_from(&mut decoder)?)
            }
            FunctionCode::UpdateBooking => {
                Self::UpdateBooking(BookingChange::read_from(&mut decoder)?)
            }
            FunctionCode::RegisterObserver => {
                Self::RegisterObserver(ObserveRequest::read_from(&mut decoder)?)
            }
            FunctionCode::Heartbeat => return Ok(Self::Heartbeat),
        };
        decoder.finish()?;
        Ok(request)
    }

    /// Decodes a whole request datagram.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<(RequestHeader, Self)> {
        let mut decoder = Decoder::new(bytes);
        let header = RequestHeader::read_from(&mut decoder)?;
        let request = Self::read_body(header.function(), decoder)?;
        Ok((header, request))
    }
}

wire_record! {
    /// A free interval, both ends formatted `D/HH/mm`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Slot {
        pub start: String,
        pub end: String,
    }
}

impl Slot {
    pub fn on(day: u8, span: TimeSpan) -> Self {
        Self {
            start: DayTime::from_minute(day, span.start()).to_string(),
            end: DayTime::from_minute(day, span.end()).to_string(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

wire_record! {
    /// Free slots of one day, in time order.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DayAvailability {
        pub day: i32,
        pub slots: Vec<Slot>,
    }
}

impl DayAvailability {
    pub fn from_spans(day: u8, spans: &[TimeSpan]) -> Self {
        Self {
            day: i32::from(day),
            slots: spans.iter().map(|span| Slot::on(day, *span)).collect(),
        }
    }
}

wire_record! {
    /// Reply to any request.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Response {
        /// Echo of the request sequence.
        pub sequence: i64,
        pub status: i16,
        pub message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub confirmation_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub availability: Option<Vec<DayAvailability>>,
    }
}

impl Response {
    pub fn ok(sequence: i64, message: impl Into<String>) -> Self {
        Self::with_status(sequence, StatusCode::Ok, message)
    }

    pub fn error(sequence: i64, status: StatusCode, message: impl Into<String>) -> Self {
        Self::with_status(sequence, status, message)
    }

    pub fn heartbeat(sequence: i64) -> Self {
        Self::ok(sequence, HEARTBEAT_ACK)
    }

    /// Reply to a datagram that could not be decoded.
    pub fn malformed(sequence: i64) -> Self {
        Self::error(sequence, StatusCode::InternalError, MALFORMED_PAYLOAD)
    }

    fn with_status(sequence: i64, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            sequence,
            status: status.as_i16(),
            message: message.into(),
            confirmation_id: None,
            availability: None,
        }
    }

    #[must_use]
    pub fn with_confirmation(mut self, confirmation_id: impl Into<String>) -> Self {
        self.confirmation_id = Some(confirmation_id.into());
        self
    }

    #[must_use]
    pub fn with_availability(mut self, availability: Vec<DayAvailability>) -> Self {
        self.availability = Some(availability);
        self
    }

    /// Returns `None` for a status outside the known table.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_i16(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.status_code() == Some(StatusCode::Ok)
    }
}

wire_record! {
    /// Unsolicited notification pushed to observers after a schedule change.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FacilityUpdate {
        pub facility: String,
        pub message: String,
        /// Whole-week availability after the change.
        pub availability: Vec<DayAvailability>,
    }
}

impl FacilityUpdate {
    pub fn new(facility: impl Into<String>, availability: Vec<DayAvailability>) -> Self {
        let facility = facility.into();
        Self {
            message: format!("Update from: {facility}"),
            facility,
            availability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn function_codes() {
        for function in [
            FunctionCode::GetAvailability,
            FunctionCode::CreateBooking,
            FunctionCode::UpdateBooking,
            FunctionCode::RegisterObserver,
            FunctionCode::Heartbeat,
        ] {
            assert_eq!(FunctionCode::from_code(function.code()), function);
        }
        assert_eq!(FunctionCode::from_code(4), FunctionCode::Heartbeat);
        assert_eq!(FunctionCode::from_code(i32::MIN), FunctionCode::Heartbeat);
        assert!(!FunctionCode::Heartbeat.is_cacheable());
        assert!(FunctionCode::CreateBooking.is_cacheable());
    }

    #[test]
    fn status_codes() {
        assert_eq!(StatusCode::NotFound.as_i16(), 404);
        assert_eq!(StatusCode::from_i16(409), Some(StatusCode::Conflict));
        assert_eq!(StatusCode::from_i16(418), None);
        assert_eq!(StatusCode::BadRequest.to_string(), "400 Bad request");
    }

    #[test]
    fn booking_body_layout() {
        let body = BookingRequest {
            facility: "LT1".into(),
            start: "0/09/00".into(),
            end: "0/10/00".into(),
        };
        insta::assert_snapshot!(
            hex(&body.marshal().unwrap()),
            @"000000034c543100000007302f30392f303000000007302f31302f3030"
        );
    }

    #[test]
    fn request_header_precedes_body() {
        let bytes = Request::change("abc", -30).encode(7).unwrap();
        insta::assert_snapshot!(
            hex(&bytes),
            @"00000002000000000000000700000003616263ffffffe2"
        );
    }

    #[test]
    fn request_roundtrip() {
        let requests = [
            Request::availability("LT1", vec![0, 3, 6]),
            Request::book("TC1", "2/08/00", "2/09/30"),
            Request::change("3f2c", 45),
            Request::observe("SWLAB1", 10),
            Request::Heartbeat,
        ];
        for (sequence, request) in requests.into_iter().enumerate() {
            let bytes = request.encode(sequence as i64).unwrap();
            let (header, decoded) = Request::decode(&bytes).unwrap();
            assert_eq!(header.sequence, sequence as i64);
            assert_eq!(header.function(), request.function());
            assert_eq!(decoded, request);
        }
    }

    #[test]
    fn heartbeat_ignores_body() {
        let mut bytes = Request::Heartbeat.encode(1).unwrap();
        bytes.extend_from_slice(b"anything at all");
        let (_, request) = Request::decode(&bytes).unwrap();
        assert_eq!(request, Request::Heartbeat);
    }

    #[test]
    fn unknown_function_is_heartbeat() {
        let mut encoder = Encoder::new();
        RequestHeader {
            function_code: 99,
            sequence: 4,
        }
        .write_to(&mut encoder)
        .unwrap();
        let bytes = encoder.finish().unwrap();
        let (header, request) = Request::decode(&bytes).unwrap();
        assert_eq!(header.sequence, 4);
        assert_eq!(request, Request::Heartbeat);
    }

    #[test]
    fn truncated_header_rejected() {
        let bytes = Request::Heartbeat.encode(1).unwrap();
        assert!(matches!(
            Request::decode(&bytes[..5]),
            Err(ProtocolError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn body_with_trailing_bytes_rejected() {
        let mut bytes = Request::observe("LT1", 5).encode(1).unwrap();
        bytes.push(0);
        assert!(matches!(
            Request::decode(&bytes),
            Err(ProtocolError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn response_roundtrip() {
        let span = TimeSpan::new(600, 1440).unwrap();
        let response = Response::ok(9, "Booked")
            .with_confirmation("id-1")
            .with_availability(vec![DayAvailability::from_spans(0, &[span])]);
        let decoded = Response::unmarshal(&response.marshal().unwrap()).unwrap();
        assert_eq!(decoded, response);
        assert!(decoded.is_success());
        assert_eq!(decoded.availability.unwrap()[0].slots[0].to_string(), "0/10/00 - 0/24/00");
    }

    #[test]
    fn error_responses() {
        let response = Response::malformed(3);
        assert_eq!(response.status_code(), Some(StatusCode::InternalError));
        assert_eq!(response.message, MALFORMED_PAYLOAD);
        assert!(!response.is_success());

        let heartbeat = Response::heartbeat(0);
        assert!(heartbeat.is_success());
        assert_eq!(heartbeat.message, HEARTBEAT_ACK);
    }

    #[test]
    fn update_message_names_facility() {
        let update = FacilityUpdate::new("BTC2", vec![]);
        assert_eq!(update.message, "Update from: BTC2");
        let decoded = FacilityUpdate::unmarshal(&update.marshal().unwrap()).unwrap();
        assert_eq!(decoded, update);
    }

    #[test]
    fn request_json_is_tagged() {
        let json = serde_json::to_string(&Request::observe("LT2", 3)).unwrap();
        insta::assert_snapshot!(json, @r#"{"type":"register_observer","facility":"LT2","duration_minutes":3}"#);
    }
}
