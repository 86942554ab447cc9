//! Wire format for the facility reservation service.
//!
//! Every request, reply and update is one UDP datagram encoded with the
//! schema-less codec in [`codec`]. A request datagram is a
//! [`RequestHeader`] (function code and sequence number) followed by the
//! body for that function:
//!
//! | code | function          | body                  |
//! |------|-------------------|-----------------------|
//! | 0    | get availability  | [`AvailabilityQuery`] |
//! | 1    | create booking    | [`BookingRequest`]    |
//! | 2    | update booking    | [`BookingChange`]     |
//! | 3    | register observer | [`ObserveRequest`]    |
//! | any  | heartbeat         | ignored               |
//!
//! Replies are always a [`Response`]; observers additionally receive
//! unsolicited [`FacilityUpdate`] datagrams.
//!
//! # Example
//!
//! ```rust
//! use facility_protocol::{Request, Response, codec::Marshal};
//!
//! let bytes = Request::book("LT1", "0/09/00", "0/10/00").encode(1).unwrap();
//! let (header, request) = Request::decode(&bytes).unwrap();
//! assert_eq!(header.sequence, 1);
//!
//! let reply = Response::ok(header.sequence, "Booked").marshal().unwrap();
//! assert!(Response::unmarshal(&reply).unwrap().is_success());
//! # let _ = request;
//! ```

pub mod codec;
mod error;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use types::{
    AvailabilityQuery, BookingChange, BookingRequest, DayAvailability, FacilityUpdate,
    FunctionCode, HEARTBEAT_ACK, MALFORMED_PAYLOAD, ObserveRequest, Request, RequestHeader,
    Response, Slot, StatusCode,
};

/// Largest datagram either side sends or accepts.
pub const MAX_DATAGRAM_SIZE: usize = 8192;
