//! Datagram dispatch.
//!
//! Decodes an inbound datagram, answers retries from the reply cache,
//! routes first-seen requests to the [`BookingEngine`] and encodes the
//! reply.

use std::net::SocketAddr;
use std::sync::Arc;

use facility_protocol::codec::{Decoder, Marshal};
use facility_protocol::{
    BookingChange, BookingRequest, ObserveRequest, Request, RequestHeader, Response, StatusCode,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{Span, debug, warn};

use crate::cache::{Claim, ReplyCache, RequestId, fingerprint};
use crate::engine::BookingEngine;
use crate::error::BookingError;

/// Routes requests to the engine with at-most-once execution per request id.
pub struct RequestDispatcher {
    engine: Arc<BookingEngine>,
    replies: Mutex<ReplyCache>,
}

impl RequestDispatcher {
    pub fn new(engine: Arc<BookingEngine>, replies: ReplyCache) -> Self {
        Self {
            engine,
            replies: Mutex::new(replies),
        }
    }

    pub fn engine(&self) -> &BookingEngine {
        &self.engine
    }

    /// Handles one datagram from `origin` and returns the reply to send.
    ///
    /// Returns `None` when the same request is already being executed; the
    /// client's next retry will be answered from the cache.
    pub async fn handle_datagram(&self, bytes: &[u8], origin: SocketAddr) -> Option<Vec<u8>> {
        let mut decoder = Decoder::new(bytes);
        let header = match RequestHeader::read_from(&mut decoder) {
            Ok(header) => header,
            Err(e) => {
                warn!(%origin, len = bytes.len(), error = %e, "Unreadable request header");
                return encode_reply(&Response::malformed(0));
            }
        };

        let function = header.function();
        let id = RequestId::new(origin, header.sequence);
        let digest = fingerprint(bytes);
        if function.is_cacheable() {
            match self.replies.lock().await.claim(id, digest, Instant::now()) {
                Claim::Replay(reply) => {
                    debug!(%id, %function, "Replaying cached reply");
                    return Some(reply);
                }
                Claim::InFlight => {
                    debug!(%id, %function, "Request already in flight, dropping duplicate");
                    return None;
                }
                Claim::Claimed => {}
            }
        }

        let response = match Request::read_body(function, decoder) {
            Ok(request) => self.handle(&request, header.sequence, origin).await,
            Err(e) => {
                warn!(%id, %function, error = %e, "Malformed request body");
                Response::malformed(header.sequence)
            }
        };

        let reply = encode_reply(&response);
        if function.is_cacheable() {
            let mut replies = self.replies.lock().await;
            match &reply {
                Some(bytes) => replies.complete(id, digest, bytes.clone(), Instant::now()),
                None => replies.release(&id),
            }
        }
        reply
    }

    /// Executes one decoded request.
    #[tracing::instrument(
        skip(self, request),
        fields(function = %request.function(), duration_ms)
    )]
    pub async fn handle(&self, request: &Request, sequence: i64, origin: SocketAddr) -> Response {
        let started = std::time::Instant::now();
        let client_id = origin.to_string();

        let result = match request {
            Request::GetAvailability(query) => {
                debug!(facility = %query.facility, days = ?query.days, "Handling GetAvailability");
                self.engine
                    .get_availability(&query.facility, &query.days)
                    .await
                    .map(|days| Response::ok(sequence, "Facility availability").with_availability(days))
            }
            Request::CreateBooking(BookingRequest {
                facility,
                start,
                end,
            }) => {
                debug!(%facility, %start, %end, "Handling CreateBooking");
                self.engine
                    .create_booking(facility, start, end, &client_id)
                    .await
                    .map(|id| Response::ok(sequence, "Booking confirmed").with_confirmation(id))
            }
            Request::UpdateBooking(BookingChange {
                confirmation_id,
                offset_minutes,
            }) => {
                debug!(%confirmation_id, offset_minutes, "Handling UpdateBooking");
                self.engine
                    .update_booking(confirmation_id, &client_id, *offset_minutes)
                    .await
                    .map(|()| {
                        Response::ok(sequence, "Booking updated successfully")
                            .with_confirmation(confirmation_id.clone())
                    })
            }
            Request::RegisterObserver(ObserveRequest {
                facility,
                duration_minutes,
            }) => {
                debug!(%facility, duration_minutes, "Handling RegisterObserver");
                self.engine
                    .add_observing_client(facility, origin, *duration_minutes)
                    .await
                    .map(|_| Response::ok(sequence, "Successfully added to observing list"))
            }
            Request::Heartbeat => {
                debug!("Handling Heartbeat");
                Ok(Response::heartbeat(sequence))
            }
        };

        let response = result.unwrap_or_else(|e| error_response(sequence, &e));

        let duration = started.elapsed();
        if tracing::enabled!(tracing::Level::DEBUG) {
            Span::current().record("duration_ms", duration.as_millis());
            debug!(
                status = response.status,
                duration_ms = duration.as_millis(),
                "Request handled"
            );
        }

        response
    }
}

fn error_response(sequence: i64, error: &BookingError) -> Response {
    debug!(error = %error, status = error.status().as_i16(), "Request failed");
    Response::error(sequence, error.status(), error.client_message())
}

fn encode_reply(response: &Response) -> Option<Vec<u8>> {
    match response.marshal() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(sequence = response.sequence, error = %e, "Failed to encode reply");
            Response::error(response.sequence, StatusCode::InternalError, "Reply too large")
                .marshal()
                .ok()
        }
    }
}
