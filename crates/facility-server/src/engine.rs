//! Booking operations over the schedule store and observer registries.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use facility_core::{DAYS_PER_WEEK, DayTime, TimeSpan, validate_day};
use facility_protocol::codec::Marshal;
use facility_protocol::{DayAvailability, FacilityUpdate};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BookingError, BookingResult};
use crate::notifier::Notifier;
use crate::schedule::{Facility, FacilityState, ScheduleStore};

/// Creates, moves and queries bookings, and fans out changes to observers.
///
/// Every mutation and the broadcast that follows it run inside the
/// facility's critical section. A failed broadcast is logged and never
/// undoes the mutation.
pub struct BookingEngine {
    store: ScheduleStore,
    notifier: Arc<dyn Notifier>,
}

impl BookingEngine {
    pub fn new(store: ScheduleStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Books `start..end` (both `D/HH/mm`) for `client_id`.
    pub async fn create_booking(
        &self,
        facility_name: &str,
        start: &str,
        end: &str,
        client_id: &str,
    ) -> BookingResult<String> {
        let facility = self.store.find_facility(facility_name)?;
        let (day, span) = TimeSpan::between(DayTime::parse(start)?, DayTime::parse(end)?)?;

        let mut state = facility.lock().await;
        let confirmation_id = state.schedule.insert(day, span, client_id)?;
        self.store
            .register(&confirmation_id, facility.name())
            .await;
        info!(
            facility = facility.name(),
            %confirmation_id,
            client = client_id,
            span = %span.display_on(day),
            "Booking created"
        );

        self.broadcast(&facility, &mut state).await;
        Ok(confirmation_id)
    }

    /// Shifts an existing booking by `offset_minutes`, keeping its day.
    pub async fn update_booking(
        &self,
        confirmation_id: &str,
        client_id: &str,
        offset_minutes: i32,
    ) -> BookingResult<()> {
        let facility = self.store.locate(confirmation_id).await?;

        let mut state = facility.lock().await;
        let booking = state
            .schedule
            .find(confirmation_id)
            .ok_or_else(|| BookingError::BookingNotFound(confirmation_id.to_string()))?;
        if booking.owner() != client_id {
            return Err(BookingError::WrongClientId {
                confirmation_id: confirmation_id.to_string(),
                client_id: client_id.to_string(),
            });
        }

        let day = booking.day();
        let span = booking.span().shifted(offset_minutes)?;
        state.schedule.replace(confirmation_id, day, span)?;
        info!(
            facility = facility.name(),
            %confirmation_id,
            offset_minutes,
            span = %span.display_on(day),
            "Booking updated"
        );

        self.broadcast(&facility, &mut state).await;
        Ok(())
    }

    /// Free slots for each requested day, sorted by day.
    pub async fn get_availability(
        &self,
        facility_name: &str,
        days: &[i32],
    ) -> BookingResult<Vec<DayAvailability>> {
        let facility = self.store.find_facility(facility_name)?;
        let mut days = days
            .iter()
            .map(|&day| validate_day(i64::from(day)))
            .collect::<Result<Vec<_>, _>>()?;
        days.sort_unstable();
        days.dedup();

        let state = facility.lock().await;
        Ok(days
            .into_iter()
            .map(|day| DayAvailability::from_spans(day, &state.schedule.availability(day)))
            .collect())
    }

    /// Subscribes `addr` to changes of a facility for `duration_minutes`.
    ///
    /// A non-positive duration registers a session that is already expired.
    pub async fn add_observing_client(
        &self,
        facility_name: &str,
        addr: SocketAddr,
        duration_minutes: i32,
    ) -> BookingResult<Instant> {
        let facility = self.store.find_facility(facility_name)?;
        let minutes = u64::try_from(duration_minutes).unwrap_or(0);
        let duration = Duration::from_secs(minutes * 60);

        let mut state = facility.lock().await;
        let expires_at = state.observers.subscribe(addr, duration, Instant::now());
        info!(
            facility = facility.name(),
            %addr,
            duration_minutes,
            "Observer registered"
        );
        Ok(expires_at)
    }

    async fn broadcast(&self, facility: &Facility, state: &mut FacilityState) {
        let availability = (0..DAYS_PER_WEEK)
            .map(|day| DayAvailability::from_spans(day, &state.schedule.availability(day)))
            .collect();
        let payload = match FacilityUpdate::new(facility.name(), availability).marshal() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(facility = facility.name(), error = %e, "Failed to encode update");
                return;
            }
        };

        let report = state
            .observers
            .broadcast(self.notifier.as_ref(), &payload, Instant::now())
            .await;
        if report.is_complete() {
            debug!(
                facility = facility.name(),
                delivered = report.delivered,
                "Update broadcast"
            );
        } else {
            warn!(
                facility = facility.name(),
                delivered = report.delivered,
                failed = report.failed.len(),
                "Update broadcast incomplete"
            );
        }
    }
}
