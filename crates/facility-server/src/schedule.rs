//! Per-facility weekly schedules and the facility catalogue.
//!
//! Each [`Facility`] keeps its bookings and observers behind one async
//! mutex, so the conflict check and the insert or replace that follows it
//! are atomic per facility while unrelated facilities proceed
//! independently. [`ScheduleStore`] owns the facilities and an index from
//! confirmation id to facility name.

use std::collections::HashMap;
use std::sync::Arc;

use facility_core::{CATALOGUE, CatalogueEntry, DAYS_PER_WEEK, FacilityKind, TimeError, TimeSpan};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::observers::ObservationRegistry;

/// One confirmed booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    confirmation_id: String,
    day: u8,
    span: TimeSpan,
    owner: String,
}

impl Booking {
    pub fn confirmation_id(&self) -> &str {
        &self.confirmation_id
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn span(&self) -> TimeSpan {
        self.span
    }

    /// Client id (`address:port`) that created the booking.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// Bookings of one facility, per day, sorted by start time.
///
/// No two bookings on the same day overlap.
#[derive(Debug, Default)]
pub struct Schedule {
    days: [Vec<Booking>; DAYS_PER_WEEK as usize],
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookings on `day` in start order; empty for an out-of-range day.
    pub fn bookings(&self, day: u8) -> &[Booking] {
        self.days.get(day as usize).map_or(&[][..], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    pub fn find(&self, confirmation_id: &str) -> Option<&Booking> {
        self.days
            .iter()
            .flatten()
            .find(|b| b.confirmation_id == confirmation_id)
    }

    /// Books `span` on `day` for `owner` and returns a fresh confirmation id.
    pub fn insert(&mut self, day: u8, span: TimeSpan, owner: &str) -> BookingResult<String> {
        let bookings = self.day_mut(day)?;
        if let Some(existing) = bookings.iter().find(|b| b.span.overlaps(&span)) {
            trace!(
                day,
                conflict = %existing.confirmation_id,
                "Requested span overlaps a booking"
            );
            return Err(BookingError::TimingUnavailable);
        }

        let confirmation_id = Uuid::new_v4().to_string();
        let position = bookings.partition_point(|b| b.span.start() < span.start());
        bookings.insert(
            position,
            Booking {
                confirmation_id: confirmation_id.clone(),
                day,
                span,
                owner: owner.to_string(),
            },
        );
        debug!(day, %confirmation_id, span = %span.display_on(day), "Inserted booking");
        Ok(confirmation_id)
    }

    /// Moves an existing booking to `span` on `day`.
    ///
    /// The overlap check ignores the booking being moved. On conflict the
    /// schedule is left unchanged. Returns the updated booking.
    pub fn replace(
        &mut self,
        confirmation_id: &str,
        day: u8,
        span: TimeSpan,
    ) -> BookingResult<Booking> {
        let (old_day, index) = self
            .locate(confirmation_id)
            .ok_or_else(|| BookingError::BookingNotFound(confirmation_id.to_string()))?;

        let conflict = self
            .day_mut(day)?
            .iter()
            .any(|b| b.confirmation_id != confirmation_id && b.span.overlaps(&span));
        if conflict {
            return Err(BookingError::TimingUnavailable);
        }

        let mut booking = self.days[old_day as usize].remove(index);
        booking.day = day;
        booking.span = span;

        let bookings = &mut self.days[day as usize];
        let position = bookings.partition_point(|b| b.span.start() < span.start());
        bookings.insert(position, booking.clone());
        debug!(day, %confirmation_id, span = %span.display_on(day), "Replaced booking");
        Ok(booking)
    }

    /// Free intervals on `day` between 00:00 and 24:00, in time order.
    pub fn availability(&self, day: u8) -> Vec<TimeSpan> {
        let mut free = Vec::new();
        let mut cursor = 0;
        for booking in self.bookings(day) {
            if let Ok(gap) = TimeSpan::new(cursor, booking.span.start()) {
                free.push(gap);
            }
            cursor = booking.span.end();
        }
        if let Ok(tail) = TimeSpan::new(cursor, TimeSpan::full_day().end()) {
            free.push(tail);
        }
        free
    }

    fn locate(&self, confirmation_id: &str) -> Option<(u8, usize)> {
        self.days.iter().enumerate().find_map(|(day, bookings)| {
            bookings
                .iter()
                .position(|b| b.confirmation_id == confirmation_id)
                .map(|index| (day as u8, index))
        })
    }

    fn day_mut(&mut self, day: u8) -> BookingResult<&mut Vec<Booking>> {
        self.days
            .get_mut(day as usize)
            .ok_or(BookingError::InvalidDatetime(TimeError::DayOutOfRange(
                day as i64,
            )))
    }
}

/// Mutable state of a facility, guarded by the facility lock.
#[derive(Debug, Default)]
pub struct FacilityState {
    pub schedule: Schedule,
    pub observers: ObservationRegistry,
}

/// A bookable facility.
#[derive(Debug)]
pub struct Facility {
    name: String,
    kind: FacilityKind,
    state: Mutex<FacilityState>,
}

impl Facility {
    pub fn new(name: impl Into<String>, kind: FacilityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: Mutex::new(FacilityState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FacilityKind {
        self.kind
    }

    /// Acquires the facility's critical section.
    pub async fn lock(&self) -> MutexGuard<'_, FacilityState> {
        self.state.lock().await
    }
}

/// All facilities plus the confirmation id index.
#[derive(Debug)]
pub struct ScheduleStore {
    facilities: HashMap<String, Arc<Facility>>,
    /// Confirmation id to facility name.
    index: RwLock<HashMap<String, String>>,
}

impl Default for ScheduleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleStore {
    /// Creates the store from the built-in catalogue.
    pub fn new() -> Self {
        Self::from_catalogue(CATALOGUE)
    }

    pub fn from_catalogue(entries: &[CatalogueEntry]) -> Self {
        let facilities = entries
            .iter()
            .map(|entry| {
                (
                    entry.name.to_string(),
                    Arc::new(Facility::new(entry.name, entry.kind)),
                )
            })
            .collect();
        Self {
            facilities,
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn find_facility(&self, name: &str) -> BookingResult<Arc<Facility>> {
        self.facilities
            .get(name)
            .cloned()
            .ok_or_else(|| BookingError::FacilityNotFound(name.to_string()))
    }

    /// Facility holding the booking with this confirmation id.
    pub async fn locate(&self, confirmation_id: &str) -> BookingResult<Arc<Facility>> {
        let name = self
            .index
            .read()
            .await
            .get(confirmation_id)
            .cloned()
            .ok_or_else(|| BookingError::BookingNotFound(confirmation_id.to_string()))?;
        self.find_facility(&name)
    }

    /// Records which facility a new confirmation id belongs to.
    pub async fn register(&self, confirmation_id: &str, facility: &str) {
        self.index
            .write()
            .await
            .insert(confirmation_id.to_string(), facility.to_string());
    }

    pub fn facilities(&self) -> impl Iterator<Item = &Arc<Facility>> {
        self.facilities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: u16, end: u16) -> TimeSpan {
        TimeSpan::new(start, end).unwrap()
    }

    #[test]
    fn insert_keeps_start_order() {
        let mut schedule = Schedule::new();
        schedule.insert(1, span(600, 660), "a").unwrap();
        schedule.insert(1, span(480, 540), "a").unwrap();
        schedule.insert(1, span(540, 600), "b").unwrap();

        let starts: Vec<_> = schedule.bookings(1).iter().map(|b| b.span().start()).collect();
        assert_eq!(starts, vec![480, 540, 600]);
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn insert_rejects_overlap() {
        let mut schedule = Schedule::new();
        let id = schedule.insert(0, span(540, 600), "a").unwrap();
        assert_eq!(
            schedule.insert(0, span(570, 630), "b"),
            Err(BookingError::TimingUnavailable)
        );
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.find(&id).unwrap().span(), span(540, 600));
    }

    #[test]
    fn same_span_on_other_day_is_free() {
        let mut schedule = Schedule::new();
        schedule.insert(0, span(540, 600), "a").unwrap();
        assert!(schedule.insert(1, span(540, 600), "a").is_ok());
    }

    #[test]
    fn confirmation_ids_are_unique() {
        let mut schedule = Schedule::new();
        let a = schedule.insert(0, span(0, 60), "a").unwrap();
        let b = schedule.insert(0, span(60, 120), "a").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn replace_ignores_itself() {
        let mut schedule = Schedule::new();
        let id = schedule.insert(2, span(540, 600), "a").unwrap();
        let moved = schedule.replace(&id, 2, span(570, 630)).unwrap();
        assert_eq!(moved.span(), span(570, 630));
        assert_eq!(moved.owner(), "a");
        assert_eq!(moved.confirmation_id(), id);
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn replace_conflict_leaves_schedule_unchanged() {
        let mut schedule = Schedule::new();
        let first = schedule.insert(2, span(540, 600), "a").unwrap();
        schedule.insert(2, span(600, 660), "b").unwrap();

        assert_eq!(
            schedule.replace(&first, 2, span(570, 630)),
            Err(BookingError::TimingUnavailable)
        );
        assert_eq!(schedule.find(&first).unwrap().span(), span(540, 600));
        assert_eq!(schedule.bookings(2).len(), 2);
    }

    #[test]
    fn replace_reorders() {
        let mut schedule = Schedule::new();
        let early = schedule.insert(3, span(60, 120), "a").unwrap();
        schedule.insert(3, span(300, 360), "a").unwrap();
        schedule.replace(&early, 3, span(600, 660)).unwrap();

        let starts: Vec<_> = schedule.bookings(3).iter().map(|b| b.span().start()).collect();
        assert_eq!(starts, vec![300, 600]);
    }

    #[test]
    fn replace_unknown_id() {
        let mut schedule = Schedule::new();
        assert!(matches!(
            schedule.replace("missing", 0, span(0, 60)),
            Err(BookingError::BookingNotFound(_))
        ));
    }

    #[test]
    fn availability_of_empty_day() {
        let schedule = Schedule::new();
        assert_eq!(schedule.availability(0), vec![TimeSpan::full_day()]);
    }

    #[test]
    fn availability_gaps() {
        let mut schedule = Schedule::new();
        schedule.insert(0, span(540, 600), "a").unwrap();
        assert_eq!(
            schedule.availability(0),
            vec![span(0, 540), span(600, 1440)]
        );
    }

    #[test]
    fn availability_skips_empty_gaps() {
        let mut schedule = Schedule::new();
        schedule.insert(4, span(0, 60), "a").unwrap();
        schedule.insert(4, span(60, 120), "a").unwrap();
        schedule.insert(4, span(1380, 1440), "a").unwrap();
        assert_eq!(schedule.availability(4), vec![span(120, 1380)]);
    }

    #[tokio::test]
    async fn store_lookups() {
        let store = ScheduleStore::new();
        let facility = store.find_facility("LT1").unwrap();
        assert_eq!(facility.kind(), FacilityKind::LectureTheatre);
        assert!(matches!(
            store.find_facility("LT9"),
            Err(BookingError::FacilityNotFound(_))
        ));
        assert_eq!(store.facilities().count(), CATALOGUE.len());

        store.register("id-1", "TC1").await;
        assert_eq!(store.locate("id-1").await.unwrap().name(), "TC1");
        assert!(matches!(
            store.locate("id-2").await,
            Err(BookingError::BookingNotFound(_))
        ));
    }
}
