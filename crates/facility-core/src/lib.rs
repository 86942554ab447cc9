//! Core types: day/time slots, facility catalogue, tracing

pub mod catalogue;
pub mod time;
pub mod tracing;

pub use catalogue::{CATALOGUE, CatalogueEntry, FacilityKind};
pub use time::{
    DAYS_PER_WEEK, DayTime, MINUTES_PER_DAY, TimeError, TimeSpan, validate_day, weekday,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
