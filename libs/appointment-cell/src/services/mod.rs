pub mod appointments;
pub mod booking;
pub mod cache;
pub mod classifier;
pub mod lifecycle;
pub mod slots;

pub use appointments::{decode_appointments, AppointmentQueryService};
pub use booking::AppointmentBookingService;
pub use cache::AppointmentCache;
pub use classifier::{classify_appointments, filter_by_hospital, is_upcoming};
pub use lifecycle::AppointmentLifecycleService;
pub use slots::{decode_slots, filter_slots, SlotService};
