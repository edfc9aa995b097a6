pub mod actor;
pub mod booking;
pub mod court;
pub mod sport;
pub mod window;

pub use actor::{Actor, Role};
pub use booking::{Booking, BookingStatus, PaymentMode, PaymentStatus, SessionPhase};
pub use court::{Court, CourtStatus};
pub use sport::Sport;
pub use window::{TimeOfDay, TimeWindow};
