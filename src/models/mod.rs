pub mod barber;
pub mod reservation;
pub mod service;
pub mod slot;
pub mod working_hours;

pub use barber::Barber;
pub use reservation::{PaymentStatus, Reservation, ReservationStatus};
pub use service::Service;
pub use slot::Slot;
pub use working_hours::WorkingHours;
