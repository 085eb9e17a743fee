pub mod booking;
pub mod notifications;
pub mod payments;
pub mod slots;
