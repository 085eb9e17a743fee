pub mod admin;
pub mod barbers;
pub mod bookings;
pub mod health;
pub mod services;
pub mod webhook;
