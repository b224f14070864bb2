pub mod businesses;
pub mod conflicts;
pub mod exceptions;
pub mod reservations;
pub mod schedule;
pub mod slots;
