pub mod business;
pub mod day;
pub mod errors;
pub mod exception;
pub mod interval;
pub mod reservation;
pub mod schedule;
