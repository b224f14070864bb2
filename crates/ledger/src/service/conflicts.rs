use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use model::{
    business::Business,
    day::DayWindow,
    errors::LedgerError,
    interval::{Interval, TimeOfDay},
    reservation::Reservation,
};
use storage::reservation::ReservationStore;

#[derive(Clone)]
pub struct Conflicts {
    store: Arc<dyn ReservationStore>,
}

impl Conflicts {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Conflicts { store }
    }

    /// Time taken by blocking reservations on the business's local `date`.
    pub async fn blocked_intervals_for(
        &self,
        business: &Business,
        date: NaiveDate,
    ) -> Result<Vec<Interval>, LedgerError> {
        let window = DayWindow::new(business.timezone, date);
        // Yesterday's late bookings can run into the morning.
        let reservations = self
            .store
            .find_blocking(business.id, window.prev().from, window.to)
            .await?;
        let blocked: Vec<_> = reservations
            .iter()
            .filter_map(|r| blocked_interval(&window, r))
            .collect();
        debug!(
            "{} blocked intervals for {} on {}: {:?}",
            blocked.len(),
            business.id,
            date,
            blocked
        );
        Ok(blocked)
    }
}

/// Part of `reservation` inside `window` as local wall-clock time, widened to
/// whole minutes. The end is clipped to 23:59 when the reservation runs past
/// midnight.
pub fn blocked_interval(window: &DayWindow, reservation: &Reservation) -> Option<Interval> {
    if !reservation.is_blocking() {
        return None;
    }
    let start_at = reservation.start_at;
    let end_at = reservation.end_at();
    if end_at <= window.from || start_at >= window.to {
        return None;
    }
    let start = window.time_of_day(start_at);
    let end = if end_at >= window.to {
        TimeOfDay::LAST_MINUTE
    } else {
        window.time_of_day_ceil(end_at)
    };
    Interval::new(start, end).ok()
}
