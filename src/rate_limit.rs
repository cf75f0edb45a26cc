use std::sync::{Mutex, PoisonError};
use chrono::{Local, NaiveDate};
use crate::error::{AppError, Result};

/// Bounds gated calls per calendar day in the server's local timezone.
///
/// The quota lives in process memory only: a restart resets it and separate
/// instances each keep their own count.
#[derive(Debug)]
pub struct DailyLimiter {
    limit: u32,
    clock: fn() -> NaiveDate,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    day: NaiveDate,
    count: u32,
}

impl DailyLimiter {
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, today)
    }

    /// Reads the current day from `clock` instead of the system time.
    pub fn with_clock(limit: u32, clock: fn() -> NaiveDate) -> Self {
        Self {
            limit,
            clock,
            state: Mutex::new(LimiterState { day: clock(), count: 0 }),
        }
    }

    pub fn starting_on(limit: u32, day: NaiveDate) -> Self {
        Self {
            limit,
            clock: today,
            state: Mutex::new(LimiterState { day, count: 0 }),
        }
    }

    pub fn try_acquire(&self) -> Result<()> {
        self.try_acquire_on((self.clock)())
    }

    /// Consumes one unit of quota for `day`, resetting the counter first when
    /// the day has changed since the last call.
    pub fn try_acquire_on(&self, day: NaiveDate) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.day != day {
            tracing::info!(previous = %state.day, current = %day, "daily summary quota reset");
            state.day = day;
            state.count = 0;
        }

        if state.count >= self.limit {
            return Err(AppError::RateLimitExceeded(self.limit));
        }

        state.count += 1;
        Ok(())
    }

    /// Remaining quota as of the last recorded day.
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.limit.saturating_sub(state.count)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[test]
    fn eleventh_call_on_same_day_is_rejected() {
        let limiter = DailyLimiter::starting_on(10, day(3));
        for _ in 0..10 {
            limiter.try_acquire_on(day(3)).unwrap();
        }
        assert!(matches!(limiter.try_acquire_on(day(3)), Err(AppError::RateLimitExceeded(10))));
        // rejected calls do not count
        assert_eq!(limiter.remaining(), 0);
        assert!(limiter.try_acquire_on(day(3)).is_err());
    }

    #[test]
    fn new_day_resets_the_counter() {
        let limiter = DailyLimiter::starting_on(10, day(3));
        for _ in 0..10 {
            limiter.try_acquire_on(day(3)).unwrap();
        }
        assert!(limiter.try_acquire_on(day(3)).is_err());

        limiter.try_acquire_on(day(4)).unwrap();
        assert_eq!(limiter.remaining(), 9);
    }

    #[test]
    fn any_date_change_resets_not_just_forward() {
        let limiter = DailyLimiter::starting_on(1, day(4));
        limiter.try_acquire_on(day(4)).unwrap();
        limiter.try_acquire_on(day(3)).unwrap();
        assert!(limiter.try_acquire_on(day(3)).is_err());
    }

    #[test]
    fn try_acquire_follows_the_clock() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static DAY: AtomicU32 = AtomicU32::new(3);
        fn clock() -> NaiveDate {
            day(DAY.load(Ordering::SeqCst))
        }

        let limiter = DailyLimiter::with_clock(1, clock);
        limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_err());

        DAY.store(4, Ordering::SeqCst);
        limiter.try_acquire().unwrap();
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = DailyLimiter::starting_on(0, day(3));
        assert!(limiter.try_acquire_on(day(3)).is_err());
    }

    #[test]
    fn concurrent_callers_never_exceed_the_quota() {
        let limiter = Arc::new(DailyLimiter::starting_on(10, day(3)));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.try_acquire_on(day(3)).is_ok())
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(granted, 10);
    }
}
