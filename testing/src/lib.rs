//! # Mentorship Testing
//!
//! Testing utilities for the mentorship booking crates.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Recording and failing mailers
//! - A recording payment gateway
//! - Fixture builders and proptest strategies for domain types
//!
//! ## Example
//!
//! ```ignore
//! use mentorship_testing::{fixtures, ManualClock, RecordingMailer};
//!
//! #[tokio::test]
//! async fn free_session_confirms_immediately() {
//!     let clock = ManualClock::at(fixtures::monday(8, 0));
//!     let mailer = RecordingMailer::new();
//!     let orchestrator = build_orchestrator(clock.shared(), mailer.shared());
//!
//!     let window = fixtures::range((10, 0), (11, 0));
//!     let booked = orchestrator
//!         .book(fixtures::coffee_chat(window), &fixtures::MENTEE.into())
//!         .await?;
//!     assert_eq!(booked.status, AppointmentStatus::Confirmed);
//! }
//! ```

pub mod fixtures;
pub mod mailers;
pub mod payments;

use std::sync::Once;

/// Mock implementations of Environment traits
pub mod mocks {
    use chrono::{DateTime, Duration, Utc};
    use mentorship_core::environment::Clock;
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use mentorship_testing::mocks::FixedClock;
    /// use mentorship_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the code under test.
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use mentorship_core::environment::Clock;
    /// use mentorship_testing::ManualClock;
    ///
    /// let start = Utc::now();
    /// let clock = ManualClock::at(start);
    /// clock.advance(Duration::minutes(16));
    /// assert_eq!(clock.now(), start + Duration::minutes(16));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start the clock at `time`.
        #[must_use]
        pub fn at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.write() {
                *time += by;
            }
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            if let Ok(mut time) = self.time.write() {
                *time = to;
            }
        }

        /// Share as a trait object.
        #[must_use]
        pub fn shared(&self) -> Arc<dyn Clock> {
            Arc::new(self.clone())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time.read().map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use crate::fixtures::monday;
    use chrono::Duration;
    use mentorship_core::time_range::TimeRange;
    use proptest::prelude::*;

    /// Ranges on the fixture Monday, starting on a 15 minute grid within
    /// the working day and lasting 15 minutes to 2 hours.
    pub fn arb_time_range() -> impl Strategy<Value = TimeRange> {
        (0i64..36, 1i64..=8).prop_filter_map("valid range", |(slot, len)| {
            let start = monday(8, 0) + Duration::minutes(slot * 15);
            TimeRange::new(start, start + Duration::minutes(len * 15)).ok()
        })
    }
}

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// Re-export commonly used items
pub use mailers::{FailingMailer, RecordingMailer};
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use payments::RecordingPaymentGateway;
