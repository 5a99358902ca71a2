pub mod booking;
pub mod holiday;
pub mod plan;
pub mod settings;
pub mod subscription;
pub mod time;
pub mod user;

pub use booking::{Booking, BookingStatus, MAX_BOOKING_MINUTES, MIN_BOOKING_MINUTES};
pub use holiday::Holiday;
pub use plan::{Plan, PlanName, UNLIMITED_DAILY_MINUTES};
pub use settings::{GymSettings, SettingsUpdate};
pub use subscription::{Subscription, SubscriptionStatus};
pub use user::{Role, User};
