pub mod availability;
pub mod booking;
pub mod entitlement;
pub mod locks;
