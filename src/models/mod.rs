//! Data models for Liberis

pub mod event;
pub mod fine;
pub mod hold;
pub mod item;
pub mod loan;
pub mod renewal;
pub mod user;

// Re-export commonly used types
pub use fine::{Fine, FineReason, FineStatus};
pub use hold::{HoldQueue, HoldRequest, HoldStatus, QueueMember};
pub use item::{CopyStatus, Item};
pub use loan::{Loan, LoanStatus};
pub use renewal::{RenewalRequest, RenewalStatus};
pub use user::User;
