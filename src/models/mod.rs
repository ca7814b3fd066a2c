pub mod intake;
pub mod view;
pub mod wire;

pub use intake::{IntakeAction, PaymentIntakeRecord, PaymentStatus, RejectReason};
pub use wire::{FeedEvent, OperatorEvent};
