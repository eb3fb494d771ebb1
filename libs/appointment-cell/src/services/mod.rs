pub mod booking;
pub mod ledger;
pub mod lifecycle;
pub mod video;
