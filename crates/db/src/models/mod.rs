pub mod job;
pub mod ledger;
pub mod settings;
pub mod status;
