mod job_repo;
mod ledger_repo;
mod settings_repo;

pub use job_repo::JobRepo;
pub use ledger_repo::LedgerRepo;
pub use settings_repo::SettingsRepo;
