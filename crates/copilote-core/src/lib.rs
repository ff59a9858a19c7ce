pub mod budget;
pub mod categories;
pub mod classifier;
pub mod config;
pub mod db;
pub mod llm;
pub mod migrations;
pub mod rules;
pub mod telemetry;
pub mod transactions;

pub use budget::{BudgetProposal, BudgetTransaction, Envelope, propose_budget};
pub use classifier::{ClassifyError, TransactionClassifier};
pub use config::Config;
pub use db::Database;
pub use telemetry::init_logging;
pub use transactions::{ClassificationMethod, ClassifiedTransaction, Transaction};
