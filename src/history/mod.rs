//! Root history of every entity

mod root_ledger;

pub use root_ledger::{CommitOutcome, RootLedger};
