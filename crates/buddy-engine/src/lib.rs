pub mod error;
pub use error::{Error, Result};

mod validation;

pub mod registry;
pub use registry::{MemberStore, Registry};

pub mod ledger;
pub use ledger::{due_after, Debtor, Ledger, LedgerStore, Statement};
