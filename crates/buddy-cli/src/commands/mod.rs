use anyhow::Result;
use inquire::Confirm;

pub mod fees;
pub mod members;

pub use fees::Fees;
pub use members::Members;

/// Ask before changing the database, unless the
/// user already said yes on the command line.
pub(crate) fn confirm(message: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    let confirm = Confirm::new(message).with_default(true);
    Ok(confirm.prompt()?)
}
