// Operations
mod operations;
pub use operations::*;

mod results;
pub use results::*;

// Models
mod credentials;
pub use credentials::*;

mod members;
pub use members::*;

mod fees;
pub use fees::*;

mod logs;
pub use logs::*;
