pub mod connection;
pub use connection::{Connection, TestHandle};

pub mod results;
pub mod schema;

pub mod fees;
pub mod logs;
pub mod members;
