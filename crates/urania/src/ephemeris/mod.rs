pub mod adapter;
pub mod oracle;
pub mod types;

pub use adapter::SwissEphemerisOracle;
pub use oracle::{OracleError, PositionOracle};
pub use types::{Body, UnknownBody};
