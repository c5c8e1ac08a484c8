pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorKind, ErrorList, WoolError};
pub use types::*;
pub use value::*;
