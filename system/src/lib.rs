pub extern crate serde;
pub extern crate serde_json;

mod connection_table;
mod dispatcher;
mod error;
mod message;
mod session_registry;
mod traits;
mod types;

pub use connection_table::*;
pub use dispatcher::*;
pub use error::*;
pub use message::*;
pub use session_registry::*;
pub use traits::*;
pub use types::*;
