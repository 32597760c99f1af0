mod client;
mod eval;
mod repository;
mod rule;
mod segment;
mod serve;
mod store;
mod test_common;
mod toggle;
mod toggle_value;
mod user;
mod util;

pub use client::*;
pub use eval::*;
pub use repository::*;
pub use rule::*;
pub use segment::*;
pub use serve::*;
pub use store::*;
pub use toggle::*;
pub use toggle_value::*;
pub use user::*;
