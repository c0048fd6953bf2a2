pub mod id;
pub mod logging;

pub use id::new_id;
