pub mod error;
pub mod fill;
pub mod order;
pub mod reading;
pub mod req;
pub mod seq;
pub mod window;

pub use error::ValidationError;
