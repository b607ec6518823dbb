mod error;
pub mod llm;
pub mod progress;
pub mod reddit;
pub mod vectors;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
