pub mod error;
pub mod limiters;
pub mod similarity;

pub use error::CoreError;
pub use limiters::Limiters;
pub use similarity::cosine_similarity;
