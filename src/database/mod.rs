mod access_repo;
mod chatbot_repo;
mod chunk_repo;
mod document_repo;
mod entity_repo;
mod kb_repo;
mod pool;

pub use access_repo::AccessRepo;
pub use chatbot_repo::ChatbotRepo;
pub use chunk_repo::{ChunkSearchHit, ChunkRepo};
pub use document_repo::DocumentRepo;
pub use entity_repo::EntityRepo;
pub use kb_repo::KbRepo;
pub use pool::DbPool;
