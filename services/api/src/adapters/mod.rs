pub mod completion_llm;
pub mod db;

pub use completion_llm::OpenAiChatAdapter;
pub use db::DbAdapter;
