pub mod session;

pub use session::EnhancementSession;
