pub mod models;
pub mod store;

pub use models::HistoryRecord;
pub use store::HistoryStore;
