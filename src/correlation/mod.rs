//! Deploy and incident history, and the correlation context attached to new
//! incidents.

pub mod context;
pub mod history;

pub use context::{IncidentContext, IncidentContextBuilder};
pub use history::{HistoryStore, InMemoryHistory};
