//! Tasks and captures persisted by the server

mod record;
mod stores;
mod task_file;

pub use record::{CaptureRecord, CaptureStatus, TaskRecord, local_date_today};
pub use stores::{InboxStore, TaskOrigin, TaskStore};
pub use task_file::TaskFile;
