pub mod activity;
pub mod history;
pub mod owner;
pub mod sample;

pub use activity::ActivityKind;
pub use history::{EntryId, HistoryEntry, HistoryEntryDraft};
pub use owner::OwnerId;
pub use sample::Sample;
