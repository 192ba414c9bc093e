//! Listing watch core: topics, record naming and the observation set state machine.
mod message;
mod observation;
mod topic;

pub use message::{failure_message, new_items_message, start_message, NO_NEW_ITEMS, ITEM_SEPARATOR};
pub use observation::{ObservationSet, ReconcileOutcome};
pub use topic::{record_file_name, Topic, TopicError};
