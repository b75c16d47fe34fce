pub mod catalog;
pub mod profile;
pub mod schema;
pub mod table;
pub mod work_item;

pub use catalog::{find_model, ModelSpec, Provider};
pub use profile::{BrowserSettings, Profile};
pub use schema::{FieldKind, OutputField, OutputSchema};
pub use table::Table;
pub use work_item::{value_to_text, ItemRecord, ResultSet, TaskOutcome, WorkItem};
