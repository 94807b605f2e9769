//! State projections
//!
//! Each projection subscribes to the router at construction, owns one slice
//! of derived state exclusively, and ignores envelope types it does not
//! recognize. Unknown types never fail a projection. Registrations are
//! dropped with the projection itself.

mod chat;
mod current_file;
mod status;
mod workspace;

pub use chat::ChatTranscript;
pub use current_file::CurrentFileProjection;
pub use status::StatusProjection;
pub use workspace::{ActiveFilesProjection, FileTreeProjection};
