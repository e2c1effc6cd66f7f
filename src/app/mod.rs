pub mod session;
pub mod shell;
pub mod view;

pub use session::{FileSelection, ReviewSession};
pub use shell::Interaction;
