pub mod issue;
pub mod search;
pub mod status;
pub mod worklog;

pub use issue::*;
pub use search::*;
pub use status::*;
pub use worklog::*;
