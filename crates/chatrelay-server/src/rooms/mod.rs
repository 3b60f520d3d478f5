pub mod directory;
pub mod history;

pub use directory::*;
pub use history::*;
