pub mod episode;
pub mod analysis;

pub use episode::*;
pub use analysis::*;
