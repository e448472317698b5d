pub mod results;

pub use results::{persist, ResultSink};
