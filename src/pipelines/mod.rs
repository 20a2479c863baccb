pub mod similarity;
pub mod stats;
pub mod utils;
