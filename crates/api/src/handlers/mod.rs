pub mod audit;
pub mod duplicates;
pub mod reviews;
