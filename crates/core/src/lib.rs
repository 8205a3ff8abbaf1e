pub mod audit;
pub mod candidates;
pub mod config;
pub mod conflicts;
pub mod duplicate_set;
pub mod entity;
pub mod error;
pub mod fields;
pub mod merge;
pub mod normalize;
pub mod rating;
pub mod record;
pub mod roles;
pub mod scan;
pub mod similarity;
pub mod types;
pub mod validator;
