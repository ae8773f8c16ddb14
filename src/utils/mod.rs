pub mod topic;
pub mod validation;
