pub mod ai_service;
pub mod cache_service;
pub mod fallback_service;
pub mod grading_service;
pub mod parser_service;
pub mod quiz_service;
pub mod submission_service;
