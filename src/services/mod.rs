pub mod page_adapter;
pub mod rubric_service;

pub use page_adapter::PageAdapter;
pub use rubric_service::RubricService;
