pub mod scroll_documents;
pub mod select_indices;
pub mod status;
