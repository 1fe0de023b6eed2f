pub mod dsl;
pub mod settings;
