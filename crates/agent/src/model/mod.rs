pub mod document;
pub mod package;
pub mod registration;
pub mod service;
pub mod urls;
