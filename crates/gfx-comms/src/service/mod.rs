//! Application service: the GFX processing unit.

pub mod request_processor;

pub use request_processor::RequestProcessor;
