pub mod attachment;
pub mod form;
pub mod payload;
pub mod signature;
