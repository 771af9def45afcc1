pub mod action;
pub mod cursor;
pub mod domain;
pub mod error;
pub mod value;
