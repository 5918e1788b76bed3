pub mod entity;
pub mod system;
