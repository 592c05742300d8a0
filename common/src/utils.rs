pub mod ip;
pub mod resolver;
