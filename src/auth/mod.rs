pub mod extractor;
pub mod jwt;
pub mod password;
pub mod role;
pub mod tokens;
