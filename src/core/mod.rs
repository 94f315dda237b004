pub mod ident;
pub mod masks;
