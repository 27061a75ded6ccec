pub mod parsing;
pub mod roster;
pub mod source;
