pub mod cat;
pub mod convert;
pub mod inspect;
pub mod rekey;
