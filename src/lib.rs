pub mod emit;
pub mod enumerate;
pub mod field;
pub mod layout;
pub mod mutate;
pub mod signature;
pub mod source_location;
pub mod variant;
