pub mod inspect;
pub mod surface;
