mod wire;

pub mod companies;
pub mod display;
pub mod filters;
pub mod properties;
pub mod settings;
pub mod users;
pub mod visibility;
