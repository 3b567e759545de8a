pub mod categories;
pub mod channels;
pub mod languages;
