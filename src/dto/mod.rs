pub mod addresses;
pub mod auth;
pub mod brands;
pub mod cart;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
pub mod variants;
