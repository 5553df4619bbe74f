pub mod auth;
pub mod booking;
pub mod facility;
pub mod id;
pub mod policy;
pub mod role;
