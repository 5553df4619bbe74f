pub mod booking;
pub mod facility;
pub mod health;
