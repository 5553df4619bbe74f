pub mod booking;
pub mod facility;
