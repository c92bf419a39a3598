pub mod checkins;
pub mod daily_records;
pub mod health;
pub mod settings;
pub mod user;
