pub mod checkin;
pub mod daily_record;
pub mod items;
pub mod settings;
pub mod user;
