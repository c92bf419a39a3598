pub mod checkin_stats;
pub mod validate;
pub mod verification;
