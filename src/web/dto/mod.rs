pub mod answer;
pub mod progress;
pub mod question;
pub mod section;
pub mod user;
