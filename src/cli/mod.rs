pub mod command;
pub mod correct;
pub mod info;
pub mod progress;
