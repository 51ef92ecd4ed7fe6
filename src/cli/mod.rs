pub mod client;
pub mod console;
pub mod report_command;
pub mod repository;
pub mod tag_command;
pub mod timer_command;
