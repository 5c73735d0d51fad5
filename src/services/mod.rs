pub mod content;
pub mod feed;
pub mod init;
pub mod poller;
pub mod schedule;
