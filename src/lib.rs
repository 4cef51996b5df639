pub mod catalog;
pub mod classify;
pub mod config;
pub mod duration;
pub mod model;
pub mod notify;
pub mod paginator;
pub mod retry;
pub mod run;
pub mod runlog;
pub mod scanner;
pub mod window;
pub mod writer;
pub mod youtube;
