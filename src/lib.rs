pub mod config;
pub mod days;
pub mod fetch;
pub mod operator;
pub mod output;
pub mod raw;
pub mod reshape;
pub mod stats;
pub mod timetable;
