pub mod co2;
pub mod codes;
pub mod config;
pub mod describe;
pub mod error;
pub mod expand;
pub mod models;
pub mod output;
pub mod parser;
pub mod records;
pub mod report;
