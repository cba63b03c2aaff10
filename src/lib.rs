pub mod cache;
pub mod clean;
pub mod columns;
pub mod config;
pub mod process;
pub mod quality;
pub mod selection;
pub mod session;
pub mod table;

#[cfg(test)]
mod testutil;
