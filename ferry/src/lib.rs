pub mod cli;
pub mod controller;
