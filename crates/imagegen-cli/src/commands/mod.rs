pub mod config;
pub mod doctor;
pub mod download;
pub mod gallery;
pub mod generate;
pub mod models;
pub mod studio;
