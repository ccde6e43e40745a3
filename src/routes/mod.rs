pub mod download;
pub mod pages;
pub mod upload;
