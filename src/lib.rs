pub mod app;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod eutils;
pub mod geo;
pub mod hca;
pub mod output;
pub mod providers;
pub mod runinfo;
pub mod workbook;
pub mod xml;
