pub mod bioproject;
pub mod biosample;
pub mod pubmed;
pub mod sra;
