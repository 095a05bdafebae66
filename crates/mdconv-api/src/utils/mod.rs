pub mod upload;

pub use upload::{extract_convert_form, ConvertForm};
