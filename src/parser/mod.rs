pub mod extract;
pub mod grid_parser;

pub use grid_parser::parse_product_grid;
