pub mod document_filter;
pub mod filter_parser;
pub mod pipeline;
pub mod populate;
pub mod population;
pub mod query_spec;
pub mod rating;

pub use document_filter::*;
pub use filter_parser::*;
pub use pipeline::*;
pub use populate::*;
pub use population::*;
pub use query_spec::*;
