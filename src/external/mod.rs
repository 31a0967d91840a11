pub mod extractor;

pub use extractor::{DocumentExtractor, ExtractedDocument, ExtractedProduct, HttpExtractor};
