pub mod assemble;
pub mod charset;
pub mod correct;
pub mod dictionary;
pub mod disambiguate;
pub mod library;
pub mod matcher;

pub use assemble::{AssemblerConfig, AssemblyStats, TextAssembler};
pub use correct::Corrector;
pub use dictionary::Dictionary;
pub use library::{CharacterTemplate, TemplateLibrary, TemplateVariant};
pub use matcher::{GlyphFeatures, TemplateMatcher};
