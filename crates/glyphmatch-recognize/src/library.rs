//! The character template library.
//!
//! Every variant is a `width`×`height` normalized grid plus the features the
//! matcher pre-filters on. The library is built once (from JSON or from
//! source glyphs) and then shared read-only behind an `Arc`.

use std::collections::HashSet;
use std::path::Path;

use glyphmatch_core::{OcrError, PixelGrid, Result};
use serde::{Deserialize, Serialize};

/// One normalized rendering of a character.
#[derive(Debug, Clone)]
pub struct TemplateVariant {
    pub font: String,
    pub grid: PixelGrid,
    pub enclosures: usize,
    pub line_left: bool,
    pub line_right: bool,
    pub is_punctuation: bool,
}

impl TemplateVariant {
    /// Normalize a source glyph and compute its flags.
    ///
    /// Flags come from the source glyph, which should be drawn in its full
    /// line-height cell so punctuation keeps its vertical position.
    pub fn from_glyph(font: &str, glyph: &PixelGrid, width: usize, height: usize) -> Self {
        Self {
            font: font.to_string(),
            grid: glyph.create_normalize_matrix(width, height),
            enclosures: glyph.enclosures(),
            line_left: glyph.vertical_line_left(),
            line_right: glyph.vertical_line_right(),
            is_punctuation: glyph.is_punctuation(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CharacterTemplate {
    pub character: char,
    pub variants: Vec<TemplateVariant>,
}

/// Read-only set of character templates sharing one canvas size.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    width: usize,
    height: usize,
    characters: Vec<CharacterTemplate>,
}

impl TemplateLibrary {
    /// Validate and wrap a set of templates.
    ///
    /// Fails unless the canvas is non-empty, there is at least one
    /// character, every character has at least one variant, no character
    /// repeats and every variant grid is exactly `width`×`height`.
    pub fn new(width: usize, height: usize, characters: Vec<CharacterTemplate>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(OcrError::MalformedTemplateLibrary(format!(
                "template size {width}x{height} is empty"
            )));
        }
        if characters.is_empty() {
            return Err(OcrError::MalformedTemplateLibrary(
                "library has no characters".into(),
            ));
        }

        let mut seen = HashSet::new();
        for template in &characters {
            if !seen.insert(template.character) {
                return Err(OcrError::MalformedTemplateLibrary(format!(
                    "character {:?} appears more than once",
                    template.character
                )));
            }
            if template.variants.is_empty() {
                return Err(OcrError::MalformedTemplateLibrary(format!(
                    "character {:?} has no variants",
                    template.character
                )));
            }
            for (i, v) in template.variants.iter().enumerate() {
                if v.grid.cols() != width || v.grid.rows() != height {
                    return Err(OcrError::MalformedTemplateLibrary(format!(
                        "variant {i} of {:?} is {}x{}, expected {width}x{height}",
                        template.character,
                        v.grid.cols(),
                        v.grid.rows()
                    )));
                }
            }
        }

        Ok(Self {
            width,
            height,
            characters,
        })
    }

    /// Build a library from source glyphs `(character, font, glyph)`.
    /// Glyphs of the same character become variants in input order.
    pub fn from_glyphs<I, S>(width: usize, height: usize, glyphs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (char, S, PixelGrid)>,
        S: AsRef<str>,
    {
        let mut characters: Vec<CharacterTemplate> = Vec::new();
        for (character, font, glyph) in glyphs {
            let variant = TemplateVariant::from_glyph(font.as_ref(), &glyph, width, height);
            match characters.iter_mut().find(|t| t.character == character) {
                Some(t) => t.variants.push(variant),
                None => characters.push(CharacterTemplate {
                    character,
                    variants: vec![variant],
                }),
            }
        }
        Self::new(width, height, characters)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: LibraryFile = serde_json::from_str(json)
            .map_err(|e| OcrError::MalformedTemplateLibrary(e.to_string()))?;
        file.into_library()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let library = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            characters = library.len(),
            variants = library.variant_count(),
            "loaded template library"
        );
        Ok(library)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&LibraryFile::from(self))
            .map_err(|e| OcrError::MalformedTemplateLibrary(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Keep only characters in `supported`. An empty string keeps all.
    /// The result may be empty.
    pub fn restrict(&self, supported: &str) -> TemplateLibrary {
        if supported.is_empty() {
            return self.clone();
        }
        TemplateLibrary {
            width: self.width,
            height: self.height,
            characters: self
                .characters
                .iter()
                .filter(|t| supported.contains(t.character))
                .cloned()
                .collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn characters(&self) -> &[CharacterTemplate] {
        &self.characters
    }

    pub fn get(&self, character: char) -> Option<&CharacterTemplate> {
        self.characters.iter().find(|t| t.character == character)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn variant_count(&self) -> usize {
        self.characters.iter().map(|t| t.variants.len()).sum()
    }
}

// --- On-disk format ---

#[derive(Debug, Serialize, Deserialize)]
struct LibraryFile {
    width: usize,
    height: usize,
    characters: Vec<CharacterEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CharacterEntry {
    character: String,
    variants: Vec<VariantEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantEntry {
    #[serde(default)]
    font: String,
    enclosures: usize,
    line_left: bool,
    line_right: bool,
    is_punctuation: bool,
    /// Rows of `#` (ink) and `.` (background).
    cells: Vec<String>,
}

impl LibraryFile {
    fn into_library(self) -> Result<TemplateLibrary> {
        let mut characters = Vec::with_capacity(self.characters.len());
        for entry in self.characters {
            let mut chars = entry.character.chars();
            let character = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(OcrError::MalformedTemplateLibrary(format!(
                        "character label {:?} must be exactly one character",
                        entry.character
                    )))
                }
            };
            let variants = entry
                .variants
                .into_iter()
                .map(|v| v.into_variant(self.width))
                .collect::<Result<Vec<_>>>()?;
            characters.push(CharacterTemplate {
                character,
                variants,
            });
        }
        TemplateLibrary::new(self.width, self.height, characters)
    }
}

impl VariantEntry {
    fn into_variant(self, width: usize) -> Result<TemplateVariant> {
        let mut cells = Vec::with_capacity(width * self.cells.len());
        for row in &self.cells {
            if row.chars().count() != width {
                return Err(OcrError::MalformedTemplateLibrary(format!(
                    "template row {row:?} is not {width} cells wide"
                )));
            }
            cells.extend(row.chars().map(|c| c == '#'));
        }
        Ok(TemplateVariant {
            font: self.font,
            grid: PixelGrid::from_cells(width, cells),
            enclosures: self.enclosures,
            line_left: self.line_left,
            line_right: self.line_right,
            is_punctuation: self.is_punctuation,
        })
    }
}

impl From<&TemplateLibrary> for LibraryFile {
    fn from(library: &TemplateLibrary) -> Self {
        LibraryFile {
            width: library.width,
            height: library.height,
            characters: library
                .characters
                .iter()
                .map(|t| CharacterEntry {
                    character: t.character.to_string(),
                    variants: t
                        .variants
                        .iter()
                        .map(|v| VariantEntry {
                            font: v.font.clone(),
                            enclosures: v.enclosures,
                            line_left: v.line_left,
                            line_right: v.line_right,
                            is_punctuation: v.is_punctuation,
                            cells: v.grid.to_ascii().lines().map(str::to_string).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
