//! End-to-end: render text with a small bitmap font, build a template
//! library from the same font and read the text back.

use std::sync::Arc;

use glyphmatch_core::{Lexicon, PixelGrid, RawImage};
use glyphmatch_pipeline::{OcrPipeline, PageScheduler, PipelineConfig};
use glyphmatch_recognize::{Dictionary, TemplateLibrary};

/// Every glyph cell is 9 rows: ascenders from row 0, x-height rows 2..=6,
/// descenders down to row 8. Cells are exactly as wide as their ink.
const FONT: &[(char, &str)] = &[
    ('t', ".#.. .#.. #### .#.. .#.. .#.. ..## .... ...."),
    ('h', "#.... #.... #.##. ##..# #...# #...# #...# ..... ....."),
    ('e', "..... ..... .###. #...# ##### #.... .#### ..... ....."),
    ('q', "..... ..... .#### #...# #...# .#### ....# ....# ....#"),
    ('u', "..... ..... #...# #...# #...# #..## .##.# ..... ....."),
    ('i', "# . # # # # # . ."),
    ('c', "..... ..... .#### #.... #.... #.... .#### ..... ....."),
    ('k', "#... #... #..# #.#. ##.. #.#. #..# .... ...."),
    ('b', "#.... #.... ####. #...# #...# #...# ####. ..... ....."),
    ('r', ".... .... #.## ##.. #... #... #... .... ...."),
    ('o', "..... ..... .###. #...# #...# #...# .###. ..... ....."),
    ('w', "..... ..... #...# #...# #.#.# #.#.# .#.#. ..... ....."),
    ('n', "..... ..... #.##. ##..# #...# #...# #...# ..... ....."),
    ('f', "..## .#.. #### .#.. .#.. .#.. .#.. .... ...."),
    ('x', "..... ..... #...# .#.#. ..#.. .#.#. #...# ..... ....."),
];

const MARGIN: usize = 10;
const KERNING: usize = 1;
const WORD_GAP: usize = 6;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("glyphmatch=debug")
        .with_test_writer()
        .try_init();
}

fn glyph(c: char) -> PixelGrid {
    let (_, art) = FONT
        .iter()
        .find(|(k, _)| *k == c)
        .unwrap_or_else(|| panic!("no glyph for {c:?}"));
    PixelGrid::from_ascii(&art.split(' ').collect::<Vec<_>>().join("\n"))
}

fn library() -> Arc<TemplateLibrary> {
    let glyphs = FONT.iter().map(|&(c, _)| (c, "bitmap", glyph(c)));
    Arc::new(TemplateLibrary::from_glyphs(16, 20, glyphs).unwrap())
}

/// Render lines of text as a grayscale page, black on white.
fn render(lines: &[&str]) -> RawImage {
    let width_of = |line: &str| -> usize {
        line.split(' ')
            .map(|word| {
                word.chars().map(|c| glyph(c).cols()).sum::<usize>()
                    + KERNING * word.chars().count().saturating_sub(1)
            })
            .sum::<usize>()
            + WORD_GAP * line.split(' ').count().saturating_sub(1)
    };
    let line_height = 9 + 8;
    let width = lines.iter().map(|l| width_of(l)).max().unwrap_or(0) + 2 * MARGIN;
    let height = lines.len() * line_height - 8 + 2 * MARGIN;
    let mut data = vec![255u8; width * height];

    for (row, line) in lines.iter().enumerate() {
        let top = MARGIN + row * line_height;
        let mut x = MARGIN;
        for (w, word) in line.split(' ').enumerate() {
            if w > 0 {
                x += WORD_GAP - KERNING;
            }
            for c in word.chars() {
                let g = glyph(c);
                for gy in 0..g.rows() {
                    for gx in 0..g.cols() {
                        if g.get(gx, gy) {
                            data[(top + gy) * width + x + gx] = 0;
                        }
                    }
                }
                x += g.cols() + KERNING;
            }
        }
    }

    RawImage {
        data,
        width: width as u32,
        height: height as u32,
        channels: 1,
    }
}

#[test]
fn font_glyphs_are_distinct() {
    let lib = library();
    assert_eq!(lib.len(), FONT.len());
    for (i, a) in lib.characters().iter().enumerate() {
        for b in &lib.characters()[i + 1..] {
            assert!(
                a.variants[0].grid.similarity(&b.variants[0].grid) < 1.0,
                "{} and {} normalize identically",
                a.character,
                b.character
            );
        }
    }
}

#[test]
fn reads_the_quick_brown_fox() {
    init_logging();
    let pipeline = OcrPipeline::new(library(), None, PipelineConfig::default()).unwrap();
    let page = render(&["the quick brown fox"]);
    let text = pipeline.recognize_image(&page).unwrap();
    assert_eq!(text.to_lowercase(), "the quick brown fox");
}

#[test]
fn detailed_result_has_one_confident_line() {
    let pipeline = OcrPipeline::new(library(), None, PipelineConfig::default()).unwrap();
    let (page, timing) = pipeline
        .recognize_detailed(&render(&["the quick brown fox"]))
        .unwrap();
    assert_eq!(page.lines.len(), 1);
    assert_eq!(page.lines[0].text, "the quick brown fox");
    assert!(page.confidence > 0.99);
    assert_eq!(page.lines[0].bbox.x, MARGIN);
    assert_eq!(page.lines[0].bbox.y, MARGIN);
    assert!(timing.total_ms >= timing.recognize_ms);
}

#[test]
fn reads_multiple_lines_in_order() {
    init_logging();
    let pipeline = OcrPipeline::new(library(), None, PipelineConfig::default()).unwrap();
    let text = pipeline
        .recognize_image(&render(&["the brown fox", "quick"]))
        .unwrap();
    assert_eq!(text.to_lowercase(), "the brown fox\nquick");
}

#[test]
fn dictionary_keeps_known_words() {
    let words: Arc<dyn Lexicon> = Arc::new(Dictionary::from_words([
        "the", "quick", "brown", "fox",
    ]));
    let pipeline =
        OcrPipeline::new(library(), Some(words), PipelineConfig::default()).unwrap();
    let text = pipeline
        .recognize_image(&render(&["the quick brown fox"]))
        .unwrap();
    assert_eq!(text, "The quick brown fox");
}

#[test]
fn parallel_scoring_and_batches_agree() {
    let config = PipelineConfig {
        parallel_scoring: true,
        ..Default::default()
    };
    let pipeline = OcrPipeline::new(library(), None, config).unwrap();
    let pages = vec![
        render(&["the quick brown fox"]),
        render(&["brown"]),
        render(&["fox"]),
    ];
    let results = PageScheduler::new(2).unwrap().process_batch(&pipeline, &pages);
    let texts: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().text.to_lowercase())
        .collect();
    assert_eq!(texts, ["the quick brown fox", "brown", "fox"]);
}
