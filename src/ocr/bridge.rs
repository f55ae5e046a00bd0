use anyhow::{Context, Result};
use image::DynamicImage;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::Level;
use crate::ocr::variables::{MemoryVariables, VariableStore, VariableValue};
use crate::ocr::{RawElement, RecognitionBackend, SegmentationMode};

/// One line of Tesseract's `makebox` output, in top-down coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSymbol {
    pub text: String,
    pub bbox: Rect,
}

/// Backend that shells out to the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    language: String,
    data_path: Option<PathBuf>,
    variables: MemoryVariables,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractCli {
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            data_path: None,
            variables: MemoryVariables::new(),
        }
    }

    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = executable;
        self
    }

    pub fn with_language(mut self, language: String) -> Self {
        self.language = language;
        self
    }

    pub fn with_data_path(mut self, data_path: PathBuf) -> Self {
        self.data_path = Some(data_path);
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn run(&self, image: &DynamicImage, region: Rect, mode: SegmentationMode) -> Result<Vec<RawElement>> {
        if region.is_empty() {
            return Ok(Vec::new());
        }
        let crop = image.crop_imm(region.x1, region.y1, region.width(), region.height());
        let work_dir = tempfile::tempdir().context("failed to create OCR work directory")?;
        let image_path = work_dir.path().join("region.png");
        crop.save(&image_path)
            .with_context(|| format!("failed to write {}", image_path.display()))?;
        let base = work_dir.path().join("result");

        let mut command = Command::new(&self.executable);
        command
            .arg(&image_path)
            .arg(&base)
            .arg("--psm")
            .arg(mode.as_psm().to_string())
            .arg("-l")
            .arg(&self.language);
        if let Some(data_path) = &self.data_path {
            command.arg("--tessdata-dir").arg(data_path);
        }
        for (name, value) in self.variables.entries() {
            command.arg("-c").arg(format!("{name}={}", value.to_engine_arg()));
        }
        command.arg("tsv").arg("makebox");
        debug!(?command, "running tesseract");

        let output = command
            .output()
            .with_context(|| format!("failed to invoke {}", self.executable.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("tesseract exited with {}: {stderr}", output.status);
        }

        let tsv_path = base.with_extension("tsv");
        let tsv = fs::read_to_string(&tsv_path)
            .with_context(|| format!("missing tsv output {}", tsv_path.display()))?;
        let box_path = base.with_extension("box");
        let boxes = fs::read_to_string(&box_path)
            .with_context(|| format!("missing box output {}", box_path.display()))?;

        let mut records = parse_tsv(&tsv)?;
        let symbols = parse_box(&boxes, crop.height())?;
        attach_symbols(&mut records, symbols);
        for record in &mut records {
            record.bbox = record.bbox.map(|b| b.translate(region.x1, region.y1));
        }
        Ok(records)
    }
}

impl VariableStore for TesseractCli {
    fn get(&self, name: &str) -> Option<VariableValue> {
        self.variables.get(name)
    }

    fn set(&mut self, name: &str, value: VariableValue) -> bool {
        self.variables.set(name, value)
    }

    fn entries(&self) -> Vec<(String, VariableValue)> {
        self.variables.entries()
    }
}

impl RecognitionBackend for TesseractCli {
    fn recognize(
        &self,
        image: &DynamicImage,
        region: Rect,
        mode: SegmentationMode,
    ) -> OcrResult<Vec<RawElement>> {
        self.run(image, region, mode)
            .map_err(|err| OcrError::RecognitionFailure(format!("{err:#}")))
    }
}

/// Parses Tesseract's TSV output into block..word records.
///
/// The page row (level 1) is skipped, a confidence of -1 means "not
/// reported", and words with blank text are dropped.
pub fn parse_tsv(tsv: &str) -> Result<Vec<RawElement>> {
    let mut records = Vec::new();
    for (row, line) in tsv.lines().enumerate() {
        if line.is_empty() || line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.splitn(12, '\t').collect();
        if fields.len() < 11 {
            anyhow::bail!("tsv row {} has {} fields", row + 1, fields.len());
        }
        let number = |i: usize| -> Result<u32> {
            fields[i]
                .trim()
                .parse()
                .with_context(|| format!("tsv row {} column {}", row + 1, i + 1))
        };
        let level = match number(0)? {
            2 => Level::Block,
            3 => Level::Paragraph,
            4 => Level::TextLine,
            5 => Level::Word,
            _ => continue,
        };
        let text = fields.get(11).map(|t| t.trim()).unwrap_or_default();
        if level == Level::Word && text.is_empty() {
            continue;
        }
        let ordinals = [number(2)?, number(3)?, number(4)?, number(5)?].map(|n| n as usize);
        let confidence: f32 = fields[10]
            .trim()
            .parse()
            .with_context(|| format!("tsv row {} confidence", row + 1))?;

        let mut record = RawElement::new(level, &ordinals)
            .with_bbox(Rect::new(number(6)?, number(7)?, number(8)?, number(9)?));
        if confidence >= 0.0 {
            record = record.with_confidence(confidence);
        }
        if level == Level::Word {
            record = record.with_text(text);
        }
        records.push(record);
    }
    Ok(records)
}

/// Parses `makebox` lines: `<char> <left> <bottom> <right> <top> <page>`,
/// with Y measured from the bottom of an image `image_height` pixels tall.
pub fn parse_box(boxes: &str, image_height: u32) -> Result<Vec<BoxSymbol>> {
    let mut symbols = Vec::new();
    for (row, line) in boxes.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.rsplitn(6, ' ');
        let mut number = || -> Result<u32> {
            fields
                .next()
                .with_context(|| format!("box row {} is truncated", row + 1))?
                .parse()
                .with_context(|| format!("box row {} has a bad coordinate", row + 1))
        };
        let _page = number()?;
        let top = number()?;
        let right = number()?;
        let bottom = number()?;
        let left = number()?;
        let text = fields.next().unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }
        let bbox = Rect::from_bottom_up(left, bottom, right, top, image_height)
            .with_context(|| format!("box row {}", row + 1))?;
        symbols.push(BoxSymbol {
            text: text.to_string(),
            bbox,
        });
    }
    Ok(symbols)
}

/// Hands box symbols to words in reading order, one per character of the
/// word text. Words are left without symbols once the two sequences disagree.
pub fn attach_symbols(records: &mut Vec<RawElement>, symbols: Vec<BoxSymbol>) {
    let mut symbols = symbols.into_iter().peekable();
    let mut attached = Vec::with_capacity(records.len());
    let mut aligned = true;
    for record in records.drain(..) {
        let is_word = record.level == Level::Word;
        let word_key = record.key();
        let word_text = record.text.clone().unwrap_or_default();
        let word_confidence = record.confidence;
        attached.push(record);
        if !is_word || !aligned {
            continue;
        }

        let mut taken = String::new();
        let mut word_symbols = Vec::new();
        while taken.chars().count() < word_text.chars().count() {
            let Some(symbol) = symbols.next() else { break };
            taken.push_str(&symbol.text);
            word_symbols.push(symbol);
        }
        if taken != word_text {
            warn!(word = %word_text, boxes = %taken, "box symbols do not match word text");
            aligned = false;
            continue;
        }
        for (i, symbol) in word_symbols.into_iter().enumerate() {
            let mut ordinals = word_key.clone();
            ordinals.push(i + 1);
            let mut element = RawElement::new(Level::Symbol, &ordinals)
                .with_bbox(symbol.bbox)
                .with_text(symbol.text);
            element.confidence = word_confidence;
            attached.push(element);
        }
    }
    if symbols.peek().is_some() && aligned {
        warn!(remaining = symbols.count(), "unused box symbols");
    }
    *records = attached;
}
