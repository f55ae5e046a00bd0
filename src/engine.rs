use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::PageLayout;
use crate::ocr::layout_builder::build_layout;
use crate::ocr::variables::apply_config_text;
use crate::ocr::{RecognitionBackend, SegmentationMode, TesseractCli, VariableValue};
use crate::page::Page;

/// Engine settings, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub language: String,
    pub data_path: Option<PathBuf>,
    pub default_mode: SegmentationMode,
    /// Applied in name order, before `config_files`.
    pub variables: BTreeMap<String, VariableValue>,
    /// Tesseract-style `name value` files, applied in order.
    pub config_files: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            data_path: None,
            default_mode: SegmentationMode::default(),
            variables: BTreeMap::new(),
            config_files: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> OcrResult<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// A `tesseract` command-line backend set up for this language and data path.
    pub fn tesseract_backend(&self) -> TesseractCli {
        let backend = TesseractCli::new().with_language(self.language.clone());
        match &self.data_path {
            Some(path) => backend.with_data_path(path.clone()),
            None => backend,
        }
    }
}

/// Front door to recognition: owns the backend and its variables, and turns
/// an image into a [`Page`].
pub struct Engine {
    backend: Box<dyn RecognitionBackend>,
    default_mode: SegmentationMode,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("default_mode", &self.default_mode)
            .field("variables", &self.backend.entries().len())
            .finish()
    }
}

impl Engine {
    pub fn new(backend: Box<dyn RecognitionBackend>) -> Self {
        Self {
            backend,
            default_mode: SegmentationMode::default(),
        }
    }

    /// Applies the config's variables, then its config files, to the backend.
    /// Values the backend rejects are logged and skipped.
    pub fn with_config(backend: Box<dyn RecognitionBackend>, config: &EngineConfig) -> OcrResult<Self> {
        let mut engine = Self::new(backend);
        engine.default_mode = config.default_mode;
        for (name, value) in &config.variables {
            engine.set_variable(name, value.clone());
        }
        for path in &config.config_files {
            let text = fs::read_to_string(path)?;
            let applied = apply_config_text(engine.backend.as_mut(), &text);
            debug!(path = %path.display(), applied, "applied config file");
        }
        Ok(engine)
    }

    pub fn default_mode(&self) -> SegmentationMode {
        self.default_mode
    }

    /// Recognizes the whole image.
    #[instrument(level = "debug", skip_all)]
    pub fn process<'a>(&'a self, image: &'a DynamicImage, mode: SegmentationMode) -> OcrResult<Page<'a>> {
        let (width, height) = image.dimensions();
        self.process_region(image, Rect::new(0, 0, width, height), mode)
    }

    /// Recognizes `region` of the image. The region must lie inside the image.
    #[instrument(level = "debug", skip_all, fields(%region, ?mode))]
    pub fn process_region<'a>(
        &'a self,
        image: &'a DynamicImage,
        region: Rect,
        mode: SegmentationMode,
    ) -> OcrResult<Page<'a>> {
        let (width, height) = image.dimensions();
        if region.x2 > width || region.y2 > height {
            return Err(OcrError::InvalidRegion { region, width, height });
        }
        let layout = self.recognize(image, region, mode)?;
        Ok(Page::new(self, image, mode, layout))
    }

    /// Runs the backend over `region` and groups its dump into a layout.
    pub(crate) fn recognize(
        &self,
        image: &DynamicImage,
        region: Rect,
        mode: SegmentationMode,
    ) -> OcrResult<PageLayout> {
        let (width, height) = image.dimensions();
        let records = self.backend.recognize(image, region, mode).map_err(|err| match err {
            OcrError::RecognitionFailure(_) => err,
            other => OcrError::RecognitionFailure(other.to_string()),
        })?;
        debug!(%region, records = records.len(), "backend returned dump");
        build_layout(width, height, region, records)
    }

    pub fn variable(&self, name: &str) -> Option<VariableValue> {
        self.backend.get(name)
    }

    pub fn bool_variable(&self, name: &str) -> Option<bool> {
        self.variable(name)?.as_bool()
    }

    pub fn int_variable(&self, name: &str) -> Option<i32> {
        self.variable(name)?.as_int()
    }

    pub fn double_variable(&self, name: &str) -> Option<f64> {
        self.variable(name)?.as_double()
    }

    pub fn string_variable(&self, name: &str) -> Option<String> {
        match self.variable(name)? {
            VariableValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `false` when the backend rejects the value.
    pub fn set_variable(&mut self, name: &str, value: impl Into<VariableValue>) -> bool {
        self.backend.set(name, value.into())
    }

    pub fn variables(&self) -> Vec<(String, VariableValue)> {
        self.backend.entries()
    }

    /// Writes every variable as a `name<TAB>value` line, a format
    /// [`apply_config_text`] reads back.
    pub fn write_variables(&self, path: &Path) -> OcrResult<()> {
        let mut out = String::new();
        for (name, value) in self.backend.entries() {
            writeln!(out, "{name}\t{value}")?;
        }
        fs::write(path, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Level;
    use crate::ocr::{MemoryVariables, RawElement, ReplayBackend, VariableStore};
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        let records = vec![RawElement::new(Level::Word, &[1, 1, 1, 1])
            .with_bbox(Rect::new(5, 5, 20, 10))
            .with_confidence(88.0)
            .with_text("word")];
        Engine::new(Box::new(ReplayBackend::new(records)))
    }

    #[test]
    fn typed_getters_reject_other_types() {
        let mut engine = engine();
        assert!(engine.set_variable("tessedit_pageseg_mode", 6));
        assert!(engine.set_variable("textord_tabfind_vertical_text_ratio", 0.5));
        assert!(engine.set_variable("load_system_dawg", false));
        assert!(engine.set_variable("tessedit_char_whitelist", "abc"));
        assert_eq!(engine.int_variable("tessedit_pageseg_mode"), Some(6));
        assert_eq!(engine.double_variable("textord_tabfind_vertical_text_ratio"), Some(0.5));
        assert_eq!(engine.bool_variable("load_system_dawg"), Some(false));
        assert_eq!(engine.string_variable("tessedit_char_whitelist").as_deref(), Some("abc"));
        assert_eq!(engine.bool_variable("tessedit_pageseg_mode"), None);
        assert_eq!(engine.int_variable("missing"), None);
        assert!(!engine.set_variable("tessedit_pageseg_mode", "six"));
    }

    #[test]
    fn rejects_regions_outside_the_image() {
        let engine = engine();
        let image = DynamicImage::new_luma8(50, 40);
        let err = engine
            .process_region(&image, Rect::new(40, 0, 20, 10), SegmentationMode::Auto)
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidRegion { width: 50, height: 40, .. }));
    }

    #[test]
    fn config_applies_variables_then_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("digits");
        fs::write(&config_file, "tessedit_char_whitelist 0123456789\nclassify_bln_numeric_mode 1\n").unwrap();
        let config_path = dir.path().join("engine.json");
        fs::write(
            &config_path,
            format!(
                r#"{{"default_mode": "single_line", "variables": {{"tessedit_char_whitelist": "abc", "classify_bln_numeric_mode": 0}}, "config_files": [{:?}]}}"#,
                config_file
            ),
        )
        .unwrap();

        let config = EngineConfig::from_json_file(&config_path).unwrap();
        assert_eq!(config.language, "eng");
        let engine = Engine::with_config(Box::new(ReplayBackend::default()), &config).unwrap();
        assert_eq!(engine.default_mode(), SegmentationMode::SingleLine);
        assert_eq!(engine.string_variable("tessedit_char_whitelist").as_deref(), Some("0123456789"));
        assert_eq!(engine.int_variable("classify_bln_numeric_mode"), Some(1));
    }

    #[test]
    fn written_variables_read_back() {
        let mut engine = engine();
        engine.set_variable("user_words_suffix", "user-words");
        engine.set_variable("edges_max_children_per_outline", 40);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars.txt");
        engine.write_variables(&path).unwrap();

        let mut restored = MemoryVariables::with_defaults([("edges_max_children_per_outline", VariableValue::Int(0))]);
        let applied = apply_config_text(&mut restored, &fs::read_to_string(&path).unwrap());
        assert_eq!(applied, 2);
        assert_eq!(restored.get("edges_max_children_per_outline"), Some(VariableValue::Int(40)));
        assert_eq!(restored.get("user_words_suffix"), Some(VariableValue::from("user-words")));
    }
}
