//! 本地化字符串
//!
//! 内置 en / ru 两套默认字符串，文件中的翻译覆盖在默认值之上。
//! 查找顺序：当前语言 → en → key 本身。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use phf::phf_map;
use tracing::warn;

/// 回退语言
pub const FALLBACK_LANGUAGE: &str = "en";

static DEFAULT_EN: phf::Map<&'static str, &'static str> = phf_map! {
    "window_title" => "Browser Assistant",
    "error_title" => "Error",
    "status_title" => "Status",
    "input_file" => "Input file (Excel/CSV):",
    "output_file" => "Output file:",
    "profile" => "Profile:",
    "model" => "Model:",
    "model_gpt4o_mini_desc" => "Fast and economical version of GPT-4",
    "model_gpt4o_desc" => "Full GPT-4o version - balance of speed and capabilities",
    "model_claude3_sonnet_desc" => "Claude 3.5 Sonnet - fast and powerful model from Anthropic",
    "model_gemini_flash_desc" => "Gemini 1.5 Flash - fast multimodal model from Google",
    "no_input_file" => "Please select input file",
    "input_file_not_found" => "Input file not found",
    "no_output_file" => "Please select output file",
    "output_dir_error" => "Error creating output directory",
    "no_prompt" => "Please enter prompt",
    "no_columns" => "Please specify output columns",
    "select_model" => "Please select model",
    "no_openai_key" => "OpenAI API key is required for this model.\nPlease add it in Settings.",
    "no_anthropic_key" => "Anthropic API key is required for this model.\nPlease add it in Settings.",
    "no_google_key" => "Google API key is required for this model.\nPlease add it in Settings.",
    "invalid_model" => "Invalid model selected",
    "unknown_profile" => "Selected profile does not exist",
    "missing_columns" => "Input file is missing required columns: {columns}",
    "no_browser_config" => "Online search is enabled but browser settings are missing",
    "invalid_temperature" => "Temperature must be between 0 and 1",
    "invalid_parallelism" => "Parallel browsers must be at least 1 and match the pool size",
    "processing" => "Processing...",
    "completed" => "Processing completed",
    "no_results" => "No results to save",
    "results_saved" => "Results saved to {path}",
    "processing_error" => "Error during processing: {error}",
    "profile_saved" => "Profile saved successfully",
};

static DEFAULT_RU: phf::Map<&'static str, &'static str> = phf_map! {
    "window_title" => "Browser Assistant",
    "error_title" => "Ошибка",
    "status_title" => "Статус",
    "input_file" => "Входной файл (Excel/CSV):",
    "output_file" => "Выходной файл:",
    "profile" => "Профиль:",
    "model" => "Модель:",
    "model_gpt4o_mini_desc" => "Быстрая и экономичная версия GPT-4",
    "model_gpt4o_desc" => "Полная версия GPT-4o - баланс скорости и возможностей",
    "model_claude3_sonnet_desc" => "Claude 3.5 Sonnet - быстрая и мощная модель от Anthropic",
    "no_input_file" => "Выберите входной файл",
    "input_file_not_found" => "Входной файл не найден",
    "no_output_file" => "Выберите выходной файл",
    "output_dir_error" => "Ошибка создания директории для выходного файла",
    "no_prompt" => "Введите промпт",
    "no_columns" => "Укажите выходные колонки",
    "select_model" => "Выберите модель",
    "no_openai_key" => "Для этой модели требуется ключ OpenAI API.\nДобавьте его в Настройках.",
    "no_anthropic_key" => "Для этой модели требуется ключ Anthropic API.\nДобавьте его в Настройках.",
    "invalid_model" => "Выбрана некорректная модель",
    "missing_columns" => "Во входном файле нет обязательных колонок: {columns}",
    "processing" => "Обработка...",
    "completed" => "Обработка завершена",
    "no_results" => "Нет результатов для сохранения",
    "results_saved" => "Результаты сохранены в {path}",
    "processing_error" => "Ошибка при обработке: {error}",
    "profile_saved" => "Профиль успешно сохранен",
};

/// 语言代码 → (key → 字符串)
#[derive(Debug, Clone)]
pub struct Localization {
    translations: HashMap<String, HashMap<String, String>>,
    current_language: String,
}

impl Default for Localization {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Localization {
    /// 只含内置字符串
    pub fn builtin() -> Self {
        let mut translations = HashMap::new();
        for (lang, table) in [("en", &DEFAULT_EN), ("ru", &DEFAULT_RU)] {
            let entries = table
                .entries()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            translations.insert(lang.to_string(), entries);
        }
        Self {
            translations,
            current_language: FALLBACK_LANGUAGE.to_string(),
        }
    }

    /// 加载本地化文件并与内置字符串合并；文件缺失或损坏时只用内置字符串
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut localization = Self::builtin();
        match read_file(path) {
            Ok(file) => {
                for (lang, entries) in file {
                    localization
                        .translations
                        .entry(lang)
                        .or_default()
                        .extend(entries);
                }
            }
            Err(e) => {
                warn!("⚠️ 无法加载本地化文件 {}: {}，使用内置字符串", path.display(), e);
            }
        }
        localization
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.translations)?;
        fs::write(path, content).with_context(|| format!("无法写入本地化文件: {}", path.display()))?;
        Ok(())
    }

    pub fn current_language(&self) -> &str {
        &self.current_language
    }

    pub fn set_language(&mut self, lang: impl Into<String>) {
        self.current_language = lang.into();
    }

    /// 查找字符串：当前语言 → en → key 本身
    pub fn get(&self, key: &str) -> String {
        let lookup = |lang: &str| {
            self.translations
                .get(lang)
                .and_then(|table| table.get(key))
                .cloned()
        };
        lookup(&self.current_language)
            .or_else(|| lookup(FALLBACK_LANGUAGE))
            .unwrap_or_else(|| {
                warn!("⚠️ 缺少翻译: '{}'", key);
                key.to_string()
            })
    }

    /// 查找字符串并替换 `{name}` 占位符
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.get(key), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
    }
}

fn read_file(path: &Path) -> Result<HashMap<String, HashMap<String, String>>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
