use crate::adapters::sources::{InboxSources, StaticSources};
use crate::adapters::spreadsheet::{OUTPUT_EXTENSIONS, SPREADSHEET_EXTENSIONS};
use crate::domain::model::{MergeKey, PricingRule};
use crate::domain::ports::{ConfigProvider, SourceProvider, TemplateTarget};
use crate::domain::table::{ColumnLayout, ResetScope};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_distinct_columns, validate_file_extensions, validate_path,
    validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_INBOX_DIR: &str = "attachments";
pub const DEFAULT_PROTECTED_FILE: &str = "untouchable_articles.txt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub sources: SourcesConfig,
    pub protected: ProtectedConfig,
    pub merge: MergeConfig,
    pub pricing: PricingRule,
    pub stock_template: StockTemplateConfig,
    pub price_template: TemplateConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// 明確指定的兩個倉庫檔案，優先於 inbox_dir
    pub files: Vec<String>,
    pub inbox_dir: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            inbox_dir: DEFAULT_INBOX_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectedConfig {
    pub path: Option<String>,
}

impl Default for ProtectedConfig {
    fn default() -> Self {
        Self {
            path: Some(DEFAULT_PROTECTED_FILE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub key: MergeKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockTemplateConfig {
    pub path: String,
    pub output: String,
    pub key_column: usize,
    pub value_column: usize,
    pub reset: ResetScope,
}

impl Default for StockTemplateConfig {
    fn default() -> Self {
        Self {
            path: "stocks_pattern.xlsx".to_string(),
            output: "stocks.xlsx".to_string(),
            key_column: ColumnLayout::STOCK.key_column,
            value_column: ColumnLayout::STOCK.value_column,
            reset: ResetScope::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub path: String,
    pub output: String,
    pub key_column: usize,
    pub value_column: usize,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: "price_pattern.xlsx".to_string(),
            output: "price.xlsx".to_string(),
            key_column: ColumnLayout::PRICE.key_column,
            value_column: ColumnLayout::PRICE.value_column,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub report_json: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            report_json: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl ReconConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SKLAD_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// Explicit files win over the inbox directory.
    pub fn source_provider(&self) -> Box<dyn SourceProvider> {
        if self.sources.files.is_empty() {
            Box::new(InboxSources::new(&self.sources.inbox_dir))
        } else {
            Box::new(StaticSources::new(
                self.sources.files.iter().map(PathBuf::from).collect(),
            ))
        }
    }

    fn output_location(&self, name: &str) -> PathBuf {
        normalized(&Path::new(&self.load.output_path).join(name))
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if self.sources.files.is_empty() {
            validate_path("sources.inbox_dir", &self.sources.inbox_dir)?;
        } else {
            validate_file_extensions("sources.files", &self.sources.files, SPREADSHEET_EXTENSIONS)?;
        }

        if let Some(path) = &self.protected.path {
            validate_path("protected.path", path)?;
        }

        validate_path("load.output_path", &self.load.output_path)?;

        let stock = &self.stock_template;
        let price = &self.price_template;
        for (field, path, allowed) in [
            ("stock_template.path", &stock.path, SPREADSHEET_EXTENSIONS),
            ("stock_template.output", &stock.output, OUTPUT_EXTENSIONS),
            ("price_template.path", &price.path, SPREADSHEET_EXTENSIONS),
            ("price_template.output", &price.output, OUTPUT_EXTENSIONS),
        ] {
            validate_path(field, path)?;
            validate_file_extensions(field, std::slice::from_ref(path), allowed)?;
        }

        validate_distinct_columns("stock_template", stock.key_column, stock.value_column)?;
        validate_distinct_columns("price_template", price.key_column, price.value_column)?;

        if let ResetScope::Rows { first, last } = stock.reset {
            validate_range("stock_template.reset.rows.first", first, 2, usize::MAX)?;
            validate_range("stock_template.reset.rows.last", last, first, usize::MAX)?;
        }

        validate_range("pricing.threshold", self.pricing.threshold, 0, i64::MAX)?;
        validate_positive_number("pricing.low_multiplier", self.pricing.low_multiplier, 1)?;
        validate_positive_number("pricing.high_multiplier", self.pricing.high_multiplier, 1)?;

        if let Some(report_json) = &self.load.report_json {
            validate_path("load.report_json", report_json)?;
            validate_file_extensions("load.report_json", std::slice::from_ref(report_json), &["json"])?;
        }

        // 輸出檔不可互相覆蓋，也不可覆蓋範本
        let stock_out = self.output_location(&stock.output);
        let price_out = self.output_location(&price.output);
        if stock_out == price_out {
            return Err(EtlError::ConfigValidationError {
                field: "price_template.output".to_string(),
                message: "Stock and price outputs must be different files".to_string(),
            });
        }
        for (field, output) in [
            ("stock_template.output", &stock_out),
            ("price_template.output", &price_out),
        ] {
            if *output == normalized(Path::new(&stock.path))
                || *output == normalized(Path::new(&price.path))
            {
                return Err(EtlError::ConfigValidationError {
                    field: field.to_string(),
                    message: format!("{} would overwrite a template", output.display()),
                });
            }
        }

        Ok(())
    }
}

/// `./a.xlsx` 與 `a.xlsx` 視為同一個檔案
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl ConfigProvider for ReconConfig {
    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn protected_articles_path(&self) -> Option<&str> {
        self.protected.path.as_deref()
    }

    fn stock_target(&self) -> TemplateTarget {
        TemplateTarget {
            template: self.stock_template.path.clone(),
            output: self.stock_template.output.clone(),
            layout: ColumnLayout {
                key_column: self.stock_template.key_column,
                value_column: self.stock_template.value_column,
            },
        }
    }

    fn price_target(&self) -> TemplateTarget {
        TemplateTarget {
            template: self.price_template.path.clone(),
            output: self.price_template.output.clone(),
            layout: ColumnLayout {
                key_column: self.price_template.key_column,
                value_column: self.price_template.value_column,
            },
        }
    }

    fn reset_scope(&self) -> ResetScope {
        self.stock_template.reset
    }

    fn merge_key(&self) -> MergeKey {
        self.merge.key
    }

    fn pricing(&self) -> PricingRule {
        self.pricing
    }

    fn report_json(&self) -> Option<String> {
        self.load.report_json.clone()
    }
}

impl Validate for ReconConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_production_defaults() {
        let config = ReconConfig::from_toml_str("").unwrap();

        assert_eq!(config.sources.inbox_dir, "attachments");
        assert_eq!(config.protected_articles_path(), Some("untouchable_articles.txt"));
        assert_eq!(config.merge_key(), MergeKey::SellerArticle);
        assert_eq!(config.pricing(), PricingRule::default());
        assert_eq!(config.stock_target().layout, ColumnLayout::STOCK);
        assert_eq!(config.price_target().layout, ColumnLayout::PRICE);
        assert_eq!(config.reset_scope(), ResetScope::LastRow);
        assert_eq!(config.stock_target().output, "stocks.xlsx");
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[sources]
files = ["a.xlsx", "b.csv"]

[protected]
path = "keep.txt"

[merge]
key = "canonical_article"

[pricing]
threshold = 500
low_multiplier = 4

[stock_template]
path = "tpl/stocks.csv"
output = "stocks_{date}.csv"
reset = { rows = { first = 2, last = 10 } }

[price_template]
path = "tpl/price.csv"
output = "price.csv"
key_column = 0
value_column = 2

[load]
output_path = "out"
report_json = "report.json"

[monitoring]
enabled = true
"#;

        let config = ReconConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.sources.files, vec!["a.xlsx", "b.csv"]);
        assert_eq!(config.merge_key(), MergeKey::CanonicalArticle);
        assert_eq!(config.pricing().threshold, 500);
        assert_eq!(config.pricing().low_multiplier, 4);
        assert_eq!(config.pricing().high_multiplier, 2);
        assert_eq!(config.reset_scope(), ResetScope::Rows { first: 2, last: 10 });
        assert_eq!(config.stock_target().layout, ColumnLayout::STOCK);
        assert_eq!(
            config.price_target().layout,
            ColumnLayout {
                key_column: 0,
                value_column: 2
            }
        );
        assert_eq!(config.report_json().as_deref(), Some("report.json"));
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reset_scope_names() {
        for (text, expected) in [
            ("none", ResetScope::Disabled),
            ("last_row", ResetScope::LastRow),
            ("all_rows", ResetScope::AllRows),
        ] {
            let config =
                ReconConfig::from_toml_str(&format!("[stock_template]\nreset = \"{}\"\n", text))
                    .unwrap();
            assert_eq!(config.reset_scope(), expected);
        }
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WAREHOUSE_ETL_TEST_INBOX", "/srv/mail");

        let config =
            ReconConfig::from_toml_str("[sources]\ninbox_dir = \"${WAREHOUSE_ETL_TEST_INBOX}\"\n")
                .unwrap();
        assert_eq!(config.sources.inbox_dir, "/srv/mail");

        std::env::remove_var("WAREHOUSE_ETL_TEST_INBOX");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let same_columns = "[price_template]\nkey_column = 3\nvalue_column = 3\n";
        assert!(ReconConfig::from_toml_str(same_columns).unwrap().validate().is_err());

        let zero_multiplier = "[pricing]\nhigh_multiplier = 0\n";
        assert!(ReconConfig::from_toml_str(zero_multiplier).unwrap().validate().is_err());

        let same_outputs = "[price_template]\noutput = \"stocks.xlsx\"\n";
        assert!(ReconConfig::from_toml_str(same_outputs).unwrap().validate().is_err());

        let overwrite_template = "[stock_template]\noutput = \"stocks_pattern.xlsx\"\n";
        assert!(ReconConfig::from_toml_str(overwrite_template).unwrap().validate().is_err());

        let bad_range = "[stock_template]\nreset = { rows = { first = 5, last = 2 } }\n";
        assert!(ReconConfig::from_toml_str(bad_range).unwrap().validate().is_err());

        // 只能寫出 xlsx / csv
        for output in ["price.ods", "price.xls", "price.xlsb", "price.xlsm"] {
            let toml = format!("[price_template]\noutput = \"{}\"\n", output);
            assert!(ReconConfig::from_toml_str(&toml).unwrap().validate().is_err(), "{}", output);
        }
        let ods_template = "[price_template]\npath = \"price_pattern.ods\"\n";
        assert!(ReconConfig::from_toml_str(ods_template).unwrap().validate().is_ok());

        let bad_source = "[sources]\nfiles = [\"a.txt\", \"b.xlsx\"]\n";
        assert!(ReconConfig::from_toml_str(bad_source).unwrap().validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            ReconConfig::from_toml_str("[merge]\nkey = \"sku\"\n"),
            Err(EtlError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[load]\noutput_path = \"./out\"\n")
            .unwrap();

        let config = ReconConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_path(), "./out");
    }
}
