use crate::types::Field;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundaries: PathBuf, // .geojson / .json / .shp
    pub population_csv: PathBuf,
    #[serde(default = "default_join_column")]
    pub join_column_boundaries: String,
    #[serde(default = "default_join_column")]
    pub join_column_csv: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_breakdowns")]
    pub breakdowns: BTreeMap<String, BreakdownConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BreakdownConfig {
    pub categories: Vec<CategoryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub name: String,
    pub color: String, // Hex code
    pub column: Field,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            breakdowns: default_breakdowns(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: None,
        }
    }
}

fn default_join_column() -> String {
    "Subzone".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_port() -> u16 {
    8050
}

fn category(name: &str, color: &str, column: Field) -> CategoryConfig {
    CategoryConfig {
        name: name.to_string(),
        color: color.to_string(),
        column,
    }
}

fn default_breakdowns() -> BTreeMap<String, BreakdownConfig> {
    let mut breakdowns = BTreeMap::new();
    breakdowns.insert(
        "Gender".to_string(),
        BreakdownConfig {
            categories: vec![
                category("Males", "#B57EDC", Field::TotalMales),
                category("Females", "#4A8123", Field::TotalFemales),
            ],
        },
    );
    breakdowns.insert(
        "Ethnicity".to_string(),
        BreakdownConfig {
            categories: vec![
                category("Chinese", "#2E8BC0", Field::TotalChinese),
                category("Malays", "#DA3C7C", Field::TotalMalays),
                category("Indians", "#3EB489", Field::TotalIndians),
                category("Others", "#FFB400", Field::TotalOthers),
            ],
        },
    );
    breakdowns
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
