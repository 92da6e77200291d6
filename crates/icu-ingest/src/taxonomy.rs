//! Diagnosis taxonomy document loading.

use std::path::Path;

use tracing::info;

use icu_model::Taxonomy;

use crate::error::TaxonomyError;

/// Serialization of a taxonomy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyFormat {
    Yaml,
    Json,
}

impl TaxonomyFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parses a taxonomy document. `origin` names the source in error messages.
pub fn parse_taxonomy(
    text: &str,
    format: TaxonomyFormat,
    origin: &str,
) -> Result<Taxonomy, TaxonomyError> {
    let format_error = |message: String| TaxonomyError::Format {
        origin: origin.to_string(),
        message,
    };
    match format {
        TaxonomyFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|error| format_error(error.to_string()))
        }
        TaxonomyFormat::Json => {
            serde_json::from_str(text).map_err(|error| format_error(error.to_string()))
        }
    }
}

/// Reads and parses the taxonomy file at `path`.
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy, TaxonomyError> {
    let format = TaxonomyFormat::from_path(path).ok_or_else(|| {
        TaxonomyError::UnsupportedFormat {
            path: path.to_path_buf(),
        }
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let taxonomy = parse_taxonomy(&text, format, &path.display().to_string())?;
    let benchmark = taxonomy
        .categories()
        .filter(|(_, category)| category.use_in_benchmark)
        .count();
    info!(
        path = %path.display(),
        categories = taxonomy.len(),
        benchmark,
        "taxonomy loaded"
    );
    Ok(taxonomy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "\
Heart Failure:
  codes: ['428.0', '4281']
  use_in_benchmark: true
  type: chronic
Fracture of neck of femur:
  codes: [82000]
  use_in_benchmark: false
";

    #[test]
    fn format_from_extension() {
        assert_eq!(
            TaxonomyFormat::from_path(Path::new("ccs.YML")),
            Some(TaxonomyFormat::Yaml)
        );
        assert_eq!(
            TaxonomyFormat::from_path(Path::new("ccs.json")),
            Some(TaxonomyFormat::Json)
        );
        assert_eq!(TaxonomyFormat::from_path(Path::new("ccs.txt")), None);
        assert_eq!(TaxonomyFormat::from_path(Path::new("ccs")), None);
    }

    #[test]
    fn parses_yaml_document() {
        let taxonomy = parse_taxonomy(YAML, TaxonomyFormat::Yaml, "inline").expect("taxonomy");
        assert_eq!(taxonomy.len(), 2);
        let femur = taxonomy.get("Fracture of neck of femur").expect("category");
        assert_eq!(femur.codes, vec!["82000"]);
        assert!(!femur.use_in_benchmark);
    }

    #[test]
    fn missing_codes_is_a_format_error() {
        let error = parse_taxonomy(
            "Sepsis:\n  use_in_benchmark: true\n",
            TaxonomyFormat::Yaml,
            "inline",
        )
        .unwrap_err();
        match error {
            TaxonomyError::Format { origin, message } => {
                assert_eq!(origin, "inline");
                assert!(message.contains("codes"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let error = parse_taxonomy("[1, 2, 3]", TaxonomyFormat::Json, "inline").unwrap_err();
        assert!(matches!(error, TaxonomyError::Format { .. }));
    }
}
