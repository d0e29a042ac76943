/// Input manifest: which alignment file belongs to which category
///
/// Category identity comes only from the manifest columns, never from the
/// file path:
///
/// ```text
/// #region  mode       method   sample   path                      runtime
/// brca1    real       cactus   NA12878  aln/cactus-brca1.json.gz  aln/cactus-brca1.time
/// ```
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::category::{Category, Mode};

/// One alignment stream and the category it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CellInput {
    pub category: Category,
    pub sample: String,
    pub path: PathBuf,
    pub runtime_path: Option<PathBuf>,
}

fn resolve(base: Option<&Path>, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    match base {
        Some(dir) if p.is_relative() => dir.join(p),
        _ => p,
    }
}

/// Parse manifest rows. Relative paths are resolved against `base_dir`.
pub fn parse_manifest<R: BufRead>(reader: R, base_dir: Option<&Path>) -> Result<Vec<CellInput>> {
    let mut inputs = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < 5 {
            bail!(
                "Manifest line {line_no}: expected region, mode, method, sample, path[, runtime], got {} fields",
                fields.len()
            );
        }
        if fields[..5].iter().any(|f| f.is_empty()) {
            bail!("Manifest line {line_no}: empty required field");
        }

        let mode: Mode = fields[1]
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .with_context(|| format!("Manifest line {line_no}"))?;

        let runtime_path = fields
            .get(5)
            .filter(|f| !f.is_empty() && **f != "-")
            .map(|f| resolve(base_dir, f));

        inputs.push(CellInput {
            category: Category::new(fields[0], mode, fields[2]),
            sample: fields[3].to_string(),
            path: resolve(base_dir, fields[4]),
            runtime_path,
        });
    }

    Ok(inputs)
}

pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<CellInput>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;
    parse_manifest(std::io::BufReader::new(file), path.parent())
        .with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Group inputs by category, keeping first-seen order. Several samples of
/// one category are aggregated into a single cell.
pub fn group_by_category(inputs: Vec<CellInput>) -> IndexMap<Category, Vec<CellInput>> {
    let mut cells: IndexMap<Category, Vec<CellInput>> = IndexMap::new();
    for input in inputs {
        cells.entry(input.category.clone()).or_default().push(input);
    }
    cells
}

/// Read runtime samples: one non-negative number of seconds per line
pub fn read_runtime_samples<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value: f64 = trimmed
            .parse()
            .with_context(|| format!("Runtime line {}: invalid number '{}'", i + 1, trimmed))?;
        if !(value.is_finite() && value >= 0.0) {
            bail!("Runtime line {}: runtime must be a non-negative number", i + 1);
        }
        samples.push(value);
    }
    Ok(samples)
}
