/// Category identity and the canonical method ordering table
///
/// A category is the unit of aggregation: one region, one read mode and one
/// method. The canonical table fixes the display order, label and color of
/// every known method.
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

/// Read set the alignments were produced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Real,
    Simulated,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Real => "real",
            Mode::Simulated => "simulated",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "real" => Ok(Mode::Real),
            "sim" | "simulated" => Ok(Mode::Simulated),
            other => Err(format!("Unknown read mode '{other}' (expected real or simulated)")),
        }
    }
}

/// (region, mode, method) aggregation key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Category {
    pub region: String,
    pub mode: Mode,
    pub method: String,
}

impl Category {
    pub fn new(region: impl Into<String>, mode: Mode, method: impl Into<String>) -> Self {
        Category {
            region: region.into(),
            mode,
            method: method.into(),
        }
    }

    /// Method id with any embedded region-name tokens removed
    pub fn canonical_method(&self) -> String {
        strip_region_tokens(&self.method, &self.region)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.mode, self.method)
    }
}

const TOKEN_DELIMITERS: [char; 3] = ['-', '_', '.'];

/// Split into (token, delimiter following it)
fn tokenize(s: &str) -> Vec<(&str, Option<char>)> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if TOKEN_DELIMITERS.contains(&c) {
            tokens.push((&s[start..i], Some(c)));
            start = i + c.len_utf8();
        }
    }
    tokens.push((&s[start..], None));
    tokens
}

/// Remove a region name embedded as whole tokens in a method id.
///
/// "camel-brca1" and "BRCA1_camel" both become "camel" for region "brca1".
/// Matching is case-insensitive and only on token boundaries, so
/// "cactus" is untouched for region "cac". A method that consists only of
/// the region name is returned unchanged.
pub fn strip_region_tokens(method: &str, region: &str) -> String {
    let region_tokens: Vec<String> = tokenize(region)
        .into_iter()
        .map(|(t, _)| t.to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if region_tokens.is_empty() {
        return method.to_string();
    }

    let tokens = tokenize(method);
    let n = region_tokens.len();
    let mut kept: Vec<(&str, Option<char>)> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let matches_region = i + n <= tokens.len()
            && tokens[i..i + n]
                .iter()
                .zip(&region_tokens)
                .all(|((t, _), r)| t.eq_ignore_ascii_case(r));
        if matches_region {
            i += n;
        } else {
            kept.push(tokens[i]);
            i += 1;
        }
    }

    if kept.is_empty() || kept.iter().all(|(t, _)| t.is_empty()) {
        return method.to_string();
    }

    let mut out = String::with_capacity(method.len());
    for (idx, (token, delim)) in kept.iter().enumerate() {
        out.push_str(token);
        if idx + 1 < kept.len() {
            out.push(delim.unwrap_or('-'));
        }
    }
    out
}

/// Display attributes of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodStyle {
    pub label: String,
    pub color: String,
}

/// Ordered method_id -> {label, color} mapping
#[derive(Debug, Clone, Default)]
pub struct CanonicalTable {
    methods: IndexMap<String, MethodStyle>,
}

impl CanonicalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a method; duplicate ids are rejected so order stays unambiguous
    pub fn insert(&mut self, method: &str, label: &str, color: &str) -> Result<()> {
        if self.methods.contains_key(method) {
            bail!("Duplicate method '{method}' in canonical ordering table");
        }
        self.methods.insert(
            method.to_string(),
            MethodStyle {
                label: label.to_string(),
                color: color.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, method: &str) -> Option<&MethodStyle> {
        self.methods.get(method)
    }

    pub fn position(&self, method: &str) -> Option<usize> {
        self.methods.get_index_of(method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MethodStyle)> {
        self.methods.iter()
    }

    /// Parse `method<TAB>label<TAB>color` rows; `#` comments and blank lines are skipped
    pub fn from_tsv<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = CanonicalTable::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
            if fields.len() < 3 || fields[..3].iter().any(|f| f.is_empty()) {
                bail!(
                    "Line {}: expected method<TAB>label<TAB>color, got '{}'",
                    i + 1,
                    trimmed
                );
            }
            table
                .insert(fields[0], fields[1], fields[2])
                .with_context(|| format!("Line {}", i + 1))?;
        }
        Ok(table)
    }

    pub fn from_tsv_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open method table {path}"))?;
        Self::from_tsv(std::io::BufReader::new(file))
            .with_context(|| format!("Invalid method table {path}"))
    }

    /// Standard graph set used when no table file is supplied
    pub fn builtin() -> Self {
        const BUILTIN: &[(&str, &str, &str)] = &[
            ("snp1kg", "1KG", "#fb9a99"),
            ("haplo1kg", "1KG Haplo", "#e31a1c"),
            ("cactus", "Cactus", "#6a3d9a"),
            ("camel", "Camel", "#a6cee3"),
            ("curoverse", "Curoverse", "#1f78b4"),
            ("debruijn-k31", "De Bruijn 31", "#ff7f00"),
            ("debruijn-k63", "De Bruijn 63", "#fdbf6f"),
            ("prg", "PRG", "#b2df8a"),
            ("refonly", "Primary", "#000000"),
            ("sbg", "7BG", "#33a02c"),
            ("simons", "SGDP", "#cab2d6"),
            ("trivial", "Unmerged", "#b15928"),
            ("vglr", "VGLR", "#ffff99"),
        ];

        let mut table = CanonicalTable::new();
        for (method, label, color) in BUILTIN {
            table.methods.insert(
                method.to_string(),
                MethodStyle {
                    label: label.to_string(),
                    color: color.to_string(),
                },
            );
        }
        table
    }
}
