//! Immutable reference tables backing document synthesis.
//!
//! Tables are loaded once at process start and shared read-only across all
//! workers. Name lists are one name per line, case-normalized on load. The
//! product catalog is semicolon-delimited `name;unitPrice;code` rows; any
//! malformed row fails the whole load.

use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Shipping labels drawn for the `specialInstructions` field.
pub const SPECIAL_INSTRUCTIONS: &[&str] = &[
    "Surface Mail",
    "Next Day Air",
    "Courier",
    "Ground",
    "Air Mail",
    "Hand Carry",
    "Counter to Counter",
    "COD",
    "Expidite",
    "Priority Overnight",
];

/// Phone entry labels, indexed positionally by phone ordinal.
pub const PHONE_TYPES: &[&str] = &["Office", "Mobile", "Home"];

pub(crate) const STREET_NAMES: &[&str] = &[
    "Oak", "Maple", "Cedar", "Washington", "Lake", "Hill", "Pine", "Elm", "Sunset", "Jackson",
    "Lincoln", "Church", "Walnut", "Spring", "River", "Highland",
];

pub(crate) const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Blvd", "Dr", "Ln", "Rd", "Way", "Ct"];

pub(crate) const CITIES: &[&str] = &[
    "Springfield",
    "Riverside",
    "Franklin",
    "Clinton",
    "Georgetown",
    "Salem",
    "Fairview",
    "Madison",
    "Arlington",
    "Ashland",
    "Dayton",
    "Lexington",
];

pub(crate) const STATES: &[&str] = &[
    "AL", "CA", "CO", "FL", "GA", "IL", "MA", "NC", "NJ", "NY", "OH", "OR", "PA", "TX", "VA", "WA",
];

pub(crate) const COUNTRIES: &[&str] = &[
    "United States of America",
    "Canada",
    "Mexico",
    "United Kingdom",
    "France",
    "Germany",
    "Australia",
    "Japan",
];

/// Errors raised while loading reference data. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum RefDataError {
    /// A reference data file could not be read.
    #[error("failed to read reference data file '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// A product catalog row is missing fields or has unparsable values.
    #[error("malformed catalog row at {file}:{line}: {reason}")]
    MalformedRow {
        file: String,
        line: usize,
        reason: String,
    },

    /// A reference table loaded without any usable entries.
    #[error("reference table '{0}' is empty")]
    EmptyTable(String),
}

/// One product catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub unit_price: Decimal,
    pub code: i64,
}

/// Process-wide read-only lookup tables.
///
/// Constructed once and passed to every worker behind an `Arc`; nothing is
/// mutated after load, so concurrent reads need no locking.
#[derive(Debug)]
pub struct ReferenceData {
    first_names: Vec<String>,
    last_names: Vec<String>,
    products: Vec<Product>,
}

impl ReferenceData {
    /// Load the name lists and product catalog from `data_dir`.
    ///
    /// Expects `first_names.txt`, `last_names.txt` and `products.csv`
    /// in the directory.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, RefDataError> {
        let dir = data_dir.as_ref();
        let first_names = load_names(&dir.join("first_names.txt"))?;
        let last_names = load_names(&dir.join("last_names.txt"))?;
        let products = load_products(&dir.join("products.csv"))?;
        Self::from_parts(first_names, last_names, products)
    }

    /// Build reference data from already-loaded tables. Used by tests with
    /// fixture data and by `load`.
    pub fn from_parts(
        first_names: Vec<String>,
        last_names: Vec<String>,
        products: Vec<Product>,
    ) -> Result<Self, RefDataError> {
        if first_names.is_empty() {
            return Err(RefDataError::EmptyTable("first_names".into()));
        }
        if last_names.is_empty() {
            return Err(RefDataError::EmptyTable("last_names".into()));
        }
        if products.is_empty() {
            return Err(RefDataError::EmptyTable("products".into()));
        }
        Ok(Self {
            first_names,
            last_names,
            products,
        })
    }

    pub fn first_names(&self) -> &[String] {
        &self.first_names
    }

    pub fn last_names(&self) -> &[String] {
        &self.last_names
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Phone label for the given phone ordinal (0-based).
    pub fn phone_type(&self, ordinal: usize) -> &'static str {
        PHONE_TYPES[ordinal % PHONE_TYPES.len()]
    }
}

/// Read a one-name-per-line file, upper-casing the first letter of each name.
fn load_names(path: &Path) -> Result<Vec<String>, RefDataError> {
    let file = File::open(path).map_err(|source| RefDataError::Io {
        file: path.display().to_string(),
        source,
    })?;

    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| RefDataError::Io {
            file: path.display().to_string(),
            source,
        })?;
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        names.push(capitalize(name));
    }

    if names.is_empty() {
        return Err(RefDataError::EmptyTable(path.display().to_string()));
    }
    Ok(names)
}

/// Parse the semicolon-delimited product catalog. A row missing separators
/// or carrying an unparsable price/code fails the whole load.
fn load_products(path: &Path) -> Result<Vec<Product>, RefDataError> {
    let file = File::open(path).map_err(|source| RefDataError::Io {
        file: path.display().to_string(),
        source,
    })?;

    let mut products = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| RefDataError::Io {
            file: path.display().to_string(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        products.push(parse_product_row(&line, path, idx + 1)?);
    }

    if products.is_empty() {
        return Err(RefDataError::EmptyTable(path.display().to_string()));
    }
    Ok(products)
}

fn parse_product_row(line: &str, path: &Path, line_no: usize) -> Result<Product, RefDataError> {
    let malformed = |reason: String| RefDataError::MalformedRow {
        file: path.display().to_string(),
        line: line_no,
        reason,
    };

    let mut fields = line.splitn(3, ';');
    let name = fields
        .next()
        .ok_or_else(|| malformed("missing name field".into()))?;
    let price = fields
        .next()
        .ok_or_else(|| malformed("missing unit price field".into()))?;
    let code = fields
        .next()
        .ok_or_else(|| malformed("missing code field".into()))?;

    let unit_price: Decimal = price
        .trim()
        .parse()
        .map_err(|e| malformed(format!("bad unit price '{price}': {e}")))?;
    let code: i64 = code
        .trim()
        .parse()
        .map_err(|e| malformed(format!("bad code '{code}': {e}")))?;

    Ok(Product {
        name: name.to_string(),
        unit_price,
        code,
    })
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn write_fixture_dir(dir: &Path) {
        write_file(dir, "first_names.txt", "alice\nbob\ncarol\n");
        write_file(dir, "last_names.txt", "smith\njones\n");
        write_file(
            dir,
            "products.csv",
            "The Matrix;14.99;883929106\nInception;9.50;25195112\nHeat;12.00;85391163926\n",
        );
    }

    #[test]
    fn load_capitalizes_names() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture_dir(dir.path());

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.first_names(), ["Alice", "Bob", "Carol"]);
        assert_eq!(data.last_names(), ["Smith", "Jones"]);
    }

    #[test]
    fn load_parses_catalog_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture_dir(dir.path());

        let data = ReferenceData::load(dir.path()).unwrap();
        assert_eq!(data.products().len(), 3);
        assert_eq!(data.products()[0].name, "The Matrix");
        assert_eq!(data.products()[0].unit_price, "14.99".parse().unwrap());
        assert_eq!(data.products()[1].code, 25195112);
    }

    #[test]
    fn trailing_semicolon_stays_part_of_code_field() {
        // splitn(3) keeps everything after the second separator in the code
        // field; a trailing separator therefore makes the row malformed.
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "first_names.txt", "alice\n");
        write_file(dir.path(), "last_names.txt", "smith\n");
        write_file(dir.path(), "products.csv", "Heat;12.00;123;\n");

        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, RefDataError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn malformed_row_fails_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "first_names.txt", "alice\n");
        write_file(dir.path(), "last_names.txt", "smith\n");
        write_file(
            dir.path(),
            "products.csv",
            "The Matrix;14.99;883929106\nno separators here\n",
        );

        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, RefDataError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn bad_price_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "first_names.txt", "alice\n");
        write_file(dir.path(), "last_names.txt", "smith\n");
        write_file(dir.path(), "products.csv", "The Matrix;not-a-price;1\n");

        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, RefDataError::MalformedRow { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReferenceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, RefDataError::Io { .. }));
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = ReferenceData::from_parts(vec![], vec!["Smith".into()], vec![]).unwrap_err();
        assert!(matches!(err, RefDataError::EmptyTable(_)));
    }
}
