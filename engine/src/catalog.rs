use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/400x600?text=No+Image";

/// A raw catalog record as it appears in a source file. Every field but the id is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    pub item_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One catalog entry. `content` is derived from title, genres and description and is
/// rebuilt by every setter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    item_id: i64,
    title: String,
    genres: String,
    description: String,
    image_url: String,
    #[serde(skip)]
    content: String,
}

impl CatalogItem {
    pub fn new(
        item_id: i64,
        title: impl Into<String>,
        genres: impl Into<String>,
        description: impl Into<String>,
        image_url: Option<String>,
    ) -> Self {
        let mut item = Self {
            item_id,
            title: title.into(),
            genres: genres.into(),
            description: description.into(),
            image_url: image_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            content: String::new(),
        };
        item.rebuild_content();
        item
    }

    fn rebuild_content(&mut self) {
        self.content = format!("{} {} {}", self.title, self.genres, self.description);
    }

    pub fn item_id(&self) -> i64 { self.item_id }
    pub fn title(&self) -> &str { &self.title }
    pub fn genres(&self) -> &str { &self.genres }
    pub fn description(&self) -> &str { &self.description }
    pub fn image_url(&self) -> &str { &self.image_url }
    pub fn content(&self) -> &str { &self.content }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.rebuild_content();
    }

    pub fn set_genres(&mut self, genres: impl Into<String>) {
        self.genres = genres.into();
        self.rebuild_content();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.rebuild_content();
    }
}

/// Ordered catalog. An item's position is its index in every parallel structure.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    items: Vec<CatalogItem>,
}

impl Corpus {
    pub fn new(items: Vec<CatalogItem>) -> Self { Self { items } }

    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn items(&self) -> &[CatalogItem] { &self.items }
    pub fn get(&self, position: usize) -> Option<&CatalogItem> { self.items.get(position) }

    /// First position carrying `item_id`; ids are not guaranteed unique.
    pub fn position_of_id(&self, item_id: i64) -> Option<usize> {
        self.items.iter().position(|it| it.item_id == item_id)
    }

    pub fn contents(&self) -> Vec<&str> {
        self.items.iter().map(|it| it.content()).collect()
    }
}

/// Normalize raw rows into a corpus. Missing text fields become empty strings.
pub fn load(rows: Vec<RawRow>) -> EngineResult<Corpus> {
    load_named("rows", rows)
}

fn load_named(source_name: &str, rows: Vec<RawRow>) -> EngineResult<Corpus> {
    let mut items = Vec::with_capacity(rows.len());
    for (n, row) in rows.into_iter().enumerate() {
        let item_id = row
            .item_id
            .ok_or_else(|| EngineError::schema(source_name, format!("row {n} has no item_id")))?;
        items.push(CatalogItem::new(
            item_id,
            row.title.unwrap_or_default(),
            row.genres.unwrap_or_default(),
            row.description.unwrap_or_default(),
            row.image_url,
        ));
    }
    Ok(Corpus::new(items))
}

/// Read a catalog file, choosing the parser by extension (`csv`, `jsonl`, `json`).
pub fn load_path(path: &Path) -> EngineResult<Corpus> {
    let name = path.display().to_string();
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    let rows = match ext.as_deref() {
        Some("csv") => read_csv(&name, File::open(path)?)?,
        Some("jsonl") => read_jsonl(&name, File::open(path)?)?,
        Some("json") => read_json(&name, File::open(path)?)?,
        _ => return Err(EngineError::UnsupportedFormat(path.to_path_buf())),
    };
    let corpus = load_named(&name, rows)?;
    tracing::debug!(path = %name, items = corpus.len(), "catalog loaded");
    Ok(corpus)
}

/// Parse CSV with a header row. The `item_id` column is mandatory.
pub fn read_csv<R: Read>(source_name: &str, reader: R) -> EngineResult<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if !headers.iter().any(|h| h.trim() == "item_id") {
        return Err(EngineError::schema(source_name, "missing required column item_id"));
    }
    let mut rows = Vec::new();
    for (n, record) in rdr.deserialize::<RawRow>().enumerate() {
        let row = record.map_err(|e| EngineError::schema(source_name, format!("row {n}: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse one JSON object per line; blank lines are skipped.
pub fn read_jsonl<R: Read>(source_name: &str, reader: R) -> EngineResult<Vec<RawRow>> {
    let mut rows = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let n = rows.len();
        let row: RawRow = serde_json::from_str(&line).map_err(|e| EngineError::schema(source_name, format!("row {n}: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a JSON array of objects.
pub fn read_json<R: Read>(source_name: &str, reader: R) -> EngineResult<Vec<RawRow>> {
    let values: Vec<serde_json::Value> = serde_json::from_reader(BufReader::new(reader))?;
    values
        .into_iter()
        .enumerate()
        .map(|(n, v)| {
            serde_json::from_value(v).map_err(|e| EngineError::schema(source_name, format!("row {n}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_follows_fields() {
        let mut item = CatalogItem::new(1, "Naruto", "Action|Adventure", "A ninja.", None);
        assert_eq!(item.content(), "Naruto Action|Adventure A ninja.");
        assert_eq!(item.image_url(), PLACEHOLDER_IMAGE_URL);
        item.set_genres("Comedy");
        assert_eq!(item.content(), "Naruto Comedy A ninja.");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let corpus = load(vec![RawRow { item_id: Some(7), ..Default::default() }]).unwrap();
        let item = corpus.get(0).unwrap();
        assert_eq!(item.title(), "");
        assert_eq!(item.content(), "  ");
    }

    #[test]
    fn missing_id_is_schema_error() {
        let err = load(vec![RawRow::default()]).unwrap_err();
        assert!(matches!(err, EngineError::Schema { .. }));
    }

    #[test]
    fn csv_without_item_id_column_is_rejected() {
        let data = "title,genres\nNaruto,Action\n";
        let err = read_csv("inline", data.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::Schema { .. }));
    }

    #[test]
    fn csv_empty_cells_become_empty_fields() {
        let data = "item_id,title,genres,description\n5,Bleach,,\n";
        let corpus = load(read_csv("inline", data.as_bytes()).unwrap()).unwrap();
        assert_eq!(corpus.get(0).unwrap().content(), "Bleach  ");
    }

    #[test]
    fn json_rows_with_bad_ids_are_schema_errors() {
        let err = read_jsonl("inline", "{\"item_id\": 1}\n\n{\"item_id\": \"abc\"}\n".as_bytes()).unwrap_err();
        match err {
            EngineError::Schema { message, .. } => assert!(message.starts_with("row 1:"), "{message}"),
            other => panic!("expected schema error, got {other:?}"),
        }
        let err = read_json("inline", r#"[{"item_id": 2}, {"item_id": 3.5}]"#.as_bytes()).unwrap_err();
        assert!(matches!(err, EngineError::Schema { ref message, .. } if message.starts_with("row 1:")));
        let rows = read_json("inline", r#"[{"title": "no id"}]"#.as_bytes()).unwrap();
        assert!(matches!(load(rows), Err(EngineError::Schema { .. })));
    }

    #[test]
    fn first_position_wins_for_duplicate_ids() {
        let corpus = Corpus::new(vec![
            CatalogItem::new(3, "a", "", "", None),
            CatalogItem::new(9, "b", "", "", None),
            CatalogItem::new(9, "c", "", "", None),
        ]);
        assert_eq!(corpus.position_of_id(9), Some(1));
        assert_eq!(corpus.position_of_id(4), None);
    }
}
