use crate::error::{ReferenceError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use tariff_vector_store::ReferenceRecord;

/// One reference-data catalog: fetch location, content field, and parsing.
///
/// The shared fetch/rebuild/drop lifecycle lives in
/// [`CodeResolver`](crate::CodeResolver); each source only specializes the
/// URL, the embedded field, and how the delivered document maps to records.
pub trait ReferenceSource: Send + Sync {
    /// Index table name; also names the on-disk snapshot.
    fn table_name(&self) -> &str;

    /// Key under which the catalog schema is persisted in the system store.
    fn metadata_key(&self) -> &str;

    fn catalog_url(&self) -> String;

    /// The field whose value is embedded; all other fields become filterable
    /// attributes.
    fn content_field(&self) -> &str;

    fn parse_catalog(&self, body: &str) -> Result<Vec<ReferenceRecord>>;
}

/// Parse the repeated `row_element` elements of a WITS-style XML document
/// into flat rows. Element attributes and child-element text both become
/// columns; namespace prefixes (`wits:`) are stripped from every name.
pub(crate) fn parse_rows(body: &str, row_element: &str) -> Result<Vec<BTreeMap<String, String>>> {
    // WITS serves documents with a UTF-8 BOM.
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);

    let mut reader = Reader::from_str(body);
    let mut rows = Vec::new();
    let mut current: Option<BTreeMap<String, String>> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = strip_prefix(start.name().as_ref());
                if current.is_none() && name == row_element {
                    current = Some(collect_attributes(&start)?);
                } else if current.is_some() {
                    field = Some(name);
                }
            }
            Ok(Event::Empty(start)) => {
                let name = strip_prefix(start.name().as_ref());
                if current.is_none() && name == row_element {
                    rows.push(collect_attributes(&start)?);
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(row), Some(field)) = (current.as_mut(), field.as_ref()) {
                    let value = text
                        .unescape()
                        .map_err(|err| ReferenceError::ParseFailed(err.to_string()))?;
                    let value = value.trim();
                    if !value.is_empty() {
                        row.insert(field.clone(), value.to_string());
                    }
                }
            }
            Ok(Event::End(end)) => {
                let name = strip_prefix(end.name().as_ref());
                if name == row_element {
                    if let Some(row) = current.take() {
                        rows.push(row);
                    }
                } else if field.as_deref() == Some(name.as_str()) {
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(ReferenceError::ParseFailed(format!(
                    "invalid XML at position {}: {err}",
                    reader.buffer_position()
                )))
            }
            Ok(_) => {}
        }
    }

    Ok(rows)
}

/// Turn parsed rows into records embedding `content_field`. Rows without the
/// content field cannot be embedded and are skipped.
pub(crate) fn rows_to_records(
    rows: Vec<BTreeMap<String, String>>,
    content_field: &str,
) -> Vec<ReferenceRecord> {
    let mut skipped = 0usize;
    let records: Vec<ReferenceRecord> = rows
        .into_iter()
        .filter_map(|mut row| match row.remove(content_field) {
            Some(text) => Some(ReferenceRecord {
                text,
                attributes: row,
            }),
            None => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        log::debug!("Skipped {skipped} catalog rows without '{content_field}'");
    }
    records
}

fn strip_prefix(name: &[u8]) -> String {
    let local = match name.iter().rposition(|b| *b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    String::from_utf8_lossy(local).into_owned()
}

fn collect_attributes(start: &quick_xml::events::BytesStart<'_>) -> Result<BTreeMap<String, String>> {
    let mut row = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ReferenceError::ParseFailed(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| ReferenceError::ParseFailed(err.to_string()))?;
        row.insert(strip_prefix(attr.key.as_ref()), value.into_owned());
    }
    Ok(row)
}
