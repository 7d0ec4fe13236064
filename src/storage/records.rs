//=========================================================================
// Record Serializer
//=========================================================================
//
// Saves a list of records as JSON payloads inside a small XML container:
//
//   <?xml version="1.0" encoding="UTF-8"?>
//   <group name="slot-1" time="2026-10-18 14:03:11" count="2">
//     <unit id="0">{"level":3,"score":120}</unit>
//     <unit id="1">{"level":4,"score":80}</unit>
//   </group>
//
// Loading validates the element names and that `count` equals the
// number of `unit` children. Payloads come back as generic JSON values;
// `SaveData::records_as` turns them into typed records.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

//=== Internal Dependencies ===============================================

use crate::error::StorageError;

//=== Format Constants ====================================================

const ROOT_ELEMENT: &str = "group";
const CHILD_ELEMENT: &str = "unit";
const ROOT_NAME: &str = "name";
const ROOT_TIME: &str = "time";
const ROOT_COUNT: &str = "count";
const CHILD_ID: &str = "id";

/// Format of the `time` attribute, local wall-clock time.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

//=== SaveData ============================================================

/// Contents of a loaded save document.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveData {
    pub name: String,
    pub time: String,
    pub count: usize,
    pub records: Vec<Value>,
    /// The document text as it was read.
    pub representation: String,
}

impl SaveData {
    /// Deserializes every payload as an `R`.
    pub fn records_as<R: DeserializeOwned>(&self) -> Result<Vec<R>, StorageError> {
        self.records
            .iter()
            .map(|value| serde_json::from_value(value.clone()).map_err(StorageError::from))
            .collect()
    }
}

//=== RecordSerializer ====================================================

/// Writes and reads named save documents.
#[derive(Debug, Clone)]
pub struct RecordSerializer {
    name: String,
}

impl RecordSerializer {
    /// Creates a serializer for documents called `name`.
    pub fn new(name: &str) -> Result<Self, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::format("data name is not empty"));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    //--- Saving -----------------------------------------------------------

    /// Serializes `records` into a save document.
    pub fn save<R: Serialize>(&self, records: &[R]) -> Result<String, StorageError> {
        let time = chrono::Local::now().format(TIME_FORMAT).to_string();
        let count = records.len().to_string();

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let root = BytesStart::new(ROOT_ELEMENT).with_attributes([
            (ROOT_NAME, self.name.as_str()),
            (ROOT_TIME, time.as_str()),
            (ROOT_COUNT, count.as_str()),
        ]);
        writer.write_event(Event::Start(root))?;

        for (id, record) in records.iter().enumerate() {
            let payload = serde_json::to_string(record)?;
            let id = id.to_string();

            let unit = BytesStart::new(CHILD_ELEMENT).with_attributes([(CHILD_ID, id.as_str())]);
            writer.write_event(Event::Start(unit))?;
            writer.write_event(Event::Text(BytesText::new(&payload)))?;
            writer.write_event(Event::End(BytesEnd::new(CHILD_ELEMENT)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

        debug!(
            target: "stagehand::storage",
            "Saved {} records as {}",
            records.len(),
            self.name
        );
        String::from_utf8(writer.into_inner())
            .map_err(|_| StorageError::format("document is valid UTF-8"))
    }

    /// Saves `records` to `path`, replacing the file.
    pub fn save_to_file<R: Serialize>(
        &self,
        path: impl AsRef<Path>,
        records: &[R],
    ) -> Result<(), StorageError> {
        let document = self.save(records)?;
        fs::write(path.as_ref(), document)?;
        Ok(())
    }

    //--- Loading ----------------------------------------------------------

    /// Parses a save document.
    pub fn load(text: &str) -> Result<SaveData, StorageError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut header: Option<Header> = None;
        let mut unit: Option<String> = None;
        let mut closed = false;
        let mut records = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    if header.is_none() {
                        header = Some(Header::read(&element)?);
                    } else {
                        expect_unit(&element, closed || unit.is_some(), records.len())?;
                        unit = Some(String::new());
                    }
                }
                Event::Empty(element) => {
                    if header.is_none() {
                        header = Some(Header::read(&element)?);
                        closed = true;
                    } else {
                        expect_unit(&element, closed || unit.is_some(), records.len())?;
                        return Err(StorageError::format("unit has a payload"));
                    }
                }
                Event::Text(text) => {
                    if let Some(body) = unit.as_mut() {
                        body.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(body) = unit.as_mut() {
                        let payload = std::str::from_utf8(&data)
                            .map_err(|_| StorageError::format("unit payload is valid UTF-8"))?;
                        body.push_str(payload);
                    }
                }
                Event::End(_) => match unit.take() {
                    Some(body) => records.push(serde_json::from_str(&body)?),
                    None => closed = true,
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let header = header.ok_or_else(|| StorageError::format("document has a root element"))?;
        if !closed {
            return Err(StorageError::format("root element is closed"));
        }
        if header.count != records.len() {
            return Err(StorageError::format(format!(
                "count {} matches the {} units present",
                header.count,
                records.len()
            )));
        }

        debug!(
            target: "stagehand::storage",
            "Loaded {} records from {}",
            records.len(),
            header.name
        );
        Ok(SaveData {
            name: header.name,
            time: header.time,
            count: header.count,
            records,
            representation: text.to_string(),
        })
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<SaveData, StorageError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::load(&text)
    }
}

//=== Parsing Helpers =====================================================

struct Header {
    name: String,
    time: String,
    count: usize,
}

impl Header {
    fn read(element: &BytesStart<'_>) -> Result<Self, StorageError> {
        if element.name().as_ref() != ROOT_ELEMENT.as_bytes() {
            return Err(StorageError::format("root element is group"));
        }

        let count = attribute(element, ROOT_ELEMENT, ROOT_COUNT)?;
        Ok(Self {
            name: attribute(element, ROOT_ELEMENT, ROOT_NAME)?,
            time: attribute(element, ROOT_ELEMENT, ROOT_TIME)?,
            count: count
                .trim()
                .parse()
                .map_err(|_| StorageError::format(format!("count '{}' is a number", count)))?,
        })
    }
}

/// Checks a `unit` element sits directly under the root and carries its
/// position as `id`.
fn expect_unit(
    element: &BytesStart<'_>,
    misplaced: bool,
    position: usize,
) -> Result<(), StorageError> {
    if misplaced || element.name().as_ref() != CHILD_ELEMENT.as_bytes() {
        return Err(StorageError::format("child element is unit"));
    }

    let id = attribute(element, CHILD_ELEMENT, CHILD_ID)?;
    match id.trim().parse::<usize>() {
        Ok(id) if id == position => Ok(()),
        _ => Err(StorageError::format(format!(
            "unit id '{}' matches its position {}",
            id, position
        ))),
    }
}

fn attribute(element: &BytesStart<'_>, owner: &str, name: &str) -> Result<String, StorageError> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(attr.unescape_value()?.into_owned()),
        None => Err(StorageError::format(format!("{} has attribute {}", owner, name))),
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Progress {
        level: i32,
        score: i64,
        cleared: bool,
        note: String,
    }

    fn progress(level: i32, note: &str) -> Progress {
        Progress {
            level,
            score: level as i64 * 40,
            cleared: level % 2 == 0,
            note: note.to_string(),
        }
    }

    fn format_reason(err: StorageError) -> String {
        match err {
            StorageError::Format { reason } => reason,
            other => panic!("expected a format error, got {}", other),
        }
    }

    //=====================================================================
    // Save Tests
    //=====================================================================

    #[test]
    fn save_writes_group_with_units() {
        let serializer = RecordSerializer::new("slot-1").unwrap();
        let text = serializer
            .save(&[progress(1, "start"), progress(2, "cave")])
            .unwrap();

        assert!(text.contains("<group name=\"slot-1\""));
        assert!(text.contains("count=\"2\""));
        assert!(text.contains("<unit id=\"0\">"));
        assert!(text.contains("<unit id=\"1\">"));
        assert!(text.trim_end().ends_with("</group>"));
    }

    #[test]
    fn save_stamps_local_time() {
        let serializer = RecordSerializer::new("slot").unwrap();
        let data = RecordSerializer::load(&serializer.save::<Progress>(&[]).unwrap()).unwrap();

        assert!(chrono::NaiveDateTime::parse_from_str(&data.time, TIME_FORMAT).is_ok());
    }

    #[test]
    fn data_name_is_required() {
        let err = RecordSerializer::new("   ").unwrap_err();
        assert_eq!(format_reason(err), "data name is not empty");
    }

    //=====================================================================
    // Load Tests
    //=====================================================================

    #[test]
    fn load_restores_saved_records() {
        let records = vec![
            progress(3, "a <tag> & \"quotes\""),
            progress(4, ""),
            progress(5, "line\nbreak"),
        ];
        let text = RecordSerializer::new("slot").unwrap().save(&records).unwrap();

        let data = RecordSerializer::load(&text).unwrap();

        assert_eq!(data.name, "slot");
        assert_eq!(data.count, 3);
        assert_eq!(data.records.len(), 3);
        assert_eq!(data.records[0]["level"], 3);
        assert_eq!(data.representation, text);
        assert_eq!(data.records_as::<Progress>().unwrap(), records);
    }

    #[test]
    fn empty_group_loads() {
        let data = RecordSerializer::load(r#"<group name="n" time="t" count="0"/>"#).unwrap();
        assert_eq!(data.count, 0);
        assert!(data.records.is_empty());
    }

    #[test]
    fn count_must_match_units() {
        let text = r#"<group name="n" time="t" count="2"><unit id="0">{"a":1}</unit></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert!(reason.starts_with("count 2 matches"), "{}", reason);
    }

    #[test]
    fn root_must_be_group() {
        let text = r#"<name name="n" time="t" count="0"></name>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "root element is group");
    }

    #[test]
    fn children_must_be_units() {
        let text = r#"<group name="n" time="t" count="1"><item id="0">{}</item></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "child element is unit");
    }

    #[test]
    fn root_attributes_are_required() {
        let text = r#"<group name="n" count="0"></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "root has attribute time");

        let text = r#"<group name="n" time="t" count="many"></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "count 'many' is a number");
    }

    #[test]
    fn unit_ids_follow_unit_order() {
        let text = r#"<group name="n" time="t" count="1"><unit>{}</unit></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "unit has attribute id");

        let text = r#"<group name="n" time="t" count="2"><unit id="0">1</unit><unit id="0">2</unit></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "unit id '0' matches its position 1");

        let text = r#"<group name="n" time="t" count="1"><unit id="first">1</unit></group>"#;
        let reason = format_reason(RecordSerializer::load(text).unwrap_err());
        assert_eq!(reason, "unit id 'first' matches its position 0");
    }

    #[test]
    fn cdata_payload_loads() {
        let text = r#"<group name="n" time="t" count="1"><unit id="0"><![CDATA[{"level":2,"score":9,"cleared":true,"note":"<b> & co"}]]></unit></group>"#;
        let data = RecordSerializer::load(text).unwrap();

        let records: Vec<Progress> = data.records_as().unwrap();
        assert_eq!(records[0].note, "<b> & co");
        assert_eq!(records[0].level, 2);
    }

    #[test]
    fn malformed_payload_is_a_json_error() {
        let text = r#"<group name="n" time="t" count="1"><unit id="0">{level:}</unit></group>"#;
        assert!(matches!(
            RecordSerializer::load(text),
            Err(StorageError::Json(_))
        ));
    }

    #[test]
    fn empty_document_has_no_root() {
        let reason = format_reason(RecordSerializer::load("").unwrap_err());
        assert_eq!(reason, "document has a root element");
    }

    //=====================================================================
    // File Tests
    //=====================================================================

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "stagehand-records-{}.xml",
            std::process::id()
        ));
        let serializer = RecordSerializer::new("file").unwrap();

        serializer.save_to_file(&path, &[progress(7, "saved")]).unwrap();
        let data = RecordSerializer::load_file(&path).unwrap();

        assert_eq!(data.name, "file");
        assert_eq!(data.records_as::<Progress>().unwrap(), vec![progress(7, "saved")]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = RecordSerializer::load_file("/nonexistent/stagehand/save.xml");
        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
