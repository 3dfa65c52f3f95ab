use std::collections::HashSet;

use log::{info, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entry::{new_id, Entry};
use crate::storage::KeyValueSlot;

/// エントリー一覧を保存するキー。
pub const STORAGE_KEY: &str = "avspasering-entries";

/// 読み込み時に破棄されたレコードの理由。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record is not an object")]
    NotAnObject,
    #[error("required field {0} is missing")]
    MissingField(&'static str),
    #[error("field {0} has an unexpected type")]
    WrongType(&'static str),
    #[error("neither durationMinutes nor duration is present")]
    MissingDuration,
    #[error("duplicated id {0}")]
    DuplicateId(String),
    #[error("record could not be decoded: {0}")]
    Decode(String),
}

/// レコードごとの検証結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Valid(Entry),
    Dropped(MalformedRecord),
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    NonNegativeInteger,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::NonNegativeInteger => value.is_u64(),
        }
    }
}

/// 項目が存在しない、または型が異なる場合の扱い。
#[derive(Debug, Clone, Copy)]
enum Presence {
    /// レコードを破棄する。
    Required,
    /// 項目なしとして扱う。
    Optional,
    /// 空文字列とする。
    DefaultEmpty,
    /// 新しいIDを割り当てる。
    GeneratedId,
}

struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    presence: Presence,
}

const ENTRY_SCHEMA: [FieldRule; 9] = [
    FieldRule {
        name: "id",
        kind: FieldKind::Text,
        presence: Presence::GeneratedId,
    },
    FieldRule {
        name: "periodStart",
        kind: FieldKind::Text,
        presence: Presence::Optional,
    },
    FieldRule {
        name: "periodEnd",
        kind: FieldKind::Text,
        presence: Presence::Optional,
    },
    FieldRule {
        name: "durationMinutes",
        kind: FieldKind::NonNegativeInteger,
        presence: Presence::Optional,
    },
    FieldRule {
        name: "duration",
        kind: FieldKind::Text,
        presence: Presence::Optional,
    },
    FieldRule {
        name: "completion",
        kind: FieldKind::Text,
        presence: Presence::Required,
    },
    FieldRule {
        name: "fractionLabel",
        kind: FieldKind::Text,
        presence: Presence::DefaultEmpty,
    },
    FieldRule {
        name: "description",
        kind: FieldKind::Text,
        presence: Presence::DefaultEmpty,
    },
    FieldRule {
        name: "createdAt",
        kind: FieldKind::Text,
        presence: Presence::Optional,
    },
];

/// 保存されている1レコードを検証し、`Entry`に変換する。
///
/// スキーマにない項目は無視する。
pub fn validate_record(value: &Value) -> RecordOutcome {
    let Some(object) = value.as_object() else {
        return RecordOutcome::Dropped(MalformedRecord::NotAnObject);
    };

    let mut normalized = Map::new();
    for rule in &ENTRY_SCHEMA {
        match object.get(rule.name) {
            Some(field) if rule.kind.matches(field) => {
                normalized.insert(rule.name.to_string(), field.clone());
            }
            field => match rule.presence {
                Presence::Required if field.is_none() => {
                    return RecordOutcome::Dropped(MalformedRecord::MissingField(rule.name))
                }
                Presence::Required => {
                    return RecordOutcome::Dropped(MalformedRecord::WrongType(rule.name))
                }
                Presence::Optional => {}
                Presence::DefaultEmpty => {
                    normalized.insert(rule.name.to_string(), Value::String(String::new()));
                }
                Presence::GeneratedId => {
                    normalized.insert(rule.name.to_string(), Value::String(new_id()));
                }
            },
        }
    }
    if !normalized.contains_key("durationMinutes") && !normalized.contains_key("duration") {
        return RecordOutcome::Dropped(MalformedRecord::MissingDuration);
    }

    match serde_json::from_value(Value::Object(normalized)) {
        Ok(entry) => RecordOutcome::Valid(entry),
        Err(err) => RecordOutcome::Dropped(MalformedRecord::Decode(err.to_string())),
    }
}

/// 保存された値を解釈した結果。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedEntries {
    /// 検証を通過したエントリー。
    pub entries: Vec<Entry>,
    /// IDを持たず、新しいIDを割り当てたエントリーの数。
    pub assigned_ids: usize,
}

/// 保存された値を解釈し、検証を通過したエントリーの一覧を返す。
///
/// 値が存在しない、JSONとして不正、または配列でない場合は空の一覧を返す。
pub fn parse_entries(raw: Option<&str>) -> ParsedEntries {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return ParsedEntries::default();
    };
    let records = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            warn!("Stored entries are not a list, starting with an empty list");
            return ParsedEntries::default();
        }
        Err(err) => {
            warn!("Stored entries are not valid JSON ({}), starting with an empty list", err);
            return ParsedEntries::default();
        }
    };

    let mut parsed = ParsedEntries::default();
    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let outcome = match validate_record(record) {
            RecordOutcome::Valid(entry) if !seen.insert(entry.id.clone()) => {
                RecordOutcome::Dropped(MalformedRecord::DuplicateId(entry.id))
            }
            outcome => outcome,
        };
        match outcome {
            RecordOutcome::Valid(entry) => {
                if !record.get("id").is_some_and(Value::is_string) {
                    parsed.assigned_ids += 1;
                }
                parsed.entries.push(entry);
            }
            RecordOutcome::Dropped(reason) => {
                warn!("Dropped stored record at index {}: {}", index, reason);
            }
        }
    }

    parsed
}

/// エントリー一覧を保持し、変更のたびに永続化領域へ書き込む。
///
/// メモリ上の一覧が常に正であり、書き込みに失敗しても一覧は変更後の状態を保つ。
/// その場合、変更は次回の起動時には失われる。
pub struct EntryStore<S: KeyValueSlot> {
    slot: S,
    entries: Vec<Entry>,
}

impl<S: KeyValueSlot> EntryStore<S> {
    /// 永続化領域からエントリー一覧を読み込む。
    ///
    /// 読み込みに失敗した場合は空の一覧から開始し、エラーは返さない。
    /// IDを持たないレコードには新しいIDを割り当て、一覧を書き込む。
    ///
    /// # Arguments
    ///
    /// * `slot` - 永続化領域
    pub fn load(slot: S) -> Self {
        let raw = slot.read(STORAGE_KEY).unwrap_or_else(|err| {
            warn!("Failed to read stored entries: {}", err);
            None
        });
        let parsed = parse_entries(raw.as_deref());
        info!("Loaded {} entries", parsed.entries.len());

        let mut store = Self {
            slot,
            entries: parsed.entries,
        };
        // 割り当てたIDは次回以降の読み込みでも同じ値となるよう書き戻す
        if parsed.assigned_ids > 0 {
            info!("Assigned ids to {} stored entries", parsed.assigned_ids);
            store.persist();
        }

        store
    }

    /// 新しい順のエントリー一覧を返す。
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// エントリーを先頭に追加する。
    pub fn append(&mut self, entry: Entry) {
        info!("Append entry {}", entry.id);
        self.entries.insert(0, entry);
        self.persist();
    }

    /// 説明を更新する。該当するエントリーがない場合は何もせず`false`を返す。
    pub fn update_description(&mut self, id: &str, text: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        entry.description = text.to_string();
        self.persist();

        true
    }

    /// エントリーを削除する。該当するエントリーがない場合も一覧を書き込む。
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        self.persist();

        removed
    }

    /// 一覧全体を書き込む。失敗した場合はログに出力するのみとする。
    pub fn persist(&mut self) {
        let serialized = match serde_json::to_string(&self.entries) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("Failed to serialize entries: {}", err);
                return;
            }
        };
        if let Err(err) = self.slot.write(STORAGE_KEY, &serialized) {
            warn!(
                "Failed to save entries, changes are kept for this session only: {}",
                err
            );
        }
    }

    #[cfg(test)]
    pub fn into_slot(self) -> S {
        self.slot
    }
}
