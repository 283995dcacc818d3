//! Link record value type for partition tables.
//!
//! Provides encoding, decoding and `redb::Value` integration for the
//! immutable (id, short_code, original_value, created_at) record each
//! partition stores.

use std::time::{SystemTime, UNIX_EPOCH};

use redb::Value as RedbValue;

use super::StoreError;

/// One persisted link mapping.
///
/// Created once on insert and immutable thereafter; the storage engine has
/// no update or delete operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkRecord {
    /// Allocator-issued id, primary key of its partition
    pub id: u64,
    /// Base62 display code, unique within the partition
    pub short_code: String,
    /// The original value the code resolves to
    pub original_value: String,
    /// Creation time, seconds since the Unix epoch
    pub created_at: u64,
}

impl LinkRecord {
    /// Creates a record stamped with the current time.
    pub fn new(id: u64, short_code: &str, original_value: &str) -> Self {
        Self {
            id,
            short_code: short_code.to_string(),
            original_value: original_value.to_string(),
            created_at: now_secs(),
        }
    }

    /// Encodes the record into storage format.
    ///
    /// Layout: version byte, id (8 bytes BE), created_at (8 bytes BE), then
    /// the two strings each as a 4-byte BE length prefix plus UTF-8 bytes.
    pub fn encode(&self) -> Vec<u8> {
        let code = self.short_code.as_bytes();
        let value = self.original_value.as_bytes();

        let mut buf = Vec::with_capacity(1 + 8 + 8 + 4 + code.len() + 4 + value.len());
        buf.push(1u8); // Version byte
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.created_at.to_be_bytes());
        buf.extend_from_slice(&(code.len() as u32).to_be_bytes());
        buf.extend_from_slice(code);
        buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
        buf.extend_from_slice(value);
        buf
    }

    /// Decodes storage bytes into a record.
    pub fn decode(data: &[u8]) -> Result<Self, StoreError> {
        let invalid = |what: &str| StoreError::Backend(format!("invalid link record: {}", what));

        if data.is_empty() {
            return Err(invalid("empty data"));
        }
        if data[0] != 1 {
            return Err(invalid(&format!("unsupported version {}", data[0])));
        }

        let mut cursor = Cursor { data, pos: 1 };
        let id = cursor.read_u64().ok_or_else(|| invalid("truncated id"))?;
        let created_at = cursor
            .read_u64()
            .ok_or_else(|| invalid("truncated timestamp"))?;
        let short_code = cursor
            .read_string()
            .ok_or_else(|| invalid("truncated short code"))?;
        let original_value = cursor
            .read_string()
            .ok_or_else(|| invalid("truncated value"))?;

        Ok(Self {
            id,
            short_code,
            original_value,
            created_at,
        })
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, len: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.take(8)?;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len_bytes = self.take(4)?;
        let len = u32::from_be_bytes(len_bytes.try_into().ok()?) as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

impl RedbValue for LinkRecord {
    type SelfType<'a>
        = LinkRecord
    where
        Self: 'a;
    type AsBytes<'a>
        = Vec<u8>
    where
        Self: 'a;

    fn fixed_width() -> Option<usize> {
        None // Variable width serialization
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        LinkRecord::decode(data).unwrap_or_default()
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'b,
    {
        value.encode()
    }

    fn type_name() -> redb::TypeName {
        redb::TypeName::new("linkshard::LinkRecord")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let record = LinkRecord::new(100, "1c", "https://x");
        let decoded = LinkRecord::decode(&record.encode()).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_empty_strings_roundtrip() {
        let record = LinkRecord {
            id: 0,
            short_code: String::new(),
            original_value: String::new(),
            created_at: 0,
        };
        let decoded = LinkRecord::decode(&record.encode()).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_timestamp_is_set() {
        let record = LinkRecord::new(1, "1", "https://x");
        assert!(record.created_at > 0);
    }

    #[test]
    fn test_invalid_version_rejected() {
        let mut data = LinkRecord::new(1, "1", "https://x").encode();
        data[0] = 99;
        assert!(LinkRecord::decode(&data).is_err());
    }

    #[test]
    fn test_truncated_data_rejected() {
        let data = LinkRecord::new(1, "abc", "https://x").encode();
        for len in [0, 1, 8, 16, 20] {
            assert!(LinkRecord::decode(&data[..len]).is_err(), "len {}", len);
        }
    }
}
