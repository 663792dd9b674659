use order_relay_core::routing::PersistedRecord;

pub trait ItemStore {
    /// Writes the full record, replacing any record with the same key.
    fn put_item(&self, table: &str, record: &PersistedRecord) -> Result<(), String>;

    fn get_item(&self, table: &str, key: &PersistedRecord)
        -> Result<Option<PersistedRecord>, String>;
}
