use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::schema::Schema;
use crate::storage::Record;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
}

/// Renders records under their schema's field names
pub struct RecordTable<'a> {
    schema: &'a Schema,
    records: Vec<Record>,
}

impl<'a> RecordTable<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn build(&self) -> String {
        if self.records.is_empty() {
            return String::new();
        }

        let mut builder = Builder::default();
        builder.push_record(self.schema.fields().iter().enumerate().map(|(i, f)| {
            if Some(i) == self.schema.key_index() {
                format!("{} (key)", f.name)
            } else {
                f.name.clone()
            }
        }));
        for record in &self.records {
            builder.push_record(record.iter().cloned());
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        table.to_string()
    }
}

pub fn stats_table(stats: &[(String, usize)]) -> String {
    let rows: Vec<TableRow> = stats
        .iter()
        .map(|(table, rows)| TableRow {
            table: table.clone(),
            rows: rows.to_string(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::catalog;

    #[test]
    fn test_record_table_lists_fields_and_values() {
        let schema = catalog::item_types().unwrap();
        let mut table = RecordTable::new(&schema);
        assert!(table.build().is_empty());

        table.add_record(vec!["flight".into(), "Air travel".into()]);
        let rendered = table.build();
        assert!(rendered.contains("typeName (key)"));
        assert!(rendered.contains("description"));
        assert!(rendered.contains("Air travel"));
    }

    #[test]
    fn test_stats_table() {
        let rendered = stats_table(&[("users".to_string(), 3)]);
        assert!(rendered.contains("users"));
        assert!(rendered.contains('3'));
    }
}
