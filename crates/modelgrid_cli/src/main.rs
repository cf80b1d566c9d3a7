//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `modelgrid_core` wiring: open an
//!   in-memory database, map a model, round-trip a few rows.
//! - Keep output deterministic for quick local sanity checks.

use modelgrid_core::db::open_db_in_memory;
use modelgrid_core::{
    DatabaseKind, IdAllocator, Model, ModelId, ModelRepository, RepoError, RepoResult,
    RowMapper, SqlRepository, SqlRow, SqlTable, SqlType, IDENTIFIER_COLUMN,
};

#[derive(Debug, Clone)]
struct Contact {
    identifier: ModelId,
    name: String,
}

impl Model for Contact {
    fn identifier(&self) -> ModelId {
        self.identifier
    }

    fn copy_from(&mut self, source: &Self) {
        self.identifier = source.identifier;
        self.name = source.name.clone();
    }
}

struct ContactMapper;

impl RowMapper<Contact> for ContactMapper {
    fn write_row(&self, table: &mut SqlTable, item: &Contact) {
        table.set_value("name", item.name.as_str());
    }

    fn read_row(&self, row: &SqlRow) -> RepoResult<Contact> {
        let identifier = row
            .unsigned(IDENTIFIER_COLUMN)
            .ok_or_else(|| RepoError::InvalidData("contact row without identifier".to_string()))?;
        Ok(Contact {
            identifier,
            name: row.text("name").unwrap_or_default().to_string(),
        })
    }
}

fn run() -> RepoResult<()> {
    let template = SqlTable::new("contacts")
        .primary_key_column(IDENTIFIER_COLUMN, SqlType::Integer)
        .column("name", SqlType::Text);
    let store = SqlRepository::new(DatabaseKind::Sqlite, open_db_in_memory()?, template)?;
    let repository = ModelRepository::new(store, ContactMapper);
    repository.check_database()?;

    let allocator = IdAllocator::new();
    for name in ["ada", "grace", "edsger"] {
        repository.insert(&Contact {
            identifier: allocator.next(),
            name: name.to_string(),
        })?;
    }

    for contact in repository.select()? {
        println!("contact id={} name={}", contact.identifier(), contact.name);
    }
    Ok(())
}

fn main() {
    println!("modelgrid_core version={}", modelgrid_core::core_version());
    if let Err(err) = run() {
        eprintln!("smoke run failed: {err}");
        std::process::exit(1);
    }
    println!("smoke run ok");
}
