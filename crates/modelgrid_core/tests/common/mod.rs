//! Shared fixtures: a flat `Person` model, a dependent `Phone` model and
//! their row mappers over in-memory SQLite.

#![allow(dead_code)]

use modelgrid_core::{
    DatabaseKind, DependentModel, IdAllocator, Model, ModelId, ModelRepository, ParentScope,
    RepoError, RepoResult, RowMapper, SqlRepository, SqlRow, SqlTable, SqlType,
    IDENTIFIER_COLUMN,
};
use rusqlite::Connection;
use std::time::{Duration, Instant};

pub const PERSON_TABLE: &str = "people";
pub const PHONE_TABLE: &str = "phones";
pub const PHONE_PARENT_COLUMN: &str = "person_identifier";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub identifier: ModelId,
    pub name: String,
    pub email: Option<String>,
}

impl Person {
    pub fn new(allocator: &IdAllocator, name: &str) -> Self {
        Self::with_id(allocator.next(), name)
    }

    pub fn with_id(identifier: ModelId, name: &str) -> Self {
        Self {
            identifier,
            name: name.to_string(),
            email: None,
        }
    }
}

impl Model for Person {
    fn identifier(&self) -> ModelId {
        self.identifier
    }

    fn copy_from(&mut self, source: &Self) {
        self.identifier = source.identifier;
        self.name = source.name.clone();
        self.email = source.email.clone();
    }
}

pub struct PersonMapper;

impl RowMapper<Person> for PersonMapper {
    fn write_row(&self, table: &mut SqlTable, item: &Person) {
        table.set_value("name", item.name.as_str());
        table.set_value("email", item.email.clone());
    }

    fn read_row(&self, row: &SqlRow) -> RepoResult<Person> {
        let identifier = row
            .unsigned(IDENTIFIER_COLUMN)
            .ok_or_else(|| RepoError::InvalidData("person row without identifier".to_string()))?;
        Ok(Person {
            identifier,
            name: row.text("name").unwrap_or_default().to_string(),
            email: row.text("email").map(str::to_string),
        })
    }
}

pub fn person_template() -> SqlTable {
    SqlTable::new(PERSON_TABLE)
        .primary_key_column(IDENTIFIER_COLUMN, SqlType::Integer)
        .column("name", SqlType::Text)
        .column("email", SqlType::Text)
}

pub fn person_repository(conn: Connection) -> ModelRepository<Person, PersonMapper> {
    let store = SqlRepository::new(DatabaseKind::Sqlite, conn, person_template())
        .expect("person template carries an identifier column");
    ModelRepository::new(store, PersonMapper)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phone {
    pub identifier: ModelId,
    pub parent_identifier: ModelId,
    pub number: String,
}

impl Phone {
    pub fn new(allocator: &IdAllocator, parent: ModelId, number: &str) -> Self {
        Self {
            identifier: allocator.next(),
            parent_identifier: parent,
            number: number.to_string(),
        }
    }
}

impl Model for Phone {
    fn identifier(&self) -> ModelId {
        self.identifier
    }

    fn copy_from(&mut self, source: &Self) {
        self.identifier = source.identifier;
        self.parent_identifier = source.parent_identifier;
        self.number = source.number.clone();
    }
}

impl DependentModel for Phone {
    fn parent_identifier(&self) -> ModelId {
        self.parent_identifier
    }

    fn set_parent_identifier(&mut self, parent: ModelId) {
        self.parent_identifier = parent;
    }
}

pub struct PhoneMapper;

impl RowMapper<Phone> for PhoneMapper {
    fn write_row(&self, table: &mut SqlTable, item: &Phone) {
        table.set_value(PHONE_PARENT_COLUMN, item.parent_identifier);
        table.set_value("number", item.number.as_str());
    }

    fn read_row(&self, row: &SqlRow) -> RepoResult<Phone> {
        let identifier = row
            .unsigned(IDENTIFIER_COLUMN)
            .ok_or_else(|| RepoError::InvalidData("phone row without identifier".to_string()))?;
        let parent_identifier = row.unsigned(PHONE_PARENT_COLUMN).ok_or_else(|| {
            RepoError::InvalidData("phone row without parent identifier".to_string())
        })?;
        Ok(Phone {
            identifier,
            parent_identifier,
            number: row.text("number").unwrap_or_default().to_string(),
        })
    }
}

pub fn phone_template() -> SqlTable {
    SqlTable::new(PHONE_TABLE)
        .primary_key_column(IDENTIFIER_COLUMN, SqlType::Integer)
        .column(PHONE_PARENT_COLUMN, SqlType::Integer)
        .column("number", SqlType::Text)
}

pub fn phone_repository(conn: Connection) -> ModelRepository<Phone, PhoneMapper> {
    let store = SqlRepository::new(DatabaseKind::Sqlite, conn, phone_template())
        .expect("phone template carries an identifier column");
    ModelRepository::with_parent_scope(store, PhoneMapper, ParentScope::new(PHONE_PARENT_COLUMN))
}

/// Polls `predicate` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}
