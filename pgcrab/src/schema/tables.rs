//! Baseline table definitions
//!
//! Every table pgcrab touches is a variant of [`BaselineTable`]. Statements
//! are constants looked up per variant, so table identifiers never come from
//! caller-supplied text.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A table belonging to the baseline schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaselineTable {
    Roles,
    Users,
    Changelog,
    InstallationStep,
}

impl BaselineTable {
    /// Every baseline table, in an order that satisfies foreign keys
    pub const ALL: [BaselineTable; 4] = [
        BaselineTable::Roles,
        BaselineTable::Users,
        BaselineTable::Changelog,
        BaselineTable::InstallationStep,
    ];

    /// Table name as it exists in the database
    pub fn name(self) -> &'static str {
        match self {
            BaselineTable::Roles => "roles",
            BaselineTable::Users => "users",
            BaselineTable::Changelog => "changelog",
            BaselineTable::InstallationStep => "installationstep",
        }
    }

    /// Statements creating the table and its secondary indexes
    pub fn create_statements(self) -> &'static [&'static str] {
        match self {
            BaselineTable::Roles => &[CREATE_ROLES],
            BaselineTable::Users => &[CREATE_USERS],
            BaselineTable::Changelog => &[CREATE_CHANGELOG],
            BaselineTable::InstallationStep => {
                &[CREATE_INSTALLATIONSTEP, CREATE_INSTALLATIONSTEP_PRIORITY_INDEX]
            }
        }
    }

    /// Cascading conditional drop
    pub fn drop_statement(self) -> &'static str {
        match self {
            BaselineTable::Roles => "DROP TABLE IF EXISTS roles CASCADE",
            BaselineTable::Users => "DROP TABLE IF EXISTS users CASCADE",
            BaselineTable::Changelog => "DROP TABLE IF EXISTS changelog CASCADE",
            BaselineTable::InstallationStep => "DROP TABLE IF EXISTS installationstep CASCADE",
        }
    }

    /// GRANT ALL on this table; `principal` must already be a validated identifier
    pub fn grant_statement(self, principal: &str) -> String {
        format!("GRANT ALL ON TABLE {} TO {}", self.name(), principal)
    }
}

impl fmt::Display for BaselineTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BaselineTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BaselineTable::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}

const CREATE_ROLES: &str = "
    CREATE TABLE IF NOT EXISTS roles (
        id serial PRIMARY KEY,
        name VARCHAR(64) UNIQUE,
        isdefault BOOLEAN DEFAULT FALSE,
        permissions INTEGER
    )";

const CREATE_USERS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id serial PRIMARY KEY,
        email VARCHAR(64) UNIQUE,
        username VARCHAR(64) UNIQUE,
        password_hash VARCHAR(128),
        role_id INTEGER REFERENCES roles(id)
    )";

const CREATE_CHANGELOG: &str = "
    CREATE TABLE IF NOT EXISTS changelog (
        id serial PRIMARY KEY,
        major VARCHAR(2),
        minor VARCHAR(2),
        patch VARCHAR(4),
        name VARCHAR(100) UNIQUE,
        applied TIMESTAMP
    )";

const CREATE_INSTALLATIONSTEP: &str = "
    CREATE TABLE IF NOT EXISTS installationstep (
        id serial PRIMARY KEY,
        name VARCHAR(32) UNIQUE,
        display_name VARCHAR(64),
        priority INTEGER
    )";

const CREATE_INSTALLATIONSTEP_PRIORITY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS priority_ind ON installationstep (priority)";
