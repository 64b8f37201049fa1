//! Simple single-file migration format
//!
//! This module implements a simple migration source for sqlx that loads all migrations from a single file,
//! which can be embedded into the binary.
//!
//! Every migration is marked by a line comment like  this:
//! ```text
//! --##1 initial schema
//! ```
//! The comment specifies the version (1) and description (initial schema).
//! Each following migration should increase the version by one.
use std::{borrow::Cow, future::Future, pin::Pin};

use sqlx::{
    error::BoxDynError,
    migrate::{Migration, MigrationSource, MigrationType},
};

#[derive(Debug)]
pub struct MigrationScript<'s> {
    data: &'s str,
}

struct PendingMigration {
    version: i64,
    description: String,
    sql: String,
}

fn parse_script(data: &str) -> Result<Vec<PendingMigration>, BoxDynError> {
    let mut result: Vec<PendingMigration> = Vec::new();

    for line in data.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix("--##") {
            let (version_str, description) = header.split_once(' ').unwrap_or((header, ""));
            let version = version_str.parse::<i64>().map_err(|e| {
                format!(
                    "cannot parse version of migration as int, got string '{}', error: {}",
                    version_str, e
                )
            })?;

            if let Some(previous) = result.last() {
                if previous.version >= version {
                    return Err(format!(
                        "migration versions must increase, got {} after {}",
                        version, previous.version
                    )
                    .into());
                }
            }

            result.push(PendingMigration {
                version,
                description: description.trim().to_owned(),
                sql: String::new(),
            });
            continue;
        }

        let migration = match result.last_mut() {
            Some(v) => v,
            None => {
                // allow comments at beginning of file
                if line.starts_with("--") {
                    continue;
                }
                return Err(format!(
                    "migration script does not start with migration header, got: {}",
                    line
                )
                .into());
            }
        };
        migration.sql.push_str(line);
        migration.sql.push('\n');
    }

    Ok(result)
}

impl<'s> MigrationSource<'s> for MigrationScript<'s> {
    fn resolve(
        self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Migration>, BoxDynError>> + Send + 's>> {
        Box::pin(async move {
            Ok(parse_script(self.data)?
                .into_iter()
                .map(|m| {
                    Migration::new(
                        m.version,
                        Cow::Owned(m.description),
                        MigrationType::Simple,
                        Cow::Owned(m.sql),
                    )
                })
                .collect())
        })
    }
}

pub fn postgresql_migrations() -> MigrationScript<'static> {
    MigrationScript {
        data: include_str!("./sql/migrations.pg.sql"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "-- leading comment\n\
                      --##1 initial schema\n\
                      CREATE TABLE a (id INT);\n\
                      \n\
                      --##2 second\n\
                      CREATE TABLE b (id INT);\n";

        let migrations = parse_script(script).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[0].description, "initial schema");
        assert_eq!(migrations[0].sql, "CREATE TABLE a (id INT);\n");
        assert_eq!(migrations[1].version, 2);
        assert_eq!(migrations[1].sql, "CREATE TABLE b (id INT);\n");
    }

    #[test]
    fn test_parse_script_requires_header() {
        assert!(parse_script("CREATE TABLE a (id INT);").is_err());
    }

    #[test]
    fn test_parse_script_rejects_bad_versions() {
        assert!(parse_script("--##one initial\nSELECT 1;").is_err());
        assert!(parse_script("--##2 a\nSELECT 1;\n--##1 b\nSELECT 1;").is_err());
    }

    #[test]
    fn test_embedded_script_parses() {
        let migrations = parse_script(postgresql_migrations().data).unwrap();
        assert!(!migrations.is_empty());
        assert_eq!(migrations[0].version, 1);
    }
}
