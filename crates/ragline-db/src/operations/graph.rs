//! Knowledge graph storage: entities, relations and the chunks that mention them.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use ragline_core::{ChunkId, Entity, Relation};
use rusqlite::{params, OptionalExtension, Row};

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<(Entity, String, String)> {
    let source_ids: String = row.get(3)?;
    let file_paths: String = row.get(4)?;
    let entity = Entity {
        name: row.get(0)?,
        entity_type: row.get(1)?,
        description: row.get(2)?,
        source_ids: Vec::new(),
        file_paths: Vec::new(),
    };
    Ok((entity, source_ids, file_paths))
}

fn decode_entity((mut entity, source_ids, file_paths): (Entity, String, String)) -> DbResult<Entity> {
    entity.source_ids = serde_json::from_str(&source_ids)?;
    entity.file_paths = serde_json::from_str(&file_paths)?;
    Ok(entity)
}

fn relation_from_row(row: &Row<'_>) -> rusqlite::Result<(Relation, String, String)> {
    let source_ids: String = row.get(5)?;
    let file_paths: String = row.get(6)?;
    let relation = Relation {
        source: row.get(0)?,
        target: row.get(1)?,
        keywords: row.get(2)?,
        description: row.get(3)?,
        weight: row.get(4)?,
        source_ids: Vec::new(),
        file_paths: Vec::new(),
    };
    Ok((relation, source_ids, file_paths))
}

fn decode_relation(
    (mut relation, source_ids, file_paths): (Relation, String, String),
) -> DbResult<Relation> {
    relation.source_ids = serde_json::from_str(&source_ids)?;
    relation.file_paths = serde_json::from_str(&file_paths)?;
    Ok(relation)
}

impl Database {
    /// Get an entity by its normalized name.
    pub fn get_entity(&self, name: &str) -> DbResult<Option<Entity>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT name, entity_type, description, source_ids, file_paths
                 FROM entities WHERE name = ?1",
                params![name],
                entity_from_row,
            )
            .optional()?;

        row.map(decode_entity).transpose()
    }

    /// Write an entity (replacing any previous version) and index its source chunks.
    pub fn put_entity(&self, entity: &Entity) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO entities (name, entity_type, description, source_ids, file_paths)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(name) DO UPDATE SET
                entity_type = excluded.entity_type,
                description = excluded.description,
                source_ids = excluded.source_ids,
                file_paths = excluded.file_paths
            "#,
            params![
                entity.name,
                entity.entity_type,
                entity.description,
                serde_json::to_string(&entity.source_ids)?,
                serde_json::to_string(&entity.file_paths)?,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO entity_chunks (entity_name, chunk_id) VALUES (?1, ?2)",
            )?;
            for chunk_id in &entity.source_ids {
                stmt.execute(params![entity.name, chunk_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get the relation between two entities, in either direction.
    pub fn get_relation(&self, a: &str, b: &str) -> DbResult<Option<Relation>> {
        let (source, target) = Relation::ordered_key(a, b);
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT source, target, keywords, description, weight, source_ids, file_paths
                 FROM relations WHERE source = ?1 AND target = ?2",
                params![source, target],
                relation_from_row,
            )
            .optional()?;

        row.map(decode_relation).transpose()
    }

    /// Write a relation, replacing any previous version.
    pub fn put_relation(&self, relation: &Relation) -> DbResult<()> {
        let (source, target) = Relation::ordered_key(&relation.source, &relation.target);
        if source == target {
            return Err(DbError::Other(format!("self-relation on {}", source)));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO relations
                (source, target, keywords, description, weight, source_ids, file_paths)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                source,
                target,
                relation.keywords,
                relation.description,
                relation.weight,
                serde_json::to_string(&relation.source_ids)?,
                serde_json::to_string(&relation.file_paths)?,
            ],
        )?;
        Ok(())
    }

    /// Entities mentioned by any of the given chunks.
    pub fn entities_for_chunks(&self, chunk_ids: &[ChunkId]) -> DbResult<Vec<Entity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT e.name, e.entity_type, e.description, e.source_ids, e.file_paths
            FROM entity_chunks ec
            JOIN entities e ON e.name = ec.entity_name
            WHERE ec.chunk_id = ?1
            "#,
        )?;

        let mut entities: Vec<Entity> = Vec::new();
        for chunk_id in chunk_ids {
            let rows = stmt
                .query_map(params![chunk_id], entity_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            for row in rows {
                let entity = decode_entity(row)?;
                if !entities.iter().any(|e| e.name == entity.name) {
                    entities.push(entity);
                }
            }
        }

        Ok(entities)
    }

    /// Relations whose both endpoints are among `names`.
    pub fn relations_between(&self, names: &[String]) -> DbResult<Vec<Relation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, target, keywords, description, weight, source_ids, file_paths
             FROM relations WHERE source = ?1",
        )?;

        let mut relations = Vec::new();
        for name in names {
            let rows = stmt
                .query_map(params![name], relation_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            for row in rows {
                let relation = decode_relation(row)?;
                if names.contains(&relation.target) {
                    relations.push(relation);
                }
            }
        }

        Ok(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, chunk: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: "ORGANIZATION".to_string(),
            description: format!("{} description", name),
            source_ids: vec![chunk.to_string()],
            file_paths: vec!["notes.txt".to_string()],
        }
    }

    #[test]
    fn test_put_and_get_entity() {
        let db = Database::open_in_memory().unwrap();
        db.put_entity(&entity("ACME", "chunk-1")).unwrap();

        let stored = db.get_entity("ACME").unwrap().unwrap();
        assert_eq!(stored.source_ids, vec!["chunk-1"]);
        assert_eq!(stored.file_paths, vec!["notes.txt"]);
        assert!(db.get_entity("GLOBEX").unwrap().is_none());
    }

    #[test]
    fn test_relation_lookup_is_undirected() {
        let db = Database::open_in_memory().unwrap();
        let relation = Relation {
            source: "ZETA".to_string(),
            target: "ALPHA".to_string(),
            keywords: "partnership".to_string(),
            description: "Zeta partners with Alpha".to_string(),
            weight: 2.0,
            source_ids: vec!["chunk-1".to_string()],
            file_paths: vec!["notes.txt".to_string()],
        };
        db.put_relation(&relation).unwrap();

        let stored = db.get_relation("ZETA", "ALPHA").unwrap().unwrap();
        assert_eq!(stored.source, "ALPHA");
        assert_eq!(stored.weight, 2.0);
        assert!(db.get_relation("ALPHA", "ZETA").unwrap().is_some());
    }

    #[test]
    fn test_self_relation_rejected() {
        let db = Database::open_in_memory().unwrap();
        let relation = Relation {
            source: "ACME".to_string(),
            target: "ACME".to_string(),
            keywords: String::new(),
            description: String::new(),
            weight: 1.0,
            source_ids: vec![],
            file_paths: vec![],
        };
        assert!(db.put_relation(&relation).is_err());
    }

    #[test]
    fn test_entities_and_relations_for_chunks() {
        let db = Database::open_in_memory().unwrap();
        db.put_entity(&entity("ACME", "chunk-1")).unwrap();
        db.put_entity(&entity("GLOBEX", "chunk-1")).unwrap();
        db.put_entity(&entity("INITECH", "chunk-2")).unwrap();
        db.put_relation(&Relation {
            source: "ACME".to_string(),
            target: "GLOBEX".to_string(),
            keywords: "competition".to_string(),
            description: "rivals".to_string(),
            weight: 1.0,
            source_ids: vec!["chunk-1".to_string()],
            file_paths: vec!["notes.txt".to_string()],
        })
        .unwrap();

        let entities = db.entities_for_chunks(&["chunk-1".to_string()]).unwrap();
        let names: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"ACME".to_string()));

        let relations = db.relations_between(&names).unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].keywords, "competition");
    }
}
