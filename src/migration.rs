//! Apply the resolved model to the database: DDL for tables, foreign keys, junction tables and indexes.
//! Idempotent: every statement is `IF NOT EXISTS`.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::SqlitePool;

/// CREATE TABLE statement for one entity. Foreign keys are declared inline (SQLite cannot add them later).
pub fn create_table_sql(model: &ResolvedModel, entity: &ResolvedEntity) -> String {
    let mut defs: Vec<String> = Vec::new();
    for c in &entity.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.sql_type);
        if c.is_pk {
            def.push_str(" PRIMARY KEY");
        } else if let Some(expr) = &c.generated {
            def.push_str(&format!(" GENERATED ALWAYS AS ({}) VIRTUAL", expr));
        } else {
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if c.unique {
                def.push_str(" UNIQUE");
            }
        }
        defs.push(def);
    }
    for rel in &entity.relations {
        let Some(related) = model.entity(&rel.related_table_id) else { continue };
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quoted(&rel.fk_column),
            quoted(&related.table_name),
            quoted(&rel.their_key),
            rel.on_delete.as_deref().unwrap_or("NO ACTION")
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&entity.table_name),
        defs.join(",\n  ")
    )
}

/// Apply the model: entity tables, junction tables, then foreign-key indexes.
pub async fn apply_migrations(pool: &SqlitePool, model: &ResolvedModel) -> Result<(), AppError> {
    // Tables in view order first so creation order is stable, then entities without a view.
    let mut ordered: Vec<&ResolvedEntity> = Vec::new();
    for v in &model.views {
        if let Some(e) = model.entity(&v.entity_id) {
            if !ordered.iter().any(|o| o.table_id == e.table_id) {
                ordered.push(e);
            }
        }
    }
    let mut rest: Vec<&ResolvedEntity> = model
        .entities
        .values()
        .filter(|e| !ordered.iter().any(|o| o.table_id == e.table_id))
        .collect();
    rest.sort_by(|a, b| a.table_id.cmp(&b.table_id));
    ordered.extend(rest);

    for entity in &ordered {
        let sql = create_table_sql(model, entity);
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(&sql).execute(pool).await?;
    }

    for entity in &ordered {
        for m2m in &entity.many_to_many {
            let Some(related) = model.entity(&m2m.related_table_id) else { continue };
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (\n  {} INTEGER NOT NULL REFERENCES {} ({}) ON DELETE CASCADE,\n  {} INTEGER NOT NULL REFERENCES {} ({}) ON DELETE CASCADE,\n  PRIMARY KEY ({}, {})\n)",
                quoted(&m2m.junction_table),
                quoted(&m2m.our_key),
                quoted(&entity.table_name),
                quoted(&entity.pk_column),
                quoted(&m2m.their_key),
                quoted(&related.table_name),
                quoted(&related.pk_column),
                quoted(&m2m.our_key),
                quoted(&m2m.their_key),
            );
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;

            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("ix_{}_{}", m2m.junction_table, m2m.their_key)),
                quoted(&m2m.junction_table),
                quoted(&m2m.their_key)
            );
            sqlx::query(&sql).execute(pool).await?;
        }
        for rel in &entity.relations {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("ix_{}_{}", entity.table_name, rel.fk_column)),
                quoted(&entity.table_name),
                quoted(&rel.fk_column)
            );
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
    }

    tracing::info!(tables = ordered.len(), "schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{inventory_config, resolve};

    #[test]
    fn product_table_declares_constraints() {
        let model = resolve(&inventory_config().unwrap()).unwrap();
        let sql = create_table_sql(&model, model.entity("product").unwrap());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"product\" ("));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY"));
        assert!(sql.contains("\"code\" VARCHAR(255) UNIQUE"));
        assert!(sql.contains("\"name\" VARCHAR(255) UNIQUE"));
        assert!(sql.contains("\"fullname\" VARCHAR(1000) GENERATED ALWAYS AS ("));
        assert!(sql.contains("FOREIGN KEY (\"supplier_id\") REFERENCES \"supplier\" (\"id\") ON DELETE NO ACTION"));
    }

    #[test]
    fn sale_requires_product() {
        let model = resolve(&inventory_config().unwrap()).unwrap();
        let sql = create_table_sql(&model, model.entity("sale").unwrap());
        assert!(sql.contains("\"product_id\" INTEGER NOT NULL"));
        assert!(sql.contains("\"staff_id\" INTEGER,"));
    }
}
