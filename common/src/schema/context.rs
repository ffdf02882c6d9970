use crate::db::{Database, TableInfo};
use crate::error::Result;

/// ddl followed by a commented block of sample rows
pub fn format_table_info(info: &TableInfo) -> String {
    let mut text = format!("\n{}", info.ddl);

    if !info.sample.columns.is_empty() {
        text.push_str(&format!(
            "\n\n/*\n{} rows from {} table:\n{}\n*/",
            info.sample.rows.len(),
            info.name,
            info.sample.render_sample()
        ));
    }

    text
}

/// schema and sample rows for the given tables, in the order given
#[tracing::instrument(skip(db, tables), fields(table_count = tables.len(), db.dialect = db.dialect()))]
pub async fn get_schema_context(
    db: &dyn Database,
    tables: &[String],
    sample_rows: usize,
) -> Result<String> {
    let mut sections = Vec::with_capacity(tables.len());

    for table in tables {
        let info = db.table_info(table, sample_rows).await?;
        sections.push(format_table_info(&info));
    }

    let context = sections.join("\n\n");
    tracing::debug!(context_len = context.len(), "schema context built");
    Ok(context)
}
