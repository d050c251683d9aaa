use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use crate::cli::utils::{apply_query, output_rows, output_success, parse_where, read_rows_from_stdin};
use crate::cli::OutputFormat;
use crate::client::{Client, Transport};

#[derive(Args, Debug, Clone, Default)]
pub struct WhereArgs {
    #[arg(short = 'w', long = "where", value_name = "COLUMN:OP:VALUE", help = "Filter, repeatable (ops: eq neq gt gte lt lte like in)")]
    pub filters: Vec<String>,
}

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "Select rows")]
    Select {
        #[arg(help = "Table name")]
        table: String,
        #[arg(long, default_value = "*", help = "Comma-separated columns")]
        select: String,
        #[command(flatten)]
        filters: WhereArgs,
        #[arg(long, help = "Sort order, e.g. scheduled_at:desc,id")]
        order: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long, help = "Return exactly one row, failing when none match")]
        single: bool,
    },

    #[command(about = "Count matching rows")]
    Count {
        #[arg(help = "Table name")]
        table: String,
        #[command(flatten)]
        filters: WhereArgs,
    },

    #[command(about = "Insert rows read from stdin (object or array of objects)")]
    Insert {
        #[arg(help = "Table name")]
        table: String,
    },

    #[command(about = "Update matching rows with a patch object read from stdin")]
    Update {
        #[arg(help = "Table name")]
        table: String,
        #[command(flatten)]
        filters: WhereArgs,
    },

    #[command(about = "Delete matching rows")]
    Delete {
        #[arg(help = "Table name")]
        table: String,
        #[command(flatten)]
        filters: WhereArgs,
    },
}

pub async fn handle<T: Transport>(
    cmd: DataCommands,
    client: &Client<T>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        DataCommands::Select { table, select, filters, order, limit, offset, single } => {
            let mut query = apply_query(client.from(&table).select(&select), parse_all(&filters)?, order.as_deref());
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(offset) = offset {
                query = query.offset(offset);
            }
            if single {
                let row = query.single().await?;
                output_rows(output_format, &[row])
            } else {
                output_rows(output_format, &query.execute().await?)
            }
        }
        DataCommands::Count { table, filters } => {
            let count = apply_query(client.from(&table), parse_all(&filters)?, None).count().await?;
            match output_format {
                OutputFormat::Json => output_success(output_format, "count", Some(json!(count))),
                OutputFormat::Text => {
                    println!("{}", count);
                    Ok(())
                }
            }
        }
        DataCommands::Insert { table } => {
            let rows = read_rows_from_stdin()?;
            let inserted = client.from(&table).insert(rows).await?;
            output_rows(output_format, &inserted)
        }
        DataCommands::Update { table, filters } => {
            let mut rows = read_rows_from_stdin()?;
            if rows.len() != 1 {
                bail!("update expects a single patch object on stdin");
            }
            let patch = rows.remove(0);
            let updated = apply_query(client.from(&table), parse_all(&filters)?, None).update(patch).await?;
            output_rows(output_format, &updated)
        }
        DataCommands::Delete { table, filters } => {
            let deleted = apply_query(client.from(&table), parse_all(&filters)?, None).delete().await?;
            let ids: Vec<Value> = deleted.iter().filter_map(|r| r.get("id").cloned()).collect();
            output_success(
                output_format,
                &format!("Deleted {} row(s) from {}", deleted.len(), table),
                Some(json!({ "ids": ids })),
            )
        }
    }
}

fn parse_all(args: &WhereArgs) -> anyhow::Result<Vec<crate::filter::FilterCondition>> {
    args.filters
        .iter()
        .map(|spec| parse_where(spec).with_context(|| format!("invalid --where '{}'", spec)))
        .collect()
}
