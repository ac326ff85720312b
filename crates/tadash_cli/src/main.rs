//! Command-line front end for the TA dashboard.
//!
//! # Responsibility
//! - Stand in for the dashboard UI: list views, emit add/edit/delete
//!   intents, print stats, export and import workbooks.
//! - Report intent results through core notices only.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tadash_core::config::DEFAULT_CONFIG_FILE;
use tadash_core::stats::{self, ProgrammeGrouping, YearFilter};
use tadash_core::{
    export_table, import_workbook, init_logging, Dashboard, DashboardConfig, EditableTable,
    FieldValues, FilterSpec, Intent, Notice, RecordId, Selection, SortSpec, StorageBackend, View,
};

#[derive(Parser)]
#[command(name = "tadash")]
#[command(about = "Advisor calendars and country calls over spreadsheet storage")]
#[command(version)]
struct Cli {
    /// Config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a filtered view of an editable table
    List {
        table: EditableTable,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Add one entry
    Add {
        table: EditableTable,
        /// Field assignment, e.g. `--set advisor=JD`
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Edit one entry, by id or by its row in a view
    Edit {
        table: EditableTable,
        #[arg(long, conflicts_with = "rows")]
        id: Option<RecordId>,
        /// Row position (0-based) in the view selected by the filter flags
        #[arg(long = "row")]
        rows: Vec<usize>,
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Delete entries, by id or by their rows in a view
    Delete {
        table: EditableTable,
        #[arg(long = "id", conflicts_with = "rows")]
        ids: Vec<RecordId>,
        #[arg(long = "row")]
        rows: Vec<usize>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print one dashboard aggregation
    Stats {
        #[arg(value_enum)]
        report: Report,
        /// Year, or `All`
        #[arg(long, default_value = "All")]
        year: YearFilter,
        /// Continent to keep (focal report); repeatable
        #[arg(long = "continent")]
        continents: Vec<String>,
        /// Group programmes by donor instead of sector
        #[arg(long)]
        by_donor: bool,
        #[arg(long, default_value_t = 2000)]
        from: i32,
        #[arg(long, default_value_t = 2100)]
        to: i32,
    },
    /// Write the whole workbook, or one table, to an `.xlsx` file
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        table: Option<EditableTable>,
    },
    /// Copy every sheet of an `.xlsx` file into the configured backend
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Report {
    Occupancy,
    CallsByCountry,
    CallsByAttendee,
    Focal,
    Risk,
    Programmes,
}

#[derive(Args)]
struct ViewArgs {
    /// Keep rows where `field=value`; repeat a field to allow several values
    #[arg(long = "where", value_parser = parse_assignment)]
    filters: Vec<(String, String)>,
    /// Keep rows whose date field falls in a year, e.g. `end_date=2024`
    #[arg(long = "in-year", value_parser = parse_assignment)]
    years: Vec<(String, String)>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl ViewArgs {
    fn filter(&self) -> Result<FilterSpec> {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (field, value) in &self.filters {
            match grouped.iter_mut().find(|(name, _)| *name == field.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => grouped.push((field.as_str(), vec![value.as_str()])),
            }
        }
        let mut filter = FilterSpec::new();
        for (field, values) in grouped {
            filter = filter.allow(field, values);
        }
        for (field, year) in &self.years {
            let year: i32 = year
                .parse()
                .with_context(|| format!("`{year}` is not a year"))?;
            filter = filter.year(field.as_str(), year);
        }
        Ok(filter)
    }

    fn sort(&self) -> Option<SortSpec> {
        self.sort.as_ref().map(|field| {
            if self.desc {
                SortSpec::descending(field.as_str())
            } else {
                SortSpec::ascending(field.as_str())
            }
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DashboardConfig::load_or_default(&cli.config)?;
    if let Some(dir) = &config.logging.dir {
        init_logging(config.logging.level(), dir)?;
    }
    let backend = config.backend.open()?;

    match cli.command {
        Commands::Import { file } => cmd_import(&file, backend),
        command => {
            let mut dashboard = Dashboard::open(backend, &config.sheets)?;
            run(&mut dashboard, command)
        }
    }
}

fn run(dashboard: &mut Dashboard, command: Commands) -> Result<()> {
    match command {
        Commands::List { table, view } => {
            let view = dashboard
                .service(table)
                .view(&view.filter()?, view.sort().as_ref())?;
            print_view(&view);
            Ok(())
        }
        Commands::Add { table, fields } => {
            let fields: FieldValues = fields.into_iter().collect();
            let subject = fields
                .get(table.subject_field())
                .cloned()
                .unwrap_or_default();
            let result = dashboard.service_mut(table).execute(Intent::Add(fields));
            report(Notice::from_result(table.key(), &subject, &result))
        }
        Commands::Edit {
            table,
            id,
            rows,
            view,
            fields,
        } => {
            let service = dashboard.service_mut(table);
            let target = match id {
                Some(id) => Ok(id),
                None => service
                    .view(&view.filter()?, view.sort().as_ref())?
                    .resolve_single(&Selection::rows(rows)),
            };
            let target_id = target.as_ref().ok().copied();
            let result = target.and_then(|id| {
                service.execute(Intent::Edit {
                    id,
                    fields: fields.into_iter().collect(),
                })
            });
            let subject = target_id
                .and_then(|id| service.table().get(id))
                .map(|record| record.get(table.subject_field()).to_string())
                .unwrap_or_default();
            report(Notice::from_result(table.key(), &subject, &result))
        }
        Commands::Delete {
            table,
            ids,
            rows,
            view,
        } => {
            let service = dashboard.service_mut(table);
            let result = if rows.is_empty() {
                service.execute(Intent::Delete(ids))
            } else {
                service
                    .view(&view.filter()?, view.sort().as_ref())?
                    .resolve(&Selection::rows(rows))
                    .and_then(|ids| service.execute(Intent::Delete(ids)))
            };
            report(Notice::from_result(table.key(), "", &result))
        }
        Commands::Stats {
            report,
            year,
            continents,
            by_donor,
            from,
            to,
        } => {
            print_stats(dashboard, report, year, &continents, by_donor, from, to);
            Ok(())
        }
        Commands::Export { out, table } => {
            let bytes = match table {
                Some(table) => export_table(dashboard.service(table).table())?,
                None => dashboard.export()?,
            };
            std::fs::write(&out, bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Exported to {}", out.display());
            Ok(())
        }
        Commands::Import { .. } => bail!("import runs before the dashboard is opened"),
    }
}

fn cmd_import(file: &Path, backend: Arc<dyn StorageBackend>) -> Result<()> {
    let imported = import_workbook(file, backend.as_ref())
        .with_context(|| format!("Failed to import {}", file.display()))?;
    for sheet in imported {
        println!("{}\t{} rows", sheet.name, sheet.rows);
    }
    Ok(())
}

fn report(notice: Notice) -> Result<()> {
    if notice.is_error() {
        bail!(notice.text);
    }
    println!("{}", notice.text);
    Ok(())
}

fn print_view(view: &View) {
    let mut header = vec!["row".to_string(), "id".to_string()];
    header.extend(view.columns().iter().cloned());
    println!("{}", header.join("\t"));
    for (position, record) in view.rows().iter().enumerate() {
        let mut line = vec![position.to_string(), record.id().to_string()];
        line.extend(
            view.columns()
                .iter()
                .map(|column| record.get(column).to_string()),
        );
        println!("{}", line.join("\t"));
    }
}

fn print_stats(
    dashboard: &Dashboard,
    report: Report,
    year: YearFilter,
    continents: &[String],
    by_donor: bool,
    from: i32,
    to: i32,
) {
    let calendar = dashboard.service(EditableTable::Calendar).table();
    let calls = dashboard.service(EditableTable::CountryCalls).table();
    let reference = dashboard.reference();
    match report {
        Report::Occupancy => {
            println!("Advisor\tType\t# Days\t%");
            for row in stats::occupancy_by_type(calendar, year) {
                println!(
                    "{}\t{}\t{}\t{:.2}%",
                    row.advisor, row.entry_type, row.days, row.percent
                );
            }
        }
        Report::CallsByCountry => print_counts(&stats::calls_by_country(calls, year)),
        Report::CallsByAttendee => print_counts(&stats::calls_by_attendee(calls, year)),
        Report::Focal => {
            let filter = (!continents.is_empty()).then_some(continents);
            print_counts(&stats::countries_by_focal(&reference.countries, filter));
        }
        Report::Risk => {
            println!("Country\tDescription\tRemarks");
            for entry in stats::risk_ordering(&reference.risk_matrix) {
                println!("{}\t{}\t{}", entry.country, entry.description, entry.remarks);
            }
        }
        Report::Programmes => {
            let grouping = if by_donor {
                ProgrammeGrouping::Donor
            } else {
                ProgrammeGrouping::Sector
            };
            for row in stats::programmes_by(&reference.programmes, grouping, from, to) {
                println!("{}\t{}\t{}", row.country, row.group, row.count);
            }
        }
    }
}

fn print_counts(counts: &[stats::Count]) {
    for count in counts {
        println!("{}\t{}", count.label, count.count);
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `field=value`, got `{raw}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{raw}`"));
    }
    Ok((field.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_assignment, Cli};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("remarks=a=b").unwrap(),
            ("remarks".to_string(), "a=b".to_string())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
