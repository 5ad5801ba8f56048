use console::style;
use console::Term;
use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::CellAlignment;
use comfy_table::Table;
use num_format::Locale;
use num_format::ToFormattedString;

use crate::aggregate::Aggregates;
use crate::aggregate::CategoryAgePivot;
use crate::aggregate::RankedRevenue;
use crate::types::Result;

pub trait SalesReporter {
    fn out(&self, msg: &str) -> Result<()>;
    fn report(&self, aggregates: &Aggregates) -> Result<()>;
}

#[derive(Clone, Debug)]
pub enum Reporter {
    Formatted(FormattedReporter),
    Quiet,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        if quiet {
            Reporter::Quiet
        }
        else {
            Reporter::Formatted(FormattedReporter::default())
        }
    }
}

impl SalesReporter for Reporter {
    fn out(&self, msg: &str) -> Result<()> {
        match self {
            Reporter::Formatted(reporter) => reporter.out(msg),
            Reporter::Quiet => Ok(()),
        }
    }

    fn report(&self, aggregates: &Aggregates) -> Result<()> {
        match self {
            Reporter::Formatted(reporter) => reporter.report(aggregates),
            Reporter::Quiet => Ok(()),
        }
    }
}

/// Prints the report to stdout.
#[derive(Clone, Debug)]
pub struct FormattedReporter {
    term: Term,
}

impl Default for FormattedReporter {
    fn default() -> Self {
        Self { term: Term::stdout() }
    }
}

impl SalesReporter for FormattedReporter {
    fn out(&self, msg: &str) -> Result<()> {
        Ok(self.term.write_line(msg)?)
    }

    fn report(&self, aggregates: &Aggregates) -> Result<()> {
        self.out(&format!(
            "{} {}",
            style("Total Revenue:").bold(),
            style(thousands(aggregates.total_revenue)).green().bold()
        ))?;
        self.out(&summary_tables(aggregates))
    }
}

pub fn thousands(value: u64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Everything but the total revenue line, as plain text.
pub fn summary_tables(aggregates: &Aggregates) -> String {
    let mut sections = Vec::new();

    let mut monthly = new_table(["Month", "Revenue"]);
    for month in &aggregates.monthly_revenue {
        monthly.add_row([month.month.clone(), thousands(month.revenue)]);
    }
    sections.push(("Monthly revenue", align_right(monthly, 1..=1)));

    sections.push((
        "Top products",
        ranking_table("Product ID", &aggregates.top_products),
    ));
    sections.push((
        "Top customers",
        ranking_table("Customer ID", &aggregates.top_customers),
    ));

    let mut share = new_table(["Category", "Revenue", "Share"]);
    for category in &aggregates.category_share {
        share.add_row([
            category.category.to_string(),
            thousands(category.revenue),
            format!("{:.1}%", category.share * 100.0),
        ]);
    }
    sections.push(("Sales share by category", align_right(share, 1..=2)));

    let mut spending = new_table(["Gender", "Orders", "Mean", "Q1", "Median", "Q3", "Max"]);
    for summary in &aggregates.gender_spending {
        spending.add_row([
            summary.gender.to_string(),
            summary.orders.to_string(),
            format!("{:.1}", summary.mean),
            format!("{:.1}", summary.q1),
            format!("{:.1}", summary.median),
            format!("{:.1}", summary.q3),
            format!("{:.0}", summary.max),
        ]);
    }
    sections.push(("Spending per order by gender", align_right(spending, 1..=6)));

    sections.push((
        "Revenue by category and age group",
        pivot_table(&aggregates.category_age_pivot),
    ));

    sections
        .into_iter()
        .map(|(title, table)| format!("\n{title}\n{table}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn new_table<const N: usize>(header: [&str; N]) -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL_CONDENSED).set_header(header);
    table
}

fn align_right(mut table: Table, columns: std::ops::RangeInclusive<usize>) -> Table {
    for col in columns {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn ranking_table(id_header: &str, ranking: &[RankedRevenue]) -> Table {
    let mut table = new_table(["#", id_header, "Revenue"]);
    for (rank, entry) in ranking.iter().enumerate() {
        table.add_row([(rank + 1).to_string(), entry.id.to_string(), thousands(entry.revenue)]);
    }
    align_right(table, 0..=2)
}

fn pivot_table(pivot: &CategoryAgePivot) -> Table {
    let mut table = Table::new();
    let header = std::iter::once("Category".to_string()).chain(pivot.age_groups().iter().map(|g| g.to_string()));
    table.load_preset(ASCII_FULL_CONDENSED).set_header(header);

    for (category, cells) in pivot.categories().iter().zip(pivot.cells()) {
        table.add_row(std::iter::once(category.to_string()).chain(cells.iter().map(|v| thousands(*v))));
    }
    align_right(table, 1..=pivot.age_groups().len())
}
