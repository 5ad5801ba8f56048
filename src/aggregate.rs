use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::Serialize;
use statrs::statistics::Statistics;
use strum::VariantArray;
use tracing::instrument;

use crate::frame::SalesFrame;
use crate::frame::SalesRow;
use crate::types::AgeGroup;
use crate::types::Category;
use crate::types::Gender;

pub const DEFAULT_TOP: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month:   String,
    pub revenue: u64,
}

/// Revenue of a single product or customer, identified by its ID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedRevenue {
    pub id:      u32,
    pub revenue: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub revenue:  u64,
    /// Fraction of the total revenue, 0.0..=1.0
    pub share:    f64,
}

/// Revenue by category and age group. Rows are the categories present in the data, columns are all age groups. Cells
/// without sales are zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryAgePivot {
    categories: Vec<Category>,
    age_groups: Vec<AgeGroup>,
    cells:      Vec<Vec<u64>>,
}

impl CategoryAgePivot {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn age_groups(&self) -> &[AgeGroup] {
        &self.age_groups
    }

    /// Row-major, `cells()[category_idx][age_group_idx]`.
    pub fn cells(&self) -> &[Vec<u64>] {
        &self.cells
    }

    pub fn get(&self, category: Category, age_group: AgeGroup) -> Option<u64> {
        let row = self.categories.iter().position(|c| *c == category)?;
        let col = self.age_groups.iter().position(|g| *g == age_group)?;
        Some(self.cells[row][col])
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    pub fn max_cell(&self) -> u64 {
        self.cells.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Distribution of per-order spending for one gender.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub gender:       Gender,
    pub orders:       usize,
    pub mean:         f64,
    pub min:          f64,
    pub q1:           f64,
    pub median:       f64,
    pub q3:           f64,
    pub max:          f64,
    /// Lowest value within `q1 - 1.5 * IQR`.
    pub whisker_low:  f64,
    /// Highest value within `q3 + 1.5 * IQR`.
    pub whisker_high: f64,
    pub outliers:     Vec<f64>,
}

impl SpendingSummary {
    /// `None` for an empty sample.
    pub fn from_totals(gender: Gender, mut totals: Vec<f64>) -> Option<Self> {
        if totals.is_empty() {
            return None;
        }
        totals.sort_by(f64::total_cmp);

        let orders = totals.len();
        let mean = totals.iter().mean();
        let min = totals[0];
        let max = totals[orders - 1];

        let q1 = quantile(&totals, 0.25);
        let median = quantile(&totals, 0.5);
        let q3 = quantile(&totals, 0.75);

        let fence = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - fence, q3 + fence);
        let whisker_low = totals.iter().copied().find(|v| *v >= low_fence).unwrap_or(min);
        let whisker_high = totals.iter().rev().copied().find(|v| *v <= high_fence).unwrap_or(max);
        let outliers = totals
            .into_iter()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            gender,
            orders,
            mean,
            min,
            q1,
            median,
            q3,
            max,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Quantile of a sorted, non-empty sample, linearly interpolated between the closest ranks at `(n - 1) * p`.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower])
}

/// Every aggregate the report is made of.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Aggregates {
    pub orders:             usize,
    pub total_revenue:      u64,
    pub monthly_revenue:    Vec<MonthlyRevenue>,
    pub top_products:       Vec<RankedRevenue>,
    pub top_customers:      Vec<RankedRevenue>,
    pub category_age_pivot: CategoryAgePivot,
    pub category_share:     Vec<CategoryShare>,
    pub gender_spending:    Vec<SpendingSummary>,
}

impl Aggregates {
    #[instrument(level = "debug", skip(frame), fields(rows = frame.len()))]
    pub fn compute(frame: &SalesFrame, top: usize) -> Self {
        Self {
            orders:             frame.len(),
            total_revenue:      total_revenue(frame),
            monthly_revenue:    monthly_revenue(frame),
            top_products:       top_products(frame, top),
            top_customers:      top_customers(frame, top),
            category_age_pivot: category_age_pivot(frame),
            category_share:     category_share(frame),
            gender_spending:    gender_spending(frame),
        }
    }
}

pub fn total_revenue(frame: &SalesFrame) -> u64 {
    frame.rows().iter().map(|r| r.total_price).sum()
}

/// Revenue per `YYYY-MM` month in chronological order.
pub fn monthly_revenue(frame: &SalesFrame) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<&str, u64> = BTreeMap::new();
    for row in frame.rows() {
        *months.entry(row.order_month.as_str()).or_default() += row.total_price;
    }
    months
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue {
            month: month.to_string(),
            revenue,
        })
        .collect()
}

pub fn top_products(frame: &SalesFrame, top: usize) -> Vec<RankedRevenue> {
    top_by(frame, top, |row| row.product_id)
}

pub fn top_customers(frame: &SalesFrame, top: usize) -> Vec<RankedRevenue> {
    top_by(frame, top, |row| row.customer_id)
}

// Descending by revenue, ties go to the lower ID.
fn top_by(frame: &SalesFrame, top: usize, key: impl Fn(&SalesRow) -> u32) -> Vec<RankedRevenue> {
    let mut sums: HashMap<u32, u64> = HashMap::new();
    for row in frame.rows() {
        *sums.entry(key(row)).or_default() += row.total_price;
    }

    let mut ranked: Vec<RankedRevenue> = sums
        .into_iter()
        .map(|(id, revenue)| RankedRevenue { id, revenue })
        .collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.id.cmp(&b.id)));
    ranked.truncate(top);
    ranked
}

pub fn category_age_pivot(frame: &SalesFrame) -> CategoryAgePivot {
    let mut sums: HashMap<(Category, AgeGroup), u64> = HashMap::new();
    let mut categories = BTreeSet::new();

    for row in frame.rows() {
        // Rows without an age group don't take part in the pivot.
        if let Some(age_group) = row.age_group {
            categories.insert(row.category);
            *sums.entry((row.category, age_group)).or_default() += row.total_price;
        }
    }

    let categories: Vec<Category> = categories.into_iter().collect();
    let age_groups = AgeGroup::VARIANTS.to_vec();
    let cells = categories
        .iter()
        .map(|category| {
            age_groups
                .iter()
                .map(|age_group| sums.get(&(*category, *age_group)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    CategoryAgePivot {
        categories,
        age_groups,
        cells,
    }
}

/// Revenue per category, in category order.
pub fn category_share(frame: &SalesFrame) -> Vec<CategoryShare> {
    let mut sums: BTreeMap<Category, u64> = BTreeMap::new();
    for row in frame.rows() {
        *sums.entry(row.category).or_default() += row.total_price;
    }

    let total: u64 = sums.values().sum();
    sums.into_iter()
        .map(|(category, revenue)| CategoryShare {
            category,
            revenue,
            share: if total > 0 {
                revenue as f64 / total as f64
            }
            else {
                0.0
            },
        })
        .collect()
}

pub fn gender_spending(frame: &SalesFrame) -> Vec<SpendingSummary> {
    let mut totals: BTreeMap<Gender, Vec<f64>> = BTreeMap::new();
    for row in frame.rows() {
        totals.entry(row.gender).or_default().push(row.total_price as f64);
    }

    totals
        .into_iter()
        .filter_map(|(gender, values)| SpendingSummary::from_totals(gender, values))
        .collect()
}
