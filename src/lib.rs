//! # sales-report
//!
//! Synthetic e-commerce sales report generator.
//!
//! The crate produces a reproducible dataset of customers, products and orders, joins the orders with their customers
//! and products, aggregates the result and presents it as a console report and a set of SVG charts.
//!
//! # The Pipeline
//!
//! Everything happens in a single pass, each stage consuming the output of the previous one:
//!
//! 1. [`DataGenerator`](generator::DataGenerator) samples the three base tables from fixed distributions using a
//!    seeded RNG. The same seed always yields the same data.
//! 2. [`SalesFrame::join`](frame::SalesFrame::join) performs an inner join of orders with customers and products and
//!    derives the line total, the customer age group and the order month.
//! 3. [`Aggregates::compute`](aggregate::Aggregates::compute) builds the total and monthly revenue, the top products
//!    and customers, the category by age group pivot, the category share and the per-gender spending distribution.
//! 4. [`Reporter`](reporter::Reporter) prints the aggregates; [`ChartRenderer`](render::ChartRenderer) writes one
//!    chart per aggregate.
//!
//! The [`app`] module wires the stages together behind a command line interface:
//!
//! ```text
//! sales-report --seed 42 --orders 2000 --output-dir charts --json report.json
//! ```
//!
//! # Charts
//!
//! | File | Chart |
//! | ---- | ----- |
//! | `monthly_revenue.svg` | Line chart of revenue per month |
//! | `top_products.svg` | Bar chart of the top products by revenue |
//! | `top_customers.svg` | Bar chart of the top customers by revenue |
//! | `gender_spending.svg` | Box plot of per-order spending by gender |
//! | `category_age_heatmap.svg` | Heatmap of revenue by category and age group |
//! | `category_share.svg` | Pie chart of the revenue share by category |

pub mod aggregate;
pub mod app;
pub mod frame;
pub mod generator;
pub mod render;
pub mod reporter;
pub mod types;

#[doc(inline)]
pub use app::SalesReportApp;

pub mod prelude {
    pub use crate::aggregate::Aggregates;
    pub use crate::app::SalesReportApp;
    pub use crate::frame::SalesFrame;
    pub use crate::generator::DataGenerator;
    pub use crate::generator::Dataset;
    pub use crate::render::ChartKind;
    pub use crate::render::ChartRenderer;
    pub use crate::types::*;
}
